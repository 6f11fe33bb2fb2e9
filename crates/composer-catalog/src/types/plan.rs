//! Plan schema

use crate::entity::{private, Entity, EntityField, EntityId, EntityType, FieldKind, FieldValue};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Subscription plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    /// Stable id
    pub id: EntityId,
    /// Display name
    pub name: String,
    /// Marketing copy
    #[serde(default)]
    pub description: String,
    /// Monthly base price
    pub base_price: f64,
    /// Tier rank, 0 is the entry tier
    pub tier: i64,
    /// Billing period label (`monthly`, `annual`)
    pub billing_period: String,
    /// Whether the plan is sellable
    pub active: bool,
}

impl Plan {
    /// Create an active monthly plan
    #[must_use]
    pub fn new(id: impl Into<EntityId>, name: impl Into<String>, base_price: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            base_price,
            tier: 0,
            billing_period: "monthly".to_string(),
            active: true,
        }
    }

    /// With tier
    #[inline]
    #[must_use]
    pub fn with_tier(mut self, tier: i64) -> Self {
        self.tier = tier;
        self
    }
}

/// Editable plan fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PlanField {
    /// `name`
    Name,
    /// `description`
    Description,
    /// `basePrice`
    BasePrice,
    /// `tier`
    Tier,
    /// `billingPeriod`
    BillingPeriod,
    /// `active`
    Active,
}

impl EntityField for PlanField {
    const ALL: &'static [Self] = &[
        Self::Name,
        Self::Description,
        Self::BasePrice,
        Self::Tier,
        Self::BillingPeriod,
        Self::Active,
    ];

    fn kind(self) -> FieldKind {
        match self {
            Self::Name | Self::Description | Self::BillingPeriod => FieldKind::Text,
            Self::BasePrice => FieldKind::Number,
            Self::Tier => FieldKind::Integer,
            Self::Active => FieldKind::Flag,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Description => "description",
            Self::BasePrice => "basePrice",
            Self::Tier => "tier",
            Self::BillingPeriod => "billingPeriod",
            Self::Active => "active",
        }
    }
}

impl fmt::Display for PlanField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl private::Sealed for Plan {}

impl Entity for Plan {
    type Field = PlanField;

    const ENTITY_TYPE: EntityType = EntityType::Plan;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn get(&self, field: PlanField) -> FieldValue {
        match field {
            PlanField::Name => FieldValue::Text(self.name.clone()),
            PlanField::Description => FieldValue::Text(self.description.clone()),
            PlanField::BasePrice => FieldValue::Number(self.base_price),
            PlanField::Tier => FieldValue::Integer(self.tier),
            PlanField::BillingPeriod => FieldValue::Text(self.billing_period.clone()),
            PlanField::Active => FieldValue::Flag(self.active),
        }
    }

    fn set(&mut self, field: PlanField, value: &FieldValue) -> bool {
        match (field, value) {
            (PlanField::Name, FieldValue::Text(v)) => self.name.clone_from(v),
            (PlanField::Description, FieldValue::Text(v)) => self.description.clone_from(v),
            (PlanField::BasePrice, FieldValue::Number(v)) => self.base_price = *v,
            (PlanField::Tier, FieldValue::Integer(v)) => self.tier = *v,
            (PlanField::BillingPeriod, FieldValue::Text(v)) => self.billing_period.clone_from(v),
            (PlanField::Active, FieldValue::Flag(v)) => self.active = *v,
            _ => return false,
        }
        true
    }
}
