//! Bundle schema

use crate::entity::{private, Entity, EntityField, EntityId, EntityType, FieldKind, FieldValue};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Bundle of channels offered under one or more plans
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bundle {
    /// Stable id
    pub id: EntityId,
    /// Display name
    pub name: String,
    /// Marketing copy
    #[serde(default)]
    pub description: String,
    /// Add-on price
    pub price: f64,
    /// Whether the bundle is sellable
    pub active: bool,
}

impl Bundle {
    /// Create an active bundle
    #[must_use]
    pub fn new(id: impl Into<EntityId>, name: impl Into<String>, price: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            price,
            active: true,
        }
    }
}

/// Editable bundle fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BundleField {
    /// `name`
    Name,
    /// `description`
    Description,
    /// `price`
    Price,
    /// `active`
    Active,
}

impl EntityField for BundleField {
    const ALL: &'static [Self] = &[Self::Name, Self::Description, Self::Price, Self::Active];

    fn kind(self) -> FieldKind {
        match self {
            Self::Name | Self::Description => FieldKind::Text,
            Self::Price => FieldKind::Number,
            Self::Active => FieldKind::Flag,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Description => "description",
            Self::Price => "price",
            Self::Active => "active",
        }
    }
}

impl fmt::Display for BundleField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl private::Sealed for Bundle {}

impl Entity for Bundle {
    type Field = BundleField;

    const ENTITY_TYPE: EntityType = EntityType::Bundle;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn get(&self, field: BundleField) -> FieldValue {
        match field {
            BundleField::Name => FieldValue::Text(self.name.clone()),
            BundleField::Description => FieldValue::Text(self.description.clone()),
            BundleField::Price => FieldValue::Number(self.price),
            BundleField::Active => FieldValue::Flag(self.active),
        }
    }

    fn set(&mut self, field: BundleField, value: &FieldValue) -> bool {
        match (field, value) {
            (BundleField::Name, FieldValue::Text(v)) => self.name.clone_from(v),
            (BundleField::Description, FieldValue::Text(v)) => self.description.clone_from(v),
            (BundleField::Price, FieldValue::Number(v)) => self.price = *v,
            (BundleField::Active, FieldValue::Flag(v)) => self.active = *v,
            _ => return false,
        }
        true
    }
}
