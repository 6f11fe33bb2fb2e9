//! Channel schema

use crate::entity::{private, Entity, EntityField, EntityId, EntityType, FieldKind, FieldValue};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Single channel in the lineup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    /// Stable id
    pub id: EntityId,
    /// Display name
    pub name: String,
    /// Position in the guide
    pub number: i64,
    /// Genre label
    #[serde(default)]
    pub genre: String,
    /// High definition feed
    pub hd: bool,
}

impl Channel {
    /// Create an SD channel
    #[must_use]
    pub fn new(id: impl Into<EntityId>, name: impl Into<String>, number: i64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            number,
            genre: String::new(),
            hd: false,
        }
    }
}

/// Editable channel fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChannelField {
    /// `name`
    Name,
    /// `number`
    Number,
    /// `genre`
    Genre,
    /// `hd`
    Hd,
}

impl EntityField for ChannelField {
    const ALL: &'static [Self] = &[Self::Name, Self::Number, Self::Genre, Self::Hd];

    fn kind(self) -> FieldKind {
        match self {
            Self::Name | Self::Genre => FieldKind::Text,
            Self::Number => FieldKind::Integer,
            Self::Hd => FieldKind::Flag,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Number => "number",
            Self::Genre => "genre",
            Self::Hd => "hd",
        }
    }
}

impl fmt::Display for ChannelField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl private::Sealed for Channel {}

impl Entity for Channel {
    type Field = ChannelField;

    const ENTITY_TYPE: EntityType = EntityType::Channel;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn get(&self, field: ChannelField) -> FieldValue {
        match field {
            ChannelField::Name => FieldValue::Text(self.name.clone()),
            ChannelField::Number => FieldValue::Integer(self.number),
            ChannelField::Genre => FieldValue::Text(self.genre.clone()),
            ChannelField::Hd => FieldValue::Flag(self.hd),
        }
    }

    fn set(&mut self, field: ChannelField, value: &FieldValue) -> bool {
        match (field, value) {
            (ChannelField::Name, FieldValue::Text(v)) => self.name.clone_from(v),
            (ChannelField::Number, FieldValue::Integer(v)) => self.number = *v,
            (ChannelField::Genre, FieldValue::Text(v)) => self.genre.clone_from(v),
            (ChannelField::Hd, FieldValue::Flag(v)) => self.hd = *v,
            _ => return false,
        }
        true
    }
}
