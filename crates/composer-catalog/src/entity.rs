//! Entity identity, field values and the schema traits
//!
//! Every catalog record implements [`Entity`]. Its fields are described by a
//! closed enum implementing [`EntityField`], so a patch can only ever name a
//! field that exists on the schema.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt::{self, Debug, Display};
use std::hash::Hash;

/// Stable catalog identifier
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Create identifier
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow as str
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for EntityId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Borrow<str> for EntityId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Closed tag for the three catalog schemas
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    /// Subscription plan
    Plan,
    /// Bundle of channels sold under a plan
    Bundle,
    /// Single channel
    Channel,
}

impl EntityType {
    /// Lowercase name used on the wire
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Plan => "plan",
            Self::Bundle => "bundle",
            Self::Channel => "channel",
        }
    }
}

impl Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value kind accepted by a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// Free text
    Text,
    /// Floating point (prices)
    Number,
    /// Whole number (tiers, channel numbers)
    Integer,
    /// Boolean switch
    Flag,
}

/// A single field value as carried by a patch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Text value
    Text(String),
    /// Integer value
    Integer(i64),
    /// Number value, may be NaN while a numeric input is mid-edit
    Number(f64),
    /// Flag value
    Flag(bool),
}

impl FieldValue {
    /// Kind of this value
    #[inline]
    #[must_use]
    pub fn kind(&self) -> FieldKind {
        match self {
            Self::Text(_) => FieldKind::Text,
            Self::Integer(_) => FieldKind::Integer,
            Self::Number(_) => FieldKind::Number,
            Self::Flag(_) => FieldKind::Flag,
        }
    }

    /// Strict equality with NaN equal to NaN
    ///
    /// Numeric inputs produce NaN while the user is typing; two NaN values
    /// must compare equal or reverting a field could never clear its patch.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a == b || (a.is_nan() && b.is_nan()),
            _ => self == other,
        }
    }

    /// Convert into the requested kind where the conversion is lossless
    ///
    /// JSON has a single number type, so `15` arriving for a price field is
    /// read as an integer and widened here.
    #[must_use]
    pub fn coerce(self, kind: FieldKind) -> Option<Self> {
        match (self, kind) {
            (v, k) if v.kind() == k => Some(v),
            #[allow(clippy::cast_precision_loss)]
            (Self::Integer(i), FieldKind::Number) => Some(Self::Number(i as f64)),
            #[allow(clippy::cast_possible_truncation)]
            (Self::Number(n), FieldKind::Integer) if n.is_finite() && n.fract() == 0.0 => {
                Some(Self::Integer(n as i64))
            }
            _ => None,
        }
    }

    /// Text content, if this is a text value
    #[inline]
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric content widened to f64
    #[inline]
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }
}

impl Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => write!(f, "{s:?}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Flag(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Flag(value)
    }
}

pub(crate) mod private {
    pub trait Sealed {}
}

/// Field enum of one schema
pub trait EntityField:
    Copy + Eq + Ord + Hash + Debug + Display + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Every field of the schema, in declaration order
    const ALL: &'static [Self];

    /// Kind of value the field accepts
    fn kind(self) -> FieldKind;

    /// Wire name (camelCase)
    fn name(self) -> &'static str;
}

/// Catalog record schema
///
/// Sealed: the set of entity kinds is closed.
pub trait Entity: private::Sealed + Clone + Debug + PartialEq + Send + Sync + 'static {
    /// Field enum for this schema
    type Field: EntityField;

    /// Tag of this schema
    const ENTITY_TYPE: EntityType;

    /// Stable id
    fn id(&self) -> &EntityId;

    /// Read one field
    fn get(&self, field: Self::Field) -> FieldValue;

    /// Write one field
    ///
    /// Returns `false` and leaves the record untouched when the value kind
    /// does not match the field.
    fn set(&mut self, field: Self::Field, value: &FieldValue) -> bool;
}
