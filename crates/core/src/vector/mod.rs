//! Parcel features: polygon geometry plus descriptive attributes

use geo_types::MultiPolygon;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Attribute value types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl AttributeValue {
    /// String view of the value, if it is one
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl std::fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttributeValue::Null => write!(f, "null"),
            AttributeValue::Bool(b) => write!(f, "{}", b),
            AttributeValue::Int(i) => write!(f, "{}", i),
            AttributeValue::Float(x) => write!(f, "{}", x),
            AttributeValue::String(s) => write!(f, "{}", s),
        }
    }
}

/// A land parcel.
///
/// Geometry and attributes are fixed at construction; the NDVI series
/// computed for a parcel lives outside it, keyed by [`Parcel::id`].
#[derive(Debug, Clone)]
pub struct Parcel {
    id: String,
    geometry: MultiPolygon<f64>,
    properties: BTreeMap<String, AttributeValue>,
}

impl Parcel {
    /// Create a parcel with no attributes
    pub fn new(id: impl Into<String>, geometry: MultiPolygon<f64>) -> Self {
        Self {
            id: id.into(),
            geometry,
            properties: BTreeMap::new(),
        }
    }

    /// Builder-style attribute setter
    pub fn with_property(mut self, key: impl Into<String>, value: AttributeValue) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn geometry(&self) -> &MultiPolygon<f64> {
        &self.geometry
    }

    /// Get an attribute
    pub fn get_property(&self, key: &str) -> Option<&AttributeValue> {
        self.properties.get(key)
    }

    /// Attribute rendered as text; missing attributes render as `null`
    pub fn property_text(&self, key: &str) -> String {
        self.properties
            .get(key)
            .map(ToString::to_string)
            .unwrap_or_else(|| "null".to_string())
    }

    pub fn properties(&self) -> &BTreeMap<String, AttributeValue> {
        &self.properties
    }

}

/// Ordered collection of parcels
#[derive(Debug, Clone, Default)]
pub struct ParcelCollection {
    parcels: Vec<Parcel>,
}

impl ParcelCollection {
    pub fn new() -> Self {
        Self { parcels: Vec::new() }
    }

    pub fn push(&mut self, parcel: Parcel) {
        self.parcels.push(parcel);
    }

    pub fn len(&self) -> usize {
        self.parcels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parcels.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Parcel> {
        self.parcels.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parcel> {
        self.parcels.iter()
    }

    pub fn as_slice(&self) -> &[Parcel] {
        &self.parcels
    }

    /// First parcel whose attribute `key` equals the string `value`
    pub fn find_by_property(&self, key: &str, value: &str) -> Option<&Parcel> {
        self.parcels
            .iter()
            .find(|p| p.get_property(key).and_then(AttributeValue::as_str) == Some(value))
    }

}

impl FromIterator<Parcel> for ParcelCollection {
    fn from_iter<I: IntoIterator<Item = Parcel>>(iter: I) -> Self {
        Self {
            parcels: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for ParcelCollection {
    type Item = Parcel;
    type IntoIter = std::vec::IntoIter<Parcel>;

    fn into_iter(self) -> Self::IntoIter {
        self.parcels.into_iter()
    }
}
