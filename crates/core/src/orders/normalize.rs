//! Normalisation of repeated elements.
//!
//! The order API renders a repeated element as an array when it occurs more
//! than once and as a bare object when it occurs exactly once; an element
//! with no occurrences shows up as missing, `null`, an empty string or an
//! empty object. `OneOrMany` captures all of those shapes and `into_vec` is
//! the single place they collapse into a sequence.

use serde::de::{self, DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::Value;

/// A repeated element in the shape the collaborator happened to return.
#[derive(Debug, Clone, PartialEq)]
pub enum OneOrMany<T> {
    None,
    One(T),
    Many(Vec<T>),
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        OneOrMany::None
    }
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::None => Vec::new(),
            OneOrMany::One(item) => vec![item],
            OneOrMany::Many(items) => items,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            OneOrMany::None => 0,
            OneOrMany::One(_) => 1,
            OneOrMany::Many(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn map<U, F: FnMut(T) -> U>(self, mut f: F) -> OneOrMany<U> {
        match self {
            OneOrMany::None => OneOrMany::None,
            OneOrMany::One(item) => OneOrMany::One(f(item)),
            OneOrMany::Many(items) => OneOrMany::Many(items.into_iter().map(f).collect()),
        }
    }

    pub fn try_map<U, E, F: FnMut(T) -> Result<U, E>>(self, mut f: F) -> Result<OneOrMany<U>, E> {
        Ok(match self {
            OneOrMany::None => OneOrMany::None,
            OneOrMany::One(item) => OneOrMany::One(f(item)?),
            OneOrMany::Many(items) => {
                OneOrMany::Many(items.into_iter().map(f).collect::<Result<Vec<U>, E>>()?)
            }
        })
    }
}

/// Builds the shape the collaborator would have produced for `items`.
impl<T> From<Vec<T>> for OneOrMany<T> {
    fn from(mut items: Vec<T>) -> Self {
        match items.len() {
            0 => OneOrMany::None,
            1 => items.pop().map_or(OneOrMany::None, OneOrMany::One),
            _ => OneOrMany::Many(items),
        }
    }
}

impl<T: DeserializeOwned> OneOrMany<T> {
    /// Decodes a loosely shaped JSON node.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        match value {
            Value::Null => Ok(OneOrMany::None),
            Value::String(ref s) if s.trim().is_empty() => Ok(OneOrMany::None),
            Value::Object(ref map) if map.is_empty() => Ok(OneOrMany::None),
            Value::Array(items) => items
                .into_iter()
                .map(serde_json::from_value)
                .collect::<Result<Vec<T>, _>>()
                .map(OneOrMany::Many),
            other => serde_json::from_value(other).map(OneOrMany::One),
        }
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for OneOrMany<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        OneOrMany::from_value(value).map_err(de::Error::custom)
    }
}
