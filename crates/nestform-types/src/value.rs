use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::EntityModel;

/// Store-assigned record identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(i64);

impl RecordId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for RecordId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl FromStr for RecordId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<i64>().map(Self)
    }
}

/// A cleaned field value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum FieldValue {
    #[default]
    Null,
    Boolean(bool),
    Integer(i64),
    Text(String),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// The raw string a browser would post for this value.
    ///
    /// `None` means the key is absent from the submission (null values and
    /// unchecked checkboxes).
    pub fn as_raw(&self) -> Option<String> {
        match self {
            FieldValue::Null => None,
            FieldValue::Boolean(true) => Some("on".to_string()),
            FieldValue::Boolean(false) => None,
            FieldValue::Integer(n) => Some(n.to_string()),
            FieldValue::Text(s) => Some(s.clone()),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => Ok(()),
            FieldValue::Boolean(b) => write!(f, "{}", b),
            FieldValue::Integer(n) => write!(f, "{}", n),
            FieldValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        FieldValue::Integer(n)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Boolean(b)
    }
}

/// Field name to value mapping, ordered for stable output
pub type Fields = BTreeMap<String, FieldValue>;

/// One record of an [`EntityModel`], persisted or not.
///
/// The parent link is kept outside `fields` so that it can be threaded
/// from the parent's freshly assigned identifier right before the write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    pub model: String,
    pub id: Option<RecordId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<RecordId>,
    pub fields: Fields,
}

impl Instance {
    /// A blank, unsaved instance with every declared field set to null.
    pub fn new(model: &EntityModel) -> Self {
        let fields = model
            .fields
            .iter()
            .map(|f| (f.name.clone(), FieldValue::Null))
            .collect();

        Self {
            model: model.name.clone(),
            id: None,
            parent_id: None,
            fields,
        }
    }

    pub fn with_parent(mut self, parent_id: Option<RecordId>) -> Self {
        self.parent_id = parent_id;
        self
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    pub fn field(&self, name: &str) -> &FieldValue {
        const NULL: &FieldValue = &FieldValue::Null;
        self.fields.get(name).unwrap_or(NULL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_id_parses_trimmed_integers() {
        assert_eq!(" 42 ".parse::<RecordId>().unwrap(), RecordId::new(42));
        assert!("abc".parse::<RecordId>().is_err());
        assert!("".parse::<RecordId>().is_err());
    }

    #[test]
    fn test_field_value_raw_form() {
        assert_eq!(FieldValue::Null.as_raw(), None);
        assert_eq!(FieldValue::Boolean(true).as_raw().as_deref(), Some("on"));
        assert_eq!(FieldValue::Boolean(false).as_raw(), None);
        assert_eq!(FieldValue::Integer(-3).as_raw().as_deref(), Some("-3"));
        assert_eq!(FieldValue::from("x").as_raw().as_deref(), Some("x"));
    }

    #[test]
    fn test_field_value_untagged_json() {
        let fields: Fields = serde_json::from_str(r#"{"a":"x","b":3,"c":null,"d":true}"#).unwrap();
        assert_eq!(fields["a"], FieldValue::from("x"));
        assert_eq!(fields["b"], FieldValue::Integer(3));
        assert_eq!(fields["c"], FieldValue::Null);
        assert_eq!(fields["d"], FieldValue::Boolean(true));
    }
}
