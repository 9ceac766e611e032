use serde_json::Value;
use std::collections::BTreeMap;

use crate::{Error, Result};

/// Submitted `name -> value` pairs of one request.
///
/// Repeated keys keep the last value, which is what a single-valued field
/// widget would see.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostedData {
    values: BTreeMap<String, String>,
}

impl PostedData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Decodes an `application/x-www-form-urlencoded` body.
    pub fn from_urlencoded(body: &str) -> Self {
        Self::from_pairs(
            url::form_urlencoded::parse(body.trim().as_bytes())
                .map(|(k, v)| (k.into_owned(), v.into_owned())),
        )
    }

    /// Decodes a flat JSON object.
    ///
    /// Strings and numbers are taken verbatim, `true` becomes `"on"` (a checked
    /// checkbox); `false` and `null` are treated as absent.
    pub fn from_json(body: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(body).map_err(|e| Error::PostedData(e.to_string()))?;
        Self::from_json_value(&value)
    }

    pub fn from_json_value(value: &Value) -> Result<Self> {
        let Value::Object(map) = value else {
            return Err(Error::PostedData(
                "expected a JSON object of field names to values".to_string(),
            ));
        };

        let mut data = Self::new();
        for (key, value) in map {
            match value {
                Value::String(s) => data.insert(key, s.clone()),
                Value::Number(n) => data.insert(key, n.to_string()),
                Value::Bool(true) => data.insert(key, "on"),
                Value::Bool(false) | Value::Null => {}
                Value::Array(_) | Value::Object(_) => {
                    return Err(Error::PostedData(format!(
                        "field '{}' must be a scalar value",
                        key
                    )));
                }
            }
        }
        Ok(data)
    }

    /// Guesses the body encoding: JSON objects start with `{`.
    pub fn parse(body: &str) -> Result<Self> {
        if body.trim_start().starts_with('{') {
            Self::from_json(body)
        } else {
            Ok(Self::from_urlencoded(body))
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.values.remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn to_urlencoded(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.iter())
            .finish()
    }
}

/// Checkbox truthiness as browsers and scripts submit it.
pub fn is_truthy(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "on" | "true" | "1" | "yes"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urlencoded_decoding() {
        let data = PostedData::from_urlencoded(
            "name=A&buildings-TOTAL_FORMS=1&buildings-0-street_name=Main+St&x=%C3%A9",
        );
        assert_eq!(data.get("name"), Some("A"));
        assert_eq!(data.get("buildings-0-street_name"), Some("Main St"));
        assert_eq!(data.get("x"), Some("é"));
        assert_eq!(data.len(), 4);
    }

    #[test]
    fn test_json_decoding() {
        let data = PostedData::from_json(
            r#"{"name": "A", "buildings-TOTAL_FORMS": 1, "buildings-0-DELETE": true, "gone": null, "off": false}"#,
        )
        .unwrap();
        assert_eq!(data.get("buildings-TOTAL_FORMS"), Some("1"));
        assert_eq!(data.get("buildings-0-DELETE"), Some("on"));
        assert!(!data.contains("gone"));
        assert!(!data.contains("off"));
    }

    #[test]
    fn test_json_rejects_nested_values() {
        let err = PostedData::from_json(r#"{"a": [1]}"#).unwrap_err();
        assert!(err.to_string().contains("'a' must be a scalar"));
        assert!(PostedData::from_json("[]").is_err());
    }

    #[test]
    fn test_parse_detects_encoding() {
        assert_eq!(
            PostedData::parse(r#" {"a":"b"}"#).unwrap(),
            PostedData::parse("a=b").unwrap()
        );
    }

    #[test]
    fn test_urlencoded_round_trip() {
        let data = PostedData::from_pairs([("a b", "c&d"), ("e", "")]);
        assert_eq!(PostedData::from_urlencoded(&data.to_urlencoded()), data);
    }

    #[test]
    fn test_truthiness() {
        assert!(is_truthy("on"));
        assert!(is_truthy("True"));
        assert!(is_truthy(" 1 "));
        assert!(!is_truthy(""));
        assert!(!is_truthy("off"));
    }
}
