//! Embedded-record shape normalization
//!
//! A foreign-key embed can come back as an object, a list (usually of one),
//! an empty list or `null`. Rows decode embeds through [`embedded`] so model
//! types only ever see `Option<T>`.

use serde::{Deserialize, Deserializer};

/// Either a bare record or a list of them
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    /// The record, or the first of the list
    pub fn into_first(self) -> Option<T> {
        match self {
            OneOrMany::One(value) => Some(value),
            OneOrMany::Many(values) => values.into_iter().next(),
        }
    }
}

/// `deserialize_with` helper collapsing any embed shape to `Option<T>`.
///
/// Pair with `#[serde(default)]` so an omitted key also reads as `None`.
///
/// # Errors
/// If the value is none of object, list or null, or its items fail to decode.
pub fn embedded<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let raw: Option<OneOrMany<T>> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(OneOrMany::into_first))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use riskdesk_model::NamedRef;

    #[derive(Debug, Deserialize)]
    struct Row {
        #[serde(default, deserialize_with = "embedded")]
        hazard: Option<NamedRef>,
    }

    fn hazard(json: &str) -> Option<NamedRef> {
        serde_json::from_str::<Row>(json).unwrap().hazard
    }

    #[test]
    fn object_list_and_null_all_normalize() {
        let expected = Some(NamedRef::new("Noise"));
        assert_eq!(hazard(r#"{"hazard":{"name":"Noise"}}"#), expected);
        assert_eq!(hazard(r#"{"hazard":[{"name":"Noise"}]}"#), expected);
        assert_eq!(hazard(r#"{"hazard":[]}"#), None);
        assert_eq!(hazard(r#"{"hazard":null}"#), None);
        assert_eq!(hazard("{}"), None);
    }

    #[test]
    fn scalar_embed_is_rejected() {
        assert!(serde_json::from_str::<Row>(r#"{"hazard":"Noise"}"#).is_err());
    }
}
