//! Free-form `settings` maps carried by strategy descriptors

use crate::error::{SubmitResult, SubmitterError};

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Named fields attached to a submitter or transformer descriptor
pub type StrategySettings = Map<String, Value>;

/// Look up a required field. Null and empty strings count as absent.
pub fn require_param<'a>(
    settings: Option<&'a StrategySettings>,
    kind: &'static str,
    field: &'static str,
) -> SubmitResult<&'a Value> {
    optional_param(settings, field).ok_or(SubmitterError::MissingParameter { kind, field })
}

/// Look up an optional field. Null and empty strings count as absent.
pub fn optional_param<'a>(
    settings: Option<&'a StrategySettings>,
    field: &str,
) -> Option<&'a Value> {
    settings
        .and_then(|s| s.get(field))
        .filter(|v| !v.is_null() && v.as_str() != Some(""))
}

/// Deserialize a field value into its typed form
pub fn parse_param<T: DeserializeOwned>(
    value: &Value,
    kind: &'static str,
    field: &'static str,
) -> SubmitResult<T> {
    serde_json::from_value(value.clone()).map_err(|e| SubmitterError::InvalidParameter {
        kind,
        field,
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::types::Address;
    use serde_json::json;

    fn settings(value: Value) -> StrategySettings {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_absent_null_and_empty_are_missing() {
        let s = settings(json!({ "a": null, "b": "" }));
        for field in ["a", "b", "c"] {
            assert!(optional_param(Some(&s), field).is_none());
        }
        assert!(optional_param(None, "a").is_none());

        let err = require_param(Some(&s), "Kind", "b").unwrap_err();
        assert_eq!(err.missing_field(), Some("b"));
    }

    #[test]
    fn test_parse_address() {
        let s = settings(json!({ "addr": "0x000000000000000000000000000000000000dEaD" }));
        let value = require_param(Some(&s), "Kind", "addr").unwrap();
        let addr: Address = parse_param(value, "Kind", "addr").unwrap();
        assert_eq!(addr.to_low_u64_be(), 0xdead);

        let bad = json!("0x1234");
        let err = parse_param::<Address>(&bad, "Kind", "addr").unwrap_err();
        assert!(matches!(err, SubmitterError::InvalidParameter { field: "addr", .. }));
    }
}
