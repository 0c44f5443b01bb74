//! Coercion of method parameters into form field strings.

use std::collections::BTreeMap;

use serde_json::Value;

/// Converts one parameter value into its wire string.
///
/// Returns `None` when the key should be left out of the request: `null`,
/// the empty string and the empty sequence. `null` elements of a sequence are
/// skipped, so a sequence holding only `null`s is omitted as well.
pub fn stringify_value(value: &Value) -> Option<String> {
    let text = match value {
        Value::Null => return None,
        Value::Array(items) => items
            .iter()
            .filter_map(stringify_scalar)
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => value.to_string(),
        scalar => stringify_scalar(scalar)?,
    };
    (!text.is_empty()).then_some(text)
}

/// Applies [`stringify_value`] to a whole mapping, dropping omitted keys.
pub fn stringify_values(params: &BTreeMap<String, Value>) -> BTreeMap<String, String> {
    params
        .iter()
        .filter_map(|(key, value)| stringify_value(value).map(|text| (key.clone(), text)))
        .collect()
}

fn stringify_scalar(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Bool(flag) => Some(if *flag { "1" } else { "0" }.to_string()),
        Value::Number(number) => Some(number.to_string()),
        Value::String(text) => Some(text.clone()),
        Value::Array(_) | Value::Object(_) => Some(value.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn booleans_become_digits() {
        assert_eq!(stringify_value(&json!(true)).as_deref(), Some("1"));
        assert_eq!(stringify_value(&json!(false)).as_deref(), Some("0"));
    }

    #[test]
    fn sequences_are_comma_joined() {
        assert_eq!(stringify_value(&json!([1, 2, 3])).as_deref(), Some("1,2,3"));
        assert_eq!(
            stringify_value(&json!(["photo", "video"])).as_deref(),
            Some("photo,video")
        );
        assert_eq!(stringify_value(&json!([true, false])).as_deref(), Some("1,0"));
    }

    #[test]
    fn null_elements_are_skipped_in_sequences() {
        assert_eq!(stringify_value(&json!([null, 1])).as_deref(), Some("1"));
        assert_eq!(stringify_value(&json!([1, null, 3])).as_deref(), Some("1,3"));
        assert_eq!(stringify_value(&json!([null])), None);
    }

    #[test]
    fn mappings_become_compact_json() {
        assert_eq!(
            stringify_value(&json!({"a": 1, "b": [1, 2]})).as_deref(),
            Some(r#"{"a":1,"b":[1,2]}"#)
        );
    }

    #[test]
    fn empty_values_are_omitted() {
        assert_eq!(stringify_value(&Value::Null), None);
        assert_eq!(stringify_value(&json!("")), None);
        assert_eq!(stringify_value(&json!([])), None);
    }

    #[test]
    fn scalars_use_natural_representation() {
        assert_eq!(stringify_value(&json!(42)).as_deref(), Some("42"));
        assert_eq!(stringify_value(&json!(-1.5)).as_deref(), Some("-1.5"));
        assert_eq!(stringify_value(&json!("durov")).as_deref(), Some("durov"));
    }

    #[test]
    fn whole_mapping_drops_omitted_keys() {
        let mut params = BTreeMap::new();
        params.insert("user_ids".to_string(), json!([1, 2]));
        params.insert("fields".to_string(), Value::Null);
        params.insert("extended".to_string(), json!(true));

        let encoded = stringify_values(&params);
        assert_eq!(encoded.len(), 2);
        assert_eq!(encoded["user_ids"], "1,2");
        assert_eq!(encoded["extended"], "1");
        assert!(!encoded.contains_key("fields"));
    }
}
