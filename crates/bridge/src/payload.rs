//! JSON contract for arguments and results crossing the bridge.
//!
//! A payload is a string-keyed JSON object. The absence of a payload is not
//! the same thing as an empty object: `None` travels as the `null` literal and
//! comes back as `None`, while `{}` comes back as `Some` of an empty map.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::CodecError;

pub type Payload = serde_json::Map<String, Value>;

/// Encode an optional payload to its JSON text.
pub fn encode(payload: Option<&Payload>) -> Result<String, CodecError> {
    serde_json::to_string(&payload).map_err(|err| CodecError::Encode(err.to_string()))
}

/// Decode JSON text into an optional payload. `null` decodes to `None`; any
/// other non-object value is a decode error.
pub fn decode(text: &str) -> Result<Option<Payload>, CodecError> {
    let value: Value =
        serde_json::from_str(text).map_err(|err| CodecError::Decode(err.to_string()))?;
    match value {
        Value::Null => Ok(None),
        Value::Object(map) => Ok(Some(map)),
        other => Err(CodecError::Decode(format!(
            "expected an object or null, found {}",
            kind(&other)
        ))),
    }
}

/// Convert a typed value into a payload. The value must serialize to a JSON
/// object.
pub fn to_payload<T: Serialize + ?Sized>(value: &T) -> Result<Payload, CodecError> {
    match serde_json::to_value(value).map_err(|err| CodecError::Encode(err.to_string()))? {
        Value::Object(map) => Ok(map),
        other => Err(CodecError::Encode(format!(
            "expected an object, found {}",
            kind(&other)
        ))),
    }
}

/// Convert an optional payload into a typed value. An absent payload is
/// presented to the deserializer as `null`, so `Option<T>` and `()` accept it.
pub fn from_payload<T: DeserializeOwned>(payload: Option<Payload>) -> Result<T, CodecError> {
    let value = payload.map(Value::Object).unwrap_or(Value::Null);
    serde_json::from_value(value).map_err(|err| CodecError::Decode(err.to_string()))
}

pub(crate) fn to_value(payload: &Option<Payload>) -> Value {
    payload.clone().map(Value::Object).unwrap_or(Value::Null)
}

pub(crate) fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;
    use std::collections::HashMap;

    fn object(value: Value) -> Payload {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn mixed_arguments_survive_a_round_trip() {
        let args = object(json!({"a": 1, "b": [true, null, "x"]}));
        let text = encode(Some(&args)).expect("encode");
        assert_eq!(decode(&text).expect("decode"), Some(args));
    }

    #[test]
    fn absent_payload_is_null_not_empty_object() {
        assert_eq!(encode(None).expect("encode"), "null");
        assert_eq!(decode("null").expect("decode"), None);
        assert_eq!(decode("{}").expect("decode"), Some(Payload::new()));
        assert_eq!(encode(Some(&Payload::new())).expect("encode"), "{}");
    }

    #[test]
    fn non_object_text_is_a_decode_error() {
        assert!(matches!(decode("[1, 2]"), Err(CodecError::Decode(_))));
        assert!(matches!(decode("{\"a\":"), Err(CodecError::Decode(_))));
    }

    #[test]
    fn typed_values_convert_both_ways() {
        #[derive(Debug, PartialEq, Serialize, Deserialize)]
        struct Ping {
            count: u32,
            label: String,
        }

        let ping = Ping {
            count: 3,
            label: "hi".to_string(),
        };
        let payload = to_payload(&ping).expect("to payload");
        assert_eq!(payload.get("count"), Some(&json!(3)));
        let back: Ping = from_payload(Some(payload)).expect("from payload");
        assert_eq!(back, ping);

        let missing: Option<Ping> = from_payload(None).expect("absent");
        assert_eq!(missing, None);
    }

    #[test]
    fn unencodable_values_are_encode_errors() {
        assert!(matches!(to_payload(&vec![1, 2]), Err(CodecError::Encode(_))));

        let mut tuple_keys = HashMap::new();
        tuple_keys.insert((1, 2), "x");
        assert!(matches!(to_payload(&tuple_keys), Err(CodecError::Encode(_))));
    }
}
