use serde::Deserialize;
use serde_json::Value;

use crate::error::CodecError;
use crate::payload::Payload;

/// A message posted by the web side, discriminated by `messageType`.
///
/// Missing `actionArgs`, `result` and `error` fields read the same as an
/// explicit `null`. For `onWebResult` this is deliberately more lenient than
/// requiring the `error` key, so pages that omit it still resolve.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "messageType", rename_all = "camelCase")]
pub enum InboundMessage {
    #[serde(rename_all = "camelCase")]
    CallNative {
        action_id: i64,
        actions_set_name: String,
        action_name: String,
        #[serde(default)]
        action_args: Option<Payload>,
    },
    #[serde(rename_all = "camelCase")]
    OnWebResult {
        action_id: u64,
        #[serde(default)]
        result: Option<Payload>,
        #[serde(default)]
        error: Option<String>,
    },
    OnError {
        error: ScriptError,
    },
    Reload,
    WebViewInitialized,
}

/// An uncaught error reported by the page.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ScriptError {
    pub message: String,
    pub url: String,
    pub stack: String,
}

impl InboundMessage {
    pub fn parse(text: &str) -> Result<Self, CodecError> {
        serde_json::from_str(text).map_err(|err| CodecError::Decode(err.to_string()))
    }

    pub fn from_value(value: Value) -> Result<Self, CodecError> {
        serde_json::from_value(value).map_err(|err| CodecError::Decode(err.to_string()))
    }

    pub fn message_type(&self) -> &'static str {
        match self {
            InboundMessage::CallNative { .. } => "callNative",
            InboundMessage::OnWebResult { .. } => "onWebResult",
            InboundMessage::OnError { .. } => "onError",
            InboundMessage::Reload => "reload",
            InboundMessage::WebViewInitialized => "webViewInitialized",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn call_native_keeps_null_and_empty_args_apart() {
        let null_args = InboundMessage::parse(
            r#"{"messageType":"callNative","actionId":7,"actionsSetName":"demo","actionName":"echo","actionArgs":null}"#,
        )
        .expect("null args");
        let empty_args = InboundMessage::parse(
            r#"{"messageType":"callNative","actionId":7,"actionsSetName":"demo","actionName":"echo","actionArgs":{}}"#,
        )
        .expect("empty args");
        let missing_args = InboundMessage::parse(
            r#"{"messageType":"callNative","actionId":7,"actionsSetName":"demo","actionName":"echo"}"#,
        )
        .expect("missing args");

        assert!(matches!(
            null_args,
            InboundMessage::CallNative { action_args: None, .. }
        ));
        assert!(matches!(
            empty_args,
            InboundMessage::CallNative { action_args: Some(ref args), .. } if args.is_empty()
        ));
        assert_eq!(missing_args, null_args);
    }

    #[test]
    fn on_web_result_variants() {
        let resolved = InboundMessage::from_value(json!({
            "messageType": "onWebResult",
            "actionId": 0,
            "result": {"pong": true},
            "error": null,
        }))
        .expect("resolved");
        assert_eq!(
            resolved,
            InboundMessage::OnWebResult {
                action_id: 0,
                result: json!({"pong": true}).as_object().cloned(),
                error: None,
            }
        );

        let failed = InboundMessage::from_value(json!({
            "messageType": "onWebResult",
            "actionId": 1,
            "result": null,
            "error": "boom",
        }))
        .expect("failed");
        assert_eq!(failed.message_type(), "onWebResult");
        assert!(matches!(
            failed,
            InboundMessage::OnWebResult { error: Some(ref e), .. } if e == "boom"
        ));
    }

    #[test]
    fn on_web_result_without_error_key_resolves() {
        let message = InboundMessage::parse(
            r#"{"messageType":"onWebResult","actionId":2,"result":{"ok":true}}"#,
        )
        .expect("missing error key");
        assert_eq!(
            message,
            InboundMessage::OnWebResult {
                action_id: 2,
                result: json!({"ok": true}).as_object().cloned(),
                error: None,
            }
        );
    }

    #[test]
    fn type_mismatches_are_decode_errors() {
        let cases = [
            json!({"messageType": "onWebResult", "actionId": 1, "error": {"code": 3}}),
            json!({"messageType": "onWebResult", "actionId": "1"}),
            json!({"messageType": "onWebResult", "actionId": 1, "result": [1]}),
            json!({"messageType": "callNative", "actionId": 1, "actionsSetName": "demo"}),
            json!({"messageType": "onError", "error": {"message": "x", "url": "y"}}),
            json!({"messageType": "somethingElse"}),
            json!({"actionId": 1}),
            json!("callNative"),
        ];
        for case in cases {
            assert!(
                matches!(InboundMessage::from_value(case.clone()), Err(CodecError::Decode(_))),
                "accepted {}",
                case
            );
        }
        assert!(matches!(
            InboundMessage::parse("{not json"),
            Err(CodecError::Decode(_))
        ));
    }

    #[test]
    fn control_signals_and_script_errors() {
        assert_eq!(
            InboundMessage::parse(r#"{"messageType":"webViewInitialized"}"#).expect("init"),
            InboundMessage::WebViewInitialized
        );
        assert_eq!(
            InboundMessage::parse(r#"{"messageType":"reload"}"#).expect("reload"),
            InboundMessage::Reload
        );
        let error = InboundMessage::from_value(json!({
            "messageType": "onError",
            "error": {"message": "x is undefined", "url": "app.js", "stack": "at f (app.js:1)"},
        }))
        .expect("onError");
        assert_eq!(
            error,
            InboundMessage::OnError {
                error: ScriptError {
                    message: "x is undefined".to_string(),
                    url: "app.js".to_string(),
                    stack: "at f (app.js:1)".to_string(),
                }
            }
        );
    }
}
