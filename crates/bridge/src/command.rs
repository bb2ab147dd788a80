use serde_json::Value;

use crate::payload::{self, Payload};

/// A native to web command. Commands stay structured until the transport
/// renders them, so every argument is escaped once by the JSON encoder.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    CallWeb {
        call_id: u64,
        namespace: String,
        action: String,
        args: Option<Payload>,
    },
    OnNativeResult {
        call_id: i64,
        result: Option<Payload>,
        error: Option<String>,
    },
    ErrorNative {
        message: String,
    },
}

impl Command {
    pub fn native_result(call_id: i64, result: Option<Payload>) -> Self {
        Command::OnNativeResult {
            call_id,
            result,
            error: None,
        }
    }

    pub fn native_error(call_id: i64, message: impl Into<String>) -> Self {
        Command::OnNativeResult {
            call_id,
            result: None,
            error: Some(message.into()),
        }
    }

    pub fn operation(&self) -> &'static str {
        match self {
            Command::CallWeb { .. } => "callWeb",
            Command::OnNativeResult { .. } => "onNativeResult",
            Command::ErrorNative { .. } => "errorNative",
        }
    }

    pub fn arguments(&self) -> Vec<Value> {
        match self {
            Command::CallWeb {
                call_id,
                namespace,
                action,
                args,
            } => vec![
                Value::from(*call_id),
                Value::from(namespace.as_str()),
                Value::from(action.as_str()),
                payload::to_value(args),
            ],
            Command::OnNativeResult {
                call_id,
                result,
                error,
            } => vec![
                Value::from(*call_id),
                payload::to_value(result),
                error.as_deref().map(Value::from).unwrap_or(Value::Null),
            ],
            Command::ErrorNative { message } => vec![Value::from(message.as_str())],
        }
    }

    /// Render as a call on the web-side bridge object, e.g.
    /// `abNative.callWeb(0,"demo","ping",{})`.
    pub fn to_script(&self, object: &str) -> String {
        let arguments = self
            .arguments()
            .iter()
            .map(Value::to_string)
            .collect::<Vec<_>>()
            .join(",");
        format!("{}.{}({})", object, self.operation(), arguments)
    }
}
