use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::command::Command;
use crate::outbound::OutboundSender;

/// Anomalies that are not correlated to a waiting caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Diagnostic {
    #[error("Cannot find action '{call_id}' callback.")]
    UnknownCall { call_id: u64 },

    #[error("Cannot process script message: {reason}")]
    MalformedMessage { reason: String },

    #[error("Error when calling '{namespace}:{action}': {message}")]
    ActionFailed {
        namespace: String,
        action: String,
        message: String,
    },

    #[error("Native Action '{namespace}:{action}' settled its result more than once.")]
    SinkReused { namespace: String, action: String },

    #[error("Native Action '{namespace}:{action}' dropped its result without completing.")]
    SinkDropped { namespace: String, action: String },

    #[error("JS Error: {message} ({url})\n{stack}")]
    ScriptError {
        message: String,
        url: String,
        stack: String,
    },

    #[error("Call {call_id} to '{namespace}:{action}' expired after {waited_ms}ms.")]
    CallExpired {
        call_id: u64,
        namespace: String,
        action: String,
        waited_ms: u64,
    },
}

pub type DiagnosticHook = Arc<dyn Fn(&Diagnostic) + Send + Sync>;

/// Fans each diagnostic out to the log, the host hook, and optionally the web
/// side as `errorNative`.
#[derive(Clone)]
pub struct Diagnostics {
    hook: Option<DiagnosticHook>,
    echo: Option<OutboundSender>,
}

impl Diagnostics {
    pub fn new(hook: Option<DiagnosticHook>, echo: Option<OutboundSender>) -> Self {
        Self { hook, echo }
    }

    pub fn report(&self, diagnostic: Diagnostic) {
        match &diagnostic {
            Diagnostic::ScriptError { .. } | Diagnostic::ActionFailed { .. } => {
                tracing::error!("{}", diagnostic)
            }
            _ => tracing::warn!("{}", diagnostic),
        }

        if let Some(hook) = &self.hook {
            hook(&diagnostic);
        }

        if let Some(outbound) = &self.echo {
            outbound.send(Command::ErrorNative {
                message: diagnostic.to_string(),
            });
        }
    }
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagnostics")
            .field("hook", &self.hook.is_some())
            .field("echo", &self.echo.is_some())
            .finish()
    }
}
