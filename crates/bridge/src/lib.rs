//! Bidirectional call bridge between a native host and a web runtime
//! embedded in it.
//!
//! The web side calls named native actions grouped into actions sets; native
//! code calls web actions and gets the answer back through a continuation.
//! Everything native sends to the web side goes through one outbound channel
//! that the host drains into its web view.

pub mod bridge;
pub mod command;
pub mod config;
mod correlator;
pub mod diagnostics;
pub mod dispatcher;
pub mod error;
pub mod gate;
pub mod message;
pub mod outbound;
pub mod payload;
pub mod registry;
pub mod sink;
#[cfg(feature = "webview")]
pub mod webview;

pub use bridge::{Bridge, BridgeBuilder, ReloadHook};
pub use command::Command;
pub use config::BridgeConfig;
pub use correlator::{CallId, Continuation, FIRST_CALL_ID, WebCall};
pub use diagnostics::{Diagnostic, DiagnosticHook};
pub use dispatcher::NativeCall;
pub use error::{CodecError, ConfigError, RegistrationError, RouteError, WebCallError};
pub use message::{InboundMessage, ScriptError};
pub use outbound::{OutboundReceiver, OutboundSender};
pub use payload::Payload;
pub use registry::{Action, ActionRegistry, ActionsSet};
pub use sink::ResultSink;
