use std::sync::Arc;

use crate::command::Command;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::outbound::OutboundSender;
use crate::payload::Payload;
use crate::registry::{Action, ActionRegistry};
use crate::sink::ResultSink;

/// A call the web side made into native code. The id is chosen by the web
/// side and echoed back untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct NativeCall {
    pub call_id: i64,
    pub namespace: String,
    pub action: String,
    pub args: Option<Payload>,
}

/// Emits the single correlated reply for a native call.
#[derive(Debug, Clone)]
pub(crate) struct Replier {
    outbound: OutboundSender,
    diagnostics: Diagnostics,
}

impl Replier {
    pub(crate) fn new(outbound: OutboundSender, diagnostics: Diagnostics) -> Self {
        Self {
            outbound,
            diagnostics,
        }
    }

    pub(crate) fn resolve(&self, call_id: i64, result: Option<Payload>) {
        self.outbound.send(Command::native_result(call_id, result));
    }

    /// Report a handler failure to the diagnostic sink and the caller.
    pub(crate) fn fail(&self, call_id: i64, namespace: &str, action: &str, cause: String) {
        let diagnostic = Diagnostic::ActionFailed {
            namespace: namespace.to_string(),
            action: action.to_string(),
            message: cause,
        };
        let message = diagnostic.to_string();
        self.diagnostics.report(diagnostic);
        self.outbound.send(Command::native_error(call_id, message));
    }

    pub(crate) fn reject(&self, call_id: i64, message: String) {
        self.outbound.send(Command::native_error(call_id, message));
    }

    pub(crate) fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }
}

#[derive(Debug)]
pub struct Dispatcher {
    registry: Arc<ActionRegistry>,
    replier: Replier,
}

impl Dispatcher {
    pub(crate) fn new(registry: Arc<ActionRegistry>, replier: Replier) -> Self {
        Self { registry, replier }
    }

    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    /// Route a native call to its handler. Direct actions reply before this
    /// returns; deferred actions reply whenever their sink is settled.
    pub fn dispatch(&self, call: NativeCall) {
        let NativeCall {
            call_id,
            namespace,
            action,
            args,
        } = call;

        let handler = match self.registry.lookup(&namespace, &action) {
            Ok(handler) => handler,
            Err(miss) => {
                tracing::warn!("Call {} rejected: {}", call_id, miss);
                self.replier.reject(call_id, miss.to_string());
                return;
            }
        };

        tracing::debug!("Dispatching native call {} to '{}:{}'", call_id, namespace, action);

        match handler {
            Action::Direct(handler) => match handler(args) {
                Ok(result) => self.replier.resolve(call_id, result),
                Err(err) => {
                    self.replier
                        .fail(call_id, &namespace, &action, format!("{:#}", err))
                }
            },
            Action::Deferred(handler) => {
                let sink = ResultSink::new(call_id, namespace, action, self.replier.clone());
                handler(args, sink);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outbound::{self, OutboundReceiver};
    use crate::registry::ActionsSet;
    use serde_json::json;

    fn dispatcher(set: ActionsSet) -> (Dispatcher, OutboundReceiver) {
        let mut registry = ActionRegistry::new();
        registry.insert_set(set).expect("set");
        let (tx, rx) = outbound::channel("abNative");
        let replier = Replier::new(tx, Diagnostics::new(None, None));
        (Dispatcher::new(Arc::new(registry), replier), rx)
    }

    fn call(call_id: i64, action: &str, args: Option<Payload>) -> NativeCall {
        NativeCall {
            call_id,
            namespace: "demo".to_string(),
            action: action.to_string(),
            args,
        }
    }

    #[test]
    fn direct_echo_replies_with_its_input() {
        let set = ActionsSet::new("demo")
            .add_native("echo", |args| Ok(args))
            .expect("echo");
        let (dispatcher, mut rx) = dispatcher(set);

        dispatcher.dispatch(call(7, "echo", json!({"x": 1}).as_object().cloned()));

        assert_eq!(
            rx.drain_scripts(),
            vec![r#"abNative.onNativeResult(7,{"x":1},null)"#.to_string()]
        );
    }

    #[test]
    fn missing_action_replies_with_error() {
        let set = ActionsSet::new("demo");
        let (dispatcher, mut rx) = dispatcher(set);

        dispatcher.dispatch(call(3, "missing", None));

        assert_eq!(
            rx.drain(),
            vec![Command::native_error(
                3,
                "Native Action 'demo:missing' not implemented."
            )]
        );
    }

    #[test]
    fn failing_handler_is_called_once_and_replies_with_error() {
        let calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let set = ActionsSet::new("demo")
            .add_native("boom", move |_| {
                counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                anyhow::bail!("disk full")
            })
            .expect("boom");
        let (dispatcher, mut rx) = dispatcher(set);

        dispatcher.dispatch(call(5, "boom", None));

        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert_eq!(
            rx.drain(),
            vec![Command::native_error(
                5,
                "Error when calling 'demo:boom': disk full"
            )]
        );
    }

    #[test]
    fn deferred_handler_replies_when_settled() {
        let parked = Arc::new(parking_lot::Mutex::new(None));
        let slot = Arc::clone(&parked);
        let set = ActionsSet::new("demo")
            .add_native_callback("later", move |_, sink| {
                *slot.lock() = Some(sink);
            })
            .expect("later");
        let (dispatcher, mut rx) = dispatcher(set);

        dispatcher.dispatch(call(11, "later", None));
        assert!(rx.drain().is_empty());

        let sink = parked.lock().take().expect("sink parked");
        sink.resolve(json!({"done": true}).as_object().cloned());

        assert_eq!(
            rx.drain_scripts(),
            vec![r#"abNative.onNativeResult(11,{"done":true},null)"#.to_string()]
        );
    }
}
