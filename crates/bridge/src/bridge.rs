use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::oneshot;

use crate::config::BridgeConfig;
use crate::correlator::{CallId, Continuation, Correlator, WebCall};
use crate::diagnostics::{Diagnostic, DiagnosticHook, Diagnostics};
use crate::dispatcher::{Dispatcher, NativeCall, Replier};
use crate::error::{RegistrationError, WebCallError};
use crate::gate::{Admission, ReadinessGate};
use crate::message::InboundMessage;
use crate::outbound::{self, OutboundReceiver, OutboundSender};
use crate::payload::{self, Payload};
use crate::registry::{Action, ActionRegistry, ActionsSet};

pub type ReloadHook = Arc<dyn Fn() + Send + Sync>;

/// Collects actions and hooks. Actions can only be added here, so the
/// registry is frozen by the time the bridge can dispatch anything.
#[derive(Default)]
pub struct BridgeBuilder {
    registry: ActionRegistry,
    config: BridgeConfig,
    diagnostic_hook: Option<DiagnosticHook>,
    reload_hook: Option<ReloadHook>,
}

impl BridgeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: BridgeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn actions_set(mut self, set: ActionsSet) -> Result<Self, RegistrationError> {
        self.registry.insert_set(set)?;
        Ok(self)
    }

    pub fn action(
        mut self,
        namespace: &str,
        name: &str,
        action: Action,
    ) -> Result<Self, RegistrationError> {
        self.registry.register(namespace, name, action)?;
        Ok(self)
    }

    /// Called for every diagnostic, after it has been logged.
    pub fn on_diagnostic<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Diagnostic) + Send + Sync + 'static,
    {
        self.diagnostic_hook = Some(Arc::new(hook));
        self
    }

    /// Called when the page asks the host to reload it.
    pub fn on_reload<F>(mut self, hook: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.reload_hook = Some(Arc::new(hook));
        self
    }

    /// Freeze the registry and hand back the bridge together with the
    /// receiving end of its outbound channel.
    pub fn build(self) -> (Bridge, OutboundReceiver) {
        let (outbound, receiver) = outbound::channel(self.config.object_name());
        let echo = self.config.echo_diagnostics().then(|| outbound.clone());
        let diagnostics = Diagnostics::new(self.diagnostic_hook, echo);
        let replier = Replier::new(outbound.clone(), diagnostics.clone());
        let dispatcher = Dispatcher::new(Arc::new(self.registry), replier);

        tracing::debug!(
            "Bridge built for '{}' with namespaces: {:?}",
            self.config.object_name(),
            dispatcher.registry().namespaces().collect::<Vec<_>>()
        );

        let bridge = Bridge {
            inner: Arc::new(Inner {
                dispatcher,
                outbound,
                diagnostics,
                reload: self.reload_hook,
                call_timeout: self.config.call_timeout(),
                exchange: Mutex::new(Exchange {
                    gate: ReadinessGate::new(),
                    calls: Correlator::new(),
                }),
            }),
        };
        (bridge, receiver)
    }
}

/// One link between the native host and one web context. Cheap to clone;
/// clones share state.
#[derive(Clone)]
pub struct Bridge {
    inner: Arc<Inner>,
}

struct Inner {
    dispatcher: Dispatcher,
    outbound: OutboundSender,
    diagnostics: Diagnostics,
    reload: Option<ReloadHook>,
    call_timeout: Option<Duration>,
    /// Readiness and correlation state. Commands for native to web calls are
    /// queued while this is held, so ids go out in allocation order.
    exchange: Mutex<Exchange>,
}

struct Exchange {
    gate: ReadinessGate<WebCall>,
    calls: Correlator,
}

type Failed = (Continuation, WebCallError);

impl Bridge {
    pub fn builder() -> BridgeBuilder {
        BridgeBuilder::new()
    }

    /// Entry point for raw script message bodies.
    pub fn handle_message(&self, text: &str) {
        match InboundMessage::parse(text) {
            Ok(message) => self.handle(message),
            Err(err) => self.report_malformed(err.to_string()),
        }
    }

    /// Entry point for script messages the host already holds as JSON.
    pub fn handle_value(&self, value: Value) {
        match InboundMessage::from_value(value) {
            Ok(message) => self.handle(message),
            Err(err) => self.report_malformed(err.to_string()),
        }
    }

    pub fn handle(&self, message: InboundMessage) {
        tracing::debug!("Inbound {}", message.message_type());
        match message {
            InboundMessage::CallNative {
                action_id,
                actions_set_name,
                action_name,
                action_args,
            } => self.call_native(NativeCall {
                call_id: action_id,
                namespace: actions_set_name,
                action: action_name,
                args: action_args,
            }),
            InboundMessage::OnWebResult {
                action_id,
                result,
                error,
            } => self.deliver_result(action_id, result, error),
            InboundMessage::OnError { error } => {
                self.inner.diagnostics.report(Diagnostic::ScriptError {
                    message: error.message,
                    url: error.url,
                    stack: error.stack,
                })
            }
            InboundMessage::Reload => match &self.inner.reload {
                Some(reload) => reload(),
                None => tracing::debug!("Reload requested but no reload hook is installed"),
            },
            InboundMessage::WebViewInitialized => self.web_view_initialized(),
        }
    }

    pub fn call_native(&self, call: NativeCall) {
        self.inner.dispatcher.dispatch(call);
    }

    /// Call a web action. Never fails at the call site: the outcome arrives
    /// through exactly one of the two callbacks.
    pub fn call_web<R, E>(
        &self,
        namespace: &str,
        action: &str,
        args: Option<Payload>,
        on_result: R,
        on_error: E,
    ) where
        R: FnOnce(Option<Payload>) + Send + 'static,
        E: FnOnce(WebCallError) + Send + 'static,
    {
        self.submit(WebCall::new(
            namespace,
            action,
            args,
            Continuation::callbacks(on_result, on_error),
        ));
    }

    /// Like [`Bridge::call_web`] with typed arguments. If the arguments do
    /// not encode to a JSON object, `on_error` runs before this returns and no
    /// call id is used.
    pub fn call_web_with<T, R, E>(
        &self,
        namespace: &str,
        action: &str,
        args: &T,
        on_result: R,
        on_error: E,
    ) where
        T: Serialize + ?Sized,
        R: FnOnce(Option<Payload>) + Send + 'static,
        E: FnOnce(WebCallError) + Send + 'static,
    {
        match payload::to_payload(args) {
            Ok(args) => self.call_web(namespace, action, Some(args), on_result, on_error),
            Err(err) => {
                tracing::warn!("Cannot encode arguments for '{}:{}': {}", namespace, action, err);
                on_error(WebCallError::Encode(err));
            }
        }
    }

    pub async fn call_web_async(
        &self,
        namespace: &str,
        action: &str,
        args: Option<Payload>,
    ) -> Result<Option<Payload>, WebCallError> {
        let (tx, rx) = oneshot::channel();
        self.submit(WebCall::new(
            namespace,
            action,
            args,
            Continuation::Channel(tx),
        ));
        match rx.await {
            Ok(outcome) => outcome,
            Err(_) => Err(WebCallError::Dropped),
        }
    }

    /// Route an `onWebResult` to its waiting caller. The entry is removed
    /// before the continuation runs, so a continuation that calls back into
    /// the bridge never sees it.
    pub fn deliver_result(&self, call_id: CallId, result: Option<Payload>, error: Option<String>) {
        let outstanding = self.inner.exchange.lock().calls.settle(call_id);
        let Some(outstanding) = outstanding else {
            self.inner
                .diagnostics
                .report(Diagnostic::UnknownCall { call_id });
            return;
        };

        match error {
            Some(error) => outstanding.continuation.reject(WebCallError::Remote(error)),
            None => outstanding.continuation.resolve(result),
        }
    }

    /// The web side finished booting. Flushes queued calls in the order they
    /// were made; later signals are ignored.
    pub fn web_view_initialized(&self) {
        let failed: Vec<Failed> = {
            let mut exchange = self.inner.exchange.lock();
            let Some(backlog) = exchange.gate.open() else {
                tracing::debug!("Web view already initialized");
                return;
            };
            tracing::debug!("Web view initialized, flushing {} queued calls", backlog.len());
            backlog
                .into_iter()
                .filter_map(|call| transmit(&self.inner.outbound, &mut exchange, call))
                .collect()
        };

        for (continuation, error) in failed {
            continuation.reject(error);
        }
    }

    /// Reject calls older than the configured timeout. Does nothing when no
    /// timeout is configured.
    pub fn expire_stale(&self) -> usize {
        match self.inner.call_timeout {
            Some(timeout) => self.expire_older_than(timeout),
            None => 0,
        }
    }

    pub fn expire_older_than(&self, max_age: Duration) -> usize {
        let now = Instant::now();
        let expired = self.inner.exchange.lock().calls.expire(now, max_age);
        let count = expired.len();

        for (call_id, outstanding) in expired {
            let waited_ms = now
                .saturating_duration_since(outstanding.issued_at)
                .as_millis() as u64;
            self.inner.diagnostics.report(Diagnostic::CallExpired {
                call_id,
                namespace: outstanding.namespace.clone(),
                action: outstanding.action.clone(),
                waited_ms,
            });
            outstanding.continuation.reject(WebCallError::Expired {
                call_id,
                namespace: outstanding.namespace,
                action: outstanding.action,
                waited_ms,
            });
        }
        count
    }

    pub fn is_ready(&self) -> bool {
        self.inner.exchange.lock().gate.is_ready()
    }

    pub fn pending_len(&self) -> usize {
        self.inner.exchange.lock().gate.pending_len()
    }

    pub fn outstanding_len(&self) -> usize {
        self.inner.exchange.lock().calls.len()
    }

    pub fn call_timeout(&self) -> Option<Duration> {
        self.inner.call_timeout
    }

    fn submit(&self, call: WebCall) {
        let failed = {
            let mut exchange = self.inner.exchange.lock();
            match exchange.gate.admit(call) {
                Admission::Queued => {
                    tracing::debug!("Web view not ready, queued call");
                    None
                }
                Admission::Ready(call) => transmit(&self.inner.outbound, &mut exchange, call),
            }
        };

        if let Some((continuation, error)) = failed {
            continuation.reject(error);
        }
    }

    fn report_malformed(&self, reason: String) {
        self.inner
            .diagnostics
            .report(Diagnostic::MalformedMessage { reason });
    }
}

/// Issue `call` and queue its command. If the host has dropped the receiver
/// the entry is withdrawn and handed back for rejection outside the lock.
fn transmit(outbound: &OutboundSender, exchange: &mut Exchange, call: WebCall) -> Option<Failed> {
    let (call_id, command) = exchange.calls.issue(call, Instant::now());
    if outbound.send(command) {
        return None;
    }

    let outstanding = exchange.calls.settle(call_id)?;
    let error = WebCallError::ChannelClosed {
        namespace: outstanding.namespace,
        action: outstanding.action,
    };
    Some((outstanding.continuation, error))
}

impl fmt::Debug for Bridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let exchange = self.inner.exchange.lock();
        f.debug_struct("Bridge")
            .field("ready", &exchange.gate.is_ready())
            .field("pending", &exchange.gate.pending_len())
            .field("outstanding", &exchange.calls.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command;
    use serde_json::json;

    fn object(value: Value) -> Option<Payload> {
        value.as_object().cloned()
    }

    #[test]
    fn readiness_flushes_queued_call_and_result_reaches_caller() {
        let (bridge, mut rx) = Bridge::builder().build();
        let seen = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&seen);

        bridge.call_web(
            "demo",
            "ping",
            Some(Payload::new()),
            move |result| *slot.lock() = Some(result),
            |err| panic!("unexpected error {}", err),
        );
        assert!(rx.drain().is_empty());
        assert_eq!(bridge.pending_len(), 1);

        bridge.web_view_initialized();
        assert_eq!(
            rx.drain_scripts(),
            vec![r#"abNative.callWeb(0,"demo","ping",{})"#.to_string()]
        );

        bridge.deliver_result(0, object(json!({"pong": true})), None);
        assert_eq!(*seen.lock(), Some(object(json!({"pong": true}))));
        assert_eq!(bridge.outstanding_len(), 0);
    }

    #[test]
    fn closed_channel_rejects_instead_of_leaking() {
        let (bridge, rx) = Bridge::builder().build();
        drop(rx);
        bridge.web_view_initialized();

        let seen = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&seen);
        bridge.call_web("demo", "ping", None, |_| {}, move |err| *slot.lock() = Some(err));

        assert_eq!(
            *seen.lock(),
            Some(WebCallError::ChannelClosed {
                namespace: "demo".to_string(),
                action: "ping".to_string(),
            })
        );
        assert_eq!(bridge.outstanding_len(), 0);
    }

    #[test]
    fn expire_is_inert_without_timeout() {
        let (bridge, mut rx) = Bridge::builder().build();
        bridge.web_view_initialized();
        bridge.call_web("demo", "ping", None, |_| {}, |_| {});
        assert_eq!(bridge.expire_stale(), 0);
        assert_eq!(bridge.outstanding_len(), 1);
        assert!(matches!(rx.drain().as_slice(), [Command::CallWeb { .. }]));
    }
}
