use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::diagnostics::Diagnostic;
use crate::dispatcher::Replier;
use crate::payload::Payload;

/// One-shot completion handle given to deferred actions.
///
/// Clones share the same slot: the first `resolve` or `reject` is delivered,
/// later ones are reported as diagnostics and dropped. If every clone goes
/// away unsettled, the caller receives an error instead of waiting forever.
#[derive(Clone)]
pub struct ResultSink {
    state: Arc<SinkState>,
}

struct SinkState {
    call_id: i64,
    namespace: String,
    action: String,
    settled: AtomicBool,
    replier: Replier,
}

impl ResultSink {
    pub(crate) fn new(call_id: i64, namespace: String, action: String, replier: Replier) -> Self {
        Self {
            state: Arc::new(SinkState {
                call_id,
                namespace,
                action,
                settled: AtomicBool::new(false),
                replier,
            }),
        }
    }

    pub fn call_id(&self) -> i64 {
        self.state.call_id
    }

    pub fn is_settled(&self) -> bool {
        self.state.settled.load(Ordering::Acquire)
    }

    pub fn resolve(&self, result: Option<Payload>) {
        if self.state.claim() {
            self.state.replier.resolve(self.state.call_id, result);
        }
    }

    pub fn reject(&self, error: impl fmt::Display) {
        if self.state.claim() {
            let state = &self.state;
            state
                .replier
                .fail(state.call_id, &state.namespace, &state.action, error.to_string());
        }
    }
}

impl SinkState {
    fn claim(&self) -> bool {
        if self.settled.swap(true, Ordering::AcqRel) {
            self.replier.diagnostics().report(Diagnostic::SinkReused {
                namespace: self.namespace.clone(),
                action: self.action.clone(),
            });
            return false;
        }
        true
    }
}

impl Drop for SinkState {
    fn drop(&mut self) {
        if *self.settled.get_mut() {
            return;
        }
        let diagnostic = Diagnostic::SinkDropped {
            namespace: self.namespace.clone(),
            action: self.action.clone(),
        };
        let message = diagnostic.to_string();
        self.replier.diagnostics().report(diagnostic);
        self.replier.reject(self.call_id, message);
    }
}

impl fmt::Debug for ResultSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultSink")
            .field("call_id", &self.state.call_id)
            .field("namespace", &self.state.namespace)
            .field("action", &self.state.action)
            .field("settled", &self.is_settled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command;
    use crate::diagnostics::Diagnostics;
    use crate::outbound::{self, OutboundReceiver};
    use parking_lot::Mutex;

    fn sink(call_id: i64) -> (ResultSink, OutboundReceiver, Arc<Mutex<Vec<Diagnostic>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let hook_seen = Arc::clone(&seen);
        let (tx, rx) = outbound::channel("abNative");
        let diagnostics = Diagnostics::new(
            Some(Arc::new(move |d: &Diagnostic| hook_seen.lock().push(d.clone()))),
            None,
        );
        let replier = Replier::new(tx, diagnostics);
        (
            ResultSink::new(call_id, "demo".to_string(), "later".to_string(), replier),
            rx,
            seen,
        )
    }

    #[test]
    fn second_settlement_is_reported_not_delivered() {
        let (sink, mut rx, seen) = sink(2);
        let copy = sink.clone();

        sink.resolve(None);
        copy.reject("too late");
        sink.resolve(None);

        assert_eq!(rx.drain(), vec![Command::native_result(2, None)]);
        assert_eq!(
            *seen.lock(),
            vec![
                Diagnostic::SinkReused {
                    namespace: "demo".to_string(),
                    action: "later".to_string(),
                };
                2
            ]
        );
    }

    #[test]
    fn rejection_carries_the_cause() {
        let (sink, mut rx, _seen) = sink(4);
        sink.reject("timeout talking to device");
        assert_eq!(
            rx.drain(),
            vec![Command::native_error(
                4,
                "Error when calling 'demo:later': timeout talking to device"
            )]
        );
    }

    #[test]
    fn dropping_every_copy_unsettled_fails_the_call() {
        let (sink, mut rx, seen) = sink(6);
        let copy = sink.clone();
        drop(sink);
        assert!(rx.drain().is_empty());
        drop(copy);

        assert_eq!(
            rx.drain(),
            vec![Command::native_error(
                6,
                "Native Action 'demo:later' dropped its result without completing."
            )]
        );
        assert_eq!(seen.lock().len(), 1);
    }

    #[test]
    fn settled_sink_drops_quietly() {
        let (sink, mut rx, seen) = sink(8);
        sink.resolve(None);
        drop(sink);
        assert_eq!(rx.drain().len(), 1);
        assert!(seen.lock().is_empty());
    }
}
