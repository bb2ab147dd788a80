use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

use tokio::sync::oneshot;

use crate::command::Command;
use crate::error::WebCallError;
use crate::payload::Payload;

pub type CallId = u64;

/// Ids handed out to native to web calls start here and only grow.
pub const FIRST_CALL_ID: CallId = 0;

type ResultFn = Box<dyn FnOnce(Option<Payload>) + Send>;
type ErrorFn = Box<dyn FnOnce(WebCallError) + Send>;

/// Where the outcome of a native to web call goes. Consumed on delivery, so
/// a caller hears back at most once.
pub enum Continuation {
    Callbacks { on_result: ResultFn, on_error: ErrorFn },
    Channel(oneshot::Sender<Result<Option<Payload>, WebCallError>>),
}

impl Continuation {
    pub fn callbacks<R, E>(on_result: R, on_error: E) -> Self
    where
        R: FnOnce(Option<Payload>) + Send + 'static,
        E: FnOnce(WebCallError) + Send + 'static,
    {
        Continuation::Callbacks {
            on_result: Box::new(on_result),
            on_error: Box::new(on_error),
        }
    }

    pub fn resolve(self, result: Option<Payload>) {
        match self {
            Continuation::Callbacks { on_result, .. } => on_result(result),
            Continuation::Channel(tx) => {
                // The awaiting future may have been dropped.
                let _ = tx.send(Ok(result));
            }
        }
    }

    pub fn reject(self, error: WebCallError) {
        match self {
            Continuation::Callbacks { on_error, .. } => on_error(error),
            Continuation::Channel(tx) => {
                let _ = tx.send(Err(error));
            }
        }
    }
}

impl fmt::Debug for Continuation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Continuation::Callbacks { .. } => f.write_str("Continuation::Callbacks"),
            Continuation::Channel(_) => f.write_str("Continuation::Channel"),
        }
    }
}

/// A fully described native to web call that has not been sent yet.
#[derive(Debug)]
pub struct WebCall {
    pub namespace: String,
    pub action: String,
    pub args: Option<Payload>,
    pub continuation: Continuation,
}

impl WebCall {
    pub fn new(
        namespace: impl Into<String>,
        action: impl Into<String>,
        args: Option<Payload>,
        continuation: Continuation,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            action: action.into(),
            args,
            continuation,
        }
    }
}

/// A transmitted call waiting for its `onWebResult`.
#[derive(Debug)]
pub(crate) struct Outstanding {
    pub namespace: String,
    pub action: String,
    pub issued_at: Instant,
    pub continuation: Continuation,
}

#[derive(Debug)]
pub(crate) struct Correlator {
    next_id: CallId,
    outstanding: HashMap<CallId, Outstanding>,
}

impl Default for Correlator {
    fn default() -> Self {
        Self {
            next_id: FIRST_CALL_ID,
            outstanding: HashMap::new(),
        }
    }
}

impl Correlator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next id, record the continuation under it, and build the
    /// command that carries the call.
    pub fn issue(&mut self, call: WebCall, now: Instant) -> (CallId, Command) {
        let call_id = self.next_id;
        self.next_id += 1;

        let WebCall {
            namespace,
            action,
            args,
            continuation,
        } = call;

        let command = Command::CallWeb {
            call_id,
            namespace: namespace.clone(),
            action: action.clone(),
            args,
        };
        self.outstanding.insert(
            call_id,
            Outstanding {
                namespace,
                action,
                issued_at: now,
                continuation,
            },
        );
        (call_id, command)
    }

    /// Remove and return the entry for `call_id`, if any.
    pub fn settle(&mut self, call_id: CallId) -> Option<Outstanding> {
        self.outstanding.remove(&call_id)
    }

    /// Remove every entry at least `max_age` old, oldest id first.
    pub fn expire(&mut self, now: Instant, max_age: Duration) -> Vec<(CallId, Outstanding)> {
        let mut stale: Vec<CallId> = self
            .outstanding
            .iter()
            .filter(|(_, entry)| now.saturating_duration_since(entry.issued_at) >= max_age)
            .map(|(call_id, _)| *call_id)
            .collect();
        stale.sort_unstable();

        stale
            .into_iter()
            .filter_map(|call_id| Some((call_id, self.outstanding.remove(&call_id)?)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.outstanding.len()
    }
}
