use std::collections::VecDeque;

/// Holds back work until the web side has finished booting.
///
/// Readiness is one-way: once opened the gate never closes again, and only
/// the first `open` hands back the backlog.
#[derive(Debug)]
pub struct ReadinessGate<T> {
    state: GateState<T>,
}

#[derive(Debug)]
enum GateState<T> {
    NotReady(VecDeque<T>),
    Ready,
}

#[derive(Debug, PartialEq, Eq)]
pub enum Admission<T> {
    /// Buffered until the gate opens.
    Queued,
    /// The gate is open; the caller transmits the item itself.
    Ready(T),
}

impl<T> Default for ReadinessGate<T> {
    fn default() -> Self {
        Self {
            state: GateState::NotReady(VecDeque::new()),
        }
    }
}

impl<T> ReadinessGate<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, GateState::Ready)
    }

    pub fn pending_len(&self) -> usize {
        match &self.state {
            GateState::NotReady(queue) => queue.len(),
            GateState::Ready => 0,
        }
    }

    pub fn admit(&mut self, item: T) -> Admission<T> {
        match &mut self.state {
            GateState::NotReady(queue) => {
                queue.push_back(item);
                Admission::Queued
            }
            GateState::Ready => Admission::Ready(item),
        }
    }

    /// Flip to ready. Returns the backlog in arrival order on the first call
    /// and `None` on every later one.
    pub fn open(&mut self) -> Option<VecDeque<T>> {
        match std::mem::replace(&mut self.state, GateState::Ready) {
            GateState::NotReady(queue) => Some(queue),
            GateState::Ready => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queues_until_open_then_passes_through() {
        let mut gate = ReadinessGate::new();
        assert_eq!(gate.admit(1), Admission::Queued);
        assert_eq!(gate.admit(2), Admission::Queued);
        assert_eq!(gate.pending_len(), 2);
        assert!(!gate.is_ready());

        let backlog = gate.open().expect("first open");
        assert_eq!(backlog.into_iter().collect::<Vec<_>>(), vec![1, 2]);
        assert!(gate.is_ready());
        assert_eq!(gate.admit(3), Admission::Ready(3));
        assert_eq!(gate.pending_len(), 0);
    }

    #[test]
    fn second_open_is_a_no_op() {
        let mut gate = ReadinessGate::new();
        gate.admit("a");
        assert!(gate.open().is_some());
        assert!(gate.open().is_none());
        assert_eq!(gate.admit("b"), Admission::Ready("b"));
    }

    #[test]
    fn opening_an_empty_gate_still_counts() {
        let mut gate: ReadinessGate<u8> = ReadinessGate::new();
        assert_eq!(gate.open().map(|q| q.len()), Some(0));
        assert!(gate.open().is_none());
    }
}
