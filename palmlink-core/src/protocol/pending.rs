//! Type-correlated request tracking.
//!
//! The wire carries no request ids: a `window_list` answers whichever
//! `list_windows` was sent most recently. Each response kind therefore
//! gets a single pending slot, and re-sending a request of the same
//! kind overwrites the slot — the earlier waiter observes a dropped
//! `oneshot` and treats it as superseded.

use std::collections::HashMap;

use tokio::sync::oneshot;
use tracing::debug;

use super::message::ControlMessage;

// ── ResponseKind ─────────────────────────────────────────────────

/// The response message types a request can wait on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseKind {
    RunningApps,
    WindowList,
    TabList,
    DirListing,
    WindowInfo,
    ExecuteResult,
}

impl ResponseKind {
    /// Classify an inbound message, if it is one of the awaited kinds.
    pub fn of(msg: &ControlMessage) -> Option<Self> {
        match msg {
            ControlMessage::RunningApps { .. } => Some(Self::RunningApps),
            ControlMessage::WindowList { .. } => Some(Self::WindowList),
            ControlMessage::TabList { .. } => Some(Self::TabList),
            ControlMessage::DirListing { .. } => Some(Self::DirListing),
            ControlMessage::WindowInfo { .. } => Some(Self::WindowInfo),
            ControlMessage::ExecuteResult { .. } => Some(Self::ExecuteResult),
            _ => None,
        }
    }
}

// ── PendingRequests ──────────────────────────────────────────────

/// One pending slot per [`ResponseKind`].
#[derive(Default)]
pub struct PendingRequests {
    slots: HashMap<ResponseKind, oneshot::Sender<ControlMessage>>,
}

impl PendingRequests {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a waiter for the given response kind, replacing any
    /// waiter already in that slot.
    pub fn register(&mut self, kind: ResponseKind) -> oneshot::Receiver<ControlMessage> {
        let (tx, rx) = oneshot::channel();
        if self.slots.insert(kind, tx).is_some() {
            debug!(?kind, "pending request superseded by re-send");
        }
        rx
    }

    /// Route an inbound message to its waiter.
    ///
    /// Returns the message back when no waiter is registered, so the
    /// caller can fall through to unsolicited handling.
    pub fn resolve(&mut self, msg: ControlMessage) -> Option<ControlMessage> {
        let kind = match ResponseKind::of(&msg) {
            Some(kind) => kind,
            None => return Some(msg),
        };
        match self.slots.remove(&kind) {
            Some(tx) => {
                // Waiter may have given up; the response is simply dropped.
                let _ = tx.send(msg);
                None
            }
            None => Some(msg),
        }
    }

    pub fn is_pending(&self, kind: ResponseKind) -> bool {
        self.slots.contains_key(&kind)
    }

    /// Drop every waiter. Their `oneshot` receivers error out, which
    /// callers surface as a closed-connection failure.
    pub fn clear(&mut self) {
        self.slots.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_delivers_to_registered_waiter() {
        let mut pending = PendingRequests::new();
        let mut rx = pending.register(ResponseKind::WindowList);

        let msg = ControlMessage::WindowList {
            windows: vec!["editor".into()],
        };
        assert!(pending.resolve(msg.clone()).is_none());
        assert_eq!(rx.try_recv().unwrap(), msg);
        assert!(!pending.is_pending(ResponseKind::WindowList));
    }

    #[test]
    fn unsolicited_response_is_returned_to_caller() {
        let mut pending = PendingRequests::new();
        let msg = ControlMessage::TabList { tabs: vec![] };
        assert_eq!(pending.resolve(msg.clone()), Some(msg));
    }

    #[test]
    fn non_response_messages_pass_through() {
        let mut pending = PendingRequests::new();
        let msg = ControlMessage::PtyOutput {
            output: "$ ".into(),
        };
        assert_eq!(pending.resolve(msg.clone()), Some(msg));
    }

    #[test]
    fn resend_overwrites_slot_and_drops_first_waiter() {
        let mut pending = PendingRequests::new();
        let mut first = pending.register(ResponseKind::WindowInfo);
        let mut second = pending.register(ResponseKind::WindowInfo);

        assert!(first.try_recv().is_err());
        assert!(pending.is_pending(ResponseKind::WindowInfo));

        let msg = ControlMessage::WindowInfo {
            x: 0,
            y: 0,
            width: 640,
            height: 480,
        };
        assert!(pending.resolve(msg.clone()).is_none());
        assert_eq!(second.try_recv().unwrap(), msg);
    }

    #[test]
    fn distinct_kinds_do_not_collide() {
        let mut pending = PendingRequests::new();
        let mut apps_rx = pending.register(ResponseKind::RunningApps);
        let mut exec_rx = pending.register(ResponseKind::ExecuteResult);

        let exec = ControlMessage::ExecuteResult {
            success: true,
            output: "ok\n".into(),
        };
        assert!(pending.resolve(exec.clone()).is_none());
        assert_eq!(exec_rx.try_recv().unwrap(), exec);
        assert!(apps_rx.try_recv().is_err());
        assert!(pending.is_pending(ResponseKind::RunningApps));
    }

    #[test]
    fn clear_errors_out_all_waiters() {
        let mut pending = PendingRequests::new();
        let mut rx = pending.register(ResponseKind::DirListing);
        pending.clear();
        assert!(rx.try_recv().is_err());
        assert!(!pending.is_pending(ResponseKind::DirListing));
    }
}
