//! # Collaborator Inbox
//!
//! Results produced off the frame (remote config replies, background
//! failures, arbitrary deferred work) are queued here and applied at the
//! start of the next frame.
//!
//! ```text
//! ┌──────────────┐  try_send   ┌──────────────┐  drain   ┌───────────────┐
//! │ collaborator │────────────>│   bounded    │─────────>│ Engine::frame │
//! │ (any thread) │             │   channel    │          │ (frame thread)│
//! └──────┬───────┘             └──────────────┘          └───────▲───────┘
//!        │ full                ┌──────────────┐                  │
//!        └────────────────────>│   overflow   │──────────────────┘
//!                              │  (failures)  │
//!                              └──────────────┘
//! ```
//!
//! A message that does not fit is turned into a [`CollaboratorError`] on
//! the unbounded overflow lane, so every fetch ends in either a reply or a
//! failure.

use std::collections::HashMap;
use std::fmt;

use crossbeam_channel::{bounded, unbounded, Receiver, Sender, TrySendError};
use tracing::warn;

use kestrel_ui::{SceneGraph, SceneResult};

use crate::collaborators::Value;
use crate::error::CollaboratorError;

/// Work to run against the scene on the frame thread.
pub type Task = Box<dyn FnOnce(&mut SceneGraph) -> SceneResult<()> + Send>;

/// One queued delivery.
pub enum InboxMessage {
    /// Outcome of a remote config fetch.
    RemoteConfig(Result<HashMap<String, Value>, CollaboratorError>),
    /// A failure reported by a background collaborator.
    Failure(CollaboratorError),
    /// Deferred scene work.
    Task(Task),
}

impl fmt::Debug for InboxMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RemoteConfig(result) => f.debug_tuple("RemoteConfig").field(result).finish(),
            Self::Failure(err) => f.debug_tuple("Failure").field(err).finish(),
            Self::Task(_) => f.write_str("Task(..)"),
        }
    }
}

/// Receiving end, owned by the engine.
#[derive(Debug)]
pub struct Inbox {
    sender: Sender<InboxMessage>,
    receiver: Receiver<InboxMessage>,
    overflow_tx: Sender<CollaboratorError>,
    overflow_rx: Receiver<CollaboratorError>,
}

impl Inbox {
    /// Creates an inbox holding at most `capacity` undelivered messages.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        let (overflow_tx, overflow_rx) = unbounded();
        Self {
            sender,
            receiver,
            overflow_tx,
            overflow_rx,
        }
    }

    /// A sender handle (clone for multiple producers).
    #[must_use]
    pub fn sender(&self) -> InboxSender {
        InboxSender {
            sender: self.sender.clone(),
            overflow: self.overflow_tx.clone(),
        }
    }

    /// Takes one message without blocking. Queued messages come first,
    /// then failures recorded for messages that did not fit.
    pub fn try_next(&self) -> Option<InboxMessage> {
        self.receiver
            .try_recv()
            .ok()
            .or_else(|| self.overflow_rx.try_recv().ok().map(InboxMessage::Failure))
    }

    /// Takes everything queued so far without blocking.
    pub fn drain(&self) -> Vec<InboxMessage> {
        std::iter::from_fn(|| self.try_next()).collect()
    }

    /// Number of undelivered messages.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len() + self.overflow_rx.len()
    }

    /// True if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty() && self.overflow_rx.is_empty()
    }
}

/// Producer handle; cheap to clone and `Send`.
#[derive(Clone, Debug)]
pub struct InboxSender {
    sender: Sender<InboxMessage>,
    overflow: Sender<CollaboratorError>,
}

impl InboxSender {
    /// Queues a message without blocking. Returns false if the inbox is
    /// full or gone. A message that does not fit is reported as a failure
    /// instead.
    pub fn send(&self, message: InboxMessage) -> bool {
        match self.sender.try_send(message) {
            Ok(()) => true,
            Err(TrySendError::Full(message)) => {
                warn!(?message, "inbox full, reported as failure");
                let error = match message {
                    InboxMessage::Failure(error) | InboxMessage::RemoteConfig(Err(error)) => error,
                    InboxMessage::RemoteConfig(Ok(_)) => {
                        CollaboratorError::InboxFull("remote config reply".to_owned())
                    }
                    InboxMessage::Task(_) => CollaboratorError::InboxFull("task".to_owned()),
                };
                // Fails only once the engine is gone.
                let _ = self.overflow.send(error);
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    /// Queues deferred scene work.
    pub fn send_task(
        &self,
        task: impl FnOnce(&mut SceneGraph) -> SceneResult<()> + Send + 'static,
    ) -> bool {
        self.send(InboxMessage::Task(Box::new(task)))
    }

    /// Reports a collaborator failure.
    pub fn send_failure(&self, error: CollaboratorError) -> bool {
        self.send(InboxMessage::Failure(error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_inbox_reports_overflow() {
        let inbox = Inbox::new(2);
        let tx = inbox.sender();
        assert!(tx.send_failure(CollaboratorError::Fetch("a".into())));
        assert!(tx.send(InboxMessage::RemoteConfig(Ok(HashMap::new()))));
        assert!(!tx.send_failure(CollaboratorError::Fetch("c".into())));
        assert!(!tx.send(InboxMessage::RemoteConfig(Ok(HashMap::new()))));
        assert!(!tx.send_task(|_| Ok(())));
        assert_eq!(inbox.pending_count(), 5);

        let drained = inbox.drain();
        assert!(inbox.is_empty());
        assert_eq!(drained.len(), 5);
        assert!(matches!(
            &drained[0],
            InboxMessage::Failure(CollaboratorError::Fetch(s)) if s == "a"
        ));
        assert!(matches!(drained[1], InboxMessage::RemoteConfig(Ok(_))));
        assert!(matches!(
            &drained[2],
            InboxMessage::Failure(CollaboratorError::Fetch(s)) if s == "c"
        ));
        assert!(matches!(
            &drained[3],
            InboxMessage::Failure(CollaboratorError::InboxFull(s)) if s == "remote config reply"
        ));
        assert!(matches!(
            &drained[4],
            InboxMessage::Failure(CollaboratorError::InboxFull(s)) if s == "task"
        ));
    }

    #[test]
    fn test_cross_thread_delivery() {
        let inbox = Inbox::new(8);
        let tx = inbox.sender();
        let handle = std::thread::spawn(move || {
            tx.send_task(|_| Ok(()));
            tx.send(InboxMessage::RemoteConfig(Ok(HashMap::new())))
        });
        assert!(handle.join().expect("producer"));
        let drained = inbox.drain();
        assert!(matches!(drained[0], InboxMessage::Task(_)));
        assert!(matches!(drained[1], InboxMessage::RemoteConfig(Ok(_))));
    }
}
