/// Background mail dispatch
///
/// Request handlers hand rendered messages to a [`MailDispatcher`] and return
/// immediately; a single background task drains the queue and calls the
/// configured [`Mailer`]. Delivery outcome never affects the request that
/// produced the message: failures are logged and dropped.
///
/// # Architecture
///
/// ```text
/// handler ──enqueue──► mpsc (bounded) ──► dispatch loop ──► Mailer::send
///                                              ▲
///                            CancellationToken ┘ (drain, then exit)
/// ```
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use dusky_shared::mailer::{dispatcher::MailDispatcher, templates, LogMailer};
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() {
/// let shutdown = CancellationToken::new();
/// let (dispatcher, handle) = MailDispatcher::spawn(Arc::new(LogMailer), true, 128, shutdown.clone());
///
/// dispatcher
///     .enqueue(templates::invitation("alice", "alice@x.com", "http://localhost/confirm"))
///     .ok();
///
/// shutdown.cancel();
/// handle.await.ok();
/// # }
/// ```

use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{MailError, Mailer, OutboundEmail};

/// Default queue capacity
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Handle for enqueueing outbound mail
///
/// Cheap to clone; all clones feed the same background task.
#[derive(Debug, Clone)]
pub struct MailDispatcher {
    sender: mpsc::Sender<OutboundEmail>,
}

impl MailDispatcher {
    /// Starts the dispatch loop
    ///
    /// The loop exits once `shutdown` is cancelled and the already queued
    /// messages are sent, or once every dispatcher handle is dropped.
    pub fn spawn(
        mailer: Arc<dyn Mailer>,
        sandbox: bool,
        capacity: usize,
        shutdown: CancellationToken,
    ) -> (Self, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let handle = tokio::spawn(dispatch_loop(mailer, sandbox, receiver, shutdown));

        (Self { sender }, handle)
    }

    /// Queues a message without waiting for delivery
    ///
    /// # Errors
    ///
    /// `MailError::Queue` if the queue is full or the dispatch loop has stopped.
    pub fn enqueue(&self, message: OutboundEmail) -> Result<(), MailError> {
        match self.sender.try_send(message) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(message)) => {
                tracing::error!(to = %message.to_email, "Mail queue full, dropping message");
                Err(MailError::Queue("queue full".to_string()))
            }
            Err(TrySendError::Closed(message)) => {
                tracing::error!(to = %message.to_email, "Mail dispatcher stopped, dropping message");
                Err(MailError::Queue("dispatcher stopped".to_string()))
            }
        }
    }
}

async fn dispatch_loop(
    mailer: Arc<dyn Mailer>,
    sandbox: bool,
    mut receiver: mpsc::Receiver<OutboundEmail>,
    shutdown: CancellationToken,
) {
    tracing::info!(sandbox, "Mail dispatcher started");

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                receiver.close();
                while let Some(message) = receiver.recv().await {
                    deliver(mailer.as_ref(), &message, sandbox).await;
                }
                break;
            }
            next = receiver.recv() => {
                match next {
                    Some(message) => deliver(mailer.as_ref(), &message, sandbox).await,
                    None => break,
                }
            }
        }
    }

    tracing::info!("Mail dispatcher stopped");
}

async fn deliver(mailer: &dyn Mailer, message: &OutboundEmail, sandbox: bool) {
    if let Err(e) = mailer.send(message, sandbox).await {
        tracing::error!(
            to = %message.to_email,
            subject = %message.subject,
            error = %e,
            "Failed to deliver mail"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailer::templates;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingMailer {
        sent: Mutex<Vec<(String, bool)>>,
        fail: bool,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, message: &OutboundEmail, sandbox: bool) -> Result<(), MailError> {
            self.sent
                .lock()
                .unwrap()
                .push((message.to_email.clone(), sandbox));
            if self.fail {
                return Err(MailError::Transport("down".to_string()));
            }
            Ok(())
        }
    }

    fn message(to: &str) -> OutboundEmail {
        templates::invitation("user", to, "http://localhost/auth/confirm?token=t")
    }

    #[tokio::test]
    async fn test_delivers_queued_messages_before_shutdown() {
        let mailer = Arc::new(RecordingMailer::default());
        let shutdown = CancellationToken::new();
        let (dispatcher, handle) = MailDispatcher::spawn(mailer.clone(), true, 8, shutdown.clone());

        dispatcher.enqueue(message("a@x.com")).unwrap();
        dispatcher.enqueue(message("b@x.com")).unwrap();

        shutdown.cancel();
        handle.await.unwrap();

        let sent = mailer.sent.lock().unwrap().clone();
        assert_eq!(
            sent,
            vec![("a@x.com".to_string(), true), ("b@x.com".to_string(), true)]
        );
    }

    #[tokio::test]
    async fn test_delivery_failure_does_not_stop_loop() {
        let mailer = Arc::new(RecordingMailer {
            fail: true,
            ..Default::default()
        });
        let shutdown = CancellationToken::new();
        let (dispatcher, handle) = MailDispatcher::spawn(mailer.clone(), false, 8, shutdown.clone());

        dispatcher.enqueue(message("a@x.com")).unwrap();
        dispatcher.enqueue(message("b@x.com")).unwrap();

        shutdown.cancel();
        handle.await.unwrap();

        assert_eq!(mailer.sent.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_enqueue_after_stop_fails() {
        let shutdown = CancellationToken::new();
        let (dispatcher, handle) =
            MailDispatcher::spawn(Arc::new(RecordingMailer::default()), true, 8, shutdown.clone());

        shutdown.cancel();
        handle.await.unwrap();

        assert!(matches!(
            dispatcher.enqueue(message("late@x.com")),
            Err(MailError::Queue(_))
        ));
    }

    #[tokio::test]
    async fn test_loop_exits_when_all_handles_dropped() {
        let (dispatcher, handle) = MailDispatcher::spawn(
            Arc::new(RecordingMailer::default()),
            true,
            8,
            CancellationToken::new(),
        );

        drop(dispatcher);
        handle.await.unwrap();
    }
}
