use crate::application::ports::Notifier;
use crate::domain::entities::{Notice, NoticeLevel};
use tokio::sync::broadcast;

/// Writes notices to the log; used by the headless daemon.
#[derive(Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Info => tracing::info!(target: "notice", "{}", notice.message),
            NoticeLevel::Warning => tracing::warn!(target: "notice", "{}", notice.message),
            NoticeLevel::Error => tracing::error!(target: "notice", "{}", notice.message),
        }
    }
}

/// Fans notices out to any number of UI subscribers. Notices sent while nobody
/// listens are dropped.
pub struct BroadcastNotifier {
    sender: broadcast::Sender<Notice>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.sender.subscribe()
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new(64)
    }
}

impl Notifier for BroadcastNotifier {
    fn notify(&self, notice: Notice) {
        let _ = self.sender.send(notice);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn broadcast_reaches_every_subscriber() {
        let notifier = BroadcastNotifier::default();
        let mut first = notifier.subscribe();
        let mut second = notifier.subscribe();

        notifier.notify(Notice::info("saved offline, will sync later"));

        assert_eq!(first.recv().await.unwrap().level, NoticeLevel::Info);
        assert_eq!(
            second.recv().await.unwrap().message,
            "saved offline, will sync later"
        );
    }

    #[test]
    fn broadcast_without_subscribers_is_silent() {
        BroadcastNotifier::new(0).notify(Notice::error("dropped"));
        TracingNotifier.notify(Notice::warning("logged"));
    }
}
