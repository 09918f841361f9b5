//! User-facing notices (transient toasts)

use log::{info, warn};
use tokio::sync::mpsc;

/// Severity of a notice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
    Info,
}

/// A single human-readable message for the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }
}

/// Receiver of notices. Exactly one sink is wired into a client.
pub trait NoticeSink: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Forwards notices into an unbounded channel, for UIs that drain them
/// on their own schedule
#[derive(Debug, Clone)]
pub struct ChannelNoticeSink {
    sender: mpsc::UnboundedSender<Notice>,
}

impl ChannelNoticeSink {
    /// Create a sink along with the receiving half
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notice>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl NoticeSink for ChannelNoticeSink {
    fn notify(&self, notice: Notice) {
        // Nobody listening is not an error
        if self.sender.send(notice).is_err() {
            warn!("Notice dropped: receiver closed");
        }
    }
}

/// Writes notices to the log. Used when no UI is attached.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNoticeSink;

impl NoticeSink for LogNoticeSink {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Error => warn!("{}", notice.message),
            NoticeLevel::Success | NoticeLevel::Info => info!("{}", notice.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_sink_delivers_in_order() {
        let (sink, mut rx) = ChannelNoticeSink::new();
        sink.notify(Notice::success("first"));
        sink.notify(Notice::error("second"));

        assert_eq!(rx.try_recv().unwrap(), Notice::success("first"));
        let second = rx.try_recv().unwrap();
        assert_eq!(second.level, NoticeLevel::Error);
        assert_eq!(second.message, "second");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn channel_sink_tolerates_closed_receiver() {
        let (sink, rx) = ChannelNoticeSink::new();
        drop(rx);
        sink.notify(Notice::info("nobody hears this"));
    }
}
