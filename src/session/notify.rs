use std::sync::{Mutex, PoisonError};

/// User-visible reporting of mutation results.
pub trait Notifier: Send + Sync {
    fn notify_success(&self, message: &str);

    fn notify_failure(&self, message: &str);
}

/// Sends notifications to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify_success(&self, message: &str) {
        log::info!("[NOTIFY] {}", message);
    }

    fn notify_failure(&self, message: &str) {
        log::error!("[NOTIFY] {}", message);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Success(String),
    Failure(String),
}

/// Keeps every notification in memory, in order.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    seen: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<Notification> {
        self.seen.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn successes(&self) -> Vec<String> {
        self.all()
            .into_iter()
            .filter_map(|n| match n {
                Notification::Success(m) => Some(m),
                Notification::Failure(_) => None,
            })
            .collect()
    }

    pub fn failures(&self) -> Vec<String> {
        self.all()
            .into_iter()
            .filter_map(|n| match n {
                Notification::Failure(m) => Some(m),
                Notification::Success(_) => None,
            })
            .collect()
    }

    fn push(&self, notification: Notification) {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notification);
    }
}

impl Notifier for RecordingNotifier {
    fn notify_success(&self, message: &str) {
        self.push(Notification::Success(message.to_string()));
    }

    fn notify_failure(&self, message: &str) {
        self.push(Notification::Failure(message.to_string()));
    }
}
