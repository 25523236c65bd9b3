use colored::*;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub kind: NotificationKind,
}

impl Notification {
    pub fn new(title: &str, body: &str, kind: NotificationKind) -> Self {
        Self {
            title: title.to_string(),
            body: body.to_string(),
            kind,
        }
    }

    pub fn info(title: &str, body: &str) -> Self {
        Self::new(title, body, NotificationKind::Info)
    }

    pub fn success(title: &str, body: &str) -> Self {
        Self::new(title, body, NotificationKind::Success)
    }

    pub fn warning(title: &str, body: &str) -> Self {
        Self::new(title, body, NotificationKind::Warning)
    }

    pub fn error(title: &str, body: &str) -> Self {
        Self::new(title, body, NotificationKind::Error)
    }
}

/// Delivery surface for user-facing notifications.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: &Notification);
}

/// Prints notifications above the prompt, colored by kind.
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&self, n: &Notification) {
        let title = match n.kind {
            NotificationKind::Info => format!("ℹ {}", n.title).bright_cyan().bold(),
            NotificationKind::Success => format!("✓ {}", n.title).green().bold(),
            NotificationKind::Warning => format!("⚠️  {}", n.title).yellow().bold(),
            NotificationKind::Error => format!("✗ {}", n.title).red().bold(),
        };
        println!("\n{} {}", title, n.body.dimmed());
    }
}

/// Keeps every notification in memory, in delivery order.
#[derive(Default)]
pub struct MemoryNotifier {
    delivered: Mutex<Vec<Notification>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delivered(&self) -> Vec<Notification> {
        self.delivered
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn titles(&self) -> Vec<String> {
        self.delivered().into_iter().map(|n| n.title).collect()
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, notification: &Notification) {
        self.delivered
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(notification.clone());
    }
}
