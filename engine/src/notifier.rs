//! Outcome notification seam.
//!
//! The settlement sweep reports completed purchases in fixed-size batches
//! through [`Notifier`]. Delivery is best-effort: a failed send is logged
//! and never unwinds a settlement that already committed.

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

/// Notification delivery failure.
#[derive(Error, Debug)]
pub enum NotifyError {
    /// The transport rejected or dropped the message.
    #[error("Notification delivery failed: {0}")]
    Delivery(String),
}

/// Delivery channel for settlement outcome reports.
///
/// Implementations own the transport (email, webhook, queue). The sweep
/// only ever hands over pre-formatted outcome lines.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one batch of outcome lines.
    async fn send(&self, lines: &[String]) -> Result<(), NotifyError>;
}

/// Notifier that writes each batch to the log. Default channel when no
/// external transport is configured.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, lines: &[String]) -> Result<(), NotifyError> {
        info!(
            batch_size = lines.len(),
            report = %lines.join("\n"),
            "Settlement outcome batch"
        );
        Ok(())
    }
}

/// Notifier that records every batch it receives.
#[cfg(any(test, feature = "test-utils"))]
pub struct CapturingNotifier {
    batches: parking_lot::Mutex<Vec<Vec<String>>>,
    fail: std::sync::atomic::AtomicBool,
}

#[cfg(any(test, feature = "test-utils"))]
impl CapturingNotifier {
    pub fn new() -> Self {
        Self {
            batches: parking_lot::Mutex::new(Vec::new()),
            fail: std::sync::atomic::AtomicBool::new(false),
        }
    }

    /// Make every subsequent send fail.
    pub fn fail_sends(&self) {
        self.fail.store(true, std::sync::atomic::Ordering::SeqCst);
    }

    /// All batches received so far.
    pub fn batches(&self) -> Vec<Vec<String>> {
        self.batches.lock().clone()
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl Default for CapturingNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl Notifier for CapturingNotifier {
    async fn send(&self, lines: &[String]) -> Result<(), NotifyError> {
        if self.fail.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(NotifyError::Delivery("simulated outage".to_string()));
        }
        self.batches.lock().push(lines.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_notifier_accepts_batches() {
        let notifier = LogNotifier;
        let lines = vec!["line one".to_string(), "line two".to_string()];
        notifier.send(&lines).await.unwrap();
    }

    #[tokio::test]
    async fn test_capturing_notifier_records_and_fails() {
        let notifier = CapturingNotifier::new();
        notifier.send(&["a".to_string()]).await.unwrap();
        assert_eq!(notifier.batches().len(), 1);

        notifier.fail_sends();
        assert!(notifier.send(&["b".to_string()]).await.is_err());
        assert_eq!(notifier.batches().len(), 1);
    }
}
