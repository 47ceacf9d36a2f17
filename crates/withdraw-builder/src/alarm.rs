//! Operator alerts for balance shortfalls
//!
//! Alerts are fire-and-forget: delivery runs off the building thread and a
//! delivery failure is only logged.

use std::sync::Arc;

use custody_core::{BuildError, BuilderConfig, WithdrawalTask};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Alert delivery failed: {0}")]
    Delivery(String),
}

/// Alert sink (mail, chat hook, pager)
pub trait Notifier: Send + Sync + 'static {
    fn notify(
        &self,
        config: &BuilderConfig,
        task: &WithdrawalTask,
        error: &BuildError,
        message: &str,
    ) -> Result<(), NotifyError>;
}

/// Writes alerts to the log only
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(
        &self,
        config: &BuilderConfig,
        task: &WithdrawalTask,
        error: &BuildError,
        message: &str,
    ) -> Result<(), NotifyError> {
        tracing::error!(
            "[{}] {} task {} failed ({}): {}",
            config.currency,
            task.tx_type,
            task.sequence_id,
            error.error_code(),
            message
        );
        Ok(())
    }
}

#[derive(Clone)]
pub struct AlertDispatcher {
    notifier: Arc<dyn Notifier>,
    config: Arc<BuilderConfig>,
}

impl AlertDispatcher {
    pub fn new(notifier: Arc<dyn Notifier>, config: Arc<BuilderConfig>) -> Self {
        Self { notifier, config }
    }

    /// Send an alert for `error` if it is alertable. Returns whether an
    /// alert was dispatched.
    pub fn dispatch(&self, task: &WithdrawalTask, error: &BuildError) -> bool {
        let Some(message) = error.alert_detail() else {
            return false;
        };

        let notifier = Arc::clone(&self.notifier);
        let config = Arc::clone(&self.config);
        let task = task.clone();
        let error = error.clone();
        let job = move || {
            if let Err(e) = notifier.notify(&config, &task, &error, &message) {
                tracing::warn!("Failed to send alert for task {}: {}", task.sequence_id, e);
            }
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(job);
            }
            Err(_) => {
                if let Err(e) = std::thread::Builder::new()
                    .name("withdraw-alert".to_string())
                    .spawn(job)
                {
                    tracing::warn!("Failed to spawn alert thread: {}", e);
                }
            }
        }
        true
    }
}
