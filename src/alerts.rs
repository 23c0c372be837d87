//! Operator alerting seam.
//!
//! Out-of-band notifications for conditions a human must see: failed
//! postings, abnormal request volume, capacity that cannot self-heal,
//! unparseable provider responses. The transport (email, pager, chat) is
//! the host's concern; this crate only defines the seam and ships a
//! log-backed implementation.

use async_trait::async_trait;

/// Channel for out-of-band operator notifications.
#[async_trait]
pub trait OperatorAlerts: Send + Sync {
    /// Something went wrong while composing or posting a publication.
    async fn posting_problem(&self, message: &str);

    /// General operator notification with a subject line.
    async fn notify(&self, subject: &str, body: &str);
}

/// Alert sink that writes to the tracing log.
///
/// Useful for tests and for deployments where the log stream is already
/// monitored.
#[derive(Debug, Default, Clone)]
pub struct LogAlerts;

#[async_trait]
impl OperatorAlerts for LogAlerts {
    async fn posting_problem(&self, message: &str) {
        tracing::error!(message, "posting problem");
    }

    async fn notify(&self, subject: &str, body: &str) {
        tracing::warn!(subject, body, "operator notification");
    }
}
