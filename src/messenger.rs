//! Requester chat transport seam.

use anyhow::Result;
use async_trait::async_trait;

/// Sends plain-text replies to a paired requester device.
///
/// Implemented by the host wallet's chat layer; the pipeline never talks to
/// the transport directly.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_text(&self, device: &str, text: &str) -> Result<()>;
}
