//! Contract for the external notification collaborator.
//!
//! Formatting and delivery of outbound notifications (the enrichment /
//! templating pipeline) live outside this core.  Room actors invoke the
//! trait fire-and-forget when a swap crosses a room's notify threshold;
//! delivery failures are logged by the spawning task and never block or
//! fail the broadcast.

use crate::error::NotifyError;
use swapwatch_sdk::objects::SwapEvent;
use tracing::info;

/// Formats and delivers one swap notification to an opaque target.
#[async_trait::async_trait]
pub trait SwapNotifier: Send + Sync {
    async fn format_and_deliver(&self, event: &SwapEvent, target: &str) -> Result<(), NotifyError>;
}

/// Default collaborator that only logs the would-be delivery.
pub struct LogNotifier;

#[async_trait::async_trait]
impl SwapNotifier for LogNotifier {
    async fn format_and_deliver(&self, event: &SwapEvent, target: &str) -> Result<(), NotifyError> {
        info!(
            notify_target = target,
            wallet = %event.wallet_address,
            amount_usd = ?event.amount_in_usd,
            "swap notification"
        );
        Ok(())
    }
}
