//! Filter synchronizer.
//!
//! Keeps the upstream provider's server-side address filter equal to the
//! union of all actively tracked wallets, as a traffic-reduction
//! optimization.  Every push is a **full replacement** recomputed from the
//! wallet index, so a dropped update can never leave the filter permanently
//! diverged — the next membership change heals it.
//!
//! Best-effort and non-blocking throughout: room actors only `try_send` a
//! trigger; the worker logs failures and moves on.  Routing correctness
//! never depends on a push succeeding — the router decides locally from the
//! wallet index regardless of what the upstream filter currently contains.

use crate::error::SyncError;
use crate::index::WalletIndex;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use swapwatch_sdk::objects::Address;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};
use url::Url;

/// Trigger channel capacity.  A full channel means a recompute is already
/// queued that will observe the newest state, so overflow is dropped.
const TRIGGER_BUFFER: usize = 16;

/// Timeout for one upstream push; on expiry the push is abandoned, not
/// retried inline.
const PUSH_TIMEOUT: Duration = Duration::from_secs(10);

/// Pushes a complete tracked-wallet set to the upstream provider.
///
/// Injected external dependency; the core never implements the provider
/// protocol beyond this surface.
#[async_trait::async_trait]
pub trait UpstreamFilterSync: Send + Sync {
    async fn update_filter(&self, addresses: BTreeSet<Address>) -> Result<(), SyncError>;
}

/// HTTP implementation: `POST {filter_url}` with a JSON address list and an
/// optional bearer token.
pub struct HttpFilterSync {
    client: reqwest::Client,
    filter_url: Url,
    auth_token: Option<String>,
}

#[derive(Serialize)]
struct FilterUpdateBody<'a> {
    addresses: &'a BTreeSet<Address>,
}

impl HttpFilterSync {
    pub fn new(filter_url: Url, auth_token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(PUSH_TIMEOUT)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            filter_url,
            auth_token,
        }
    }
}

#[async_trait::async_trait]
impl UpstreamFilterSync for HttpFilterSync {
    async fn update_filter(&self, addresses: BTreeSet<Address>) -> Result<(), SyncError> {
        let mut request = self
            .client
            .post(self.filter_url.clone())
            .json(&FilterUpdateBody {
                addresses: &addresses,
            });
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(SyncError::Rejected(response.status().as_u16()))
        }
    }
}

/// Cloneable trigger handle held by every room actor.
#[derive(Clone)]
pub struct FilterSyncHandle {
    tx: mpsc::Sender<()>,
}

impl FilterSyncHandle {
    /// Request a filter recompute.  Non-blocking; a full trigger channel is
    /// fine because a queued recompute will observe the newest state.
    pub fn notify_membership_changed(&self) {
        let _ = self.tx.try_send(());
    }

    /// A handle whose triggers go nowhere.  For tests and for deployments
    /// with no upstream filter configured.
    pub fn disconnected() -> Self {
        let (tx, _rx) = mpsc::channel(1);
        Self { tx }
    }
}

/// Create the trigger channel pair for a [`FilterSyncWorker`].
pub fn filter_sync_channel() -> (FilterSyncHandle, mpsc::Receiver<()>) {
    let (tx, rx) = mpsc::channel(TRIGGER_BUFFER);
    (FilterSyncHandle { tx }, rx)
}

/// Background worker: drains pending triggers, recomputes the tracked set
/// from the index, and pushes the full replacement upstream.
///
/// Draining before the recompute coalesces rapid successive membership
/// changes into a single push.
pub struct FilterSyncWorker {
    index: WalletIndex,
    upstream: Arc<dyn UpstreamFilterSync>,
}

impl FilterSyncWorker {
    pub fn new(index: WalletIndex, upstream: Arc<dyn UpstreamFilterSync>) -> Self {
        Self { index, upstream }
    }

    /// Run until the trigger channel closes or shutdown is signaled.
    pub async fn run(self, mut trigger_rx: mpsc::Receiver<()>, mut shutdown_rx: watch::Receiver<bool>) {
        info!("filter sync worker started");
        loop {
            tokio::select! {
                biased;

                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("filter sync worker shutting down");
                        break;
                    }
                }

                trigger = trigger_rx.recv() => {
                    if trigger.is_none() {
                        info!("filter sync trigger channel closed");
                        break;
                    }
                    // Coalesce every trigger that piled up behind this one.
                    while trigger_rx.try_recv().is_ok() {}
                    self.sync_once().await;
                }
            }
        }
    }

    /// One recompute-and-push cycle.  Failures are logged and dropped; the
    /// next membership change retries implicitly.
    pub async fn sync_once(&self) {
        let addresses = match self.index.all_tracked_wallets().await {
            Ok(set) => set,
            Err(e) => {
                warn!(error = %e, "filter sync: failed to read tracked wallets");
                return;
            }
        };
        let count = addresses.len();
        match tokio::time::timeout(PUSH_TIMEOUT, self.upstream.update_filter(addresses)).await {
            Ok(Ok(())) => debug!(wallets = count, "filter sync: pushed"),
            Ok(Err(e)) => warn!(error = %e, "filter sync: push failed"),
            Err(_) => warn!("filter sync: push timed out"),
        }
    }
}
