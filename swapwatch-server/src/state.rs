//! Application state shared across all request handlers.

use crate::config::runtime::SharedConfig;
use swapwatch_core::room::RoomRegistry;
use swapwatch_core::router::EventRouter;

/// Application state that is shared across all request handlers.
///
/// Cloneable and cheap to pass around (everything is behind Arc).
#[derive(Clone)]
pub struct AppState {
    /// Room actor registry: create / restore / look up rooms.
    pub registry: RoomRegistry,
    /// Webhook event router.
    pub router: EventRouter,
    /// Runtime configuration (reloadable via SIGHUP).
    pub config: SharedConfig,
}

impl AppState {
    pub fn new(registry: RoomRegistry, router: EventRouter, config: SharedConfig) -> Self {
        Self {
            registry,
            router,
            config,
        }
    }
}
