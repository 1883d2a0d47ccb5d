//! Shared application state injected into all Axum handlers.

use std::sync::Arc;
use std::time::Duration;

use crate::config::GatewayConfig;
use crate::crypto::Signer;
use crate::domain::{EventBus, QueueRegistry, RewardsLedger, TurnoverSettings, UserDirectory};
use crate::error::GatewayError;
use crate::service::{QueueService, RedemptionService};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Waitlist operations.
    pub queue_service: Arc<QueueService>,
    /// Loyalty, catalog and code redemption.
    pub redemption_service: Arc<RedemptionService>,
    /// Registered users and their roles.
    pub users: Arc<UserDirectory>,
    /// Signs codes and session tokens.
    pub signer: Arc<Signer>,
    /// Event bus for WebSocket subscriptions.
    pub event_bus: EventBus,
    /// Inbound silence after which a WebSocket is closed.
    pub ws_idle_timeout: Duration,
}

impl AppState {
    /// Builds empty in-memory state from configuration.
    ///
    /// Without persistence nothing survives a restart, so the signing key
    /// gets a per-boot nonce and codes or session tokens from an earlier
    /// process fail verification. With persistence the key is stable and
    /// consumed tokens are reloaded by the caller.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Internal`] if the signing key is rejected.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let event_bus = EventBus::new(config.event_bus_capacity);
        let users = Arc::new(UserDirectory::new());
        let signer = if config.persistence_enabled {
            Signer::new(&config.signing_secret)?
        } else {
            Signer::with_boot_nonce(&config.signing_secret)?
        };
        let signer = Arc::new(signer);

        let registry = Arc::new(QueueRegistry::new(TurnoverSettings::new(
            config.default_table_turnover_minutes,
            config.default_concurrent_tables,
        )));
        let queue_service = Arc::new(QueueService::new(
            registry,
            Arc::clone(&users),
            event_bus.clone(),
        ));

        let redemption_service = Arc::new(RedemptionService::new(
            Arc::new(RewardsLedger::new()),
            Arc::clone(&users),
            Arc::clone(&signer),
            event_bus.clone(),
            chrono::Duration::minutes(config.redemption_code_ttl_minutes),
        ));

        Ok(Self {
            queue_service,
            redemption_service,
            users,
            signer,
            event_bus,
            ws_idle_timeout: config.ws_idle_timeout(),
        })
    }
}
