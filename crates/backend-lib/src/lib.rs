// ============================
// dropmate-backend-lib/src/lib.rs
// ============================
//! Core of the DROPMATE locker relay: state, fan-out, owner commands and
//! the HTTP surface.

pub mod commands;
pub mod config;
pub mod error;
pub mod fanout;
pub mod handlers;
pub mod messaging;
pub mod metrics;
pub mod processor;
pub mod richmenu;
pub mod router;
pub mod store;
pub mod views;
pub mod webhook;

use std::sync::Arc;

use crate::config::Settings;
use crate::fanout::Hub;
use crate::messaging::{LineClient, Messenger};
use crate::processor::Processor;
use crate::store::StateStore;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Locker/request state machine
    pub processor: Arc<Processor>,
    /// Loaded configuration
    pub settings: Arc<Settings>,
}

impl AppState {
    /// Wire the production LINE client.
    pub fn new(settings: Settings) -> Self {
        let messenger = Arc::new(LineClient::new(settings.line_channel_access_token.clone()));
        Self::with_messenger(settings, messenger)
    }

    /// Fresh store and hub around any messenger.
    pub fn with_messenger(settings: Settings, messenger: Arc<dyn Messenger>) -> Self {
        let processor = Processor::new(
            Arc::new(StateStore::new()),
            Arc::new(Hub::new()),
            messenger,
            settings.owner_user_id.clone(),
            settings.base_url.clone(),
        )
        .with_door_auto_close(settings.door_auto_close);

        Self {
            processor: Arc::new(processor),
            settings: Arc::new(settings),
        }
    }

    pub fn default_locker_id(&self) -> &str {
        &self.settings.default_locker_id
    }
}
