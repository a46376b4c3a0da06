//! Application state for the HTTP server.

use std::sync::Arc;

use super::config::ServerConfig;
use crate::db::repository::FullRepository;
use crate::db::services::InviteSettings;
use crate::services::{InviteMailer, LogMailer};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Repository instance for database operations
    pub repository: Arc<dyn FullRepository>,
    /// Transport for invitation emails
    pub mailer: Arc<dyn InviteMailer>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// State with the default config and a mailer that only logs.
    pub fn new(repository: Arc<dyn FullRepository>) -> Self {
        Self {
            repository,
            mailer: Arc::new(LogMailer),
            config: Arc::new(ServerConfig::default()),
        }
    }

    pub fn with_mailer(mut self, mailer: Arc<dyn InviteMailer>) -> Self {
        self.mailer = mailer;
        self
    }

    pub fn with_config(mut self, config: ServerConfig) -> Self {
        self.config = Arc::new(config);
        self
    }

    pub fn invite_settings(&self) -> InviteSettings<'_> {
        InviteSettings {
            base_url: &self.config.base_url,
            mail_from: &self.config.mail_from,
        }
    }
}
