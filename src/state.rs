//! Shared application state

use std::sync::Arc;

use crate::auth::{Authenticator, LoginClient};
use crate::client::PlatformClient;
use crate::config::Settings;
use crate::error::Result;

/// Shared state for the MCP server
#[derive(Debug)]
pub struct AppState {
    /// Resolved runtime settings
    pub settings: Settings,
    /// Authenticated platform API client
    pub client: PlatformClient,
}

impl AppState {
    /// Create the state, wiring the authenticator into the platform client.
    pub fn new(settings: Settings) -> Result<Self> {
        let login = LoginClient::new(settings.urls.auth.clone());
        let auth = Arc::new(Authenticator::new(login, settings.stdio.clone()));
        let client = PlatformClient::new(settings.urls.clone(), auth)?;
        Ok(Self { settings, client })
    }

    pub fn auth(&self) -> &Arc<Authenticator> {
        self.client.auth()
    }
}
