pub mod config;
pub mod navigate;
pub mod session;

use crate::config::CvasConfig;
use anyhow::{Context, Result};
use cvas_session::{HttpCredentialExchange, IdentityContext, Navigator, SessionStore, ViewScope};
use std::sync::Arc;

pub struct CommandContext {
    pub config: CvasConfig,
    pub scope: ViewScope,
}

impl CommandContext {
    /// Mount the identity context over the on-disk session in the data directory
    pub fn new(config: CvasConfig) -> Result<Self> {
        let session_config = config.session_config();
        let exchange = HttpCredentialExchange::new(&session_config).context("Invalid authority configuration")?;
        let store = SessionStore::on_disk(&config.session_dir(), &session_config);
        let identity = IdentityContext::mount(store, Arc::new(exchange));

        Ok(Self {
            config,
            scope: ViewScope::provide(identity),
        })
    }

    pub fn identity(&self) -> &Arc<IdentityContext> {
        self.scope.use_identity()
    }

    pub fn navigator(&self) -> Navigator {
        Navigator::new(self.scope.clone())
    }
}
