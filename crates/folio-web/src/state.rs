use std::sync::Arc;

use folio_core::Mailer;

use crate::config::ServerConfig;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub mailer: Arc<dyn Mailer>,
}
