use crate::common::auth::TokenService;
use crate::config::Config;
use crate::external::storage::MediaStore;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Config,
    pub media: Arc<dyn MediaStore>,
    pub tokens: TokenService,
}

impl AppState {
    pub fn new(db: DatabaseConnection, config: Config, media: Arc<dyn MediaStore>) -> Self {
        let tokens = TokenService::from_config(&config);
        Self {
            db,
            config,
            media,
            tokens,
        }
    }
}
