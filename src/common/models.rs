use crate::config::{Config, StorageBackend};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// What the web UI needs to know about this deployment
#[derive(ToSchema, Deserialize, Serialize)]
pub struct UIConfiguration {
    #[serde(rename = "appName")]
    pub app_name: String,
    pub deployment: String,
    #[serde(rename = "authEnabled")]
    pub auth_enabled: bool,
    #[serde(rename = "storageBackend")]
    pub storage_backend: StorageBackend,
    /// Largest accepted request body, so the UI can refuse oversized archives early
    #[serde(rename = "maxUploadBytes")]
    pub max_upload_bytes: usize,
}

impl UIConfiguration {
    pub fn from_config(config: &Config) -> Self {
        Self {
            app_name: config.app_name.clone(),
            deployment: config.deployment.clone(),
            auth_enabled: config.auth_enabled,
            storage_backend: config.storage_backend,
            max_upload_bytes: config.max_upload_bytes,
        }
    }
}

#[derive(ToSchema, Deserialize, Serialize)]
pub struct HealthCheck {
    pub status: String,
    pub database: String,
    #[serde(rename = "storageBackend")]
    pub storage_backend: StorageBackend,
}
