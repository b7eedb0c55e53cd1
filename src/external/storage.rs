use crate::common::errors::BusinessError;
use crate::config::{Config, StorageBackend};
use crate::external::s3;
use async_trait::async_trait;
use aws_sdk_s3::Client as S3Client;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Storage key '{0}' is not allowed")]
    InvalidKey(String),
    #[error("Object '{0}' not found")]
    NotFound(String),
    #[error("I/O error on '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{0}")]
    S3(String),
}

impl From<StorageError> for BusinessError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(key) => BusinessError::NotFound {
                resource: "file".to_string(),
                id: key,
            },
            StorageError::InvalidKey(key) => BusinessError::ValidationError {
                field: "storage_key".to_string(),
                message: format!("'{key}' is not a valid storage key"),
            },
            other => BusinessError::ExternalServiceError {
                service: "storage".to_string(),
                message: other.to_string(),
            },
        }
    }
}

/// Byte storage for photos and generated reports, addressed by slash-separated keys
#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), StorageError>;
    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError>;
    /// Deleting a missing key is not an error
    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}

pub struct LocalMediaStore {
    root: PathBuf,
}

impl LocalMediaStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn resolve(&self, key: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(key);
        let only_normal = relative
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
        if key.is_empty() || !only_normal {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl MediaStore for LocalMediaStore {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), StorageError> {
        let path = self.resolve(key)?;
        let io_err = |source| StorageError::Io {
            key: key.to_string(),
            source,
        };
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }
        tokio::fs::write(&path, bytes).await.map_err(io_err)
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.resolve(key)?;
        tokio::fs::read(&path).await.map_err(|source| {
            if source.kind() == ErrorKind::NotFound {
                StorageError::NotFound(key.to_string())
            } else {
                StorageError::Io {
                    key: key.to_string(),
                    source,
                }
            }
        })
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.resolve(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(source) if source.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }
}

pub struct S3MediaStore {
    client: Arc<S3Client>,
    bucket: String,
}

impl S3MediaStore {
    pub async fn new(config: &Config) -> Self {
        Self {
            client: s3::get_client(config).await,
            bucket: config.s3_bucket_id.clone(),
        }
    }
}

#[async_trait]
impl MediaStore for S3MediaStore {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), StorageError> {
        s3::put_object(&self.client, &self.bucket, key, bytes)
            .await
            .map_err(StorageError::S3)
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        s3::get_object(&self.client, &self.bucket, key)
            .await
            .map_err(StorageError::S3)
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        s3::delete_object(&self.client, &self.bucket, key)
            .await
            .map_err(StorageError::S3)
    }
}

pub async fn build_media_store(config: &Config) -> Arc<dyn MediaStore> {
    match config.storage_backend {
        StorageBackend::Local => {
            tracing::info!("Storing media under {}", config.media_root.display());
            Arc::new(LocalMediaStore::new(config.media_root.clone()))
        }
        StorageBackend::S3 => {
            tracing::info!("Storing media in S3 bucket {}", config.s3_bucket_id);
            Arc::new(S3MediaStore::new(config).await)
        }
    }
}
