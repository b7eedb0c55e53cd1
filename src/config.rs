use anyhow::{Context, Result, bail};
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Where photo and report files are kept
#[derive(Serialize, Deserialize, utoipa::ToSchema, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Local,
    S3,
}

/// Organisation details printed on generated reports
#[derive(Deserialize, Debug, Clone)]
pub struct ReportSettings {
    pub customer: String,
    pub inspection_site: String,
    pub issuer: String,
    pub issued_in: String,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            customer: "ТОО «ЭКО ГОРОД ТРЭЙД», РЕСПУБЛИКА КАЗАХСТАН".to_string(),
            inspection_site: "КФХ «ГРИБНАЯ СТРАНА», РЕСПУБЛИКА БЕЛАРУСЬ, БРЕСТСКАЯ ОБЛ., \
                              БАРАНОВИЧСКИЙ Р-Н, МАЛАХОВЕЦКИЙ С/С, ЗДАНИЕ 21"
                .to_string(),
            issuer: "ИП «СЖС МИНСК» ООО".to_string(),
            issued_in: "МИНСКЕ".to_string(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    pub db_url: Option<String>,
    pub app_name: String,
    pub deployment: String,
    pub jwt_secret: String,
    pub access_token_minutes: i64,
    pub refresh_token_days: i64,
    pub auth_enabled: bool,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
    pub bcrypt_cost: u32,
    pub storage_backend: StorageBackend,
    pub media_root: PathBuf,
    pub s3_access_key: String,
    pub s3_secret_key: String,
    pub s3_bucket_id: String,
    pub s3_url: String,
    pub max_upload_bytes: usize,
    pub report: ReportSettings,
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parsed_var<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .with_context(|| format!("{name} has an invalid value: {value}")),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok(); // Load from .env file if available

        let db_url = match env::var("DB_URL") {
            Ok(url) => Some(url),
            Err(_) => Some(format!(
                "{}://{}:{}@{}:{}/{}",
                var_or("DB_PREFIX", "postgresql"),
                env::var("DB_USER").context("DB_USER must be set")?,
                env::var("DB_PASSWORD").context("DB_PASSWORD must be set")?,
                env::var("DB_HOST").context("DB_HOST must be set")?,
                var_or("DB_PORT", "5432"),
                env::var("DB_NAME").context("DB_NAME must be set")?,
            )),
        };

        let storage_backend = match var_or("STORAGE_BACKEND", "local").to_lowercase().as_str() {
            "local" => StorageBackend::Local,
            "s3" => StorageBackend::S3,
            other => bail!("STORAGE_BACKEND must be local or s3, got {other}"),
        };

        let s3_var = |name: &str| -> Result<String> {
            match storage_backend {
                StorageBackend::S3 => env::var(name).with_context(|| format!("{name} must be set")),
                StorageBackend::Local => Ok(env::var(name).unwrap_or_default()),
            }
        };

        let defaults = ReportSettings::default();
        let max_upload_mb: usize = parsed_var("MAX_UPLOAD_MB", 200)?;

        Ok(Config {
            app_name: env::var("APP_NAME").context("APP_NAME must be set")?,
            deployment: env::var("DEPLOYMENT")
                .context("DEPLOYMENT must be set, this can be local, dev, stage, or prod")?,
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            access_token_minutes: parsed_var("ACCESS_TOKEN_MINUTES", 60)?,
            refresh_token_days: parsed_var("REFRESH_TOKEN_DAYS", 7)?,
            auth_enabled: parsed_var("AUTH_ENABLED", true)?,
            admin_username: env::var("ADMIN_USERNAME").ok(),
            admin_password: env::var("ADMIN_PASSWORD").ok(),
            bcrypt_cost: parsed_var("BCRYPT_COST", bcrypt::DEFAULT_COST)?,
            storage_backend,
            media_root: PathBuf::from(var_or("MEDIA_ROOT", "media")),
            s3_access_key: s3_var("S3_ACCESS_KEY")?,
            s3_secret_key: s3_var("S3_SECRET_KEY")?,
            s3_bucket_id: s3_var("S3_BUCKET_ID")?,
            s3_url: s3_var("S3_URL")?,
            max_upload_bytes: max_upload_mb * 1024 * 1024,
            report: ReportSettings {
                customer: var_or("REPORT_CUSTOMER", &defaults.customer),
                inspection_site: var_or("REPORT_INSPECTION_SITE", &defaults.inspection_site),
                issuer: var_or("REPORT_ISSUER", &defaults.issuer),
                issued_in: var_or("REPORT_ISSUED_IN", &defaults.issued_in),
            },
            db_url,
        })
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Config {
            app_name: "mushroom-inspection-api-test".to_string(),
            deployment: "test".to_string(),
            jwt_secret: "test-secret".to_string(),
            access_token_minutes: 60,
            refresh_token_days: 7,
            auth_enabled: false,
            admin_username: None,
            admin_password: None,
            bcrypt_cost: 4,
            storage_backend: StorageBackend::Local,
            media_root: PathBuf::from("media"),
            s3_access_key: String::new(),
            s3_secret_key: String::new(),
            s3_bucket_id: String::new(),
            s3_url: String::new(),
            max_upload_bytes: 50 * 1024 * 1024,
            report: ReportSettings::default(),
            db_url: None,
        }
    }
}

#[cfg(test)]
pub mod test_helpers {
    use super::Config;
    use crate::common::state::AppState;
    use crate::external::storage::LocalMediaStore;
    use crate::routes::build_router;
    use crate::users::models::{self as users, Role};
    use axum::Router;
    use axum::body::Body;
    use axum::response::Response;
    use migration::{Migrator, MigratorTrait};
    use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};
    use std::sync::Arc;
    use tempfile::TempDir;
    use uuid::Uuid;

    pub struct TestApp {
        pub router: Router,
        pub state: AppState,
        // Held so the media directory outlives the test
        pub media_dir: TempDir,
    }

    /// Fresh in-memory SQLite database with all migrations applied
    pub async fn setup_test_db() -> DatabaseConnection {
        let mut options = ConnectOptions::new("sqlite::memory:");
        // A second connection would open a different in-memory database
        options.max_connections(1).min_connections(1).sqlx_logging(false);

        let db = Database::connect(options)
            .await
            .expect("Failed to connect to test database");
        Migrator::up(&db, None)
            .await
            .expect("Failed to run database migrations");
        db
    }

    pub async fn setup_test_app() -> TestApp {
        setup_test_app_with(Config::for_tests()).await
    }

    pub async fn setup_test_app_with(mut config: Config) -> TestApp {
        let db = setup_test_db().await;
        let media_dir = TempDir::new().expect("Failed to create media directory");
        config.media_root = media_dir.path().to_path_buf();

        let media = Arc::new(LocalMediaStore::new(config.media_root.clone()));
        let state = AppState::new(db, config, media);
        let router = build_router(&state);

        TestApp {
            router,
            state,
            media_dir,
        }
    }

    /// Inserts a user directly; inspections need one as inspector
    pub async fn create_test_user(
        db: &DatabaseConnection,
        username: &str,
        password: &str,
        role: Role,
    ) -> users::Model {
        let password_hash = bcrypt::hash(password, 4).expect("Failed to hash password");
        users::ActiveModel {
            id: Set(Uuid::new_v4()),
            username: Set(username.to_string()),
            password_hash: Set(password_hash),
            first_name: Set("Ivan".to_string()),
            last_name: Set("Petrov".to_string()),
            role: Set(role),
            created_at: Set(chrono::Utc::now()),
        }
        .insert(db)
        .await
        .expect("Failed to insert test user")
    }

    pub async fn extract_response_body(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read response body");
        serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
    }

    pub async fn extract_response_bytes(response: Response) -> Vec<u8> {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read response body")
            .to_vec()
    }

    pub fn json_request(method: &str, uri: &str, body: &serde_json::Value) -> axum::http::Request<Body> {
        axum::http::Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("Failed to build request")
    }

    pub fn get_request(uri: &str) -> axum::http::Request<Body> {
        axum::http::Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .expect("Failed to build request")
    }

    /// Builds a `multipart/form-data` body from text fields and file parts
    pub fn multipart_body(
        fields: &[(&str, String)],
        files: &[(&str, &str, Vec<u8>)],
    ) -> (String, Vec<u8>) {
        let boundary = "----inspection-test-boundary";
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
            body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
            );
            body.extend_from_slice(value.as_bytes());
            body.extend_from_slice(b"\r\n");
        }
        for (name, filename, bytes) in files {
            body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
            body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
        (format!("multipart/form-data; boundary={boundary}"), body)
    }

    /// A small valid PNG, `width` x `height` pixels
    pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let image = image::RgbImage::from_pixel(width, height, image::Rgb([120, 90, 60]));
        let mut bytes = std::io::Cursor::new(Vec::new());
        image
            .write_to(&mut bytes, image::ImageFormat::Png)
            .expect("Failed to encode PNG");
        bytes.into_inner()
    }

    /// ZIP archive holding the given (name, bytes) entries in order
    pub fn zip_bytes(entries: &[(&str, Vec<u8>)]) -> Vec<u8> {
        use std::io::Write;
        let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored);
        for (name, bytes) in entries {
            if name.ends_with('/') {
                writer
                    .add_directory(*name, options)
                    .expect("Failed to add directory");
            } else {
                writer.start_file(*name, options).expect("Failed to start entry");
                writer.write_all(bytes).expect("Failed to write entry");
            }
        }
        writer
            .finish()
            .expect("Failed to finish archive")
            .into_inner()
    }
}
