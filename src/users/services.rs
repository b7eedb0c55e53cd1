use super::models::{ActiveModel, Column, Entity, Model, Role, UserCreate};
use crate::common::errors::{BusinessError, BusinessResult, DbErrorExt};
use crate::config::Config;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum LoginError {
    #[error("username and password are required")]
    MissingCredentials,
    #[error("User not found")]
    UnknownUser(String),
    #[error("Wrong password")]
    WrongPassword,
}

impl From<LoginError> for BusinessError {
    fn from(err: LoginError) -> Self {
        match err {
            LoginError::MissingCredentials => BusinessError::ValidationError {
                field: "username".to_string(),
                message: err.to_string(),
            },
            LoginError::UnknownUser(username) => BusinessError::NotFound {
                resource: "user".to_string(),
                id: username,
            },
            LoginError::WrongPassword => BusinessError::Unauthorized {
                message: err.to_string(),
            },
        }
    }
}

fn blocking_failure(err: &tokio::task::JoinError) -> BusinessError {
    BusinessError::InternalError {
        message: format!("Password hashing task failed: {err}"),
    }
}

pub async fn hash_password(password: String, cost: u32) -> BusinessResult<String> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| blocking_failure(&e))?
        .map_err(|e| BusinessError::InternalError {
            message: format!("Could not hash password: {e}"),
        })
}

async fn verify_password(password: String, hash: String) -> BusinessResult<bool> {
    let verified = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| blocking_failure(&e))?;
    // An unparseable stored hash can never match
    Ok(verified.unwrap_or(false))
}

pub async fn create_user(
    db: &DatabaseConnection,
    bcrypt_cost: u32,
    data: UserCreate,
) -> BusinessResult<Model> {
    let username = data.username.trim().to_string();
    if username.is_empty() {
        return Err(crate::validation_error!("username", "must not be empty"));
    }
    if data.password.is_empty() {
        return Err(crate::validation_error!("password", "must not be empty"));
    }

    let password_hash = hash_password(data.password, bcrypt_cost).await?;
    ActiveModel {
        id: Set(Uuid::new_v4()),
        username: Set(username),
        password_hash: Set(password_hash),
        first_name: Set(data.first_name),
        last_name: Set(data.last_name),
        role: Set(data.role),
        created_at: Set(chrono::Utc::now()),
    }
    .insert(db)
    .await
    .map_err(|e| e.to_business_error("user"))
}

pub async fn list_users(db: &DatabaseConnection) -> BusinessResult<Vec<Model>> {
    Entity::find()
        .order_by_asc(Column::Username)
        .all(db)
        .await
        .map_err(|e| e.to_business_error("user"))
}

pub async fn authenticate(
    db: &DatabaseConnection,
    username: Option<String>,
    password: Option<String>,
) -> BusinessResult<Model> {
    let (Some(username), Some(password)) = (
        username.filter(|u| !u.is_empty()),
        password.filter(|p| !p.is_empty()),
    ) else {
        return Err(LoginError::MissingCredentials.into());
    };

    let user = Entity::find()
        .filter(Column::Username.eq(username.as_str()))
        .one(db)
        .await
        .map_err(|e| e.to_business_error("user"))?
        .ok_or(LoginError::UnknownUser(username))?;

    if verify_password(password, user.password_hash.clone()).await? {
        Ok(user)
    } else {
        tracing::info!(user = %user.username, "Rejected login with wrong password");
        Err(LoginError::WrongPassword.into())
    }
}

/// Creates the bootstrap administrator when the user table is empty
pub async fn ensure_admin(db: &DatabaseConnection, config: &Config) -> BusinessResult<Option<Model>> {
    let (Some(username), Some(password)) = (&config.admin_username, &config.admin_password) else {
        return Ok(None);
    };

    let existing = Entity::find()
        .count(db)
        .await
        .map_err(|e| e.to_business_error("user"))?;
    if existing > 0 {
        return Ok(None);
    }

    let admin = create_user(
        db,
        config.bcrypt_cost,
        UserCreate {
            username: username.clone(),
            password: password.clone(),
            first_name: String::new(),
            last_name: String::new(),
            role: Role::Admin,
        },
    )
    .await?;
    tracing::info!(user = %admin.username, "Created bootstrap administrator");
    Ok(Some(admin))
}
