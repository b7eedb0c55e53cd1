use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::{DbErr, SqlErr};
use serde_json::json;
use std::collections::BTreeMap;

/// Field-level problems keyed by the flattened form key, e.g. `quality_inspections[0].sample_mass_kg`
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Application errors rendered as `{"error": {"code", "message", "type"}}`
#[derive(Debug, Clone, thiserror::Error)]
pub enum BusinessError {
    /// Validation errors for user input (400 Bad Request)
    #[error("Validation error in field '{field}': {message}")]
    ValidationError { field: String, message: String },
    /// A whole submission rejected with one or more field errors (400 Bad Request)
    #[error("Submission is invalid ({} field(s))", fields.len())]
    InvalidSubmission { fields: FieldErrors },
    /// Business rule violations (422 Unprocessable Entity)
    #[error("Business rule '{rule}' violated: {message}")]
    BusinessRuleViolation { rule: String, message: String },
    /// Resource not found (404 Not Found)
    #[error("{resource} with id '{id}' not found")]
    NotFound { resource: String, id: String },
    /// Duplicate resource (409 Conflict)
    #[error("{resource} with this {field} already exists")]
    Duplicate { resource: String, field: String },
    /// Row still referenced elsewhere (409 Conflict)
    #[error("{resource} is still referenced: {message}")]
    Conflict { resource: String, message: String },
    /// Missing or invalid credentials (401 Unauthorized)
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },
    /// Permission denied (403 Forbidden)
    #[error("Not authorized to {action} {resource}")]
    Forbidden { action: String, resource: String },
    /// External service errors (502 Bad Gateway)
    #[error("External service '{service}' error: {message}")]
    ExternalServiceError { service: String, message: String },
    /// Generic application error (500 Internal Server Error)
    #[error("Internal error: {message}")]
    InternalError { message: String },
}

impl BusinessError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            BusinessError::ValidationError { .. } | BusinessError::InvalidSubmission { .. } => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR")
            }
            BusinessError::BusinessRuleViolation { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "BUSINESS_RULE_VIOLATION")
            }
            BusinessError::NotFound { .. } => (StatusCode::NOT_FOUND, "RESOURCE_NOT_FOUND"),
            BusinessError::Duplicate { .. } => (StatusCode::CONFLICT, "DUPLICATE_RESOURCE"),
            BusinessError::Conflict { .. } => (StatusCode::CONFLICT, "RESOURCE_IN_USE"),
            BusinessError::Unauthorized { .. } => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            BusinessError::Forbidden { .. } => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            BusinessError::ExternalServiceError { .. } => {
                (StatusCode::BAD_GATEWAY, "EXTERNAL_SERVICE_ERROR")
            }
            BusinessError::InternalError { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            BusinessError::ValidationError { .. } => "ValidationError",
            BusinessError::InvalidSubmission { .. } => "InvalidSubmission",
            BusinessError::BusinessRuleViolation { .. } => "BusinessRuleViolation",
            BusinessError::NotFound { .. } => "NotFound",
            BusinessError::Duplicate { .. } => "Duplicate",
            BusinessError::Conflict { .. } => "Conflict",
            BusinessError::Unauthorized { .. } => "Unauthorized",
            BusinessError::Forbidden { .. } => "Forbidden",
            BusinessError::ExternalServiceError { .. } => "ExternalServiceError",
            BusinessError::InternalError { .. } => "InternalError",
        }
    }
}

impl IntoResponse for BusinessError {
    fn into_response(self) -> Response {
        let (status, error_code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!(code = error_code, "{self}");
        } else {
            tracing::debug!(code = error_code, "{self}");
        }

        let mut error = json!({
            "code": error_code,
            "message": self.to_string(),
            "type": self.type_name(),
        });
        if let BusinessError::InvalidSubmission { fields } = &self {
            error["fields"] = json!(fields);
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}

/// Maps database errors onto business errors with a resource context
pub struct ErrorMapper;

impl ErrorMapper {
    pub fn map_db_error(err: DbErr, context: &str) -> BusinessError {
        let resource = Self::resource_from_context(context);

        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(msg)) => {
                return BusinessError::Duplicate {
                    resource,
                    field: Self::field_from_constraint(&msg),
                };
            }
            Some(SqlErr::ForeignKeyConstraintViolation(msg)) => {
                return BusinessError::Conflict {
                    resource,
                    message: msg,
                };
            }
            _ => {}
        }

        match err {
            DbErr::RecordNotFound(msg) => BusinessError::NotFound {
                resource,
                id: Self::id_from_message(&msg),
            },
            DbErr::Custom(msg) => {
                if let Some(rest) = msg.strip_prefix("Validation failed:") {
                    let rest = rest.trim();
                    let field = rest.split_whitespace().next().unwrap_or("unknown");
                    BusinessError::ValidationError {
                        field: field.to_string(),
                        message: rest.to_string(),
                    }
                } else {
                    BusinessError::InternalError { message: msg }
                }
            }
            DbErr::Conn(conn_err) => BusinessError::ExternalServiceError {
                service: "database".to_string(),
                message: conn_err.to_string(),
            },
            other => BusinessError::InternalError {
                message: other.to_string(),
            },
        }
    }

    fn resource_from_context(context: &str) -> String {
        context.replace('_', " ")
    }

    /// Pulls a UUID out of messages like "Inspection with id 'abc' not found"
    fn id_from_message(msg: &str) -> String {
        msg.split(|c: char| c.is_whitespace() || c == '\'' || c == '"')
            .find(|word| uuid::Uuid::parse_str(word).is_ok())
            .unwrap_or("unknown")
            .to_string()
    }

    fn field_from_constraint(msg: &str) -> String {
        // SQLite: "UNIQUE constraint failed: users.username"
        if let Some(column) = msg
            .split("constraint failed:")
            .nth(1)
            .and_then(|rest| rest.trim().split('.').nth(1))
        {
            return column.trim().to_string();
        }
        // Postgres: "duplicate key value violates unique constraint \"users_username_key\""
        if msg.contains("username") {
            "username".to_string()
        } else {
            "field".to_string()
        }
    }
}

#[macro_export]
macro_rules! validation_error {
    ($field:expr, $message:expr) => {
        $crate::common::errors::BusinessError::ValidationError {
            field: $field.to_string(),
            message: $message.to_string(),
        }
    };
}

#[macro_export]
macro_rules! not_found {
    ($resource:expr, $id:expr) => {
        $crate::common::errors::BusinessError::NotFound {
            resource: $resource.to_string(),
            id: $id.to_string(),
        }
    };
}

pub trait DbErrorExt {
    fn to_business_error(self, context: &str) -> BusinessError;
}

impl DbErrorExt for DbErr {
    fn to_business_error(self, context: &str) -> BusinessError {
        ErrorMapper::map_db_error(self, context)
    }
}

pub type BusinessResult<T> = Result<T, BusinessError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_creation() {
        let err = validation_error!("inspection_date", "must be YYYY-MM-DD");
        assert!(matches!(err, BusinessError::ValidationError { .. }));
        assert!(err.to_string().contains("inspection_date"));
    }

    #[test]
    fn test_error_mapper_validation() {
        let db_err = DbErr::Custom("Validation failed: quantity_of_pallets must be positive".to_string());
        match ErrorMapper::map_db_error(db_err, "mushroom_storage") {
            BusinessError::ValidationError { field, message } => {
                assert_eq!(field, "quantity_of_pallets");
                assert!(message.contains("must be positive"));
            }
            other => panic!("Expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_error_mapper_not_found() {
        let id = uuid::Uuid::new_v4();
        let db_err = DbErr::RecordNotFound(format!("Inspection with id '{id}' not found"));
        match ErrorMapper::map_db_error(db_err, "inspection") {
            BusinessError::NotFound { resource, id: found } => {
                assert_eq!(resource, "inspection");
                assert_eq!(found, id.to_string());
            }
            other => panic!("Expected not found error, got {other:?}"),
        }
    }

    #[test]
    fn test_constraint_field_extraction() {
        assert_eq!(
            ErrorMapper::field_from_constraint("UNIQUE constraint failed: users.username"),
            "username"
        );
        assert_eq!(ErrorMapper::field_from_constraint("something else"), "field");
    }

    #[tokio::test]
    async fn test_invalid_submission_renders_fields() {
        let mut fields = FieldErrors::new();
        fields.insert(
            "quality_inspections[0].sample_mass_kg".to_string(),
            vec!["must be a decimal number".to_string()],
        );
        let response = BusinessError::InvalidSubmission { fields }.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(body["error"]["type"], "InvalidSubmission");
        assert_eq!(
            body["error"]["fields"]["quality_inspections[0].sample_mass_kg"][0],
            "must be a decimal number"
        );
    }
}
