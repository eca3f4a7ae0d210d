use crate::domain::ValidationError;
use crate::infrastructure::DatabaseError;
use thiserror::Error;

/// Failure of an application use case
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn invalid(message: impl Into<String>) -> Self {
        ServiceError::Validation(ValidationError::new(message))
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ServiceError::NotFound(message.into())
    }
}

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

pub const MSG_CLASS_NOT_FOUND: &str = "Classe não encontrada";
pub const MSG_STUDENT_NOT_FOUND: &str = "Aluno não encontrado";
pub const MSG_ATTENDANCE_NOT_FOUND: &str = "Frequência não encontrada";
