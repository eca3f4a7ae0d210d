//! Request payloads and the validated commands built from them
//!
//! Payload fields are all optional so that presence can be checked the way
//! the API contract demands: create operations require specific keys, update
//! operations apply only the keys that were sent. A JSON `null` counts as
//! absent.

use super::models::{parse_date, StudentStatus};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

pub const MSG_CREDENTIALS_REQUIRED: &str = "Username e password são obrigatórios";
pub const MSG_CLASS_FIELDS_REQUIRED: &str = "Campos \"nome\" e \"professor\" são obrigatórios";
pub const MSG_STUDENT_FIELDS_REQUIRED: &str = "Campos obrigatórios ausentes";
pub const MSG_ATTENDANCE_FIELDS_REQUIRED: &str = "Campos \"classe_id\" e \"data\" são obrigatórios";
pub const MSG_INVALID_DATE: &str = "Formato de data inválido";
pub const MSG_INVALID_STATUS: &str = "Status inválido";

/// Rejected input, rendered as `{"msg": message, "error": detail}`
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct ValidationError {
    pub message: String,
    pub detail: Option<String>,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            detail: None,
        }
    }

    pub fn with_detail(message: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            detail: Some(detail.into()),
        }
    }
}

fn required_text(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn date_field(raw: &str) -> Result<NaiveDate, ValidationError> {
    parse_date(raw).map_err(|e| ValidationError::with_detail(MSG_INVALID_DATE, e.to_string()))
}

// ==================== AUTH ====================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Credentials {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Credentials {
    /// Both fields present and non-empty
    pub fn require(self) -> Result<(String, String), ValidationError> {
        match (required_text(self.username), required_text(self.password)) {
            (Some(username), Some(password)) => Ok((username, password)),
            _ => Err(ValidationError::new(MSG_CREDENTIALS_REQUIRED)),
        }
    }
}

// ==================== CLASSES ====================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClassPayload {
    pub nome: Option<String>,
    pub professor: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewClass {
    pub nome: String,
    pub professor: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassUpdate {
    pub nome: Option<String>,
    pub professor: Option<String>,
}

impl ClassPayload {
    pub fn into_new(self) -> Result<NewClass, ValidationError> {
        match (required_text(self.nome), required_text(self.professor)) {
            (Some(nome), Some(professor)) => Ok(NewClass { nome, professor }),
            _ => Err(ValidationError::new(MSG_CLASS_FIELDS_REQUIRED)),
        }
    }

    pub fn into_update(self) -> ClassUpdate {
        ClassUpdate {
            nome: self.nome,
            professor: self.professor,
        }
    }
}

// ==================== STUDENTS ====================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StudentPayload {
    pub nome: Option<String>,
    pub data_nascimento: Option<String>,
    pub classe_id: Option<i32>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewStudent {
    pub nome: String,
    pub data_nascimento: NaiveDate,
    pub classe_id: i32,
    pub status: StudentStatus,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StudentUpdate {
    pub nome: Option<String>,
    pub data_nascimento: Option<NaiveDate>,
    pub classe_id: Option<i32>,
    pub status: Option<StudentStatus>,
}

fn status_field(raw: &str) -> Result<StudentStatus, ValidationError> {
    raw.parse::<StudentStatus>()
        .map_err(|e| ValidationError::with_detail(MSG_INVALID_STATUS, e))
}

impl StudentPayload {
    pub fn into_new(self) -> Result<NewStudent, ValidationError> {
        let (Some(nome), Some(raw_date), Some(classe_id)) =
            (self.nome, self.data_nascimento, self.classe_id)
        else {
            return Err(ValidationError::new(MSG_STUDENT_FIELDS_REQUIRED));
        };

        let status = match self.status.as_deref() {
            Some(raw) => status_field(raw)?,
            None => StudentStatus::default(),
        };

        Ok(NewStudent {
            nome,
            data_nascimento: date_field(&raw_date)?,
            classe_id,
            status,
        })
    }

    pub fn into_update(self) -> Result<StudentUpdate, ValidationError> {
        Ok(StudentUpdate {
            nome: self.nome,
            data_nascimento: self.data_nascimento.as_deref().map(date_field).transpose()?,
            classe_id: self.classe_id,
            status: self.status.as_deref().map(status_field).transpose()?,
        })
    }
}

// ==================== ATTENDANCE ====================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AttendancePayload {
    pub classe_id: Option<i32>,
    pub data: Option<String>,
    pub total_biblia: Option<i32>,
    pub total_present: Option<i32>,
    pub total_absent: Option<i32>,
    pub total_visitors: Option<i32>,
    pub total_general: Option<i32>,
    pub presencas: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewAttendance {
    pub classe_id: i32,
    pub data: NaiveDate,
    pub total_biblia: i32,
    pub total_present: i32,
    pub total_absent: i32,
    pub total_visitors: i32,
    pub total_general: i32,
    pub presencas: Value,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttendanceUpdate {
    pub classe_id: Option<i32>,
    pub data: Option<NaiveDate>,
    pub total_biblia: Option<i32>,
    pub total_present: Option<i32>,
    pub total_absent: Option<i32>,
    pub total_visitors: Option<i32>,
    pub total_general: Option<i32>,
    pub presencas: Option<Value>,
}

impl AttendancePayload {
    pub fn into_new(self) -> Result<NewAttendance, ValidationError> {
        let (Some(classe_id), Some(raw_date)) = (self.classe_id, self.data) else {
            return Err(ValidationError::new(MSG_ATTENDANCE_FIELDS_REQUIRED));
        };

        Ok(NewAttendance {
            classe_id,
            data: date_field(&raw_date)?,
            total_biblia: self.total_biblia.unwrap_or(0),
            total_present: self.total_present.unwrap_or(0),
            total_absent: self.total_absent.unwrap_or(0),
            total_visitors: self.total_visitors.unwrap_or(0),
            total_general: self.total_general.unwrap_or(0),
            presencas: self.presencas.unwrap_or_else(|| Value::Array(Vec::new())),
        })
    }

    pub fn into_update(self) -> Result<AttendanceUpdate, ValidationError> {
        Ok(AttendanceUpdate {
            classe_id: self.classe_id,
            data: self.data.as_deref().map(date_field).transpose()?,
            total_biblia: self.total_biblia,
            total_present: self.total_present,
            total_absent: self.total_absent,
            total_visitors: self.total_visitors,
            total_general: self.total_general,
            presencas: self.presencas,
        })
    }
}
