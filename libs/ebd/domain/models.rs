use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Wire format for every date field (`data`, `data_nascimento`, report bounds)
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Serde adapter that keeps dates as `YYYY-MM-DD` on the wire
pub mod date_format {
    use super::DATE_FORMAT;
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&date.format(DATE_FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        NaiveDate::parse_from_str(&raw, DATE_FORMAT).map_err(serde::de::Error::custom)
    }
}

/// Parse a `YYYY-MM-DD` date
pub fn parse_date(raw: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
}

/// Registered API user
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i32,
    pub username: String,
    #[serde(skip)]
    pub password_hash: String,
}

/// Sunday-school class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Class {
    pub id: i32,
    pub nome: String,
    pub professor: String,
}

/// Enrollment status, stored as the `status_aluno` Postgres enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "status_aluno")]
pub enum StudentStatus {
    #[default]
    #[serde(rename = "MATRICULADO")]
    #[sqlx(rename = "MATRICULADO")]
    Enrolled,
    #[serde(rename = "DESMATRICULADO")]
    #[sqlx(rename = "DESMATRICULADO")]
    Unenrolled,
}

impl StudentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StudentStatus::Enrolled => "MATRICULADO",
            StudentStatus::Unenrolled => "DESMATRICULADO",
        }
    }
}

impl fmt::Display for StudentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StudentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MATRICULADO" => Ok(StudentStatus::Enrolled),
            "DESMATRICULADO" => Ok(StudentStatus::Unenrolled),
            other => Err(format!("unknown status: {}", other)),
        }
    }
}

/// Student enrolled in a class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Student {
    pub id: i32,
    pub nome: String,
    #[serde(with = "date_format")]
    pub data_nascimento: NaiveDate,
    pub status: StudentStatus,
    pub classe_id: i32,
}

/// Attendance record of one class on one date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Attendance {
    pub id: i32,
    pub classe_id: i32,
    #[serde(with = "date_format")]
    pub data: NaiveDate,
    pub total_biblia: i32,
    pub total_present: i32,
    pub total_absent: i32,
    pub total_visitors: i32,
    pub total_general: i32,
    /// Free-form per-student entries, usually `[{"aluno_id": 1, ...}]`
    pub presencas: Option<Value>,
}

/// Attendance record annotated with one student's entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryRecord {
    #[serde(flatten)]
    pub attendance: Attendance,
    pub presenca: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_student_serializes_date_and_status() {
        let student = Student {
            id: 7,
            nome: "Maria".to_string(),
            data_nascimento: NaiveDate::from_ymd_opt(2010, 3, 9).unwrap(),
            status: StudentStatus::Enrolled,
            classe_id: 2,
        };

        let value = serde_json::to_value(&student).unwrap();
        assert_eq!(
            value,
            json!({
                "id": 7,
                "nome": "Maria",
                "data_nascimento": "2010-03-09",
                "status": "MATRICULADO",
                "classe_id": 2
            })
        );
    }

    #[test]
    fn test_user_hides_password_hash() {
        let user = User {
            id: 1,
            username: "admin".to_string(),
            password_hash: "pbkdf2:sha256:1$salt$abc".to_string(),
        };

        let value = serde_json::to_value(&user).unwrap();
        assert_eq!(value, json!({"id": 1, "username": "admin"}));
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("MATRICULADO".parse::<StudentStatus>(), Ok(StudentStatus::Enrolled));
        assert_eq!(
            "DESMATRICULADO".parse::<StudentStatus>(),
            Ok(StudentStatus::Unenrolled)
        );
        assert!("matriculado".parse::<StudentStatus>().is_err());
        assert_eq!(StudentStatus::default(), StudentStatus::Enrolled);
    }

    #[test]
    fn test_history_record_flattens_attendance() {
        let record = HistoryRecord {
            attendance: Attendance {
                id: 3,
                classe_id: 1,
                data: NaiveDate::from_ymd_opt(2024, 5, 12).unwrap(),
                total_biblia: 4,
                total_present: 10,
                total_absent: 2,
                total_visitors: 1,
                total_general: 13,
                presencas: Some(json!([{"aluno_id": 5, "presente": true}])),
            },
            presenca: json!({"aluno_id": 5, "presente": true}),
        };

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["data"], "2024-05-12");
        assert_eq!(value["presenca"]["aluno_id"], 5);
        assert_eq!(value["total_general"], 13);
    }

    #[test]
    fn test_parse_date_rejects_other_formats() {
        assert!(parse_date("2024-02-29").is_ok());
        assert!(parse_date("29/02/2024").is_err());
        assert!(parse_date("2023-02-29").is_err());
    }
}
