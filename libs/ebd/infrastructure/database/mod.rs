pub mod schema;

use crate::domain::{
    Attendance, AttendanceUpdate, Class, ClassUpdate, NewAttendance, NewClass, NewStudent,
    Student, StudentUpdate, User,
};
use crate::infrastructure::config::DatabaseConfig;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

// Re-export schema helpers
pub use schema::{initialize_schema, SCHEMA_VERSION};

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Database connection error: {0}")]
    ConnectionError(#[from] sqlx::Error),

    #[error("Schema error: {0}")]
    SchemaError(#[from] schema::SchemaError),

    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("Foreign key constraint violated: {0}")]
    ForeignKeyViolation(String),
}

pub type Result<T> = std::result::Result<T, DatabaseError>;

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Map constraint violations to dedicated variants, everything else stays a
/// connection-level error
fn classify(err: sqlx::Error) -> DatabaseError {
    if let sqlx::Error::Database(db_err) = &err {
        let constraint = db_err.constraint().unwrap_or_default().to_string();
        match db_err.code().as_deref() {
            Some(UNIQUE_VIOLATION) => return DatabaseError::UniqueViolation(constraint),
            Some(FOREIGN_KEY_VIOLATION) => return DatabaseError::ForeignKeyViolation(constraint),
            _ => {}
        }
    }
    DatabaseError::ConnectionError(err)
}

/// Persistence port used by the application services
///
/// `update_*` return `None` and `delete_*` return `false` when the id is
/// unknown.
#[async_trait]
pub trait Store: Send + Sync {
    async fn ping(&self) -> Result<()>;

    /// Release connections once no more requests will be served
    async fn close(&self) {}

    // Users
    async fn create_user(&self, username: &str, password_hash: &str) -> Result<User>;
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>>;

    // Classes
    async fn list_classes(&self) -> Result<Vec<Class>>;
    async fn create_class(&self, class: NewClass) -> Result<Class>;
    async fn update_class(&self, id: i32, update: ClassUpdate) -> Result<Option<Class>>;
    async fn delete_class(&self, id: i32) -> Result<bool>;

    // Students
    async fn list_students(&self) -> Result<Vec<Student>>;
    async fn create_student(&self, student: NewStudent) -> Result<Student>;
    async fn update_student(&self, id: i32, update: StudentUpdate) -> Result<Option<Student>>;
    async fn delete_student(&self, id: i32) -> Result<bool>;
    async fn students_born_on(&self, month: u32, day: u32) -> Result<Vec<Student>>;

    // Attendance
    async fn list_attendance(&self) -> Result<Vec<Attendance>>;
    async fn create_attendance(&self, attendance: NewAttendance) -> Result<Attendance>;
    async fn update_attendance(
        &self,
        id: i32,
        update: AttendanceUpdate,
    ) -> Result<Option<Attendance>>;
    async fn delete_attendance(&self, id: i32) -> Result<bool>;
    async fn attendance_between(&self, start: NaiveDate, end: NaiveDate)
        -> Result<Vec<Attendance>>;
}

// `users.created_at` is left out: databases created by earlier deployments
// hold it as TIMESTAMP rather than TIMESTAMPTZ
const USER_COLUMNS: &str = "id, username, password_hash";
const CLASS_COLUMNS: &str = "id, nome, professor";
const STUDENT_COLUMNS: &str = "id, nome, data_nascimento, status, classe_id";
const ATTENDANCE_COLUMNS: &str = "id, classe_id, data, total_biblia, total_present, \
     total_absent, total_visitors, total_general, presencas";

/// Postgres-backed store
pub struct EbdDatabase {
    pool: PgPool,
}

impl EbdDatabase {
    /// Connect (retrying while the database container starts) and initialize schema
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        info!("Connecting to database");

        let options = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs));
        let delay = Duration::from_secs(config.retry_delay_secs);

        let (pool, attempts) = retry_connect(config.connect_attempts, delay, || {
            options.clone().connect(&config.url)
        })
        .await?;

        schema::initialize_schema(&pool).await?;

        info!(attempts = attempts, "Database initialized successfully");

        Ok(Self { pool })
    }
}

/// Run `connect` until it succeeds or `max_attempts` tries have failed
///
/// Zero attempts still tries once. Returns the value with the number of
/// attempts it took, or the last error.
pub(crate) async fn retry_connect<T, E, F, Fut>(
    max_attempts: u32,
    delay: Duration,
    mut connect: F,
) -> std::result::Result<(T, u32), E>
where
    E: std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match connect().await {
            Ok(value) => return Ok((value, attempt)),
            Err(e) if attempt < max_attempts => {
                warn!(
                    attempt = attempt,
                    max_attempts = max_attempts,
                    error = %e,
                    "Database not reachable yet, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// `presencas` as JSON text, so the `json` column keeps the document as sent
fn json_text(value: &Value) -> String {
    value.to_string()
}

#[async_trait]
impl Store for EbdDatabase {
    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn close(&self) {
        info!("Closing database pool");
        self.pool.close().await;
    }

    // ==================== USER OPERATIONS ====================

    async fn create_user(&self, username: &str, password_hash: &str) -> Result<User> {
        debug!(username = %username, "Creating user");
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (username, password_hash) VALUES ($1, $2) RETURNING {}",
            USER_COLUMNS
        ))
        .bind(username)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(classify)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE username = $1",
            USER_COLUMNS
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    // ==================== CLASS OPERATIONS ====================

    async fn list_classes(&self) -> Result<Vec<Class>> {
        let classes = sqlx::query_as::<_, Class>(&format!(
            "SELECT {} FROM classes ORDER BY id",
            CLASS_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(classes)
    }

    async fn create_class(&self, class: NewClass) -> Result<Class> {
        debug!(nome = %class.nome, "Creating class");
        sqlx::query_as::<_, Class>(&format!(
            "INSERT INTO classes (nome, professor) VALUES ($1, $2) RETURNING {}",
            CLASS_COLUMNS
        ))
        .bind(&class.nome)
        .bind(&class.professor)
        .fetch_one(&self.pool)
        .await
        .map_err(classify)
    }

    async fn update_class(&self, id: i32, update: ClassUpdate) -> Result<Option<Class>> {
        sqlx::query_as::<_, Class>(&format!(
            r#"
            UPDATE classes SET
                nome = COALESCE($2, nome),
                professor = COALESCE($3, professor),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            CLASS_COLUMNS
        ))
        .bind(id)
        .bind(&update.nome)
        .bind(&update.professor)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)
    }

    async fn delete_class(&self, id: i32) -> Result<bool> {
        let result = sqlx::query("DELETE FROM classes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(classify)?;

        Ok(result.rows_affected() > 0)
    }

    // ==================== STUDENT OPERATIONS ====================

    async fn list_students(&self) -> Result<Vec<Student>> {
        let students = sqlx::query_as::<_, Student>(&format!(
            "SELECT {} FROM alunos ORDER BY id",
            STUDENT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(students)
    }

    async fn create_student(&self, student: NewStudent) -> Result<Student> {
        debug!(nome = %student.nome, classe_id = student.classe_id, "Creating student");
        sqlx::query_as::<_, Student>(&format!(
            "INSERT INTO alunos (nome, data_nascimento, status, classe_id) \
             VALUES ($1, $2, $3, $4) RETURNING {}",
            STUDENT_COLUMNS
        ))
        .bind(&student.nome)
        .bind(student.data_nascimento)
        .bind(student.status)
        .bind(student.classe_id)
        .fetch_one(&self.pool)
        .await
        .map_err(classify)
    }

    async fn update_student(&self, id: i32, update: StudentUpdate) -> Result<Option<Student>> {
        sqlx::query_as::<_, Student>(&format!(
            r#"
            UPDATE alunos SET
                nome = COALESCE($2, nome),
                data_nascimento = COALESCE($3, data_nascimento),
                classe_id = COALESCE($4, classe_id),
                status = COALESCE($5, status),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            STUDENT_COLUMNS
        ))
        .bind(id)
        .bind(&update.nome)
        .bind(update.data_nascimento)
        .bind(update.classe_id)
        .bind(update.status)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)
    }

    async fn delete_student(&self, id: i32) -> Result<bool> {
        let result = sqlx::query("DELETE FROM alunos WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(classify)?;

        Ok(result.rows_affected() > 0)
    }

    async fn students_born_on(&self, month: u32, day: u32) -> Result<Vec<Student>> {
        let students = sqlx::query_as::<_, Student>(&format!(
            r#"
            SELECT {} FROM alunos
            WHERE EXTRACT(MONTH FROM data_nascimento) = $1
            AND EXTRACT(DAY FROM data_nascimento) = $2
            ORDER BY id
            "#,
            STUDENT_COLUMNS
        ))
        .bind(month as i32)
        .bind(day as i32)
        .fetch_all(&self.pool)
        .await?;

        Ok(students)
    }

    // ==================== ATTENDANCE OPERATIONS ====================

    async fn list_attendance(&self) -> Result<Vec<Attendance>> {
        let records = sqlx::query_as::<_, Attendance>(&format!(
            "SELECT {} FROM frequencias ORDER BY id",
            ATTENDANCE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn create_attendance(&self, attendance: NewAttendance) -> Result<Attendance> {
        debug!(
            classe_id = attendance.classe_id,
            data = %attendance.data,
            "Registering attendance"
        );
        sqlx::query_as::<_, Attendance>(&format!(
            r#"
            INSERT INTO frequencias (
                classe_id, data, total_biblia, total_present, total_absent,
                total_visitors, total_general, presencas
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8::text::json)
            RETURNING {}
            "#,
            ATTENDANCE_COLUMNS
        ))
        .bind(attendance.classe_id)
        .bind(attendance.data)
        .bind(attendance.total_biblia)
        .bind(attendance.total_present)
        .bind(attendance.total_absent)
        .bind(attendance.total_visitors)
        .bind(attendance.total_general)
        .bind(json_text(&attendance.presencas))
        .fetch_one(&self.pool)
        .await
        .map_err(classify)
    }

    async fn update_attendance(
        &self,
        id: i32,
        update: AttendanceUpdate,
    ) -> Result<Option<Attendance>> {
        sqlx::query_as::<_, Attendance>(&format!(
            r#"
            UPDATE frequencias SET
                classe_id = COALESCE($2, classe_id),
                data = COALESCE($3, data),
                total_biblia = COALESCE($4, total_biblia),
                total_present = COALESCE($5, total_present),
                total_absent = COALESCE($6, total_absent),
                total_visitors = COALESCE($7, total_visitors),
                total_general = COALESCE($8, total_general),
                presencas = COALESCE($9::text::json, presencas),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            ATTENDANCE_COLUMNS
        ))
        .bind(id)
        .bind(update.classe_id)
        .bind(update.data)
        .bind(update.total_biblia)
        .bind(update.total_present)
        .bind(update.total_absent)
        .bind(update.total_visitors)
        .bind(update.total_general)
        .bind(update.presencas.as_ref().map(json_text))
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)
    }

    async fn delete_attendance(&self, id: i32) -> Result<bool> {
        let result = sqlx::query("DELETE FROM frequencias WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn attendance_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Attendance>> {
        let records = sqlx::query_as::<_, Attendance>(&format!(
            "SELECT {} FROM frequencias WHERE data BETWEEN $1 AND $2 ORDER BY data, id",
            ATTENDANCE_COLUMNS
        ))
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_non_database_errors_stay_connection_errors() {
        let err = classify(sqlx::Error::RowNotFound);
        assert!(matches!(err, DatabaseError::ConnectionError(_)));
    }

    #[tokio::test]
    async fn test_retry_connect_stops_at_first_success() {
        let calls = AtomicU32::new(0);
        let result = retry_connect(5, Duration::ZERO, || {
            let call = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if call < 3 {
                    Err(format!("refused {}", call))
                } else {
                    Ok("pool")
                }
            }
        })
        .await;

        assert_eq!(result, Ok(("pool", 3)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_connect_returns_last_error() {
        let calls = AtomicU32::new(0);
        let result: std::result::Result<((), u32), String> =
            retry_connect(3, Duration::ZERO, || {
                let call = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move { Err(format!("refused {}", call)) }
            })
            .await;

        assert_eq!(result, Err("refused 3".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_connect_zero_attempts_tries_once() {
        let calls = AtomicU32::new(0);
        let result: std::result::Result<((), u32), String> =
            retry_connect(0, Duration::ZERO, || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err("refused".to_string()) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_json_text_keeps_key_order() {
        let presencas = json!([{ "presente": true, "aluno_id": 5 }]);
        assert_eq!(json_text(&presencas), r#"[{"presente":true,"aluno_id":5}]"#);
    }

    #[test]
    fn test_user_columns_skip_timestamps() {
        let columns: Vec<&str> = USER_COLUMNS.split(", ").collect();
        assert_eq!(columns, vec!["id", "username", "password_hash"]);
    }

    #[test]
    fn test_error_messages() {
        let err = DatabaseError::UniqueViolation("classes_nome_key".to_string());
        assert_eq!(err.to_string(), "Unique constraint violated: classes_nome_key");
    }
}
