use super::error::{ServiceError, ServiceResult, MSG_CLASS_NOT_FOUND, MSG_STUDENT_NOT_FOUND};
use crate::domain::{student_history, HistoryRecord, Student, StudentPayload, ValidationError};
use crate::infrastructure::{DatabaseError, Store};
use chrono::{Datelike, NaiveDate};
use std::sync::Arc;
use tracing::info;

pub const MSG_STUDENT_DELETED: &str = "Aluno deletado";

pub struct StudentService {
    store: Arc<dyn Store>,
}

impl StudentService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> ServiceResult<Vec<Student>> {
        Ok(self.store.list_students().await?)
    }

    pub async fn create(&self, payload: StudentPayload) -> ServiceResult<Student> {
        let student = payload.into_new()?;
        let created = self
            .store
            .create_student(student)
            .await
            .map_err(write_error)?;
        info!(aluno_id = created.id, classe_id = created.classe_id, "Student created");
        Ok(created)
    }

    pub async fn update(&self, id: i32, payload: StudentPayload) -> ServiceResult<Student> {
        let update = payload.into_update()?;
        self.store
            .update_student(id, update)
            .await
            .map_err(write_error)?
            .ok_or_else(|| ServiceError::not_found(MSG_STUDENT_NOT_FOUND))
    }

    pub async fn delete(&self, id: i32) -> ServiceResult<()> {
        if !self.store.delete_student(id).await? {
            return Err(ServiceError::not_found(MSG_STUDENT_NOT_FOUND));
        }
        info!(aluno_id = id, "Student deleted");
        Ok(())
    }

    /// Students whose birthday falls on `today`
    pub async fn birthdays(&self, today: NaiveDate) -> ServiceResult<Vec<Student>> {
        Ok(self
            .store
            .students_born_on(today.month(), today.day())
            .await?)
    }

    /// Attendance records that mention the student
    pub async fn history(&self, id: i32) -> ServiceResult<Vec<HistoryRecord>> {
        let records = self.store.list_attendance().await?;
        Ok(student_history(records, id))
    }
}

fn write_error(err: DatabaseError) -> ServiceError {
    match err {
        DatabaseError::ForeignKeyViolation(_) => ValidationError::new(MSG_CLASS_NOT_FOUND).into(),
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::StudentStatus;
    use crate::testing::MemoryStore;
    use serde_json::json;

    fn payload(value: serde_json::Value) -> StudentPayload {
        serde_json::from_value(value).unwrap()
    }

    fn service_with_class() -> (StudentService, Arc<MemoryStore>, i32) {
        let store = Arc::new(MemoryStore::default());
        let classe_id = store.seed_class("Juniores", "Rute");
        (StudentService::new(store.clone()), store, classe_id)
    }

    #[tokio::test]
    async fn test_create_student() {
        let (service, _, classe_id) = service_with_class();
        let student = service
            .create(payload(json!({
                "nome": "Davi",
                "data_nascimento": "2014-04-21",
                "classe_id": classe_id
            })))
            .await
            .unwrap();

        assert_eq!(student.status, StudentStatus::Enrolled);
        assert_eq!(service.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_with_unknown_class() {
        let (service, _, _) = service_with_class();
        let err = service
            .create(payload(json!({
                "nome": "Davi",
                "data_nascimento": "2014-04-21",
                "classe_id": 404
            })))
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::Validation(v) if v.message == MSG_CLASS_NOT_FOUND));
    }

    #[tokio::test]
    async fn test_update_status_only() {
        let (service, store, classe_id) = service_with_class();
        let id = store.seed_student("Davi", "2014-04-21", classe_id);

        let updated = service
            .update(id, payload(json!({"status": "DESMATRICULADO"})))
            .await
            .unwrap();
        assert_eq!(updated.status, StudentStatus::Unenrolled);
        assert_eq!(updated.nome, "Davi");
    }

    #[tokio::test]
    async fn test_delete_unknown_student() {
        let (service, _, _) = service_with_class();
        assert!(matches!(
            service.delete(5).await,
            Err(ServiceError::NotFound(msg)) if msg == MSG_STUDENT_NOT_FOUND
        ));
    }

    #[tokio::test]
    async fn test_birthdays_match_month_and_day() {
        let (service, store, classe_id) = service_with_class();
        store.seed_student("Hoje", "2001-10-14", classe_id);
        store.seed_student("Amanha", "2001-10-15", classe_id);
        store.seed_student("Outro ano", "1975-10-14", classe_id);

        let today = NaiveDate::from_ymd_opt(2026, 10, 14).unwrap();
        let names: Vec<String> = service
            .birthdays(today)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.nome)
            .collect();
        assert_eq!(names, vec!["Hoje", "Outro ano"]);
    }

    #[tokio::test]
    async fn test_history_reads_attendance() {
        let (service, store, classe_id) = service_with_class();
        let id = store.seed_student("Davi", "2014-04-21", classe_id);
        store.seed_attendance(classe_id, "2024-03-03", json!([{"aluno_id": id, "presente": true}]));
        store.seed_attendance(classe_id, "2024-03-10", json!([]));

        let history = service.history(id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].presenca["presente"], true);
    }
}
