use super::error::{ServiceError, ServiceResult, MSG_ATTENDANCE_NOT_FOUND, MSG_CLASS_NOT_FOUND};
use crate::domain::{Attendance, AttendancePayload, ValidationError};
use crate::infrastructure::{DatabaseError, Store};
use std::sync::Arc;
use tracing::info;

pub const MSG_ATTENDANCE_DELETED: &str = "Frequência deletada";

pub struct AttendanceService {
    store: Arc<dyn Store>,
}

impl AttendanceService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> ServiceResult<Vec<Attendance>> {
        Ok(self.store.list_attendance().await?)
    }

    pub async fn create(&self, payload: AttendancePayload) -> ServiceResult<Attendance> {
        let attendance = payload.into_new()?;
        let created = self
            .store
            .create_attendance(attendance)
            .await
            .map_err(write_error)?;
        info!(
            frequencia_id = created.id,
            classe_id = created.classe_id,
            data = %created.data,
            "Attendance registered"
        );
        Ok(created)
    }

    pub async fn update(&self, id: i32, payload: AttendancePayload) -> ServiceResult<Attendance> {
        let update = payload.into_update()?;
        self.store
            .update_attendance(id, update)
            .await
            .map_err(write_error)?
            .ok_or_else(|| ServiceError::not_found(MSG_ATTENDANCE_NOT_FOUND))
    }

    pub async fn delete(&self, id: i32) -> ServiceResult<()> {
        if !self.store.delete_attendance(id).await? {
            return Err(ServiceError::not_found(MSG_ATTENDANCE_NOT_FOUND));
        }
        info!(frequencia_id = id, "Attendance deleted");
        Ok(())
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
    use crate::testing::MemoryStore;
    use serde_json::json;

    fn payload(value: serde_json::Value) -> AttendancePayload {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn test_create_with_totals() {
        let store = Arc::new(MemoryStore::default());
        let classe_id = store.seed_class("Adolescentes", "Tiago");
        let service = AttendanceService::new(store);

        let created = service
            .create(payload(json!({
                "classe_id": classe_id,
                "data": "2024-09-01",
                "total_present": 12,
                "total_visitors": 3,
                "presencas": [{"aluno_id": 1, "presente": true}]
            })))
            .await
            .unwrap();

        assert_eq!(created.total_present, 12);
        assert_eq!(created.total_absent, 0);
        assert_eq!(created.presencas, Some(json!([{"aluno_id": 1, "presente": true}])));
    }

    #[tokio::test]
    async fn test_update_replaces_presencas() {
        let store = Arc::new(MemoryStore::default());
        let classe_id = store.seed_class("Adolescentes", "Tiago");
        let id = store.seed_attendance(classe_id, "2024-09-01", json!([]));
        let service = AttendanceService::new(store);

        let updated = service
            .update(id, payload(json!({"presencas": [{"aluno_id": 2}], "total_general": 9})))
            .await
            .unwrap();
        assert_eq!(updated.presencas, Some(json!([{"aluno_id": 2}])));
        assert_eq!(updated.total_general, 9);
        assert_eq!(updated.data.to_string(), "2024-09-01");
    }

    #[tokio::test]
    async fn test_unknown_class_and_record() {
        let store = Arc::new(MemoryStore::default());
        let service = AttendanceService::new(store);

        let err = service
            .create(payload(json!({"classe_id": 8, "data": "2024-09-01"})))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        assert!(matches!(
            service.delete(1).await,
            Err(ServiceError::NotFound(_))
        ));
    }
}
