use super::error::{ServiceError, ServiceResult, MSG_CLASS_NOT_FOUND};
use crate::domain::{Class, ClassPayload};
use crate::infrastructure::{DatabaseError, Store};
use std::sync::Arc;
use tracing::info;

pub const MSG_CLASS_EXISTS: &str = "Classe já existe";
pub const MSG_CLASS_IN_USE: &str = "Classe possui alunos ou frequências vinculados";
pub const MSG_CLASS_DELETED: &str = "Classe deletada";

pub struct ClassService {
    store: Arc<dyn Store>,
}

impl ClassService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> ServiceResult<Vec<Class>> {
        Ok(self.store.list_classes().await?)
    }

    pub async fn create(&self, payload: ClassPayload) -> ServiceResult<Class> {
        let class = payload.into_new()?;
        let created = self.store.create_class(class).await.map_err(write_error)?;
        info!(classe_id = created.id, nome = %created.nome, "Class created");
        Ok(created)
    }

    pub async fn update(&self, id: i32, payload: ClassPayload) -> ServiceResult<Class> {
        self.store
            .update_class(id, payload.into_update())
            .await
            .map_err(write_error)?
            .ok_or_else(|| ServiceError::not_found(MSG_CLASS_NOT_FOUND))
    }

    pub async fn delete(&self, id: i32) -> ServiceResult<()> {
        let deleted = self.store.delete_class(id).await.map_err(write_error)?;
        if !deleted {
            return Err(ServiceError::not_found(MSG_CLASS_NOT_FOUND));
        }
        info!(classe_id = id, "Class deleted");
        Ok(())
    }
}

fn write_error(err: DatabaseError) -> ServiceError {
    match err {
        DatabaseError::UniqueViolation(_) => ServiceError::Conflict(MSG_CLASS_EXISTS.to_string()),
        // Students or attendance records still point at the class
        DatabaseError::ForeignKeyViolation(_) => {
            ServiceError::Conflict(MSG_CLASS_IN_USE.to_string())
        }
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryStore;
    use serde_json::json;

    fn payload(value: serde_json::Value) -> ClassPayload {
        serde_json::from_value(value).unwrap()
    }

    fn service() -> (ClassService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::default());
        (ClassService::new(store.clone()), store)
    }

    #[tokio::test]
    async fn test_create_and_list() {
        let (service, _) = service();
        let created = service
            .create(payload(json!({"nome": "Jovens", "professor": "Paulo"})))
            .await
            .unwrap();
        assert_eq!(created.id, 1);

        let classes = service.list().await.unwrap();
        assert_eq!(classes, vec![created]);
    }

    #[tokio::test]
    async fn test_duplicate_name_conflicts() {
        let (service, _) = service();
        let body = json!({"nome": "Jovens", "professor": "Paulo"});
        service.create(payload(body.clone())).await.unwrap();

        let err = service.create(payload(body)).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(msg) if msg == MSG_CLASS_EXISTS));
    }

    #[tokio::test]
    async fn test_partial_update() {
        let (service, _) = service();
        let created = service
            .create(payload(json!({"nome": "Jovens", "professor": "Paulo"})))
            .await
            .unwrap();

        let updated = service
            .update(created.id, payload(json!({"professor": "Marta"})))
            .await
            .unwrap();
        assert_eq!(updated.nome, "Jovens");
        assert_eq!(updated.professor, "Marta");
    }

    #[tokio::test]
    async fn test_unknown_class() {
        let (service, _) = service();
        assert!(matches!(
            service.update(99, ClassPayload::default()).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            service.delete(99).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_referenced_class_conflicts() {
        let (service, store) = service();
        let class = service
            .create(payload(json!({"nome": "Adultos", "professor": "João"})))
            .await
            .unwrap();
        store.seed_student("Ana", "1990-01-01", class.id);

        let err = service.delete(class.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(msg) if msg == MSG_CLASS_IN_USE));
    }
}
