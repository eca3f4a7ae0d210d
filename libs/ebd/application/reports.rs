//! Weekly and monthly attendance reports

use super::error::ServiceResult;
use crate::domain::payloads::MSG_INVALID_DATE;
use crate::domain::{month_bounds, parse_date, Attendance, ValidationError};
use crate::infrastructure::Store;
use chrono::NaiveDate;
use serde::Deserialize;
use std::sync::Arc;

pub const MSG_MONTH_PARAMS_REQUIRED: &str = "Parâmetros \"mes\" e \"ano\" são obrigatórios";
pub const MSG_MONTH_PARAMS_INVALID: &str = "Parâmetros \"mes\" e \"ano\" inválidos";

/// Query string of `/relatorios/semanal`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WeeklyQuery {
    pub data_inicio: Option<String>,
    pub data_fim: Option<String>,
}

/// Query string of `/relatorios/mensal`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MonthlyQuery {
    pub mes: Option<String>,
    pub ano: Option<String>,
}

fn bound(name: &str, raw: Option<&str>) -> Result<NaiveDate, ValidationError> {
    let raw = raw.ok_or_else(|| {
        ValidationError::with_detail(MSG_INVALID_DATE, format!("parâmetro \"{}\" ausente", name))
    })?;
    parse_date(raw).map_err(|e| ValidationError::with_detail(MSG_INVALID_DATE, e.to_string()))
}

impl WeeklyQuery {
    pub fn range(&self) -> Result<(NaiveDate, NaiveDate), ValidationError> {
        Ok((
            bound("data_inicio", self.data_inicio.as_deref())?,
            bound("data_fim", self.data_fim.as_deref())?,
        ))
    }
}

impl MonthlyQuery {
    pub fn range(&self) -> Result<(NaiveDate, NaiveDate), ValidationError> {
        let (Some(mes), Some(ano)) = (self.mes.as_deref(), self.ano.as_deref()) else {
            return Err(ValidationError::new(MSG_MONTH_PARAMS_REQUIRED));
        };
        if mes.is_empty() || ano.is_empty() {
            return Err(ValidationError::new(MSG_MONTH_PARAMS_REQUIRED));
        }

        let month: u32 = mes
            .trim()
            .parse()
            .map_err(|_| ValidationError::with_detail(MSG_MONTH_PARAMS_INVALID, format!("mes = {}", mes)))?;
        let year: i32 = ano
            .trim()
            .parse()
            .map_err(|_| ValidationError::with_detail(MSG_MONTH_PARAMS_INVALID, format!("ano = {}", ano)))?;

        month_bounds(month, year).ok_or_else(|| {
            ValidationError::with_detail(
                MSG_MONTH_PARAMS_INVALID,
                format!("mes = {}, ano = {}", month, year),
            )
        })
    }
}

pub struct ReportService {
    store: Arc<dyn Store>,
}

impl ReportService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Attendance in an inclusive date range
    pub async fn weekly(&self, query: &WeeklyQuery) -> ServiceResult<Vec<Attendance>> {
        let (start, end) = query.range()?;
        Ok(self.store.attendance_between(start, end).await?)
    }

    /// Attendance in one calendar month
    pub async fn monthly(&self, query: &MonthlyQuery) -> ServiceResult<Vec<Attendance>> {
        let (start, end) = query.range()?;
        Ok(self.store.attendance_between(start, end).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryStore;
    use serde_json::json;

    fn weekly(start: Option<&str>, end: Option<&str>) -> WeeklyQuery {
        WeeklyQuery {
            data_inicio: start.map(str::to_string),
            data_fim: end.map(str::to_string),
        }
    }

    fn monthly(mes: Option<&str>, ano: Option<&str>) -> MonthlyQuery {
        MonthlyQuery {
            mes: mes.map(str::to_string),
            ano: ano.map(str::to_string),
        }
    }

    #[test]
    fn test_weekly_range_validation() {
        assert!(weekly(Some("2024-01-01"), Some("2024-01-07")).range().is_ok());

        let missing = weekly(Some("2024-01-01"), None).range().unwrap_err();
        assert_eq!(missing.message, MSG_INVALID_DATE);
        assert!(missing.detail.unwrap().contains("data_fim"));

        assert!(weekly(Some("01-01-2024"), Some("2024-01-07")).range().is_err());
    }

    #[test]
    fn test_monthly_range_validation() {
        let (start, end) = monthly(Some("2"), Some("2023")).range().unwrap();
        assert_eq!(start.to_string(), "2023-02-01");
        assert_eq!(end.to_string(), "2023-02-28");

        assert_eq!(
            monthly(None, Some("2023")).range().unwrap_err().message,
            MSG_MONTH_PARAMS_REQUIRED
        );
        assert_eq!(
            monthly(Some("fev"), Some("2023")).range().unwrap_err().message,
            MSG_MONTH_PARAMS_INVALID
        );
        assert_eq!(
            monthly(Some("13"), Some("2023")).range().unwrap_err().message,
            MSG_MONTH_PARAMS_INVALID
        );
    }

    #[tokio::test]
    async fn test_weekly_is_inclusive() {
        let store = Arc::new(MemoryStore::default());
        let classe_id = store.seed_class("Adultos", "Ester");
        for date in ["2024-04-06", "2024-04-07", "2024-04-10", "2024-04-14", "2024-04-15"] {
            store.seed_attendance(classe_id, date, json!([]));
        }
        let service = ReportService::new(store);

        let records = service
            .weekly(&weekly(Some("2024-04-07"), Some("2024-04-14")))
            .await
            .unwrap();
        let dates: Vec<String> = records.iter().map(|r| r.data.to_string()).collect();
        assert_eq!(dates, vec!["2024-04-07", "2024-04-10", "2024-04-14"]);
    }

    #[tokio::test]
    async fn test_monthly_filters_month_and_year() {
        let store = Arc::new(MemoryStore::default());
        let classe_id = store.seed_class("Adultos", "Ester");
        for date in ["2024-03-31", "2024-04-01", "2024-04-30", "2023-04-15"] {
            store.seed_attendance(classe_id, date, json!([]));
        }
        let service = ReportService::new(store);

        let records = service
            .monthly(&monthly(Some("4"), Some("2024")))
            .await
            .unwrap();
        assert_eq!(records.len(), 2);
    }
}
