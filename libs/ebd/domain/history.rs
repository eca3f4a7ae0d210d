//! Per-student attendance history and report date windows

use super::models::{Attendance, HistoryRecord};
use chrono::NaiveDate;
use serde_json::Value;

/// First entry of `presencas` that belongs to `student_id`
///
/// Only list-shaped `presencas` are searched; entries that are not objects
/// or carry a non-numeric `aluno_id` never match. `5` and `5.0` are the
/// same id.
pub fn find_entry(presencas: &Value, student_id: i32) -> Option<&Value> {
    presencas.as_array()?.iter().find(|entry| {
        entry
            .get("aluno_id")
            .and_then(Value::as_f64)
            .is_some_and(|id| id == f64::from(student_id))
    })
}

/// Build the attendance history of one student, preserving record order
pub fn student_history(records: Vec<Attendance>, student_id: i32) -> Vec<HistoryRecord> {
    records
        .into_iter()
        .filter_map(|attendance| {
            let presenca = attendance
                .presencas
                .as_ref()
                .and_then(|p| find_entry(p, student_id))
                .cloned()?;
            Some(HistoryRecord {
                attendance,
                presenca,
            })
        })
        .collect()
}

/// First and last day of a calendar month, `None` for an invalid month
pub fn month_bounds(month: u32, year: i32) -> Option<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next_first = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some((first, next_first.pred_opt()?))
}
