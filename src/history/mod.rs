//! History store
//!
//! Keyed append-only log of saved analyses. Supports append and full-list
//! read per user; display order is by record date descending, sorted here
//! after the read rather than in SQL.

use rusqlite::params;

use crate::db::Database;
use crate::error::{ReportError, ReportResult};
use crate::models::AnalysisRecord;

/// Append a completed analysis to the user's history. Records are immutable
/// once written.
pub fn append(db: &Database, user_email: &str, record: &AnalysisRecord) -> ReportResult<i64> {
    let record_json = serde_json::to_string(record)
        .map_err(|e| ReportError::SchemaMismatch(format!("record serialization: {e}")))?;
    let recorded_at = record.date.format("%Y-%m-%dT%H:%M:%SZ").to_string();

    let conn = db.get_conn().map_err(ReportError::Db)?;
    conn.execute(
        "INSERT INTO analysis_records (user_email, recorded_at, record_json)
         VALUES (?1, ?2, ?3)",
        params![user_email, recorded_at, record_json],
    )
    .map_err(|e| ReportError::Db(e.into()))?;

    Ok(conn.last_insert_rowid())
}

/// Read the full history for a user, newest first.
pub fn list_for_user(db: &Database, user_email: &str) -> ReportResult<Vec<AnalysisRecord>> {
    let conn = db.get_conn().map_err(ReportError::Db)?;
    let mut stmt = conn
        .prepare("SELECT record_json FROM analysis_records WHERE user_email = ?1")
        .map_err(|e| ReportError::Db(e.into()))?;

    let rows = stmt
        .query_map(params![user_email], |row| row.get::<_, String>(0))
        .map_err(|e| ReportError::Db(e.into()))?;

    let mut records = Vec::new();
    for row in rows {
        let json = row.map_err(|e| ReportError::Db(e.into()))?;
        let record: AnalysisRecord = serde_json::from_str(&json)
            .map_err(|e| ReportError::SchemaMismatch(format!("stored record: {e}")))?;
        records.push(record);
    }

    // Display order is computed here, not in SQL
    records.sort_by(|a, b| b.date.cmp(&a.date));
    Ok(records)
}

/// Count saved records across all users, for the status tool.
pub fn count_records(db: &Database) -> ReportResult<i64> {
    let conn = db.get_conn().map_err(ReportError::Db)?;
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM analysis_records", [], |row| row.get(0))
        .map_err(|e| ReportError::Db(e.into()))?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations;
    use crate::models::{
        AnalysisResponse, BmiAnalysis, BodyProfile, Gender, HealthAnalysis, OverallScore,
    };
    use chrono::{TimeZone, Utc};

    fn test_db(name: &str) -> Database {
        let db = Database::new(format!("file:{name}?mode=memory&cache=shared")).unwrap();
        db.with_conn(|conn| migrations::run_migrations(conn))
            .unwrap();
        db
    }

    fn record_with(score: f64, day: u32) -> AnalysisRecord {
        AnalysisRecord {
            date: Utc.with_ymd_and_hms(2025, 6, day, 8, 0, 0).unwrap(),
            inputs: BodyProfile {
                age: 34,
                height_cm: 170.0,
                weight_kg: 70.0,
                gender: Gender::Male,
                occupation: "office worker".to_string(),
            },
            analysis: AnalysisResponse {
                overall_health_score: OverallScore {
                    score,
                    label: "Good".to_string(),
                    explanation: String::new(),
                },
                bmi_analysis: BmiAnalysis {
                    summary: String::new(),
                },
                health_analysis: HealthAnalysis { categories: vec![] },
                metrics: vec![],
                recommended_foods: vec![],
            },
        }
    }

    #[test]
    fn test_append_and_list_sorted_date_descending() {
        let db = test_db("history_sorted");
        // inserted out of date order on purpose
        append(&db, "a@example.com", &record_with(60.0, 2)).unwrap();
        append(&db, "a@example.com", &record_with(75.0, 5)).unwrap();
        append(&db, "a@example.com", &record_with(50.0, 3)).unwrap();

        let records = list_for_user(&db, "a@example.com").unwrap();
        assert_eq!(records.len(), 3);
        let scores: Vec<f64> = records
            .iter()
            .map(|r| r.analysis.overall_health_score.score)
            .collect();
        // newest first: day 5, day 3, day 2
        assert_eq!(scores, vec![75.0, 50.0, 60.0]);
    }

    #[test]
    fn test_history_is_keyed_by_user() {
        let db = test_db("history_keyed");
        append(&db, "a@example.com", &record_with(60.0, 1)).unwrap();
        append(&db, "b@example.com", &record_with(70.0, 2)).unwrap();

        assert_eq!(list_for_user(&db, "a@example.com").unwrap().len(), 1);
        assert_eq!(list_for_user(&db, "b@example.com").unwrap().len(), 1);
        assert!(list_for_user(&db, "c@example.com").unwrap().is_empty());
    }
}
