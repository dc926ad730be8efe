use chrono::{DateTime, Utc};
use rusqlite::params;
use serde::{Deserialize, Serialize};

use crate::db::{format_db_time, parse_db_time, DbPool};
use crate::units::{self, Unit};

/// One logged drink. `amount` is kept in the unit the user entered it in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaterEntry {
    #[serde(rename = "_id")]
    pub id: i64,
    pub user_id: i64,
    pub amount: f64,
    pub unit: Unit,
    pub timestamp: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl WaterEntry {
    pub fn amount_ml(&self) -> f64 {
        units::to_ml(self.amount, self.unit)
    }

    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        let unit: String = row.get(3)?;
        let ts: String = row.get(4)?;
        let created: String = row.get(5)?;
        Ok(WaterEntry {
            id: row.get(0)?,
            user_id: row.get(1)?,
            amount: row.get(2)?,
            unit: Unit::parse(&unit).unwrap_or_default(),
            timestamp: parse_db_time(&ts).unwrap_or_default(),
            created_at: parse_db_time(&created).unwrap_or_default(),
        })
    }

    const SELECT_COLS: &'static str = "id, user_id, amount, unit, timestamp, created_at";

    pub fn create(
        pool: &DbPool,
        user_id: i64,
        amount: f64,
        unit: Unit,
        timestamp: DateTime<Utc>,
    ) -> Result<WaterEntry, String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        let now = Utc::now();
        conn.execute(
            "INSERT INTO water_entries (user_id, amount, unit, timestamp, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                user_id,
                amount,
                unit.as_str(),
                format_db_time(&timestamp),
                format_db_time(&now)
            ],
        )
        .map_err(|e| e.to_string())?;
        let id = conn.last_insert_rowid();
        conn.query_row(
            &format!("SELECT {} FROM water_entries WHERE id = ?1", Self::SELECT_COLS),
            params![id],
            Self::from_row,
        )
        .map_err(|e| e.to_string())
    }

    pub fn get(pool: &DbPool, user_id: i64, id: i64) -> Option<WaterEntry> {
        let conn = pool.get().ok()?;
        conn.query_row(
            &format!(
                "SELECT {} FROM water_entries WHERE id = ?1 AND user_id = ?2",
                Self::SELECT_COLS
            ),
            params![id, user_id],
            Self::from_row,
        )
        .ok()
    }

    /// Entries with `from <= timestamp < to`, newest first.
    pub fn list_between(
        pool: &DbPool,
        user_id: i64,
        from: &DateTime<Utc>,
        to: &DateTime<Utc>,
    ) -> Vec<WaterEntry> {
        let conn = match pool.get() {
            Ok(c) => c,
            Err(_) => return vec![],
        };
        let mut stmt = match conn.prepare(&format!(
            "SELECT {} FROM water_entries
             WHERE user_id = ?1 AND timestamp >= ?2 AND timestamp < ?3
             ORDER BY timestamp DESC, id DESC",
            Self::SELECT_COLS
        )) {
            Ok(s) => s,
            Err(_) => return vec![],
        };
        stmt.query_map(
            params![user_id, format_db_time(from), format_db_time(to)],
            Self::from_row,
        )
        .map(|rows| rows.filter_map(|r| r.ok()).collect())
        .unwrap_or_default()
    }

    /// Every entry of a user, oldest first.
    pub fn list_all(pool: &DbPool, user_id: i64) -> Vec<WaterEntry> {
        let conn = match pool.get() {
            Ok(c) => c,
            Err(_) => return vec![],
        };
        let mut stmt = match conn.prepare(&format!(
            "SELECT {} FROM water_entries WHERE user_id = ?1 ORDER BY timestamp ASC, id ASC",
            Self::SELECT_COLS
        )) {
            Ok(s) => s,
            Err(_) => return vec![],
        };
        stmt.query_map(params![user_id], Self::from_row)
            .map(|rows| rows.filter_map(|r| r.ok()).collect())
            .unwrap_or_default()
    }

    pub fn count(pool: &DbPool, user_id: i64) -> i64 {
        let conn = match pool.get() {
            Ok(c) => c,
            Err(_) => return 0,
        };
        conn.query_row(
            "SELECT COUNT(*) FROM water_entries WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )
        .unwrap_or(0)
    }

    /// Delete an entry owned by `user_id`. Returns false if nothing matched.
    pub fn delete(pool: &DbPool, user_id: i64, id: i64) -> Result<bool, String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        let n = conn
            .execute(
                "DELETE FROM water_entries WHERE id = ?1 AND user_id = ?2",
                params![id, user_id],
            )
            .map_err(|e| e.to_string())?;
        Ok(n > 0)
    }
}

/// Request body for logging a drink.
#[derive(Debug, Clone, Deserialize)]
pub struct NewEntry {
    pub amount: f64,
    pub unit: Unit,
    /// RFC 3339; defaults to now.
    pub timestamp: Option<String>,
}
