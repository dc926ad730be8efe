use chrono::{DateTime, Utc};

use crate::models::entry::WaterEntry;
use crate::models::settings::UserSettings;
use crate::models::user::User;
use crate::units::Unit;

pub mod mongo;
pub mod sqlite;

/// Unified data-access trait. Every database operation goes through here.
/// Implementations: `SqliteStore` (wraps rusqlite/r2d2) and `MongoStore` (wraps mongodb).
pub trait Store: Send + Sync {
    // ── Lifecycle ───────────────────────────────────────────────────
    fn run_migrations(&self) -> Result<(), String>;

    /// Return the database backend name: "sqlite" or "mongodb"
    fn db_backend(&self) -> &str;

    // ── Users ───────────────────────────────────────────────────────
    fn user_get_by_id(&self, id: i64) -> Option<User>;
    fn user_get_by_email(&self, email: &str) -> Option<User>;
    fn user_count(&self) -> i64;
    fn user_create(&self, email: &str, password_hash: &str) -> Result<i64, String>;
    fn user_update_profile(&self, id: i64, name: &str, daily_goal_ml: f64) -> Result<(), String>;
    /// Removes the user together with their entries and settings.
    fn user_delete(&self, id: i64) -> Result<(), String>;

    // ── Water entries ───────────────────────────────────────────────
    fn entry_create(
        &self,
        user_id: i64,
        amount: f64,
        unit: Unit,
        timestamp: DateTime<Utc>,
    ) -> Result<WaterEntry, String>;
    /// Only returns the entry if it belongs to `user_id`.
    fn entry_get(&self, user_id: i64, id: i64) -> Option<WaterEntry>;
    /// Entries with `from <= timestamp < to`, newest first.
    fn entry_list_between(
        &self,
        user_id: i64,
        from: &DateTime<Utc>,
        to: &DateTime<Utc>,
    ) -> Vec<WaterEntry>;
    /// Full history, oldest first.
    fn entry_list_all(&self, user_id: i64) -> Vec<WaterEntry>;
    fn entry_count(&self, user_id: i64) -> i64;
    /// Returns false when no entry with that id belongs to `user_id`.
    fn entry_delete(&self, user_id: i64, id: i64) -> Result<bool, String>;

    // ── Settings ────────────────────────────────────────────────────
    fn settings_get(&self, user_id: i64) -> Option<UserSettings>;
    fn settings_put(&self, user_id: i64, settings: &UserSettings) -> Result<(), String>;
    /// Store the settings document and copy its goal and timezone onto the
    /// user row. On failure the user row is left as it was.
    fn settings_apply(
        &self,
        user_id: i64,
        daily_goal_ml: f64,
        settings: &UserSettings,
    ) -> Result<(), String>;
    fn settings_get_or_default(&self, user_id: i64) -> UserSettings {
        self.settings_get(user_id).unwrap_or_default()
    }
}
