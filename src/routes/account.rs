use chrono::{DateTime, Utc};
use rocket::serde::json::Json;
use rocket::State;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::models::settings::UserSettings;
use crate::models::user::{is_valid_daily_goal, User};
use crate::security::auth::AuthUser;
use crate::stats;
use crate::store::Store;

use super::{message, ApiError, ApiResult};

pub const MAX_NAME_LEN: usize = 100;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub avatar: String,
    pub join_date: DateTime<Utc>,
    pub daily_goal: f64,
    pub total_entries: i64,
    /// Millilitres, all time.
    pub total_intake: f64,
    pub longest_streak: u32,
    pub current_streak: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub daily_goal: Option<f64>,
}

fn build_profile(store: &dyn Store, user: &User) -> Profile {
    let tz = user.tz();
    let entries = store.entry_list_all(user.id);
    let totals = stats::daily_totals(&entries, tz);
    let today = stats::local_date(&Utc::now(), tz);
    let total: f64 = totals.values().sum();

    Profile {
        id: user.id,
        email: user.email.clone(),
        name: user.name.clone(),
        avatar: user.avatar.clone(),
        join_date: user.created_at,
        daily_goal: user.daily_goal_ml,
        total_entries: entries.len() as i64,
        total_intake: (total * 10.0).round() / 10.0,
        longest_streak: stats::longest_streak(&totals, user.daily_goal_ml),
        current_streak: stats::current_streak(&totals, user.daily_goal_ml, today),
    }
}

#[get("/profile")]
pub fn get_profile(auth: AuthUser, store: &State<Arc<dyn Store>>) -> Json<Profile> {
    Json(build_profile(store.inner().as_ref(), &auth.user))
}

#[put("/profile", format = "json", data = "<body>")]
pub fn update_profile(
    auth: AuthUser,
    body: Json<ProfileUpdate>,
    store: &State<Arc<dyn Store>>,
) -> ApiResult<Json<Profile>> {
    let user = auth.user;
    let name = match &body.name {
        Some(n) => n.trim().to_string(),
        None => user.name.clone(),
    };
    if name.chars().count() > MAX_NAME_LEN {
        return Err(ApiError::bad_request(format!(
            "Name must be at most {} characters",
            MAX_NAME_LEN
        )));
    }
    let goal = body.daily_goal.unwrap_or(user.daily_goal_ml);
    if !is_valid_daily_goal(goal) {
        return Err(ApiError::bad_request(
            "Daily goal must be between 500 and 5000 ml",
        ));
    }

    store
        .user_update_profile(user.id, &name, goal)
        .map_err(ApiError::internal)?;

    // Keep the settings document's target in step with the profile
    if let Some(mut settings) = store.settings_get(user.id) {
        settings.set_daily_target_ml(goal);
        store
            .settings_put(user.id, &settings)
            .map_err(ApiError::internal)?;
    }

    let updated = store
        .user_get_by_id(user.id)
        .ok_or_else(|| ApiError::internal(format!("user {} vanished", user.id)))?;
    Ok(Json(build_profile(store.inner().as_ref(), &updated)))
}

/// Stored settings with the goal and timezone taken from the user record.
fn current_settings(store: &dyn Store, user: &User) -> UserSettings {
    let mut settings = store.settings_get_or_default(user.id);
    settings.set_daily_target_ml(user.daily_goal_ml);
    settings.timezone = user.timezone.clone();
    settings
}

#[get("/settings")]
pub fn get_settings(auth: AuthUser, store: &State<Arc<dyn Store>>) -> Json<UserSettings> {
    Json(current_settings(store.inner().as_ref(), &auth.user))
}

#[put("/settings", format = "json", data = "<body>")]
pub fn update_settings(
    auth: AuthUser,
    body: Json<UserSettings>,
    store: &State<Arc<dyn Store>>,
) -> ApiResult<Json<UserSettings>> {
    let mut settings = body.into_inner();
    settings.validate().map_err(ApiError::bad_request)?;

    let user = auth.user;
    let goal_ml = settings.daily_target_ml().round();
    settings.set_daily_target_ml(goal_ml);

    store
        .settings_apply(user.id, goal_ml, &settings)
        .map_err(ApiError::internal)?;

    Ok(Json(settings))
}

#[delete("/account")]
pub fn delete_account(auth: AuthUser, store: &State<Arc<dyn Store>>) -> ApiResult<Json<Value>> {
    store
        .user_delete(auth.user.id)
        .map_err(ApiError::internal)?;
    log::info!("User {} deleted their account", auth.user.id);
    Ok(message("Account deleted successfully"))
}

pub fn routes() -> Vec<rocket::Route> {
    routes![
        get_profile,
        update_profile,
        get_settings,
        update_settings,
        delete_account
    ]
}
