use chrono::Utc;
use rocket::serde::json::Json;
use rocket::State;
use std::sync::Arc;

use crate::security::auth::AuthUser;
use crate::stats::{self, Period, StatisticsData, TodaySummary};
use crate::store::Store;

use super::{ApiError, ApiResult};

#[get("/stats/today")]
pub fn today(auth: AuthUser, store: &State<Arc<dyn Store>>) -> Json<TodaySummary> {
    let tz = auth.user.tz();
    let today = stats::local_date(&Utc::now(), tz);
    let (from, to) = stats::local_range(today, today, tz);
    let entries = store.entry_list_between(auth.user.id, &from, &to);
    Json(stats::today_summary(&entries, auth.user.daily_goal_ml, today))
}

#[get("/stats/detailed?<period>")]
pub fn detailed(
    auth: AuthUser,
    period: Option<&str>,
    store: &State<Arc<dyn Store>>,
) -> ApiResult<Json<StatisticsData>> {
    let period = Period::parse(period.unwrap_or("week"))
        .ok_or_else(|| ApiError::bad_request("Invalid period"))?;

    let tz = auth.user.tz();
    let today = stats::local_date(&Utc::now(), tz);
    // Streaks need the whole history, not just the window
    let entries = store.entry_list_all(auth.user.id);
    Ok(Json(stats::detailed(
        &entries,
        auth.user.daily_goal_ml,
        period,
        today,
        tz,
    )))
}

pub fn routes() -> Vec<rocket::Route> {
    routes![today, detailed]
}
