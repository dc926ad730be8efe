use chrono::{DateTime, Utc};
use rocket::serde::json::Json;
use rocket::State;
use serde::Serialize;
use std::sync::Arc;

use crate::models::settings::parse_hhmm;
use crate::reminders;
use crate::security::auth::AuthUser;
use crate::store::Store;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NextReminder {
    pub enabled: bool,
    pub interval: u32,
    /// Whether the current local time is inside the reminder window.
    pub in_window: bool,
    pub next_at: Option<DateTime<Utc>>,
}

#[get("/reminders/next")]
pub fn next(auth: AuthUser, store: &State<Arc<dyn Store>>) -> Json<NextReminder> {
    let settings = store.settings_get_or_default(auth.user.id);
    let notifications = &settings.notifications;
    let tz = auth.user.tz();
    let now = Utc::now();

    let in_window = match (
        parse_hhmm(&notifications.start_time),
        parse_hhmm(&notifications.end_time),
    ) {
        (Some(start), Some(end)) => {
            reminders::within_window(now.with_timezone(&tz).time(), start, end)
        }
        _ => false,
    };

    Json(NextReminder {
        enabled: notifications.enabled,
        interval: notifications.interval,
        in_window,
        next_at: reminders::next_reminder(now, notifications, tz),
    })
}

pub fn routes() -> Vec<rocket::Route> {
    routes![next]
}
