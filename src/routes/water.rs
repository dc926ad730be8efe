use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use rocket::http::Status;
use rocket::response::status;
use rocket::serde::json::Json;
use rocket::State;
use serde_json::Value;
use std::sync::Arc;

use crate::models::entry::{NewEntry, WaterEntry};
use crate::security::auth::AuthUser;
use crate::stats;
use crate::store::Store;
use crate::units;

use super::{message, ApiError, ApiResult};

/// How far ahead of the server clock an entry may be stamped.
const FUTURE_TOLERANCE_MINUTES: i64 = 5;

/// Days covered by `GET /api/water` when no range is given.
const DEFAULT_RANGE_DAYS: i64 = 30;

fn parse_timestamp(raw: Option<&str>, now: DateTime<Utc>) -> ApiResult<DateTime<Utc>> {
    let ts = match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => return Ok(now),
        Some(s) => DateTime::parse_from_rfc3339(s)
            .map_err(|_| ApiError::bad_request("Invalid timestamp"))?
            .with_timezone(&Utc),
    };
    if ts > now + Duration::minutes(FUTURE_TOLERANCE_MINUTES) {
        return Err(ApiError::bad_request("Timestamp cannot be in the future"));
    }
    Ok(ts)
}

/// Stored timestamps compare as text, so every bound must keep a
/// four-digit year.
fn parse_date(raw: &str) -> ApiResult<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .ok()
        .filter(|d| (1..=9999).contains(&d.year()))
        .ok_or_else(|| ApiError::bad_request("Dates must use YYYY-MM-DD"))
}

/// Last day whose following midnight is still in year 9999.
fn last_listable_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(9999, 12, 30).unwrap_or(NaiveDate::MAX)
}

#[post("/water", format = "json", data = "<body>")]
pub fn add_entry(
    auth: AuthUser,
    body: Json<NewEntry>,
    store: &State<Arc<dyn Store>>,
) -> ApiResult<status::Custom<Json<WaterEntry>>> {
    if !units::is_valid_amount(body.amount, body.unit) {
        return Err(ApiError::bad_request("Invalid amount"));
    }
    let timestamp = parse_timestamp(body.timestamp.as_deref(), Utc::now())?;

    let entry = store
        .entry_create(auth.user.id, body.amount, body.unit, timestamp)
        .map_err(ApiError::internal)?;
    Ok(status::Custom(Status::Created, Json(entry)))
}

#[get("/water/today")]
pub fn today_entries(auth: AuthUser, store: &State<Arc<dyn Store>>) -> Json<Vec<WaterEntry>> {
    let tz = auth.user.tz();
    let today = stats::local_date(&Utc::now(), tz);
    let (from, to) = stats::local_range(today, today, tz);
    Json(store.entry_list_between(auth.user.id, &from, &to))
}

#[get("/water?<from>&<to>")]
pub fn list_entries(
    auth: AuthUser,
    from: Option<&str>,
    to: Option<&str>,
    store: &State<Arc<dyn Store>>,
) -> ApiResult<Json<Vec<WaterEntry>>> {
    let tz = auth.user.tz();
    let to = match to {
        Some(raw) => parse_date(raw)?,
        None => stats::local_date(&Utc::now(), tz),
    };
    let from = match from {
        Some(raw) => parse_date(raw)?,
        None => to - Duration::days(DEFAULT_RANGE_DAYS - 1),
    };
    if from > to {
        return Err(ApiError::bad_request("'from' must not be after 'to'"));
    }
    let to = to.min(last_listable_day());
    let from = from.min(to);

    let (start, end) = stats::local_range(from, to, tz);
    Ok(Json(store.entry_list_between(auth.user.id, &start, &end)))
}

#[delete("/water/<id>")]
pub fn delete_entry(
    auth: AuthUser,
    id: i64,
    store: &State<Arc<dyn Store>>,
) -> ApiResult<Json<Value>> {
    match store.entry_delete(auth.user.id, id) {
        Ok(true) => Ok(message("Entry deleted successfully")),
        Ok(false) => Err(ApiError::not_found("Entry not found")),
        Err(e) => Err(ApiError::internal(e)),
    }
}

pub fn routes() -> Vec<rocket::Route> {
    routes![add_entry, today_entries, list_entries, delete_entry]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn missing_timestamp_means_now() {
        assert_eq!(parse_timestamp(None, now()), Ok(now()));
        assert_eq!(parse_timestamp(Some("  "), now()), Ok(now()));
    }

    #[test]
    fn timestamp_offsets_are_normalised() {
        let ts = parse_timestamp(Some("2024-05-10T09:30:00+02:00"), now()).unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 5, 10, 7, 30, 0).unwrap());
    }

    #[test]
    fn future_timestamps_are_rejected_beyond_tolerance() {
        assert!(parse_timestamp(Some("2024-05-10T12:04:00Z"), now()).is_ok());
        let err = parse_timestamp(Some("2024-05-10T12:06:00Z"), now()).unwrap_err();
        assert_eq!(err.status, Status::BadRequest);
        assert!(parse_timestamp(Some("yesterday"), now()).is_err());
    }

    #[test]
    fn dates_use_iso_format() {
        assert_eq!(
            parse_date("2024-05-10").unwrap(),
            NaiveDate::from_ymd_opt(2024, 5, 10).unwrap()
        );
        assert!(parse_date("10/05/2024").is_err());
    }

    #[test]
    fn dates_need_a_four_digit_year() {
        assert!(parse_date("10000-01-01").is_err());
        assert!(parse_date("0000-12-31").is_err());
        assert_eq!(
            parse_date("9999-12-31").unwrap(),
            NaiveDate::from_ymd_opt(9999, 12, 31).unwrap()
        );
        assert_eq!(last_listable_day().succ_opt().unwrap().year(), 9999);
    }
}
