use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::models::user::{is_valid_daily_goal, DEFAULT_DAILY_GOAL_ML};
use crate::units::{self, Unit};

pub const MIN_REMINDER_MINUTES: u32 = 5;
pub const MAX_REMINDER_MINUTES: u32 = 480;

const THEMES: &[&str] = &["light", "dark", "system"];
const COLOR_SCHEMES: &[&str] = &["blue", "green", "purple", "orange"];
const TEMPERATURES: &[&str] = &["celsius", "fahrenheit"];

/// Per-user preferences document, as the dashboard reads and writes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserSettings {
    pub notifications: NotificationSettings,
    pub appearance: AppearanceSettings,
    pub privacy: PrivacySettings,
    pub units: UnitSettings,
    pub goals: GoalSettings,
    pub timezone: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NotificationSettings {
    pub enabled: bool,
    /// Minutes between reminders.
    pub interval: u32,
    pub start_time: String,
    pub end_time: String,
    pub sound: bool,
    pub email: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        NotificationSettings {
            enabled: false,
            interval: 60,
            start_time: "08:00".to_string(),
            end_time: "22:00".to_string(),
            sound: true,
            email: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppearanceSettings {
    pub theme: String,
    pub color_scheme: String,
    pub compact_mode: bool,
}

impl Default for AppearanceSettings {
    fn default() -> Self {
        AppearanceSettings {
            theme: "system".to_string(),
            color_scheme: "blue".to_string(),
            compact_mode: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PrivacySettings {
    pub data_sharing: bool,
    pub analytics: bool,
    pub marketing: bool,
}

impl Default for PrivacySettings {
    fn default() -> Self {
        PrivacySettings {
            data_sharing: false,
            analytics: true,
            marketing: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UnitSettings {
    pub preferred: Unit,
    pub temperature: String,
}

impl Default for UnitSettings {
    fn default() -> Self {
        UnitSettings {
            preferred: Unit::Ml,
            temperature: "celsius".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GoalSettings {
    /// Expressed in `units.preferred`.
    pub daily_target: f64,
    pub reminder_frequency: u32,
}

impl Default for GoalSettings {
    fn default() -> Self {
        GoalSettings {
            daily_target: DEFAULT_DAILY_GOAL_ML,
            reminder_frequency: 60,
        }
    }
}

impl Default for UserSettings {
    fn default() -> Self {
        UserSettings {
            notifications: NotificationSettings::default(),
            appearance: AppearanceSettings::default(),
            privacy: PrivacySettings::default(),
            units: UnitSettings::default(),
            goals: GoalSettings::default(),
            timezone: "UTC".to_string(),
        }
    }
}

impl UserSettings {
    /// The daily target converted to millilitres.
    pub fn daily_target_ml(&self) -> f64 {
        units::to_ml(self.goals.daily_target, self.units.preferred)
    }

    /// Overwrite the daily target with `goal_ml`, expressed in the preferred unit.
    pub fn set_daily_target_ml(&mut self, goal_ml: f64) {
        let target = units::from_ml(goal_ml, self.units.preferred);
        self.goals.daily_target = (target * 100.0).round() / 100.0;
    }

    pub fn tz(&self) -> Option<chrono_tz::Tz> {
        self.timezone.parse().ok()
    }

    /// Check every field; returns the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        let n = &self.notifications;
        let minutes = MIN_REMINDER_MINUTES..=MAX_REMINDER_MINUTES;
        if !minutes.contains(&n.interval) {
            return Err(format!(
                "Reminder interval must be between {} and {} minutes",
                MIN_REMINDER_MINUTES, MAX_REMINDER_MINUTES
            ));
        }
        if !minutes.contains(&self.goals.reminder_frequency) {
            return Err(format!(
                "Reminder frequency must be between {} and {} minutes",
                MIN_REMINDER_MINUTES, MAX_REMINDER_MINUTES
            ));
        }
        if parse_hhmm(&n.start_time).is_none() || parse_hhmm(&n.end_time).is_none() {
            return Err("Reminder times must use HH:MM".to_string());
        }
        if !THEMES.contains(&self.appearance.theme.as_str()) {
            return Err(format!("Unknown theme: {}", self.appearance.theme));
        }
        if !COLOR_SCHEMES.contains(&self.appearance.color_scheme.as_str()) {
            return Err(format!(
                "Unknown color scheme: {}",
                self.appearance.color_scheme
            ));
        }
        if !TEMPERATURES.contains(&self.units.temperature.as_str()) {
            return Err(format!(
                "Unknown temperature unit: {}",
                self.units.temperature
            ));
        }
        if self.tz().is_none() {
            return Err(format!("Unknown timezone: {}", self.timezone));
        }
        // 17..=169 oz is the same range as 500..=5000 ml, rounded outward
        let target_ml = self.daily_target_ml();
        if !is_valid_daily_goal(target_ml.round()) {
            return Err(match self.units.preferred {
                Unit::Ml => "Daily target must be between 500 and 5000 ml".to_string(),
                Unit::Oz => "Daily target must be between 17 and 169 oz".to_string(),
            });
        }
        Ok(())
    }
}

pub fn parse_hhmm(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M").ok()
}
