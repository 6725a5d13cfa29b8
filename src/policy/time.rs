//! Wall-clock awareness: business hours and freeze windows.

use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};

/// Operator-declared window during which releases are blocked
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FreezeWindow {
    pub name: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

impl FreezeWindow {
    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        self.starts_at <= now && now < self.ends_at
    }
}

/// Time configuration feeding the `time.*` context paths
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeRules {
    /// First business hour (UTC, inclusive)
    pub business_start_hour: u32,

    /// Last business hour (UTC, exclusive)
    pub business_end_hour: u32,

    /// Lowercase weekday names counted as business days
    pub business_days: Vec<String>,

    pub freezes: Vec<FreezeWindow>,
}

impl Default for TimeRules {
    fn default() -> Self {
        Self {
            business_start_hour: 9,
            business_end_hour: 17,
            business_days: vec![
                "monday".to_string(),
                "tuesday".to_string(),
                "wednesday".to_string(),
                "thursday".to_string(),
                "friday".to_string(),
            ],
            freezes: Vec::new(),
        }
    }
}

/// Computed wall-clock flags for one evaluation instant
#[derive(Debug, Clone)]
pub struct TimeFlags {
    pub business_hours: bool,
    pub hour: u32,
    pub weekday: String,
    pub freeze_active: bool,
    pub freeze_name: Option<String>,
}

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}

impl TimeRules {
    pub fn with_freeze(mut self, freeze: FreezeWindow) -> Self {
        self.freezes.push(freeze);
        self
    }

    /// Evaluates every time predicate at the given instant. Predicates
    /// are independent; precedence among overlapping windows is the
    /// policy author's concern.
    pub fn evaluate(&self, now: DateTime<Utc>) -> TimeFlags {
        let hour = now.hour();
        let weekday = weekday_name(now.weekday()).to_string();

        let business_day = self.business_days.iter().any(|d| d == &weekday);
        let business_hours =
            business_day && hour >= self.business_start_hour && hour < self.business_end_hour;

        let active = self.freezes.iter().find(|f| f.contains(now));

        TimeFlags {
            business_hours,
            hour,
            weekday,
            freeze_active: active.is_some(),
            freeze_name: active.map(|f| f.name.clone()),
        }
    }
}
