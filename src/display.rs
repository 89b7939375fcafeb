//! Display helpers for broker tokens and tasks
//!
//! Pure functions only: no I/O and no session access.

use crate::api::types::Task;
use chrono::{DateTime, Datelike, Duration, Months, Utc};
use serde::Serialize;
use std::str::FromStr;

const MASK: &str = "********";
const MASK_EDGE: usize = 4;
const EXPIRING_SOON_DAYS: i64 = 7;
const MILLIS_PER_DAY: i64 = 86_400_000;

/// Mask a secret token for display.
///
/// Tokens of at most 8 characters become 8 asterisks, longer tokens keep
/// their first and last 4 characters.
pub fn mask_token(raw: &str) -> String {
    let chars: Vec<char> = raw.chars().collect();
    if chars.len() <= MASK.len() {
        return MASK.to_string();
    }

    let head: String = chars[..MASK_EDGE].iter().collect();
    let tail: String = chars[chars.len() - MASK_EDGE..].iter().collect();
    format!("{}...{}", head, tail)
}

/// Expiry classification for a broker token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryStatus {
    Expired,
    ExpiringSoon,
    Healthy,
}

impl ExpiryStatus {
    pub fn from_days(days_until_expiry: i64) -> Self {
        if days_until_expiry < 0 {
            ExpiryStatus::Expired
        } else if days_until_expiry < EXPIRING_SOON_DAYS {
            ExpiryStatus::ExpiringSoon
        } else {
            ExpiryStatus::Healthy
        }
    }
}

/// Broker token expiry info
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenExpiry {
    pub expires_at: DateTime<Utc>,
    pub days_until_expiry: i64,
    pub status: ExpiryStatus,
}

/// Expiry info relative to `now`. Tokens live one calendar month.
pub fn token_expiry_info_at(created_at: DateTime<Utc>, now: DateTime<Utc>) -> TokenExpiry {
    let expires_at = add_one_month(created_at).unwrap_or(DateTime::<Utc>::MAX_UTC);

    let days_until_expiry = (expires_at - now)
        .num_milliseconds()
        .div_euclid(MILLIS_PER_DAY);

    TokenExpiry {
        expires_at,
        days_until_expiry,
        status: ExpiryStatus::from_days(days_until_expiry),
    }
}

// Same day number one month later. Days past the end of that month roll
// into the next one (Jan 31 -> Mar 2 in a leap year).
fn add_one_month(at: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let first_of_month = at.with_day(1)?;
    let first_of_next = first_of_month.checked_add_months(Months::new(1))?;
    first_of_next.checked_add_signed(Duration::days(i64::from(at.day0())))
}

/// Expiry info relative to the current time
pub fn token_expiry_info(created_at: DateTime<Utc>) -> TokenExpiry {
    token_expiry_info_at(created_at, Utc::now())
}

/// Task status filter
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TaskFilter {
    #[default]
    All,
    Status(String),
}

impl TaskFilter {
    pub fn matches(&self, task: &Task) -> bool {
        match self {
            TaskFilter::All => true,
            TaskFilter::Status(wanted) => task
                .status
                .as_deref()
                .map(|status| status.eq_ignore_ascii_case(wanted))
                .unwrap_or(false),
        }
    }

    pub fn apply<'a>(&self, tasks: &'a [Task]) -> Vec<&'a Task> {
        tasks.iter().filter(|task| self.matches(task)).collect()
    }
}

impl FromStr for TaskFilter {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("all") {
            Ok(TaskFilter::All)
        } else {
            Ok(TaskFilter::Status(s.to_string()))
        }
    }
}
