use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::fmt;
use std::str::FromStr;

/// A cron expression evaluated in a configured time zone.
///
/// Accepts the usual five fields (`minute hour day-of-month month day-of-week`)
/// and the `cron` crate's six/seven field form with a leading seconds field.
/// Five-field expressions fire at second zero. Day-of-week follows the `cron`
/// crate: names (`MON-FRI`) or `1-7` with Sunday as 1.
#[derive(Clone, Debug)]
pub struct CronSchedule {
    expression: String,
    schedule: cron::Schedule,
}

impl CronSchedule {
    pub fn parse(expression: &str) -> Result<Self> {
        let fields: Vec<&str> = expression.split_whitespace().collect();
        let full = match fields.len() {
            5 => format!("0 {}", fields.join(" ")),
            6 | 7 => fields.join(" "),
            n => {
                return Err(Error::config(format!(
                    "cron expression {expression:?} has {n} fields, expected 5, 6 or 7"
                )));
            }
        };
        let schedule = cron::Schedule::from_str(&full)
            .map_err(|e| Error::config(format!("invalid cron expression {expression:?}: {e}")))?;

        Ok(Self {
            expression: fields.join(" "),
            schedule,
        })
    }

    /// First fire strictly after `after`, matched against wall time in `tz`.
    pub fn next_after(&self, after: DateTime<Utc>, tz: Tz) -> Option<DateTime<Utc>> {
        self.schedule
            .after(&after.with_timezone(&tz))
            .next()
            .map(|at| at.with_timezone(&Utc))
    }
}

impl PartialEq for CronSchedule {
    fn eq(&self, other: &Self) -> bool {
        self.expression == other.expression
    }
}

impl Eq for CronSchedule {}

impl fmt::Display for CronSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expression)
    }
}

impl FromStr for CronSchedule {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
