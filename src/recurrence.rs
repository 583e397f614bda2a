//! Expansion of a recurring event definition into dated instances.

use std::fmt;
use std::str::FromStr;

use chrono::{Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::appresult::{DataError, DataResult};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Repeat {
    #[default]
    Single,
    Daily,
    Weekly,
    Monthly,
}

impl Repeat {
    pub const ALL: [Repeat; 4] = [Repeat::Single, Repeat::Daily, Repeat::Weekly, Repeat::Monthly];

    pub fn as_str(&self) -> &'static str {
        use Repeat::*;
        match self {
            Single => "single",
            Daily => "daily",
            Weekly => "weekly",
            Monthly => "monthly",
        }
    }

    pub fn is_recurring(&self) -> bool {
        *self != Repeat::Single
    }

    /// Unit shown next to the "every N" selector.
    pub fn unit(&self) -> &'static str {
        use Repeat::*;
        match self {
            Single => "",
            Daily => "day(s)",
            Weekly => "week(s)",
            Monthly => "month(s)",
        }
    }

    /// Start date of the `n`th occurrence, counted from `first`.
    fn nth(&self, first: NaiveDate, every: u32, n: u32) -> Option<NaiveDate> {
        let steps = every.checked_mul(n)?;
        use Repeat::*;
        match self {
            Single => (n == 0).then_some(first),
            Daily => first.checked_add_days(Days::new(steps.into())),
            Weekly => first.checked_add_days(Days::new(u64::from(steps) * 7)),
            Monthly => first.checked_add_months(Months::new(steps)),
        }
    }
}

impl fmt::Display for Repeat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Repeat {
    type Err = DataError;

    fn from_str(s: &str) -> DataResult<Repeat> {
        Repeat::ALL
            .into_iter()
            .find(|repeat| repeat.as_str() == s)
            .ok_or_else(|| DataError::Invalid(format!("unknown repeat kind {s:?}")))
    }
}

/// One dated instance of a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occurrence {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Occurrences of `first` repeated every `every` units until `until`
/// (inclusive, compared on start dates), at most `limit` of them.
///
/// Each occurrence keeps the first one's length in days. Month steps are
/// taken from the first start date, so Jan 31 gives Feb 28 then Mar 31.
pub fn expand(
    first: Occurrence,
    repeat: Repeat,
    every: u32,
    until: NaiveDate,
    limit: usize,
) -> DataResult<Vec<Occurrence>> {
    if first.end < first.start {
        return Err(DataError::Invalid("event ends before it starts".to_owned()));
    }
    if !repeat.is_recurring() {
        return Ok(vec![first]);
    }
    if every == 0 {
        return Err(DataError::Invalid("repeat interval must be at least 1".to_owned()));
    }
    if until < first.start {
        return Err(DataError::Invalid("series ends before its first occurrence".to_owned()));
    }

    let length = Days::new((first.end - first.start).num_days().unsigned_abs());
    let mut occurrences = Vec::new();
    for n in 0.. {
        if occurrences.len() >= limit {
            break;
        }
        let Some(start) = repeat.nth(first.start, every, n) else {
            break;
        };
        if start > until {
            break;
        }
        let end = start
            .checked_add_days(length)
            .ok_or_else(|| DataError::Invalid("occurrence out of calendar range".to_owned()))?;
        occurrences.push(Occurrence { start, end });
    }
    Ok(occurrences)
}
