//! Calendar dates embedded in backup file names.
//!
//! Backup tools usually stamp their output with the day it was produced,
//! e.g. `db-2021-03-05.sql.gz`. This module pulls that date back out so a
//! file can be bucketed by when it was made rather than when it was last
//! touched on disk.
//!
//! # Examples
//!
//! ```
//! use backtidy::date_extractor::extract_date;
//! use chrono::NaiveDate;
//!
//! assert_eq!(
//!     extract_date("dump-2021-03-05.sql", 2024),
//!     NaiveDate::from_ymd_opt(2021, 3, 5)
//! );
//! assert_eq!(extract_date("dump-latest.sql", 2024), None);
//! ```

use chrono::NaiveDate;
use regex::Regex;
use std::sync::LazyLock;

/// Four-digit year, then month and day of one or two digits, all separated by
/// non-digits. The trailing non-digit keeps the day from being cut out of a
/// longer numeric run. Digits are ASCII only.
static DATE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([0-9]{4})[^0-9]([0-9]{1,2})[^0-9]([0-9]{1,2})[^0-9]")
        .expect("date pattern is a valid regex")
});

/// Extracts the calendar date embedded in `file_name`.
///
/// Only the first date-like substring is considered. It is rejected when the
/// year lies after `current_year`, the month is outside 1-12, the day is
/// outside 1-31, or the components do not form a real calendar date (such as
/// April 31st). A rejected or missing date is `None`, never an error.
pub fn extract_date(file_name: &str, current_year: i32) -> Option<NaiveDate> {
    let captures = DATE_PATTERN.captures(file_name)?;

    let year: i32 = captures[1].parse().ok()?;
    if year > current_year {
        return None;
    }

    let month: u32 = captures[2].parse().ok()?;
    if !(1..=12).contains(&month) {
        return None;
    }

    let day: u32 = captures[3].parse().ok()?;
    if !(1..=31).contains(&day) {
        return None;
    }

    NaiveDate::parse_from_str(&format!("{year:04}-{month:02}-{day:02}"), "%Y-%m-%d").ok()
}
