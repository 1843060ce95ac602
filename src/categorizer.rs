//! Age-based categorization of discovered backup files.
//!
//! Every file lands in exactly one bucket:
//!
//! - **recent**: dated less than 2 days before the run; all are kept.
//! - **last-month**: less than 31 days old; one file per calendar day is kept.
//! - **year**: older than that, per calendar year; one file per month is kept.
//! - **garbage**: files that lost their day or month slot to a newer file.
//!
//! Thinning happens per pattern group. The group is sorted newest first
//! (sorting date, then modification time) and then walked once, comparing
//! each candidate only with the last file kept in the same bucket. Adjacency
//! in that order is what makes "same slot as the previous kept file"
//! equivalent to "slot already taken", so the sort must stay in front of the
//! single pass.
//!
//! # Examples
//!
//! ```
//! use backtidy::categorizer::{Bucket, categorize_group};
//! use backtidy::discovery::FileDescriptor;
//! use chrono::NaiveDate;
//! use std::path::PathBuf;
//!
//! let now = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap().and_hms_opt(12, 0, 0).unwrap();
//! let file = |name: &str, y, m, d| {
//!     let date = NaiveDate::from_ymd_opt(y, m, d).unwrap();
//!     FileDescriptor::new(PathBuf::from(name), Some(date), date.and_hms_opt(1, 0, 0).unwrap())
//! };
//!
//! let bins = categorize_group(
//!     vec![file("a", 2021, 3, 5), file("b", 2021, 3, 18), file("c", 2024, 6, 15)],
//!     now,
//! );
//! assert_eq!(bins.recent.len(), 1);
//! assert_eq!(bins.years[&2021][0].path, PathBuf::from("b"));
//! assert_eq!(bins.garbage[0].path, PathBuf::from("a"));
//! assert_eq!(Bucket::Year(2021).dir_name(), "2021");
//! ```

use crate::discovery::{FileDescriptor, PatternGroup};
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::info;

/// Files dated less than this many days before the run are recent.
pub const RECENT_DAYS: i64 = 2;

/// Files dated less than this many days before the run keep one per day.
pub const LAST_MONTH_DAYS: i64 = 31;

/// Archive subdirectory a file ends up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Bucket {
    Recent,
    LastMonth,
    Year(i32),
    /// Quarantine for garbage when it is not deleted outright.
    Garbage,
}

impl Bucket {
    /// Returns the directory name for this bucket.
    ///
    /// ```
    /// use backtidy::categorizer::Bucket;
    ///
    /// assert_eq!(Bucket::Recent.dir_name(), "recent");
    /// assert_eq!(Bucket::LastMonth.dir_name(), "last-month");
    /// assert_eq!(Bucket::Garbage.dir_name(), "delete-me");
    /// ```
    pub fn dir_name(&self) -> String {
        match self {
            Bucket::Recent => "recent".to_string(),
            Bucket::LastMonth => "last-month".to_string(),
            Bucket::Year(year) => year.to_string(),
            Bucket::Garbage => "delete-me".to_string(),
        }
    }
}

/// How old a file is relative to the run, before deduplication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Age {
    Recent,
    LastMonth,
    Year(i32),
}

impl Age {
    /// Age of a file with the given sorting date, measured from local
    /// midnight of that date.
    pub fn of(sorting_date: NaiveDate, now: NaiveDateTime) -> Self {
        let age = now - sorting_date.and_time(NaiveTime::MIN);
        if age < TimeDelta::days(RECENT_DAYS) {
            Age::Recent
        } else if age < TimeDelta::days(LAST_MONTH_DAYS) {
            Age::LastMonth
        } else {
            Age::Year(sorting_date.year())
        }
    }
}

/// The four disjoint bins produced by categorization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CategorizedFiles {
    pub recent: Vec<FileDescriptor>,
    pub last_month: Vec<FileDescriptor>,
    pub years: BTreeMap<i32, Vec<FileDescriptor>>,
    pub garbage: Vec<FileDescriptor>,
}

impl CategorizedFiles {
    /// Routes one file into the bins, given that every file already accepted
    /// from the same group sorts before it.
    ///
    /// A last-month file whose date equals the last kept last-month file, or
    /// a year file whose month equals the last kept file of that year, is
    /// garbage.
    pub fn accept(mut self, file: FileDescriptor, now: NaiveDateTime) -> Self {
        match Age::of(file.sorting_date, now) {
            Age::Recent => self.recent.push(file),
            Age::LastMonth => {
                let taken = self
                    .last_month
                    .last()
                    .is_some_and(|kept| kept.sorting_date == file.sorting_date);
                if taken {
                    self.garbage.push(file);
                } else {
                    self.last_month.push(file);
                }
            }
            Age::Year(year) => {
                let kept_in_year = self.years.entry(year).or_default();
                let taken = kept_in_year
                    .last()
                    .is_some_and(|kept| kept.sorting_date.month() == file.sorting_date.month());
                if taken {
                    self.garbage.push(file);
                } else {
                    kept_in_year.push(file);
                }
            }
        }
        self
    }

    /// Appends every bin of `other` to the matching bin of `self`.
    pub fn merge(&mut self, other: CategorizedFiles) {
        self.recent.extend(other.recent);
        self.last_month.extend(other.last_month);
        self.garbage.extend(other.garbage);
        for (year, files) in other.years {
            self.years.entry(year).or_default().extend(files);
        }
    }

    /// Number of files kept in year buckets.
    pub fn years_len(&self) -> usize {
        self.years.values().map(Vec::len).sum()
    }

    /// Number of files across all four bins.
    pub fn len(&self) -> usize {
        self.recent.len() + self.last_month.len() + self.years_len() + self.garbage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Newest sorting date first; equal dates put the latest modification first.
pub fn newest_first(a: &FileDescriptor, b: &FileDescriptor) -> Ordering {
    b.sorting_date
        .cmp(&a.sorting_date)
        .then_with(|| b.modified.cmp(&a.modified))
}

/// Categorizes the files of a single pattern group.
pub fn categorize_group(mut files: Vec<FileDescriptor>, now: NaiveDateTime) -> CategorizedFiles {
    files.sort_by(newest_first);
    files
        .into_iter()
        .fold(CategorizedFiles::default(), |bins, file| bins.accept(file, now))
}

/// File counts per bin.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BinCounts {
    pub matched: usize,
    pub garbage: usize,
    pub recent: usize,
    pub last_month: usize,
    pub years: BTreeMap<i32, usize>,
}

impl BinCounts {
    pub fn from_bins(bins: &CategorizedFiles) -> Self {
        Self {
            matched: bins.len(),
            garbage: bins.garbage.len(),
            recent: bins.recent.len(),
            last_month: bins.last_month.len(),
            years: bins
                .years
                .iter()
                .filter(|(_, files)| !files.is_empty())
                .map(|(year, files)| (*year, files.len()))
                .collect(),
        }
    }

    /// Number of files kept in year buckets.
    pub fn years_total(&self) -> usize {
        self.years.values().sum()
    }
}

/// Counts for one pattern group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupSummary {
    pub pattern: String,
    #[serde(flatten)]
    pub counts: BinCounts,
}

/// Result of categorizing every pattern group of a directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Categorization {
    pub bins: CategorizedFiles,
    pub groups: Vec<GroupSummary>,
}

/// Categorizes each pattern group independently and merges the bins.
pub fn categorize(groups: Vec<PatternGroup>, now: NaiveDateTime) -> Categorization {
    let mut result = Categorization::default();

    for group in groups {
        info!(
            pattern = %group.pattern,
            entries = group.files.len(),
            "processing files matching /{}/",
            group.pattern
        );
        let bins = categorize_group(group.files, now);
        result.groups.push(GroupSummary {
            pattern: group.pattern,
            counts: BinCounts::from_bins(&bins),
        });
        result.bins.merge(bins);
    }

    let bins = &result.bins;
    info!(
        "total: {} entries, {} to delete, {} recent, {} from the last month, {} from all years",
        bins.len(),
        bins.garbage.len(),
        bins.recent.len(),
        bins.last_month.len(),
        bins.years_len()
    );

    result
}
