// src/partition.rs

use std::fmt;
use std::path::Path;

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Error, Result};

static KEY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{2})(0[1-9]|1[0-2])?$").expect("partition key regex should compile")
});

/// One scheduled unit of work: `YY` for annual files, `YYMM` for monthly ones.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PartitionKey(String);

impl PartitionKey {
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if KEY_RE.is_match(raw) {
            Ok(Self(raw.to_string()))
        } else {
            Err(Error::InvalidPartitionKey(raw.to_string()))
        }
    }

    /// Key of a raw file, taken from its stem (`.../2505.xls` → `2505`).
    pub fn from_path(path: &Path) -> Result<Self> {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| Error::InvalidPartitionKey(path.display().to_string()))?;
        Self::parse(stem)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The key read as a plain integer (`"2505"` → `2505`), used for era cutoffs.
    pub fn as_number(&self) -> u32 {
        // the regex guarantees ASCII digits only
        self.0.parse().unwrap_or_default()
    }

    pub fn year(&self) -> i32 {
        2000 + self.0[..2].parse::<i32>().unwrap_or_default()
    }

    pub fn month(&self) -> Option<u32> {
        self.0.get(2..4).and_then(|m| m.parse().ok())
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    /// Jan 1st every year, keys formatted `%y`.
    Yearly,
    /// 1st of every month, keys formatted `%y%m`.
    Monthly,
}

/// A time-window partition schedule anchored at `start_year`-01-01.
///
/// The last issued partition is the last *complete* window shifted by
/// `end_offset` windows: `0` stops before the running window, `1` includes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionsDef {
    pub start_year: i32,
    pub cadence: Cadence,
    pub end_offset: i32,
}

pub const EPOCH_YEAR: i32 = 2020;

impl PartitionsDef {
    pub const fn yearly(end_offset: i32) -> Self {
        Self {
            start_year: EPOCH_YEAR,
            cadence: Cadence::Yearly,
            end_offset,
        }
    }

    pub const fn monthly(end_offset: i32) -> Self {
        Self {
            start_year: EPOCH_YEAR,
            cadence: Cadence::Monthly,
            end_offset,
        }
    }

    /// Index of the window containing `date`, counted from the start window.
    fn window_index(&self, date: NaiveDate) -> i64 {
        let years = i64::from(date.year() - self.start_year);
        match self.cadence {
            Cadence::Yearly => years,
            Cadence::Monthly => years * 12 + i64::from(date.month0()),
        }
    }

    fn key_at(&self, index: i64) -> PartitionKey {
        let key = match self.cadence {
            Cadence::Yearly => {
                let year = i64::from(self.start_year) + index;
                format!("{:02}", year.rem_euclid(100))
            }
            Cadence::Monthly => {
                let year = i64::from(self.start_year) + index / 12;
                let month = index % 12 + 1;
                format!("{:02}{:02}", year.rem_euclid(100), month)
            }
        };
        PartitionKey(key)
    }

    /// All partition keys due as of `today`, oldest first.
    pub fn keys_as_of(&self, today: NaiveDate) -> Vec<PartitionKey> {
        let count = (self.window_index(today) + i64::from(self.end_offset)).max(0);
        (0..count).map(|i| self.key_at(i)).collect()
    }

    /// Whether `key` belongs to this schedule's shape (not whether it is due).
    pub fn accepts(&self, key: &PartitionKey) -> bool {
        match self.cadence {
            Cadence::Yearly => key.month().is_none(),
            Cadence::Monthly => key.month().is_some(),
        }
    }
}
