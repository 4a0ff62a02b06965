// crates/perf-ledger-core/src/date.rs
// ============================================================================
// Module: Report Dates
// Description: Parsing and ordering for history entry dates.
// Purpose: Accept the two sortable date spellings and order them by day.
// Dependencies: time
// ============================================================================

//! ## Overview
//! History entries carry their date as text, either `YYYYMMDD` or
//! `YYYY-MM-DD`. [`ReportDate`] validates both against the calendar and
//! [`DateSortKey`] orders stored strings by calendar day, using the raw text
//! as a tie-break. Legacy strings that fail to parse sort before every valid
//! date so they are pruned first.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::cmp::Ordering;
use std::fmt;

use thiserror::Error;
use time::Date;
use time::OffsetDateTime;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Compact eight-digit form, e.g. `20250420`.
const COMPACT_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year][month][day]");
/// ISO calendar form, e.g. `2025-04-20`.
const ISO_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

// ============================================================================
// SECTION: Types
// ============================================================================

/// Textual date spelling accepted for history entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateStyle {
    /// `YYYYMMDD`.
    Compact,
    /// `YYYY-MM-DD`.
    Iso,
}

/// Errors raised when a date string is not a valid report date.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DateError {
    /// The text matches neither accepted layout.
    #[error("date `{0}` must be YYYYMMDD or YYYY-MM-DD")]
    Layout(String),
    /// The layout matched but the calendar day does not exist.
    #[error("date `{0}` is not a valid calendar day")]
    Calendar(String),
}

/// Validated report date that remembers its original spelling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportDate {
    /// Text exactly as supplied.
    raw: String,
    /// Parsed calendar day.
    day: Date,
    /// Layout the text used.
    style: DateStyle,
}

impl ReportDate {
    /// Parses `YYYYMMDD` or `YYYY-MM-DD`.
    ///
    /// # Errors
    ///
    /// Returns [`DateError`] when the layout or calendar day is invalid.
    pub fn parse(text: &str) -> Result<Self, DateError> {
        let style = match text.len() {
            8 if text.bytes().all(|byte| byte.is_ascii_digit()) => DateStyle::Compact,
            10 if is_iso_layout(text) => DateStyle::Iso,
            _ => return Err(DateError::Layout(text.to_string())),
        };
        let format = match style {
            DateStyle::Compact => COMPACT_FORMAT,
            DateStyle::Iso => ISO_FORMAT,
        };
        let day = Date::parse(text, format).map_err(|_| DateError::Calendar(text.to_string()))?;
        Ok(Self {
            raw: text.to_string(),
            day,
            style,
        })
    }

    /// Returns today's UTC date in compact form.
    #[must_use]
    pub fn today_utc() -> Self {
        let day = OffsetDateTime::now_utc().date();
        Self {
            raw: compact_text(day),
            day,
            style: DateStyle::Compact,
        }
    }

    /// Returns the date text as supplied.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns the calendar day.
    #[must_use]
    pub const fn day(&self) -> Date {
        self.day
    }

    /// Returns the layout the text used.
    #[must_use]
    pub const fn style(&self) -> DateStyle {
        self.style
    }

    /// Returns the compact `YYYYMMDD` spelling of this date.
    #[must_use]
    pub fn compact(&self) -> String {
        compact_text(self.day)
    }
}

impl fmt::Display for ReportDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Ordering key for stored date strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateSortKey<'a> {
    /// Calendar day when the text parses.
    day: Option<Date>,
    /// Stored text, used as a tie-break.
    raw: &'a str,
}

impl<'a> DateSortKey<'a> {
    /// Builds the key for a stored date string.
    #[must_use]
    pub fn new(raw: &'a str) -> Self {
        Self {
            day: ReportDate::parse(raw).ok().map(|date| date.day),
            raw,
        }
    }
}

impl Ord for DateSortKey<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.day.cmp(&other.day).then_with(|| self.raw.cmp(other.raw))
    }
}

impl PartialOrd for DateSortKey<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Checks the `DDDD-DD-DD` shape before handing off to the parser.
fn is_iso_layout(text: &str) -> bool {
    text.bytes().enumerate().all(|(index, byte)| match index {
        4 | 7 => byte == b'-',
        _ => byte.is_ascii_digit(),
    })
}

/// Formats a calendar day as `YYYYMMDD`.
fn compact_text(day: Date) -> String {
    format!("{:04}{:02}{:02}", day.year(), u8::from(day.month()), day.day())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
