//! Civil-date windows for the order search.
//!
//! Reports are asked for in local civil dates (UTC−3). The upstream filter
//! works in UTC−4 and its interpretation is not trusted, so the request
//! window is padded and every returned order is re-checked locally.

use chrono::{
    DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Offset, SecondsFormat, TimeZone, Utc,
};

use crate::error::MarketplaceError;

const LOCAL_OFFSET_SECS: i32 = -3 * 3600;
const UPSTREAM_OFFSET_SECS: i32 = -4 * 3600;

/// The fixed local offset reports are expressed in.
#[must_use]
pub fn local_offset() -> FixedOffset {
    FixedOffset::east_opt(LOCAL_OFFSET_SECS).unwrap_or(Utc.fix())
}

fn upstream_offset() -> FixedOffset {
    FixedOffset::east_opt(UPSTREAM_OFFSET_SECS).unwrap_or(Utc.fix())
}

/// Parses `DD/MM/YYYY` or `YYYY-MM-DD`.
///
/// # Errors
///
/// Returns [`MarketplaceError::InvalidDate`] when neither format matches.
pub fn parse_civil_date(input: &str) -> Result<NaiveDate, MarketplaceError> {
    let trimmed = input.trim();
    NaiveDate::parse_from_str(trimmed, "%d/%m/%Y")
        .or_else(|_| NaiveDate::parse_from_str(trimmed, "%Y-%m-%d"))
        .map_err(|_| MarketplaceError::InvalidDate {
            input: input.to_owned(),
        })
}

/// Inclusive range of local civil dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateWindow {
    /// # Errors
    ///
    /// Returns [`MarketplaceError::InvalidDateRange`] if `start > end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, MarketplaceError> {
        if start > end {
            return Err(MarketplaceError::InvalidDateRange {
                start: start.format("%d/%m/%Y").to_string(),
                end: end.format("%d/%m/%Y").to_string(),
            });
        }
        Ok(Self { start, end })
    }

    #[must_use]
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    #[must_use]
    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Lower bound sent upstream: local midnight of `start`, expressed in
    /// UTC−4, moved back one more hour.
    #[must_use]
    pub fn upstream_from(&self) -> DateTime<FixedOffset> {
        local_midnight_upstream(self.start) - Duration::hours(1)
    }

    /// Upper bound sent upstream: local midnight of `end` in UTC−4 plus
    /// 23:59:59.999999.
    #[must_use]
    pub fn upstream_to(&self) -> DateTime<FixedOffset> {
        local_midnight_upstream(self.end)
            + Duration::hours(23)
            + Duration::minutes(59)
            + Duration::seconds(59)
            + Duration::microseconds(999_999)
    }

    /// ISO-8601 renderings of the two upstream bounds.
    #[must_use]
    pub fn upstream_params(&self) -> (String, String) {
        (
            self.upstream_from()
                .to_rfc3339_opts(SecondsFormat::AutoSi, false),
            self.upstream_to().to_rfc3339_opts(SecondsFormat::AutoSi, false),
        )
    }

    /// Whether `closed`, seen as a local civil date, falls inside the window.
    #[must_use]
    pub fn contains(&self, closed: &DateTime<FixedOffset>) -> bool {
        let local = closed.with_timezone(&local_offset()).date_naive();
        self.start <= local && local <= self.end
    }
}

fn local_midnight_upstream(date: NaiveDate) -> DateTime<FixedOffset> {
    let local_midnight = date.and_time(NaiveTime::MIN);
    let as_utc = local_midnight - Duration::seconds(i64::from(LOCAL_OFFSET_SECS));
    upstream_offset().from_utc_datetime(&as_utc)
}
