//! Human-formatted expiry dates: "January 2nd, 2030" → midnight UTC.

use crate::error::{ScrapeError, ScrapeResult};
use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use std::sync::LazyLock;
use tracing::warn;

/// "Month D, YYYY" with a full month name and unpadded day.
const DATE_FORMAT: &str = "%B %d, %Y";

static ORDINAL_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,2})(?:st|nd|rd|th)\b").expect("ordinal suffix pattern is valid")
});

/// chrono's `%B` also takes "Jan" and `%Y` takes "99"; neither is allowed here.
static FULL_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:January|February|March|April|May|June|July|August|September|October|November|December) \d{1,2}, \d{4}$",
    )
    .expect("full date pattern is valid")
});

/// Strip "st"/"nd"/"rd"/"th" from day numbers. "2nd, 2030" → "2, 2030"
pub fn strip_ordinals(s: &str) -> String {
    ORDINAL_SUFFIX.replace_all(s, "$1").into_owned()
}

/// Parse an expiry text into the start of that day, UTC.
pub fn normalize(text: &str) -> ScrapeResult<DateTime<Utc>> {
    let cleaned = strip_ordinals(text.trim());
    if !FULL_DATE.is_match(&cleaned) {
        return Err(ScrapeError::Date {
            input: text.to_string(),
        });
    }

    let date = NaiveDate::parse_from_str(&cleaned, DATE_FORMAT).map_err(|_| ScrapeError::Date {
        input: text.to_string(),
    })?;

    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
        .ok_or_else(|| ScrapeError::Date {
            input: text.to_string(),
        })
}

/// Signed milliseconds from `now` until `ts`; negative once `ts` has passed.
pub fn remaining_millis_at(ts: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (ts - now).num_milliseconds()
}

/// Like `remaining_millis_at(normalize(text)?, now)`, but an unparseable date
/// counts as already expired (-1) instead of failing.
pub fn remaining_millis_or_expired(text: &str, now: DateTime<Utc>) -> i64 {
    match normalize(text) {
        Ok(ts) => remaining_millis_at(ts, now),
        Err(e) => {
            warn!("{}", e);
            -1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn ordinal_and_plain_forms_agree() {
        let with_suffix = assert_ok!(normalize("January 2nd, 2030"));
        let plain = assert_ok!(normalize("January 2, 2030"));
        assert_eq!(with_suffix, plain);
        assert_eq!(plain, Utc.with_ymd_and_hms(2030, 1, 2, 0, 0, 0).unwrap());
    }

    #[test]
    fn every_suffix_is_stripped() {
        assert_eq!(strip_ordinals("March 1st, 2030"), "March 1, 2030");
        assert_eq!(strip_ordinals("March 22nd, 2030"), "March 22, 2030");
        assert_eq!(strip_ordinals("March 3rd, 2030"), "March 3, 2030");
        assert_eq!(strip_ordinals("March 14th, 2030"), "March 14, 2030");
        // Month names are left alone
        assert_eq!(strip_ordinals("August 4th, 2030"), "August 4, 2030");
    }

    #[test]
    fn surrounding_whitespace_is_tolerated() {
        assert_ok!(normalize("  December 31st, 2099\n"));
    }

    #[test]
    fn garbage_is_rejected() {
        assert_err!(normalize("not a date"));
        assert_err!(normalize(""));
        assert_err!(normalize("2030-01-02"));
        assert_err!(normalize("February 30th, 2030"));
    }

    #[test]
    fn abbreviated_months_and_short_years_are_rejected() {
        assert_err!(normalize("Jan 2, 2099"));
        assert_err!(normalize("Jan 2nd, 2099"));
        assert_err!(normalize("January 2, 99"));
        assert_err!(normalize("January 2, 20999"));
        assert_err!(normalize("january 2, 2099"));
        assert_eq!(remaining_millis_or_expired("Jan 2nd, 2099", Utc::now()), -1);
    }

    #[test]
    fn remaining_is_signed() {
        let now = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        let tomorrow = Utc.with_ymd_and_hms(2030, 1, 2, 0, 0, 0).unwrap();
        assert_eq!(remaining_millis_at(tomorrow, now), 86_400_000);
        assert_eq!(remaining_millis_at(now, tomorrow), -86_400_000);
        assert_eq!(remaining_millis_at(now, now), 0);
    }

    #[test]
    fn unparseable_dates_count_as_expired() {
        let now = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(remaining_millis_or_expired("not a date", now), -1);
        assert!(remaining_millis_or_expired("January 2nd, 2030", now) > 0);
        assert!(remaining_millis_or_expired("January 2nd, 2020", now) < 0);
    }

    #[test]
    fn far_future_is_not_expired_today() {
        let ts = assert_ok!(normalize("January 2nd, 2099"));
        assert!(remaining_millis_at(ts, Utc::now()) > 0);
    }
}
