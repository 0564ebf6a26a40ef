//! Free-form date expressions ("3 days ago", "June 1, 2022", "last week").
//!
//! Every expression is evaluated against an anchor moment. Relative forms
//! move away from the anchor; absolute forms ignore it except for filling in
//! a missing year.

use std::sync::LazyLock;

use chrono::{Datelike, Duration, Months, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use regex::Regex;

const NUM: &str = r"(\d+|a|an|one|two|three|four|five|six|seven|eight|nine|ten|eleven|twelve)";
const UNIT: &str = r"(minute|hour|day|week|fortnight|month|year)";

static RE_AGO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"^{NUM} {UNIT}s? ago$")).expect("valid regex"));
static RE_IN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"^in {NUM} {UNIT}s?$")).expect("valid regex"));
static RE_LAST_N: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^(?:last|past|previous) {NUM} {UNIT}s?$")).expect("valid regex")
});
static RE_LAST_UNIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^(?:the )?(?:last|past|previous) {UNIT}$")).expect("valid regex")
});
static RE_THIS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^this (week|month|year)$").expect("valid regex"));
static RE_WEEKDAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:last |past |previous )?([a-z]+)$").expect("valid regex"));
static RE_ISO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4})[-/](\d{1,2})[-/](\d{1,2})(?:[ t](\d{1,2}):(\d{2})(?::(\d{2}))?)?$")
        .expect("valid regex")
});
static RE_US: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{4})$").expect("valid regex"));
static RE_DOTTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})\.(\d{1,2})\.(\d{4})$").expect("valid regex"));
static RE_MONTH_DAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([a-z]+)\.? (\d{1,2})(?:st|nd|rd|th)?(?: (\d{4}))?$").expect("valid regex")
});
static RE_DAY_MONTH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2})(?:st|nd|rd|th)? (?:of )?([a-z]+)\.?(?: (\d{4}))?$")
        .expect("valid regex")
});
static RE_MONTH_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([a-z]+)\.? (\d{4})$").expect("valid regex"));

const MONTHS: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

/// Result of evaluating one expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedDate {
    pub at: NaiveDateTime,
    /// True when the expression spelled out its year.
    pub explicit_year: bool,
}

impl ParsedDate {
    fn relative(at: NaiveDateTime) -> Self {
        Self {
            at,
            explicit_year: false,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.at.date()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unit {
    Minute,
    Hour,
    Day,
    Week,
    Fortnight,
    Month,
    Year,
}

impl Unit {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "minute" => Some(Unit::Minute),
            "hour" => Some(Unit::Hour),
            "day" => Some(Unit::Day),
            "week" => Some(Unit::Week),
            "fortnight" => Some(Unit::Fortnight),
            "month" => Some(Unit::Month),
            "year" => Some(Unit::Year),
            _ => None,
        }
    }

    /// Moves `at` by `n` units; negative `n` goes into the past.
    fn shift(self, at: NaiveDateTime, n: i64) -> Option<NaiveDateTime> {
        let months = |count: i64| -> Option<NaiveDateTime> {
            let magnitude = Months::new(u32::try_from(count.unsigned_abs()).ok()?);
            if count >= 0 {
                at.checked_add_months(magnitude)
            } else {
                at.checked_sub_months(magnitude)
            }
        };
        match self {
            Unit::Minute => at.checked_add_signed(Duration::try_minutes(n)?),
            Unit::Hour => at.checked_add_signed(Duration::try_hours(n)?),
            Unit::Day => at.checked_add_signed(Duration::try_days(n)?),
            Unit::Week => at.checked_add_signed(Duration::try_weeks(n)?),
            Unit::Fortnight => at.checked_add_signed(Duration::try_weeks(n.checked_mul(2)?)?),
            Unit::Month => months(n),
            Unit::Year => months(n.checked_mul(12)?),
        }
    }
}

fn parse_number(s: &str) -> Option<i64> {
    let n = match s {
        "a" | "an" | "one" => 1,
        "two" => 2,
        "three" => 3,
        "four" => 4,
        "five" => 5,
        "six" => 6,
        "seven" => 7,
        "eight" => 8,
        "nine" => 9,
        "ten" => 10,
        "eleven" => 11,
        "twelve" => 12,
        digits => digits.parse().ok()?,
    };
    Some(n)
}

fn month_from_name(name: &str) -> Option<u32> {
    if name.len() < 3 {
        return None;
    }
    MONTHS
        .iter()
        .position(|full| *full == name || (name.len() <= 4 && full.starts_with(name)))
        .map(|idx| idx as u32 + 1)
}

fn weekday_from_name(name: &str) -> Option<Weekday> {
    let day = match name {
        "monday" | "mon" => Weekday::Mon,
        "tuesday" | "tue" | "tues" => Weekday::Tue,
        "wednesday" | "wed" => Weekday::Wed,
        "thursday" | "thu" | "thur" | "thurs" => Weekday::Thu,
        "friday" | "fri" => Weekday::Fri,
        "saturday" | "sat" => Weekday::Sat,
        "sunday" | "sun" => Weekday::Sun,
        _ => return None,
    };
    Some(day)
}

fn normalize(expr: &str) -> String {
    expr.to_lowercase()
        .replace(',', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

fn absolute(date: NaiveDate, explicit_year: bool) -> ParsedDate {
    ParsedDate {
        at: midnight(date),
        explicit_year,
    }
}

/// Evaluates `expr` against `anchor`. A missing year defaults to the anchor's.
pub fn parse(expr: &str, anchor: NaiveDateTime) -> Option<ParsedDate> {
    parse_with_default_year(expr, anchor, anchor.year())
}

/// Like [`parse`], but absolute forms without a year use `default_year`.
pub fn parse_with_default_year(
    expr: &str,
    anchor: NaiveDateTime,
    default_year: i32,
) -> Option<ParsedDate> {
    let s = normalize(expr);
    if s.is_empty() {
        return None;
    }

    parse_keyword(&s, anchor)
        .or_else(|| parse_offset(&s, anchor))
        .or_else(|| parse_period_start(&s, anchor))
        .or_else(|| parse_weekday(&s, anchor))
        .or_else(|| parse_numeric(&s))
        .or_else(|| parse_named_month(&s, default_year))
}

fn parse_keyword(s: &str, anchor: NaiveDateTime) -> Option<ParsedDate> {
    let at = match s {
        "now" | "today" => anchor,
        "yesterday" => Unit::Day.shift(anchor, -1)?,
        "tomorrow" => Unit::Day.shift(anchor, 1)?,
        _ => return None,
    };
    Some(ParsedDate::relative(at))
}

fn parse_offset(s: &str, anchor: NaiveDateTime) -> Option<ParsedDate> {
    let (caps, sign) = if let Some(caps) = RE_AGO.captures(s) {
        (caps, -1)
    } else if let Some(caps) = RE_LAST_N.captures(s) {
        (caps, -1)
    } else if let Some(caps) = RE_IN.captures(s) {
        (caps, 1)
    } else if let Some(caps) = RE_LAST_UNIT.captures(s) {
        let unit = Unit::parse(&caps[1])?;
        return unit.shift(anchor, -1).map(ParsedDate::relative);
    } else {
        return None;
    };

    let n = parse_number(&caps[1])?;
    let unit = Unit::parse(&caps[2])?;
    unit.shift(anchor, sign * n).map(ParsedDate::relative)
}

fn parse_period_start(s: &str, anchor: NaiveDateTime) -> Option<ParsedDate> {
    let caps = RE_THIS.captures(s)?;
    let today = anchor.date();
    let start = match &caps[1] {
        "week" => today - Duration::days(i64::from(today.weekday().num_days_from_monday())),
        "month" => today.with_day(1)?,
        "year" => NaiveDate::from_ymd_opt(today.year(), 1, 1)?,
        _ => return None,
    };
    Some(ParsedDate::relative(midnight(start)))
}

fn parse_weekday(s: &str, anchor: NaiveDateTime) -> Option<ParsedDate> {
    let caps = RE_WEEKDAY.captures(s)?;
    let target = weekday_from_name(&caps[1])?;
    let current = anchor.weekday().num_days_from_monday();
    let wanted = target.num_days_from_monday();
    let back = match (current + 7 - wanted) % 7 {
        0 => 7,
        n => n,
    };
    Unit::Day
        .shift(anchor, -i64::from(back))
        .map(ParsedDate::relative)
}

fn parse_numeric(s: &str) -> Option<ParsedDate> {
    if let Some(caps) = RE_ISO.captures(s) {
        let date = NaiveDate::from_ymd_opt(caps[1].parse().ok()?, caps[2].parse().ok()?, caps[3].parse().ok()?)?;
        let at = match (caps.get(4), caps.get(5)) {
            (Some(h), Some(m)) => {
                let sec = caps.get(6).map_or(Some(0), |s| s.as_str().parse().ok())?;
                date.and_hms_opt(h.as_str().parse().ok()?, m.as_str().parse().ok()?, sec)?
            }
            _ => midnight(date),
        };
        return Some(ParsedDate {
            at,
            explicit_year: true,
        });
    }
    if let Some(caps) = RE_US.captures(s) {
        let date = NaiveDate::from_ymd_opt(caps[3].parse().ok()?, caps[1].parse().ok()?, caps[2].parse().ok()?)?;
        return Some(absolute(date, true));
    }
    if let Some(caps) = RE_DOTTED.captures(s) {
        let date = NaiveDate::from_ymd_opt(caps[3].parse().ok()?, caps[2].parse().ok()?, caps[1].parse().ok()?)?;
        return Some(absolute(date, true));
    }
    None
}

fn parse_named_month(s: &str, default_year: i32) -> Option<ParsedDate> {
    let (month, day, year) = if let Some(caps) = RE_MONTH_DAY.captures(s) {
        (
            month_from_name(&caps[1])?,
            caps[2].parse::<u32>().ok()?,
            caps.get(3).map(|y| y.as_str().parse::<i32>()),
        )
    } else if let Some(caps) = RE_DAY_MONTH.captures(s) {
        (
            month_from_name(&caps[2])?,
            caps[1].parse::<u32>().ok()?,
            caps.get(3).map(|y| y.as_str().parse::<i32>()),
        )
    } else if let Some(caps) = RE_MONTH_YEAR.captures(s) {
        (month_from_name(&caps[1])?, 1, Some(caps[2].parse::<i32>()))
    } else {
        return None;
    };

    let explicit_year = year.is_some();
    let year = match year {
        Some(parsed) => parsed.ok()?,
        None => default_year,
    };
    NaiveDate::from_ymd_opt(year, month, day).map(|date| absolute(date, explicit_year))
}
