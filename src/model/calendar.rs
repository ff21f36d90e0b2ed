//! Calendar arithmetic on naive local instants.
//!
//! Everything here is pure: no clock access except [`today`] and [`now`].
//! Coarse units follow the chart's convention of 30-day months and
//! 12-month years when measuring differences.

use std::str::FromStr;

use chrono::{Datelike, Duration, Local, Months, NaiveDate, NaiveDateTime, Timelike};

use crate::errors::{GanttError, Result};

/// Granularity for [`add`], [`diff`] and [`start_of`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DateUnit {
    Millisecond,
    Second,
    Minute,
    Hour,
    Day,
    Month,
    Year,
}

impl DateUnit {
    /// Length of one unit in milliseconds, as used by [`diff`].
    pub fn millis(self) -> i64 {
        match self {
            DateUnit::Millisecond => 1,
            DateUnit::Second => 1_000,
            DateUnit::Minute => 60_000,
            DateUnit::Hour => 3_600_000,
            DateUnit::Day => 86_400_000,
            DateUnit::Month => 30 * 86_400_000,
            DateUnit::Year => 12 * 30 * 86_400_000,
        }
    }
}

impl FromStr for DateUnit {
    type Err = GanttError;

    /// Accepts singular or plural names ("day" and "days").
    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_lowercase();
        let singular = lower.strip_suffix('s').unwrap_or(&lower);
        match singular {
            "millisecond" => Ok(DateUnit::Millisecond),
            "second" => Ok(DateUnit::Second),
            "minute" => Ok(DateUnit::Minute),
            "hour" => Ok(DateUnit::Hour),
            "day" => Ok(DateUnit::Day),
            "month" => Ok(DateUnit::Month),
            "year" => Ok(DateUnit::Year),
            _ => Err(GanttError::InvalidUnit(s.to_string())),
        }
    }
}

/// Parse `YYYY-MM-DD[THH:mm[:ss[.sss]]]`. A space may replace the `T` and
/// `/` may replace the date dashes.
pub fn parse(text: &str) -> Result<NaiveDateTime> {
    let invalid = || GanttError::InvalidDate(text.to_string());
    let trimmed = text.trim();
    let (date_part, time_part) = match trimmed.find(['T', ' ']) {
        Some(pos) => (&trimmed[..pos], Some(trimmed[pos + 1..].trim())),
        None => (trimmed, None),
    };

    let mut fields = date_part.split(['-', '/']);
    let year: i32 = next_number(&mut fields).ok_or_else(invalid)?;
    let month: u32 = next_number(&mut fields).ok_or_else(invalid)?;
    let day: u32 = next_number(&mut fields).unwrap_or(1);
    if fields.next().is_some() {
        return Err(invalid());
    }
    let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid)?;

    let (mut hour, mut minute, mut second, mut milli) = (0, 0, 0, 0);
    if let Some(time) = time_part.filter(|t| !t.is_empty()) {
        let (clock, fraction) = match time.split_once('.') {
            Some((clock, fraction)) => (clock, Some(fraction)),
            None => (time, None),
        };
        let mut parts = clock.split(':');
        hour = next_number(&mut parts).ok_or_else(invalid)?;
        minute = next_number(&mut parts).unwrap_or(0);
        second = next_number(&mut parts).unwrap_or(0);
        if let Some(fraction) = fraction {
            // Normalise to three digits: ".5" is 500ms.
            let digits: String = fraction.chars().take(3).collect();
            let padded = format!("{digits:0<3}");
            milli = padded.parse().map_err(|_| invalid())?;
        }
    }

    date.and_hms_milli_opt(hour, minute, second, milli)
        .ok_or_else(invalid)
}

fn next_number<'a, T: FromStr>(parts: &mut impl Iterator<Item = &'a str>) -> Option<T> {
    parts.next().and_then(|p| p.trim().parse().ok())
}

/// `floor((a - b) / unit)`.
pub fn diff(a: NaiveDateTime, b: NaiveDateTime, unit: DateUnit) -> i64 {
    (a - b).num_milliseconds().div_euclid(unit.millis())
}

/// Shift `date` by `qty` units. Months and years are calendar-aware and clamp
/// to the last day of shorter months.
pub fn add(date: NaiveDateTime, qty: i64, unit: DateUnit) -> NaiveDateTime {
    match unit {
        DateUnit::Month | DateUnit::Year => {
            let months = if unit == DateUnit::Year { qty * 12 } else { qty };
            let magnitude = Months::new(months.unsigned_abs().min(u32::MAX as u64) as u32);
            let shifted = if months >= 0 {
                date.checked_add_months(magnitude)
            } else {
                date.checked_sub_months(magnitude)
            };
            shifted.unwrap_or(date)
        }
        _ => date
            .checked_add_signed(Duration::milliseconds(qty * unit.millis()))
            .unwrap_or(date),
    }
}

/// Zero every field finer than `unit`.
pub fn start_of(date: NaiveDateTime, unit: DateUnit) -> NaiveDateTime {
    let d = date.date();
    let (year, month, day) = match unit {
        DateUnit::Year => (d.year(), 1, 1),
        DateUnit::Month => (d.year(), d.month(), 1),
        _ => (d.year(), d.month(), d.day()),
    };
    let hour = if unit <= DateUnit::Hour { date.hour() } else { 0 };
    let minute = if unit <= DateUnit::Minute { date.minute() } else { 0 };
    let second = if unit <= DateUnit::Second { date.second() } else { 0 };
    let milli = if unit == DateUnit::Millisecond {
        date.and_utc().timestamp_subsec_millis()
    } else {
        0
    };
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_milli_opt(hour, minute, second, milli))
        .unwrap_or(date)
}

/// Local midnight of the current day.
pub fn today() -> NaiveDateTime {
    start_of(now(), DateUnit::Day)
}

pub fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

// Longest first so "MMMM" is never read as "MM" + "MM".
const TOKENS: [&str; 10] = ["YYYY", "MMMM", "SSS", "MMM", "MM", "DD", "HH", "mm", "ss", "D"];

/// Substitute `YYYY MM DD HH mm ss SSS D MMMM MMM` tokens in `pattern`.
/// Unrecognised characters are copied through.
pub fn format(date: NaiveDateTime, pattern: &str, locale: &str) -> String {
    let months = month_names(locale);
    let month_name = months[date.month0() as usize];
    let mut out = String::with_capacity(pattern.len() + 8);
    let mut rest = pattern;

    while !rest.is_empty() {
        match TOKENS.iter().find(|tok| rest.starts_with(**tok)) {
            Some(tok) => {
                let value = match *tok {
                    "YYYY" => format!("{:04}", date.year()),
                    "MMMM" => month_name.to_string(),
                    "MMM" => month_name.chars().take(3).collect(),
                    "MM" => format!("{:02}", date.month()),
                    "DD" => format!("{:02}", date.day()),
                    "D" => date.day().to_string(),
                    "HH" => format!("{:02}", date.hour()),
                    "mm" => format!("{:02}", date.minute()),
                    "ss" => format!("{:02}", date.second()),
                    _ => format!("{:03}", date.and_utc().timestamp_subsec_millis()),
                };
                out.push_str(&value);
                rest = &rest[tok.len()..];
            }
            None => {
                let mut chars = rest.chars();
                if let Some(c) = chars.next() {
                    out.push(c);
                }
                rest = chars.as_str();
            }
        }
    }
    out
}

const LOCALES: &[(&str, [&str; 12])] = &[
    (
        "en",
        [
            "January", "February", "March", "April", "May", "June", "July", "August",
            "September", "October", "November", "December",
        ],
    ),
    (
        "es",
        [
            "Enero", "Febrero", "Marzo", "Abril", "Mayo", "Junio", "Julio", "Agosto",
            "Septiembre", "Octubre", "Noviembre", "Diciembre",
        ],
    ),
    (
        "fr",
        [
            "Janvier", "Février", "Mars", "Avril", "Mai", "Juin", "Juillet", "Août",
            "Septembre", "Octobre", "Novembre", "Décembre",
        ],
    ),
    (
        "de",
        [
            "Januar", "Februar", "März", "April", "Mai", "Juni", "Juli", "August",
            "September", "Oktober", "November", "Dezember",
        ],
    ),
    (
        "pt-br",
        [
            "Janeiro", "Fevereiro", "Março", "Abril", "Maio", "Junho", "Julho", "Agosto",
            "Setembro", "Outubro", "Novembro", "Dezembro",
        ],
    ),
    (
        "ru",
        [
            "Январь", "Февраль", "Март", "Апрель", "Май", "Июнь", "Июль", "Август",
            "Сентябрь", "Октябрь", "Ноябрь", "Декабрь",
        ],
    ),
    (
        "tr",
        [
            "Ocak", "Şubat", "Mart", "Nisan", "Mayıs", "Haziran", "Temmuz", "Ağustos",
            "Eylül", "Ekim", "Kasım", "Aralık",
        ],
    ),
    (
        "zh",
        [
            "一月", "二月", "三月", "四月", "五月", "六月", "七月", "八月", "九月", "十月",
            "十一月", "十二月",
        ],
    ),
];

/// Month names for a language code; unknown codes fall back to English.
pub fn month_names(locale: &str) -> &'static [&'static str; 12] {
    let code = locale.trim().to_lowercase();
    LOCALES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, names)| names)
        .unwrap_or(&LOCALES[0].1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(s: &str) -> NaiveDateTime {
        parse(s).unwrap()
    }

    #[test]
    fn test_parse_variants() {
        let d = dt("2024-03-05");
        assert_eq!((d.year(), d.month(), d.day(), d.hour()), (2024, 3, 5, 0));

        let d = dt("2024-03-05 08:30:15.250");
        assert_eq!((d.hour(), d.minute(), d.second()), (8, 30, 15));
        assert_eq!(d.and_utc().timestamp_subsec_millis(), 250);

        let d = dt("2024/12/31T23:59");
        assert_eq!((d.month(), d.day(), d.hour(), d.minute()), (12, 31, 23, 59));

        assert!(parse("not a date").is_err());
        assert!(parse("2024-13-01").is_err());
        assert!(parse("2024-01-01T25:00").is_err());
    }

    #[test]
    fn test_diff_floors() {
        let a = dt("2024-01-01 10:00");
        let b = dt("2024-01-01 08:30");
        assert_eq!(diff(a, b, DateUnit::Hour), 1);
        assert_eq!(diff(a, b, DateUnit::Minute), 90);
        assert_eq!(diff(b, a, DateUnit::Hour), -2);
        assert_eq!(diff(dt("2025-02-04"), dt("2024-01-01"), DateUnit::Month), 13);
    }

    #[test]
    fn test_unit_names_pluralise() {
        assert_eq!("day".parse::<DateUnit>().unwrap(), DateUnit::Day);
        assert_eq!("Days".parse::<DateUnit>().unwrap(), DateUnit::Day);
        assert_eq!("minutes".parse::<DateUnit>().unwrap(), DateUnit::Minute);
        assert!("fortnight".parse::<DateUnit>().is_err());
    }

    #[test]
    fn test_add_calendar_units() {
        assert_eq!(add(dt("2024-01-31"), 1, DateUnit::Month), dt("2024-02-29"));
        assert_eq!(add(dt("2024-02-29"), 1, DateUnit::Year), dt("2025-02-28"));
        assert_eq!(add(dt("2024-03-01"), -1, DateUnit::Month), dt("2024-02-01"));
        assert_eq!(add(dt("2024-01-01 23:00"), 2, DateUnit::Hour), dt("2024-01-02 01:00"));
        assert_eq!(add(dt("2024-01-01"), -1, DateUnit::Day), dt("2023-12-31"));
    }

    #[test]
    fn test_start_of() {
        let d = dt("2024-07-19 13:47:22.120");
        assert_eq!(start_of(d, DateUnit::Year), dt("2024-01-01"));
        assert_eq!(start_of(d, DateUnit::Month), dt("2024-07-01"));
        assert_eq!(start_of(d, DateUnit::Day), dt("2024-07-19"));
        assert_eq!(start_of(d, DateUnit::Hour), dt("2024-07-19 13:00"));
        assert_eq!(start_of(d, DateUnit::Minute), dt("2024-07-19 13:47"));
        assert_eq!(start_of(d, DateUnit::Second), dt("2024-07-19 13:47:22"));
        assert_eq!(start_of(d, DateUnit::Millisecond), d);
    }

    #[test]
    fn test_format_tokens() {
        let d = dt("2024-03-05 08:04:09.007");
        assert_eq!(format(d, "YYYY-MM-DD HH:mm:ss.SSS", "en"), "2024-03-05 08:04:09.007");
        assert_eq!(format(d, "D MMMM", "en"), "5 March");
        assert_eq!(format(d, "MMM YYYY", "en"), "Mar 2024");
        assert_eq!(format(d, "D MMMM", "de"), "5 März");
        assert_eq!(format(d, "MMMM", "xx"), "March");
        assert_eq!(format(d, "[W] DD", "en"), "[W] 05");
    }
}
