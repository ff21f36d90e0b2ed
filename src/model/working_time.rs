//! Working-time calendar: weekend days and daily off-hour windows, plus the
//! duration calculation that honours them.

use chrono::{Datelike, Duration, NaiveDateTime};

use super::calendar::{self, DateUnit};

/// Half-open hour range `[from, to)` within a day, e.g. `20-24`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HourRange {
    pub from: u32,
    pub to: u32,
}

/// Non-working time as configured by the `weekend` and `outofworkingtime`
/// options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkingTime {
    /// Days of week that contribute no duration; 0 = Sunday.
    pub weekend: Vec<u32>,
    pub off_hours: Vec<HourRange>,
}

impl WorkingTime {
    /// Parse the option strings, e.g. `"6,0"` and `"0-4,20-24"`. Malformed
    /// fragments are skipped.
    pub fn parse(weekend: &str, out_of_working_time: &str) -> Self {
        let mut days = Vec::new();
        for part in weekend.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            match part.parse::<u32>() {
                Ok(day) if day < 7 => {
                    if !days.contains(&day) {
                        days.push(day);
                    }
                }
                _ => log::warn!("ignoring weekend entry '{part}'"),
            }
        }

        let mut off_hours = Vec::new();
        for part in out_of_working_time
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
        {
            let range = part.split_once('-').and_then(|(a, b)| {
                let from = a.trim().parse::<u32>().ok()?;
                let to = b.trim().parse::<u32>().ok()?;
                (from < to && to <= 24).then_some(HourRange { from, to })
            });
            match range {
                Some(range) => off_hours.push(range),
                None => log::warn!("ignoring out-of-working-time entry '{part}'"),
            }
        }

        Self {
            weekend: days,
            off_hours,
        }
    }

    pub fn is_weekend(&self, date: NaiveDateTime) -> bool {
        self.weekend
            .contains(&date.weekday().num_days_from_sunday())
    }

    /// Working minutes between `start` and `end`.
    ///
    /// A span inside one calendar day is wall-clock minutes minus overlapping
    /// off-hours. Longer spans are walked day by day; weekend days add
    /// nothing. Never negative.
    pub fn duration_minutes(&self, start: NaiveDateTime, end: NaiveDateTime) -> i64 {
        if end <= start {
            return 0;
        }

        let first_day = calendar::start_of(start, DateUnit::Day);
        if calendar::start_of(end, DateUnit::Day) == first_day
            || end == first_day + Duration::days(1)
        {
            return self.working_minutes_in_day(first_day, start, end).max(0);
        }

        let mut total = 0;
        let mut day = first_day;
        while day < end {
            let next = day + Duration::days(1);
            if !self.is_weekend(day) {
                let from = start.max(day);
                let to = end.min(next);
                total += self.working_minutes_in_day(day, from, to);
            }
            day = next;
        }
        total.max(0)
    }

    fn working_minutes_in_day(
        &self,
        day: NaiveDateTime,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> i64 {
        let mut minutes = (to - from).num_minutes();
        for range in &self.off_hours {
            let off_start = day + Duration::hours(range.from as i64);
            let off_end = day + Duration::hours(range.to as i64);
            let overlap_start = from.max(off_start);
            let overlap_end = to.min(off_end);
            if overlap_end > overlap_start {
                minutes -= (overlap_end - overlap_start).num_minutes();
            }
        }
        minutes
    }
}
