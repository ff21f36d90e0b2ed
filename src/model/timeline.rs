use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::calendar::{self, DateUnit};

/// Time granularity of the chart, finest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum ViewMode {
    #[serde(rename = "10Minutes")]
    TenMinutes,
    #[serde(rename = "30Minutes")]
    ThirtyMinutes,
    Hour,
    #[serde(rename = "Quarter Day")]
    QuarterDay,
    #[serde(rename = "Half Day")]
    HalfDay,
    #[default]
    Day,
    Week,
    Month,
    Year,
}

impl ViewMode {
    pub const ALL: [ViewMode; 9] = [
        ViewMode::TenMinutes,
        ViewMode::ThirtyMinutes,
        ViewMode::Hour,
        ViewMode::QuarterDay,
        ViewMode::HalfDay,
        ViewMode::Day,
        ViewMode::Week,
        ViewMode::Month,
        ViewMode::Year,
    ];

    /// `(step_hours, column_width_px)` for this mode.
    pub fn scale(self) -> (f64, f64) {
        match self {
            ViewMode::TenMinutes => (1.0 / 6.0, 38.0),
            ViewMode::ThirtyMinutes => (0.5, 38.0),
            ViewMode::Hour => (1.0, 38.0),
            ViewMode::QuarterDay => (6.0, 38.0),
            ViewMode::HalfDay => (12.0, 38.0),
            ViewMode::Day => (24.0, 38.0),
            ViewMode::Week => (24.0 * 7.0, 140.0),
            ViewMode::Month => (24.0 * 30.0, 120.0),
            ViewMode::Year => (24.0 * 365.0, 120.0),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ViewMode::TenMinutes => "10Minutes",
            ViewMode::ThirtyMinutes => "30Minutes",
            ViewMode::Hour => "Hour",
            ViewMode::QuarterDay => "Quarter Day",
            ViewMode::HalfDay => "Half Day",
            ViewMode::Day => "Day",
            ViewMode::Week => "Week",
            ViewMode::Month => "Month",
            ViewMode::Year => "Year",
        }
    }

    fn is_sub_day(self) -> bool {
        self <= ViewMode::Hour
    }

    /// Coarsest mode that keeps the column count bounded for a data span.
    pub fn pick(start: NaiveDateTime, end: NaiveDateTime) -> ViewMode {
        let months = calendar::diff(end, start, DateUnit::Month);
        let days = calendar::diff(end, start, DateUnit::Day);
        if months > 60 {
            ViewMode::Year
        } else if months > 12 {
            ViewMode::Month
        } else if months > 6 {
            ViewMode::Day
        } else if months > 3 {
            ViewMode::HalfDay
        } else if months > 1 {
            ViewMode::QuarterDay
        } else if days > 7 {
            ViewMode::Hour
        } else if days > 3 {
            ViewMode::ThirtyMinutes
        } else {
            ViewMode::TenMinutes
        }
    }

    /// Pad a data span into axis bounds for this mode.
    pub fn axis_bounds(
        self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> (NaiveDateTime, NaiveDateTime) {
        use calendar::{add, start_of};
        match self {
            m if m.is_sub_day() => (
                start_of(start, DateUnit::Hour) - Duration::hours(1),
                start_of(end, DateUnit::Hour) + Duration::hours(2),
            ),
            ViewMode::QuarterDay | ViewMode::HalfDay => (
                start_of(start, DateUnit::Day) - Duration::days(7),
                start_of(end, DateUnit::Day) + Duration::days(8),
            ),
            ViewMode::Month => (
                start_of(start, DateUnit::Year),
                add(start_of(end, DateUnit::Year), 1, DateUnit::Year),
            ),
            ViewMode::Year => (
                add(start_of(start, DateUnit::Year), -2, DateUnit::Year),
                add(start_of(end, DateUnit::Year), 2, DateUnit::Year),
            ),
            _ => (
                add(start_of(start, DateUnit::Day), -1, DateUnit::Month),
                add(start_of(end, DateUnit::Day), 1, DateUnit::Month),
            ),
        }
    }
}

/// Converts between calendar instants and horizontal pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeScale {
    pub mode: ViewMode,
    pub step_hours: f64,
    pub column_width: f64,
    pub axis_start: NaiveDateTime,
    pub axis_end: NaiveDateTime,
    /// Pixel x of `axis_start`.
    pub offset: f64,
}

impl TimeScale {
    pub fn new(
        mode: ViewMode,
        axis_start: NaiveDateTime,
        axis_end: NaiveDateTime,
        offset: f64,
    ) -> Self {
        let (step_hours, column_width) = mode.scale();
        Self {
            mode,
            step_hours,
            column_width,
            axis_start,
            axis_end: axis_end.max(axis_start),
            offset,
        }
    }

    /// Build a scale whose padded axis covers `data_start..data_end`.
    pub fn covering(
        mode: ViewMode,
        data_start: NaiveDateTime,
        data_end: NaiveDateTime,
        offset: f64,
    ) -> Self {
        let (start, end) = mode.axis_bounds(data_start, data_end);
        Self::new(mode, start, end, offset)
    }

    pub fn step_millis(&self) -> f64 {
        self.step_hours * 3_600_000.0
    }

    pub fn time_to_x(&self, instant: NaiveDateTime) -> f64 {
        let millis = (instant - self.axis_start).num_milliseconds() as f64;
        self.offset + millis / self.step_millis() * self.column_width
    }

    pub fn x_to_time(&self, x: f64) -> NaiveDateTime {
        let millis = ((x - self.offset) / self.column_width * self.step_millis()).round();
        self.axis_start + Duration::milliseconds(millis as i64)
    }

    /// Pixel width of a time span at this scale.
    pub fn span_width(&self, start: NaiveDateTime, end: NaiveDateTime) -> f64 {
        self.time_to_x(end) - self.time_to_x(start)
    }

    /// Grid snapping for drag deltas. Identity: bars follow the pointer.
    pub fn snap(&self, dx: f64) -> f64 {
        dx
    }

    pub fn column_count(&self) -> usize {
        let span = (self.axis_end - self.axis_start).num_milliseconds() as f64;
        (span / self.step_millis()).ceil().max(0.0) as usize
    }

    /// Total pixel width of the grid, including the axis offset.
    pub fn grid_width(&self) -> f64 {
        self.offset + self.column_count() as f64 * self.column_width
    }

    /// Start instant of every column.
    pub fn column_dates(&self) -> impl Iterator<Item = NaiveDateTime> + '_ {
        let step = Duration::milliseconds(self.step_millis().round() as i64);
        (0..self.column_count()).map(move |i| self.axis_start + step * i as i32)
    }

    pub fn contains(&self, instant: NaiveDateTime) -> bool {
        instant >= self.axis_start && instant <= self.axis_end
    }
}
