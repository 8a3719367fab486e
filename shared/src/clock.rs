use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::api::Granularity;

pub const MINUTES_PER_DAY: u32 = 1440;
pub const HOURS_PER_DAY: u32 = 24;

pub const DEFAULT_OBSERVED_DATE: &str = "2021-03-01";
pub const DEFAULT_PREDICTED_DATE: &str = "2021-03-10";
pub const DEFAULT_TRAJECTORY_DATE: &str = "2013-11-29";

/// `HH:MM` for a minute-of-day.
pub fn format_time(minutes: u32) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

/// `HH:MM:SS` for the time readout next to the slider.
pub fn format_display(minutes: u32) -> String {
    format!("{}:00", format_time(minutes))
}

/// Strict `YYYY-MM-DD` that also names a real calendar day.
pub fn is_valid_date(input: &str) -> bool {
    let bytes = input.as_bytes();
    let shape_ok = bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        });
    shape_ok && NaiveDate::parse_from_str(input, "%Y-%m-%d").is_ok()
}

pub fn resolve_date<'a>(input: &'a str, default: &'a str) -> &'a str {
    let trimmed = input.trim();
    if is_valid_date(trimmed) {
        trimmed
    } else {
        default
    }
}

/// Drops an `am`/`pm` marker and surrounding whitespace.
pub fn clean_time_format(time: &str) -> String {
    let lower = time.to_ascii_lowercase();
    let stripped = match lower.find("am").or_else(|| lower.find("pm")) {
        Some(idx) => format!("{}{}", &time[..idx], &time[idx + 2..]),
        None => time.to_string(),
    };
    stripped.trim().to_string()
}

/// Minute-of-day for `"h:mm am"`, `"h:mm pm"` or 24-hour `"HH:MM"`.
pub fn parse_clock_minutes(time: &str) -> Option<u32> {
    let lower = time.trim().to_ascii_lowercase();
    let meridiem = if lower.contains("pm") {
        Some(true)
    } else if lower.contains("am") {
        Some(false)
    } else {
        None
    };
    let cleaned = clean_time_format(&lower);
    let (h, m) = cleaned.split_once(':')?;
    let hour: u32 = h.trim().parse().ok()?;
    let minute: u32 = m.trim().parse().ok()?;
    if minute >= 60 {
        return None;
    }
    let hour = match meridiem {
        Some(pm) => {
            if hour == 0 || hour > 12 {
                return None;
            }
            match (hour, pm) {
                (12, false) => 0,
                (12, true) => 12,
                (h, true) => h + 12,
                (h, false) => h,
            }
        }
        None if hour < HOURS_PER_DAY => hour,
        None => return None,
    };
    Some(hour * 60 + minute)
}

/// Slider resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ViewMode {
    #[default]
    ByMinute,
    ByHour,
}

impl ViewMode {
    pub fn slider_max(self) -> u32 {
        match self {
            Self::ByMinute => MINUTES_PER_DAY - 1,
            Self::ByHour => HOURS_PER_DAY - 1,
        }
    }

    pub fn granularity(self) -> Granularity {
        match self {
            Self::ByMinute => Granularity::Minute,
            Self::ByHour => Granularity::Hour,
        }
    }

    pub fn slider_to_minutes(self, value: u32) -> u32 {
        let value = value.min(self.slider_max());
        match self {
            Self::ByMinute => value,
            Self::ByHour => value * 60,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::ByMinute => Self::ByHour,
            Self::ByHour => Self::ByMinute,
        }
    }

    /// Label of the button that switches away from this mode.
    pub fn toggle_label(self) -> &'static str {
        match self {
            Self::ByMinute => "View by Hour",
            Self::ByHour => "View by Minute",
        }
    }

    pub fn advance(self, value: u32) -> u32 {
        (value + 1) % (self.slider_max() + 1)
    }
}

/// Remembers slider positions across view-mode switches so that returning
/// to by-minute keeps the minute within the hour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SliderMemory {
    last_minute: u32,
    last_hour: u32,
}

impl SliderMemory {
    /// Returns the slider value for the mode `from.toggled()`.
    pub fn toggle(&mut self, from: ViewMode, value: u32) -> u32 {
        match from {
            ViewMode::ByMinute => {
                self.last_minute = value.min(ViewMode::ByMinute.slider_max());
                self.last_minute / 60
            }
            ViewMode::ByHour => {
                self.last_hour = value.min(ViewMode::ByHour.slider_max());
                self.last_hour * 60 + self.last_minute % 60
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_minutes_of_day() {
        assert_eq!(format_time(0), "00:00");
        assert_eq!(format_time(785), "13:05");
        assert_eq!(format_time(1439), "23:59");
        assert_eq!(format_display(785), "13:05:00");
    }

    #[test]
    fn date_validation_checks_shape_and_calendar() {
        assert!(is_valid_date("2021-03-01"));
        assert!(is_valid_date("2020-02-29"));
        assert!(!is_valid_date("2021-02-29"));
        assert!(!is_valid_date("2021-13-01"));
        assert!(!is_valid_date("2021-3-1"));
        assert!(!is_valid_date("20210301"));
        assert!(!is_valid_date(""));
    }

    #[test]
    fn resolve_date_falls_back_to_default() {
        assert_eq!(resolve_date("2021-03-05", DEFAULT_OBSERVED_DATE), "2021-03-05");
        assert_eq!(resolve_date(" 2021-03-05 ", DEFAULT_OBSERVED_DATE), "2021-03-05");
        assert_eq!(resolve_date("March 5", DEFAULT_OBSERVED_DATE), DEFAULT_OBSERVED_DATE);
    }

    #[test]
    fn clean_time_format_strips_meridiem() {
        assert_eq!(clean_time_format("1:05 pm"), "1:05");
        assert_eq!(clean_time_format("11:30 AM"), "11:30");
        assert_eq!(clean_time_format("13:05"), "13:05");
    }

    #[test]
    fn parse_clock_minutes_understands_twelve_hour_clock() {
        assert_eq!(parse_clock_minutes("1:05 pm"), Some(785));
        assert_eq!(parse_clock_minutes("12:00 am"), Some(0));
        assert_eq!(parse_clock_minutes("12:30 pm"), Some(750));
        assert_eq!(parse_clock_minutes("9:15 am"), Some(555));
        assert_eq!(parse_clock_minutes("13:05"), Some(785));
        assert_eq!(parse_clock_minutes("13:05 pm"), None);
        assert_eq!(parse_clock_minutes("9:75 am"), None);
        assert_eq!(parse_clock_minutes("noon"), None);
    }

    #[test]
    fn view_mode_slider_bounds_and_wrap() {
        assert_eq!(ViewMode::ByMinute.slider_max(), 1439);
        assert_eq!(ViewMode::ByHour.slider_max(), 23);
        assert_eq!(ViewMode::ByMinute.advance(1439), 0);
        assert_eq!(ViewMode::ByHour.advance(23), 0);
        assert_eq!(ViewMode::ByHour.advance(5), 6);
        assert_eq!(ViewMode::ByHour.slider_to_minutes(13), 780);
        assert_eq!(ViewMode::ByHour.granularity().as_str(), "hour");
    }

    #[test]
    fn slider_memory_restores_minute_within_hour() {
        let mut memory = SliderMemory::default();
        let hour = memory.toggle(ViewMode::ByMinute, 605);
        assert_eq!(hour, 10);
        let minute = memory.toggle(ViewMode::ByHour, 14);
        assert_eq!(minute, 14 * 60 + 5);
    }
}
