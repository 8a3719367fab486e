//! Backend endpoint paths. The dashboard talks to its own origin; the server
//! forwards everything under [`API_PREFIX`] to the occupancy backend.

use std::borrow::Cow;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::{Deserialize, Serialize};

pub const API_PREFIX: &str = "/api/v1";
pub const MAX_PATH_SEGMENT_LEN: usize = 64;

/// Same unreserved set as `encodeURIComponent`.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Minute,
    Hour,
}

impl Granularity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Minute => "minute",
            Self::Hour => "hour",
        }
    }
}

/// Trims and validates a user-supplied building name or device id before it
/// is spliced into a path or query.
pub fn normalize_segment(raw: &str) -> Result<&str, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err("empty path segment".to_string());
    }
    if trimmed.len() > MAX_PATH_SEGMENT_LEN {
        return Err(format!(
            "path segment longer than {MAX_PATH_SEGMENT_LEN} bytes"
        ));
    }
    if trimmed.chars().any(char::is_control) {
        return Err(format!("invalid character in path segment: {trimmed:?}"));
    }
    // Dot segments survive encoding and would be collapsed by the browser.
    if matches!(trimmed, "." | "..") {
        return Err(format!("invalid path segment: {trimmed:?}"));
    }
    Ok(trimmed)
}

/// Normalizes then percent-encodes a value for a path segment or query value.
pub fn encode_component(raw: &str) -> Result<Cow<'_, str>, String> {
    let trimmed = normalize_segment(raw)?;
    Ok(utf8_percent_encode(trimmed, COMPONENT).into())
}

pub fn campus_path(date: &str, time: &str, granularity: Granularity) -> String {
    format!(
        "{API_PREFIX}/campus/datetime/{date}T{time}/?granularity={}",
        granularity.as_str()
    )
}

pub fn building_path(
    building: &str,
    date: &str,
    time: &str,
    granularity: Granularity,
) -> Result<String, String> {
    let building = encode_component(building)?;
    Ok(format!(
        "{API_PREFIX}/building/{building}/datetime/{date}T{time}/?granularity={}",
        granularity.as_str()
    ))
}

pub fn access_point_path(
    building: &str,
    date: &str,
    time: &str,
    granularity: Granularity,
    floor: u32,
) -> Result<String, String> {
    let building = encode_component(building)?;
    Ok(format!(
        "{API_PREFIX}/building/{building}/datetime/{date}T{time}/access_point/?level={floor}&granularity={}",
        granularity.as_str()
    ))
}

pub fn trajectory_path(device_id: &str, date: &str) -> Result<String, String> {
    let device_id = encode_component(device_id)?;
    Ok(format!("{API_PREFIX}/trajectory/{device_id}/date/{date}/"))
}

pub fn campus_prediction_path(date: &str, time: &str) -> String {
    format!("{API_PREFIX}/predict/campus/datetime/{date}T{time}/")
}

pub fn building_prediction_path(building: &str, date: &str, time: &str) -> Result<String, String> {
    let building = encode_component(building)?;
    Ok(format!(
        "{API_PREFIX}/predict/datetime/{date}T{time}/?building={building}"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn campus_and_prediction_paths_match_backend_routes() {
        assert_eq!(
            campus_path("2021-03-01", "13:00", Granularity::Hour),
            "/api/v1/campus/datetime/2021-03-01T13:00/?granularity=hour"
        );
        assert_eq!(
            campus_prediction_path("2021-03-10", "08:15"),
            "/api/v1/predict/campus/datetime/2021-03-10T08:15/"
        );
    }

    #[test]
    fn building_scoped_paths_embed_trimmed_names() {
        assert_eq!(
            building_path(" LGRT ", "2021-03-01", "09:30", Granularity::Minute).as_deref(),
            Ok("/api/v1/building/LGRT/datetime/2021-03-01T09:30/?granularity=minute")
        );
        assert_eq!(
            access_point_path("LGRT", "2021-03-01", "09:30", Granularity::Hour, 2).as_deref(),
            Ok("/api/v1/building/LGRT/datetime/2021-03-01T09:30/access_point/?level=2&granularity=hour")
        );
        assert_eq!(
            building_prediction_path("ILC", "2021-03-10", "10:00").as_deref(),
            Ok("/api/v1/predict/datetime/2021-03-10T10:00/?building=ILC")
        );
        assert_eq!(
            trajectory_path("Y4kGl.FiowcKk0z8", "2013-11-29").as_deref(),
            Ok("/api/v1/trajectory/Y4kGl.FiowcKk0z8/date/2013-11-29/")
        );
    }

    #[test]
    fn normalize_segment_rejects_invalid_inputs() {
        assert!(normalize_segment("").is_err());
        assert!(normalize_segment("   ").is_err());
        assert!(normalize_segment("tab\there").is_err());
        assert!(normalize_segment("line\nbreak").is_err());
        assert!(normalize_segment("..").is_err());
        assert!(normalize_segment(".").is_err());
        assert!(normalize_segment(&"x".repeat(MAX_PATH_SEGMENT_LEN + 1)).is_err());
        assert_eq!(normalize_segment("Campus Center"), Ok("Campus Center"));
        assert_eq!(normalize_segment("Art & Design"), Ok("Art & Design"));
    }

    #[test]
    fn reserved_characters_are_percent_encoded() {
        assert_eq!(
            building_path("Art & Design", "2021-03-01", "09:30", Granularity::Minute).as_deref(),
            Ok("/api/v1/building/Art%20%26%20Design/datetime/2021-03-01T09:30/?granularity=minute")
        );
        assert_eq!(
            building_path("100% Hall", "2021-03-01", "09:30", Granularity::Hour).as_deref(),
            Ok("/api/v1/building/100%25%20Hall/datetime/2021-03-01T09:30/?granularity=hour")
        );
        assert_eq!(
            building_prediction_path("A+B", "2021-03-10", "10:00").as_deref(),
            Ok("/api/v1/predict/datetime/2021-03-10T10:00/?building=A%2BB")
        );
        assert_eq!(
            building_prediction_path("Campus Center", "2021-03-10", "10:00").as_deref(),
            Ok("/api/v1/predict/datetime/2021-03-10T10:00/?building=Campus%20Center")
        );
        assert_eq!(
            access_point_path("a&level=9", "2021-03-01", "09:30", Granularity::Hour, 1).as_deref(),
            Ok("/api/v1/building/a%26level%3D9/datetime/2021-03-01T09:30/access_point/?level=1&granularity=hour")
        );
    }

    #[test]
    fn device_ids_cannot_escape_their_segment() {
        assert_eq!(
            trajectory_path("../admin", "2013-11-29").as_deref(),
            Ok("/api/v1/trajectory/..%2Fadmin/date/2013-11-29/")
        );
        assert!(trajectory_path("..", "2013-11-29").is_err());
    }
}
