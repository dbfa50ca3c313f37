//! Time coordinate decoding
//!
//! Handles numpy `datetime64` arrays and numeric arrays carrying CF
//! `units = "<unit> since <reference>"` attributes.

use crate::errors::{Result, StacGenError};
use crate::zarr_io::{datetime_unit, ArrayMetadata, RawValues, TimeUnit};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Utc};

const SUPPORTED_CALENDARS: [&str; 3] = ["standard", "gregorian", "proleptic_gregorian"];

/// Parsed CF time encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CfTimeUnits {
    pub unit: TimeUnit,
    pub reference: DateTime<Utc>,
}

impl CfTimeUnits {
    pub fn parse(units: &str) -> Option<Self> {
        let (unit, reference) = units.trim().split_once(" since ")?;
        Some(Self {
            unit: TimeUnit::from_cf(unit.trim())?,
            reference: parse_reference(reference)?,
        })
    }
}

/// Reference times with an explicit UTC offset, `T` already replaced by a space
const OFFSET_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f %:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f %z",
    "%Y-%m-%d %H:%M:%S%.f%z",
];

fn parse_reference(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    let spaced = text.replacen('T', " ", 1);
    if let Some(parsed) = OFFSET_FORMATS
        .iter()
        .find_map(|format| DateTime::parse_from_str(&spaced, format).ok())
    {
        return Some(parsed.with_timezone(&Utc));
    }

    let text = ["Z", "UTC", "+00:00", "+0000"]
        .iter()
        .find_map(|suffix| text.strip_suffix(suffix))
        .unwrap_or(text)
        .trim();

    let (date, time) = match text.split_once(['T', ' ']) {
        Some((date, time)) => (date, Some(time.trim())),
        None => (text, None),
    };
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
    let time = match time {
        None | Some("") => NaiveTime::from_hms_opt(0, 0, 0)?,
        Some(t) => NaiveTime::parse_from_str(t, "%H:%M:%S%.f")
            .or_else(|_| NaiveTime::parse_from_str(t, "%H:%M"))
            .ok()?,
    };
    Some(NaiveDateTime::new(date, time).and_utc())
}

/// `DateTime<Utc>::default()` is 1970-01-01T00:00:00Z
fn unix_epoch() -> DateTime<Utc> {
    DateTime::<Utc>::default()
}

/// Decode the valid values of a time array into UTC timestamps.
///
/// Numeric CF times are unpacked with `scale_factor`/`add_offset` before
/// the units are applied.
pub fn decode_times(meta: &ArrayMetadata, raw: &RawValues) -> Result<Vec<DateTime<Utc>>> {
    let fail = |message: String| StacGenError::TimeDecode {
        var: meta.name.clone(),
        message,
    };

    let unpacked;
    let (unit, reference, raw) = match datetime_unit(&meta.dtype) {
        Some(unit) => (unit, unix_epoch(), raw),
        None => {
            let units = meta
                .attr_str("units")
                .ok_or_else(|| fail("numeric time values without 'units' attribute".to_string()))?;
            let cf = CfTimeUnits::parse(units)
                .ok_or_else(|| fail(format!("unrecognised units '{}'", units)))?;
            if let Some(calendar) = meta.attr_str("calendar") {
                if !SUPPORTED_CALENDARS.contains(&calendar.to_ascii_lowercase().as_str()) {
                    return Err(fail(format!("unsupported calendar '{}'", calendar)));
                }
            }
            let raw = match meta.packing() {
                Some((scale, offset)) => {
                    unpacked = RawValues::Float(
                        raw.to_f64().into_iter().map(|v| v * scale + offset).collect(),
                    );
                    &unpacked
                }
                None => raw,
            };
            (cf.unit, cf.reference, raw)
        }
    };

    let offset = |delta: Option<TimeDelta>| {
        delta
            .and_then(|d| reference.checked_add_signed(d))
            .ok_or_else(|| fail("time value out of range".to_string()))
    };

    match raw {
        RawValues::Int(values) => values
            .iter()
            .filter(|&&v| v != i64::MIN)
            .map(|&v| offset(unit.duration(v)))
            .collect(),
        RawValues::Float(values) => values
            .iter()
            .filter(|v| v.is_finite())
            .map(|&v| offset(unit.duration_f64(v)))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn meta(dtype: &str, attrs: serde_json::Value) -> ArrayMetadata {
        let zarray = json!({
            "shape": [2], "chunks": [2], "dtype": dtype,
            "fill_value": null, "compressor": null, "filters": null, "order": "C"
        });
        ArrayMetadata::from_json("time", &zarray, Some(&attrs)).unwrap()
    }

    #[test]
    fn parses_cf_units() {
        let cf = CfTimeUnits::parse("days since 1970-01-01").unwrap();
        assert_eq!(cf.unit, TimeUnit::Days);
        assert_eq!(cf.reference, unix_epoch());

        let cf = CfTimeUnits::parse("hours since 2000-1-1 12:00:00.0 UTC").unwrap();
        assert_eq!(cf.unit, TimeUnit::Hours);
        assert_eq!(cf.reference, Utc.with_ymd_and_hms(2000, 1, 1, 12, 0, 0).unwrap());

        let cf = CfTimeUnits::parse("days since 2000-01-01 00:00:00 +01:00").unwrap();
        assert_eq!(cf.reference, Utc.with_ymd_and_hms(1999, 12, 31, 23, 0, 0).unwrap());

        let cf = CfTimeUnits::parse("seconds since 2000-01-01T06:30:00-0530").unwrap();
        assert_eq!(cf.reference, Utc.with_ymd_and_hms(2000, 1, 1, 12, 0, 0).unwrap());

        assert!(CfTimeUnits::parse("fortnights since 1970-01-01").is_none());
        assert!(CfTimeUnits::parse("days").is_none());
    }

    #[test]
    fn decodes_datetime64() {
        let m = meta("<M8[ns]", json!({}));
        let raw = RawValues::Int(vec![1_672_531_200_000_000_000, i64::MIN]);
        let times = decode_times(&m, &raw).unwrap();
        assert_eq!(times, vec![Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap()]);
    }

    #[test]
    fn decodes_cf_integer_and_float_offsets() {
        let m = meta("<i8", json!({"units": "days since 2023-01-01", "calendar": "proleptic_gregorian"}));
        let times = decode_times(&m, &RawValues::Int(vec![0, 1])).unwrap();
        assert_eq!(times[1], Utc.with_ymd_and_hms(2023, 1, 2, 0, 0, 0).unwrap());

        let m = meta("<f8", json!({"units": "hours since 2023-01-01T00:00:00Z"}));
        let times = decode_times(&m, &RawValues::Float(vec![1.5, f64::NAN])).unwrap();
        assert_eq!(times, vec![Utc.with_ymd_and_hms(2023, 1, 1, 1, 30, 0).unwrap()]);
    }

    #[test]
    fn applies_packing_to_cf_times() {
        let m = meta(
            "<i2",
            json!({"units": "days since 2023-01-01", "scale_factor": 0.5, "add_offset": 10.0}),
        );
        let times = decode_times(&m, &RawValues::Int(vec![0, 4])).unwrap();
        assert_eq!(
            times,
            vec![
                Utc.with_ymd_and_hms(2023, 1, 11, 0, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2023, 1, 13, 0, 0, 0).unwrap(),
            ]
        );
    }

    #[test]
    fn rejects_unsupported_encodings() {
        let m = meta("<i8", json!({}));
        assert!(matches!(
            decode_times(&m, &RawValues::Int(vec![0])),
            Err(StacGenError::TimeDecode { .. })
        ));

        let m = meta("<i8", json!({"units": "days since 2000-01-01", "calendar": "noleap"}));
        let err = decode_times(&m, &RawValues::Int(vec![0])).unwrap_err();
        assert!(err.to_string().contains("noleap"));
    }
}
