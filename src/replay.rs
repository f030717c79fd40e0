//! Request replay: regression checks of the region mapper against recorded results.
//!
//! A replay file is comma-separated, one request per row, 14 numeric columns:
//!
//! ```text
//! loc.x, loc.y, scaling, size.x, size.y,
//! req.loc.x, req.loc.y, req.level, req.size.x, req.size.y,
//! frac.x, frac.y, native_size.x, native_size.y
//! ```
//!
//! An optional header line is skipped. Blank lines are ignored.

use serde::Serialize;

use crate::error::ReplayError;
use crate::geom::{FloatPos, IntPos};
use crate::region::{NativeRegion, RegionRequest};

/// Number of columns in a replay row.
pub const REPLAY_COLUMNS: usize = 14;

/// One recorded request and its expected mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayCase {
    /// 1-based line number in the replay file
    pub line: usize,
    pub location: IntPos,
    pub scaling: f64,
    pub size: IntPos,
    pub expected: RegionRequest,
}

/// A request field whose value differs from the recorded one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDiff {
    pub field: &'static str,
    pub expected: f64,
    pub actual: f64,
}

impl FieldDiff {
    pub fn delta(&self) -> f64 {
        self.actual - self.expected
    }
}

/// Parse every row of a replay file.
pub fn parse_cases(text: &str) -> Result<Vec<ReplayCase>, ReplayError> {
    let mut cases = Vec::new();

    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }

        let fields: Vec<&str> = raw.split(',').map(str::trim).collect();
        if cases.is_empty() && is_header(&fields) {
            continue;
        }
        if fields.len() != REPLAY_COLUMNS {
            return Err(ReplayError::ColumnCount {
                line,
                expected: REPLAY_COLUMNS,
                found: fields.len(),
            });
        }

        let mut values = [0.0f64; REPLAY_COLUMNS];
        for (column, (value, field)) in values.iter_mut().zip(&fields).enumerate() {
            *value = field.parse().map_err(|_| ReplayError::Parse {
                line,
                column: column + 1,
                value: field.to_string(),
            })?;
        }

        let ipos = |x: f64, y: f64| IntPos::new(x as i64, y as i64);
        cases.push(ReplayCase {
            line,
            location: ipos(values[0], values[1]),
            scaling: values[2],
            size: ipos(values[3], values[4]),
            expected: RegionRequest {
                location: ipos(values[5], values[6]),
                level: values[7] as usize,
                size: ipos(values[8], values[9]),
                native: NativeRegion {
                    fractional_coordinates: FloatPos::new(values[10], values[11]),
                    native_size: FloatPos::new(values[12], values[13]),
                },
            },
        });
    }

    Ok(cases)
}

fn is_header(fields: &[&str]) -> bool {
    fields
        .first()
        .map_or(false, |first| first.parse::<f64>().is_err())
}

/// Fields of `actual` that differ from `expected` by more than `tolerance`.
pub fn compare(expected: &RegionRequest, actual: &RegionRequest, tolerance: f64) -> Vec<FieldDiff> {
    let pairs = [
        ("location.x", expected.location.x as f64, actual.location.x as f64),
        ("location.y", expected.location.y as f64, actual.location.y as f64),
        ("level", expected.level as f64, actual.level as f64),
        ("size.x", expected.size.x as f64, actual.size.x as f64),
        ("size.y", expected.size.y as f64, actual.size.y as f64),
        (
            "fractional.x",
            expected.native.fractional_coordinates.x,
            actual.native.fractional_coordinates.x,
        ),
        (
            "fractional.y",
            expected.native.fractional_coordinates.y,
            actual.native.fractional_coordinates.y,
        ),
        (
            "native_size.x",
            expected.native.native_size.x,
            actual.native.native_size.x,
        ),
        (
            "native_size.y",
            expected.native.native_size.y,
            actual.native.native_size.y,
        ),
    ];

    pairs
        .into_iter()
        .filter(|(_, e, a)| (a - e).abs() > tolerance)
        .map(|(field, expected, actual)| FieldDiff {
            field,
            expected,
            actual,
        })
        .collect()
}
