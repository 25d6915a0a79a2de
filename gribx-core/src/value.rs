//! Axis values and per-axis extraction from decoded records.
//!
//! Every axis of a collection carries values of exactly one [`CoordinateType`].
//! Values are opaque to the index: they only need a total order, equality and
//! a hash. Numeric projections (`as_f64`, `bounds`) exist for axis search and
//! never imply units.

use crate::error::{Error, Result};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

// ============================================================================
// CoordinateType
// ============================================================================

/// Axis type tag.
///
/// Selects the extraction method, the unionizer merge policy and the
/// serialization tag. Discriminants are persisted; do not reorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum CoordinateType {
    Runtime = 0,
    Time = 1,
    TimeInterval = 2,
    Vertical = 3,
    Ensemble = 4,
}

impl CoordinateType {
    pub const ALL: [CoordinateType; 5] = [
        CoordinateType::Runtime,
        CoordinateType::Time,
        CoordinateType::TimeInterval,
        CoordinateType::Vertical,
        CoordinateType::Ensemble,
    ];

    #[inline]
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(CoordinateType::Runtime),
            1 => Some(CoordinateType::Time),
            2 => Some(CoordinateType::TimeInterval),
            3 => Some(CoordinateType::Vertical),
            4 => Some(CoordinateType::Ensemble),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CoordinateType::Runtime => "runtime",
            CoordinateType::Time => "time",
            CoordinateType::TimeInterval => "timeIntv",
            CoordinateType::Vertical => "vert",
            CoordinateType::Ensemble => "ens",
        }
    }

    /// Extract this axis' value from a record.
    ///
    /// Fails with `MissingValue` when the record has nothing for this axis.
    pub fn extract<R: AxisRecord + ?Sized>(self, record: &R) -> Result<AxisValue> {
        let value = match self {
            CoordinateType::Runtime => Some(AxisValue::Runtime(record.runtime())),
            CoordinateType::Time => record.time_offset().map(AxisValue::Time),
            CoordinateType::TimeInterval => record.time_interval().map(AxisValue::TimeInterval),
            CoordinateType::Vertical => record.level().map(AxisValue::Vertical),
            CoordinateType::Ensemble => record.ensemble_member().map(AxisValue::Ensemble),
        };
        value.ok_or_else(|| Error::missing_value(format!("record has no {} value", self.name())))
    }

    /// Parse a textual value for this axis.
    ///
    /// Intervals and layers are written as `a,b`.
    pub fn parse_value(self, s: &str) -> Result<AxisValue> {
        let bad = |what: &str| {
            Error::invalid_value(format!("{} value '{}': {}", self.name(), s, what))
        };
        let s = s.trim();
        match self {
            CoordinateType::Runtime => s
                .parse::<i64>()
                .map(AxisValue::Runtime)
                .map_err(|e| bad(&e.to_string())),
            CoordinateType::Time => s
                .parse::<i64>()
                .map(AxisValue::Time)
                .map_err(|e| bad(&e.to_string())),
            CoordinateType::Ensemble => s
                .parse::<i32>()
                .map(AxisValue::Ensemble)
                .map_err(|e| bad(&e.to_string())),
            CoordinateType::TimeInterval => {
                let (a, b) = s.split_once(',').ok_or_else(|| bad("expected start,end"))?;
                let start = a.trim().parse::<i64>().map_err(|e| bad(&e.to_string()))?;
                let end = b.trim().parse::<i64>().map_err(|e| bad(&e.to_string()))?;
                Ok(AxisValue::TimeInterval(TimeInterval::new(start, end)))
            }
            CoordinateType::Vertical => {
                let level = match s.split_once(',') {
                    Some((a, b)) => Level::layer(
                        a.trim().parse::<f64>().map_err(|e| bad(&e.to_string()))?,
                        b.trim().parse::<f64>().map_err(|e| bad(&e.to_string()))?,
                    ),
                    None => Level::point(s.parse::<f64>().map_err(|e| bad(&e.to_string()))?),
                };
                let value = AxisValue::Vertical(level);
                value.validate()?;
                Ok(value)
            }
        }
    }
}

impl fmt::Display for CoordinateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CoordinateType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "runtime" | "reftime" => Ok(CoordinateType::Runtime),
            "time" => Ok(CoordinateType::Time),
            "timeintv" | "time-interval" | "interval" => Ok(CoordinateType::TimeInterval),
            "vert" | "vertical" | "level" => Ok(CoordinateType::Vertical),
            "ens" | "ensemble" | "member" => Ok(CoordinateType::Ensemble),
            other => Err(Error::invalid_value(format!("unknown coordinate type '{other}'"))),
        }
    }
}

// ============================================================================
// TimeInterval
// ============================================================================

/// Forecast interval `[start, end]` in the collection's time unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimeInterval {
    pub start: i64,
    pub end: i64,
}

impl TimeInterval {
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    pub fn length(&self) -> i64 {
        self.end - self.start
    }
}

impl fmt::Display for TimeInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.start, self.end)
    }
}

// ============================================================================
// Level
// ============================================================================

/// Vertical level: a point (`value2 == None`) or a layer between two values.
///
/// Compared with `f64::total_cmp`. Negative zero is folded into zero at
/// construction so equal levels always hash equally. NaN is representable but
/// rejected by [`AxisValue::validate`] before it reaches an axis.
#[derive(Debug, Clone, Copy)]
pub struct Level {
    value1: f64,
    value2: Option<f64>,
}

#[inline]
fn fold_zero(v: f64) -> f64 {
    if v == 0.0 {
        0.0
    } else {
        v
    }
}

impl Level {
    pub fn point(value: f64) -> Self {
        Self {
            value1: fold_zero(value),
            value2: None,
        }
    }

    pub fn layer(value1: f64, value2: f64) -> Self {
        Self {
            value1: fold_zero(value1),
            value2: Some(fold_zero(value2)),
        }
    }

    #[inline]
    pub fn value1(&self) -> f64 {
        self.value1
    }

    #[inline]
    pub fn value2(&self) -> Option<f64> {
        self.value2
    }

    #[inline]
    pub fn is_layer(&self) -> bool {
        self.value2.is_some()
    }

    pub fn is_nan(&self) -> bool {
        self.value1.is_nan() || self.value2.is_some_and(f64::is_nan)
    }
}

impl PartialEq for Level {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Level {}

impl PartialOrd for Level {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Level {
    fn cmp(&self, other: &Self) -> Ordering {
        self.value1
            .total_cmp(&other.value1)
            .then_with(|| match (self.value2, other.value2) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (Some(a), Some(b)) => a.total_cmp(&b),
            })
    }
}

impl Hash for Level {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value1.to_bits().hash(state);
        self.value2.map(f64::to_bits).hash(state);
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value2 {
            Some(v2) => write!(f, "({},{})", self.value1, v2),
            None => write!(f, "{}", self.value1),
        }
    }
}

// ============================================================================
// AxisValue
// ============================================================================

/// One coordinate value. The variant always matches the owning axis type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AxisValue {
    /// Run (reference) time, epoch milliseconds.
    Runtime(i64),
    /// Forecast offset from the run time.
    Time(i64),
    TimeInterval(TimeInterval),
    Vertical(Level),
    Ensemble(i32),
}

impl AxisValue {
    pub fn coord_type(&self) -> CoordinateType {
        match self {
            AxisValue::Runtime(_) => CoordinateType::Runtime,
            AxisValue::Time(_) => CoordinateType::Time,
            AxisValue::TimeInterval(_) => CoordinateType::TimeInterval,
            AxisValue::Vertical(_) => CoordinateType::Vertical,
            AxisValue::Ensemble(_) => CoordinateType::Ensemble,
        }
    }

    /// Reject values that have no total order on an axis.
    pub fn validate(&self) -> Result<()> {
        match self {
            AxisValue::Vertical(level) if level.is_nan() => {
                Err(Error::invalid_value("NaN vertical level"))
            }
            _ => Ok(()),
        }
    }

    /// True for values that describe a cell rather than a point.
    pub fn is_interval(&self) -> bool {
        match self {
            AxisValue::TimeInterval(_) => true,
            AxisValue::Vertical(level) => level.is_layer(),
            _ => false,
        }
    }

    /// Point projection used by axis search.
    pub fn as_f64(&self) -> f64 {
        match self {
            AxisValue::Runtime(v) | AxisValue::Time(v) => *v as f64,
            AxisValue::Ensemble(v) => *v as f64,
            AxisValue::TimeInterval(tinv) => (tinv.start as f64 + tinv.end as f64) / 2.0,
            AxisValue::Vertical(level) => match level.value2 {
                Some(v2) => (level.value1 + v2) / 2.0,
                None => level.value1,
            },
        }
    }

    /// Cell edges `(edge1, edge2)`; a point is its own cell.
    pub fn bounds(&self) -> (f64, f64) {
        match self {
            AxisValue::TimeInterval(tinv) => (tinv.start as f64, tinv.end as f64),
            AxisValue::Vertical(Level {
                value1,
                value2: Some(v2),
            }) => (*value1, *v2),
            other => {
                let v = other.as_f64();
                (v, v)
            }
        }
    }
}

impl fmt::Display for AxisValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AxisValue::Runtime(v) | AxisValue::Time(v) => write!(f, "{v}"),
            AxisValue::TimeInterval(tinv) => write!(f, "{tinv}"),
            AxisValue::Vertical(level) => write!(f, "{level}"),
            AxisValue::Ensemble(v) => write!(f, "{v}"),
        }
    }
}

// ============================================================================
// AxisRecord
// ============================================================================

/// Per-axis value extraction, implemented by the record decoding layer.
///
/// Implementations must be deterministic and side-effect free. Axes a record
/// does not carry return `None`.
pub trait AxisRecord {
    fn runtime(&self) -> i64;

    fn time_offset(&self) -> Option<i64> {
        None
    }

    fn time_interval(&self) -> Option<TimeInterval> {
        None
    }

    fn level(&self) -> Option<Level> {
        None
    }

    fn ensemble_member(&self) -> Option<i32> {
        None
    }
}

impl<R: AxisRecord + ?Sized> AxisRecord for &R {
    fn runtime(&self) -> i64 {
        (**self).runtime()
    }

    fn time_offset(&self) -> Option<i64> {
        (**self).time_offset()
    }

    fn time_interval(&self) -> Option<TimeInterval> {
        (**self).time_interval()
    }

    fn level(&self) -> Option<Level> {
        (**self).level()
    }

    fn ensemble_member(&self) -> Option<i32> {
        (**self).ensemble_member()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Rec {
        run: i64,
        time: Option<i64>,
    }

    impl AxisRecord for Rec {
        fn runtime(&self) -> i64 {
            self.run
        }

        fn time_offset(&self) -> Option<i64> {
            self.time
        }
    }

    #[test]
    fn test_coordinate_type_tags_round_trip() {
        for t in CoordinateType::ALL {
            assert_eq!(CoordinateType::from_u8(t.as_u8()), Some(t));
            assert_eq!(t.name().parse::<CoordinateType>().unwrap(), t);
        }
        assert_eq!(CoordinateType::from_u8(9), None);
    }

    #[test]
    fn test_extract_dispatches_on_type() {
        let rec = Rec {
            run: 1000,
            time: Some(6),
        };
        assert_eq!(
            CoordinateType::Runtime.extract(&rec).unwrap(),
            AxisValue::Runtime(1000)
        );
        assert_eq!(
            CoordinateType::Time.extract(&rec).unwrap(),
            AxisValue::Time(6)
        );
        assert!(matches!(
            CoordinateType::Vertical.extract(&rec),
            Err(Error::MissingValue(_))
        ));
    }

    #[test]
    fn test_level_negative_zero_equals_zero() {
        let a = AxisValue::Vertical(Level::point(0.0));
        let b = AxisValue::Vertical(Level::point(-0.0));
        assert_eq!(a, b);
        let mut set = rustc_hash::FxHashSet::default();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn test_level_order_points_before_layers() {
        let point = Level::point(500.0);
        let layer = Level::layer(500.0, 400.0);
        assert!(point < layer);
        assert!(Level::point(10.0) < Level::point(20.0));
    }

    #[test]
    fn test_nan_level_rejected() {
        assert!(AxisValue::Vertical(Level::point(f64::NAN)).validate().is_err());
        assert!(AxisValue::Vertical(Level::layer(1.0, f64::NAN))
            .validate()
            .is_err());
        assert!(CoordinateType::Vertical.parse_value("NaN").is_err());
    }

    #[test]
    fn test_parse_value() {
        assert_eq!(
            CoordinateType::TimeInterval.parse_value("0, 6").unwrap(),
            AxisValue::TimeInterval(TimeInterval::new(0, 6))
        );
        assert_eq!(
            CoordinateType::Vertical.parse_value("850").unwrap(),
            AxisValue::Vertical(Level::point(850.0))
        );
        assert!(CoordinateType::Time.parse_value("six").is_err());
    }

    #[test]
    fn test_bounds() {
        assert_eq!(
            AxisValue::TimeInterval(TimeInterval::new(3, 6)).bounds(),
            (3.0, 6.0)
        );
        assert_eq!(AxisValue::Time(12).bounds(), (12.0, 12.0));
        assert_eq!(
            AxisValue::Vertical(Level::layer(1000.0, 850.0)).bounds(),
            (1000.0, 850.0)
        );
    }
}
