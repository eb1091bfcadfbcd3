//! Slot coordinates: the weekday and the teaching-period number.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use strum::{Display, EnumIter, EnumString};

/// A school day, serialised by its full English name (`"Monday"`).
///
/// The derived ordering follows the calendar week, which is the order
/// conflicts are reported in.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  EnumIter,
)]
#[strum(ascii_case_insensitive)]
pub enum Day {
  Monday,
  Tuesday,
  Wednesday,
  Thursday,
  Friday,
  Saturday,
  Sunday,
}

/// A 1-based teaching-period number.
///
/// On the wire a period is a string-encoded integer (`"3"`); numbers are
/// accepted on input as well.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period(u32);

impl Period {
  /// Returns `None` for 0; periods are numbered from 1.
  pub fn new(n: u32) -> Option<Self> { (n > 0).then_some(Self(n)) }

  pub fn get(self) -> u32 { self.0 }
}

impl fmt::Display for Period {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

impl Serialize for Period {
  fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(&self.0)
  }
}

impl<'de> Deserialize<'de> for Period {
  fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
    struct PeriodVisitor;

    impl de::Visitor<'_> for PeriodVisitor {
      type Value = Period;

      fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a period number (1 or greater) as a string or integer")
      }

      fn visit_u64<E: de::Error>(self, v: u64) -> Result<Period, E> {
        u32::try_from(v)
          .ok()
          .and_then(Period::new)
          .ok_or_else(|| E::custom(format!("invalid period number {v}")))
      }

      fn visit_i64<E: de::Error>(self, v: i64) -> Result<Period, E> {
        u64::try_from(v)
          .map_err(|_| E::custom(format!("invalid period number {v}")))
          .and_then(|v| self.visit_u64(v))
      }

      fn visit_str<E: de::Error>(self, v: &str) -> Result<Period, E> {
        let n: u64 = v
          .trim()
          .parse()
          .map_err(|_| E::custom(format!("invalid period number {v:?}")))?;
        self.visit_u64(n)
      }
    }

    d.deserialize_any(PeriodVisitor)
  }
}

/// A (day, period) coordinate in the timetable grid.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Slot {
  pub day:    Day,
  pub period: Period,
}

impl Slot {
  pub fn new(day: Day, period: Period) -> Self { Self { day, period } }
}

impl fmt::Display for Slot {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} period {}", self.day, self.period)
  }
}

#[cfg(test)]
mod tests {
  use std::str::FromStr;

  use super::*;

  #[test]
  fn period_serialises_as_string() {
    let p = Period::new(3).unwrap();
    assert_eq!(serde_json::to_string(&p).unwrap(), "\"3\"");
  }

  #[test]
  fn period_accepts_string_and_number() {
    let a: Period = serde_json::from_str("\"4\"").unwrap();
    let b: Period = serde_json::from_str("4").unwrap();
    assert_eq!(a, b);
    assert_eq!(a.get(), 4);
  }

  #[test]
  fn period_zero_is_rejected() {
    assert!(serde_json::from_str::<Period>("0").is_err());
    assert!(serde_json::from_str::<Period>("\"0\"").is_err());
    assert!(serde_json::from_str::<Period>("\"third\"").is_err());
  }

  #[test]
  fn day_round_trips_by_name() {
    assert_eq!(serde_json::to_string(&Day::Monday).unwrap(), "\"Monday\"");
    assert_eq!(Day::from_str("wednesday").unwrap(), Day::Wednesday);
    assert_eq!(Day::Friday.to_string(), "Friday");
  }

  #[test]
  fn slots_order_by_week_then_period() {
    let p = |n| Period::new(n).unwrap();
    let mut slots = vec![
      Slot::new(Day::Tuesday, p(1)),
      Slot::new(Day::Monday, p(2)),
      Slot::new(Day::Monday, p(1)),
    ];
    slots.sort();
    assert_eq!(slots[0], Slot::new(Day::Monday, p(1)));
    assert_eq!(slots[2], Slot::new(Day::Tuesday, p(1)));
  }
}
