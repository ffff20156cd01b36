//! (Де)сериализация `Duration` в человекочитаемом виде.
//!
//! Принимает целое число миллисекунд или строку с единицей измерения:
//! `"250ms"`, `"5s"`, `"1.5s"`, `"2m"`, `"1h"`. Используется через
//! `#[serde(with = "duration")]`.

use std::{fmt, time::Duration};

use serde::{de, Deserializer, Serializer};

/// Разбирает строку вида `"<число><единица>"`.
pub fn parse(input: &str) -> Result<Duration, String> {
    let s = input.trim();
    if s.is_empty() {
        return Err("empty duration".to_string());
    }

    let split = s
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(s.len());
    let (number, unit) = s.split_at(split);

    let value: f64 = number
        .parse()
        .map_err(|_| format!("invalid duration number in '{input}'"))?;

    let secs = match unit.trim() {
        "" | "ms" => value / 1000.0,
        "s" => value,
        "m" => value * 60.0,
        "h" => value * 3600.0,
        other => return Err(format!("unknown duration unit '{other}' in '{input}'")),
    };

    Duration::try_from_secs_f64(secs).map_err(|e| format!("invalid duration '{input}': {e}"))
}

pub fn serialize<S: Serializer>(
    value: &Duration,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let millis = value.as_millis();
    if millis % 1000 == 0 {
        serializer.serialize_str(&format!("{}s", millis / 1000))
    } else {
        serializer.serialize_str(&format!("{millis}ms"))
    }
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    deserializer.deserialize_any(DurationVisitor)
}

struct DurationVisitor;

impl de::Visitor<'_> for DurationVisitor {
    type Value = Duration;

    fn expecting(
        &self,
        f: &mut fmt::Formatter,
    ) -> fmt::Result {
        f.write_str("milliseconds or a duration string like \"5s\"")
    }

    fn visit_u64<E: de::Error>(
        self,
        v: u64,
    ) -> Result<Duration, E> {
        Ok(Duration::from_millis(v))
    }

    fn visit_i64<E: de::Error>(
        self,
        v: i64,
    ) -> Result<Duration, E> {
        u64::try_from(v)
            .map(Duration::from_millis)
            .map_err(|_| E::custom("duration cannot be negative"))
    }

    fn visit_str<E: de::Error>(
        self,
        v: &str,
    ) -> Result<Duration, E> {
        parse(v).map_err(E::custom)
    }
}
