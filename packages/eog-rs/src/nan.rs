//! Serde helpers that keep NaN explicit in JSON.
//!
//! `serde_json` writes NaN as `null`. These helpers write the string
//! `"NaN"` instead and accept a number, `"NaN"` or `null` when reading.
//!
//! ```ignore
//! #[serde(with = "crate::nan")]
//! pub latency_mean: f64,
//! ```

use serde::{Deserialize, Deserializer, Serializer};

pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.is_nan() {
        serializer.serialize_str("NaN")
    } else {
        serializer.serialize_f64(*value)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Repr {
    Number(f64),
    Text(String),
    Null(()),
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    match Repr::deserialize(deserializer)? {
        Repr::Number(value) => Ok(value),
        Repr::Null(()) => Ok(f64::NAN),
        Repr::Text(text) if text.eq_ignore_ascii_case("nan") => Ok(f64::NAN),
        Repr::Text(text) => Err(serde::de::Error::custom(format!(
            "expected a number or \"NaN\", got {text:?}"
        ))),
    }
}

/// The same encoding for string-keyed maps of values.
pub mod map {
    use std::collections::BTreeMap;

    use serde::ser::SerializeMap;
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(serde::Serialize, Deserialize)]
    struct Value(#[serde(with = "super")] f64);

    pub fn serialize<S: Serializer>(
        values: &BTreeMap<String, f64>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(values.len()))?;
        for (key, value) in values {
            map.serialize_entry(key, &Value(*value))?;
        }
        map.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<String, f64>, D::Error> {
        let values = BTreeMap::<String, Value>::deserialize(deserializer)?;
        Ok(values.into_iter().map(|(key, Value(v))| (key, v)).collect())
    }
}
