//! Serde helpers.

use serde::{Deserialize, Deserializer};

/// serde_json writes non-finite floats as `null`; read those back as
/// infinity so an all-win profit factor survives a storage round trip.
pub fn f64_or_infinity<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::INFINITY))
}
