//! Volume Profile indicator

use crate::models::candle::Candle;

/// One equal-width price bucket of the profile.
#[derive(Debug, Clone, Copy)]
pub struct VolumeBin {
    /// Bucket midpoint price.
    pub price_level: f64,
    pub volume: f64,
}

#[derive(Debug, Clone)]
pub struct VolumeProfile {
    pub bins: Vec<VolumeBin>,
}

impl VolumeProfile {
    /// Point of control: the bucket with the most traded volume.
    pub fn point_of_control(&self) -> Option<&VolumeBin> {
        self.bins
            .iter()
            .max_by(|a, b| a.volume.partial_cmp(&b.volume).unwrap_or(std::cmp::Ordering::Equal))
    }
}

/// Volume histogram over `bins` equal-width price buckets spanning the
/// window's low-high range. Each candle's volume is attributed to the
/// bucket containing its close.
pub fn calculate_volume_profile(candles: &[Candle], bins: usize) -> Option<VolumeProfile> {
    if candles.is_empty() || bins == 0 {
        return None;
    }

    let low = candles.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);
    let high = candles.iter().map(|c| c.high).fold(f64::NEG_INFINITY, f64::max);
    if high <= low {
        return None;
    }

    let width = (high - low) / bins as f64;
    let mut volumes = vec![0.0; bins];
    for candle in candles {
        let idx = (((candle.close - low) / width) as usize).min(bins - 1);
        volumes[idx] += candle.volume;
    }

    let bins = volumes
        .into_iter()
        .enumerate()
        .map(|(i, volume)| VolumeBin {
            price_level: low + width * (i as f64 + 0.5),
            volume,
        })
        .collect();

    Some(VolumeProfile { bins })
}

/// Volume profile with the default 24 buckets.
pub fn calculate_volume_profile_default(candles: &[Candle]) -> Option<VolumeProfile> {
    calculate_volume_profile(candles, 24)
}
