//! Support and resistance levels from clustered local extrema

use crate::models::candle::Candle;

/// Nearest clustered levels around the current price.
#[derive(Debug, Clone, Copy)]
pub struct SupportResistance {
    pub support: Option<f64>,
    pub resistance: Option<f64>,
}

const PIVOT_SPAN: usize = 2; // 5-bar extrema: 2 on each side
const CLUSTER_TOLERANCE: f64 = 0.005;

/// Finds 5-bar local highs/lows, clusters levels within 0.5% relative
/// distance, and reports the nearest cluster above and below the last
/// close.
pub fn calculate_support_resistance(candles: &[Candle]) -> Option<SupportResistance> {
    if candles.len() < PIVOT_SPAN * 2 + 1 {
        return None;
    }
    let price = candles.last()?.close;

    let mut pivots = Vec::new();
    for i in PIVOT_SPAN..candles.len() - PIVOT_SPAN {
        let window = &candles[i - PIVOT_SPAN..=i + PIVOT_SPAN];
        let high = candles[i].high;
        let low = candles[i].low;
        if window.iter().all(|c| c.high <= high) {
            pivots.push(high);
        }
        if window.iter().all(|c| c.low >= low) {
            pivots.push(low);
        }
    }
    if pivots.is_empty() {
        return None;
    }

    // Cluster pivots within relative tolerance; keep cluster means.
    pivots.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mut clusters: Vec<Vec<f64>> = Vec::new();
    for pivot in pivots {
        match clusters.last_mut() {
            Some(cluster) => {
                let mean = cluster.iter().sum::<f64>() / cluster.len() as f64;
                if (pivot - mean).abs() / mean <= CLUSTER_TOLERANCE {
                    cluster.push(pivot);
                } else {
                    clusters.push(vec![pivot]);
                }
            }
            None => clusters.push(vec![pivot]),
        }
    }
    let levels: Vec<f64> = clusters
        .iter()
        .map(|c| c.iter().sum::<f64>() / c.len() as f64)
        .collect();

    let support = levels
        .iter()
        .filter(|&&l| l < price)
        .copied()
        .fold(None, |best: Option<f64>, l| match best {
            Some(b) if b >= l => Some(b),
            _ => Some(l),
        });
    let resistance = levels.iter().filter(|&&l| l > price).copied().next();

    Some(SupportResistance {
        support,
        resistance,
    })
}
