//! Simple Moving Average.
//!
//! SMA[i] = mean(x[i-n+1..=i]). Warmup: first (n-1) values are undefined.

use crate::domain::indicator::{IndicatorSeries, IndicatorType};

pub fn calculate_sma(values: &[f64], period: usize) -> IndicatorSeries {
    let indicator_type = IndicatorType::Sma(period);
    if period == 0 {
        return IndicatorSeries::undefined(indicator_type, values.len());
    }

    // Windows are summed independently: equal windows yield identical means.
    let out = (0..values.len())
        .map(|i| {
            if i + 1 < period {
                None
            } else {
                let window = &values[i + 1 - period..=i];
                Some(window.iter().sum::<f64>() / period as f64)
            }
        })
        .collect();

    IndicatorSeries {
        indicator_type,
        values: out,
    }
}
