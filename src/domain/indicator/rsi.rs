//! RSI (Relative Strength Index).
//!
//! delta[t] = x[t] - x[t-1]; gain = max(delta, 0), loss = max(-delta, 0).
//! avg_gain/avg_loss are trailing simple means over `period` deltas.
//!
//! Formula: RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//! If avg_loss == 0 and avg_gain > 0: RSI = 100.
//! If avg_loss == 0 and avg_gain == 0: undefined.
//!
//! Warmup: first `period` values are undefined (the first delta exists at
//! index 1).

use crate::domain::indicator::{IndicatorSeries, IndicatorType};

pub const DEFAULT_PERIOD: usize = 14;

pub fn calculate_rsi(values: &[f64], period: usize) -> IndicatorSeries {
    let indicator_type = IndicatorType::Rsi(period);
    if period == 0 || values.len() < 2 {
        return IndicatorSeries::undefined(indicator_type, values.len());
    }

    let deltas: Vec<f64> = values.windows(2).map(|w| w[1] - w[0]).collect();

    let mut out = Vec::with_capacity(values.len());
    out.push(None);

    for i in 1..values.len() {
        // deltas[i - 1] is the change into bar i.
        if i < period {
            out.push(None);
            continue;
        }
        let window = &deltas[i - period..i];
        let avg_gain = window.iter().map(|d| d.max(0.0)).sum::<f64>() / period as f64;
        let avg_loss = window.iter().map(|d| (-d).max(0.0)).sum::<f64>() / period as f64;
        out.push(rsi_from_averages(avg_gain, avg_loss));
    }

    IndicatorSeries {
        indicator_type,
        values: out,
    }
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> Option<f64> {
    if avg_loss == 0.0 {
        if avg_gain > 0.0 { Some(100.0) } else { None }
    } else {
        Some(100.0 - (100.0 / (1.0 + avg_gain / avg_loss)))
    }
}
