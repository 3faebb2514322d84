//! Exponential Moving Average.
//!
//! k = 2/(span+1), seeded with the first input, then
//! EMA[i] = x[i]*k + EMA[i-1]*(1-k).
//!
//! Undefined inputs are skipped: the seed is the first defined input and
//! every output before it is undefined. This lets the MACD signal line run
//! over a MACD series directly.

use crate::domain::indicator::{IndicatorSeries, IndicatorType};

pub fn calculate_ema(values: &[f64], span: usize) -> IndicatorSeries {
    let defined: Vec<Option<f64>> = values.iter().copied().map(Some).collect();
    ema_of_optional(&defined, span)
}

pub(crate) fn ema_of_optional(values: &[Option<f64>], span: usize) -> IndicatorSeries {
    let indicator_type = IndicatorType::Ema(span);
    if span == 0 {
        return IndicatorSeries::undefined(indicator_type, values.len());
    }

    let k = 2.0 / (span as f64 + 1.0);
    let mut ema: Option<f64> = None;
    let mut out = Vec::with_capacity(values.len());

    for value in values {
        ema = match (ema, *value) {
            (None, Some(x)) => Some(x),
            (Some(prev), Some(x)) => Some(x * k + prev * (1.0 - k)),
            (prev, None) => prev,
        };
        out.push(if value.is_some() { ema } else { None });
    }

    IndicatorSeries {
        indicator_type,
        values: out,
    }
}
