use crate::model::{ShipmentLine, TariffMatch};

/// Deviations for one matched line. Every field is `Option`: a deviation
/// that cannot be computed (missing charged value, missing weight, zero
/// expected) stays `None` and is never reported as a zero difference.
#[derive(Debug, Clone, Default)]
pub struct CostBreakdown {
    pub expected_freight: Option<f64>,
    pub diff_freight: Option<f64>,
    pub diff_rate: Option<f64>,
    pub diff_pct: Option<f64>,
    pub diff_weight: Option<f64>,
}

/// Expected freight and deviations for a line against its located tariff.
///
/// Expected freight is `rate * charged_weight`, lifted to the record's own
/// minimum charge when one exists. Differences whose magnitude falls below
/// `epsilon` collapse to exactly zero so float noise never flags a line.
pub fn compute(line: &ShipmentLine, tariff: &TariffMatch, reference_weight: Option<f64>, epsilon: f64) -> CostBreakdown {
    let weight = line.charged_weight.filter(|w| *w > 0.0);

    let expected_freight = weight.map(|w| {
        let raw = tariff.rate * w;
        match tariff.minimum_charge {
            Some(min) if min > raw => min,
            _ => raw,
        }
    });

    let diff_freight = match (line.charged_freight_value, expected_freight) {
        (Some(charged), Some(expected)) => Some(clamp(charged - expected, epsilon)),
        _ => None,
    };

    // Percentage deviation needs a non-zero expected value; a zero base has
    // no defined percentage, even when the charged side is also zero.
    let diff_pct = match (line.charged_freight_value, expected_freight) {
        (Some(charged), Some(expected)) if expected != 0.0 => {
            Some(clamp((charged / expected - 1.0) * 100.0, epsilon))
        }
        _ => None,
    };

    // Charged per-kg rate: the invoiced rate column when present, otherwise
    // derived from the charged value and weight.
    let charged_rate = line.charged_tariff_rate.or_else(|| {
        match (line.charged_freight_value, weight) {
            (Some(value), Some(w)) => Some(value / w),
            _ => None,
        }
    });
    let diff_rate = charged_rate.map(|r| clamp(r - tariff.rate, epsilon));

    let diff_weight = weight_deviation(line, reference_weight, epsilon);

    CostBreakdown {
        expected_freight,
        diff_freight,
        diff_rate,
        diff_pct,
        diff_weight,
    }
}

/// Weight deviation alone, for lines whose tariff search produced no rate.
/// Same epsilon clamp as the full breakdown.
pub fn weight_deviation(
    line: &ShipmentLine,
    reference_weight: Option<f64>,
    epsilon: f64,
) -> Option<f64> {
    match (line.charged_weight, reference_weight) {
        (Some(charged), Some(reference)) => Some(clamp(charged - reference, epsilon)),
        _ => None,
    }
}

fn clamp(value: f64, epsilon: f64) -> f64 {
    if value.abs() < epsilon {
        0.0
    } else {
        value
    }
}
