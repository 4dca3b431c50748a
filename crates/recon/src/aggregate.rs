use std::collections::HashMap;

use crate::model::{KpiSummary, ReconciledRecord, Status, UnsupportedLine};

/// Portfolio KPIs over one reconciled batch.
///
/// "Tariffed" lines are those that ended up inside or outside tolerance;
/// rule-priced and unlocated lines carry no meaningful expected value and
/// are folded into `total_to_verify` instead. Currency sums treat missing
/// values as zero; the aggregate percentage stays `None` when undefined.
pub fn summarize(records: &[ReconciledRecord], unsupported: &[UnsupportedLine]) -> KpiSummary {
    let mut status_counts: HashMap<String, usize> = HashMap::new();
    let mut status_charged: HashMap<String, f64> = HashMap::new();
    for status in Status::ALL {
        status_counts.insert(status.to_string(), 0);
        status_charged.insert(status.to_string(), 0.0);
    }

    let mut total_charged = 0.0;
    let mut total_charged_tariffed = 0.0;
    let mut total_expected = 0.0;

    for rec in records {
        let charged = rec.line.charged_freight_value.unwrap_or(0.0);
        total_charged += charged;

        let key = rec.status.to_string();
        *status_counts.entry(key.clone()).or_default() += 1;
        *status_charged.entry(key).or_default() += charged;

        if matches!(rec.status, Status::DentroDaTolerancia | Status::ForaDaTolerancia) {
            total_charged_tariffed += charged;
            total_expected += rec.expected_freight.unwrap_or(0.0);
        }
    }

    let total_diff = total_charged_tariffed - total_expected;
    let pct_diff = if total_expected != 0.0 {
        Some((total_charged_tariffed / total_expected - 1.0) * 100.0)
    } else if total_diff == 0.0 {
        Some(0.0)
    } else {
        None
    };

    let total_unsupported_charged: f64 = unsupported
        .iter()
        .map(|u| u.line.charged_freight_value.unwrap_or(0.0))
        .sum();

    KpiSummary {
        total_lines: records.len(),
        total_charged,
        total_charged_tariffed,
        total_expected,
        total_diff,
        pct_diff,
        total_to_verify: total_charged - total_charged_tariffed,
        status_counts,
        status_charged,
        unsupported_count: unsupported.len(),
        total_unsupported_charged,
    }
}
