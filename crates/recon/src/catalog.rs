use std::collections::HashMap;

use chrono::NaiveDate;

use crate::alias::AliasResolver;
use crate::model::{PrimaryRecord, SecondaryRecord, ServiceCode, TertiaryRecord, WeightTier};

/// Lane key: collapsed origin, collapsed destination, service code.
pub type LaneKey = (String, String, ServiceCode);

/// Primary bucket entry: one dated rate for a lane.
#[derive(Debug, Clone)]
pub struct PrimaryRate {
    pub rate: f64,
    pub minimum_charge: Option<f64>,
    pub effective_date: NaiveDate,
    pub source_label: String,
}

/// Secondary bucket entry: one dated tier table for a lane.
#[derive(Debug, Clone)]
pub struct SecondaryRate {
    pub tiers: Vec<WeightTier>,
    pub weight_ceiling: f64,
    pub minimum_charge: Option<f64>,
    pub effective_date: NaiveDate,
    pub source_label: String,
}

/// Tertiary bucket entry: one flat rate for a lane, no date dimension.
#[derive(Debug, Clone)]
pub struct TertiaryRate {
    pub rate: f64,
    pub minimum_charge: Option<f64>,
    pub source_label: String,
}

/// The three tariff catalogs, indexed once per run by lane key. Lookup is
/// O(1) average; date and weight selection happen inside the bucket.
pub struct TariffCatalogs {
    primary: HashMap<LaneKey, Vec<PrimaryRate>>,
    secondary: HashMap<LaneKey, Vec<SecondaryRate>>,
    tertiary: HashMap<LaneKey, Vec<TertiaryRate>>,
}

impl TariffCatalogs {
    /// Index the raw catalog record collections. Lane codes are collapsed
    /// through the alias resolver so catalog rows keyed on any member of a
    /// metro group land in the same bucket.
    pub fn index(
        primary: &[PrimaryRecord],
        secondary: &[SecondaryRecord],
        tertiary: &[TertiaryRecord],
        aliases: &AliasResolver,
    ) -> Self {
        let mut p: HashMap<LaneKey, Vec<PrimaryRate>> = HashMap::new();
        for rec in primary {
            let (o, d) = aliases.lane(&rec.origin, &rec.destination);
            p.entry((o, d, rec.service)).or_default().push(PrimaryRate {
                rate: rec.rate,
                minimum_charge: rec.minimum_charge,
                effective_date: rec.effective_date,
                source_label: rec.source_label.clone(),
            });
        }

        let mut s: HashMap<LaneKey, Vec<SecondaryRate>> = HashMap::new();
        for rec in secondary {
            let (o, d) = aliases.lane(&rec.origin, &rec.destination);
            let mut tiers = rec.tiers.clone();
            // Tier selection scans for the largest breakpoint <= weight;
            // keep the table sorted so ties resolve to the first loaded.
            tiers.sort_by(|a, b| a.breakpoint.total_cmp(&b.breakpoint));
            s.entry((o, d, rec.service)).or_default().push(SecondaryRate {
                tiers,
                weight_ceiling: rec.weight_ceiling,
                minimum_charge: rec.minimum_charge,
                effective_date: rec.effective_date,
                source_label: rec.source_label.clone(),
            });
        }

        let mut t: HashMap<LaneKey, Vec<TertiaryRate>> = HashMap::new();
        for rec in tertiary {
            let (o, d) = aliases.lane(&rec.origin, &rec.destination);
            t.entry((o, d, rec.service)).or_default().push(TertiaryRate {
                rate: rec.rate,
                minimum_charge: rec.minimum_charge,
                source_label: rec.source_label.clone(),
            });
        }

        Self { primary: p, secondary: s, tertiary: t }
    }

    pub fn is_empty(&self) -> bool {
        self.primary.is_empty() && self.secondary.is_empty() && self.tertiary.is_empty()
    }

    pub fn primary_bucket(&self, key: &LaneKey) -> Option<&[PrimaryRate]> {
        self.primary.get(key).map(Vec::as_slice)
    }

    pub fn secondary_bucket(&self, key: &LaneKey) -> Option<&[SecondaryRate]> {
        self.secondary.get(key).map(Vec::as_slice)
    }

    pub fn tertiary_bucket(&self, key: &LaneKey) -> Option<&[TertiaryRate]> {
        self.tertiary.get(key).map(Vec::as_slice)
    }
}

/// Date-selection rule shared by the dated catalogs: latest effective date
/// on or before the invoice date; if none, earliest effective date after
/// it. Ties keep the first candidate encountered.
pub fn select_effective<'a, T>(
    candidates: &'a [T],
    effective: impl Fn(&T) -> NaiveDate,
    invoice_date: NaiveDate,
) -> Option<&'a T> {
    let mut best_past: Option<(&T, NaiveDate)> = None;
    let mut best_future: Option<(&T, NaiveDate)> = None;

    for c in candidates {
        let date = effective(c);
        if date <= invoice_date {
            match best_past {
                Some((_, d)) if date <= d => {}
                _ => best_past = Some((c, date)),
            }
        } else {
            match best_future {
                Some((_, d)) if date >= d => {}
                _ => best_future = Some((c, date)),
            }
        }
    }

    best_past.or(best_future).map(|(c, _)| c)
}
