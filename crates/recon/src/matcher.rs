use crate::alias::AliasResolver;
use crate::catalog::{select_effective, TariffCatalogs};
use crate::model::{CatalogTier, MatchOutcome, ServiceCode, ShipmentLine, TariffMatch};

/// Staged tariff search. Tiers are tried in strict priority order and the
/// search stops at the first success:
///
/// 1. Primary, direct lane
/// 2. Primary, reversed lane (return shipment priced by the outbound lane)
/// 3. Secondary (weight-tiered), over the alias fallback keys
/// 4. Tertiary (flat), over the alias fallback keys — only when stage 3
///    found no lane at all
pub struct MatchEngine<'a> {
    catalogs: &'a TariffCatalogs,
    aliases: &'a AliasResolver,
}

impl<'a> MatchEngine<'a> {
    pub fn new(catalogs: &'a TariffCatalogs, aliases: &'a AliasResolver) -> Self {
        Self { catalogs, aliases }
    }

    pub fn locate(&self, line: &ShipmentLine, service: ServiceCode) -> MatchOutcome {
        let (origin, destination) = self.aliases.lane(&line.origin, &line.destination);

        // Stage 1: Primary, direct.
        if let Some(m) = self.primary_lookup(&origin, &destination, service, line, false) {
            return MatchOutcome::Found(m);
        }

        // Stage 2: Primary, reversed (devolution).
        if let Some(m) = self.primary_lookup(&destination, &origin, service, line, true) {
            return MatchOutcome::Found(m);
        }

        // Stage 3: Secondary, weight-tiered, over fallback keys.
        for (o, d) in self.aliases.fallback_lanes(&line.origin, &line.destination) {
            let key = (o, d, service);
            let Some(bucket) = self.catalogs.secondary_bucket(&key) else {
                continue;
            };
            let Some(entry) = select_effective(bucket, |r| r.effective_date, line.invoice_date)
            else {
                continue;
            };

            // A lane association exists: stage 3 is now terminal either way.
            let Some(weight) = line.charged_weight.filter(|w| *w > 0.0) else {
                return MatchOutcome::NoTierFound {
                    source_label: entry.source_label.clone(),
                };
            };
            if weight > entry.weight_ceiling {
                return MatchOutcome::WeightExceeded {
                    ceiling: entry.weight_ceiling,
                    source_label: entry.source_label.clone(),
                };
            }

            // Largest breakpoint <= weight; tiers are sorted ascending.
            let tier = entry
                .tiers
                .iter()
                .filter(|t| t.breakpoint <= weight)
                .last();
            return match tier {
                Some(tier) => MatchOutcome::Found(TariffMatch {
                    tier: CatalogTier::Secondary,
                    rate: tier.rate,
                    minimum_charge: entry.minimum_charge,
                    effective_date: Some(entry.effective_date),
                    weight_breakpoint: Some(tier.breakpoint),
                    reversed_lane: false,
                    source_label: entry.source_label.clone(),
                }),
                None => MatchOutcome::NoTierFound {
                    source_label: entry.source_label.clone(),
                },
            };
        }

        // Stage 4: Tertiary flat fallback, same key order, first hit wins.
        for (o, d) in self.aliases.fallback_lanes(&line.origin, &line.destination) {
            let key = (o, d, service);
            if let Some(bucket) = self.catalogs.tertiary_bucket(&key) {
                if let Some(entry) = bucket.first() {
                    return MatchOutcome::Found(TariffMatch {
                        tier: CatalogTier::Tertiary,
                        rate: entry.rate,
                        minimum_charge: entry.minimum_charge,
                        effective_date: None,
                        weight_breakpoint: None,
                        reversed_lane: false,
                        source_label: entry.source_label.clone(),
                    });
                }
            }
        }

        MatchOutcome::NotFound
    }

    fn primary_lookup(
        &self,
        origin: &str,
        destination: &str,
        service: ServiceCode,
        line: &ShipmentLine,
        reversed: bool,
    ) -> Option<TariffMatch> {
        let key = (origin.to_string(), destination.to_string(), service);
        let bucket = self.catalogs.primary_bucket(&key)?;
        let entry = select_effective(bucket, |r| r.effective_date, line.invoice_date)?;
        Some(TariffMatch {
            tier: CatalogTier::Primary,
            rate: entry.rate,
            minimum_charge: entry.minimum_charge,
            effective_date: Some(entry.effective_date),
            weight_breakpoint: None,
            reversed_lane: reversed,
            source_label: if reversed {
                format!("{} [devolucao]", entry.source_label)
            } else {
                entry.source_label.clone()
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        MatchStatus, PrimaryRecord, SecondaryRecord, TertiaryRecord, WeightTier,
    };
    use chrono::NaiveDate;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn line(origin: &str, dest: &str, date: &str, weight: f64) -> ShipmentLine {
        ShipmentLine {
            origin: origin.into(),
            destination: dest.into(),
            service_label: "RESERVADO MEDS".into(),
            invoice_date: d(date),
            document_id: "957-0001".into(),
            charged_weight: Some(weight),
            charged_freight_value: Some(100.0),
            charged_tariff_rate: None,
        }
    }

    fn primary(origin: &str, dest: &str, rate: f64, date: &str) -> PrimaryRecord {
        PrimaryRecord {
            origin: origin.into(),
            destination: dest.into(),
            service: ServiceCode::Resmd,
            rate,
            minimum_charge: None,
            effective_date: d(date),
            source_label: "bases".into(),
        }
    }

    fn secondary(origin: &str, dest: &str, breakpoints: &[(f64, f64)]) -> SecondaryRecord {
        SecondaryRecord {
            origin: origin.into(),
            destination: dest.into(),
            service: ServiceCode::Resmd,
            tiers: breakpoints
                .iter()
                .map(|(b, r)| WeightTier { breakpoint: *b, rate: *r })
                .collect(),
            weight_ceiling: 30.0,
            minimum_charge: None,
            effective_date: d("2025-01-01"),
            source_label: "estacoes".into(),
        }
    }

    fn tertiary(origin: &str, dest: &str, rate: f64) -> TertiaryRecord {
        TertiaryRecord {
            origin: origin.into(),
            destination: dest.into(),
            service: ServiceCode::Resmd,
            rate,
            minimum_charge: Some(45.0),
            source_label: "flat".into(),
        }
    }

    fn no_aliases() -> AliasResolver {
        AliasResolver::new(&[], "BRASIL")
    }

    struct Fixture {
        catalogs: TariffCatalogs,
        aliases: AliasResolver,
    }

    impl Fixture {
        fn new(
            primary: Vec<PrimaryRecord>,
            secondary: Vec<SecondaryRecord>,
            tertiary: Vec<TertiaryRecord>,
        ) -> Self {
            let aliases = no_aliases();
            let catalogs = TariffCatalogs::index(&primary, &secondary, &tertiary, &aliases);
            Self { catalogs, aliases }
        }

        fn locate(&self, l: &ShipmentLine) -> MatchOutcome {
            MatchEngine::new(&self.catalogs, &self.aliases).locate(l, ServiceCode::Resmd)
        }
    }

    #[test]
    fn stage_priority_primary_wins_over_secondary() {
        let fx = Fixture::new(
            vec![primary("SDU", "AJU", 30.0, "2025-01-01")],
            vec![secondary("SDU", "AJU", &[(0.0, 50.0)])],
            vec![],
        );
        match fx.locate(&line("SDU", "AJU", "2025-04-10", 12.0)) {
            MatchOutcome::Found(m) => {
                assert_eq!(m.tier, CatalogTier::Primary);
                assert!(!m.reversed_lane);
                assert_eq!(m.rate, 30.0);
            }
            other => panic!("expected primary match, got {other:?}"),
        }
    }

    #[test]
    fn reversed_lane_flags_devolution() {
        let fx = Fixture::new(vec![primary("SDU", "AJU", 30.0, "2025-01-01")], vec![], vec![]);
        match fx.locate(&line("AJU", "SDU", "2025-04-10", 12.0)) {
            MatchOutcome::Found(m) => {
                assert_eq!(m.tier, CatalogTier::Primary);
                assert!(m.reversed_lane);
                assert!(m.source_label.ends_with("[devolucao]"));
            }
            other => panic!("expected reversed match, got {other:?}"),
        }
    }

    #[test]
    fn weight_tier_largest_breakpoint_not_exceeding() {
        let tiers = &[(0.0, 90.0), (0.5, 80.0), (1.0, 70.0), (5.0, 60.0), (10.0, 50.0)];
        let fx = Fixture::new(vec![], vec![secondary("SDU", "AJU", tiers)], vec![]);
        match fx.locate(&line("SDU", "AJU", "2025-04-10", 3.2)) {
            MatchOutcome::Found(m) => {
                assert_eq!(m.weight_breakpoint, Some(1.0));
                assert_eq!(m.rate, 70.0);
            }
            other => panic!("expected tier match, got {other:?}"),
        }
    }

    #[test]
    fn weight_ceiling_is_terminal_even_with_tertiary_present() {
        let fx = Fixture::new(
            vec![],
            vec![secondary("SDU", "AJU", &[(0.0, 90.0)])],
            vec![tertiary("SDU", "AJU", 25.0)],
        );
        let outcome = fx.locate(&line("SDU", "AJU", "2025-04-10", 31.0));
        assert_eq!(outcome.status(), MatchStatus::WeightExceeded);
    }

    #[test]
    fn zero_weight_yields_no_tier() {
        let fx = Fixture::new(vec![], vec![secondary("SDU", "AJU", &[(0.0, 90.0)])], vec![]);
        let outcome = fx.locate(&line("SDU", "AJU", "2025-04-10", 0.0));
        assert_eq!(outcome.status(), MatchStatus::NoTierFound);
    }

    #[test]
    fn tertiary_only_when_secondary_has_no_lane() {
        let fx = Fixture::new(vec![], vec![], vec![tertiary("SDU", "AJU", 25.0)]);
        match fx.locate(&line("SDU", "AJU", "2025-04-10", 2.0)) {
            MatchOutcome::Found(m) => {
                assert_eq!(m.tier, CatalogTier::Tertiary);
                assert_eq!(m.minimum_charge, Some(45.0));
                assert_eq!(m.effective_date, None);
            }
            other => panic!("expected tertiary match, got {other:?}"),
        }
    }

    #[test]
    fn nationwide_fallback_keys_in_order() {
        let aliases = AliasResolver::new(&[], "BRASIL");
        let catalogs = TariffCatalogs::index(
            &[],
            &[secondary("BRASIL", "AJU", &[(0.0, 90.0)])],
            &[],
            &aliases,
        );
        let engine = MatchEngine::new(&catalogs, &aliases);
        let outcome = engine.locate(&line("SDU", "AJU", "2025-04-10", 2.0), ServiceCode::Resmd);
        match outcome {
            MatchOutcome::Found(m) => assert_eq!(m.tier, CatalogTier::Secondary),
            other => panic!("expected nationwide-origin match, got {other:?}"),
        }
    }

    #[test]
    fn nothing_anywhere_is_not_found() {
        let fx = Fixture::new(vec![], vec![], vec![]);
        assert_eq!(
            fx.locate(&line("SDU", "AJU", "2025-04-10", 2.0)).status(),
            MatchStatus::NotFound
        );
    }
}
