use crate::config::{FloorConfig, FloorMode};
use crate::cost::CostBreakdown;
use crate::model::{MatchOutcome, ShipmentLine, Status};

/// Assigns the final status from the match outcome and computed deviations.
///
/// The rules form an ordered decision list; the first applicable one wins.
/// Minimum-freight and weight-ceiling hits additionally null out the freight
/// deviations: those lines are priced by a rule, not by the located rate,
/// and a zero there would read as "exactly on tariff".
pub struct StatusClassifier {
    floor: FloorConfig,
    tolerance_pct: f64,
}

#[derive(Debug)]
pub struct Classified {
    pub status: Status,
    pub observation: String,
    pub costs: CostBreakdown,
}

impl StatusClassifier {
    pub fn new(floor: FloorConfig, tolerance_pct: f64) -> Self {
        Self { floor, tolerance_pct }
    }

    pub fn classify(
        &self,
        line: &ShipmentLine,
        outcome: &MatchOutcome,
        mut costs: CostBreakdown,
    ) -> Classified {
        match outcome {
            MatchOutcome::Found(tariff) => {
                let floor = match self.floor.mode {
                    FloorMode::Fixed => self.floor.fixed_value,
                    FloorMode::LaneSpecific => {
                        tariff.minimum_charge.unwrap_or(self.floor.fixed_value)
                    }
                };
                if let Some(charged) = line.charged_freight_value {
                    if charged <= floor {
                        null_freight_diffs(&mut costs);
                        return Classified {
                            status: Status::FreteMinimo,
                            observation: format!(
                                "minimum freight applied: charged {charged:.2} <= floor {floor:.2} ({})",
                                tariff.source_label
                            ),
                            costs,
                        };
                    }
                }
                if tariff.reversed_lane {
                    return Classified {
                        status: Status::Devolucao,
                        observation: tariff.source_label.clone(),
                        costs,
                    };
                }
                let status = match costs.diff_pct {
                    Some(pct) if pct.abs() <= self.tolerance_pct => Status::DentroDaTolerancia,
                    _ => Status::ForaDaTolerancia,
                };
                Classified {
                    status,
                    observation: tariff.source_label.clone(),
                    costs,
                }
            }
            MatchOutcome::WeightExceeded { ceiling, source_label } => {
                null_freight_diffs(&mut costs);
                let weight = line.charged_weight.unwrap_or(0.0);
                Classified {
                    status: Status::PesoExcedente,
                    observation: format!(
                        "charged weight {weight:.2} exceeds the {ceiling:.2} ceiling ({source_label})"
                    ),
                    costs,
                }
            }
            MatchOutcome::NoTierFound { source_label } => Classified {
                status: Status::TarifaNaoLocalizada,
                observation: format!("no qualifying weight tier ({source_label})"),
                costs,
            },
            MatchOutcome::NotFound => Classified {
                status: Status::TarifaNaoLocalizada,
                observation: format!("no tariff for ({}, {})", line.origin, line.destination),
                costs,
            },
        }
    }
}

/// The line is priced by a rule rather than the located rate; reporting a
/// freight deviation would be misleading. `diff_weight` is independent of
/// tariff matching and survives.
fn null_freight_diffs(costs: &mut CostBreakdown) {
    costs.expected_freight = None;
    costs.diff_freight = None;
    costs.diff_rate = None;
    costs.diff_pct = None;
}
