use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;

// ---------------------------------------------------------------------------
// Service codes
// ---------------------------------------------------------------------------

/// Canonical service codes. Closed set: anything the classifier cannot map
/// onto one of these is excluded from reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ServiceCode {
    #[serde(rename = "RESMD")]
    Resmd,
    #[serde(rename = "ST2MD")]
    St2md,
    #[serde(rename = "ST2PE")]
    St2pe,
    #[serde(rename = "ST2BA")]
    St2ba,
    #[serde(rename = "ST3BA")]
    St3ba,
    #[serde(rename = "ST5BA")]
    St5ba,
    #[serde(rename = "ST10B")]
    St10b,
    #[serde(rename = "MD/PE")]
    MdPe,
    #[serde(rename = "MEDICAMENTOS")]
    Medicamentos,
    #[serde(rename = "MD")]
    Md,
    #[serde(rename = "BA")]
    Ba,
}

impl ServiceCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Resmd => "RESMD",
            Self::St2md => "ST2MD",
            Self::St2pe => "ST2PE",
            Self::St2ba => "ST2BA",
            Self::St3ba => "ST3BA",
            Self::St5ba => "ST5BA",
            Self::St10b => "ST10B",
            Self::MdPe => "MD/PE",
            Self::Medicamentos => "MEDICAMENTOS",
            Self::Md => "MD",
            Self::Ba => "BA",
        }
    }

    /// Parse an already-canonical code, as found in catalog files.
    pub fn parse(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "RESMD" => Some(Self::Resmd),
            "ST2MD" => Some(Self::St2md),
            "ST2PE" => Some(Self::St2pe),
            "ST2BA" => Some(Self::St2ba),
            "ST3BA" => Some(Self::St3ba),
            "ST5BA" => Some(Self::St5ba),
            "ST10B" => Some(Self::St10b),
            "MD/PE" => Some(Self::MdPe),
            "MEDICAMENTOS" => Some(Self::Medicamentos),
            "MD" => Some(Self::Md),
            "BA" => Some(Self::Ba),
            _ => None,
        }
    }
}

impl std::fmt::Display for ServiceCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// One invoiced shipment line, as extracted upstream. Immutable once loaded.
#[derive(Debug, Clone, Serialize)]
pub struct ShipmentLine {
    pub origin: String,
    pub destination: String,
    pub service_label: String,
    pub invoice_date: NaiveDate,
    pub document_id: String,
    pub charged_weight: Option<f64>,
    pub charged_freight_value: Option<f64>,
    pub charged_tariff_rate: Option<f64>,
}

/// Supplementary per-document attributes, bulk-fetched once per batch.
#[derive(Debug, Clone, Default)]
pub struct Supplement {
    pub reference_weight: Option<f64>,
    pub service_label_override: Option<String>,
}

/// Primary catalog record: scalar rate, date-versioned.
#[derive(Debug, Clone)]
pub struct PrimaryRecord {
    pub origin: String,
    pub destination: String,
    pub service: ServiceCode,
    pub rate: f64,
    pub minimum_charge: Option<f64>,
    pub effective_date: NaiveDate,
    pub source_label: String,
}

/// One weight tier inside a Secondary record: the rate that applies from
/// `breakpoint` (inclusive) up to the next breakpoint.
#[derive(Debug, Clone, Copy)]
pub struct WeightTier {
    pub breakpoint: f64,
    pub rate: f64,
}

/// Secondary catalog record: weight-tiered, date-versioned, hard ceiling.
#[derive(Debug, Clone)]
pub struct SecondaryRecord {
    pub origin: String,
    pub destination: String,
    pub service: ServiceCode,
    pub tiers: Vec<WeightTier>,
    pub weight_ceiling: f64,
    pub minimum_charge: Option<f64>,
    pub effective_date: NaiveDate,
    pub source_label: String,
}

/// Tertiary catalog record: flat fallback rate, no date dimension.
#[derive(Debug, Clone)]
pub struct TertiaryRecord {
    pub origin: String,
    pub destination: String,
    pub service: ServiceCode,
    pub rate: f64,
    pub minimum_charge: Option<f64>,
    pub source_label: String,
}

/// Pre-loaded batch: one invoice extract plus the three catalogs and the
/// per-document supplement map.
#[derive(Debug, Default)]
pub struct ReconInput {
    pub shipments: Vec<ShipmentLine>,
    pub primary: Vec<PrimaryRecord>,
    pub secondary: Vec<SecondaryRecord>,
    pub tertiary: Vec<TertiaryRecord>,
    pub supplement: HashMap<String, Supplement>,
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogTier {
    Primary,
    Secondary,
    Tertiary,
}

impl std::fmt::Display for CatalogTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Primary => write!(f, "primary"),
            Self::Secondary => write!(f, "secondary"),
            Self::Tertiary => write!(f, "tertiary"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Found,
    WeightExceeded,
    NoTierFound,
    NotFound,
}

/// A located tariff, with everything cost computation needs.
#[derive(Debug, Clone)]
pub struct TariffMatch {
    pub tier: CatalogTier,
    pub rate: f64,
    pub minimum_charge: Option<f64>,
    pub effective_date: Option<NaiveDate>,
    pub weight_breakpoint: Option<f64>,
    pub reversed_lane: bool,
    pub source_label: String,
}

/// Outcome of the staged catalog search for one line. Exactly one of these
/// is produced per classified shipment line.
#[derive(Debug, Clone)]
pub enum MatchOutcome {
    Found(TariffMatch),
    /// Secondary lane hit, but charged weight exceeds the hard ceiling.
    /// Terminal: does not fall through to the Tertiary catalog.
    WeightExceeded { ceiling: f64, source_label: String },
    /// Secondary lane hit, but no tier qualifies (missing or non-positive
    /// weight). Terminal for the same reason.
    NoTierFound { source_label: String },
    NotFound,
}

impl MatchOutcome {
    pub fn status(&self) -> MatchStatus {
        match self {
            Self::Found(_) => MatchStatus::Found,
            Self::WeightExceeded { .. } => MatchStatus::WeightExceeded,
            Self::NoTierFound { .. } => MatchStatus::NoTierFound,
            Self::NotFound => MatchStatus::NotFound,
        }
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Final status taxonomy. Kept in the original business vocabulary; the
/// export side relies on these exact strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Status {
    #[serde(rename = "FRETE_MINIMO")]
    FreteMinimo,
    #[serde(rename = "DEVOLUCAO")]
    Devolucao,
    #[serde(rename = "PESO_EXCEDENTE")]
    PesoExcedente,
    #[serde(rename = "TARIFA_NAO_LOCALIZADA")]
    TarifaNaoLocalizada,
    #[serde(rename = "DENTRO_DA_TOLERANCIA")]
    DentroDaTolerancia,
    #[serde(rename = "FORA_DA_TOLERANCIA")]
    ForaDaTolerancia,
}

impl Status {
    pub const ALL: [Status; 6] = [
        Status::FreteMinimo,
        Status::Devolucao,
        Status::PesoExcedente,
        Status::TarifaNaoLocalizada,
        Status::DentroDaTolerancia,
        Status::ForaDaTolerancia,
    ];
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FreteMinimo => write!(f, "FRETE MINIMO"),
            Self::Devolucao => write!(f, "DEVOLUCAO"),
            Self::PesoExcedente => write!(f, "PESO EXCEDENTE"),
            Self::TarifaNaoLocalizada => write!(f, "TARIFA NAO LOCALIZADA"),
            Self::DentroDaTolerancia => write!(f, "DENTRO DA TOLERANCIA"),
            Self::ForaDaTolerancia => write!(f, "FORA DA TOLERANCIA"),
        }
    }
}

/// Terminal per-line result: shipment + match metadata + deviations + status.
#[derive(Debug, Clone, Serialize)]
pub struct ReconciledRecord {
    #[serde(flatten)]
    pub line: ShipmentLine,
    pub service_code: ServiceCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_weight: Option<f64>,
    pub match_status: MatchStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog_tier: Option<CatalogTier>,
    pub reversed_lane: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tariff_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight_breakpoint: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_freight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff_freight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff_pct: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff_weight: Option<f64>,
    pub status: Status,
    pub observation: String,
}

/// A line whose service label resolved to no canonical code. Reported in a
/// separate bucket, never reconciled.
#[derive(Debug, Clone, Serialize)]
pub struct UnsupportedLine {
    #[serde(flatten)]
    pub line: ShipmentLine,
    pub reason: String,
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

/// Portfolio KPIs over one reconciled batch.
///
/// Currency subtotals treat missing values as zero; percentage fields stay
/// `None` when undefined instead of collapsing to zero.
#[derive(Debug, Clone, Serialize)]
pub struct KpiSummary {
    pub total_lines: usize,
    pub total_charged: f64,
    pub total_charged_tariffed: f64,
    pub total_expected: f64,
    pub total_diff: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pct_diff: Option<f64>,
    pub total_to_verify: f64,
    pub status_counts: HashMap<String, usize>,
    pub status_charged: HashMap<String, f64>,
    pub unsupported_count: usize,
    pub total_unsupported_charged: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconMeta {
    pub config_name: String,
    pub engine_version: String,
    pub run_at: String,
    pub tolerance_pct: f64,
}

#[derive(Debug, Serialize)]
pub struct ReconcileResult {
    pub meta: ReconMeta,
    pub summary: KpiSummary,
    pub records: Vec<ReconciledRecord>,
    pub unsupported: Vec<UnsupportedLine>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_code_roundtrip() {
        for code in [
            ServiceCode::Resmd,
            ServiceCode::St2md,
            ServiceCode::MdPe,
            ServiceCode::Medicamentos,
            ServiceCode::Ba,
        ] {
            assert_eq!(ServiceCode::parse(code.as_str()), Some(code));
        }
        assert_eq!(ServiceCode::parse("md/pe"), Some(ServiceCode::MdPe));
        assert_eq!(ServiceCode::parse("XYZ"), None);
    }

    #[test]
    fn status_display_uses_business_vocabulary() {
        assert_eq!(Status::TarifaNaoLocalizada.to_string(), "TARIFA NAO LOCALIZADA");
        assert_eq!(Status::FreteMinimo.to_string(), "FRETE MINIMO");
    }
}
