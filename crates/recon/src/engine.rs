use crate::aggregate::summarize;
use crate::alias::AliasResolver;
use crate::catalog::TariffCatalogs;
use crate::classify::StatusClassifier;
use crate::config::ReconConfig;
use crate::cost::{self, CostBreakdown};
use crate::error::ReconError;
use crate::matcher::MatchEngine;
use crate::model::{
    MatchOutcome, PrimaryRecord, ReconInput, ReconMeta, ReconcileResult, ReconciledRecord,
    SecondaryRecord, ServiceCode, ShipmentLine, Supplement, TertiaryRecord, UnsupportedLine,
    WeightTier,
};
use crate::service::ServiceClassifier;

/// Run one reconciliation batch per config. Returns per-line records, the
/// unsupported bucket, and the KPI summary.
pub fn run(config: &ReconConfig, input: &ReconInput) -> Result<ReconcileResult, ReconError> {
    let aliases = AliasResolver::new(&config.aliases, &config.nationwide_token);
    let catalogs = TariffCatalogs::index(&input.primary, &input.secondary, &input.tertiary, &aliases);
    if catalogs.is_empty() {
        return Err(ReconError::EmptyCatalog);
    }

    let services = ServiceClassifier::new();
    let matcher = MatchEngine::new(&catalogs, &aliases);
    let statuses = StatusClassifier::new(config.minimum_floor.clone(), config.tolerance_pct);

    let mut records = Vec::with_capacity(input.shipments.len());
    let mut unsupported = Vec::new();

    for line in &input.shipments {
        let supplement = input.supplement.get(&line.document_id);
        let reference_weight = supplement.and_then(|s| s.reference_weight);
        let label = supplement
            .and_then(|s| s.service_label_override.as_deref())
            .unwrap_or(&line.service_label);

        let Some(service) = services.classify(label) else {
            unsupported.push(UnsupportedLine {
                line: line.clone(),
                reason: format!("unrecognized service label '{label}'"),
            });
            continue;
        };

        let outcome = matcher.locate(line, service);
        let costs = match &outcome {
            MatchOutcome::Found(tariff) => {
                cost::compute(line, tariff, reference_weight, config.epsilon)
            }
            // Weight deviation does not depend on the tariff search.
            _ => CostBreakdown {
                diff_weight: cost::weight_deviation(line, reference_weight, config.epsilon),
                ..CostBreakdown::default()
            },
        };
        let classified = statuses.classify(line, &outcome, costs);

        let (catalog_tier, tariff_rate, weight_breakpoint, reversed_lane, source_label) =
            match &outcome {
                MatchOutcome::Found(m) => (
                    Some(m.tier),
                    Some(m.rate),
                    m.weight_breakpoint,
                    m.reversed_lane,
                    Some(m.source_label.clone()),
                ),
                MatchOutcome::WeightExceeded { source_label, .. }
                | MatchOutcome::NoTierFound { source_label } => {
                    (None, None, None, false, Some(source_label.clone()))
                }
                MatchOutcome::NotFound => (None, None, None, false, None),
            };

        records.push(ReconciledRecord {
            line: line.clone(),
            service_code: service,
            reference_weight,
            match_status: outcome.status(),
            catalog_tier,
            reversed_lane,
            tariff_rate,
            weight_breakpoint,
            source_label,
            expected_freight: classified.costs.expected_freight,
            diff_freight: classified.costs.diff_freight,
            diff_rate: classified.costs.diff_rate,
            diff_pct: classified.costs.diff_pct,
            diff_weight: classified.costs.diff_weight,
            status: classified.status,
            observation: classified.observation,
        });
    }

    let summary = summarize(&records, &unsupported);

    Ok(ReconcileResult {
        meta: ReconMeta {
            config_name: config.name.clone(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
            tolerance_pct: config.tolerance_pct,
        },
        summary,
        records,
        unsupported,
    })
}

// ---------------------------------------------------------------------------
// CSV loaders
// ---------------------------------------------------------------------------

/// Load invoiced shipment lines. `invoice_date` is structural: a line whose
/// date cannot be parsed aborts the load. Numeric cells parse leniently and
/// fall back to missing.
pub fn load_shipment_rows(file: &str, csv_data: &str) -> Result<Vec<ShipmentLine>, ReconError> {
    let mut reader = reader(csv_data);
    let headers = header_row(file, &mut reader)?;

    let origin_idx = column(file, &headers, "origin")?;
    let destination_idx = column(file, &headers, "destination")?;
    let service_idx = column(file, &headers, "service")?;
    let date_idx = column(file, &headers, "invoice_date")?;
    let document_idx = column(file, &headers, "document_id")?;
    let weight_idx = column(file, &headers, "weight")?;
    let value_idx = column(file, &headers, "freight_value")?;
    let rate_idx = headers.iter().position(|h| h == "tariff_rate");

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| ReconError::Io(e.to_string()))?;
        let document_id = record.get(document_idx).unwrap_or("").trim().to_string();
        let invoice_date = parse_date(file, &document_id, record.get(date_idx).unwrap_or(""))?;
        rows.push(ShipmentLine {
            origin: record.get(origin_idx).unwrap_or("").trim().to_string(),
            destination: record.get(destination_idx).unwrap_or("").trim().to_string(),
            service_label: record.get(service_idx).unwrap_or("").trim().to_string(),
            invoice_date,
            document_id,
            charged_weight: parse_number(record.get(weight_idx).unwrap_or("")),
            charged_freight_value: parse_number(record.get(value_idx).unwrap_or("")),
            charged_tariff_rate: rate_idx.and_then(|i| parse_number(record.get(i).unwrap_or(""))),
        });
    }
    Ok(rows)
}

/// Load the dated Primary catalog. Rows whose service code is outside the
/// canonical set are skipped; they can never match a classified line.
pub fn load_primary_catalog(file: &str, csv_data: &str) -> Result<Vec<PrimaryRecord>, ReconError> {
    let mut reader = reader(csv_data);
    let headers = header_row(file, &mut reader)?;

    let origin_idx = column(file, &headers, "origin")?;
    let destination_idx = column(file, &headers, "destination")?;
    let service_idx = column(file, &headers, "service")?;
    let rate_idx = column(file, &headers, "rate")?;
    let date_idx = column(file, &headers, "effective_date")?;
    let minimum_idx = headers.iter().position(|h| h == "minimum_charge");

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| ReconError::Io(e.to_string()))?;
        let Some(service) = ServiceCode::parse(record.get(service_idx).unwrap_or("")) else {
            continue;
        };
        let Some(rate) = parse_number(record.get(rate_idx).unwrap_or("")) else {
            continue;
        };
        let lane = format!(
            "{}-{}",
            record.get(origin_idx).unwrap_or("").trim(),
            record.get(destination_idx).unwrap_or("").trim()
        );
        rows.push(PrimaryRecord {
            origin: record.get(origin_idx).unwrap_or("").trim().to_string(),
            destination: record.get(destination_idx).unwrap_or("").trim().to_string(),
            service,
            rate,
            minimum_charge: minimum_idx.and_then(|i| parse_number(record.get(i).unwrap_or(""))),
            effective_date: parse_date(file, &lane, record.get(date_idx).unwrap_or(""))?,
            source_label: format!("{file} {service}"),
        });
    }
    Ok(rows)
}

/// Load the weight-tiered Secondary catalog. Tier columns are recognized by
/// their breakpoint headers: `0+`, `0p5+`, `1+`, ... (`p` encodes the
/// decimal point). The highest breakpoint does not bound the record; the
/// explicit `weight_ceiling` column does.
pub fn load_secondary_catalog(
    file: &str,
    csv_data: &str,
) -> Result<Vec<SecondaryRecord>, ReconError> {
    let mut reader = reader(csv_data);
    let headers = header_row(file, &mut reader)?;

    let origin_idx = column(file, &headers, "origin")?;
    let destination_idx = column(file, &headers, "destination")?;
    let service_idx = column(file, &headers, "service")?;
    let date_idx = column(file, &headers, "effective_date")?;
    let ceiling_idx = column(file, &headers, "weight_ceiling")?;
    let minimum_idx = headers.iter().position(|h| h == "minimum_charge");

    let tier_columns: Vec<(usize, f64)> = headers
        .iter()
        .enumerate()
        .filter_map(|(i, h)| parse_tier_header(h).map(|b| (i, b)))
        .collect();
    if tier_columns.is_empty() {
        return Err(ReconError::MissingColumn {
            file: file.into(),
            column: "<weight tier, e.g. '0+'>".into(),
        });
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| ReconError::Io(e.to_string()))?;
        let Some(service) = ServiceCode::parse(record.get(service_idx).unwrap_or("")) else {
            continue;
        };
        let Some(weight_ceiling) = parse_number(record.get(ceiling_idx).unwrap_or("")) else {
            continue;
        };
        let tiers: Vec<WeightTier> = tier_columns
            .iter()
            .filter_map(|(i, breakpoint)| {
                parse_number(record.get(*i).unwrap_or("")).map(|rate| WeightTier {
                    breakpoint: *breakpoint,
                    rate,
                })
            })
            .collect();
        if tiers.is_empty() {
            continue;
        }
        let lane = format!(
            "{}-{}",
            record.get(origin_idx).unwrap_or("").trim(),
            record.get(destination_idx).unwrap_or("").trim()
        );
        rows.push(SecondaryRecord {
            origin: record.get(origin_idx).unwrap_or("").trim().to_string(),
            destination: record.get(destination_idx).unwrap_or("").trim().to_string(),
            service,
            tiers,
            weight_ceiling,
            minimum_charge: minimum_idx.and_then(|i| parse_number(record.get(i).unwrap_or(""))),
            effective_date: parse_date(file, &lane, record.get(date_idx).unwrap_or(""))?,
            source_label: format!("{file} {service}"),
        });
    }
    Ok(rows)
}

/// Load the flat Tertiary catalog.
pub fn load_tertiary_catalog(
    file: &str,
    csv_data: &str,
) -> Result<Vec<TertiaryRecord>, ReconError> {
    let mut reader = reader(csv_data);
    let headers = header_row(file, &mut reader)?;

    let origin_idx = column(file, &headers, "origin")?;
    let destination_idx = column(file, &headers, "destination")?;
    let service_idx = column(file, &headers, "service")?;
    let rate_idx = column(file, &headers, "rate")?;
    let minimum_idx = headers.iter().position(|h| h == "minimum_charge");

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| ReconError::Io(e.to_string()))?;
        let Some(service) = ServiceCode::parse(record.get(service_idx).unwrap_or("")) else {
            continue;
        };
        let Some(rate) = parse_number(record.get(rate_idx).unwrap_or("")) else {
            continue;
        };
        rows.push(TertiaryRecord {
            origin: record.get(origin_idx).unwrap_or("").trim().to_string(),
            destination: record.get(destination_idx).unwrap_or("").trim().to_string(),
            service,
            rate,
            minimum_charge: minimum_idx.and_then(|i| parse_number(record.get(i).unwrap_or(""))),
            source_label: format!("{file} {service}"),
        });
    }
    Ok(rows)
}

/// Load per-document supplementary attributes, keyed by document id. Later
/// rows for the same document win.
pub fn load_supplement(
    file: &str,
    csv_data: &str,
) -> Result<std::collections::HashMap<String, Supplement>, ReconError> {
    let mut reader = reader(csv_data);
    let headers = header_row(file, &mut reader)?;

    let document_idx = column(file, &headers, "document_id")?;
    let weight_idx = headers.iter().position(|h| h == "reference_weight");
    let service_idx = headers.iter().position(|h| h == "service");

    let mut map = std::collections::HashMap::new();
    for record in reader.records() {
        let record = record.map_err(|e| ReconError::Io(e.to_string()))?;
        let document_id = record.get(document_idx).unwrap_or("").trim().to_string();
        if document_id.is_empty() {
            continue;
        }
        map.insert(
            document_id,
            Supplement {
                reference_weight: weight_idx
                    .and_then(|i| parse_number(record.get(i).unwrap_or(""))),
                service_label_override: service_idx
                    .map(|i| record.get(i).unwrap_or("").trim())
                    .filter(|s| !s.is_empty())
                    .map(str::to_string),
            },
        );
    }
    Ok(map)
}

// ---------------------------------------------------------------------------
// Parsing helpers
// ---------------------------------------------------------------------------

fn reader(csv_data: &str) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(csv_data.as_bytes())
}

fn header_row(file: &str, reader: &mut csv::Reader<&[u8]>) -> Result<Vec<String>, ReconError> {
    Ok(reader
        .headers()
        .map_err(|e| ReconError::Io(format!("{file}: {e}")))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect())
}

fn column(file: &str, headers: &[String], name: &str) -> Result<usize, ReconError> {
    headers
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| ReconError::MissingColumn {
            file: file.into(),
            column: name.into(),
        })
}

fn parse_date(file: &str, record: &str, value: &str) -> Result<chrono::NaiveDate, ReconError> {
    chrono::NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        ReconError::DateParse {
            file: file.into(),
            record: record.into(),
            value: value.into(),
        }
    })
}

/// Lenient numeric cell parse: trims, strips thousands commas, treats empty
/// and non-numeric cells as missing rather than failing the load.
///
/// Commas are accepted only as valid thousands grouping (`1,234.50`). A
/// decimal-comma cell like `450,00` is ambiguous between locales and is
/// coerced to missing, never reinterpreted as 45000.
fn parse_number(value: &str) -> Option<f64> {
    let value = value.trim();
    if value.is_empty() || value == "-" {
        return None;
    }
    if !value.contains(',') {
        return value.parse().ok();
    }

    let (int_part, frac_part) = match value.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (value, None),
    };
    if frac_part.is_some_and(|f| f.contains(',')) {
        return None;
    }
    let digits = int_part.strip_prefix('-').unwrap_or(int_part);
    let groups: Vec<&str> = digits.split(',').collect();
    let grouped = groups.len() >= 2
        && (1..=3).contains(&groups[0].len())
        && groups[0].chars().all(|c| c.is_ascii_digit())
        && groups[1..]
            .iter()
            .all(|g| g.len() == 3 && g.chars().all(|c| c.is_ascii_digit()));
    if !grouped {
        return None;
    }
    value.replace(',', "").parse().ok()
}

/// Weight-tier column header: breakpoint followed by `+`, with `p` standing
/// in for the decimal point (`0p5+` is 0.5).
fn parse_tier_header(header: &str) -> Option<f64> {
    let body = header.trim().strip_suffix('+')?;
    let body = body.replace('p', ".");
    body.parse().ok().filter(|b: &f64| *b >= 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_number_lenient() {
        assert_eq!(parse_number("12.5"), Some(12.5));
        assert_eq!(parse_number(" 1,234.50 "), Some(1234.5));
        assert_eq!(parse_number("12,345,678"), Some(12345678.0));
        assert_eq!(parse_number("-1,234"), Some(-1234.0));
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("-"), None);
        assert_eq!(parse_number("n/a"), None);
    }

    #[test]
    fn parse_number_rejects_decimal_comma() {
        // Ambiguous locale forms never reinterpret as a 100x value.
        assert_eq!(parse_number("450,00"), None);
        assert_eq!(parse_number("1,5"), None);
        assert_eq!(parse_number("1,2345"), None);
        assert_eq!(parse_number("1.234,50"), None);
        assert_eq!(parse_number(",500"), None);
    }

    #[test]
    fn parse_tier_headers() {
        assert_eq!(parse_tier_header("0+"), Some(0.0));
        assert_eq!(parse_tier_header("0p5+"), Some(0.5));
        assert_eq!(parse_tier_header("10+"), Some(10.0));
        assert_eq!(parse_tier_header("weight_ceiling"), None);
        assert_eq!(parse_tier_header("origin"), None);
    }

    #[test]
    fn load_shipments_basic() {
        let csv = "\
origin,destination,service,invoice_date,document_id,weight,freight_value,tariff_rate
SDU,AJU,RESERVADO MEDS,2025-04-10,957-0001,12.0,450.00,
GRU,AJU,VELOZ,2025-04-11,957-0002,,80.00,10.0
";
        let rows = load_shipment_rows("invoice.csv", csv).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].charged_weight, Some(12.0));
        assert_eq!(rows[0].charged_tariff_rate, None);
        assert_eq!(rows[1].charged_weight, None);
        assert_eq!(rows[1].charged_tariff_rate, Some(10.0));
    }

    #[test]
    fn load_shipments_bad_date_is_structural() {
        let csv = "\
origin,destination,service,invoice_date,document_id,weight,freight_value
SDU,AJU,RESMD,10/04/2025,957-0001,12.0,450.00
";
        let err = load_shipment_rows("invoice.csv", csv).unwrap_err();
        assert!(matches!(err, ReconError::DateParse { .. }));
    }

    #[test]
    fn load_shipments_missing_column() {
        let csv = "origin,destination,invoice_date,document_id,weight,freight_value\n";
        let err = load_shipment_rows("invoice.csv", csv).unwrap_err();
        match err {
            ReconError::MissingColumn { column, .. } => assert_eq!(column, "service"),
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn load_primary_skips_unknown_services() {
        let csv = "\
origin,destination,service,rate,minimum_charge,effective_date
SDU,AJU,RESMD,30.0,60.0,2025-01-01
SDU,AJU,VELOZ,99.0,,2025-01-01
";
        let rows = load_primary_catalog("bases", csv).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].service, ServiceCode::Resmd);
        assert_eq!(rows[0].minimum_charge, Some(60.0));
        assert_eq!(rows[0].source_label, "bases RESMD");
    }

    #[test]
    fn load_secondary_parses_tier_columns() {
        let csv = "\
origin,destination,service,effective_date,weight_ceiling,minimum_charge,0+,0p5+,1+,5+,10+
BRASIL,AJU,RESMD,2025-01-01,30,60.0,90,80,70,60,50
";
        let rows = load_secondary_catalog("estacoes", csv).unwrap();
        assert_eq!(rows.len(), 1);
        let rec = &rows[0];
        assert_eq!(rec.weight_ceiling, 30.0);
        assert_eq!(rec.tiers.len(), 5);
        assert_eq!(rec.tiers[1].breakpoint, 0.5);
        assert_eq!(rec.tiers[1].rate, 80.0);
    }

    #[test]
    fn load_secondary_requires_tier_columns() {
        let csv = "origin,destination,service,effective_date,weight_ceiling\n";
        let err = load_secondary_catalog("estacoes", csv).unwrap_err();
        assert!(matches!(err, ReconError::MissingColumn { .. }));
    }

    #[test]
    fn load_supplement_last_row_wins() {
        let csv = "\
document_id,reference_weight,service
957-0001,11.5,
957-0001,12.0,RESMD
";
        let map = load_supplement("supplement.csv", csv).unwrap();
        assert_eq!(map.len(), 1);
        let s = &map["957-0001"];
        assert_eq!(s.reference_weight, Some(12.0));
        assert_eq!(s.service_label_override.as_deref(), Some("RESMD"));
    }

    #[test]
    fn run_rejects_empty_catalogs() {
        let config = ReconConfig::from_toml(r#"name = "empty""#).unwrap();
        let err = run(&config, &ReconInput::default()).unwrap_err();
        assert!(matches!(err, ReconError::EmptyCatalog));
    }
}
