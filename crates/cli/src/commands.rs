//! `aerorecon run` / `aerorecon validate` — config-driven reconciliation.

use std::path::{Path, PathBuf};

use aerorecon::engine::{
    load_primary_catalog, load_secondary_catalog, load_shipment_rows, load_supplement,
    load_tertiary_catalog,
};
use aerorecon::model::Status;
use aerorecon::{ReconConfig, ReconInput};

use crate::exit_codes::{EXIT_INVALID_CONFIG, EXIT_OUT_OF_TOLERANCE, EXIT_RUNTIME, EXIT_UNLOCATED};
use crate::CliError;

fn cli_err(code: u8, msg: impl Into<String>) -> CliError {
    CliError::new(code, msg)
}

pub fn cmd_run(
    config_path: PathBuf,
    json_output: bool,
    output_file: Option<PathBuf>,
) -> Result<(), CliError> {
    let config_str = std::fs::read_to_string(&config_path)
        .map_err(|e| cli_err(EXIT_RUNTIME, format!("cannot read config: {e}")))?;
    let config = ReconConfig::from_toml(&config_str)
        .map_err(|e| cli_err(EXIT_INVALID_CONFIG, e.to_string()))?;

    let files = config.files.clone().ok_or_else(|| {
        cli_err(EXIT_INVALID_CONFIG, "config has no [files] section")
            .with_hint("add [files] with at least 'shipments' and 'primary'")
    })?;

    // File paths resolve relative to the config file's directory.
    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));

    let shipments_csv = read_input(base_dir, &files.shipments)?;
    let shipments = load_shipment_rows(&label(&files.shipments), &shipments_csv)
        .map_err(|e| cli_err(EXIT_RUNTIME, e.to_string()))?;

    let primary_csv = read_input(base_dir, &files.primary)?;
    let primary = load_primary_catalog(&label(&files.primary), &primary_csv)
        .map_err(|e| cli_err(EXIT_RUNTIME, e.to_string()))?;

    let secondary = match &files.secondary {
        Some(file) => load_secondary_catalog(&label(file), &read_input(base_dir, file)?)
            .map_err(|e| cli_err(EXIT_RUNTIME, e.to_string()))?,
        None => Vec::new(),
    };
    let tertiary = match &files.tertiary {
        Some(file) => load_tertiary_catalog(&label(file), &read_input(base_dir, file)?)
            .map_err(|e| cli_err(EXIT_RUNTIME, e.to_string()))?,
        None => Vec::new(),
    };
    let supplement = match &files.supplement {
        Some(file) => load_supplement(&label(file), &read_input(base_dir, file)?)
            .map_err(|e| cli_err(EXIT_RUNTIME, e.to_string()))?,
        None => Default::default(),
    };

    let input = ReconInput { shipments, primary, secondary, tertiary, supplement };

    let result = aerorecon::run(&config, &input)
        .map_err(|e| cli_err(EXIT_RUNTIME, e.to_string()))?;

    let json_str = serde_json::to_string_pretty(&result)
        .map_err(|e| cli_err(EXIT_RUNTIME, format!("JSON serialization error: {e}")))?;

    // --output overrides the config's [output] path.
    let output_path = output_file.or_else(|| config.output.json.as_ref().map(|p| base_dir.join(p)));
    if let Some(ref path) = output_path {
        std::fs::write(path, &json_str)
            .map_err(|e| cli_err(EXIT_RUNTIME, format!("cannot write output: {e}")))?;
        eprintln!("wrote {}", path.display());
    }

    if json_output {
        println!("{json_str}");
    }

    // Human summary to stderr
    let s = &result.summary;
    eprintln!(
        "recon '{}': {} lines — charged {:.2}, expected (tariffed) {:.2}, diff {:.2}, to verify {:.2}",
        result.meta.config_name, s.total_lines, s.total_charged, s.total_expected, s.total_diff,
        s.total_to_verify,
    );
    for status in Status::ALL {
        let key = status.to_string();
        let count = s.status_counts.get(&key).copied().unwrap_or(0);
        if count > 0 {
            eprintln!(
                "  {key}: {count} line(s), charged {:.2}",
                s.status_charged.get(&key).copied().unwrap_or(0.0),
            );
        }
    }
    if s.unsupported_count > 0 {
        eprintln!(
            "  unsupported services: {} line(s), charged {:.2}",
            s.unsupported_count, s.total_unsupported_charged,
        );
    }

    let out_of_tolerance = s
        .status_counts
        .get(&Status::ForaDaTolerancia.to_string())
        .copied()
        .unwrap_or(0);
    if out_of_tolerance > 0 {
        return Err(cli_err(
            EXIT_OUT_OF_TOLERANCE,
            format!("{out_of_tolerance} line(s) out of tolerance"),
        ));
    }

    let unlocated = s
        .status_counts
        .get(&Status::TarifaNaoLocalizada.to_string())
        .copied()
        .unwrap_or(0);
    if unlocated > 0 || s.unsupported_count > 0 {
        return Err(cli_err(
            EXIT_UNLOCATED,
            format!(
                "{} line(s) could not be priced",
                unlocated + s.unsupported_count
            ),
        ));
    }

    Ok(())
}

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config_str = std::fs::read_to_string(&config_path)
        .map_err(|e| cli_err(EXIT_RUNTIME, format!("cannot read config: {e}")))?;

    match ReconConfig::from_toml(&config_str) {
        Ok(config) => {
            eprintln!(
                "valid: recon '{}', tolerance {}%, {} alias group(s)",
                config.name,
                config.tolerance_pct,
                config.aliases.len(),
            );
            Ok(())
        }
        Err(e) => Err(cli_err(EXIT_INVALID_CONFIG, e.to_string())),
    }
}

fn read_input(base_dir: &Path, file: &str) -> Result<String, CliError> {
    let path = base_dir.join(file);
    std::fs::read_to_string(&path)
        .map_err(|e| cli_err(EXIT_RUNTIME, format!("cannot read {}: {e}", path.display())))
}

/// Source label for catalog provenance: the file name without extension.
fn label(file: &str) -> String {
    Path::new(file)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.to_string())
}
