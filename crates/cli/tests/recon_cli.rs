// End-to-end tests for `aerorecon run` / `aerorecon validate`.
// Run with: cargo test -p aerorecon-cli --test recon_cli

use std::path::Path;
use std::process::Command;

fn aerorecon() -> Command {
    Command::new(env!("CARGO_BIN_EXE_aerorecon"))
}

const CONFIG: &str = r#"
name = "April audit"

[[aliases]]
alias = "SAO"
codes = ["CGH", "GRU", "VCP"]

[files]
shipments = "invoice.csv"
primary = "bases.csv"
"#;

const PRIMARY: &str = "\
origin,destination,service,rate,minimum_charge,effective_date
SDU,AJU,RESMD,30.0,60.0,2025-01-01
";

fn write_fixtures(dir: &Path, config: &str, shipments: &str) {
    std::fs::write(dir.join("april.recon.toml"), config).unwrap();
    std::fs::write(dir.join("invoice.csv"), shipments).unwrap();
    std::fs::write(dir.join("bases.csv"), PRIMARY).unwrap();
}

fn shipments(rows: &str) -> String {
    format!(
        "origin,destination,service,invoice_date,document_id,weight,freight_value,tariff_rate\n{rows}"
    )
}

#[test]
fn run_within_tolerance_exits_zero() {
    let dir = tempfile::tempdir().unwrap();
    write_fixtures(
        dir.path(),
        CONFIG,
        &shipments("SDU,AJU,RESMD,2025-04-10,957-0001,12.0,360.00,\n"),
    );

    let output = aerorecon()
        .args(["run", "april.recon.toml", "--json"])
        .current_dir(dir.path())
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(0), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let result: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["meta"]["config_name"], "April audit");
    assert_eq!(result["summary"]["total_lines"], 1);
    assert_eq!(result["records"][0]["status"], "DENTRO_DA_TOLERANCIA");
}

#[test]
fn run_out_of_tolerance_exits_three() {
    let dir = tempfile::tempdir().unwrap();
    write_fixtures(
        dir.path(),
        CONFIG,
        &shipments("SDU,AJU,RESMD,2025-04-10,957-0001,12.0,450.00,\n"),
    );

    let output = aerorecon()
        .args(["run", "april.recon.toml"])
        .current_dir(dir.path())
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(3));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("out of tolerance"), "stderr: {stderr}");
}

#[test]
fn run_unlocated_only_exits_four() {
    let dir = tempfile::tempdir().unwrap();
    write_fixtures(
        dir.path(),
        CONFIG,
        &shipments("CWB,POA,RESMD,2025-04-10,957-0001,5.0,150.00,\n"),
    );

    let output = aerorecon()
        .args(["run", "april.recon.toml"])
        .current_dir(dir.path())
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(4));
}

#[test]
fn run_writes_output_file() {
    let dir = tempfile::tempdir().unwrap();
    write_fixtures(
        dir.path(),
        CONFIG,
        &shipments("SDU,AJU,RESMD,2025-04-10,957-0001,12.0,360.00,\n"),
    );

    let output = aerorecon()
        .args(["run", "april.recon.toml", "--output", "result.json"])
        .current_dir(dir.path())
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(0));

    let written = std::fs::read_to_string(dir.path().join("result.json")).unwrap();
    let result: serde_json::Value = serde_json::from_str(&written).unwrap();
    assert_eq!(result["summary"]["total_lines"], 1);
}

#[test]
fn run_without_files_section_exits_six() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("bare.recon.toml"), r#"name = "bare""#).unwrap();

    let output = aerorecon()
        .args(["run", "bare.recon.toml"])
        .current_dir(dir.path())
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(6));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("[files]"), "stderr: {stderr}");
}

#[test]
fn run_missing_input_file_exits_five() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("april.recon.toml"), CONFIG).unwrap();

    let output = aerorecon()
        .args(["run", "april.recon.toml"])
        .current_dir(dir.path())
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(5));
}

#[test]
fn validate_good_and_bad_configs() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("good.recon.toml"), CONFIG).unwrap();
    std::fs::write(
        dir.path().join("bad.recon.toml"),
        "name = \"bad\"\ntolerance_pct = -1.0\n",
    )
    .unwrap();

    let good = aerorecon()
        .args(["validate", "good.recon.toml"])
        .current_dir(dir.path())
        .output()
        .unwrap();
    assert_eq!(good.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&good.stderr).contains("valid"));

    let bad = aerorecon()
        .args(["validate", "bad.recon.toml"])
        .current_dir(dir.path())
        .output()
        .unwrap();
    assert_eq!(bad.status.code(), Some(6));
}
