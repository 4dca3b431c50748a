use std::collections::HashSet;

use serde::Deserialize;

use crate::error::ReconError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ReconConfig {
    pub name: String,
    /// Maximum acceptable |diff_pct| before a line is flagged. Inclusive.
    #[serde(default = "default_tolerance_pct")]
    pub tolerance_pct: f64,
    /// Float-noise suppression floor: diffs below this magnitude become 0.
    #[serde(default = "default_epsilon")]
    pub epsilon: f64,
    #[serde(default)]
    pub minimum_floor: FloorConfig,
    #[serde(default)]
    pub aliases: Vec<MetroAlias>,
    #[serde(default = "default_nationwide_token")]
    pub nationwide_token: String,
    /// Input files, resolved relative to the config file by the CLI.
    #[serde(default)]
    pub files: Option<FilesConfig>,
    #[serde(default)]
    pub output: OutputConfig,
}

fn default_tolerance_pct() -> f64 {
    1.0
}

fn default_epsilon() -> f64 {
    1e-9
}

fn default_nationwide_token() -> String {
    "BRASIL".into()
}

// ---------------------------------------------------------------------------
// Minimum freight floor
// ---------------------------------------------------------------------------

/// Which minimum-charge rule drives the FRETE_MINIMO classification.
///
/// `lane_specific` prefers the matched record's own minimum charge and
/// falls back to `fixed_value` when the record carries none; `fixed`
/// applies `fixed_value` to every line.
#[derive(Debug, Clone, Deserialize)]
pub struct FloorConfig {
    #[serde(default)]
    pub mode: FloorMode,
    #[serde(default = "default_fixed_floor")]
    pub fixed_value: f64,
}

impl Default for FloorConfig {
    fn default() -> Self {
        Self {
            mode: FloorMode::LaneSpecific,
            fixed_value: default_fixed_floor(),
        }
    }
}

fn default_fixed_floor() -> f64 {
    60.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FloorMode {
    LaneSpecific,
    Fixed,
}

impl Default for FloorMode {
    fn default() -> Self {
        Self::LaneSpecific
    }
}

// ---------------------------------------------------------------------------
// Aliases + files + output
// ---------------------------------------------------------------------------

/// A metro grouping: several location codes matched as one alias.
#[derive(Debug, Clone, Deserialize)]
pub struct MetroAlias {
    pub alias: String,
    pub codes: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FilesConfig {
    pub shipments: String,
    pub primary: String,
    #[serde(default)]
    pub secondary: Option<String>,
    #[serde(default)]
    pub tertiary: Option<String>,
    #[serde(default)]
    pub supplement: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub json: Option<String>,
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReconConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReconConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if !(self.tolerance_pct > 0.0) {
            return Err(ReconError::ConfigValidation(format!(
                "tolerance_pct must be positive, got {}",
                self.tolerance_pct
            )));
        }
        if self.epsilon < 0.0 {
            return Err(ReconError::ConfigValidation(format!(
                "epsilon must be non-negative, got {}",
                self.epsilon
            )));
        }
        if self.minimum_floor.fixed_value < 0.0 {
            return Err(ReconError::ConfigValidation(format!(
                "minimum_floor.fixed_value must be non-negative, got {}",
                self.minimum_floor.fixed_value
            )));
        }

        let nationwide = self.nationwide_token.trim().to_ascii_uppercase();
        if nationwide.is_empty() {
            return Err(ReconError::ConfigValidation(
                "nationwide_token must not be empty".into(),
            ));
        }

        let mut seen: HashSet<String> = HashSet::new();
        for group in &self.aliases {
            if group.codes.is_empty() {
                return Err(ReconError::ConfigValidation(format!(
                    "alias '{}' has no member codes",
                    group.alias
                )));
            }
            for code in &group.codes {
                let code = code.trim().to_ascii_uppercase();
                if code == nationwide {
                    return Err(ReconError::ConfigValidation(format!(
                        "alias '{}' contains the nationwide token '{}'",
                        group.alias, self.nationwide_token
                    )));
                }
                if !seen.insert(code.clone()) {
                    return Err(ReconError::ConfigValidation(format!(
                        "code '{code}' appears in more than one alias group"
                    )));
                }
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
