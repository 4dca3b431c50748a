use std::fmt;

#[derive(Debug)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (bad tolerance, overlapping alias groups, etc.).
    ConfigValidation(String),
    /// Missing required column in an input file.
    MissingColumn { file: String, column: String },
    /// Date cell that cannot be parsed. Dates are structural: a catalog with
    /// broken effective dates aborts the run instead of silently matching.
    DateParse { file: String, record: String, value: String },
    /// All three catalogs loaded zero usable records.
    EmptyCatalog,
    /// IO error (file read, etc.).
    Io(String),
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::MissingColumn { file, column } => {
                write!(f, "{file}: missing column '{column}'")
            }
            Self::DateParse { file, record, value } => {
                write!(f, "{file}, record '{record}': cannot parse date '{value}'")
            }
            Self::EmptyCatalog => write!(f, "no usable tariff records in any catalog"),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for ReconError {}
