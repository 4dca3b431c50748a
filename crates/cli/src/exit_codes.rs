//! CLI Exit Code Registry
//!
//! Single source of truth for all CLI exit codes. Exit codes are part of
//! the shell contract — audit pipelines branch on them.
//!
//! # Exit Codes
//!
//! | Code | Meaning                                                    |
//! |------|------------------------------------------------------------|
//! | 0    | Success: every line reconciled within tolerance            |
//! | 1    | General error (unspecified)                                |
//! | 2    | CLI usage error (bad args)                                 |
//! | 3    | Out-of-tolerance lines found                               |
//! | 4    | Unlocated tariffs or unsupported services only             |
//! | 5    | Runtime error (unreadable file, bad input data)            |
//! | 6    | Invalid config                                             |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant here
//! 2. Document what triggers it in the table above
//! 3. Wire it into the relevant command's error handling

/// Success - every reconciled line landed within tolerance.
pub const EXIT_SUCCESS: u8 = 0;

// Code 2 (usage error) is produced by clap directly.

/// At least one line is outside the configured tolerance.
pub const EXIT_OUT_OF_TOLERANCE: u8 = 3;

/// No tolerance breaches, but some lines could not be priced at all
/// (tariff not located, or unsupported service labels).
pub const EXIT_UNLOCATED: u8 = 4;

/// Runtime error - unreadable file, broken dates, empty catalogs.
pub const EXIT_RUNTIME: u8 = 5;

/// Config failed to parse or validate.
pub const EXIT_INVALID_CONFIG: u8 = 6;
