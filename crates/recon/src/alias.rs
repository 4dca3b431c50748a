use std::collections::HashMap;

use crate::config::MetroAlias;

/// Collapses co-located location codes into one metro alias and produces
/// the ordered fallback lane keys for catalog lookups.
///
/// The nationwide token is a wildcard catalog code usable as either end of
/// a lane when no more specific entry exists.
pub struct AliasResolver {
    canon: HashMap<String, String>,
    nationwide: String,
}

impl AliasResolver {
    pub fn new(groups: &[MetroAlias], nationwide_token: &str) -> Self {
        let mut canon = HashMap::new();
        for group in groups {
            let alias = group.alias.trim().to_ascii_uppercase();
            for code in &group.codes {
                canon.insert(code.trim().to_ascii_uppercase(), alias.clone());
            }
            // The alias itself collapses to itself, so catalogs may key
            // either on the alias or on any member code.
            canon.insert(alias.clone(), alias);
        }
        Self {
            canon,
            nationwide: nationwide_token.trim().to_ascii_uppercase(),
        }
    }

    /// Metro alias for a code, or the (uppercased) code itself.
    pub fn collapse(&self, code: &str) -> String {
        let key = code.trim().to_ascii_uppercase();
        self.canon.get(&key).cloned().unwrap_or(key)
    }

    /// Collapsed (origin, destination) pair.
    pub fn lane(&self, origin: &str, destination: &str) -> (String, String) {
        (self.collapse(origin), self.collapse(destination))
    }

    /// Fallback lane keys, in strict priority order: exact pair, nationwide
    /// origin, nationwide destination.
    pub fn fallback_lanes(&self, origin: &str, destination: &str) -> [(String, String); 3] {
        let (o, d) = self.lane(origin, destination);
        [
            (o.clone(), d.clone()),
            (self.nationwide.clone(), d),
            (o, self.nationwide.clone()),
        ]
    }
}
