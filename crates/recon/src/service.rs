use regex::Regex;

use crate::model::ServiceCode;

/// Maps free-text invoice service labels onto the canonical code set.
///
/// Patterns are tested most specific first so a compound code is never
/// captured by one of its substrings ("ST2BA" must not resolve to "BA",
/// "MD/PE" must not resolve to "MD"). First match wins.
pub struct ServiceClassifier {
    rules: Vec<(Regex, ServiceCode)>,
}

impl ServiceClassifier {
    pub fn new() -> Self {
        use ServiceCode::*;
        let table: &[(&str, ServiceCode)] = &[
            // Explicit and compound "reservado" forms.
            (r"\bRESMD\b", Resmd),
            (r"\bRES(ERVADO)?\b.*\bMEDS?\b", Resmd),
            // Compound "estandar" invoice headings all price as ST2MD.
            (r"\b(ESTANDAR|EST|STD)\b.*\b2\b.*\bMEDS?\b", St2md),
            (r"\b(ESTANDAR|EST|STD)\b.*\b10\b.*\bBAS", St2md),
            (r"\b(ESTANDAR|EST|STD)\b.*\b2\b.*\bBAS", St2md),
            // Tiered codes before their two-letter suffixes.
            (r"\bST\s*10\s*B\b", St10b),
            (r"\bST\s*5\s*BA\b", St5ba),
            (r"\bST\s*3\s*BA\b", St3ba),
            (r"\bST\s*2\s*BA\b", St2ba),
            (r"\bST\s*2\s*MD\b", St2md),
            (r"\bST\s*2\s*PE\b", St2pe),
            // "MD/PE" tolerates "MD / PE", "MD-PE" (separator-normalized), "MDPE".
            (r"\bMD\s*/\s*PE\b|\bMD\s+PE\b|\bMDPE\b", MdPe),
            (r"\bMEDICAMENT", Medicamentos),
            (r"\bMD\b", Md),
            (r"(^|[\s/])BA($|[\s/])", Ba),
        ];
        let rules = table
            .iter()
            .map(|(pat, code)| (compile(pat), *code))
            .collect();
        Self { rules }
    }

    /// Classify a raw label. `None` means the line is unsupported and must
    /// be excluded from the reconciliation pass.
    pub fn classify(&self, label: &str) -> Option<ServiceCode> {
        let text = normalize_label(label);
        if text.is_empty() {
            return None;
        }
        self.rules
            .iter()
            .find(|(rx, _)| rx.is_match(&text))
            .map(|(_, code)| *code)
    }
}

impl Default for ServiceClassifier {
    fn default() -> Self {
        Self::new()
    }
}

fn compile(pattern: &str) -> Regex {
    // Patterns are compile-time constants; a failure here is a programming
    // error, not an input error.
    Regex::new(pattern).expect("hard-coded service pattern")
}

/// Normalize a label for matching: fold diacritics, uppercase, map the
/// common separators (`.`, `-`, `_`) to spaces, collapse whitespace runs.
/// `/` survives so "MD/PE" stays detectable.
pub fn normalize_label(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    let mut last_space = true;
    for c in label.chars() {
        let folded = fold_diacritic(c);
        let mapped = match folded {
            '.' | '-' | '_' => ' ',
            c if c.is_whitespace() => ' ',
            c => c.to_ascii_uppercase(),
        };
        if mapped == ' ' {
            if !last_space {
                out.push(' ');
                last_space = true;
            }
        } else {
            out.push(mapped);
            last_space = false;
        }
    }
    out.trim_end().to_string()
}

/// Latin diacritic fold covering the Portuguese/Spanish labels this engine
/// sees. Unmapped characters pass through unchanged.
fn fold_diacritic(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' | 'Á' | 'À' | 'Â' | 'Ã' | 'Ä' => 'A',
        'é' | 'è' | 'ê' | 'ë' | 'É' | 'È' | 'Ê' | 'Ë' => 'E',
        'í' | 'ì' | 'î' | 'ï' | 'Í' | 'Ì' | 'Î' | 'Ï' => 'I',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' | 'Ó' | 'Ò' | 'Ô' | 'Õ' | 'Ö' => 'O',
        'ú' | 'ù' | 'û' | 'ü' | 'Ú' | 'Ù' | 'Û' | 'Ü' => 'U',
        'ç' | 'Ç' => 'C',
        'ñ' | 'Ñ' => 'N',
        c => c,
    }
}
