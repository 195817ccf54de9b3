use anyhow::{Result, bail};

/// Set of flagged airports, expressed as ICAO code prefixes
///
/// ICAO location indicators start with a regional prefix ("LL" for Israel, "LT" for
/// Turkey), so a prefix match flags every airport in that region. Matching is
/// case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlaggedAirports {
    prefixes: Vec<String>,
}

impl FlaggedAirports {
    pub fn new<I, S>(prefixes: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized = Vec::new();
        for prefix in prefixes {
            let prefix = prefix.as_ref().trim().to_ascii_uppercase();
            if prefix.is_empty() {
                bail!("Flagged airport prefix cannot be empty");
            }
            if !prefix.chars().all(|c| c.is_ascii_alphanumeric()) {
                bail!("Flagged airport prefix {:?} must be alphanumeric", prefix);
            }
            if !normalized.contains(&prefix) {
                normalized.push(prefix);
            }
        }

        if normalized.is_empty() {
            bail!("At least one flagged airport prefix is required");
        }

        Ok(Self {
            prefixes: normalized,
        })
    }

    /// Israeli airports (LLBG, LLER, LLHA, ...)
    pub fn israel() -> Self {
        Self {
            prefixes: vec!["LL".to_string()],
        }
    }

    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    /// Absent or blank codes never match
    pub fn matches(&self, code: Option<&str>) -> bool {
        let Some(code) = code.map(str::trim).filter(|c| !c.is_empty()) else {
            return false;
        };
        let code = code.to_ascii_uppercase();
        self.prefixes.iter().any(|p| code.starts_with(p.as_str()))
    }
}
