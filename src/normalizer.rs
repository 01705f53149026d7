use regex::Regex;
use serde_yaml::Value;
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::{debug, warn};

static LABEL_SUFFIX: OnceLock<Regex> = OnceLock::new();

fn label_suffix_re() -> &'static Regex {
    LABEL_SUFFIX.get_or_init(|| Regex::new(r"\s+\d.*").unwrap())
}

/// Derive the grouping label for a proxy name by removing the first
/// whitespace-then-digit run and everything after it. "HK 01 | 2x" becomes
/// "HK"; a name that strips to nothing keeps its original (trimmed) form.
pub fn derive_label(name: &str) -> String {
    let stripped = label_suffix_re().replace(name, "");
    let stripped = stripped.trim();
    if stripped.is_empty() {
        name.trim().to_string()
    } else {
        stripped.to_string()
    }
}

/// Per-request naming state. Counts are shared across all sources within one
/// request and never across requests, so two sources both containing a "US"
/// proxy come out as "US 001" and "US 002".
#[derive(Debug, Default)]
pub struct NameCounter {
    counts: HashMap<String, u32>,
}

impl NameCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_name(&mut self, label: &str) -> String {
        let count = self.counts.entry(label.to_string()).or_insert(0);
        *count += 1;
        format!("{} {:03}", label, count)
    }
}

pub struct Normalizer {
    ignore_label_keywords: Vec<String>,
    ignore_proxy_names: Vec<String>,
}

impl Normalizer {
    /// Blank keywords and names are dropped so a trailing comma in the
    /// environment does not exclude everything.
    pub fn new(ignore_label_keywords: Vec<String>, ignore_proxy_names: Vec<String>) -> Self {
        Self {
            ignore_label_keywords: ignore_label_keywords
                .into_iter()
                .filter(|k| !k.trim().is_empty())
                .collect(),
            ignore_proxy_names: ignore_proxy_names
                .into_iter()
                .filter(|n| !n.trim().is_empty())
                .collect(),
        }
    }

    /// Turn one source's document into accepted, renamed entries.
    ///
    /// A document that is not a mapping or has no `proxies` list contributes
    /// nothing. A source containing any exactly-ignored proxy name is dropped
    /// wholesale. Entries whose derived label contains an ignored keyword are
    /// skipped individually; everything else is renamed through `counter` in
    /// document order.
    pub fn normalize(&self, doc: &Value, counter: &mut NameCounter) -> Vec<Value> {
        let entries = match doc.get("proxies").and_then(Value::as_sequence) {
            Some(entries) => entries,
            None => return Vec::new(),
        };

        let banned: Vec<&str> = entries
            .iter()
            .filter_map(|e| e.get("name").and_then(Value::as_str))
            .filter(|name| self.ignore_proxy_names.iter().any(|ig| ig == name))
            .collect();
        if !banned.is_empty() {
            warn!("Dropping entire source: ignored proxy names present: {:?}", banned);
            return Vec::new();
        }

        let mut accepted = Vec::new();

        for entry in entries {
            let name = match entry.get("name").and_then(Value::as_str) {
                Some(name) => name,
                None => continue,
            };
            let map = match entry.as_mapping() {
                Some(map) => map,
                None => continue,
            };

            let label = derive_label(name);
            if self.ignore_label_keywords.iter().any(|k| label.contains(k.as_str())) {
                debug!("Skipping entry {:?}: label {:?} matches ignored keyword", name, label);
                continue;
            }

            let mut renamed = map.clone();
            renamed.insert(
                Value::String("name".to_string()),
                Value::String(counter.next_name(&label)),
            );
            accepted.push(Value::Mapping(renamed));
        }

        accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_strips_numeric_suffix() {
        assert_eq!(derive_label("HK 01"), "HK");
        assert_eq!(derive_label("US 2 | IPLC"), "US");
        assert_eq!(derive_label("Tokyo  3x"), "Tokyo");
        assert_eq!(derive_label("Frankfurt"), "Frankfurt");
    }

    #[test]
    fn label_falls_back_to_original_when_empty() {
        assert_eq!(derive_label(" 5 Mbps"), "5 Mbps");
    }

    #[test]
    fn counter_is_per_label_and_zero_padded() {
        let mut counter = NameCounter::new();
        assert_eq!(counter.next_name("US"), "US 001");
        assert_eq!(counter.next_name("US"), "US 002");
        assert_eq!(counter.next_name("HK"), "HK 001");
        assert_eq!(counter.next_name("US"), "US 003");
    }
}
