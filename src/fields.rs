use once_cell::sync::Lazy;
use serde::Serialize;

use crate::query::{SEARCH_KEY, is_internal_key};

/// Label shown on a clause whose key has not been chosen yet.
pub const CHOOSE_LABEL: &str = "Choose...";

// Fields the API accepts but that never appear in the search menu.
const HIDDEN_FIELDS: &[&str] = &["id", "test"];

static BUILTIN: Lazy<FieldDirectory> = Lazy::new(FieldDirectory::builtin);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldEntry {
    pub key: String,
    pub label: String,
}

/// The static key menu of the search form: every searchable key with its
/// display label. Text search always sorts first; the rest sort by label.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldDirectory {
    entries: Vec<FieldEntry>,
}

impl FieldDirectory {
    pub fn builtin() -> Self {
        Self::default().with_fields([(SEARCH_KEY, "Text Search"), ("type", "Type")])
    }

    pub fn shared_builtin() -> &'static FieldDirectory {
        &BUILTIN
    }

    /// Adds or relabels fields. An empty label falls back to the key.
    pub fn with_fields<I, K, L>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, L)>,
        K: AsRef<str>,
        L: AsRef<str>,
    {
        for (key, label) in fields {
            let key = key.as_ref();
            if key.is_empty() || HIDDEN_FIELDS.contains(&key) {
                continue;
            }
            let label = match label.as_ref().trim() {
                "" => key.to_string(),
                label => label.to_string(),
            };
            match self.entries.iter_mut().find(|entry| entry.key == key) {
                Some(entry) => entry.label = label,
                None => self.entries.push(FieldEntry {
                    key: key.to_string(),
                    label,
                }),
            }
        }
        self.entries.sort_by(|a, b| {
            (a.key != SEARCH_KEY)
                .cmp(&(b.key != SEARCH_KEY))
                .then_with(|| a.label.to_lowercase().cmp(&b.label.to_lowercase()))
                .then_with(|| a.key.cmp(&b.key))
        });
        self
    }

    pub fn label(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| entry.key == key)
            .map(|entry| entry.label.as_str())
    }

    /// Label for a clause: the directory label, else the key itself, else the
    /// "choose" prompt when no key is set.
    pub fn label_or_default(&self, key: &str) -> String {
        if key.is_empty() {
            return CHOOSE_LABEL.to_string();
        }
        self.label(key).unwrap_or(key).to_string()
    }

    pub fn entries(&self) -> &[FieldEntry] {
        &self.entries
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.key.as_str())
    }

    /// Keys that have a catalog behind them.
    pub fn catalog_keys(&self) -> Vec<&str> {
        self.keys().filter(|key| !is_internal_key(key)).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_search_sorts_first() {
        let directory = FieldDirectory::builtin().with_fields([
            ("hostname", "Hostname"),
            ("env", "Environment"),
            ("az", "availability zone"),
        ]);
        let keys: Vec<_> = directory.keys().collect();
        assert_eq!(keys, vec![SEARCH_KEY, "az", "env", "hostname", "type"]);
    }

    #[test]
    fn hidden_and_empty_keys_are_skipped() {
        let directory = FieldDirectory::default().with_fields([("id", "ID"), ("", "x"), ("test", "T")]);
        assert!(directory.is_empty());
    }

    #[test]
    fn labels_fall_back_to_key_then_prompt() {
        let directory = FieldDirectory::builtin().with_fields([("rack", "")]);
        assert_eq!(directory.label("rack"), Some("rack"));
        assert_eq!(directory.label_or_default(SEARCH_KEY), "Text Search");
        assert_eq!(directory.label_or_default("unknown"), "unknown");
        assert_eq!(directory.label_or_default(""), CHOOSE_LABEL);
    }

    #[test]
    fn relabeling_replaces_existing_entry() {
        let directory = FieldDirectory::builtin().with_fields([("type", "Record Type")]);
        assert_eq!(directory.len(), 2);
        assert_eq!(directory.label("type"), Some("Record Type"));
    }

    #[test]
    fn catalog_keys_exclude_internal_fields() {
        let directory = FieldDirectory::shared_builtin().clone().with_fields([("env", "Env")]);
        assert_eq!(directory.catalog_keys(), vec!["env", "type"]);
    }
}
