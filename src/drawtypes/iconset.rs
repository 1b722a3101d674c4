//! An ordered, name-keyed collection of [`Label`]s with three lookup modes
//! (spec §3 "IconSet").

use std::collections::HashMap;

use crate::drawtypes::label::Label;

/// How [`IconSet::lookup`] matches a runtime-provided id against the
/// registered ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupMode {
    /// The id must match exactly.
    Exact,
    /// The registered id may be a substring of the runtime id (or vice
    /// versa is not attempted — substring search is one-directional:
    /// registered id found within the given id).
    Fuzzy,
    /// Only the portion of the given id before its first `:` is compared.
    Prefix,
}

/// Ordered id → [`Label`] map with a named fallback.
#[derive(Debug, Clone, Default)]
pub struct IconSet {
    icons: Vec<(String, Label)>,
    default: Option<Label>,
}

impl IconSet {
    /// An empty set with no default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `id -> label`, preserving insertion order for fuzzy/prefix
    /// scans. A later `add` with the same id replaces the earlier one.
    pub fn add(&mut self, id: impl Into<String>, label: Label) -> &mut Self {
        let id = id.into();
        if let Some(existing) = self.icons.iter_mut().find(|(k, _)| *k == id) {
            existing.1 = label;
        } else {
            self.icons.push((id, label));
        }
        self
    }

    /// Set the fallback label returned when no id matches.
    pub fn set_default(&mut self, label: Label) -> &mut Self {
        self.default = Some(label);
        self
    }

    /// Find the label for `id` under `mode`, falling back to the default.
    pub fn lookup(&self, id: &str, mode: LookupMode) -> Option<&Label> {
        let found = match mode {
            LookupMode::Exact => self.icons.iter().find(|(k, _)| k == id),
            LookupMode::Fuzzy => self.icons.iter().find(|(k, _)| id.contains(k.as_str())),
            LookupMode::Prefix => {
                let prefix = id.split(':').next().unwrap_or(id);
                self.icons.iter().find(|(k, _)| k == prefix)
            }
        };
        found.map(|(_, label)| label).or(self.default.as_ref())
    }

    /// Map of raw-id → label, for callers that need the whole set (e.g.
    /// rendering every configured workspace icon).
    pub fn as_map(&self) -> HashMap<&str, &Label> {
        self.icons.iter().map(|(k, v)| (k.as_str(), v)).collect()
    }
}
