//! Property whitelisting.
//!
//! Validation sees the document exactly as the caller supplied it; storage only ever
//! sees the whitelisted projection produced by [`PropertyFilter::clean`].

use bson::Document;
use std::collections::BTreeSet;

/// Projects documents onto an optional whitelist of property names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyFilter {
    allowed: Option<BTreeSet<String>>,
}

impl PropertyFilter {
    /// A filter that lets every property through.
    pub fn allow_all() -> Self {
        Self { allowed: None }
    }

    /// A filter keeping only `names`.
    pub fn only<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: Some(names.into_iter().map(Into::into).collect()),
        }
    }

    /// The whitelist, or `None` when nothing is filtered.
    pub fn allowed(&self) -> Option<&BTreeSet<String>> {
        self.allowed.as_ref()
    }

    pub fn is_filtering(&self) -> bool {
        self.allowed.is_some()
    }

    /// Adds a name to an existing whitelist. No-op when nothing is filtered.
    pub fn allow(&mut self, name: impl Into<String>) {
        if let Some(allowed) = &mut self.allowed {
            allowed.insert(name.into());
        }
    }

    /// Keeps the whitelisted properties present on `document`.
    ///
    /// Missing properties are not synthesised. Without a whitelist the document is
    /// returned as is.
    pub fn clean(&self, document: Document) -> Document {
        match &self.allowed {
            None => document,
            Some(allowed) => document
                .into_iter()
                .filter(|(key, _)| allowed.contains(key))
                .collect(),
        }
    }
}

/// Removes every property named in `names` from `document`.
pub fn strip<'a>(mut document: Document, names: impl IntoIterator<Item = &'a String>) -> Document {
    for name in names {
        document.remove(name);
    }
    document
}

/// Copies the properties named in `names` that are present on `document`.
pub fn project<'a>(document: &Document, names: impl IntoIterator<Item = &'a String>) -> Document {
    names
        .into_iter()
        .filter_map(|name| {
            document
                .get(name)
                .map(|value| (name.clone(), value.clone()))
        })
        .collect()
}

/// Closed-world merge: overwrites properties of `current` that `updates` also defines.
/// Properties only present in `updates` are ignored.
pub fn merge_existing(mut current: Document, updates: &Document) -> Document {
    for (key, value) in current.iter_mut() {
        if let Some(update) = updates.get(key) {
            *value = update.clone();
        }
    }
    current
}
