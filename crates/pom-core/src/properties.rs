//! `${...}` placeholder substitution over a layered property table.
//!
//! References are expanded lazily, one name at a time, while the chain of
//! names currently being expanded is kept on a stack. Meeting a name that is
//! already on the stack is a cycle. Names missing from the table are left in
//! place verbatim and recorded so callers can report them.

use crate::error::{PomError, Result};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Property name to (possibly unresolved) value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PropertyTable {
    entries: BTreeMap<String, String>,
}

impl PropertyTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Overlays `other` on top of `self`; `other` wins on collisions.
    pub fn overlay(&mut self, other: &Self) {
        for (k, v) in &other.entries {
            self.entries.insert(k.clone(), v.clone());
        }
    }

    pub fn as_map(&self) -> &BTreeMap<String, String> {
        &self.entries
    }

    pub fn into_map(self) -> BTreeMap<String, String> {
        self.entries
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PropertyTable {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Resolves placeholders against one table.
///
/// Resolved names are memoized, so expanding many values that share
/// references costs one expansion per name.
pub struct PropertyResolver<'a> {
    table: &'a PropertyTable,
    resolved: HashMap<String, String>,
    unresolved: BTreeSet<String>,
}

impl<'a> PropertyResolver<'a> {
    pub fn new(table: &'a PropertyTable) -> Self {
        Self {
            table,
            resolved: HashMap::new(),
            unresolved: BTreeSet::new(),
        }
    }

    /// Substitutes every `${name}` in `value`.
    pub fn resolve(&mut self, value: &str) -> Result<String> {
        let mut chain = Vec::new();
        self.substitute(value, &mut chain)
    }

    pub fn resolve_opt(&mut self, value: Option<&str>) -> Result<Option<String>> {
        value.map(|v| self.resolve(v)).transpose()
    }

    /// Fully resolved value of the property `name`, `None` when undefined.
    pub fn resolve_property(&mut self, name: &str) -> Result<Option<String>> {
        let mut chain = Vec::new();
        self.lookup(name, &mut chain)
    }

    /// Resolves every entry of the table.
    pub fn resolve_table(&mut self) -> Result<PropertyTable> {
        let table = self.table;
        let mut out = PropertyTable::new();
        for name in table.keys() {
            if let Some(value) = self.resolve_property(name)? {
                out.insert(name, value);
            }
        }
        Ok(out)
    }

    /// Names referenced but not defined, left verbatim in the output.
    pub fn unresolved(&self) -> &BTreeSet<String> {
        &self.unresolved
    }

    pub fn into_unresolved(self) -> BTreeSet<String> {
        self.unresolved
    }

    fn substitute(&mut self, value: &str, chain: &mut Vec<String>) -> Result<String> {
        if !value.contains("${") {
            return Ok(value.to_string());
        }

        let mut out = String::with_capacity(value.len());
        let mut rest = value;
        while let Some(start) = rest.find("${") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let Some(end) = after.find('}') else {
                // Unterminated reference is plain text.
                out.push_str(&rest[start..]);
                return Ok(out);
            };
            let name = &after[..end];
            match self.lookup(name, chain)? {
                Some(resolved) => out.push_str(&resolved),
                None => {
                    tracing::trace!("leaving undefined property '{}' in place", name);
                    self.unresolved.insert(name.to_string());
                    out.push_str(&rest[start..start + 2 + end + 1]);
                }
            }
            rest = &after[end + 1..];
        }
        out.push_str(rest);
        Ok(out)
    }

    fn lookup(&mut self, name: &str, chain: &mut Vec<String>) -> Result<Option<String>> {
        if let Some(done) = self.resolved.get(name) {
            return Ok(Some(done.clone()));
        }

        if let Some(pos) = chain.iter().position(|n| n == name) {
            let mut cycle = chain[pos..].to_vec();
            cycle.push(name.to_string());
            return Err(PomError::CircularPropertyReference { cycle });
        }

        let table = self.table;
        let Some(raw) = table.get(name) else {
            return Ok(None);
        };

        chain.push(name.to_string());
        let value = self.substitute(raw, chain);
        chain.pop();
        let value = value?;

        tracing::trace!("resolved property '{}' = '{}'", name, value);
        self.resolved.insert(name.to_string(), value.clone());
        Ok(Some(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(entries: &[(&str, &str)]) -> PropertyTable {
        entries.iter().copied().collect()
    }

    #[test]
    fn test_simple_substitution() {
        let props = table(&[("lib.version", "2.3")]);
        let mut resolver = PropertyResolver::new(&props);
        assert_eq!(resolver.resolve("${lib.version}").unwrap(), "2.3");
        assert_eq!(
            resolver.resolve("v${lib.version}-final").unwrap(),
            "v2.3-final"
        );
    }

    #[test]
    fn test_transitive_references() {
        let props = table(&[
            ("a", "${b}.${c}"),
            ("b", "1"),
            ("c", "${d}"),
            ("d", "9"),
        ]);
        let mut resolver = PropertyResolver::new(&props);
        assert_eq!(resolver.resolve_property("a").unwrap().as_deref(), Some("1.9"));
    }

    #[test]
    fn test_two_node_cycle_fails() {
        let props = table(&[("a", "${b}"), ("b", "${a}")]);
        let mut resolver = PropertyResolver::new(&props);
        match resolver.resolve("${a}") {
            Err(PomError::CircularPropertyReference { cycle }) => {
                assert_eq!(cycle, vec!["a", "b", "a"]);
            }
            other => panic!("expected cycle error, got {other:?}"),
        }
    }

    #[test]
    fn test_self_reference_fails() {
        let props = table(&[("x", "prefix-${x}")]);
        let mut resolver = PropertyResolver::new(&props);
        assert!(matches!(
            resolver.resolve_table(),
            Err(PomError::CircularPropertyReference { .. })
        ));
    }

    #[test]
    fn test_undefined_reference_left_in_place() {
        let props = table(&[("a", "1")]);
        let mut resolver = PropertyResolver::new(&props);
        assert_eq!(
            resolver.resolve("${a}-${missing}").unwrap(),
            "1-${missing}"
        );
        assert!(resolver.unresolved().contains("missing"));
    }

    #[test]
    fn test_unterminated_reference_is_literal() {
        let props = table(&[("a", "1")]);
        let mut resolver = PropertyResolver::new(&props);
        assert_eq!(resolver.resolve("${a}${oops").unwrap(), "1${oops");
        assert!(resolver.unresolved().is_empty());
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let props = table(&[("a", "${b}"), ("b", "x"), ("c", "${nope}")]);
        let once = PropertyResolver::new(&props).resolve_table().unwrap();
        let twice = PropertyResolver::new(&once).resolve_table().unwrap();
        assert_eq!(once, twice);
        assert_eq!(once.get("a"), Some("x"));
        assert_eq!(once.get("c"), Some("${nope}"));
    }

    #[test]
    fn test_overlay_child_wins() {
        let mut parent = table(&[("foo", "0"), ("bar", "2")]);
        parent.overlay(&table(&[("foo", "1")]));
        assert_eq!(parent.get("foo"), Some("1"));
        assert_eq!(parent.get("bar"), Some("2"));
    }
}
