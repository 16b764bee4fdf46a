//! Lookup derivation for nested resources.
//!
//! A nested URL such as `/blogs/<blog_pk>/posts/<post_pk>/comments/` names the
//! ancestors of the collection it serves, outermost first. This module turns the
//! relation chain declared for a view (`["blog", "post"]`) and the URL keyword
//! chain (`["blog_pk", "post_pk"]`) into a [`FilterMapping`]:
//!
//! ```
//! use hierarchical_views::lookup::{build_filter_mapping, derive_filter_keys, extract_ancestor_ids, UrlKwargs};
//!
//! let kwargs: UrlKwargs = [("blog_pk", "1"), ("post_pk", "2")].into_iter().collect();
//! let keys = derive_filter_keys(&["blog", "post"]);
//! let ids = extract_ancestor_ids(&["blog_pk", "post_pk"], &kwargs);
//! let mapping = build_filter_mapping(keys, ids);
//!
//! assert_eq!(mapping.get("blog__post"), Some(Some("1")));
//! assert_eq!(mapping.get("post"), Some(Some("2")));
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Separator between relation names in a lookup path.
pub const LOOKUP_SEP: &str = "__";

/// URL keyword arguments captured by the host router for the current request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UrlKwargs(HashMap<String, String>);

impl UrlKwargs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<HashMap<String, String>> for UrlKwargs {
    fn from(map: HashMap<String, String>) -> Self {
        Self(map)
    }
}

impl<K, V> FromIterator<(K, V)> for UrlKwargs
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Ordered lookup-path to ancestor-id pairs for one request.
///
/// Entries keep the order they were derived in (outermost ancestor first).
/// A `None` value is an ancestor id that was absent from the URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterMapping {
    entries: Vec<(String, Option<String>)>,
}

impl FilterMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a lookup, replacing the value of an existing entry with the same key.
    pub fn insert(&mut self, key: impl Into<String>, value: Option<String>) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Value recorded for `key`: `None` when the key is not present,
    /// `Some(None)` when it is present with an absent ancestor id.
    pub fn get(&self, key: &str) -> Option<Option<&str>> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_deref())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_deref()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Option<String>)> for FilterMapping {
    fn from_iter<I: IntoIterator<Item = (K, Option<String>)>>(iter: I) -> Self {
        let mut mapping = FilterMapping::new();
        for (key, value) in iter {
            mapping.insert(key, value);
        }
        mapping
    }
}

impl IntoIterator for FilterMapping {
    type Item = (String, Option<String>);
    type IntoIter = std::vec::IntoIter<(String, Option<String>)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Derive the cumulative lookup keys for a relation chain.
///
/// The chain is ordered outermost ancestor to immediate parent. The result has
/// one key per relation, in the same order: the first key is the whole chain
/// joined with [`LOOKUP_SEP`], each following key drops the outermost segment,
/// and the last key is the innermost relation alone.
///
/// ```
/// use hierarchical_views::lookup::derive_filter_keys;
///
/// assert_eq!(derive_filter_keys(&["a", "b", "c"]), vec!["a__b__c", "b__c", "c"]);
/// ```
///
/// An empty chain yields no keys; callers that require a chain check for it
/// first (see [`crate::Hierarchical::get_relation_names`]).
pub fn derive_filter_keys<S: AsRef<str>>(relation_names: &[S]) -> Vec<String> {
    let mut keys = Vec::with_capacity(relation_names.len());
    let mut cumulative = String::new();
    for relation_name in relation_names.iter().rev() {
        cumulative = if cumulative.is_empty() {
            relation_name.as_ref().to_string()
        } else {
            format!("{}{}{}", relation_name.as_ref(), LOOKUP_SEP, cumulative)
        };
        keys.push(cumulative.clone());
    }
    keys.reverse();
    keys
}

/// Look up each URL keyword in `kwargs`, preserving the chain order.
///
/// Keywords missing from the request yield `None`.
pub fn extract_ancestor_ids<S: AsRef<str>>(
    pk_url_kwargs: &[S],
    kwargs: &UrlKwargs,
) -> Vec<Option<String>> {
    pk_url_kwargs
        .iter()
        .map(|name| kwargs.get(name.as_ref()).map(str::to_string))
        .collect()
}

/// Pair lookup keys with ancestor ids positionally.
///
/// Pairing stops at the shorter of the two sequences.
pub fn build_filter_mapping<K, V>(keys: K, ids: V) -> FilterMapping
where
    K: IntoIterator<Item = String>,
    V: IntoIterator<Item = Option<String>>,
{
    keys.into_iter().zip(ids).collect()
}

/// Split a lookup path into its relation segments.
pub fn split_lookup(lookup: &str) -> Vec<&str> {
    lookup.split(LOOKUP_SEP).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_filter_keys_single() {
        assert_eq!(derive_filter_keys(&["a"]), vec!["a"]);
    }

    #[test]
    fn test_derive_filter_keys_pair() {
        assert_eq!(derive_filter_keys(&["a", "b"]), vec!["a__b", "b"]);
    }

    #[test]
    fn test_derive_filter_keys_triple() {
        assert_eq!(
            derive_filter_keys(&["a", "b", "c"]),
            vec!["a__b__c", "b__c", "c"]
        );
    }

    #[test]
    fn test_derive_filter_keys_shape_for_longer_chains() {
        let chain = ["org", "team", "project", "board", "card"];
        let keys = derive_filter_keys(&chain);

        assert_eq!(keys.len(), chain.len());
        assert_eq!(keys.first().map(String::as_str), Some("org__team__project__board__card"));
        assert_eq!(keys.last().map(String::as_str), Some("card"));
        for (i, key) in keys.iter().enumerate() {
            assert_eq!(split_lookup(key), chain[i..].to_vec());
        }
    }

    #[test]
    fn test_derive_filter_keys_empty() {
        let empty: [&str; 0] = [];
        assert!(derive_filter_keys(&empty).is_empty());
    }

    #[test]
    fn test_extract_ancestor_ids_in_chain_order() {
        let kwargs: UrlKwargs = [("pk_b", "2"), ("pk_a", "1")].into_iter().collect();
        assert_eq!(
            extract_ancestor_ids(&["pk_a", "pk_b"], &kwargs),
            vec![Some("1".to_string()), Some("2".to_string())]
        );
    }

    #[test]
    fn test_extract_ancestor_ids_missing_keyword_is_none() {
        let kwargs: UrlKwargs = [("pk_a", "1")].into_iter().collect();
        assert_eq!(
            extract_ancestor_ids(&["pk_a", "pk_b"], &kwargs),
            vec![Some("1".to_string()), None]
        );
    }

    #[test]
    fn test_build_filter_mapping_pairs_positionally() {
        let mapping = build_filter_mapping(
            derive_filter_keys(&["a", "b"]),
            vec![Some("1".to_string()), Some("2".to_string())],
        );
        assert_eq!(mapping.len(), 2);
        assert_eq!(mapping.get("a__b"), Some(Some("1")));
        assert_eq!(mapping.get("b"), Some(Some("2")));
        assert_eq!(mapping.keys().collect::<Vec<_>>(), vec!["a__b", "b"]);
    }

    #[test]
    fn test_build_filter_mapping_truncates_to_shorter() {
        let mapping = build_filter_mapping(
            derive_filter_keys(&["a", "b", "c"]),
            vec![Some("1".to_string())],
        );
        assert_eq!(mapping.len(), 1);
        assert_eq!(mapping.get("a__b__c"), Some(Some("1")));
        assert_eq!(mapping.get("c"), None);
    }

    #[test]
    fn test_filter_mapping_insert_replaces_existing_key() {
        let mut mapping = FilterMapping::new();
        mapping.insert("post", Some("1".to_string()));
        mapping.insert("post", None);
        assert_eq!(mapping.len(), 1);
        assert_eq!(mapping.get("post"), Some(None));
    }

    #[test]
    fn test_url_kwargs_deserialize_from_router_params() {
        let kwargs: UrlKwargs = serde_json::from_str(r#"{"blog_pk": "7"}"#).unwrap();
        assert_eq!(kwargs.get("blog_pk"), Some("7"));
        assert_eq!(kwargs.get("post_pk"), None);
    }
}
