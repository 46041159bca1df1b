//! Ordered method + URL pattern collection
//!
//! Design: entries are matched in insertion order, so callers that only
//! want one result get the earliest-added match. Reads never mutate.

use crate::types::Request;
use crate::uris::{UrlPattern, UrlResolver};
use reqwest::Method;

/// Set of HTTP methods an entry applies to
///
/// Comparison is case-sensitive, against the request method as sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MethodSet(Vec<String>);

impl MethodSet {
    pub fn contains(&self, method: &str) -> bool {
        self.0.iter().any(|m| m == method)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl From<&str> for MethodSet {
    fn from(method: &str) -> Self {
        MethodSet(vec![method.to_string()])
    }
}

impl From<String> for MethodSet {
    fn from(method: String) -> Self {
        MethodSet(vec![method])
    }
}

impl From<Method> for MethodSet {
    fn from(method: Method) -> Self {
        MethodSet(vec![method.as_str().to_string()])
    }
}

impl From<&[&str]> for MethodSet {
    fn from(methods: &[&str]) -> Self {
        MethodSet(methods.iter().map(|m| m.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for MethodSet {
    fn from(methods: [&str; N]) -> Self {
        MethodSet(methods.iter().map(|m| m.to_string()).collect())
    }
}

impl From<Vec<&str>> for MethodSet {
    fn from(methods: Vec<&str>) -> Self {
        MethodSet(methods.into_iter().map(str::to_string).collect())
    }
}

impl From<Vec<String>> for MethodSet {
    fn from(methods: Vec<String>) -> Self {
        MethodSet(methods)
    }
}

/// One (methods, pattern, payload) entry
#[derive(Debug, Clone)]
pub struct UrlCollectionItem<T> {
    pub methods: MethodSet,
    pub pattern: UrlPattern,
    pub data: T,
}

impl<T> UrlCollectionItem<T> {
    fn matches(&self, method: &str, url: &str, resolver: Option<&UrlResolver>) -> bool {
        self.methods.contains(method) && self.pattern.matches(url, resolver)
    }
}

/// Ordered collection of URL-keyed entries
#[derive(Debug, Clone)]
pub struct UrlCollection<T> {
    items: Vec<UrlCollectionItem<T>>,
}

impl<T> Default for UrlCollection<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> UrlCollection<T> {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Append an entry
    pub fn add(
        &mut self,
        methods: impl Into<MethodSet>,
        pattern: impl Into<UrlPattern>,
        data: T,
    ) {
        self.items.push(UrlCollectionItem {
            methods: methods.into(),
            pattern: pattern.into(),
            data,
        });
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[UrlCollectionItem<T>] {
        &self.items
    }

    /// All entries matching `method` and `url`, in insertion order
    pub fn filter(
        &self,
        method: &str,
        url: &str,
        resolver: Option<&UrlResolver>,
    ) -> Vec<&UrlCollectionItem<T>> {
        self.items
            .iter()
            .filter(|item| item.matches(method, url, resolver))
            .collect()
    }

    /// [`UrlCollection::filter`] keyed by the request's method and URL
    pub fn filter_by_request(
        &self,
        request: &Request,
        resolver: Option<&UrlResolver>,
    ) -> Vec<&UrlCollectionItem<T>> {
        self.filter(request.method().as_str(), request.url().as_str(), resolver)
    }

    /// Earliest-added entry matching `request`
    pub fn first_by_request(
        &self,
        request: &Request,
        resolver: Option<&UrlResolver>,
    ) -> Option<&UrlCollectionItem<T>> {
        let method = request.method().as_str();
        let url = request.url().as_str();
        self.items
            .iter()
            .find(|item| item.matches(method, url, resolver))
    }
}
