//! URL patterns, templates and base-URL resolution
//!
//! A [`UrlPattern`] is what registries match incoming requests against:
//! - `Regex` is tested against the raw request URL string
//! - `Template` is matched structurally (`:param` placeholders, trailing `*`)
//! - `Exact` compares strings, after resolving the pattern against the base
//!   URL when a [`UrlResolver`] is supplied

use crate::error::FetchpError;
use matchit::Router;
use regex::Regex;
use std::collections::HashMap;
use url::Url;

/// Resolves possibly-relative URLs against an optional base URL
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlResolver {
    base: Option<Url>,
}

impl UrlResolver {
    pub fn new(base: Option<Url>) -> Self {
        Self { base }
    }

    /// Parse `base` and build a resolver around it
    pub fn parse(base: &str) -> Result<Self, FetchpError> {
        let base = Url::parse(base).map_err(|source| FetchpError::InvalidUrl {
            url: base.to_string(),
            source,
        })?;
        Ok(Self::new(Some(base)))
    }

    pub fn base(&self) -> Option<&Url> {
        self.base.as_ref()
    }

    /// Resolve `input` the way a browser's `new URL(input, base)` does
    ///
    /// Absolute inputs ignore the base entirely.
    pub fn resolve(&self, input: &str) -> Result<Url, FetchpError> {
        let resolved = match &self.base {
            Some(base) => base.join(input),
            None => Url::parse(input),
        };

        resolved.map_err(|source| FetchpError::InvalidUrl {
            url: input.to_string(),
            source,
        })
    }
}

/// A URL pattern with `:param` placeholders
///
/// `https://api.example.com/users/:id` matches scheme, host and port exactly
/// and the path structurally. A path-only template such as `/users/:id/*`
/// matches the path of any origin. Query strings and fragments are ignored.
#[derive(Debug, Clone)]
pub struct UrlTemplate {
    source: String,
    origin: Option<Url>,
    path: String,
    router: Router<()>,
}

impl UrlTemplate {
    /// Compile a template
    pub fn new(template: &str) -> Result<Self, FetchpError> {
        let invalid = |reason: String| FetchpError::InvalidTemplate {
            template: template.to_string(),
            reason,
        };

        let (origin, path) = match template.find("://") {
            Some(scheme_end) => {
                let path_start = template[scheme_end + 3..]
                    .find('/')
                    .map(|i| scheme_end + 3 + i)
                    .unwrap_or(template.len());
                let origin = Url::parse(&template[..path_start])
                    .map_err(|e| invalid(format!("invalid origin: {e}")))?;
                let path = match &template[path_start..] {
                    "" => "/",
                    p => p,
                };
                (Some(origin), path.to_string())
            }
            None if template.starts_with('/') => (None, template.to_string()),
            None => return Err(invalid("must be absolute or start with '/'".to_string())),
        };

        let route = to_route(&path);
        let mut router = Router::new();
        router
            .insert(route, ())
            .map_err(|e| invalid(e.to_string()))?;

        Ok(Self {
            source: template.to_string(),
            origin,
            path,
            router,
        })
    }

    /// The template text as given to [`UrlTemplate::new`]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Match `url`, returning the captured parameters on success
    ///
    /// A trailing `*` is captured under the name `*`.
    pub fn captures(&self, url: &Url) -> Option<HashMap<String, String>> {
        if let Some(origin) = &self.origin {
            let same_origin = origin.scheme() == url.scheme()
                && origin.host_str() == url.host_str()
                && origin.port_or_known_default() == url.port_or_known_default();
            if !same_origin {
                return None;
            }
        }

        let matched = self.router.at(url.path()).ok()?;
        Some(
            matched
                .params
                .iter()
                .map(|(name, value)| {
                    let name = if name == WILDCARD_PARAM { "*" } else { name };
                    (name.to_string(), value.to_string())
                })
                .collect(),
        )
    }

    /// True when `url` matches this template
    pub fn is_match(&self, url: &Url) -> bool {
        self.captures(url).is_some()
    }

    /// Render a concrete URL by substituting every `:param`
    ///
    /// Fails when a placeholder has no value in `params`.
    pub fn expand(&self, params: &HashMap<String, String>) -> Result<String, FetchpError> {
        let mut segments = Vec::new();
        for segment in self.path.split('/') {
            let rendered = match placeholder(segment) {
                Some((name, rest)) => {
                    let value = params.get(name).ok_or_else(|| FetchpError::InvalidTemplate {
                        template: self.source.clone(),
                        reason: format!("missing value for ':{name}'"),
                    })?;
                    format!("{value}{rest}")
                }
                None if segment == "*" => params.get("*").cloned().unwrap_or_default(),
                None => segment.to_string(),
            };
            segments.push(rendered);
        }

        let path = segments.join("/");
        Ok(match &self.origin {
            Some(origin) => format!("{}{}", origin.as_str().trim_end_matches('/'), path),
            None => path,
        })
    }
}

impl std::fmt::Display for UrlTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

const WILDCARD_PARAM: &str = "__wildcard";

/// Split `:name.rest` into (`name`, `.rest`)
fn placeholder(segment: &str) -> Option<(&str, &str)> {
    let name = segment.strip_prefix(':')?;
    let end = name
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(name.len());
    if end == 0 {
        return None;
    }
    Some((&name[..end], &name[end..]))
}

/// Translate template path syntax into a router route
fn to_route(path: &str) -> String {
    let mut segments: Vec<String> = path
        .split('/')
        .map(|segment| match placeholder(segment) {
            Some((name, rest)) => format!("{{{name}}}{}", escape_braces(rest)),
            None => escape_braces(segment),
        })
        .collect();

    if let Some(last) = segments.last_mut() {
        if last == "*" {
            *last = format!("{{*{WILDCARD_PARAM}}}");
        }
    }

    segments.join("/")
}

fn escape_braces(segment: &str) -> String {
    segment.replace('{', "{{").replace('}', "}}")
}

/// What a registry entry matches URLs against
#[derive(Debug, Clone)]
pub enum UrlPattern {
    /// Exact string, resolved against the base URL when one is in effect
    Exact(String),
    /// Regular expression tested against the raw URL string
    Regex(Regex),
    /// Structural template match
    Template(UrlTemplate),
}

impl UrlPattern {
    /// Test `url` (the request's absolute URL string)
    pub fn matches(&self, url: &str, resolver: Option<&UrlResolver>) -> bool {
        match self {
            UrlPattern::Regex(regex) => regex.is_match(url),
            UrlPattern::Template(template) => Url::parse(url)
                .map(|parsed| template.is_match(&parsed))
                .unwrap_or(false),
            UrlPattern::Exact(pattern) => match resolver {
                Some(resolver) => resolver
                    .resolve(pattern)
                    .map(|resolved| resolved.as_str() == url)
                    .unwrap_or(false),
                None => pattern == url,
            },
        }
    }
}

impl From<&str> for UrlPattern {
    fn from(pattern: &str) -> Self {
        UrlPattern::Exact(pattern.to_string())
    }
}

impl From<String> for UrlPattern {
    fn from(pattern: String) -> Self {
        UrlPattern::Exact(pattern)
    }
}

impl From<&Url> for UrlPattern {
    fn from(url: &Url) -> Self {
        UrlPattern::Exact(url.as_str().to_string())
    }
}

impl From<Regex> for UrlPattern {
    fn from(regex: Regex) -> Self {
        UrlPattern::Regex(regex)
    }
}

impl From<UrlTemplate> for UrlPattern {
    fn from(template: UrlTemplate) -> Self {
        UrlPattern::Template(template)
    }
}
