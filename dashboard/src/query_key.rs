use std::collections::BTreeMap;
use std::fmt;

/// Identity of a cached response: a resource path plus its effective parameters.
///
/// Parameters are kept sorted by name and empty values are dropped, so two
/// requests that differ only in parameter order, or in an empty filter
/// versus an absent one, share a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey {
    path: String,
    params: BTreeMap<String, String>,
}

impl QueryKey {
    pub fn new<I, K, V>(path: impl Into<String>, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let params = params
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .filter(|(_, v)| !v.trim().is_empty())
            .collect();
        Self {
            path: path.into(),
            params,
        }
    }

    pub fn path_only(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            params: BTreeMap::new(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn params(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// First path segment after the `/api` prefix (`products` for
    /// `/api/products/7`). Bounded by the route table, unlike the path.
    pub fn resource(&self) -> &str {
        let mut segments = self.path.split('/').filter(|s| !s.is_empty());
        match segments.next() {
            Some("api") => segments.next().unwrap_or("api"),
            Some(first) => first,
            None => "",
        }
    }

    pub fn has_path(&self, path: &str) -> bool {
        self.path == path
    }

    /// Canonical `a=1&b=2` form, values percent-encoded.
    pub fn to_query_string(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.params.iter())
            .finish()
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.params.is_empty() {
            write!(f, "{}", self.path)
        } else {
            write!(f, "{}?{}", self.path, self.to_query_string())
        }
    }
}
