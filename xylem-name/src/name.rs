use crate::namespaces::NamespaceLookup;

/// An expanded QName.
///
/// The prefix is retained for diagnostics and serialization but is ignored
/// for equality and hashing; two names are the same name when their local
/// part and namespace agree.
#[derive(Debug, Clone, Eq)]
pub struct Name {
    local: String,
    prefix: Option<String>,
    namespace: Option<String>,
}

// a custom hasher that ignores the prefix
impl std::hash::Hash for Name {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.local.hash(state);
        self.namespace.hash(state);
    }
}

// and partial eq that ignores the prefix
impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        self.local == other.local && self.namespace == other.namespace
    }
}

impl Name {
    /// Construct a name from its parts.
    pub fn new(local: String, namespace: Option<String>, prefix: Option<String>) -> Self {
        Name {
            local,
            namespace,
            prefix,
        }
    }

    /// Construct a name by resolving a prefix against in-scope namespaces.
    ///
    /// Returns `None` if the prefix has no binding.
    pub fn prefixed(prefix: &str, local: &str, namespaces: impl NamespaceLookup) -> Option<Self> {
        let namespace = namespaces.by_prefix(prefix)?;
        Some(Name {
            local: local.to_string(),
            namespace: Some(namespace.to_string()),
            prefix: Some(prefix.to_string()),
        })
    }

    /// Construct a name without prefix or namespace.
    pub fn unprefixed(local: &str) -> Self {
        Name {
            local: local.to_string(),
            namespace: None,
            prefix: None,
        }
    }

    /// Construct a name in a namespace without a prefix.
    pub fn uri_qualified(uri: &str, local: &str) -> Self {
        Name {
            local: local.to_string(),
            namespace: Some(uri.to_string()),
            prefix: None,
        }
    }

    /// Apply a default namespace to a name without one.
    pub fn with_default_namespace(self, uri: Option<&str>) -> Self {
        if let Some(uri) = uri {
            if self.namespace.is_none() && !uri.is_empty() {
                return Name {
                    local: self.local,
                    namespace: Some(uri.to_string()),
                    prefix: None,
                };
            }
        }
        self
    }

    /// The prefix, if any.
    #[inline]
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// The namespace URI, if any.
    #[inline]
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// The local part.
    #[inline]
    pub fn local_name(&self) -> &str {
        &self.local
    }

    /// The lexical form, `prefix:local` or just `local`.
    pub fn to_full_name(&self) -> String {
        if let Some(prefix) = &self.prefix {
            if !prefix.is_empty() {
                return format!("{}:{}", prefix, self.local);
            }
        }
        self.local.clone()
    }

    /// The `Q{uri}local` form used in error messages.
    pub fn to_uri_qualified_name(&self) -> String {
        if let Some(namespace) = &self.namespace {
            format!("Q{{{}}}{}", namespace, self.local)
        } else {
            self.local.clone()
        }
    }
}

impl std::fmt::Display for Name {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_full_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eq_ignores_prefix() {
        let a = Name::new("foo".to_string(), Some("http://ns".to_string()), None);
        let b = Name::new(
            "foo".to_string(),
            Some("http://ns".to_string()),
            Some("p".to_string()),
        );
        assert_eq!(a, b);
    }

    #[test]
    fn test_ne_different_namespace() {
        let a = Name::uri_qualified("http://a", "foo");
        let b = Name::uri_qualified("http://b", "foo");
        assert_ne!(a, b);
    }

    #[test]
    fn test_default_namespace_only_applies_when_absent() {
        let a = Name::unprefixed("foo").with_default_namespace(Some("http://d"));
        assert_eq!(a.namespace(), Some("http://d"));
        let b = Name::uri_qualified("http://a", "foo").with_default_namespace(Some("http://d"));
        assert_eq!(b.namespace(), Some("http://a"));
    }
}
