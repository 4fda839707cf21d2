use ahash::{HashMap, HashMapExt};

/// The XPath functions namespace.
pub const FN_NAMESPACE: &str = "http://www.w3.org/2005/xpath-functions";
/// The XML Schema namespace.
pub const XS_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";
/// The XSLT namespace.
pub const XSLT_NAMESPACE: &str = "http://www.w3.org/1999/XSL/Transform";
const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

const STATIC_NAMESPACES: [(&str, &str); 4] = [
    ("xs", XS_NAMESPACE),
    ("fn", FN_NAMESPACE),
    ("xsl", XSLT_NAMESPACE),
    ("err", "http://www.w3.org/2005/xqt-errors"),
];

/// The statically known namespaces of a compilation.
#[derive(Debug, Clone)]
pub struct Namespaces {
    namespaces: HashMap<String, String>,
    default_element_namespace: String,
    default_function_namespace: String,
}

impl Namespaces {
    /// Construct namespaces from an explicit prefix map and defaults.
    pub fn new(
        namespaces: HashMap<String, String>,
        default_element_namespace: &str,
        default_function_namespace: &str,
    ) -> Self {
        Self {
            namespaces,
            default_element_namespace: default_element_namespace.to_string(),
            default_function_namespace: default_function_namespace.to_string(),
        }
    }

    /// The namespace bindings every compilation starts with.
    pub fn default_namespaces() -> HashMap<String, String> {
        let mut namespaces = HashMap::new();
        namespaces.insert("xml".to_string(), XML_NAMESPACE.to_string());
        for (prefix, uri) in STATIC_NAMESPACES.into_iter() {
            namespaces.insert(prefix.to_string(), uri.to_string());
        }
        namespaces
    }

    /// Add bindings; an empty prefix sets the default element namespace.
    pub fn add(&mut self, namespace_pairs: &[(&str, &str)]) {
        for (prefix, namespace) in namespace_pairs {
            if prefix.is_empty() {
                self.default_element_namespace = namespace.to_string();
            } else {
                self.namespaces
                    .insert(prefix.to_string(), namespace.to_string());
            }
        }
    }

    /// Look up a namespace by prefix.
    #[inline]
    pub fn by_prefix(&self, prefix: &str) -> Option<&str> {
        self.namespaces.get(prefix).map(|s| s.as_str())
    }

    /// The default namespace for unprefixed element names.
    #[inline]
    pub fn default_element_namespace(&self) -> &str {
        &self.default_element_namespace
    }

    /// The default namespace for unprefixed function names.
    #[inline]
    pub fn default_function_namespace(&self) -> &str {
        &self.default_function_namespace
    }
}

impl Default for Namespaces {
    fn default() -> Self {
        Self::new(Self::default_namespaces(), "", FN_NAMESPACE)
    }
}

/// Anything that can resolve a prefix to a namespace URI.
pub trait NamespaceLookup {
    /// Look up a namespace by prefix.
    fn by_prefix(&self, prefix: &str) -> Option<&str>;
}

impl NamespaceLookup for Namespaces {
    fn by_prefix(&self, prefix: &str) -> Option<&str> {
        Namespaces::by_prefix(self, prefix)
    }
}

impl<T: NamespaceLookup> NamespaceLookup for &T {
    fn by_prefix(&self, prefix: &str) -> Option<&str> {
        (**self).by_prefix(prefix)
    }
}
