use std::cmp::Ordering;
use std::collections::hash_map::Entry;
use std::rc::Rc;

use ahash::{HashMap, HashMapExt};
use icu::collator::{CaseFirst, Collator, CollatorOptions, Strength};
use icu::locid::Locale;
use iri_string::types::IriString;

use crate::error;

/// The codepoint collation URI, the default collation.
pub const CODEPOINT_URI: &str = "http://www.w3.org/2005/xpath-functions/collation/codepoint";

#[derive(Debug, Clone, PartialEq, Eq)]
enum CaseOrder {
    UpperFirst,
    LowerFirst,
    Default,
}

// the recognized query keys of a */collation URI
#[derive(Debug, Clone)]
struct CollationSpec {
    lang: Option<String>,
    strength: Option<Strength>,
    case_order: CaseOrder,
    alphanumeric: bool,
    ignore_case: bool,
    ignore_modifiers: bool,
}

impl CollationSpec {
    fn from_query(query: &str) -> error::Result<Self> {
        let mut lang = None;
        let mut strength = None;
        let mut case_order = CaseOrder::Default;
        let mut alphanumeric = false;
        let mut ignore_case = false;
        let mut ignore_modifiers = false;

        // keys are semicolon separated; the last occurrence wins
        for (key, value) in parse_collation_query(query) {
            match key {
                "lang" => {
                    lang = Some(value.to_string());
                }
                "strength" => {
                    strength = Some(strength_query_parameter(value)?);
                }
                "case-order" => {
                    case_order = match value {
                        "upper-first" => CaseOrder::UpperFirst,
                        "lower-first" => CaseOrder::LowerFirst,
                        "#default" => CaseOrder::Default,
                        _ => return Err(error::Error::XTDE1035),
                    };
                }
                "alphanumeric" => {
                    alphanumeric = yes_no_query_parameter(value)?;
                }
                "ignore-case" => {
                    ignore_case = yes_no_query_parameter(value)?;
                }
                "ignore-modifiers" => {
                    ignore_modifiers = yes_no_query_parameter(value)?;
                }
                "decomposition" => {
                    // recognized for compatibility; icu always normalizes
                    if !matches!(value, "none" | "standard" | "full") {
                        return Err(error::Error::XTDE1035);
                    }
                }
                "ignore-width" | "class" | "rules" => {
                    // recognized but not supported; ignored rather than fatal
                }
                _ => {
                    // unrecognized keys are ignored
                }
            }
        }
        Ok(CollationSpec {
            lang,
            strength,
            case_order,
            alphanumeric,
            ignore_case,
            ignore_modifiers,
        })
    }

    fn effective_strength(&self) -> Strength {
        if let Some(strength) = self.strength {
            return strength;
        }
        if self.ignore_modifiers {
            return Strength::Primary;
        }
        if self.ignore_case {
            return Strength::Secondary;
        }
        Strength::Tertiary
    }
}

fn parse_collation_query(s: &str) -> impl Iterator<Item = (&str, &str)> {
    // the URI format uses semicolon separated parameters, as & is already
    // taken in XML attribute values
    s.split(';').filter_map(|part| {
        let mut parts = part.split('=');
        let key = parts.next()?;
        let value = parts.next()?;
        Some((key, value))
    })
}

fn yes_no_query_parameter(value: &str) -> error::Result<bool> {
    match value {
        "yes" => Ok(true),
        "no" => Ok(false),
        _ => Err(error::Error::XTDE1035),
    }
}

fn strength_query_parameter(value: &str) -> error::Result<Strength> {
    match value {
        "primary" => Ok(Strength::Primary),
        "secondary" => Ok(Strength::Secondary),
        "tertiary" => Ok(Strength::Tertiary),
        "identical" => Ok(Strength::Identical),
        _ => Err(error::Error::XTDE1035),
    }
}

// language = the entire tag before the first hyphen, or the whole tag
// when it has no hyphen
fn locale_for_lang(lang: &str) -> Locale {
    match Locale::try_from_bytes(lang.as_bytes()) {
        Ok(locale) => locale,
        Err(_) => {
            let language = lang.split('-').next().unwrap_or(lang);
            Locale::try_from_bytes(language.as_bytes()).unwrap_or(Locale::UND)
        }
    }
}

/// A string collation.
pub enum Collation {
    /// Unicode codepoint order.
    CodePoint,
    /// A locale-driven collator.
    Uca(Box<Collator>),
    /// ASCII case-insensitive comparison.
    AsciiCaseBlind,
    /// Alpha runs by the base collation, digit runs numerically.
    Alphanumeric(Rc<Collation>),
}

impl std::fmt::Debug for Collation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Collation::CodePoint => write!(f, "Collation::CodePoint"),
            Collation::Uca(_) => write!(f, "Collation::Uca"),
            Collation::AsciiCaseBlind => write!(f, "Collation::AsciiCaseBlind"),
            Collation::Alphanumeric(base) => write!(f, "Collation::Alphanumeric({:?})", base),
        }
    }
}

impl Collation {
    /// Resolve a collation URI.
    ///
    /// `http://<host>/collation` selects the platform default; query
    /// parameters refine it. The W3C codepoint URI is recognized as well.
    pub fn resolve(uri: &str) -> error::Result<Self> {
        if uri == CODEPOINT_URI {
            return Ok(Collation::CodePoint);
        }
        let iri: IriString = uri.try_into().map_err(|_| error::Error::XTDE1035)?;
        if !iri.path_str().ends_with("/collation") {
            return Err(error::Error::XTDE1035);
        }
        let spec = CollationSpec::from_query(iri.query_str().unwrap_or(""))?;
        let base = if spec.lang.is_none()
            && spec.strength.is_none()
            && spec.case_order == CaseOrder::Default
            && !spec.ignore_modifiers
        {
            if spec.ignore_case {
                Collation::AsciiCaseBlind
            } else {
                // the platform default collation
                Collation::CodePoint
            }
        } else {
            Collation::Uca(Box::new(Self::collator(&spec)?))
        };
        Ok(if spec.alphanumeric {
            Collation::Alphanumeric(Rc::new(base))
        } else {
            base
        })
    }

    fn collator(spec: &CollationSpec) -> error::Result<Collator> {
        let locale = match &spec.lang {
            Some(lang) => locale_for_lang(lang),
            None => Locale::UND,
        };
        let mut options = CollatorOptions::new();
        options.strength = Some(spec.effective_strength());
        options.case_first = Some(match spec.case_order {
            CaseOrder::UpperFirst => CaseFirst::UpperFirst,
            CaseOrder::LowerFirst => CaseFirst::LowerFirst,
            CaseOrder::Default => CaseFirst::Off,
        });
        Collator::try_new(&locale.into(), options).map_err(|_| error::Error::XTDE1035)
    }

    /// Compare two strings under this collation.
    pub fn compare(&self, a: &str, b: &str) -> Ordering {
        match self {
            Collation::CodePoint => a.cmp(b),
            Collation::Uca(collator) => collator.compare(a, b),
            Collation::AsciiCaseBlind => a.to_ascii_lowercase().cmp(&b.to_ascii_lowercase()),
            Collation::Alphanumeric(base) => alphanumeric_compare(base, a, b),
        }
    }

    /// Whether two strings are equal under this collation.
    pub fn equals(&self, a: &str, b: &str) -> bool {
        self.compare(a, b) == Ordering::Equal
    }

}

// alternate non-digit and digit runs; digit runs compare by value
fn alphanumeric_compare(base: &Collation, a: &str, b: &str) -> Ordering {
    let mut a_runs = split_runs(a);
    let mut b_runs = split_runs(b);
    loop {
        match (a_runs.next(), b_runs.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(run_a), Some(run_b)) => {
                let ordering = match (run_a, run_b) {
                    (Run::Digits(x), Run::Digits(y)) => compare_numeric_runs(x, y),
                    (Run::Text(x), Run::Text(y)) => base.compare(x, y),
                    // a digit run sorts before a text run
                    (Run::Digits(_), Run::Text(_)) => Ordering::Less,
                    (Run::Text(_), Run::Digits(_)) => Ordering::Greater,
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
        }
    }
}

#[derive(Debug, PartialEq)]
enum Run<'a> {
    Text(&'a str),
    Digits(&'a str),
}

fn split_runs(s: &str) -> impl Iterator<Item = Run<'_>> {
    let mut rest = s;
    std::iter::from_fn(move || {
        if rest.is_empty() {
            return None;
        }
        let first_is_digit = rest.chars().next().unwrap().is_ascii_digit();
        let split = rest
            .char_indices()
            .find(|(_, c)| c.is_ascii_digit() != first_is_digit)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let (run, remainder) = rest.split_at(split);
        rest = remainder;
        Some(if first_is_digit {
            Run::Digits(run)
        } else {
            Run::Text(run)
        })
    })
}

fn compare_numeric_runs(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// An opaque collation key.
///
/// Keys compare equal exactly when the originating collation compares the
/// source strings equal.
#[derive(Debug, Clone)]
pub enum CollationKey {
    Bytes(Vec<u8>),
    Collated(Rc<Collation>, String),
}

impl CollationKey {
    /// The key of a string under a collation.
    pub fn new(collation: &Rc<Collation>, s: &str) -> CollationKey {
        match collation.as_ref() {
            Collation::CodePoint => CollationKey::Bytes(s.as_bytes().to_vec()),
            Collation::AsciiCaseBlind => {
                CollationKey::Bytes(s.to_ascii_lowercase().into_bytes())
            }
            // icu does not expose binary sort keys; the key closes over
            // the collation and compares through it
            _ => CollationKey::Collated(collation.clone(), s.to_string()),
        }
    }
}

impl PartialEq for CollationKey {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (CollationKey::Bytes(a), CollationKey::Bytes(b)) => a == b,
            (CollationKey::Collated(collation, a), CollationKey::Collated(_, b)) => {
                collation.equals(a, b)
            }
            _ => false,
        }
    }
}

impl Eq for CollationKey {}

impl std::hash::Hash for CollationKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        match self {
            CollationKey::Bytes(bytes) => bytes.hash(state),
            // collated keys cannot hash consistently with collation
            // equality; they all share a bucket and rely on eq
            CollationKey::Collated(_, _) => 0u8.hash(state),
        }
    }
}

/// A cache of resolved collations, keyed by URI.
#[derive(Debug, Default)]
pub struct Collations {
    collations: HashMap<String, Rc<Collation>>,
}

impl Collations {
    pub fn new() -> Self {
        Self {
            collations: HashMap::new(),
        }
    }

    /// Resolve a URI, caching the result.
    pub fn load(&mut self, uri: &str) -> error::Result<Rc<Collation>> {
        match self.collations.entry(uri.to_string()) {
            Entry::Occupied(entry) => Ok(entry.get().clone()),
            Entry::Vacant(entry) => {
                let collation = Collation::resolve(uri)?;
                Ok(entry.insert(Rc::new(collation)).clone())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codepoint_uri() {
        let collation = Collation::resolve(CODEPOINT_URI).unwrap();
        assert_eq!(collation.compare("a", "b"), Ordering::Less);
        assert!(collation.equals("a", "a"));
    }

    #[test]
    fn test_plain_collation_uri_is_default() {
        let collation = Collation::resolve("http://example.com/collation").unwrap();
        assert!(matches!(collation, Collation::CodePoint));
    }

    #[test]
    fn test_unknown_uri_rejected() {
        assert_eq!(
            Collation::resolve("http://example.com/other").err(),
            Some(error::Error::XTDE1035)
        );
    }

    #[test]
    fn test_invalid_value_rejected() {
        assert_eq!(
            Collation::resolve("http://example.com/collation?strength=nonsense").err(),
            Some(error::Error::XTDE1035)
        );
        assert_eq!(
            Collation::resolve("http://example.com/collation?ignore-case=maybe").err(),
            Some(error::Error::XTDE1035)
        );
    }

    #[test]
    fn test_unknown_keys_ignored() {
        assert!(Collation::resolve("http://example.com/collation?future=thing").is_ok());
    }

    #[test]
    fn test_ignore_case() {
        let collation =
            Collation::resolve("http://example.com/collation?ignore-case=yes").unwrap();
        assert!(collation.equals("Hello", "hELLO"));
        assert!(!collation.equals("Hello", "World"));
    }

    #[test]
    fn test_lang_collation() {
        let collation = Collation::resolve("http://example.com/collation?lang=en").unwrap();
        assert_eq!(collation.compare("apple", "banana"), Ordering::Less);
    }

    #[test]
    fn test_lang_without_hyphen_is_not_truncated() {
        // the language is the whole tag when no hyphen is present
        let locale = locale_for_lang("de");
        assert_eq!(locale.to_string(), "de");
        let locale = locale_for_lang("en-US");
        assert_eq!(locale.to_string(), "en-US");
        // an invalid region falls back to the language alone
        let locale = locale_for_lang("en-not!a!region");
        assert_eq!(locale.to_string(), "en");
    }

    #[test]
    fn test_alphanumeric_collation() {
        let collation =
            Collation::resolve("http://example.com/collation?alphanumeric=yes").unwrap();
        let mut values = vec!["a10", "a2", "a1"];
        values.sort_by(|a, b| collation.compare(a, b));
        assert_eq!(values, vec!["a1", "a2", "a10"]);
        assert_eq!(collation.compare("a02", "a2"), Ordering::Equal);
        assert_eq!(collation.compare("b1", "a2"), Ordering::Greater);
    }

    #[test]
    fn test_collation_key_contract() {
        let collation = Rc::new(Collation::resolve(CODEPOINT_URI).unwrap());
        let a = CollationKey::new(&collation, "abc");
        let b = CollationKey::new(&collation, "abc");
        let c = CollationKey::new(&collation, "abd");
        assert_eq!(a, b);
        assert_ne!(a, c);

        let caseblind =
            Rc::new(Collation::resolve("http://example.com/collation?ignore-case=yes").unwrap());
        assert_eq!(
            CollationKey::new(&caseblind, "Hello"),
            CollationKey::new(&caseblind, "hELLO")
        );
    }

    #[test]
    fn test_collations_cache() {
        let mut collations = Collations::new();
        let a = collations.load(CODEPOINT_URI).unwrap();
        let b = collations.load(CODEPOINT_URI).unwrap();
        assert!(Rc::ptr_eq(&a, &b));
    }
}
