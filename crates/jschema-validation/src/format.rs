//! Format-assertion predicates.

use jschema_json::JsonPointer;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::Arc;
use url::Url;

/// Checks whether a string is a valid instance of a format.
pub type FormatPredicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Format name to predicate table.
///
/// Every registered format is enabled until [`FormatRegistry::enable`]
/// restricts assertion to a named subset. Disabled and unregistered formats
/// are annotation-only.
#[derive(Clone, Default)]
pub struct FormatRegistry {
    predicates: HashMap<String, FormatPredicate>,
    enabled: Option<HashSet<String>>,
}

impl FormatRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the built-in predicates.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.add("regex", |s: &str| regex::Regex::new(s).is_ok());
        registry.add("ipv4", |s: &str| s.parse::<Ipv4Addr>().is_ok());
        registry.add("ipv6", |s: &str| s.parse::<Ipv6Addr>().is_ok());
        registry.add("uri", is_uri);
        registry.add("uri-reference", is_uri_reference);
        registry.add("uuid", is_uuid);
        registry.add("email", is_email);
        registry.add("json-pointer", |s: &str| JsonPointer::parse(s).is_ok());
        registry
    }

    /// Register (or replace) the predicate for `name`.
    pub fn add(&mut self, name: impl Into<String>, predicate: impl Fn(&str) -> bool + Send + Sync + 'static) {
        let name = name.into();
        if let Some(enabled) = &mut self.enabled {
            enabled.insert(name.clone());
        }
        self.predicates.insert(name, Arc::new(predicate));
    }

    /// Restrict assertion to `names`.
    pub fn enable<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enabled = Some(names.into_iter().map(Into::into).collect());
    }

    /// The predicate for `name`, when registered and enabled.
    pub fn get(&self, name: &str) -> Option<FormatPredicate> {
        if let Some(enabled) = &self.enabled
            && !enabled.contains(name)
        {
            return None;
        }
        self.predicates.get(name).cloned()
    }
}

impl fmt::Debug for FormatRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.predicates.keys().collect();
        names.sort();
        f.debug_struct("FormatRegistry")
            .field("formats", &names)
            .field("enabled", &self.enabled)
            .finish()
    }
}

/// Characters that RFC 3986 never allows literally.
fn has_forbidden_uri_chars(s: &str) -> bool {
    s.chars().any(|c| {
        c.is_whitespace() || c.is_control() || !c.is_ascii() || "<>\"{}|\\^`".contains(c)
    })
}

fn is_uri(s: &str) -> bool {
    !has_forbidden_uri_chars(s) && Url::parse(s).is_ok()
}

fn is_uri_reference(s: &str) -> bool {
    if has_forbidden_uri_chars(s) {
        return false;
    }
    match Url::parse("http://example.invalid/") {
        Ok(base) => base.join(s).is_ok(),
        Err(_) => false,
    }
}

/// Hyphenated 8-4-4-4-12 form only.
fn is_uuid(s: &str) -> bool {
    let groups: Vec<&str> = s.split('-').collect();
    groups.len() == 5
        && groups
            .iter()
            .zip([8, 4, 4, 4, 12])
            .all(|(group, len)| group.len() == len)
        && uuid::Uuid::parse_str(s).is_ok()
}

fn is_email(s: &str) -> bool {
    let Some((local, domain)) = s.rsplit_once('@') else {
        return false;
    };
    let valid_local = !local.is_empty()
        && !local.starts_with('.')
        && !local.ends_with('.')
        && !local.contains("..")
        && !local.contains('@');
    let valid_domain = !domain.is_empty()
        && domain
            .split('.')
            .all(|label| !label.is_empty() && label.chars().all(|c| c.is_alphanumeric() || c == '-'));
    valid_local && valid_domain
}
