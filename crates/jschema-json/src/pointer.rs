//! RFC 6901 JSON Pointers.

use crate::error::JsonPointerError;
use crate::value::{JsonKind, JsonValue};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Cow;
use std::fmt;

/// A JSON Pointer (e.g. `/properties/name`).
///
/// Tokens are stored unescaped; `Display` produces the escaped string form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JsonPointer {
    tokens: Vec<String>,
}

impl JsonPointer {
    /// The empty pointer, which references the whole document.
    pub fn root() -> Self {
        Self { tokens: Vec::new() }
    }

    /// Build a pointer from unescaped reference tokens.
    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse the string form of a pointer (`""`, `"/a/b~1c"`).
    pub fn parse(s: &str) -> Result<Self, JsonPointerError> {
        if s.is_empty() {
            return Ok(Self::root());
        }
        let Some(rest) = s.strip_prefix('/') else {
            return Err(JsonPointerError::MissingLeadingSlash(s.to_string()));
        };
        let tokens = rest
            .split('/')
            .map(|token| unescape(token).ok_or_else(|| JsonPointerError::InvalidEscape(s.to_string())))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { tokens })
    }

    /// Parse a pointer from a (percent-encoded) URI fragment, without the `#`.
    pub fn from_uri_fragment(fragment: &str) -> Result<Self, JsonPointerError> {
        let decoded = percent_decode(fragment)
            .ok_or_else(|| JsonPointerError::InvalidPercentEncoding(fragment.to_string()))?;
        Self::parse(&decoded)
    }

    /// The pointer as a URI fragment, percent-encoding characters that a
    /// fragment may not contain literally.
    pub fn to_uri_fragment(&self) -> String {
        percent_encode(&self.to_string())
    }

    /// Append a token in place.
    pub fn push(&mut self, token: impl Into<String>) {
        self.tokens.push(token.into());
    }

    /// Remove the last token in place.
    pub fn pop(&mut self) -> Option<String> {
        self.tokens.pop()
    }

    /// A new pointer with `token` appended.
    pub fn child(&self, token: impl Into<String>) -> Self {
        let mut pointer = self.clone();
        pointer.push(token);
        pointer
    }

    /// A new pointer with all of `other`'s tokens appended.
    pub fn join(&self, other: &JsonPointer) -> Self {
        let mut pointer = self.clone();
        pointer.tokens.extend(other.tokens.iter().cloned());
        pointer
    }

    /// The tokens of `self` after the prefix `base`, if `base` is a prefix.
    pub fn strip_prefix(&self, base: &JsonPointer) -> Option<JsonPointer> {
        self.starts_with(base).then(|| JsonPointer {
            tokens: self.tokens[base.tokens.len()..].to_vec(),
        })
    }

    /// True when `prefix`'s tokens are a prefix of `self`'s.
    pub fn starts_with(&self, prefix: &JsonPointer) -> bool {
        self.tokens.starts_with(&prefix.tokens)
    }

    /// The unescaped tokens.
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// The last token, if any.
    pub fn last(&self) -> Option<&str> {
        self.tokens.last().map(String::as_str)
    }

    /// True for the root pointer.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Number of tokens.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Resolve the pointer against `document`.
    pub fn evaluate<'a>(&self, document: &'a JsonValue) -> Result<&'a JsonValue, JsonPointerError> {
        let mut current = document;
        for token in &self.tokens {
            let next = match current.kind() {
                JsonKind::Object(_) => current.get(token),
                JsonKind::Array(_) => parse_array_index(token).and_then(|i| current.get_index(i)),
                _ => None,
            };
            current = next.ok_or_else(|| JsonPointerError::NotFound(self.to_string()))?;
        }
        Ok(current)
    }
}

/// Array indices must be "0" or have no leading zeros.
fn parse_array_index(token: &str) -> Option<usize> {
    if token.is_empty() || (token.len() > 1 && token.starts_with('0')) {
        return None;
    }
    if !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    token.parse().ok()
}

fn escape(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

fn unescape(token: &str) -> Option<String> {
    let mut out = String::with_capacity(token.len());
    let mut chars = token.chars();
    while let Some(c) = chars.next() {
        if c == '~' {
            match chars.next() {
                Some('0') => out.push('~'),
                Some('1') => out.push('/'),
                _ => return None,
            }
        } else {
            out.push(c);
        }
    }
    Some(out)
}

/// Bytes encoded in a URI fragment: everything but RFC 3986 `fragment`
/// characters.
const FRAGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'!')
    .remove(b'$')
    .remove(b'&')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'*')
    .remove(b'+')
    .remove(b',')
    .remove(b';')
    .remove(b'=')
    .remove(b':')
    .remove(b'@')
    .remove(b'/')
    .remove(b'?');

fn percent_encode(s: &str) -> String {
    utf8_percent_encode(s, FRAGMENT).to_string()
}

/// `None` for a `%` not followed by two hex digits, or non-UTF-8 output.
fn percent_decode(s: &str) -> Option<String> {
    let well_formed = s.match_indices('%').all(|(i, _)| {
        s.get(i + 1..i + 3)
            .is_some_and(|hex| hex.bytes().all(|b| b.is_ascii_hexdigit()))
    });
    if !well_formed {
        return None;
    }
    percent_decode_str(s).decode_utf8().ok().map(Cow::into_owned)
}

impl fmt::Display for JsonPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for token in &self.tokens {
            write!(f, "/{}", escape(token))?;
        }
        Ok(())
    }
}

impl std::str::FromStr for JsonPointer {
    type Err = JsonPointerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for JsonPointer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for JsonPointer {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        JsonPointer::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display_round_trip() {
        let pointer = JsonPointer::parse("/a~1b/c~0d/0").unwrap();
        assert_eq!(pointer.tokens(), &["a/b", "c~d", "0"]);
        assert_eq!(pointer.to_string(), "/a~1b/c~0d/0");
        assert_eq!(JsonPointer::parse("").unwrap(), JsonPointer::root());
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            JsonPointer::parse("a/b"),
            Err(JsonPointerError::MissingLeadingSlash("a/b".to_string()))
        );
        assert!(matches!(
            JsonPointer::parse("/a~2"),
            Err(JsonPointerError::InvalidEscape(_))
        ));
    }

    #[test]
    fn test_uri_fragment_encoding() {
        let pointer = JsonPointer::from_tokens(["$defs", "a b", "%"]);
        assert_eq!(pointer.to_uri_fragment(), "/$defs/a%20b/%25");
        assert_eq!(
            JsonPointer::from_uri_fragment("/$defs/a%20b/%25").unwrap(),
            pointer
        );
        assert!(JsonPointer::from_uri_fragment("/bad%2").is_err());
        assert!(JsonPointer::from_uri_fragment("/bad%zz").is_err());
        assert!(JsonPointer::from_uri_fragment("/%FF").is_err());

        let unicode = JsonPointer::from_tokens(["caf\u{e9}", "a~b/c"]);
        assert_eq!(unicode.to_uri_fragment(), "/caf%C3%A9/a~0b~1c");
        assert_eq!(JsonPointer::from_uri_fragment("/caf%C3%A9/a~0b~1c").unwrap(), unicode);
    }

    #[test]
    fn test_evaluate() {
        let doc = JsonValue::parse(r#"{"a": [10, {"b/c": true}], "": 1}"#).unwrap();
        let value = JsonPointer::parse("/a/1/b~1c").unwrap().evaluate(&doc).unwrap();
        assert_eq!(value.as_bool(), Some(true));
        assert_eq!(value.pointer().to_string(), "/a/1/b~1c");

        let empty_key = JsonPointer::parse("/").unwrap().evaluate(&doc).unwrap();
        assert_eq!(empty_key.to_string(), "1");

        assert!(JsonPointer::parse("/a/01").unwrap().evaluate(&doc).is_err());
        assert!(JsonPointer::parse("/a/5").unwrap().evaluate(&doc).is_err());
    }

    #[test]
    fn test_prefix_helpers() {
        let base = JsonPointer::parse("/$defs/a").unwrap();
        let full = JsonPointer::parse("/$defs/a/properties/x").unwrap();
        assert!(full.starts_with(&base));
        assert_eq!(full.strip_prefix(&base).unwrap().to_string(), "/properties/x");
        assert!(base.strip_prefix(&full).is_none());
        assert_eq!(base.join(&JsonPointer::parse("/y").unwrap()).to_string(), "/$defs/a/y");
    }
}
