//! URI helpers on top of the `url` crate.

use jschema_json::JsonPointer;
use url::Url;

/// Parse an absolute URI, dropping an empty trailing fragment (`…#`).
pub(crate) fn parse_absolute(uri: &str) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(uri)?;
    if url.fragment() == Some("") {
        url.set_fragment(None);
    }
    Ok(url)
}

/// Parse a URI that names a whole document: no fragment other than `#`.
pub(crate) fn parse_document_uri(uri: &str) -> Result<Url, String> {
    let url = parse_absolute(uri).map_err(|e| e.to_string())?;
    if url.fragment().is_some() {
        return Err("a document URI must not have a fragment".to_string());
    }
    Ok(url)
}

/// `url` with its fragment removed.
pub(crate) fn without_fragment(url: &Url) -> Url {
    let mut url = url.clone();
    url.set_fragment(None);
    url
}

/// The string form of `base` extended by a JSON Pointer fragment. The root
/// pointer yields the bare base URI.
pub(crate) fn location(base: &Url, pointer: &JsonPointer) -> String {
    if pointer.is_empty() {
        base.to_string()
    } else {
        format!("{}#{}", base, pointer.to_uri_fragment())
    }
}

/// A fresh `urn:uuid:` URI for documents registered without an identifier.
pub(crate) fn anonymous_uri() -> Result<Url, url::ParseError> {
    Url::parse(&format!("urn:uuid:{}", uuid::Uuid::new_v4()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_absolute_drops_empty_fragment() {
        let url = parse_absolute("https://json-schema.org/draft/2020-12/schema#").unwrap();
        assert_eq!(url.as_str(), "https://json-schema.org/draft/2020-12/schema");
        assert!(parse_absolute("relative.json").is_err());
    }

    #[test]
    fn test_document_uri_rejects_fragments() {
        assert!(parse_document_uri("https://example.com/s.json").is_ok());
        assert!(parse_document_uri("https://example.com/s.json#").is_ok());
        assert!(parse_document_uri("https://example.com/s.json#/a").is_err());
    }

    #[test]
    fn test_location() {
        let base = Url::parse("https://example.com/root.json").unwrap();
        assert_eq!(location(&base, &JsonPointer::root()), "https://example.com/root.json");
        assert_eq!(
            location(&base, &JsonPointer::from_tokens(["$defs", "A"])),
            "https://example.com/root.json#/$defs/A"
        );
    }

    #[test]
    fn test_anonymous_uris_are_unique_urns() {
        let a = anonymous_uri().unwrap();
        let b = anonymous_uri().unwrap();
        assert_eq!(a.scheme(), "urn");
        assert_ne!(a, b);
        let fragment_ref = a.join("#/$defs/x").unwrap();
        assert_eq!(fragment_ref.fragment(), Some("/$defs/x"));
    }
}
