//! Catalog and evaluation configuration.

use serde::Deserialize;
use std::time::Duration;

/// Metaschema URI of the 2020-12 dialect.
pub const DRAFT_2020_12: &str = "https://json-schema.org/draft/2020-12/schema";
/// Metaschema URI of the 2019-09 dialect.
pub const DRAFT_2019_09: &str = "https://json-schema.org/draft/2019-09/schema";

/// Default bound on nested schema evaluations.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Catalog-wide settings.
///
/// Deserializes from camelCase JSON, e.g.
/// `{"defaultDialect": "https://json-schema.org/draft/2019-09/schema"}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct CatalogOptions {
    /// Dialect for documents without `$schema`.
    pub default_dialect: String,
    /// Reject unknown keywords when the dialect declares an optional
    /// vocabulary this catalog does not implement.
    pub strict_vocabularies: bool,
    /// Resolver timeout in milliseconds.
    pub resolver_timeout_ms: Option<u64>,
}

impl Default for CatalogOptions {
    fn default() -> Self {
        Self {
            default_dialect: DRAFT_2020_12.to_string(),
            strict_vocabularies: false,
            resolver_timeout_ms: None,
        }
    }
}

impl CatalogOptions {
    pub fn with_default_dialect(mut self, metaschema_uri: impl Into<String>) -> Self {
        self.default_dialect = metaschema_uri.into();
        self
    }

    pub fn with_strict_vocabularies(mut self, strict: bool) -> Self {
        self.strict_vocabularies = strict;
        self
    }

    pub fn with_resolver_timeout(mut self, timeout: Duration) -> Self {
        self.resolver_timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    pub fn resolver_timeout(&self) -> Option<Duration> {
        self.resolver_timeout_ms.map(Duration::from_millis)
    }
}

/// Per-call evaluation settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct EvaluationOptions {
    /// Stop once the verdict is decided. Annotation output is incomplete in
    /// this mode; `anyOf`/`oneOf` keep evaluating when the schema uses
    /// `unevaluatedItems`/`unevaluatedProperties`.
    pub short_circuit: bool,
    /// Maximum nesting of schema evaluations.
    pub max_depth: usize,
    /// Assert `format` for every dialect, not only format-assertion ones.
    pub assert_formats: bool,
    /// When asserting, fail formats that have no registered predicate.
    pub strict_formats: bool,
}

impl Default for EvaluationOptions {
    fn default() -> Self {
        Self {
            short_circuit: false,
            max_depth: DEFAULT_MAX_DEPTH,
            assert_formats: false,
            strict_formats: false,
        }
    }
}

impl EvaluationOptions {
    pub fn with_short_circuit(mut self, short_circuit: bool) -> Self {
        self.short_circuit = short_circuit;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_assert_formats(mut self, assert_formats: bool) -> Self {
        self.assert_formats = assert_formats;
        self
    }

    pub fn with_strict_formats(mut self, strict_formats: bool) -> Self {
        self.strict_formats = strict_formats;
        self
    }
}
