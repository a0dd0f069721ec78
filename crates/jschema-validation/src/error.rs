// Error types for schema compilation, resolution and evaluation

use std::time::Duration;
use thiserror::Error;

/// Errors raised while compiling a schema document.
///
/// Compilation is atomic: when any of these is returned, nothing from the
/// failing session has been registered in the catalog.
#[derive(Debug, Clone, Error)]
pub enum CompileError {
    #[error("invalid URI '{uri}': {message}")]
    InvalidUri { uri: String, message: String },

    #[error("malformed schema at {location}: {message}")]
    MalformedSchema { location: String, message: String },

    #[error("metaschema {metaschema} requires unknown vocabulary {vocabulary}")]
    UnknownVocabulary {
        vocabulary: String,
        metaschema: String,
    },

    #[error(
        "keyword '{keyword}' at {location} may belong to an unsupported vocabulary ({})",
        .vocabularies.join(", ")
    )]
    UnsupportedVocabulary {
        keyword: String,
        location: String,
        vocabularies: Vec<String>,
    },

    #[error("failed to fetch {uri}")]
    FetchFailed {
        uri: String,
        #[source]
        source: FetchError,
    },

    #[error("$id '{id}' at {location} redefines the URI of an enclosing resource")]
    CyclicIdRedefinition { id: String, location: String },

    #[error("anchor '{anchor}' is defined more than once in resource {resource}")]
    DuplicateAnchor { anchor: String, resource: String },

    #[error("schema resource {uri} is defined more than once")]
    DuplicateResource { uri: String },

    #[error("a different schema is already registered as {uri}")]
    DuplicateRegistration { uri: String },

    #[error("cannot resolve reference '{reference}' at {location}")]
    UnresolvableReference { reference: String, location: String },
}

/// Errors raised by [`Catalog::get_schema`](crate::Catalog::get_schema).
#[derive(Debug, Clone, Error)]
pub enum ResolutionError {
    #[error("invalid URI '{uri}': {message}")]
    InvalidUri { uri: String, message: String },

    #[error("no schema found at {uri}")]
    Unresolvable { uri: String },

    #[error("failed to fetch {uri}")]
    FetchFailed {
        uri: String,
        #[source]
        source: FetchError,
    },

    #[error(transparent)]
    Compile(#[from] CompileError),
}

/// Errors reported by resolver callbacks.
///
/// Results are memoised per URI, so these are cheap to clone.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("document not found: {uri}")]
    NotFound { uri: String },

    #[error("no resolver is configured for {uri}")]
    NoResolver { uri: String },

    #[error("resolver timed out after {timeout:?} fetching {uri}")]
    Timeout { uri: String, timeout: Duration },

    #[error("failed to load {uri}: {message}")]
    Failed { uri: String, message: String },
}

impl FetchError {
    pub fn failed(uri: impl Into<String>, message: impl Into<String>) -> Self {
        FetchError::Failed {
            uri: uri.into(),
            message: message.into(),
        }
    }
}

/// Engine faults. An invalid instance is a verdict, never one of these.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvaluationError {
    #[error(
        "recursion limit of {limit} exceeded at keyword location '{keyword_location}', \
         instance location '{instance_location}'"
    )]
    RecursionLimitExceeded {
        limit: usize,
        keyword_location: String,
        instance_location: String,
    },

    #[error("invalid output mode '{0}' (expected flag, basic, detailed or verbose)")]
    InvalidOutputMode(String),
}

/// Structured keyword failure kinds
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ValidationErrorKind {
    /// The boolean schema `false`
    FalseSchema,

    /// Type mismatch
    TypeMismatch { expected: Vec<String>, got: String },

    /// Value not in enum
    InvalidEnumValue { value: String, allowed: Vec<String> },

    /// Value differs from const
    ConstMismatch { value: String, expected: String },

    /// Number out of range
    NumberOutOfRange {
        value: String,
        minimum: Option<String>,
        maximum: Option<String>,
        exclusive_minimum: Option<String>,
        exclusive_maximum: Option<String>,
    },

    /// Number not a multiple of
    NumberNotMultipleOf { value: String, multiple_of: String },

    /// String length invalid
    StringLengthInvalid {
        length: usize,
        min_length: Option<u64>,
        max_length: Option<u64>,
    },

    /// String doesn't match pattern
    StringPatternMismatch { value: String, pattern: String },

    /// Array length invalid
    ArrayLengthInvalid {
        length: usize,
        min_items: Option<u64>,
        max_items: Option<u64>,
    },

    /// Two array items are equal
    ArrayItemsNotUnique { first: usize, second: usize },

    /// Number of items matching `contains` is out of range
    ContainsCountInvalid {
        count: usize,
        min_contains: Option<u64>,
        max_contains: Option<u64>,
    },

    /// Object property count invalid
    ObjectPropertyCountInvalid {
        count: usize,
        min_properties: Option<u64>,
        max_properties: Option<u64>,
    },

    /// Missing required properties
    MissingRequiredProperties { properties: Vec<String> },

    /// A present property requires others that are missing
    MissingDependentProperties {
        property: String,
        missing: Vec<String>,
    },

    /// String is not a valid instance of an asserted format
    InvalidFormat { value: String, format: String },

    /// Asserted format has no registered predicate
    UnknownFormat { format: String },

    /// Some `allOf` branches failed
    AllOfFailed { failed: Vec<usize> },

    /// No `anyOf` branch is valid
    AnyOfNoneValid,

    /// No `oneOf` branch is valid
    OneOfNoneValid,

    /// More than one `oneOf` branch is valid
    OneOfMultipleValid { valid: Vec<usize> },

    /// The `not` subschema is valid
    NotFailed,

    /// `then` or `else` failed
    ConditionalFailed { branch: String },

    /// Object members failed their subschemas
    InvalidProperties { properties: Vec<String> },

    /// Array items failed their subschemas
    InvalidItems { indices: Vec<usize> },

    /// Property names failed `propertyNames`
    InvalidPropertyNames { properties: Vec<String> },

    /// `dependentSchemas` failed for the listed properties
    DependentSchemaFailed { properties: Vec<String> },

    /// The referenced schema failed
    ReferenceFailed { reference: String },

    /// Failure reported by a custom keyword
    Custom { keyword: String, message: String },
}

impl ValidationErrorKind {
    /// Get the error code for this error kind
    pub fn error_code(&self) -> &'static str {
        match self {
            ValidationErrorKind::FalseSchema => "JS-1-01",
            ValidationErrorKind::TypeMismatch { .. } => "JS-1-02",
            ValidationErrorKind::InvalidEnumValue { .. } => "JS-1-03",
            ValidationErrorKind::ConstMismatch { .. } => "JS-1-04",
            ValidationErrorKind::NumberOutOfRange { .. }
            | ValidationErrorKind::NumberNotMultipleOf { .. } => "JS-1-05",
            ValidationErrorKind::StringLengthInvalid { .. } => "JS-1-06",
            ValidationErrorKind::StringPatternMismatch { .. } => "JS-1-07",
            ValidationErrorKind::ArrayLengthInvalid { .. } => "JS-1-08",
            ValidationErrorKind::ArrayItemsNotUnique { .. } => "JS-1-09",
            ValidationErrorKind::ContainsCountInvalid { .. } => "JS-1-10",
            ValidationErrorKind::ObjectPropertyCountInvalid { .. } => "JS-1-11",
            ValidationErrorKind::MissingRequiredProperties { .. } => "JS-1-12",
            ValidationErrorKind::MissingDependentProperties { .. } => "JS-1-13",
            ValidationErrorKind::InvalidFormat { .. } => "JS-1-14",
            ValidationErrorKind::UnknownFormat { .. } => "JS-1-15",
            ValidationErrorKind::AllOfFailed { .. } => "JS-2-01",
            ValidationErrorKind::AnyOfNoneValid => "JS-2-02",
            ValidationErrorKind::OneOfNoneValid => "JS-2-03",
            ValidationErrorKind::OneOfMultipleValid { .. } => "JS-2-04",
            ValidationErrorKind::NotFailed => "JS-2-05",
            ValidationErrorKind::ConditionalFailed { .. } => "JS-2-06",
            ValidationErrorKind::InvalidProperties { .. } => "JS-2-07",
            ValidationErrorKind::InvalidItems { .. } => "JS-2-08",
            ValidationErrorKind::InvalidPropertyNames { .. } => "JS-2-09",
            ValidationErrorKind::DependentSchemaFailed { .. } => "JS-2-10",
            ValidationErrorKind::ReferenceFailed { .. } => "JS-2-11",
            ValidationErrorKind::Custom { .. } => "JS-9-99",
        }
    }

    /// Format a human-readable message from this error kind
    pub fn message(&self) -> String {
        match self {
            ValidationErrorKind::FalseSchema => "The schema 'false' rejects every value".to_string(),
            ValidationErrorKind::TypeMismatch { expected, got } => {
                format!("Expected {}, got {}", expected.join(" or "), got)
            }
            ValidationErrorKind::InvalidEnumValue { value, allowed } => {
                format!("Value must be one of: {}, got {}", allowed.join(", "), value)
            }
            ValidationErrorKind::ConstMismatch { value, expected } => {
                format!("Value {} is not equal to {}", value, expected)
            }
            ValidationErrorKind::NumberOutOfRange {
                value,
                minimum,
                maximum,
                exclusive_minimum,
                exclusive_maximum,
            } => {
                if let Some(min) = minimum {
                    format!("Number {} is less than minimum {}", value, min)
                } else if let Some(max) = maximum {
                    format!("Number {} is greater than maximum {}", value, max)
                } else if let Some(min) = exclusive_minimum {
                    format!("Number {} is not greater than {}", value, min)
                } else if let Some(max) = exclusive_maximum {
                    format!("Number {} is not less than {}", value, max)
                } else {
                    format!("Number {} is out of range", value)
                }
            }
            ValidationErrorKind::NumberNotMultipleOf { value, multiple_of } => {
                format!("Number {} is not a multiple of {}", value, multiple_of)
            }
            ValidationErrorKind::StringLengthInvalid {
                length,
                min_length,
                max_length,
            } => {
                if let Some(min) = min_length {
                    format!("String length {} is less than minimum {}", length, min)
                } else if let Some(max) = max_length {
                    format!("String length {} is greater than maximum {}", length, max)
                } else {
                    format!("String length {} is invalid", length)
                }
            }
            ValidationErrorKind::StringPatternMismatch { value, pattern } => {
                format!("String '{}' does not match pattern '{}'", value, pattern)
            }
            ValidationErrorKind::ArrayLengthInvalid {
                length,
                min_items,
                max_items,
            } => {
                if let Some(min) = min_items {
                    format!("Array length {} is less than minimum {}", length, min)
                } else if let Some(max) = max_items {
                    format!("Array length {} is greater than maximum {}", length, max)
                } else {
                    format!("Array length {} is invalid", length)
                }
            }
            ValidationErrorKind::ArrayItemsNotUnique { first, second } => {
                format!("Array items {} and {} are equal", first, second)
            }
            ValidationErrorKind::ContainsCountInvalid {
                count,
                min_contains,
                max_contains,
            } => {
                if let Some(min) = min_contains {
                    format!("Array contains {} matching items, fewer than {}", count, min)
                } else if let Some(max) = max_contains {
                    format!("Array contains {} matching items, more than {}", count, max)
                } else {
                    format!("Array contains {} matching items (invalid)", count)
                }
            }
            ValidationErrorKind::ObjectPropertyCountInvalid {
                count,
                min_properties,
                max_properties,
            } => {
                if let Some(min) = min_properties {
                    format!("Object has {} properties, less than minimum {}", count, min)
                } else if let Some(max) = max_properties {
                    format!(
                        "Object has {} properties, greater than maximum {}",
                        count, max
                    )
                } else {
                    format!("Object has {} properties (invalid)", count)
                }
            }
            ValidationErrorKind::MissingRequiredProperties { properties } => {
                format!("Missing required properties: {}", quoted(properties))
            }
            ValidationErrorKind::MissingDependentProperties { property, missing } => {
                format!(
                    "Property '{}' requires missing properties: {}",
                    property,
                    quoted(missing)
                )
            }
            ValidationErrorKind::InvalidFormat { value, format } => {
                format!("'{}' is not a valid {}", value, format)
            }
            ValidationErrorKind::UnknownFormat { format } => {
                format!("Format '{}' is not supported", format)
            }
            ValidationErrorKind::AllOfFailed { failed } => {
                format!("Subschemas {} are not valid", indices(failed))
            }
            ValidationErrorKind::AnyOfNoneValid => {
                "The instance must be valid against at least one subschema".to_string()
            }
            ValidationErrorKind::OneOfNoneValid => {
                "The instance must be valid against exactly one subschema; it is valid against none"
                    .to_string()
            }
            ValidationErrorKind::OneOfMultipleValid { valid } => format!(
                "The instance must be valid against exactly one subschema; it is valid against {}",
                indices(valid)
            ),
            ValidationErrorKind::NotFailed => {
                "The instance must not be valid against the subschema".to_string()
            }
            ValidationErrorKind::ConditionalFailed { branch } => {
                format!("The instance is not valid against the '{}' subschema", branch)
            }
            ValidationErrorKind::InvalidProperties { properties } => {
                format!("Properties {} are invalid", quoted(properties))
            }
            ValidationErrorKind::InvalidItems { indices: items } => {
                format!("Array items {} are invalid", indices(items))
            }
            ValidationErrorKind::InvalidPropertyNames { properties } => {
                format!("Property names {} are invalid", quoted(properties))
            }
            ValidationErrorKind::DependentSchemaFailed { properties } => {
                format!(
                    "The instance is not valid against the schemas required by {}",
                    quoted(properties)
                )
            }
            ValidationErrorKind::ReferenceFailed { reference } => {
                format!("The instance is not valid against the schema at {}", reference)
            }
            ValidationErrorKind::Custom { message, .. } => message.clone(),
        }
    }
}

impl std::fmt::Display for ValidationErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message())
    }
}

fn quoted(names: &[String]) -> String {
    names
        .iter()
        .map(|name| format!("'{}'", name))
        .collect::<Vec<_>>()
        .join(", ")
}

fn indices(items: &[usize]) -> String {
    items
        .iter()
        .map(usize::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
