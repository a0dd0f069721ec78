//! # jschema-validation
//!
//! A JSON Schema compiler and evaluation engine for drafts 2019-09 and
//! 2020-12.
//!
//! Schema documents are registered with a [`Catalog`], which resolves
//! `$id`, anchors and references, fetches remote documents through
//! user-supplied resolvers, and compiles each document into an immutable
//! graph. A [`CompiledSchema`] is a cheap handle into that graph and can be
//! shared across threads.
//!
//! Evaluation produces an [`EvaluationNode`] tree carrying the verdict,
//! errors and annotations of every keyword that ran. [`format`] renders the
//! tree in one of the standard output formats.
//!
//! ```rust
//! use jschema_validation::{Catalog, JsonValue, OutputFormat, format};
//!
//! let catalog = Catalog::new();
//! let schema = catalog
//!     .compile(JsonValue::parse(r#"{"type": "object", "required": ["name"]}"#).unwrap())
//!     .unwrap();
//! let result = schema.evaluate(&JsonValue::parse("{}").unwrap()).unwrap();
//! assert!(!result.valid);
//! assert_eq!(format(&result, OutputFormat::Flag)["valid"], false);
//! ```

mod catalog;
mod error;
mod evaluation;
mod format;
mod options;
mod output;
mod schema;
mod uri;
mod validator;
mod vocabulary;

pub use catalog::{Catalog, Resolver};
pub use error::{CompileError, EvaluationError, FetchError, ResolutionError, ValidationErrorKind};
pub use evaluation::{EvaluationNode, KeywordEvaluation};
pub use format::{FormatPredicate, FormatRegistry};
pub use options::{
    CatalogOptions, DEFAULT_MAX_DEPTH, DRAFT_2019_09, DRAFT_2020_12, EvaluationOptions,
};
pub use output::{OutputFormat, format};
pub use schema::CompiledSchema;
pub use validator::{evaluate, evaluate_with, is_valid};
pub use vocabulary::{Dialect, Draft, KeywordDefinition, KeywordOutcome, Vocabulary};

pub use jschema_json::{JsonPointer, JsonType, JsonValue};
pub use url::Url;
