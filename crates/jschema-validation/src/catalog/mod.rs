//! The schema catalog.
//!
//! A [`Catalog`] owns everything schemas are compiled against: the
//! registered vocabularies and the dialects built from them, the format
//! registry, the resolvers that retrieve unknown documents, and the
//! registry of compiled documents keyed by URI.
//!
//! All methods take `&self`; a catalog can be shared between threads.
//! Compile sessions are serialized by a mutex, while lookups only take the
//! registry's read lock. Resolvers run outside the compile mutex: a session
//! that reaches a document nobody has fetched yet is abandoned, the document
//! is fetched, and the session starts over.

mod source;

pub use source::Resolver;

use crate::error::{CompileError, FetchError, ResolutionError};
use crate::format::FormatRegistry;
use crate::options::CatalogOptions;
use crate::schema::compiler::{CompileOutput, Compiler};
use crate::schema::{CompiledDocument, CompiledSchema, DocumentId, NodeKey, NodeLookup};
use crate::uri;
use crate::vocabulary::{
    Dialect, Draft, Vocabulary, builtin_vocabularies, draft_of_vocabularies, known_dialect,
};
use jschema_json::{JsonPointer, JsonValue};
use source::{FetchCache, Sources, call_resolver};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use url::Url;

/// Limit on metaschemas inheriting their dialect through `$schema`.
const MAX_METASCHEMA_CHAIN: usize = 16;

/// The document a compile session is waiting for.
pub(crate) type Deferred = RefCell<Option<Url>>;

#[derive(Default)]
struct Registry {
    documents: HashMap<DocumentId, Arc<CompiledDocument>>,
    /// Registration URI to document. Replaced documents stay in
    /// `documents` for schemas compiled against them.
    by_uri: HashMap<Url, DocumentId>,
    resources: HashMap<Url, NodeKey>,
}

/// Registry of schema documents and the vocabularies, dialects, formats and
/// resolvers they are compiled with.
pub struct Catalog {
    options: CatalogOptions,
    vocabularies: RwLock<HashMap<String, Arc<Vocabulary>>>,
    dialects: RwLock<HashMap<String, Arc<Dialect>>>,
    formats: RwLock<FormatRegistry>,
    registry: RwLock<Registry>,
    compile_lock: Mutex<()>,
    sources: RwLock<Sources>,
    fetches: FetchCache,
    next_document: AtomicU64,
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

/// Re-root a value so its pointers address it as a whole document.
fn rooted(document: JsonValue) -> JsonValue {
    if document.pointer().is_empty() {
        document
    } else {
        JsonValue::from_serde(&document.to_serde())
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

impl Catalog {
    pub fn new() -> Self {
        Self::with_options(CatalogOptions::default())
    }

    pub fn with_options(options: CatalogOptions) -> Self {
        let vocabularies = builtin_vocabularies()
            .into_iter()
            .map(|vocabulary| (vocabulary.uri().to_string(), Arc::new(vocabulary)))
            .collect();
        let sources = Sources::new(options.resolver_timeout());
        Self {
            options,
            vocabularies: RwLock::new(vocabularies),
            dialects: RwLock::new(HashMap::new()),
            formats: RwLock::new(FormatRegistry::with_builtin()),
            registry: RwLock::new(Registry::default()),
            compile_lock: Mutex::new(()),
            sources: RwLock::new(sources),
            fetches: FetchCache::default(),
            next_document: AtomicU64::new(0),
        }
    }

    pub fn options(&self) -> &CatalogOptions {
        &self.options
    }

    // Configuration

    /// Set the default retrieval function, used for URIs no prefix source
    /// claims.
    pub fn set_resolver(
        &self,
        resolver: impl Fn(&Url) -> Result<JsonValue, FetchError> + Send + Sync + 'static,
    ) {
        write(&self.sources).set_default(Arc::new(resolver));
    }

    /// Route URIs starting with `prefix` to `resolver`. The longest
    /// matching prefix wins.
    pub fn add_source(
        &self,
        prefix: &str,
        resolver: impl Fn(&Url) -> Result<JsonValue, FetchError> + Send + Sync + 'static,
    ) -> Result<(), CompileError> {
        let invalid = |message: &str| CompileError::InvalidUri {
            uri: prefix.to_string(),
            message: message.to_string(),
        };
        let url = Url::parse(prefix).map_err(|e| invalid(&e.to_string()))?;
        if !prefix.ends_with('/') || url.fragment().is_some() || url.query().is_some() {
            return Err(invalid("a source prefix must end with '/'"));
        }
        write(&self.sources).add_prefix(url.to_string(), Arc::new(resolver));
        Ok(())
    }

    pub fn set_resolver_timeout(&self, timeout: Duration) {
        write(&self.sources).set_timeout(timeout);
    }

    /// Make a vocabulary available to metaschemas that declare it. A
    /// vocabulary with the URI of an existing one replaces it.
    pub fn register_vocabulary(&self, vocabulary: Vocabulary) {
        tracing::debug!(vocabulary = vocabulary.uri(), "registering vocabulary");
        write(&self.vocabularies).insert(vocabulary.uri().to_string(), Arc::new(vocabulary));
        // Dialects are rebuilt on next use; compiled schemas keep theirs.
        write(&self.dialects).clear();
    }

    /// Add (or replace) a format predicate. Affects schemas compiled
    /// afterwards.
    pub fn add_format(
        &self,
        name: impl Into<String>,
        predicate: impl Fn(&str) -> bool + Send + Sync + 'static,
    ) {
        write(&self.formats).add(name, predicate);
    }

    /// Restrict format assertion to `names`.
    pub fn enable_formats<I, S>(&self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        write(&self.formats).enable(names);
    }

    // Documents

    /// Fetch a raw document through the configured resolvers. The resolver
    /// runs at most once per URI for the lifetime of the catalog; failures
    /// are remembered too.
    pub fn load_json(&self, uri: &Url) -> Result<Arc<JsonValue>, FetchError> {
        self.fetches.get_or_fetch(uri, || {
            let route = read(&self.sources).route(uri);
            let Some((resolver, timeout)) = route else {
                return Err(FetchError::NoResolver {
                    uri: uri.to_string(),
                });
            };
            tracing::debug!(uri = %uri, "calling resolver");
            let result = call_resolver(resolver, uri, timeout).map(|doc| Arc::new(rooted(doc)));
            if let Err(err) = &result {
                tracing::warn!(uri = %uri, error = %err, "resolver failed");
            }
            result
        })
    }

    /// Compile `document` and register it under `uri`.
    ///
    /// Registering identical content again is a no-op; different content
    /// under a registered URI fails with `DuplicateRegistration`.
    pub fn add_schema(&self, uri: &str, document: JsonValue) -> Result<(), CompileError> {
        let url = Self::document_uri(uri)?;
        let document = Arc::new(rooted(document));
        self.with_session(|deferred| match self.registered_raw(&url) {
            Some(existing) if existing == document => {
                tracing::debug!(uri = %url, "schema already registered");
                Ok(())
            }
            Some(_) => Err(CompileError::DuplicateRegistration {
                uri: url.to_string(),
            }),
            None => self
                .compile_and_commit(url.clone(), Arc::clone(&document), None, deferred)
                .map(|_| ()),
        })
    }

    /// Compile `document` and register it under `uri`, replacing any
    /// document registered there.
    ///
    /// Later compilations see the new document. Schemas obtained before
    /// keep the graph they were compiled with.
    pub fn replace_schema(&self, uri: &str, document: JsonValue) -> Result<(), CompileError> {
        let url = Self::document_uri(uri)?;
        let document = Arc::new(rooted(document));
        self.with_session(|deferred| {
            let replacing = read(&self.registry).by_uri.get(&url).copied();
            tracing::debug!(uri = %url, replacing = replacing.is_some(), "replacing schema");
            self.compile_and_commit(url.clone(), Arc::clone(&document), replacing, deferred)
                .map(|_| ())
        })
    }

    /// Forget the document registered under `uri` and the resources it
    /// defined. Returns whether anything was registered there.
    ///
    /// Schemas obtained before, and documents compiled against it, keep
    /// their graph.
    pub fn remove_schema(&self, uri: &str) -> Result<bool, CompileError> {
        let url = Self::document_uri(uri)?;
        let _session = self.compile_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut registry = write(&self.registry);
        let Some(id) = registry.by_uri.remove(&url) else {
            return Ok(false);
        };
        registry.resources.retain(|_, key| key.document != id);
        tracing::debug!(uri = %url, document = id.0, "removed schema");
        Ok(true)
    }

    /// The compiled metaschema of `schema`'s dialect. Metaschemas are
    /// loaded like any other schema: registered, or through a resolver.
    pub fn get_metaschema(&self, schema: &CompiledSchema) -> Result<CompiledSchema, ResolutionError> {
        self.get_schema(schema.dialect().metaschema())
    }

    /// Compile a document registered under its own `$id`, or a generated
    /// `urn:uuid:` URI when it has none, and return it.
    pub fn compile(&self, document: JsonValue) -> Result<CompiledSchema, CompileError> {
        let document = rooted(document);
        let url = match document.get("$id").and_then(JsonValue::as_str) {
            Some(id) => Self::document_uri(id)?,
            None => uri::anonymous_uri().map_err(|e| CompileError::InvalidUri {
                uri: "urn:uuid".to_string(),
                message: e.to_string(),
            })?,
        };
        let document = Arc::new(document);
        let root = self.with_session(|deferred| {
            let existing = read(&self.registry).by_uri.get(&url).copied();
            match existing {
                Some(id) => match self.registered_raw(&url) {
                    Some(raw) if raw == document => Ok(NodeKey {
                        document: id,
                        index: 0,
                    }),
                    _ => Err(CompileError::DuplicateRegistration {
                        uri: url.to_string(),
                    }),
                },
                None => self.compile_and_commit(url.clone(), Arc::clone(&document), None, deferred),
            }
        })?;
        Ok(self.closure(root))
    }

    /// The compiled (sub)schema at an absolute URI. The fragment may be a
    /// JSON Pointer or an anchor. Unknown documents are fetched and
    /// compiled.
    pub fn get_schema(&self, uri: &str) -> Result<CompiledSchema, ResolutionError> {
        let url = uri::parse_absolute(uri).map_err(|e| ResolutionError::InvalidUri {
            uri: uri.to_string(),
            message: e.to_string(),
        })?;
        let fragment = url.fragment().unwrap_or("").to_string();
        let resource_url = uri::without_fragment(&url);

        let resource = match self.registered_resource(&resource_url) {
            Some(key) => key,
            None => {
                let raw = self.raw_document(&resource_url).map_err(|source| {
                    ResolutionError::FetchFailed {
                        uri: resource_url.to_string(),
                        source,
                    }
                })?;
                self.with_session(|deferred| match self.registered_resource(&resource_url) {
                    Some(key) => Ok(key),
                    None => self.compile_and_commit(
                        resource_url.clone(),
                        Arc::clone(&raw),
                        None,
                        deferred,
                    ),
                })?
            }
        };

        let target = read(&self.registry)
            .documents
            .get(&resource.document)
            .and_then(|document| document.resolve_fragment(resource.index, &fragment))
            .ok_or_else(|| ResolutionError::Unresolvable {
                uri: url.to_string(),
            })?;
        Ok(self.closure(target))
    }

    fn document_uri(uri: &str) -> Result<Url, CompileError> {
        uri::parse_document_uri(uri).map_err(|message| CompileError::InvalidUri {
            uri: uri.to_string(),
            message,
        })
    }

    /// Run `session` under the compile lock, fetching whatever document it
    /// defers with the lock released and starting it over.
    fn with_session<T>(
        &self,
        mut session: impl FnMut(&Deferred) -> Result<T, CompileError>,
    ) -> Result<T, CompileError> {
        loop {
            let deferred = Deferred::default();
            let result = {
                let _session = self.compile_lock.lock().unwrap_or_else(PoisonError::into_inner);
                session(&deferred)
            };
            match (result, deferred.into_inner()) {
                (Err(_), Some(uri)) => {
                    tracing::debug!(uri = %uri, "fetching document outside compile session");
                    // Memoised either way; the next session reads the outcome.
                    let _ = self.load_json(&uri);
                }
                (result, _) => return result,
            }
        }
    }

    /// Run a compile session and register its output. Callers hold the
    /// compile lock.
    fn compile_and_commit(
        &self,
        uri: Url,
        raw: Arc<JsonValue>,
        replacing: Option<DocumentId>,
        deferred: &Deferred,
    ) -> Result<NodeKey, CompileError> {
        let mut compiler = Compiler::new(self, replacing, deferred);
        let root = compiler.add_document(uri.clone(), raw)?;
        let output = compiler.finish()?;
        tracing::debug!(
            uri = %uri,
            documents = output.documents.len(),
            resources = output.resources.len(),
            "compiled schema"
        );
        self.commit(output, replacing);
        Ok(root)
    }

    fn commit(&self, output: CompileOutput, replacing: Option<DocumentId>) {
        let mut registry = write(&self.registry);
        if let Some(old) = replacing {
            registry.by_uri.retain(|_, id| *id != old);
            registry.resources.retain(|_, key| key.document != old);
        }
        for document in output.documents {
            registry.by_uri.insert(document.uri.clone(), document.id);
            registry.documents.insert(document.id, Arc::new(document));
        }
        registry.resources.extend(output.resources);
    }

    /// The schema rooted at `root` plus every document reachable from it.
    fn closure(&self, root: NodeKey) -> CompiledSchema {
        let registry = read(&self.registry);
        let mut documents = HashMap::new();
        let mut pending = vec![root.document];
        while let Some(id) = pending.pop() {
            if documents.contains_key(&id) {
                continue;
            }
            if let Some(document) = registry.documents.get(&id) {
                pending.extend(document.dependencies.iter().copied());
                documents.insert(id, Arc::clone(document));
            }
        }
        let uses_unevaluated = documents.values().any(|document| document.uses_unevaluated);
        CompiledSchema {
            root,
            documents: Arc::new(documents),
            uses_unevaluated,
        }
    }

    fn registered_raw(&self, uri: &Url) -> Option<Arc<JsonValue>> {
        let registry = read(&self.registry);
        let id = registry.by_uri.get(uri)?;
        registry
            .documents
            .get(id)
            .map(|document| Arc::clone(&document.raw))
    }

    // Compile session support

    pub(crate) fn allocate_document_id(&self) -> DocumentId {
        DocumentId(self.next_document.fetch_add(1, Ordering::Relaxed))
    }

    pub(crate) fn registered_resource(&self, uri: &Url) -> Option<NodeKey> {
        read(&self.registry).resources.get(uri).copied()
    }

    pub(crate) fn registered_document(&self, id: DocumentId) -> Option<Arc<CompiledDocument>> {
        read(&self.registry).documents.get(&id).cloned()
    }

    pub(crate) fn format_registry(&self) -> FormatRegistry {
        read(&self.formats).clone()
    }

    /// A registered document's raw JSON, else the resolver's.
    pub(crate) fn raw_document(&self, uri: &Url) -> Result<Arc<JsonValue>, FetchError> {
        match self.registered_raw(uri) {
            Some(raw) => Ok(raw),
            None => self.load_json(uri),
        }
    }

    /// A document as seen from inside a compile session: registered or
    /// already fetched. Anything else is recorded in `deferred` and reported
    /// as not found until the session is rerun.
    pub(crate) fn session_document(
        &self,
        uri: &Url,
        deferred: &Deferred,
    ) -> Result<Arc<JsonValue>, FetchError> {
        if let Some(raw) = self.registered_raw(uri) {
            return Ok(raw);
        }
        self.fetches.fetched(uri).unwrap_or_else(|| {
            *deferred.borrow_mut() = Some(uri.clone());
            Err(FetchError::NotFound {
                uri: uri.to_string(),
            })
        })
    }

    pub(crate) fn default_dialect(
        &self,
        deferred: Option<&Deferred>,
    ) -> Result<Arc<Dialect>, CompileError> {
        self.dialect(&self.options.default_dialect, deferred)
    }

    /// The dialect selected by a `$schema` value. Compile sessions pass
    /// their `deferred` slot; metaschemas are fetched directly otherwise.
    pub(crate) fn dialect(
        &self,
        metaschema: &str,
        deferred: Option<&Deferred>,
    ) -> Result<Arc<Dialect>, CompileError> {
        self.resolve_dialect(metaschema, 0, deferred)
    }

    fn resolve_dialect(
        &self,
        metaschema: &str,
        depth: usize,
        deferred: Option<&Deferred>,
    ) -> Result<Arc<Dialect>, CompileError> {
        let metaschema = metaschema.trim_end_matches('#');
        if let Some(dialect) = read(&self.dialects).get(metaschema) {
            return Ok(Arc::clone(dialect));
        }
        let dialect = match known_dialect(metaschema) {
            Some((draft, vocabularies)) => {
                let declared: Vec<(String, bool)> = vocabularies
                    .into_iter()
                    .map(|(uri, required)| (uri.to_string(), required))
                    .collect();
                self.build_dialect(metaschema, draft, &declared)?
            }
            None => self.custom_dialect(metaschema, depth, deferred)?,
        };
        tracing::debug!(
            metaschema,
            draft = ?dialect.draft(),
            unknown_vocabularies = dialect.unknown_vocabularies().len(),
            "resolved dialect"
        );
        let dialect = Arc::new(dialect);
        write(&self.dialects).insert(metaschema.to_string(), Arc::clone(&dialect));
        Ok(dialect)
    }

    fn build_dialect(
        &self,
        metaschema: &str,
        draft: Draft,
        declared: &[(String, bool)],
    ) -> Result<Dialect, CompileError> {
        let vocabularies = read(&self.vocabularies);
        let mut selected = Vec::with_capacity(declared.len());
        let mut unknown = Vec::new();
        for (uri, required) in declared {
            match vocabularies.get(uri) {
                Some(vocabulary) => selected.push(Arc::clone(vocabulary)),
                None if *required => {
                    return Err(CompileError::UnknownVocabulary {
                        vocabulary: uri.clone(),
                        metaschema: metaschema.to_string(),
                    });
                }
                None => unknown.push(uri.clone()),
            }
        }
        Ok(Dialect::new(metaschema, draft, &selected, unknown))
    }

    /// A dialect defined by a metaschema document's `$vocabulary`.
    fn custom_dialect(
        &self,
        metaschema: &str,
        depth: usize,
        deferred: Option<&Deferred>,
    ) -> Result<Dialect, CompileError> {
        let url = uri::parse_absolute(metaschema).map_err(|e| CompileError::InvalidUri {
            uri: metaschema.to_string(),
            message: e.to_string(),
        })?;
        let raw = match deferred {
            Some(deferred) => self.session_document(&url, deferred),
            None => self.raw_document(&url),
        }
        .map_err(|source| CompileError::FetchFailed {
            uri: metaschema.to_string(),
            source,
        })?;
        let parent = raw
            .get("$schema")
            .and_then(JsonValue::as_str)
            .map(|parent| parent.trim_end_matches('#'))
            .filter(|parent| *parent != metaschema);

        let Some(vocabulary) = raw.get("$vocabulary") else {
            let inherited = match parent {
                Some(parent) if depth < MAX_METASCHEMA_CHAIN => {
                    self.resolve_dialect(parent, depth + 1, deferred)?
                }
                _ => self.default_dialect(deferred)?,
            };
            return Ok(inherited.with_metaschema(metaschema));
        };

        let malformed = |message: &str| CompileError::MalformedSchema {
            location: uri::location(&url, &JsonPointer::root().child("$vocabulary")),
            message: message.to_string(),
        };
        let entries = vocabulary
            .as_object()
            .ok_or_else(|| malformed("$vocabulary must be an object"))?;
        let mut declared = Vec::with_capacity(entries.len());
        for (uri, required) in entries {
            let required = required
                .as_bool()
                .ok_or_else(|| malformed("$vocabulary values must be booleans"))?;
            declared.push((uri.clone(), required));
        }

        let draft = draft_of_vocabularies(declared.iter().map(|(uri, _)| uri.as_str()))
            .or_else(|| parent.and_then(known_dialect).map(|(draft, _)| draft))
            .unwrap_or(Draft::Draft202012);
        self.build_dialect(metaschema, draft, &declared)
    }
}

impl fmt::Debug for Catalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = read(&self.registry);
        f.debug_struct("Catalog")
            .field("options", &self.options)
            .field("documents", &registry.by_uri.len())
            .field("resources", &registry.resources.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{DRAFT_2019_09, DRAFT_2020_12};
    use serde_json::json;

    fn value(v: serde_json::Value) -> JsonValue {
        JsonValue::from_serde(&v)
    }

    #[test]
    fn test_identical_registration_is_noop() {
        let catalog = Catalog::new();
        let schema = json!({"type": "string"});
        catalog.add_schema("https://example.com/s.json", value(schema.clone())).unwrap();
        catalog.add_schema("https://example.com/s.json", value(schema)).unwrap();
    }

    #[test]
    fn test_conflicting_registration() {
        let catalog = Catalog::new();
        catalog
            .add_schema("https://example.com/s.json", value(json!({"type": "string"})))
            .unwrap();
        let err = catalog
            .add_schema("https://example.com/s.json", value(json!({"type": "number"})))
            .unwrap_err();
        assert!(matches!(err, CompileError::DuplicateRegistration { .. }));
    }

    #[test]
    fn test_document_uri_must_not_have_fragment() {
        let catalog = Catalog::new();
        let err = catalog
            .add_schema("https://example.com/s.json#/a", value(json!({})))
            .unwrap_err();
        assert!(matches!(err, CompileError::InvalidUri { .. }));
    }

    #[test]
    fn test_failed_compile_registers_nothing() {
        let catalog = Catalog::new();
        let err = catalog
            .add_schema(
                "https://example.com/s.json",
                value(json!({
                    "$defs": {"ok": {"$id": "https://example.com/ok.json"}},
                    "minLength": -1
                })),
            )
            .unwrap_err();
        assert!(matches!(err, CompileError::MalformedSchema { .. }));
        assert!(
            catalog
                .registered_resource(&Url::parse("https://example.com/ok.json").unwrap())
                .is_none()
        );
        assert!(
            catalog
                .registered_raw(&Url::parse("https://example.com/s.json").unwrap())
                .is_none()
        );
    }

    #[test]
    fn test_known_dialects() {
        let catalog = Catalog::new();
        assert_eq!(catalog.dialect(DRAFT_2020_12, None).unwrap().draft(), Draft::Draft202012);
        let legacy = catalog.dialect(&format!("{}#", DRAFT_2019_09), None).unwrap();
        assert_eq!(legacy.draft(), Draft::Draft201909);
        assert!(legacy.has_keyword("$recursiveRef"));
        assert!(!legacy.has_keyword("$dynamicRef"));
    }

    #[test]
    fn test_custom_metaschema_unknown_required_vocabulary() {
        let catalog = Catalog::new();
        catalog
            .add_schema(
                "https://example.com/meta",
                value(json!({
                    "$schema": DRAFT_2020_12,
                    "$vocabulary": {
                        "https://json-schema.org/draft/2020-12/vocab/core": true,
                        "https://example.com/vocab/unknown": true
                    }
                })),
            )
            .unwrap();
        let err = catalog
            .compile(value(json!({"$schema": "https://example.com/meta"})))
            .unwrap_err();
        assert!(matches!(err, CompileError::UnknownVocabulary { .. }));
    }

    #[test]
    fn test_custom_metaschema_selects_vocabularies() {
        let catalog = Catalog::new();
        catalog
            .add_schema(
                "https://example.com/meta",
                value(json!({
                    "$schema": DRAFT_2020_12,
                    "$vocabulary": {
                        "https://json-schema.org/draft/2020-12/vocab/core": true,
                        "https://json-schema.org/draft/2020-12/vocab/applicator": true,
                        "https://example.com/vocab/optional": false
                    }
                })),
            )
            .unwrap();
        let dialect = catalog.dialect("https://example.com/meta", None).unwrap();
        assert!(dialect.has_keyword("properties"));
        assert!(!dialect.has_keyword("minLength"));
        assert_eq!(dialect.unknown_vocabularies(), ["https://example.com/vocab/optional"]);
    }

    #[test]
    fn test_source_prefix_must_end_with_slash() {
        let catalog = Catalog::new();
        let resolver = |uri: &Url| Err(FetchError::NotFound { uri: uri.to_string() });
        assert!(catalog.add_source("https://example.com/schemas", resolver).is_err());
        assert!(catalog.add_source("https://example.com/schemas/", resolver).is_ok());
    }
}
