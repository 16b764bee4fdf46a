//! Configuration error type.
//!
//! Every failure this crate reports is a configuration problem: a view was
//! declared without a relation chain, without URL keyword names, without a
//! model, or with lookups that do not resolve against the declared schema.
//! They are meant to surface while a view is being wired up, not while serving
//! traffic, so each variant names the view (or entity) at fault.

use std::fmt;

/// Error raised when a hierarchical view is improperly configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HierarchyError {
    /// The relation chain is empty or unset.
    MissingRelationNames { view: String },
    /// The URL keyword chain is empty or unset.
    MissingPkUrlKwargs { view: String },
    /// Neither a model manager nor an explicit queryset was supplied.
    MissingModel { view: String },
    /// The relation chain and URL keyword chain have different lengths.
    ChainLengthMismatch {
        view: String,
        relation_names: usize,
        pk_url_kwargs: usize,
    },
    /// A lookup or view refers to an entity the schema does not declare.
    UnknownEntity { entity: String },
    /// A lookup path segment is not a relation of the entity it is applied to.
    UnknownRelation {
        entity: String,
        relation: String,
        lookup: String,
    },
    /// A single-object view was dispatched without its pk URL keyword.
    MissingObjectPk { view: String, pk_url_kwarg: String },
    /// A list view was asked for page 0 or paginated without `paginate_by`.
    InvalidPage { view: String, page: u64 },
    /// The settings file or environment could not be read or deserialized.
    Settings(String),
}

impl fmt::Display for HierarchyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HierarchyError::MissingRelationNames { view } => write!(
                f,
                "{view} is missing relation names. Define {view}.relation_names in the \
                 order that they are referred in their child model and appear on the URL \
                 (outermost ancestor first), or override {view}.get_relation_names()."
            ),
            HierarchyError::MissingPkUrlKwargs { view } => write!(
                f,
                "{view} is missing pk URL kwargs. Define {view}.pk_url_kwargs in the same \
                 order as {view}.relation_names, or override {view}.get_ancestor_ids()."
            ),
            HierarchyError::MissingModel { view } => write!(
                f,
                "{view} is missing a QuerySet. Define {view}.model, {view}.queryset, or \
                 override {view}.get_queryset()."
            ),
            HierarchyError::ChainLengthMismatch {
                view,
                relation_names,
                pk_url_kwargs,
            } => write!(
                f,
                "{view} declares {relation_names} relation name(s) but {pk_url_kwargs} pk \
                 URL kwarg(s). Both chains must have one entry per ancestor, in the same order."
            ),
            HierarchyError::UnknownEntity { entity } => {
                write!(f, "Entity '{entity}' is not declared in the schema")
            }
            HierarchyError::UnknownRelation {
                entity,
                relation,
                lookup,
            } => write!(
                f,
                "Cannot resolve '{relation}' into a relation of '{entity}' (lookup '{lookup}')"
            ),
            HierarchyError::MissingObjectPk { view, pk_url_kwarg } => write!(
                f,
                "Generic detail view {view} must be called with an object pk in the URL \
                 keyword '{pk_url_kwarg}'."
            ),
            HierarchyError::InvalidPage { view, page } => {
                write!(f, "{view} cannot serve page {page}; pages start at 1 and require paginate_by")
            }
            HierarchyError::Settings(msg) => write!(f, "Settings error: {msg}"),
        }
    }
}

impl std::error::Error for HierarchyError {}

impl From<config::ConfigError> for HierarchyError {
    fn from(err: config::ConfigError) -> Self {
        HierarchyError::Settings(err.to_string())
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, HierarchyError>;
