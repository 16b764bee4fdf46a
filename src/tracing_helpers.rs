//! Span constructors for the `tracing` feature.
//!
//! Callers enter the returned span for the duration of the operation:
//!
//! ```ignore
//! let _span = tracing_helpers::get_queryset_span("CommentList").entered();
//! ```

use tracing::Span;

/// Span around building a view's filtered collection.
pub fn get_queryset_span(view: &str) -> Span {
    tracing::debug_span!("hierarchy.get_queryset", view = %view)
}

/// Span around resolving lookup paths against an entity.
pub fn resolve_lookups_span(entity: &str, lookups: usize) -> Span {
    tracing::debug_span!("hierarchy.resolve_lookups", entity = %entity, lookups = lookups)
}
