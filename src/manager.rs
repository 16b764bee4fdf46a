//! The data-access seam used by hierarchical views.
//!
//! A [`Manager`] is the default collection accessor of one entity type, in
//! the sense of a Django model manager: it hands out the unfiltered
//! [`Collection`], and a collection narrows itself by an equality conjunction of
//! lookups. Views never execute queries; they return the (lazy) collection and
//! leave execution to the host.
//!
//! [`crate::EntityManager`] and [`crate::SelectQuery`] implement these traits
//! over sea-query. Any other backend (an in-memory store, a different query
//! builder) plugs in by implementing the same two traits.

use crate::error::Result;
use crate::lookup::FilterMapping;

/// A lazy collection of rows of one entity type.
pub trait Collection: Clone {
    /// Narrow the collection to rows matching every lookup in `lookups`.
    ///
    /// An absent value (`None`) matches rows whose referenced key is null.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when a lookup path cannot be resolved
    /// against the entity.
    fn filter_by(self, lookups: &FilterMapping) -> Result<Self>;

    /// Restrict the collection to `limit` rows starting at `offset`.
    fn slice(self, offset: u64, limit: u64) -> Self;
}

/// Default collection accessor for one entity type.
pub trait Manager {
    type Collection: Collection;

    /// The unfiltered collection of the entity.
    fn all(&self) -> Self::Collection;

    /// Shorthand for `all().filter_by(lookups)`.
    fn filter(&self, lookups: &FilterMapping) -> Result<Self::Collection> {
        self.all().filter_by(lookups)
    }
}

impl<M: Manager + ?Sized> Manager for &M {
    type Collection = M::Collection;

    fn all(&self) -> Self::Collection {
        (**self).all()
    }

    fn filter(&self, lookups: &FilterMapping) -> Result<Self::Collection> {
        (**self).filter(lookups)
    }
}

impl<M: Manager + ?Sized> Manager for std::sync::Arc<M> {
    type Collection = M::Collection;

    fn all(&self) -> Self::Collection {
        (**self).all()
    }

    fn filter(&self, lookups: &FilterMapping) -> Result<Self::Collection> {
        (**self).filter(lookups)
    }
}
