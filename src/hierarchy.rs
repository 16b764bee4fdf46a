//! Ancestor filtering for nested views.
//!
//! [`Hierarchical`] is the capability a view composes in to scope its
//! collection to the ancestors named in the URL. Implementors declare a
//! relation chain, a URL keyword chain, and either a model manager or an
//! explicit queryset; the provided methods do the rest and may be overridden
//! one at a time.
//!
//! [`HierarchicalFilter`] is the ready-made implementation. Its builder
//! checks the declaration once, up front, so a misconfigured view fails when
//! it is constructed rather than on its first request.
//!
//! ```
//! use std::sync::Arc;
//! use hierarchical_views::{
//!     EntityDef, EntityManager, Hierarchical, HierarchicalFilter, RelationDef, Schema, UrlKwargs,
//! };
//! use sea_query::PostgresQueryBuilder;
//!
//! let schema = Arc::new(
//!     Schema::new()
//!         .entity(EntityDef::new("blogs"))
//!         .entity(EntityDef::new("posts").relation(RelationDef::belongs_to("blog", "blog_id", "blogs")))
//!         .entity(EntityDef::new("comments").relation(RelationDef::belongs_to("post", "post_id", "posts"))),
//! );
//!
//! let comments = HierarchicalFilter::builder("CommentList")
//!     .relation_names(["blog", "post"])
//!     .pk_url_kwargs(["blog_pk", "post_pk"])
//!     .model(EntityManager::new(schema, "comments").unwrap())
//!     .build()
//!     .unwrap();
//!
//! let kwargs: UrlKwargs = [("blog_pk", "1"), ("post_pk", "2")].into_iter().collect();
//! let sql = comments.get_queryset(&kwargs).unwrap().to_string(PostgresQueryBuilder);
//! assert!(sql.contains(r#""post"."blog_id" = 1"#));
//! assert!(sql.contains(r#""comments"."post_id" = 2"#));
//! ```

use crate::error::{HierarchyError, Result};
use crate::lookup::{
    build_filter_mapping, derive_filter_keys, extract_ancestor_ids, FilterMapping, UrlKwargs,
};
use crate::manager::{Collection, Manager};
#[cfg(feature = "tracing")]
use crate::tracing_helpers;
use std::fmt;

/// Collection type produced by a [`Hierarchical`] implementor.
pub type CollectionOf<H> = <<H as Hierarchical>::Manager as Manager>::Collection;

/// Scope a view's collection to the ancestor chain captured from the URL.
pub trait Hierarchical {
    type Manager: Manager;

    /// Name used in configuration error messages.
    fn view_name(&self) -> &str;

    /// Relation names, outermost ancestor first.
    fn relation_names(&self) -> &[String] {
        &[]
    }

    /// URL keyword names holding each ancestor's id, in the same order.
    fn pk_url_kwargs(&self) -> &[String] {
        &[]
    }

    fn model(&self) -> Option<&Self::Manager> {
        None
    }

    /// Explicit collection returned as-is, bypassing ancestor filtering.
    fn queryset(&self) -> Option<&<Self::Manager as Manager>::Collection> {
        None
    }

    /// Lookup keys for the relation chain, outermost first.
    ///
    /// # Errors
    ///
    /// `MissingRelationNames` when the chain is empty.
    fn get_relation_names(&self) -> Result<Vec<String>> {
        let relation_names = self.relation_names();
        if relation_names.is_empty() {
            return Err(HierarchyError::MissingRelationNames {
                view: self.view_name().to_string(),
            });
        }
        Ok(derive_filter_keys(relation_names))
    }

    /// # Errors
    ///
    /// `MissingPkUrlKwargs` when the chain is empty.
    fn get_pk_url_kwargs(&self) -> Result<&[String]> {
        let pk_url_kwargs = self.pk_url_kwargs();
        if pk_url_kwargs.is_empty() {
            return Err(HierarchyError::MissingPkUrlKwargs {
                view: self.view_name().to_string(),
            });
        }
        Ok(pk_url_kwargs)
    }

    /// Ancestor ids for this request, one per URL keyword. Keywords absent
    /// from `kwargs` yield `None`.
    fn get_ancestor_ids(&self, kwargs: &UrlKwargs) -> Result<Vec<Option<String>>> {
        Ok(extract_ancestor_ids(self.get_pk_url_kwargs()?, kwargs))
    }

    /// Pair lookup keys with ancestor ids.
    ///
    /// # Errors
    ///
    /// Any error of the two chains, or `ChainLengthMismatch` when they
    /// differ in length.
    fn get_filter_mapping(&self, kwargs: &UrlKwargs) -> Result<FilterMapping> {
        let ancestor_ids = self.get_ancestor_ids(kwargs)?;
        let keys = self.get_relation_names()?;
        if keys.len() != ancestor_ids.len() {
            return Err(HierarchyError::ChainLengthMismatch {
                view: self.view_name().to_string(),
                relation_names: keys.len(),
                pk_url_kwargs: ancestor_ids.len(),
            });
        }
        Ok(build_filter_mapping(keys, ancestor_ids))
    }

    /// The view's collection narrowed to the requested ancestors.
    ///
    /// An explicit [`queryset`](Hierarchical::queryset) is returned unchanged.
    /// Otherwise the model manager's collection is filtered by
    /// [`get_filter_mapping`](Hierarchical::get_filter_mapping).
    ///
    /// # Errors
    ///
    /// `MissingModel` when neither a queryset nor a model is configured, plus
    /// any error from building or applying the filter mapping.
    fn get_queryset(&self, kwargs: &UrlKwargs) -> Result<<Self::Manager as Manager>::Collection> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::get_queryset_span(self.view_name()).entered();

        if let Some(queryset) = self.queryset() {
            return Ok(queryset.clone());
        }

        let manager = self.model().ok_or_else(|| HierarchyError::MissingModel {
            view: self.view_name().to_string(),
        })?;

        let lookups = self.get_filter_mapping(kwargs)?;
        log::debug!(
            "{}: filtering by {} ancestor lookup(s)",
            self.view_name(),
            lookups.len()
        );
        manager.all().filter_by(&lookups)
    }
}

/// Validated declaration of a hierarchical view.
pub struct HierarchicalFilter<M: Manager> {
    name: String,
    relation_names: Vec<String>,
    pk_url_kwargs: Vec<String>,
    model: Option<M>,
    queryset: Option<M::Collection>,
}

impl<M: Manager> HierarchicalFilter<M> {
    pub fn builder(name: impl Into<String>) -> HierarchicalFilterBuilder<M> {
        HierarchicalFilterBuilder {
            name: name.into(),
            relation_names: Vec::new(),
            pk_url_kwargs: Vec::new(),
            model: None,
            queryset: None,
        }
    }
}

impl<M: Manager + Clone> Clone for HierarchicalFilter<M> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            relation_names: self.relation_names.clone(),
            pk_url_kwargs: self.pk_url_kwargs.clone(),
            model: self.model.clone(),
            queryset: self.queryset.clone(),
        }
    }
}

impl<M: Manager> fmt::Debug for HierarchicalFilter<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HierarchicalFilter")
            .field("name", &self.name)
            .field("relation_names", &self.relation_names)
            .field("pk_url_kwargs", &self.pk_url_kwargs)
            .field("model", &self.model.is_some())
            .field("queryset", &self.queryset.is_some())
            .finish()
    }
}

impl<M: Manager> Hierarchical for HierarchicalFilter<M> {
    type Manager = M;

    fn view_name(&self) -> &str {
        &self.name
    }

    fn relation_names(&self) -> &[String] {
        &self.relation_names
    }

    fn pk_url_kwargs(&self) -> &[String] {
        &self.pk_url_kwargs
    }

    fn model(&self) -> Option<&M> {
        self.model.as_ref()
    }

    fn queryset(&self) -> Option<&M::Collection> {
        self.queryset.as_ref()
    }
}

/// Builder for [`HierarchicalFilter`].
pub struct HierarchicalFilterBuilder<M: Manager> {
    name: String,
    relation_names: Vec<String>,
    pk_url_kwargs: Vec<String>,
    model: Option<M>,
    queryset: Option<M::Collection>,
}

impl<M: Manager> HierarchicalFilterBuilder<M> {
    /// Relation names, outermost ancestor first, as they appear in the URL.
    pub fn relation_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.relation_names = names.into_iter().map(Into::into).collect();
        self
    }

    /// URL keyword names, one per relation name and in the same order.
    pub fn pk_url_kwargs<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pk_url_kwargs = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn model(mut self, manager: M) -> Self {
        self.model = Some(manager);
        self
    }

    /// Serve this collection as-is; chains are neither required nor used.
    pub fn queryset(mut self, queryset: M::Collection) -> Self {
        self.queryset = Some(queryset);
        self
    }

    /// Check the declaration.
    ///
    /// # Errors
    ///
    /// - `MissingModel` without a model or queryset
    /// - `MissingRelationNames` / `MissingPkUrlKwargs` when filtering through
    ///   a model with an empty chain
    /// - `ChainLengthMismatch` when the two chains differ in length
    pub fn build(self) -> Result<HierarchicalFilter<M>> {
        if self.queryset.is_none() {
            if self.model.is_none() {
                return Err(HierarchyError::MissingModel { view: self.name });
            }
            if self.relation_names.is_empty() {
                return Err(HierarchyError::MissingRelationNames { view: self.name });
            }
            if self.pk_url_kwargs.is_empty() {
                return Err(HierarchyError::MissingPkUrlKwargs { view: self.name });
            }
            if self.relation_names.len() != self.pk_url_kwargs.len() {
                return Err(HierarchyError::ChainLengthMismatch {
                    view: self.name,
                    relation_names: self.relation_names.len(),
                    pk_url_kwargs: self.pk_url_kwargs.len(),
                });
            }
        }

        Ok(HierarchicalFilter {
            name: self.name,
            relation_names: self.relation_names,
            pk_url_kwargs: self.pk_url_kwargs,
            model: self.model,
            queryset: self.queryset,
        })
    }
}
