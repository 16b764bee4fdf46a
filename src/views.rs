//! Generic views scoped to an ancestor chain.
//!
//! Each view wraps a [`Hierarchical`] and gets its collection from
//! [`Hierarchical::get_queryset`]; what it does with that collection is the
//! only thing that differs between them:
//!
//! - [`ListView`] serves the collection, optionally one page at a time
//! - [`DetailView`], [`UpdateView`] and [`DeleteView`] narrow it to the object
//!   named by the pk URL keyword
//! - [`CreateView`] exposes the ancestor lookups a new object inherits
//!
//! Rendering, form handling and writes stay with the host framework.

use crate::error::{HierarchyError, Result};
use crate::hierarchy::{CollectionOf, Hierarchical};
use crate::lookup::{FilterMapping, UrlKwargs, LOOKUP_SEP};
use crate::manager::Collection;
use crate::relation::PK_LOOKUP;

/// URL keyword a single-object view reads its pk from unless told otherwise.
pub const DEFAULT_PK_URL_KWARG: &str = "pk";

/// List of the objects under an ancestor chain.
#[derive(Debug, Clone)]
pub struct ListView<H> {
    hierarchy: H,
    paginate_by: Option<u64>,
}

impl<H: Hierarchical> ListView<H> {
    pub fn new(hierarchy: H) -> Self {
        Self {
            hierarchy,
            paginate_by: None,
        }
    }

    pub fn paginate_by(mut self, per_page: u64) -> Self {
        self.paginate_by = Some(per_page).filter(|n| *n > 0);
        self
    }

    pub fn hierarchy(&self) -> &H {
        &self.hierarchy
    }

    pub fn get_queryset(&self, kwargs: &UrlKwargs) -> Result<CollectionOf<H>> {
        self.hierarchy.get_queryset(kwargs)
    }

    /// One page (1-based) of the collection.
    ///
    /// # Errors
    ///
    /// `InvalidPage` for page 0 or when the view is not paginated.
    pub fn get_page(&self, kwargs: &UrlKwargs, page: u64) -> Result<CollectionOf<H>> {
        let per_page = match self.paginate_by {
            Some(per_page) if page > 0 => per_page,
            _ => {
                return Err(HierarchyError::InvalidPage {
                    view: self.hierarchy.view_name().to_string(),
                    page,
                })
            }
        };
        let offset = (page - 1).saturating_mul(per_page);
        Ok(self.get_queryset(kwargs)?.slice(offset, per_page))
    }
}

/// Create form backed by an ancestor chain.
#[derive(Debug, Clone)]
pub struct CreateView<H> {
    hierarchy: H,
}

impl<H: Hierarchical> CreateView<H> {
    pub fn new(hierarchy: H) -> Self {
        Self { hierarchy }
    }

    pub fn hierarchy(&self) -> &H {
        &self.hierarchy
    }

    pub fn get_queryset(&self, kwargs: &UrlKwargs) -> Result<CollectionOf<H>> {
        self.hierarchy.get_queryset(kwargs)
    }

    /// Ancestor lookups that address a direct relation of the new object,
    /// i.e. the foreign keys it should be created with.
    pub fn get_initial(&self, kwargs: &UrlKwargs) -> Result<FilterMapping> {
        Ok(self
            .hierarchy
            .get_filter_mapping(kwargs)?
            .into_iter()
            .filter(|(key, _)| !key.contains(LOOKUP_SEP))
            .collect())
    }
}

macro_rules! single_object_view {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        pub struct $name<H> {
            hierarchy: H,
            pk_url_kwarg: String,
        }

        impl<H: Hierarchical> $name<H> {
            pub fn new(hierarchy: H) -> Self {
                Self {
                    hierarchy,
                    pk_url_kwarg: DEFAULT_PK_URL_KWARG.to_string(),
                }
            }

            /// Read the object's pk from `name` instead of `"pk"`.
            pub fn pk_url_kwarg(mut self, name: impl Into<String>) -> Self {
                self.pk_url_kwarg = name.into();
                self
            }

            pub fn hierarchy(&self) -> &H {
                &self.hierarchy
            }

            pub fn get_queryset(&self, kwargs: &UrlKwargs) -> Result<CollectionOf<H>> {
                self.hierarchy.get_queryset(kwargs)
            }

            /// The collection narrowed to the object named in the URL.
            ///
            /// # Errors
            ///
            /// `MissingObjectPk` when the pk URL keyword is absent, plus any
            /// error from [`Hierarchical::get_queryset`].
            pub fn get_object(&self, kwargs: &UrlKwargs) -> Result<CollectionOf<H>> {
                let queryset = self.get_queryset(kwargs)?;
                let pk = kwargs.get(&self.pk_url_kwarg).ok_or_else(|| {
                    HierarchyError::MissingObjectPk {
                        view: self.hierarchy.view_name().to_string(),
                        pk_url_kwarg: self.pk_url_kwarg.clone(),
                    }
                })?;
                let mut lookups = FilterMapping::new();
                lookups.insert(PK_LOOKUP, Some(pk.to_string()));
                queryset.filter_by(&lookups)
            }
        }
    };
}

single_object_view!(
    /// A single object under an ancestor chain.
    DetailView
);

single_object_view!(
    /// Edit form for a single object under an ancestor chain.
    UpdateView
);

single_object_view!(
    /// Delete confirmation for a single object under an ancestor chain.
    DeleteView
);
