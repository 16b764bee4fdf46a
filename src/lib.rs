//! # Hierarchical views
//!
//! Scope the collection behind a nested-resource view to the ancestors named
//! in its URL. A view under `/blogs/{blog_pk}/posts/{post_pk}/comments/`
//! declares the relation chain `["blog", "post"]` and the URL keyword chain
//! `["blog_pk", "post_pk"]`; its collection becomes
//!
//! ```text
//! comments WHERE post__blog = {blog_pk} AND post = {post_pk}
//! ```
//!
//! expressed as a sea-query `SELECT` with the joins the lookup paths need.
//!
//! - [`lookup`]: the pure key derivation and id extraction
//! - [`Hierarchical`] / [`HierarchicalFilter`]: the capability views compose in
//! - [`Manager`] / [`Collection`]: the data-access seam, implemented over
//!   sea-query by [`EntityManager`] and [`SelectQuery`]
//! - [`views`]: list, detail, create, update and delete views
//! - [`HierarchySettings`]: declarative entities and views from TOML or env

pub mod config;
pub mod error;
pub mod hierarchy;
pub mod lookup;
pub mod manager;
pub mod query;
pub mod relation;
#[cfg(feature = "tracing")]
pub mod tracing_helpers;
pub mod views;

pub use config::HierarchySettings;
pub use error::{HierarchyError, Result};
pub use hierarchy::{CollectionOf, Hierarchical, HierarchicalFilter, HierarchicalFilterBuilder};
pub use lookup::{FilterMapping, UrlKwargs};
pub use manager::{Collection, Manager};
pub use query::{EntityManager, SelectQuery};
pub use relation::{EntityDef, KeyKind, RelationDef, Schema};
pub use views::{CreateView, DeleteView, DetailView, ListView, UpdateView};
