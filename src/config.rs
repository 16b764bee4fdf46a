//! Declarative entities and views.
//!
//! [`HierarchySettings::load`] reads `config/config.toml` and `HIERARCHY__*`
//! environment variables, so a deployment can declare its nested resources
//! without code:
//!
//! ```toml
//! [entities.blogs]
//! table = "Blogs"
//! primary_key = "slug"
//! key_kind = "text"
//!
//! [entities.posts]
//! table = "BlogPosts"
//!
//! [entities.posts.relations.blog]
//! name = "blog"
//! column = "blog_slug"
//! table = "Blogs"
//!
//! [views.post_list]
//! name = "PostList"
//! model = "BlogPosts"
//! relation_names = ["blog"]
//! pk_url_kwargs = ["blog_slug"]
//! ```
//!
//! Map keys (`blogs`, `posts`, `post_list` above) are labels only. The config
//! crate case-folds keys from every source, so table, relation and view names
//! are always read from their `table` / `name` fields, which keep their case.
//! Labels are what `HIERARCHY__VIEWS__POST_LIST__MODEL=...` addresses.

use crate::error::{HierarchyError, Result};
use crate::hierarchy::HierarchicalFilter;
use crate::query::EntityManager;
use crate::relation::{EntityDef, KeyKind, RelationDef, Schema};
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

const CONFIG_FILE: &str = "config/config.toml";
const ENV_PREFIX: &str = "HIERARCHY";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HierarchySettings {
    /// Entities keyed by label
    #[serde(default)]
    pub entities: HashMap<String, EntitySettings>,
    /// Views keyed by label
    #[serde(default)]
    pub views: HashMap<String, ViewSettings>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EntitySettings {
    /// Table name, case preserved
    pub table: String,
    #[serde(default = "default_primary_key")]
    pub primary_key: String,
    #[serde(default)]
    pub key_kind: KeyKind,
    /// Relations keyed by label
    #[serde(default)]
    pub relations: HashMap<String, RelationSettings>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelationSettings {
    /// Name used in lookup paths
    pub name: String,
    /// Foreign key column on the declaring table
    pub column: String,
    /// Target table
    pub table: String,
    /// Referenced column, defaulting to the target's primary key
    #[serde(default)]
    pub to_column: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ViewSettings {
    /// View name used by [`HierarchySettings::view`] and in error messages
    pub name: String,
    /// Table the view lists
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub relation_names: Vec<String>,
    #[serde(default)]
    pub pk_url_kwargs: Vec<String>,
}

fn default_primary_key() -> String {
    "id".to_string()
}

impl HierarchySettings {
    /// Load settings from `config/config.toml`, falling back to env vars.
    pub fn load() -> Result<Self> {
        Self::load_sources(CONFIG_FILE, ENV_PREFIX)
    }

    fn load_sources(path: &str, env_prefix: &str) -> Result<Self> {
        let builder = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(Environment::with_prefix(env_prefix).separator("__"));

        let settings = match builder.build() {
            Ok(cfg) => cfg,
            Err(err) => {
                if std::path::Path::new(path).exists() {
                    log::warn!("failed to load {path}, falling back to env: {err}");
                }
                Config::builder()
                    .add_source(Environment::with_prefix(env_prefix).separator("__"))
                    .build()
                    .map_err(|env_err| {
                        HierarchyError::Settings(format!(
                            "failed to load configuration from file and env: {err}, then env-only error: {env_err}"
                        ))
                    })?
            }
        };

        Ok(settings.try_deserialize()?)
    }

    /// Parse settings from a TOML document.
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        Ok(Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()?)
    }

    /// Build and validate the declared [`Schema`].
    ///
    /// # Errors
    ///
    /// `Settings` when two entities declare the same table, `UnknownEntity`
    /// when a relation targets an undeclared table.
    pub fn schema(&self) -> Result<Schema> {
        let mut entities: Vec<_> = self.entities.iter().collect();
        entities.sort_by(|a, b| a.0.cmp(b.0));

        let mut schema = Schema::new();
        for (label, entity) in entities {
            if schema.contains(&entity.table) {
                return Err(HierarchyError::Settings(format!(
                    "entity '{label}' redeclares table {}",
                    entity.table
                )));
            }
            schema = schema.entity(entity.to_def());
        }
        schema.validate()?;
        Ok(schema)
    }

    /// Build the view named `name` over `schema`.
    ///
    /// # Errors
    ///
    /// `Settings` when no such view is declared, `UnknownEntity` when its
    /// model is not in `schema`, and any [`HierarchicalFilter`] validation
    /// error.
    pub fn view(&self, name: &str, schema: Arc<Schema>) -> Result<HierarchicalFilter<EntityManager>> {
        let view = self
            .views
            .values()
            .find(|view| view.name == name)
            .ok_or_else(|| HierarchyError::Settings(format!("no view named {name}")))?;

        let mut builder = HierarchicalFilter::builder(view.name.clone())
            .relation_names(view.relation_names.iter().cloned())
            .pk_url_kwargs(view.pk_url_kwargs.iter().cloned());
        if let Some(model) = &view.model {
            builder = builder.model(EntityManager::new(schema, model.clone())?);
        }
        builder.build()
    }
}

impl EntitySettings {
    fn to_def(&self) -> EntityDef {
        let mut relations: Vec<_> = self.relations.iter().collect();
        relations.sort_by(|a, b| a.0.cmp(b.0));

        relations.into_iter().fold(
            EntityDef::new(self.table.clone()).primary_key(self.primary_key.clone(), self.key_kind),
            |entity, (_, rel)| {
                let mut def =
                    RelationDef::belongs_to(rel.name.clone(), rel.column.clone(), rel.table.clone());
                if let Some(to_column) = &rel.to_column {
                    def = def.to_col(to_column.clone());
                }
                entity.relation(def)
            },
        )
    }
}
