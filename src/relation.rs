//! Relation metadata for resolving lookup paths.
//!
//! Nested resources hang off many-to-one relations: a comment belongs to a
//! post, a post belongs to a blog. [`RelationDef`] records one such hop (the
//! foreign key column on the source table and the column it references on the
//! target table) and [`Schema`] collects the entities a lookup path may
//! traverse.
//!
//! # Example
//!
//! ```
//! use hierarchical_views::relation::{EntityDef, KeyKind, RelationDef, Schema};
//!
//! let schema = Schema::new()
//!     .entity(EntityDef::new("blogs"))
//!     .entity(EntityDef::new("posts").relation(RelationDef::belongs_to("blog", "blog_id", "blogs")))
//!     .entity(EntityDef::new("comments").relation(RelationDef::belongs_to("post", "post_id", "posts")));
//!
//! let post = schema.resolve_relation("comments", "post").unwrap();
//! assert_eq!(post.to_tbl, "posts");
//! assert_eq!(schema.key_kind_of(post).unwrap(), KeyKind::Integer);
//! ```

use crate::error::{HierarchyError, Result};
use serde::Deserialize;
use std::collections::HashMap;

/// Lookup segment that names an entity's own primary key.
pub const PK_LOOKUP: &str = "pk";

/// How an identifier captured from the URL is typed before it is compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyKind {
    /// Signed 64-bit integer keys (`serial`, `bigserial`, ...).
    #[default]
    Integer,
    /// Text keys, compared verbatim.
    Text,
    /// UUID keys.
    Uuid,
}

/// A many-to-one hop from one entity to another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationDef {
    /// Relation name used in lookup paths
    pub name: String,
    /// Foreign key column on the source table
    pub from_col: String,
    /// Target table
    pub to_tbl: String,
    /// Referenced column on the target table; `None` means its primary key
    pub to_col: Option<String>,
}

impl RelationDef {
    /// A relation whose foreign key references the target's primary key.
    pub fn belongs_to(
        name: impl Into<String>,
        from_col: impl Into<String>,
        to_tbl: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            from_col: from_col.into(),
            to_tbl: to_tbl.into(),
            to_col: None,
        }
    }

    /// Reference a column other than the target's primary key.
    pub fn to_col(mut self, to_col: impl Into<String>) -> Self {
        self.to_col = Some(to_col.into());
        self
    }
}

/// An entity (table) and the relations that leave it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityDef {
    pub table: String,
    pub primary_key: String,
    pub key_kind: KeyKind,
    relations: Vec<RelationDef>,
}

impl EntityDef {
    /// Entity with an integer primary key named `id`.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            primary_key: "id".to_string(),
            key_kind: KeyKind::Integer,
            relations: Vec::new(),
        }
    }

    pub fn primary_key(mut self, column: impl Into<String>, kind: KeyKind) -> Self {
        self.primary_key = column.into();
        self.key_kind = kind;
        self
    }

    pub fn relation(mut self, relation: RelationDef) -> Self {
        self.relations.retain(|r| r.name != relation.name);
        self.relations.push(relation);
        self
    }

    pub fn get_relation(&self, name: &str) -> Option<&RelationDef> {
        self.relations.iter().find(|r| r.name == name)
    }

    pub fn relations(&self) -> &[RelationDef] {
        &self.relations
    }
}

/// Registry of entities keyed by table name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    entities: HashMap<String, EntityDef>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entity(mut self, entity: EntityDef) -> Self {
        self.entities.insert(entity.table.clone(), entity);
        self
    }

    pub fn get(&self, table: &str) -> Result<&EntityDef> {
        self.entities
            .get(table)
            .ok_or_else(|| HierarchyError::UnknownEntity {
                entity: table.to_string(),
            })
    }

    pub fn contains(&self, table: &str) -> bool {
        self.entities.contains_key(table)
    }

    /// Find `relation` on `table`.
    ///
    /// # Errors
    ///
    /// `UnknownEntity` if `table` is not declared, `UnknownRelation` if it has
    /// no relation by that name.
    pub fn resolve_relation(&self, table: &str, relation: &str) -> Result<&RelationDef> {
        self.get(table)?
            .get_relation(relation)
            .ok_or_else(|| HierarchyError::UnknownRelation {
                entity: table.to_string(),
                relation: relation.to_string(),
                lookup: relation.to_string(),
            })
    }

    /// Column on the target table that `relation` references.
    pub fn referenced_column<'a>(&'a self, relation: &'a RelationDef) -> Result<&'a str> {
        match &relation.to_col {
            Some(col) => Ok(col.as_str()),
            None => Ok(self.get(&relation.to_tbl)?.primary_key.as_str()),
        }
    }

    /// Key kind of the value a relation's foreign key holds.
    pub fn key_kind_of(&self, relation: &RelationDef) -> Result<KeyKind> {
        Ok(self.get(&relation.to_tbl)?.key_kind)
    }

    /// Check that every relation points at a declared entity.
    pub fn validate(&self) -> Result<()> {
        for entity in self.entities.values() {
            for relation in &entity.relations {
                if !self.contains(&relation.to_tbl) {
                    return Err(HierarchyError::UnknownEntity {
                        entity: relation.to_tbl.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}
