//! Lazy `SELECT` queries over declared entities.
//!
//! [`SelectQuery`] wraps a sea-query [`SelectStatement`] for one entity and
//! knows the [`Schema`] it was built from, so it can resolve lookup paths such
//! as `blog__post` into joins and comparisons on its own. [`EntityManager`] is
//! the [`Manager`] that hands these queries out.
//!
//! Lookup paths name the ancestor chain outermost first, the same order the
//! URL uses. The last segment is the hop taken from the queried entity, so on
//! `comments`:
//!
//! - `post` compares `comments.post_id`
//! - `blog__post` joins `posts` through `post` and compares `posts.blog_id`
//! - `pk` compares the primary key of `comments`
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use hierarchical_views::{EntityDef, EntityManager, FilterMapping, Manager, RelationDef, Schema};
//! use sea_query::PostgresQueryBuilder;
//!
//! let schema = Arc::new(
//!     Schema::new()
//!         .entity(EntityDef::new("blogs"))
//!         .entity(EntityDef::new("posts").relation(RelationDef::belongs_to("blog", "blog_id", "blogs")))
//!         .entity(EntityDef::new("comments").relation(RelationDef::belongs_to("post", "post_id", "posts"))),
//! );
//! let comments = EntityManager::new(schema, "comments").unwrap();
//!
//! let mut lookups = FilterMapping::new();
//! lookups.insert("blog__post", Some("1".to_string()));
//! lookups.insert("post", Some("2".to_string()));
//!
//! let sql = comments.filter(&lookups).unwrap().to_string(PostgresQueryBuilder);
//! assert!(sql.contains(r#"INNER JOIN "posts" AS "post""#));
//! ```

use crate::error::{HierarchyError, Result};
use crate::lookup::{split_lookup, FilterMapping, LOOKUP_SEP};
use crate::manager::{Collection, Manager};
use crate::relation::{EntityDef, KeyKind, Schema, PK_LOOKUP};
#[cfg(feature = "tracing")]
use crate::tracing_helpers;
use sea_query::{
    Alias, Asterisk, Condition, Expr, ExprTrait, IntoCondition, JoinType, Order, Query,
    QueryBuilder, SelectStatement, Values,
};
use std::sync::Arc;

/// Query builder for selecting rows of one entity.
///
/// Building methods consume and return the query so calls chain. Nothing is
/// executed; render the statement with [`SelectQuery::build`] and hand it to
/// a driver.
#[derive(Debug, Clone)]
pub struct SelectQuery {
    schema: Arc<Schema>,
    table: String,
    pub(crate) query: SelectStatement,
    joined: Vec<String>,
}

impl SelectQuery {
    /// `SELECT "table".* FROM "table"`.
    ///
    /// # Errors
    ///
    /// `UnknownEntity` if `table` is not declared in `schema`.
    pub fn new(schema: Arc<Schema>, table: impl Into<String>) -> Result<Self> {
        let table = table.into();
        schema.get(&table)?;
        Ok(Self::unchecked(schema, table))
    }

    fn unchecked(schema: Arc<Schema>, table: String) -> Self {
        let query = Query::select()
            .column((Alias::new(table.clone()), Asterisk))
            .from(Alias::new(table.clone()))
            .to_owned();
        Self {
            schema,
            table,
            query,
            joined: Vec::new(),
        }
    }

    /// Table this query selects from.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Add a raw sea-query condition.
    pub fn filter<F>(mut self, condition: F) -> Self
    where
        F: IntoCondition,
    {
        self.query.cond_where(condition.into_condition());
        self
    }

    /// Order by a column of the queried table.
    pub fn order_by(mut self, column: &str, order: Order) -> Self {
        self.query.order_by(
            (Alias::new(self.table.clone()), Alias::new(column.to_string())),
            order,
        );
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.query.limit(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.query.offset(offset);
        self
    }

    /// Aliases of the joins added while resolving lookups, in join order.
    pub fn joins(&self) -> &[String] {
        &self.joined
    }

    pub fn statement(&self) -> &SelectStatement {
        &self.query
    }

    /// Render the statement with bound parameters.
    pub fn build<B: QueryBuilder>(&self, builder: B) -> (String, Values) {
        self.query.build(builder)
    }

    /// Render the statement with values inlined. Intended for logs and tests.
    pub fn to_string<B: QueryBuilder>(&self, builder: B) -> String {
        self.query.to_string(builder)
    }

    /// Resolve `lookup` to the column it compares, joining tables on the way.
    fn resolve(&mut self, lookup: &str) -> Result<ResolvedLookup> {
        let schema = Arc::clone(&self.schema);
        let segments = split_lookup(lookup);
        let (compared, hops) = segments
            .split_first()
            .ok_or_else(|| unknown_relation(&self.table, "", lookup))?;

        let mut entity: &EntityDef = schema.get(&self.table)?;
        let mut alias = self.table.clone();
        let mut path = String::new();

        for hop in hops.iter().rev() {
            let relation = entity
                .get_relation(hop)
                .ok_or_else(|| unknown_relation(&entity.table, hop, lookup))?;
            let target = schema.get(&relation.to_tbl)?;
            let to_col = schema.referenced_column(relation)?;

            path = if path.is_empty() {
                hop.to_string()
            } else {
                format!("{hop}{LOOKUP_SEP}{path}")
            };
            let on = Expr::col((Alias::new(alias.clone()), Alias::new(relation.from_col.clone())))
                .equals((Alias::new(path.clone()), Alias::new(to_col.to_string())));
            self.join_once(&path, &target.table, on);

            entity = target;
            alias = path.clone();
        }

        if *compared == PK_LOOKUP {
            return Ok(ResolvedLookup {
                alias,
                column: entity.primary_key.clone(),
                kind: entity.key_kind,
            });
        }

        let relation = entity
            .get_relation(compared)
            .ok_or_else(|| unknown_relation(&entity.table, compared, lookup))?;
        Ok(ResolvedLookup {
            alias,
            column: relation.from_col.clone(),
            kind: schema.key_kind_of(relation)?,
        })
    }

    fn join_once(&mut self, alias: &str, table: &str, on: Expr) {
        if self.joined.iter().any(|a| a == alias) {
            return;
        }
        self.query.join_as(
            JoinType::InnerJoin,
            Alias::new(table.to_string()),
            Alias::new(alias.to_string()),
            on,
        );
        self.joined.push(alias.to_string());
    }
}

impl Collection for SelectQuery {
    fn filter_by(mut self, lookups: &FilterMapping) -> Result<Self> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::resolve_lookups_span(&self.table, lookups.len()).entered();

        if lookups.is_empty() {
            return Ok(self);
        }

        let mut condition = Condition::all();
        for (lookup, value) in lookups.iter() {
            let resolved = self.resolve(lookup)?;
            log::debug!(
                "{}: lookup '{}' resolved to {}.{}",
                self.table,
                lookup,
                resolved.alias,
                resolved.column
            );
            condition = condition.add(resolved.compare(value));
        }
        Ok(self.filter(condition))
    }

    fn slice(self, offset: u64, limit: u64) -> Self {
        self.offset(offset).limit(limit)
    }
}

struct ResolvedLookup {
    alias: String,
    column: String,
    kind: KeyKind,
}

impl ResolvedLookup {
    /// Equality against an id captured from the URL.
    ///
    /// Absent ids compare with `IS NULL`. Ids that do not parse as the key
    /// kind cannot match any row.
    fn compare(&self, value: Option<&str>) -> Expr {
        let col = Expr::col((Alias::new(self.alias.clone()), Alias::new(self.column.clone())));
        let Some(raw) = value else {
            return col.is_null();
        };
        match self.kind {
            KeyKind::Integer => match raw.parse::<i64>() {
                Ok(id) => col.eq(id),
                Err(_) => no_match(raw),
            },
            KeyKind::Text => col.eq(raw.to_string()),
            KeyKind::Uuid => match uuid::Uuid::parse_str(raw) {
                Ok(id) => col.eq(id),
                Err(_) => no_match(raw),
            },
        }
    }
}

fn no_match(raw: &str) -> Expr {
    log::debug!("ancestor id '{raw}' does not parse as its key type; matching no rows");
    Expr::cust("FALSE")
}

fn unknown_relation(entity: &str, relation: &str, lookup: &str) -> HierarchyError {
    HierarchyError::UnknownRelation {
        entity: entity.to_string(),
        relation: relation.to_string(),
        lookup: lookup.to_string(),
    }
}

/// [`Manager`] over an entity declared in a [`Schema`].
#[derive(Debug, Clone)]
pub struct EntityManager {
    schema: Arc<Schema>,
    table: String,
}

impl EntityManager {
    /// # Errors
    ///
    /// `UnknownEntity` if `table` is not declared in `schema`.
    pub fn new(schema: Arc<Schema>, table: impl Into<String>) -> Result<Self> {
        let table = table.into();
        schema.get(&table)?;
        Ok(Self { schema, table })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }
}

impl Manager for EntityManager {
    type Collection = SelectQuery;

    fn all(&self) -> SelectQuery {
        SelectQuery::unchecked(Arc::clone(&self.schema), self.table.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relation::RelationDef;
    use sea_query::PostgresQueryBuilder;

    fn schema() -> Arc<Schema> {
        Arc::new(
            Schema::new()
                .entity(EntityDef::new("blogs").primary_key("slug", KeyKind::Text))
                .entity(
                    EntityDef::new("posts")
                        .relation(RelationDef::belongs_to("blog", "blog_slug", "blogs")),
                )
                .entity(
                    EntityDef::new("comments")
                        .primary_key("uuid", KeyKind::Uuid)
                        .relation(RelationDef::belongs_to("post", "post_id", "posts")),
                ),
        )
    }

    fn lookups(pairs: &[(&str, Option<&str>)]) -> FilterMapping {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.map(str::to_string)))
            .collect()
    }

    #[test]
    fn test_all_selects_whole_table() {
        let manager = EntityManager::new(schema(), "posts").unwrap();
        let sql = manager.all().to_string(PostgresQueryBuilder);
        assert_eq!(sql, r#"SELECT "posts".* FROM "posts""#);
    }

    #[test]
    fn test_unknown_entity() {
        let err = EntityManager::new(schema(), "tags").unwrap_err();
        assert_eq!(
            err,
            HierarchyError::UnknownEntity {
                entity: "tags".to_string()
            }
        );
        assert!(SelectQuery::new(schema(), "tags").is_err());
    }

    #[test]
    fn test_direct_relation_compares_foreign_key() {
        let manager = EntityManager::new(schema(), "comments").unwrap();
        let query = manager.filter(&lookups(&[("post", Some("12"))])).unwrap();
        let sql = query.to_string(PostgresQueryBuilder);

        assert!(query.joins().is_empty());
        assert!(sql.contains(r#"WHERE "comments"."post_id" = 12"#), "{sql}");
    }

    #[test]
    fn test_nested_relation_joins_parent() {
        let manager = EntityManager::new(schema(), "comments").unwrap();
        let query = manager
            .filter(&lookups(&[("blog__post", Some("rust")), ("post", Some("12"))]))
            .unwrap();
        let sql = query.to_string(PostgresQueryBuilder);

        assert_eq!(query.joins(), ["post".to_string()]);
        assert!(
            sql.contains(r#"INNER JOIN "posts" AS "post" ON "comments"."post_id" = "post"."id""#),
            "{sql}"
        );
        assert!(sql.contains(r#""post"."blog_slug" = 'rust'"#), "{sql}");
        assert!(sql.contains(r#""comments"."post_id" = 12"#), "{sql}");
    }

    #[test]
    fn test_joins_are_shared_between_lookups() {
        let manager = EntityManager::new(schema(), "comments").unwrap();
        let query = manager
            .filter(&lookups(&[("blog__post", Some("rust")), ("pk__post", Some("3"))]))
            .unwrap();
        assert_eq!(query.joins().len(), 1);
        let sql = query.to_string(PostgresQueryBuilder);
        assert_eq!(sql.matches("INNER JOIN").count(), 1, "{sql}");
        assert!(sql.contains(r#""post"."id" = 3"#), "{sql}");
    }

    #[test]
    fn test_absent_id_filters_null() {
        let manager = EntityManager::new(schema(), "comments").unwrap();
        let sql = manager
            .filter(&lookups(&[("post", None)]))
            .unwrap()
            .to_string(PostgresQueryBuilder);
        assert!(sql.contains(r#""comments"."post_id" IS NULL"#), "{sql}");
    }

    #[test]
    fn test_unparsable_id_matches_nothing() {
        let manager = EntityManager::new(schema(), "comments").unwrap();
        let sql = manager
            .filter(&lookups(&[("post", Some("not-a-number"))]))
            .unwrap()
            .to_string(PostgresQueryBuilder);
        assert!(sql.contains("FALSE"), "{sql}");
        assert!(!sql.contains("not-a-number"), "{sql}");
    }

    #[test]
    fn test_pk_lookup_uses_primary_key_kind() {
        let manager = EntityManager::new(schema(), "comments").unwrap();
        let id = "67e55044-10b1-426f-9247-bb680e5fe0c8";
        let sql = manager
            .filter(&lookups(&[("pk", Some(id))]))
            .unwrap()
            .to_string(PostgresQueryBuilder);
        assert!(sql.contains(r#""comments"."uuid" = "#), "{sql}");
        assert!(sql.contains(id), "{sql}");
    }

    #[test]
    fn test_unknown_relation_in_path() {
        let manager = EntityManager::new(schema(), "comments").unwrap();
        let err = manager
            .filter(&lookups(&[("author__post", Some("1"))]))
            .unwrap_err();
        assert_eq!(
            err,
            HierarchyError::UnknownRelation {
                entity: "posts".to_string(),
                relation: "author".to_string(),
                lookup: "author__post".to_string(),
            }
        );
    }

    #[test]
    fn test_empty_lookups_leave_query_untouched() {
        let manager = EntityManager::new(schema(), "comments").unwrap();
        let query = manager.filter(&FilterMapping::new()).unwrap();
        assert_eq!(
            query.to_string(PostgresQueryBuilder),
            manager.all().to_string(PostgresQueryBuilder)
        );
    }

    #[test]
    fn test_slice_sets_limit_and_offset() {
        let manager = EntityManager::new(schema(), "posts").unwrap();
        let sql = manager.all().slice(20, 10).to_string(PostgresQueryBuilder);
        assert!(sql.ends_with("LIMIT 10 OFFSET 20"), "{sql}");
    }

    #[test]
    fn test_filter_through_reference_and_arc() {
        let manager = EntityManager::new(schema(), "comments").unwrap();
        let mapping = lookups(&[("post", Some("12"))]);
        let direct = manager.filter(&mapping).unwrap().to_string(PostgresQueryBuilder);

        let by_ref = <&EntityManager as Manager>::filter(&&manager, &mapping).unwrap();
        let shared = Arc::new(manager);
        let by_arc = <Arc<EntityManager> as Manager>::filter(&shared, &mapping).unwrap();
        assert_eq!(by_ref.to_string(PostgresQueryBuilder), direct);
        assert_eq!(by_arc.to_string(PostgresQueryBuilder), direct);
    }

    #[test]
    fn test_order_by_qualifies_column() {
        let manager = EntityManager::new(schema(), "posts").unwrap();
        let sql = manager
            .all()
            .order_by("created_at", Order::Desc)
            .to_string(PostgresQueryBuilder);
        assert!(sql.ends_with(r#"ORDER BY "posts"."created_at" DESC"#), "{sql}");
    }
}
