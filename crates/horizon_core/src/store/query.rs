//! Query description passed to a store.

use crate::document::Document;
use crate::entity::EntityId;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Smallest first.
    Asc,
    /// Largest first.
    Desc,
}

/// A single ordering clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    /// Column to order by.
    pub column: String,
    /// Sort direction.
    pub direction: Direction,
}

/// A filtered, ordered, preloading read.
///
/// Built fluently:
///
/// ```rust
/// use horizon_core::{Direction, Query};
///
/// let query = Query::new()
///     .order_by("updated_at", Direction::Desc)
///     .preload("Media")
///     .limit(10);
/// assert_eq!(query.preload_names(), ["Media".to_string()]);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    filter: Document,
    ids: Option<Vec<EntityId>>,
    order: Option<Order>,
    preloads: Vec<String>,
    limit: Option<usize>,
}

impl Query {
    /// Creates a query that matches every row.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Matches rows on the non-zero fields of `filter`.
    #[must_use]
    pub fn filter(mut self, filter: Document) -> Self {
        self.filter = filter;
        self
    }

    /// Restricts the query to a single identity.
    #[must_use]
    pub fn id(self, id: EntityId) -> Self {
        self.ids(vec![id])
    }

    /// Restricts the query to a set of identities.
    #[must_use]
    pub fn ids(mut self, ids: Vec<EntityId>) -> Self {
        self.ids = Some(ids);
        self
    }

    /// Orders results by `column`.
    #[must_use]
    pub fn order_by(mut self, column: impl Into<String>, direction: Direction) -> Self {
        self.order = Some(Order {
            column: column.into(),
            direction,
        });
        self
    }

    /// Adds a relation to preload.
    #[must_use]
    pub fn preload(mut self, relation: impl Into<String>) -> Self {
        self.preloads.push(relation.into());
        self
    }

    /// Adds several relations to preload.
    #[must_use]
    pub fn preloads<I, S>(mut self, relations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.preloads.extend(relations.into_iter().map(Into::into));
        self
    }

    /// Caps the number of rows returned.
    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Returns the filter document.
    pub fn filter_doc(&self) -> &Document {
        &self.filter
    }

    /// Returns the identity restriction, if any.
    pub fn id_set(&self) -> Option<&[EntityId]> {
        self.ids.as_deref()
    }

    /// Returns the ordering clause, if any.
    pub fn ordering(&self) -> Option<&Order> {
        self.order.as_ref()
    }

    /// Returns the relations to preload.
    pub fn preload_names(&self) -> &[String] {
        &self.preloads
    }

    /// Returns the row cap, if any.
    pub fn row_limit(&self) -> Option<usize> {
        self.limit
    }
}
