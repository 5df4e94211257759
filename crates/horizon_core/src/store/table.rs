//! Table-level operations shared by the memory store and its transactions.

use crate::document::{document_id, is_zero, Document};
use crate::entity::EntityId;
use crate::store::{Columns, Direction, Query, Relation, StoreError, StoreResult};
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use parking_lot::Mutex;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

/// Rows of one table keyed by identity.
pub(crate) type Table = BTreeMap<EntityId, Document>;

/// Relations known to a store.
#[derive(Debug, Clone, Default)]
pub(crate) struct Schema {
    relations: HashMap<String, Vec<Relation>>,
}

impl Schema {
    pub(crate) fn add_relation(&mut self, table: &str, relation: Relation) {
        self.relations
            .entry(table.to_string())
            .or_default()
            .push(relation);
    }

    fn relation(&self, table: &str, name: &str) -> Option<&Relation> {
        self.relations
            .get(table)
            .and_then(|rels| rels.iter().find(|r| r.name == name))
    }

    fn is_relation_field(&self, table: &str, field: &str) -> bool {
        self.relations
            .get(table)
            .is_some_and(|rels| rels.iter().any(|r| r.field == field))
    }

    /// Removes attached relation rows; they are never written back.
    fn strip_relations(&self, table: &str, doc: &mut Document) {
        if let Some(rels) = self.relations.get(table) {
            for rel in rels {
                doc.remove(&rel.field);
            }
        }
    }

    /// Checks that every segment of a dotted preload path is declared.
    fn check_path(&self, table: &str, path: &str) -> StoreResult<()> {
        let mut current = table;
        for segment in path.split('.') {
            let rel = self
                .relation(current, segment)
                .ok_or_else(|| StoreError::UnknownRelation {
                    table: current.to_string(),
                    relation: segment.to_string(),
                })?;
            current = &rel.target_table;
        }
        Ok(())
    }
}

/// Issues strictly increasing RFC 3339 timestamps.
#[derive(Debug)]
pub(crate) struct Clock {
    last: Mutex<Option<DateTime<Utc>>>,
}

impl Clock {
    pub(crate) fn new() -> Self {
        Self {
            last: Mutex::new(None),
        }
    }

    pub(crate) fn stamp(&self) -> Value {
        let mut last = self.last.lock();
        let mut now = Utc::now();
        if let Some(prev) = *last {
            if now <= prev {
                now = prev + Duration::nanoseconds(1);
            }
        }
        *last = Some(now);
        Value::String(now.to_rfc3339_opts(SecondsFormat::Nanos, true))
    }
}

fn matches(row: &Document, filter: &[(&String, &Value)]) -> bool {
    filter.iter().all(|(k, v)| row.get(*k) == Some(*v))
}

fn active_filter<'a>(schema: &Schema, table: &str, filter: &'a Document) -> Vec<(&'a String, &'a Value)> {
    filter
        .iter()
        .filter(|(k, v)| !is_zero(v) && !schema.is_relation_field(table, k))
        .collect()
}

fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(Value::String(a)), Some(Value::String(b))) => {
            match (DateTime::parse_from_rfc3339(a), DateTime::parse_from_rfc3339(b)) {
                (Ok(a), Ok(b)) => a.cmp(&b),
                _ => a.cmp(b),
            }
        }
        (Some(Value::Number(a)), Some(Value::Number(b))) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::Bool(a)), Some(Value::Bool(b))) => a.cmp(b),
        _ => Ordering::Equal,
    }
}

/// Runs a query against one table.
///
/// `lookup` resolves rows of other tables for preloading.
pub(crate) fn select<L>(
    schema: &Schema,
    table: &str,
    rows: Option<&Table>,
    query: &Query,
    lookup: &L,
) -> StoreResult<Vec<Document>>
where
    L: Fn(&str, EntityId) -> Option<Document>,
{
    for path in query.preload_names() {
        schema.check_path(table, path)?;
    }

    let filter = active_filter(schema, table, query.filter_doc());
    let mut out: Vec<Document> = rows
        .into_iter()
        .flat_map(|t| t.iter())
        .filter(|(id, _)| query.id_set().map_or(true, |ids| ids.contains(id)))
        .filter(|(_, row)| matches(row, &filter))
        .map(|(_, row)| row.clone())
        .collect();

    if let Some(order) = query.ordering() {
        out.sort_by(|a, b| {
            let ord = compare(a.get(&order.column), b.get(&order.column));
            match order.direction {
                Direction::Asc => ord,
                Direction::Desc => ord.reverse(),
            }
        });
    }
    if let Some(limit) = query.row_limit() {
        out.truncate(limit);
    }

    for row in &mut out {
        for path in query.preload_names() {
            attach(schema, table, row, path, lookup);
        }
    }
    Ok(out)
}

/// Attaches the row(s) named by a dotted preload path. Paths are checked
/// by [`select`] beforehand.
fn attach<L>(schema: &Schema, table: &str, row: &mut Document, path: &str, lookup: &L)
where
    L: Fn(&str, EntityId) -> Option<Document>,
{
    let (head, rest) = match path.split_once('.') {
        Some((head, rest)) => (head, Some(rest)),
        None => (path, None),
    };
    let Some(rel) = schema.relation(table, head) else {
        return;
    };

    let target_id = document_id(row, &rel.foreign_key);
    let target = if target_id.is_nil() {
        None
    } else {
        lookup(&rel.target_table, target_id)
    };

    let value = match target {
        Some(mut target) => {
            if let Some(rest) = rest {
                attach(schema, &rel.target_table, &mut target, rest, lookup);
            }
            Value::Object(target)
        }
        None => Value::Null,
    };
    row.insert(rel.field.clone(), value);
}

/// Counts rows matching the non-zero fields of `filter`.
pub(crate) fn count(schema: &Schema, table: &str, rows: Option<&Table>, filter: &Document) -> u64 {
    let filter = active_filter(schema, table, filter);
    rows.map_or(0, |t| t.values().filter(|row| matches(row, &filter)).count() as u64)
}

fn parse_id(table: &str, columns: Columns, doc: &Document) -> StoreResult<EntityId> {
    match doc.get(columns.id) {
        None | Some(Value::Null) => Ok(EntityId::nil()),
        Some(Value::String(s)) => s
            .parse()
            .map_err(|_| StoreError::invalid_document(table, format!("bad identity {s:?}"))),
        Some(other) => Err(StoreError::invalid_document(
            table,
            format!("identity must be a string, got {other}"),
        )),
    }
}

/// Inserts a row, assigning an identity and timestamps when unset.
pub(crate) fn insert(
    schema: &Schema,
    clock: &Clock,
    table: &str,
    columns: Columns,
    rows: &mut Table,
    mut doc: Document,
) -> StoreResult<Document> {
    schema.strip_relations(table, &mut doc);

    let mut id = parse_id(table, columns, &doc)?;
    if id.is_nil() {
        id = EntityId::new();
        doc.insert(columns.id.to_string(), Value::String(id.to_string()));
    }
    if rows.contains_key(&id) {
        return Err(StoreError::Conflict {
            table: table.to_string(),
            id,
        });
    }

    let now = clock.stamp();
    for column in [columns.created_at, columns.updated_at] {
        if doc.get(column).map_or(true, is_zero) {
            doc.insert(column.to_string(), now.clone());
        }
    }

    rows.insert(id, doc.clone());
    Ok(doc)
}

/// Replaces every field of a row, inserting it when absent.
pub(crate) fn save(
    schema: &Schema,
    clock: &Clock,
    table: &str,
    columns: Columns,
    rows: &mut Table,
    mut doc: Document,
) -> StoreResult<Document> {
    let id = parse_id(table, columns, &doc)?;
    if id.is_nil() {
        return Err(StoreError::invalid_document(table, "save requires an identity"));
    }

    let Some(existing) = rows.get(&id) else {
        return insert(schema, clock, table, columns, rows, doc);
    };

    schema.strip_relations(table, &mut doc);
    if doc.get(columns.created_at).map_or(true, is_zero) {
        if let Some(created) = existing.get(columns.created_at) {
            doc.insert(columns.created_at.to_string(), created.clone());
        }
    }
    doc.insert(columns.updated_at.to_string(), clock.stamp());

    rows.insert(id, doc.clone());
    Ok(doc)
}

/// Writes the non-zero fields of `patch` onto row `id`.
///
/// Returns the updated row, or `None` if it does not exist.
pub(crate) fn update_fields(
    schema: &Schema,
    clock: &Clock,
    table: &str,
    columns: Columns,
    rows: &mut Table,
    id: EntityId,
    patch: &Document,
) -> Option<Document> {
    let row = rows.get_mut(&id)?;
    for (column, value) in patch {
        if is_zero(value) || column == columns.id || schema.is_relation_field(table, column) {
            continue;
        }
        row.insert(column.clone(), value.clone());
    }
    row.insert(columns.updated_at.to_string(), clock.stamp());
    Some(row.clone())
}
