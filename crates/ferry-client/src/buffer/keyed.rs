//! Row buffer that detects duplicate keys.

use std::collections::{BTreeSet, HashMap};

use super::{AddOutcome, MergePolicy, RowBuffer};
use crate::error::{ClientError, ClientResult};
use crate::table::TableInfo;
use crate::value::{Row, Value};

/// A bounded buffer keyed by the table's primary key and unique indexes.
///
/// Key identity follows SQL semantics: a key containing NULL never
/// collides with anything.
#[derive(Debug)]
pub struct KeyedRowBuffer {
    capacity: usize,
    policy: MergePolicy,
    num_columns: usize,
    /// Column indices of each unique key.
    keys: Vec<Vec<usize>>,
    /// One map per unique key, from key values to row position.
    index: Vec<HashMap<Vec<Value>, usize>>,
    rows: Vec<Row>,
}

impl KeyedRowBuffer {
    /// Creates a buffer for rows of `table`.
    pub fn new(table: &TableInfo, capacity: usize, policy: MergePolicy) -> Self {
        let keys: Vec<Vec<usize>> = table.unique_keys().into_iter().map(<[usize]>::to_vec).collect();
        let index = vec![HashMap::with_capacity(capacity); keys.len()];

        Self {
            capacity,
            policy,
            num_columns: table.num_columns(),
            keys,
            index,
            rows: Vec::with_capacity(capacity),
        }
    }

    /// Returns the merge policy.
    pub fn policy(&self) -> MergePolicy {
        self.policy
    }

    /// Projects the row onto each unique key. `None` marks a key that
    /// contains NULL and therefore cannot collide.
    fn key_values(&self, row: &Row) -> ClientResult<Vec<Option<Vec<Value>>>> {
        self.keys
            .iter()
            .map(|columns| {
                let values = row.project(columns).ok_or_else(|| {
                    ClientError::SchemaMismatch(format!(
                        "key columns {:?} out of range for row {}",
                        columns, row
                    ))
                })?;
                Ok(if values.iter().any(Value::is_null) {
                    None
                } else {
                    Some(values)
                })
            })
            .collect()
    }

    fn collisions(&self, keys: &[Option<Vec<Value>>]) -> BTreeSet<usize> {
        keys.iter()
            .zip(&self.index)
            .filter_map(|(key, map)| key.as_ref().and_then(|k| map.get(k).copied()))
            .collect()
    }

    fn insert_keys(&mut self, keys: Vec<Option<Vec<Value>>>, position: usize) {
        for (key, map) in keys.into_iter().zip(self.index.iter_mut()) {
            if let Some(key) = key {
                map.insert(key, position);
            }
        }
    }

    fn rebuild_index(&mut self) -> ClientResult<()> {
        for map in &mut self.index {
            map.clear();
        }
        for position in 0..self.rows.len() {
            let keys = self.key_values(&self.rows[position])?;
            self.insert_keys(keys, position);
        }
        Ok(())
    }

    fn replace(&mut self, row: Row, collisions: &BTreeSet<usize>) -> ClientResult<()> {
        let mut targets = collisions.iter().copied();
        let Some(first) = targets.next() else {
            return Ok(());
        };

        self.rows[first] = row;
        // Remaining collisions are removed back to front so positions stay valid.
        for position in targets.rev().collect::<Vec<_>>() {
            self.rows.remove(position);
        }
        self.rebuild_index()
    }
}

impl RowBuffer for KeyedRowBuffer {
    fn add(&mut self, row: Row) -> ClientResult<AddOutcome> {
        if row.num_columns() != self.num_columns {
            return Err(ClientError::SchemaMismatch(format!(
                "expected {} columns, got {}",
                self.num_columns,
                row.num_columns()
            )));
        }

        let keys = self.key_values(&row)?;
        let collisions = self.collisions(&keys);

        if !collisions.is_empty() {
            if self.policy == MergePolicy::KeepLast {
                self.replace(row, &collisions)?;
            }
            return Ok(AddOutcome::Duplicate);
        }

        if self.is_full() {
            return Ok(AddOutcome::Full);
        }

        let position = self.rows.len();
        self.rows.push(row);
        self.insert_keys(keys, position);
        Ok(AddOutcome::Added)
    }

    fn drain(&mut self) -> Vec<Row> {
        for map in &mut self.index {
            map.clear();
        }
        self.rows.drain(..).collect()
    }

    fn rows(&self) -> &[Row] {
        &self.rows
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}
