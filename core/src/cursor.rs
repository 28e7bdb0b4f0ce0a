//! Paging state shared by record and attachment result sets

use serde_json::Value;

use crate::api::Params;
use crate::element::GlideElement;
use crate::error::{Error, Result};

/// One row of a result set, fields in the order the instance sent them
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Row(Vec<GlideElement>);

impl Row {
    pub(crate) fn from_api(raw: Value) -> Result<Self> {
        match raw {
            Value::Object(map) => Ok(Row(map
                .into_iter()
                .map(|(name, value)| GlideElement::from_api(&name, value))
                .collect())),
            other => Err(Error::Request(format!("expected a row object, got {}", other))),
        }
    }

    pub(crate) fn get(&self, name: &str) -> Option<&GlideElement> {
        self.0.iter().find(|e| e.name() == name)
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Option<&mut GlideElement> {
        self.0.iter_mut().find(|e| e.name() == name)
    }

    pub(crate) fn push(&mut self, element: GlideElement) {
        self.0.push(element);
    }

    pub(crate) fn names(&self) -> Vec<String> {
        self.0.iter().map(|e| e.name().to_string()).collect()
    }

    pub(crate) fn elements(&self) -> impl Iterator<Item = &GlideElement> {
        self.0.iter()
    }

    /// Unchanged copy of every element
    pub(crate) fn detached(&self) -> Self {
        Row(self.0.iter().map(GlideElement::detached).collect())
    }
}

/// Position in a lazily fetched result set. `current` is -1 before the
/// first row.
#[derive(Debug)]
pub(crate) struct Cursor {
    pub(crate) rows: Vec<Row>,
    pub(crate) current: i64,
    pub(crate) total: Option<usize>,
    pub(crate) limit: Option<usize>,
    pub(crate) batch_size: usize,
}

impl Cursor {
    pub(crate) fn new(batch_size: usize) -> Self {
        Self {
            rows: Vec::new(),
            current: -1,
            total: None,
            limit: None,
            batch_size,
        }
    }

    pub(crate) fn current_row(&self) -> Option<&Row> {
        if self.current < 0 {
            return None;
        }
        self.rows.get(self.current as usize)
    }

    pub(crate) fn current_row_mut(&mut self) -> Option<&mut Row> {
        if self.current < 0 {
            return None;
        }
        self.rows.get_mut(self.current as usize)
    }

    /// `sysparm_limit` for the next fetch. Near a limit the request shrinks
    /// so the total fetched never passes it.
    pub(crate) fn limit_param(&self) -> Option<i64> {
        let batch = self.batch_size as i64;
        let mut limit = None;
        if let Some(max) = self.limit.filter(|l| *l > 0).map(|l| l as i64) {
            if max >= batch {
                if self.current + batch > max {
                    limit = Some(max - self.current - 1);
                }
            } else {
                limit = Some(max);
            }
        }
        if limit.is_none() && batch > 0 {
            limit = Some(batch);
        }
        limit.filter(|l| *l != 0)
    }

    pub(crate) fn offset(&self) -> i64 {
        self.current + 1
    }

    /// Adds `sysparm_limit` and `sysparm_offset`
    pub(crate) fn page_params(&self, params: &mut Params) {
        if let Some(limit) = self.limit_param() {
            params.set("sysparm_limit", limit);
        }
        params.set("sysparm_offset", self.offset());
    }

    /// Moves to the next fetched row. When `keep_previous` is false the row
    /// being left is released.
    pub(crate) fn advance(&mut self, keep_previous: bool) -> bool {
        let next = self.current + 1;
        if next < 0 || next as usize >= self.rows.len() {
            return false;
        }
        if !keep_previous && self.current >= 0 {
            self.rows[self.current as usize] = Row::default();
        }
        self.current = next;
        true
    }

    pub(crate) fn has_next(&self) -> bool {
        let next = self.current + 1;
        next >= 0 && (next as usize) < self.rows.len()
    }

    /// True when the next row lives on a page not fetched yet
    pub(crate) fn should_fetch(&self) -> bool {
        let total = match self.total {
            Some(t) if t > 0 => t as i64,
            _ => return false,
        };
        let next = self.current + 1;
        if next >= total || total <= self.rows.len() as i64 {
            return false;
        }
        match self.limit.filter(|l| *l > 0) {
            Some(limit) => next < limit as i64,
            None => true,
        }
    }

    pub(crate) fn append(&mut self, rows: Vec<Row>, total: usize) {
        self.rows.extend(rows);
        self.total = Some(total);
    }

    /// Replaces the result set with exactly one row, positioned on it
    pub(crate) fn set_single(&mut self, row: Row) {
        self.rows = vec![row];
        self.current = 0;
        self.total = Some(1);
    }

    pub(crate) fn rewind(&mut self) {
        self.current = -1;
    }

    pub(crate) fn set_location(&mut self, location: i64) -> Result<()> {
        let total = self
            .total
            .ok_or_else(|| Error::InvalidArgument("no location to be had when we have no query".to_string()))?;
        if location < -1 || location >= total as i64 {
            return Err(Error::InvalidArgument(format!(
                "location {} is outside -1..{}",
                location, total
            )));
        }
        self.current = location;
        Ok(())
    }

    pub(crate) fn row_count(&self) -> usize {
        self.total.unwrap_or(0)
    }
}

/// Decodes the `result` array of a list response
pub(crate) fn rows_from(result: Value) -> Result<Vec<Row>> {
    match result {
        Value::Array(items) => items.into_iter().map(Row::from_api).collect(),
        other => Err(Error::Request(format!("expected a result list, got {}", other))),
    }
}
