//! GlideRecord - query, iterate and write the rows of one table
//!
//! ```no_run
//! # async fn run(client: snc_core::ServiceNowClient) -> snc_core::Result<()> {
//! let mut gr = client.glide_record("incident");
//! gr.add_active_query();
//! gr.set_limit(10);
//! gr.query().await?;
//! while gr.next().await? {
//!     println!("{:?}", gr.get_value("number")?);
//! }
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use serde_json::{Map, Value};
use url::Url;

use crate::api::{ApiResponse, BatchResult, Params};
use crate::attachment::Attachment;
use crate::client::ServiceNowClient;
use crate::cursor::{rows_from, Cursor, Row};
use crate::element::GlideElement;
use crate::error::{error_message, Error, Result};
use crate::query::{JoinQuery, Query, QueryCondition};

const DEFAULT_ORDER: &str = "ORDERBYsys_id";

/// Parameter strings longer than this go through the batch API instead of a
/// plain GET, staying clear of the instance's URL length limit.
const MAX_GET_PARAMS_LEN: usize = 10_000;

const WIDE_COLUMNS: usize = 20;

const NO_RECORD: &str = "cannot get a value from nothing, did you forget to call next() or initialize()?";

/// What `sysparm_display_value` asks the instance for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayValue {
    /// Display values only
    True,
    /// Raw database values only
    False,
    /// Both, as `{value, display_value}` pairs
    #[default]
    All,
}

impl DisplayValue {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisplayValue::True => "true",
            DisplayValue::False => "false",
            DisplayValue::All => "all",
        }
    }
}

impl FromStr for DisplayValue {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "true" => Ok(DisplayValue::True),
            "false" => Ok(DisplayValue::False),
            "all" => Ok(DisplayValue::All),
            other => Err(Error::InvalidArgument(format!(
                "display value must be true, false or all, got {}",
                other
            ))),
        }
    }
}

/// Which half of each element [`GlideRecord::serialize`] emits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SerializeMode {
    #[default]
    Value,
    Display,
    /// `{value, display_value}` per field
    Both,
}

/// Column layout for [`GlideRecord::to_columns`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColumnMode {
    /// Split a field into `__value`/`__display` only when they differ somewhere
    #[default]
    Smart,
    Both,
    Value,
    Display,
}

impl FromStr for ColumnMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "smart" => Ok(ColumnMode::Smart),
            "both" => Ok(ColumnMode::Both),
            "value" => Ok(ColumnMode::Value),
            "display" => Ok(ColumnMode::Display),
            other => Err(Error::InvalidArgument(format!("unknown column mode {}", other))),
        }
    }
}

pub struct GlideRecord {
    client: ServiceNowClient,
    table: String,
    query: Query,
    encoded_query: Option<String>,
    order: Option<String>,
    cursor: Cursor,
    field_limits: Option<Vec<String>>,
    view: Option<String>,
    display_value: DisplayValue,
    is_new_record: bool,
    rewindable: bool,
}

impl GlideRecord {
    pub(crate) fn new(client: ServiceNowClient, table: &str, batch_size: usize) -> Self {
        Self {
            client,
            table: table.to_string(),
            query: Query::new(Some(table)),
            encoded_query: None,
            order: None,
            cursor: Cursor::new(batch_size),
            field_limits: None,
            view: None,
            display_value: DisplayValue::All,
            is_new_record: false,
            rewindable: true,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn batch_size(&self) -> usize {
        self.cursor.batch_size
    }

    /// Rows fetched per request. Must stay below any limit already set.
    pub fn set_batch_size(&mut self, size: usize) -> Result<()> {
        if size == 0 {
            return Err(Error::InvalidArgument("batch size must be positive".to_string()));
        }
        if let Some(limit) = self.cursor.limit {
            if size >= limit {
                return Err(Error::InvalidArgument(format!(
                    "batch size {} must be below the limit {}",
                    size, limit
                )));
            }
        }
        self.cursor.batch_size = size;
        Ok(())
    }

    pub fn limit(&self) -> Option<usize> {
        self.cursor.limit
    }

    pub fn set_limit(&mut self, limit: usize) {
        self.cursor.limit = Some(limit);
    }

    /// Fields this record will query, or has queried
    pub fn fields(&self) -> Option<Vec<String>> {
        if let Some(fields) = &self.field_limits {
            return Some(fields.clone());
        }
        self.cursor
            .current_row()
            .or_else(|| self.cursor.rows.first())
            .map(Row::names)
    }

    /// Restricts the queried fields, comma separated. `sys_id` is always
    /// included, first.
    pub fn set_fields(&mut self, fields: &str) {
        let mut fields: Vec<String> = fields
            .split(',')
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty())
            .collect();
        if fields.is_empty() {
            self.field_limits = None;
            return;
        }
        if !fields.iter().any(|f| f == "sys_id") {
            fields.insert(0, "sys_id".to_string());
        }
        self.field_limits = Some(fields);
    }

    pub fn view(&self) -> Option<&str> {
        self.view.as_deref()
    }

    pub fn set_view(&mut self, view: &str) {
        self.view = Some(view.to_string());
    }

    pub fn display_mode(&self) -> DisplayValue {
        self.display_value
    }

    pub fn set_display_mode(&mut self, mode: DisplayValue) {
        self.display_value = mode;
    }

    pub fn is_rewindable(&self) -> bool {
        self.rewindable
    }

    /// A non-rewindable record releases each row once iterated past and can
    /// be walked only once.
    pub fn set_rewindable(&mut self, rewindable: bool) {
        self.rewindable = rewindable;
    }

    /// Current position, -1 before iteration starts
    pub fn location(&self) -> i64 {
        self.cursor.current
    }

    pub fn set_location(&mut self, location: i64) -> Result<()> {
        self.cursor.set_location(location)
    }

    /// Total rows matching the query, as reported by the instance
    pub fn get_row_count(&self) -> usize {
        self.cursor.row_count()
    }

    pub fn order_by(&mut self, column: &str) {
        self.order = (!column.is_empty()).then(|| format!("ORDERBY{}", column));
    }

    pub fn order_by_desc(&mut self, column: &str) {
        self.order = (!column.is_empty()).then(|| format!("ORDERBYDESC{}", column));
    }

    /// `add_query("active", "true", None)` gives `active=true`;
    /// `add_query("name", "LIKE", Some("test"))` gives `nameLIKEtest`.
    pub fn add_query(&mut self, name: &str, operator: &str, value: Option<&str>) -> &mut QueryCondition {
        self.query.add_query(name, operator, value)
    }

    pub fn add_active_query(&mut self) -> &mut QueryCondition {
        self.query.add_active_query()
    }

    pub fn add_null_query(&mut self, field: &str) -> &mut QueryCondition {
        self.query.add_null_query(field)
    }

    pub fn add_not_null_query(&mut self, field: &str) -> &mut QueryCondition {
        self.query.add_not_null_query(field)
    }

    pub fn add_join_query(
        &mut self,
        join_table: &str,
        primary_field: Option<&str>,
        join_table_field: Option<&str>,
    ) -> Result<&mut JoinQuery> {
        let table = self.table.clone();
        self.query
            .add_join_query(join_table, primary_field, join_table_field)
            .ok_or_else(|| Error::InvalidArgument(format!("cannot join from {}", table)))
    }

    /// Raw `sysparm_query`, appended after all other conditions
    pub fn add_encoded_query(&mut self, encoded_query: &str) {
        self.encoded_query = Some(encoded_query.to_string());
    }

    /// The encoded query including its order clause. Limits are not part of it.
    pub fn get_encoded_query(&self) -> String {
        self.encoded_for(&self.query)
    }

    fn encoded_for(&self, query: &Query) -> String {
        let order = self.order.as_deref().unwrap_or(DEFAULT_ORDER);
        query.generate_query(self.encoded_query.as_deref(), Some(order))
    }

    /// Request parameters for the next page
    pub fn parameters(&self) -> Params {
        self.parameters_for(&self.query)
    }

    fn parameters_for(&self, query: &Query) -> Params {
        let mut params = Params::new();
        params.set("sysparm_query", self.encoded_for(query));
        if let Some(fields) = &self.field_limits {
            params.set("sysparm_fields", fields.join(","));
        }
        if let Some(view) = &self.view {
            params.set("sysparm_view", view);
        }
        params.set("sysparm_display_value", self.display_value.as_str());
        self.cursor.page_params(&mut params);
        params
    }

    /// Fetches the next page of results
    pub async fn query(&mut self) -> Result<()> {
        self.check_requery()?;
        let query = self.query.clone();
        self.fetch(&query).await
    }

    /// Queries with a one-off set of conditions, leaving the record's own
    /// query untouched.
    pub async fn query_with(&mut self, query: &Query) -> Result<()> {
        self.check_requery()?;
        self.fetch(query).await
    }

    fn check_requery(&self) -> Result<()> {
        if !self.rewindable && self.cursor.current > 0 {
            return Err(Error::InvalidArgument(
                "Cannot re-query a non-rewindable record that has been iterated upon".to_string(),
            ));
        }
        Ok(())
    }

    async fn fetch(&mut self, query: &Query) -> Result<()> {
        let params = self.parameters_for(query);

        let response = if params.raw_len() > MAX_GET_PARAMS_LEN {
            tracing::debug!("Query parameters too long for GET, using the batch API");
            let mut batch = self.client.batch_api();
            let id = batch.list(&self.table, params);
            let mut result = batch.execute().await?;
            result
                .responses
                .remove(&id)
                .ok_or_else(|| Error::Request("batched query was not serviced".to_string()))?
                .validate()?
        } else {
            self.client.table_api().list(&self.table, params).await?
        };

        if response.status != 200 {
            tracing::debug!("Unexpected status {} on query of {}", response.status, self.table);
            return Ok(());
        }

        let rows = rows_from(response.result()?)?;
        let total = match response.total_count() {
            Some(total) => total,
            None => {
                tracing::debug!("No X-Total-Count on query of {}", self.table);
                self.cursor.rows.len() + rows.len()
            }
        };
        tracing::debug!("Fetched {} row(s) of {} from {}", rows.len(), total, self.table);
        self.cursor.append(rows, total);
        Ok(())
    }

    /// Moves to the next row, fetching the next page when needed
    pub async fn next(&mut self) -> Result<bool> {
        if self.cursor.advance(self.rewindable) {
            return Ok(true);
        }
        if self.cursor.should_fetch() {
            let query = self.query.clone();
            self.fetch(&query).await?;
            return Ok(self.cursor.advance(self.rewindable));
        }
        Ok(false)
    }

    /// Whether another row is already fetched
    pub fn has_next(&self) -> bool {
        self.cursor.has_next()
    }

    pub fn rewind(&mut self) -> Result<()> {
        if !self.rewindable {
            return Err(Error::InvalidArgument("record is not rewindable".to_string()));
        }
        self.cursor.rewind();
        Ok(())
    }

    /// Fetches one row by `sys_id`. `Ok(false)` when it does not exist.
    pub async fn get(&mut self, sys_id: &str) -> Result<bool> {
        let response = match self
            .client
            .table_api()
            .get(&self.table, sys_id, self.parameters())
            .await
        {
            Ok(response) => response,
            Err(Error::NotFound(_)) => return Ok(false),
            Err(e) => return Err(e),
        };
        let row = Row::from_api(response.result()?)?;
        self.cursor.set_single(row);
        Ok(true)
    }

    /// Queries for `field=value` and moves to the first match
    pub async fn get_by(&mut self, field: &str, value: &str) -> Result<bool> {
        self.add_query(field, value, None);
        self.query().await?;
        self.next().await
    }

    /// Inserts the current row. Returns the new `sys_id`.
    ///
    /// Statuses >= 400 surface as `Authentication`, `Role`, `NotFound` or
    /// `Request`; `Insert` is reserved for other unexpected statuses.
    pub async fn insert(&mut self) -> Result<Option<String>> {
        let body = self.serialize(SerializeMode::Value, None, false).unwrap_or_else(empty_object);
        let response = self.client.table_api().post(&self.table, &body).await?;

        match response.status {
            201 => {
                let row = Row::from_api(response.result()?)?;
                self.cursor.set_single(row);
                self.is_new_record = false;
                Ok(self.sys_id())
            }
            status => Err(Error::Insert {
                status,
                message: write_failure(&response, "insert", 201),
            }),
        }
    }

    /// Sends the changed fields of the current row and splices the instance's
    /// answer back in, picking up business rule and calculated changes.
    pub async fn update(&mut self) -> Result<Option<String>> {
        let sys_id = self.require_sys_id()?;
        let body = self.serialize(SerializeMode::Value, None, true).unwrap_or_else(empty_object);
        let response = self.client.table_api().patch(&self.table, &sys_id, &body).await?;

        match response.status {
            200 => {
                let row = Row::from_api(response.result()?)?;
                match self.cursor.current_row_mut() {
                    Some(current) => {
                        *current = row;
                        Ok(self.sys_id())
                    }
                    None => Ok(None),
                }
            }
            status => Err(Error::Update {
                status,
                message: write_failure(&response, "update", 200),
            }),
        }
    }

    pub async fn delete(&mut self) -> Result<bool> {
        let sys_id = self.require_sys_id()?;
        let response = self.client.table_api().delete(&self.table, &sys_id).await?;

        match response.status {
            204 => Ok(true),
            status => Err(Error::Delete {
                status,
                message: write_failure(&response, "delete", 204),
            }),
        }
    }

    /// Deletes every row the query matches, in one batch. Queries first
    /// (only `sys_id`, unless fields were set) when that has not happened yet.
    pub async fn delete_multiple(&mut self) -> Result<bool> {
        if self.cursor.total.is_none() {
            if self.field_limits.is_none() {
                self.set_fields("sys_id");
            }
            self.query().await?;
        }

        let mut batch = self.client.batch_api();
        self.restart()?;
        while self.next().await? {
            if let Some(sys_id) = self.sys_id() {
                batch.delete(&self.table, &sys_id);
            }
        }
        if batch.is_empty() {
            return Ok(true);
        }
        Ok(batch.execute().await?.all_status(204))
    }

    /// PATCHes every changed row in one batch. True if all came back 200.
    pub async fn update_multiple(&mut self) -> Result<bool> {
        Ok(self.update_multiple_responses().await?.all_status(200))
    }

    /// Like [`update_multiple`](Self::update_multiple), handing back the
    /// individual responses keyed by batch request id.
    pub async fn update_multiple_responses(&mut self) -> Result<BatchResult> {
        let mut batch = self.client.batch_api();
        self.restart()?;
        while self.next().await? {
            if !self.changes() {
                continue;
            }
            if let Some(sys_id) = self.sys_id() {
                let body = self.serialize(SerializeMode::Value, None, true).unwrap_or_else(empty_object);
                batch.patch(&self.table, &sys_id, &body)?;
            }
        }
        batch.execute().await
    }

    /// Back to before the first row. A non-rewindable record can only start
    /// a walk it has not begun.
    fn restart(&mut self) -> Result<()> {
        if self.rewindable {
            self.cursor.rewind();
            return Ok(());
        }
        if self.cursor.current >= 0 {
            return Err(Error::InvalidArgument(
                "Cannot walk a non-rewindable record that has been iterated upon".to_string(),
            ));
        }
        Ok(())
    }

    fn current(&self) -> Result<&Row> {
        self.cursor
            .current_row()
            .ok_or_else(|| Error::NoRecord(NO_RECORD.to_string()))
    }

    fn current_mut(&mut self) -> Result<&mut Row> {
        self.cursor
            .current_row_mut()
            .ok_or_else(|| Error::NoRecord(NO_RECORD.to_string()))
    }

    fn require_sys_id(&self) -> Result<String> {
        self.current()?;
        self.sys_id()
            .ok_or_else(|| Error::NoRecord("current record has no sys_id".to_string()))
    }

    /// Value of a field on the current row, `None` if the row lacks it
    pub fn get_value(&self, field: &str) -> Result<Option<&Value>> {
        Ok(self.current()?.get(field).map(GlideElement::value))
    }

    pub fn get_display_value(&self, field: &str) -> Result<Option<&Value>> {
        if field.is_empty() {
            return Err(Error::InvalidArgument(
                "cannot get the display value for the entire record".to_string(),
            ));
        }
        Ok(self.current()?.get(field).map(GlideElement::display_value))
    }

    pub fn get_element(&self, field: &str) -> Result<Option<&GlideElement>> {
        Ok(self.current()?.get(field))
    }

    pub fn get_element_mut(&mut self, field: &str) -> Result<Option<&mut GlideElement>> {
        Ok(self.current_mut()?.get_mut(field))
    }

    pub fn set_value(&mut self, field: &str, value: impl Into<Value>) -> Result<()> {
        let row = self.current_mut()?;
        match row.get_mut(field) {
            Some(element) => element.set_value(value),
            None => row.push(GlideElement::new(field, value)),
        }
        Ok(())
    }

    /// Copies both halves of another element into `field`
    pub fn set_element(&mut self, field: &str, element: &GlideElement) -> Result<()> {
        let row = self.current_mut()?;
        match row.get_mut(field) {
            Some(existing) => existing.set_value(element.value().clone()),
            None => row.push(GlideElement::with_display(
                field,
                element.value().clone(),
                element.display_value().clone(),
            )),
        }
        Ok(())
    }

    pub fn set_display_value(&mut self, field: &str, value: impl Into<Value>) -> Result<()> {
        let row = self.current_mut()?;
        match row.get_mut(field) {
            Some(element) => element.set_display_value(value),
            None => row.push(GlideElement::with_display(field, Value::Null, value)),
        }
        Ok(())
    }

    /// Whether the current row has `field`
    pub fn contains(&self, field: &str) -> bool {
        self.cursor
            .current_row()
            .map(|row| row.get(field).is_some())
            .unwrap_or(false)
    }

    /// Whether the current row has changes. Element flags are combined with
    /// XOR, so an even number of changed fields reads as unchanged.
    pub fn changes(&self) -> bool {
        match self.cursor.current_row() {
            Some(row) => row.elements().fold(false, |acc, e| acc ^ e.changes()),
            None => false,
        }
    }

    pub fn sys_id(&self) -> Option<String> {
        self.cursor
            .current_row()
            .and_then(|row| row.get("sys_id"))
            .and_then(GlideElement::value_str)
    }

    /// Starts a blank row for [`insert`](Self::insert)
    pub fn initialize(&mut self) {
        self.cursor.set_single(Row::default());
        self.is_new_record = true;
    }

    pub fn is_new_record(&self) -> bool {
        self.cursor.rows.len() == 1 && self.is_new_record
    }

    /// Presets the `sys_id` of a new row; must be a 32 character GUID
    pub fn set_new_guid_value(&mut self, value: &str) -> Result<()> {
        if value.len() != 32 {
            return Err(Error::InvalidArgument("GUID must be a 32 byte string".to_string()));
        }
        self.set_value("sys_id", value)
    }

    /// Generates a GUID, sets it as the `sys_id` and returns it
    pub fn new_guid(&mut self) -> Result<String> {
        let guid = uuid::Uuid::new_v4().simple().to_string();
        self.set_new_guid_value(&guid)?;
        Ok(guid)
    }

    /// A new record holding only a copy of the current row
    pub fn pop_record(&self) -> Result<GlideRecord> {
        let row = self.current()?.detached();
        let mut gr = GlideRecord::new(self.client.clone(), &self.table, self.cursor.batch_size);
        gr.cursor.set_single(row);
        Ok(gr)
    }

    /// URL of the current row in the instance UI. With `no_stack` false the
    /// back button leads to the active list.
    pub fn get_link(&self, no_stack: bool) -> String {
        let stack = if no_stack {
            String::new()
        } else {
            format!("&sysparm_stack={}_list.do?sysparm_query=active=true", self.table)
        };
        let id = self.sys_id().unwrap_or_else(|| "null".to_string());
        format!("{}/{}.do?sys_id={}{}", self.client.instance(), self.table, id, stack)
    }

    /// URL of the list view for the current query
    pub fn get_link_list(&self) -> Result<String> {
        let base = format!("{}/{}_list.do", self.client.instance(), self.table);
        let url = Url::parse_with_params(&base, &[("sysparm_query", self.get_encoded_query())])?;
        Ok(url.to_string())
    }

    pub fn get_unique_name(&self) -> Result<Option<String>> {
        self.current()?;
        Ok(self.sys_id())
    }

    /// The current row as a JSON object, or `None` without a current row
    pub fn serialize(&self, mode: SerializeMode, fields: Option<&[&str]>, changes_only: bool) -> Option<Value> {
        let row = self.cursor.current_row()?;
        let mut out = Map::new();
        for element in row.elements() {
            if let Some(fields) = fields {
                if !fields.contains(&element.name()) {
                    continue;
                }
            }
            if changes_only && !element.changes() {
                continue;
            }
            let value = match mode {
                SerializeMode::Value => element.value().clone(),
                SerializeMode::Display => element.display_value().clone(),
                SerializeMode::Both => element.serialize(),
            };
            out.insert(element.name().to_string(), value);
        }
        Some(Value::Object(out))
    }

    /// Serializes every row of the result set, fetching pages as needed
    pub async fn serialize_all(&mut self, mode: SerializeMode, fields: Option<&[&str]>) -> Result<Vec<Value>> {
        let mut out = Vec::new();
        self.restart()?;
        while self.next().await? {
            if let Some(row) = self.serialize(mode, fields, false) {
                out.push(row);
            }
        }
        Ok(out)
    }

    /// Column oriented view of the result set, ready for a data frame.
    ///
    /// `columns` renames the generated columns and must match their count.
    /// The result set is walked once, so a non-rewindable record works as
    /// long as it has not been iterated yet.
    pub async fn to_columns(
        &mut self,
        columns: Option<&[&str]>,
        mode: ColumnMode,
    ) -> Result<Vec<(String, Vec<Value>)>> {
        let fields = self.fields().unwrap_or_default();
        if fields.len() > WIDE_COLUMNS {
            tracing::warn!(
                "Generating data for a large number of columns (>{}) - consider limiting fields",
                WIDE_COLUMNS
            );
        }

        let mut values: Vec<Vec<Value>> = vec![Vec::new(); fields.len()];
        let mut displays: Vec<Vec<Value>> = vec![Vec::new(); fields.len()];
        self.restart()?;
        while self.next().await? {
            for (i, field) in fields.iter().enumerate() {
                values[i].push(self.get_value(field)?.cloned().unwrap_or(Value::Null));
                displays[i].push(self.get_display_value(field)?.cloned().unwrap_or(Value::Null));
            }
        }

        let mut data: Vec<(String, Vec<Value>)> = Vec::new();
        for ((field, value), display) in fields.iter().zip(values).zip(displays) {
            let split = match mode {
                ColumnMode::Smart => value != display,
                ColumnMode::Both => true,
                ColumnMode::Value => {
                    data.push((field.clone(), value));
                    continue;
                }
                ColumnMode::Display => {
                    data.push((field.clone(), display));
                    continue;
                }
            };
            if split {
                data.push((format!("{}__value", field), value));
                data.push((format!("{}__display", field), display));
            } else {
                data.push((field.clone(), display));
            }
        }

        if let Some(columns) = columns {
            if columns.len() != data.len() {
                return Err(Error::InvalidArgument(format!(
                    "{} column names given for {} columns",
                    columns.len(),
                    data.len()
                )));
            }
            for ((name, _), column) in data.iter_mut().zip(columns) {
                *name = column.to_string();
            }
        }
        Ok(data)
    }

    /// Attachments of the current row, or of the whole table without one
    pub async fn get_attachments(&self) -> Result<Attachment> {
        let mut attachment = self.client.attachment(&self.table);
        if let Some(sys_id) = self.sys_id() {
            attachment.add_query("table_sys_id", &sys_id, None);
        }
        attachment.query().await?;
        Ok(attachment)
    }

    /// Uploads a file onto the current row, returning its attachment URL
    pub async fn add_attachment(
        &self,
        file_name: &str,
        data: impl Into<Bytes>,
        content_type: Option<&str>,
        encryption_context: Option<&str>,
    ) -> Result<String> {
        let sys_id = self.require_sys_id()?;
        let attachment = self.client.attachment(&self.table);
        attachment
            .add_attachment(&sys_id, file_name, data, content_type, encryption_context)
            .await
    }
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

fn write_failure(response: &ApiResponse, action: &str, expected: u16) -> String {
    match response.json::<Value>() {
        Ok(body) if body.get("error").is_some() => error_message(&body),
        _ => format!("{} response on {} -- expected {}", response.status, action, expected),
    }
}

impl fmt::Display for GlideRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.serialize(SerializeMode::Value, None, false) {
            Some(row) => write!(f, "{}({})", self.table, row),
            None => write!(f, "{}(None)", self.table),
        }
    }
}

impl fmt::Debug for GlideRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("GlideRecord")
            .field("table", &self.table)
            .field("location", &self.cursor.current)
            .field("total", &self.cursor.total)
            .finish()
    }
}
