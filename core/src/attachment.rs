//! Attachment - cursor over `sys_attachment` rows of one table

use std::path::{Path, PathBuf};

use bytes::Bytes;
use futures::{Stream, StreamExt, TryStreamExt};
use serde_json::Value;
use tokio::io::AsyncWriteExt;

use crate::api::attachment::Upload;
use crate::api::Params;
use crate::client::ServiceNowClient;
use crate::cursor::{rows_from, Cursor, Row};
use crate::element::GlideElement;
use crate::error::{Error, Result};
use crate::query::{Query, QueryCondition};

const NOTHING_TO_READ: &str = "cannot read nothing, iterate the attachment";

pub struct Attachment {
    client: ServiceNowClient,
    table: String,
    query: Query,
    encoded_query: Option<String>,
    cursor: Cursor,
}

impl Attachment {
    pub(crate) fn new(client: ServiceNowClient, table: &str) -> Self {
        let batch_size = client.default_batch_size();
        let mut attachment = Self {
            client,
            table: table.to_string(),
            query: Query::new(Some(table)),
            encoded_query: None,
            cursor: Cursor::new(batch_size),
        };
        // an empty table name matches attachments of any table
        if !table.is_empty() {
            attachment.add_query("table_name", table, None);
        }
        attachment
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn add_query(&mut self, name: &str, operator: &str, value: Option<&str>) -> &mut QueryCondition {
        self.query.add_query(name, operator, value)
    }

    pub fn add_encoded_query(&mut self, encoded_query: &str) {
        self.encoded_query = Some(encoded_query.to_string());
    }

    pub fn set_limit(&mut self, limit: usize) {
        self.cursor.limit = Some(limit);
    }

    pub fn parameters(&self) -> Params {
        let mut params = Params::new();
        params.set(
            "sysparm_query",
            self.query.generate_query(self.encoded_query.as_deref(), None),
        );
        self.cursor.page_params(&mut params);
        params
    }

    /// Fetches the next page of attachment metadata
    pub async fn query(&mut self) -> Result<()> {
        let response = self.client.attachment_api().list(self.parameters()).await?;
        let rows = rows_from(response.result()?)?;
        let total = response
            .total_count()
            .unwrap_or(self.cursor.rows.len() + rows.len());
        tracing::debug!("Fetched {} attachment(s) of {} on {}", rows.len(), total, self.table);
        self.cursor.append(rows, total);
        Ok(())
    }

    pub async fn next(&mut self) -> Result<bool> {
        if self.cursor.advance(true) {
            return Ok(true);
        }
        if self.cursor.should_fetch() {
            self.query().await?;
            return Ok(self.cursor.advance(true));
        }
        Ok(false)
    }

    pub fn rewind(&mut self) {
        self.cursor.rewind();
    }

    /// Loads one attachment's metadata. `Ok(false)` when it does not exist.
    pub async fn get(&mut self, sys_id: &str) -> Result<bool> {
        let response = match self.client.attachment_api().get(sys_id).await {
            Ok(response) => response,
            Err(Error::NotFound(_)) => return Ok(false),
            Err(e) => return Err(e),
        };
        self.cursor.set_single(Row::from_api(response.result()?)?);
        Ok(true)
    }

    /// Deletes the current attachment
    pub async fn delete(&self) -> Result<()> {
        let sys_id = self.require_sys_id()?;
        let response = self.client.attachment_api().delete(&sys_id).await?;
        if response.status != 204 {
            return Err(Error::Request(response.text()));
        }
        Ok(())
    }

    /// Uploads a file onto a row of this table and returns the new
    /// attachment's URL from the `Location` header.
    pub async fn add_attachment(
        &self,
        table_sys_id: &str,
        file_name: &str,
        data: impl Into<Bytes>,
        content_type: Option<&str>,
        encryption_context: Option<&str>,
    ) -> Result<String> {
        let upload = Upload {
            file_name,
            table_name: &self.table,
            table_sys_id,
            content_type,
            encryption_context,
        };
        let response = self.client.attachment_api().upload_file(&upload, data).await?;
        tracing::info!("Uploaded {} to {}/{}", file_name, self.table, table_sys_id);
        response
            .header("Location")
            .map(|l| l.to_string())
            .ok_or_else(|| Error::Upload(format!("no Location header in response: {}", response.text())))
    }

    pub fn get_value(&self, field: &str) -> Option<&Value> {
        self.cursor
            .current_row()
            .and_then(|row| row.get(field))
            .map(GlideElement::value)
    }

    pub fn get_element(&self, field: &str) -> Option<&GlideElement> {
        self.cursor.current_row().and_then(|row| row.get(field))
    }

    pub fn contains(&self, field: &str) -> bool {
        self.get_element(field).is_some()
    }

    pub fn sys_id(&self) -> Option<String> {
        self.get_element("sys_id").and_then(GlideElement::value_str)
    }

    pub fn file_name(&self) -> Option<String> {
        self.get_element("file_name").and_then(GlideElement::value_str)
    }

    fn require_sys_id(&self) -> Result<String> {
        self.sys_id()
            .ok_or_else(|| Error::NoRecord(NOTHING_TO_READ.to_string()))
    }

    /// Download URL of the current attachment
    pub fn get_link(&self) -> Option<String> {
        self.cursor.current_row()?;
        let sys_id = self.sys_id()?;
        Some(format!("{}/api/now/v1/attachment/{}/file", self.client.instance(), sys_id))
    }

    /// The whole file
    pub async fn read(&self) -> Result<Bytes> {
        let sys_id = self.require_sys_id()?;
        Ok(self.client.attachment_api().get_file(&sys_id).await?.body)
    }

    /// The file as UTF-8 text, split on `delimiter`
    pub async fn read_lines(&self, delimiter: &str) -> Result<Vec<String>> {
        let data = self.read().await?;
        let text = std::str::from_utf8(&data)
            .map_err(|e| Error::InvalidArgument(format!("attachment is not UTF-8: {}", e)))?;
        Ok(text.split(delimiter).map(|s| s.to_string()).collect())
    }

    /// The file as a stream of chunks
    pub async fn stream(&self) -> Result<impl Stream<Item = Result<Bytes>>> {
        let sys_id = self.require_sys_id()?;
        let response = self.client.attachment_api().get_file_stream(&sys_id).await?;
        Ok(response.bytes_stream().map_err(Error::from))
    }

    /// Streams the file to disk. A directory gets the attachment's own file
    /// name appended.
    pub async fn write_to(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let mut target = path.as_ref().to_path_buf();
        if target.is_dir() {
            let file_name = self
                .file_name()
                .ok_or_else(|| Error::InvalidArgument("attachment has no file_name".to_string()))?;
            target = target.join(file_name);
        }

        let mut stream = Box::pin(self.stream().await?);
        let mut file = tokio::fs::File::create(&target).await?;
        while let Some(chunk) = stream.next().await {
            file.write_all(&chunk?).await?;
        }
        file.flush().await?;
        tracing::debug!("Wrote attachment to {}", target.display());
        Ok(target)
    }

    /// Total attachments matching the query
    pub fn len(&self) -> usize {
        self.cursor.row_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for Attachment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attachment")
            .field("table", &self.table)
            .field("location", &self.cursor.current)
            .field("total", &self.cursor.total)
            .finish()
    }
}
