//! snc core library
//! GlideRecord style access to the ServiceNow Table, Attachment and Batch APIs

pub mod api;
pub mod attachment;
pub mod auth;
pub mod client;
pub mod config;
mod cursor;
pub mod element;
pub mod error;
pub mod instance;
pub mod query;
pub mod record;

pub use attachment::Attachment;
pub use auth::{Credentials, TokenData};
pub use client::{ClientBuilder, ClientCert, ServiceNowClient};
pub use element::GlideElement;
pub use error::{Error, Result};
pub use query::{JoinQuery, Query, QueryCondition};
pub use record::{ColumnMode, DisplayValue, GlideRecord, SerializeMode};
