pub mod attachment;
pub mod config;
pub mod query;
pub mod record;
