//! GlideElement - the value/display value pair behind every field of a row

use std::fmt;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde_json::{json, Value};

use crate::error::{Error, Result};

/// Wire format of date/time values, always UTC
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq)]
pub struct GlideElement {
    name: String,
    value: Value,
    display_value: Value,
    changed: bool,
}

impl GlideElement {
    pub fn new(name: &str, value: impl Into<Value>) -> Self {
        Self {
            name: name.to_string(),
            value: value.into(),
            display_value: Value::Null,
            changed: false,
        }
    }

    pub fn with_display(name: &str, value: impl Into<Value>, display_value: impl Into<Value>) -> Self {
        let mut element = Self::new(name, value);
        element.display_value = display_value.into();
        element
    }

    /// Builds an element from a row entry as returned by the Table API.
    ///
    /// With `sysparm_display_value=all` every field arrives as
    /// `{"value": .., "display_value": ..}`; the display value is only kept
    /// when it differs from the value.
    pub fn from_api(name: &str, raw: Value) -> Self {
        match raw {
            Value::Object(mut map) if map.contains_key("value") || map.contains_key("display_value") => {
                let value = map.remove("value").unwrap_or(Value::Null);
                let display = map.remove("display_value").unwrap_or(Value::Null);
                let display_value = if display != value { display } else { Value::Null };
                Self {
                    name: name.to_string(),
                    value,
                    display_value,
                    changed: false,
                }
            }
            other => Self::new(name, other),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The value, or the display value if this element only has one
    pub fn value(&self) -> &Value {
        if !self.value.is_null() {
            return &self.value;
        }
        &self.display_value
    }

    /// The display value if set, else the value
    pub fn display_value(&self) -> &Value {
        if truthy(&self.display_value) {
            return &self.display_value;
        }
        &self.value
    }

    /// The value as a string; strings are returned bare, other JSON as text
    pub fn value_str(&self) -> Option<String> {
        as_text(self.value())
    }

    pub fn display_str(&self) -> Option<String> {
        as_text(self.display_value())
    }

    /// Sets the value, dropping any display value. Only an actual change marks
    /// the element dirty.
    pub fn set_value(&mut self, value: impl Into<Value>) {
        let value = value.into();
        if self.value != value {
            self.changed = true;
            self.value = value;
            self.display_value = Value::Null;
        }
    }

    /// Sets the display value. This generally has no effect on the server.
    pub fn set_display_value(&mut self, value: impl Into<Value>) {
        let value = value.into();
        if self.display_value != value {
            self.changed = true;
            self.display_value = value;
        }
    }

    pub fn changes(&self) -> bool {
        self.changed
    }

    /// True if the value is null or zero length
    pub fn nil(&self) -> bool {
        match &self.value {
            Value::Null => true,
            Value::String(s) => s.is_empty(),
            Value::Array(a) => a.is_empty(),
            Value::Object(o) => o.is_empty(),
            _ => false,
        }
    }

    /// `{"value": .., "display_value": ..}`
    pub fn serialize(&self) -> Value {
        json!({
            "value": self.value(),
            "display_value": self.display_value(),
        })
    }

    /// Truthiness of the value. The string `"false"` is false, as are empty
    /// strings, zero and null.
    pub fn to_bool(&self) -> bool {
        match self.value() {
            Value::String(s) if s == "false" => false,
            other => truthy(other),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self.value() {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self.value() {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// The value parsed as a UTC date/time
    pub fn date_value(&self) -> Result<DateTime<Utc>> {
        let raw = self
            .value_str()
            .ok_or_else(|| Error::InvalidArgument(format!("{} has no date value", self.name)))?;
        let naive = NaiveDateTime::parse_from_str(&raw, TIMESTAMP_FORMAT)
            .map_err(|e| Error::InvalidArgument(format!("{} is not a date/time ({}): {}", self.name, raw, e)))?;
        Ok(Utc.from_utc_datetime(&naive))
    }

    /// Milliseconds since the epoch
    pub fn date_numeric_value(&self) -> Result<i64> {
        Ok(self.date_value()?.timestamp_millis())
    }

    pub fn set_date_numeric_value(&mut self, ms: i64) -> Result<()> {
        let dt = Utc
            .timestamp_millis_opt(ms)
            .single()
            .ok_or_else(|| Error::InvalidArgument(format!("{} is out of range for a date", ms)))?;
        self.set_value(dt.format(TIMESTAMP_FORMAT).to_string());
        Ok(())
    }

    /// Fresh, unchanged copy carrying the same value and display value
    pub(crate) fn detached(&self) -> Self {
        Self {
            name: self.name.clone(),
            value: self.value.clone(),
            display_value: self.display_value.clone(),
            changed: false,
        }
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

pub(crate) fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

impl fmt::Display for GlideElement {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.value() {
            Value::Null => Ok(()),
            Value::String(s) => write!(f, "{}", s),
            other => write!(f, "{}", other),
        }
    }
}

impl PartialEq<str> for GlideElement {
    fn eq(&self, other: &str) -> bool {
        match self.value() {
            Value::String(s) => s == other,
            _ => false,
        }
    }
}

impl PartialEq<&str> for GlideElement {
    fn eq(&self, other: &&str) -> bool {
        self == *other
    }
}

impl PartialEq<i64> for GlideElement {
    fn eq(&self, other: &i64) -> bool {
        self.as_i64() == Some(*other)
    }
}
