//! Field-level deserializers that never fail a whole record.
//!
//! Upstream records are loosely typed: a field may arrive as a string, a
//! number, an array or not at all. Anything that cannot be used is treated
//! as absent.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::{AddressField, DateValue, EmailMeta, MessageMeta};

fn value_to_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub(crate) fn string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(value_to_string))
}

pub(crate) fn address<'de, D>(deserializer: D) -> Result<Option<AddressField>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        Value::Array(items) => Some(AddressField::List(
            items.into_iter().filter_map(value_to_string).collect(),
        )),
        other => value_to_string(other).map(AddressField::Single),
    }))
}

pub(crate) fn date<'de, D>(deserializer: D) -> Result<Option<DateValue>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .map(DateValue::Millis),
        Value::String(s) => Some(DateValue::Text(s)),
        _ => None,
    }))
}

pub(crate) fn meta<'de, D>(deserializer: D) -> Result<Option<MessageMeta>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .filter(Value::is_object)
        .and_then(|v| serde_json::from_value(v).ok()))
}

pub(crate) fn email_meta<'de, D>(deserializer: D) -> Result<Option<EmailMeta>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .filter(Value::is_object)
        .and_then(|v| serde_json::from_value(v).ok()))
}
