//! Mapping between raw API payloads and object attribute sets.
//!
//! Inbound, a payload becomes an attribute map plus the relation references
//! it carries. Outbound, only dirty fields are emitted so a save never
//! overwrites remote fields this process did not touch.
//!
//! A `null` relation field clears the link; an absent field yields no
//! reference at all and leaves any existing link alone.

use std::collections::BTreeSet;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};

use crate::error::ApiError;
use crate::schema::{schema, FieldType, RelationSpec};
use crate::types::{ResourceId, ResourceKind};

pub type Attributes = Map<String, Value>;

#[derive(Debug, Clone, PartialEq)]
pub enum ReferenceValue {
    One(ResourceId),
    Many(Vec<ResourceId>),
    /// Full payloads of related objects delivered inline.
    Embedded(Vec<Value>),
    Cleared,
}

/// One relation reference found in a payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Reference {
    pub field: &'static str,
    pub relation: RelationSpec,
    pub value: ReferenceValue,
}

/// Result of reading one payload.
#[derive(Debug, Clone)]
pub struct Transformed {
    pub id: ResourceId,
    pub attributes: Attributes,
    pub references: Vec<Reference>,
}

/// Read a raw payload of `kind`. Unknown fields are kept uninterpreted.
pub fn to_attributes(kind: ResourceKind, raw: Value) -> Result<Transformed, ApiError> {
    let attributes = match raw {
        Value::Object(map) => map,
        other => {
            return Err(ApiError::Deserialization(format!(
                "expected a {kind} object, got {}",
                type_name(&other)
            )))
        }
    };
    let id = match attributes.get("id") {
        Some(Value::String(id)) if !id.is_empty() => ResourceId::new(id.clone()),
        _ => {
            return Err(ApiError::Deserialization(format!(
                "{kind} payload has no string id"
            )))
        }
    };

    let table = schema(kind);
    for (name, value) in &attributes {
        if let Some(field) = table.field(name) {
            check_type(kind, field.name, field.ty, value)?;
        }
    }

    let references = references(kind, &attributes);
    Ok(Transformed {
        id,
        attributes,
        references,
    })
}

/// Relation references present in `attributes`, in schema order.
pub fn references(kind: ResourceKind, attributes: &Attributes) -> Vec<Reference> {
    schema(kind)
        .relations()
        .filter_map(|(field, relation)| {
            let raw = attributes.get(field.name)?;
            let value = match (field.ty, raw) {
                (_, Value::Null) => ReferenceValue::Cleared,
                (FieldType::Id, Value::String(id)) => ReferenceValue::One(ResourceId::new(id.clone())),
                (FieldType::IdList, Value::Array(items)) => ReferenceValue::Many(
                    items
                        .iter()
                        .filter_map(Value::as_str)
                        .map(ResourceId::from)
                        .collect(),
                ),
                (FieldType::Embedded, Value::Array(items)) => ReferenceValue::Embedded(items.clone()),
                _ => return None,
            };
            Some(Reference {
                field: field.name,
                relation,
                value,
            })
        })
        .collect()
}

/// Build an update payload holding exactly the dirty fields. A dirty field
/// no longer present locally is sent as `null`.
pub fn to_payload(attributes: &Attributes, dirty: &BTreeSet<String>) -> Attributes {
    dirty
        .iter()
        .map(|name| (name.clone(), attributes.get(name).cloned().unwrap_or(Value::Null)))
        .collect()
}

pub fn parse_date(value: &Value) -> Option<DateTime<Utc>> {
    value
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

/// Trello's timestamp format: RFC 3339, millisecond precision, `Z` suffix.
pub fn format_date(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Type-check one value against `kind`'s schema. Unknown fields pass.
pub(crate) fn check_field(kind: ResourceKind, field: &str, value: &Value) -> Result<(), ApiError> {
    match schema(kind).field(field) {
        Some(spec) => check_type(kind, spec.name, spec.ty, value),
        None => Ok(()),
    }
}

fn check_type(kind: ResourceKind, field: &str, ty: FieldType, value: &Value) -> Result<(), ApiError> {
    let ok = match (ty, value) {
        (_, Value::Null) | (FieldType::Json, _) => true,
        (FieldType::Text | FieldType::Id | FieldType::Date, Value::String(_)) => true,
        (FieldType::Flag, Value::Bool(_)) => true,
        (FieldType::Number, Value::Number(_)) => true,
        (FieldType::IdList, Value::Array(items)) => items.iter().all(Value::is_string),
        (FieldType::Embedded, Value::Array(items)) => items.iter().all(Value::is_object),
        _ => false,
    };
    if ok {
        Ok(())
    } else {
        Err(ApiError::InvalidField {
            kind,
            field: field.to_string(),
            expected: ty.describe(),
        })
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
