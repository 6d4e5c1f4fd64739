use super::{value_kind, TypeDescriptor, TypeHandler, TypeRegistry};
use chrono::{DateTime, NaiveDate, NaiveTime};
use serde_json::Value;
use std::net::IpAddr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Ascii,
    BigInt,
    Blob,
    Boolean,
    Counter,
    Date,
    Decimal,
    Double,
    Float,
    Inet,
    Int,
    SmallInt,
    Text,
    Time,
    Timestamp,
    TimeUuid,
    TinyInt,
    Uuid,
    Varchar,
    VarInt,
}

/// Built-in declarative types, in registration order.
pub(crate) const BUILTIN_SCALARS: &[(&str, ScalarKind)] = &[
    ("ascii", ScalarKind::Ascii),
    ("bigint", ScalarKind::BigInt),
    ("blob", ScalarKind::Blob),
    ("boolean", ScalarKind::Boolean),
    ("counter", ScalarKind::Counter),
    ("date", ScalarKind::Date),
    ("decimal", ScalarKind::Decimal),
    ("double", ScalarKind::Double),
    ("float", ScalarKind::Float),
    ("inet", ScalarKind::Inet),
    ("int", ScalarKind::Int),
    ("smallint", ScalarKind::SmallInt),
    ("text", ScalarKind::Text),
    ("time", ScalarKind::Time),
    ("timestamp", ScalarKind::Timestamp),
    ("timeuuid", ScalarKind::TimeUuid),
    ("tinyint", ScalarKind::TinyInt),
    ("uuid", ScalarKind::Uuid),
    ("varchar", ScalarKind::Varchar),
    ("varint", ScalarKind::VarInt),
];

/// A declarative, single-valued column type.
#[derive(Debug, Clone)]
pub struct ScalarType {
    name: String,
    kind: ScalarKind,
}

impl ScalarType {
    pub fn new(name: impl Into<String>, kind: ScalarKind) -> Self {
        ScalarType {
            name: name.into(),
            kind,
        }
    }

    pub fn scalar_kind(&self) -> ScalarKind {
        self.kind
    }
}

impl TypeHandler for ScalarType {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_counter(&self) -> bool {
        self.kind == ScalarKind::Counter
    }

    fn validate(
        &self,
        _registry: &TypeRegistry,
        _descriptor: &TypeDescriptor,
        value: &Value,
    ) -> std::result::Result<(), String> {
        let ok = match self.kind {
            ScalarKind::Text | ScalarKind::Varchar => value.is_string(),
            ScalarKind::Ascii => value.as_str().map_or(false, |s| s.is_ascii()),
            ScalarKind::Boolean => value.is_boolean(),
            ScalarKind::TinyInt => int_fits::<i8>(value),
            ScalarKind::SmallInt => int_fits::<i16>(value),
            ScalarKind::Int => int_fits::<i32>(value),
            ScalarKind::BigInt | ScalarKind::Counter => value.is_i64(),
            ScalarKind::VarInt => value.is_i64() || value.is_u64() || value.as_str().map_or(false, is_integer_literal),
            ScalarKind::Float | ScalarKind::Double => value.is_number(),
            ScalarKind::Decimal => {
                value.is_number() || value.as_str().map_or(false, |s| s.trim().parse::<f64>().is_ok())
            }
            ScalarKind::Uuid => value.as_str().map_or(false, |s| uuid::Uuid::parse_str(s).is_ok()),
            ScalarKind::TimeUuid => value
                .as_str()
                .and_then(|s| uuid::Uuid::parse_str(s).ok())
                .map_or(false, |u| u.get_version_num() == 1),
            ScalarKind::Inet => value.as_str().map_or(false, |s| s.parse::<IpAddr>().is_ok()),
            ScalarKind::Date => value
                .as_str()
                .map_or(false, |s| NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()),
            ScalarKind::Time => value
                .as_str()
                .map_or(false, |s| NaiveTime::parse_from_str(s, "%H:%M:%S%.f").is_ok()),
            ScalarKind::Timestamp => {
                value.is_i64() || value.as_str().map_or(false, |s| DateTime::parse_from_rfc3339(s).is_ok())
            }
            ScalarKind::Blob => value.as_str().map_or(false, is_hex_blob),
        };

        if ok {
            Ok(())
        } else {
            Err(format!("expected {}, got {}", self.name, describe(value)))
        }
    }

    fn to_cql(&self, _registry: &TypeRegistry, _descriptor: &TypeDescriptor, value: &Value) -> Value {
        match (self.kind, value) {
            // Timestamps travel as milliseconds since the epoch
            (ScalarKind::Timestamp, Value::String(s)) => DateTime::parse_from_rfc3339(s)
                .map(|dt| Value::from(dt.timestamp_millis()))
                .unwrap_or_else(|_| value.clone()),
            _ => value.clone(),
        }
    }
}

fn int_fits<T: TryFrom<i64>>(value: &Value) -> bool {
    value.as_i64().map_or(false, |n| T::try_from(n).is_ok())
}

fn is_integer_literal(s: &str) -> bool {
    let digits = s.strip_prefix('-').unwrap_or(s);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

fn is_hex_blob(s: &str) -> bool {
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => hex.len() % 2 == 0 && hex.bytes().all(|b| b.is_ascii_hexdigit()),
        None => false,
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::String(s) => format!("string '{s}'"),
        Value::Number(n) => format!("number {n}"),
        other => value_kind(other).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn check(kind: ScalarKind, value: Value) -> bool {
        let registry = TypeRegistry::new();
        let handler = ScalarType::new("t", kind);
        handler
            .validate(&registry, &TypeDescriptor::Name("t".into()), &value)
            .is_ok()
    }

    #[test]
    fn test_integer_ranges() {
        assert!(check(ScalarKind::Int, json!(42)));
        assert!(!check(ScalarKind::Int, json!(4_000_000_000i64)));
        assert!(!check(ScalarKind::Int, json!(1.5)));
        assert!(check(ScalarKind::TinyInt, json!(-128)));
        assert!(!check(ScalarKind::TinyInt, json!(200)));
        assert!(check(ScalarKind::BigInt, json!(4_000_000_000i64)));
        assert!(check(ScalarKind::VarInt, json!("-123456789012345678901234567890")));
        assert!(!check(ScalarKind::VarInt, json!("12a")));
    }

    #[test]
    fn test_string_like() {
        assert!(check(ScalarKind::Text, json!("héllo")));
        assert!(!check(ScalarKind::Ascii, json!("héllo")));
        assert!(!check(ScalarKind::Text, json!(1)));
        assert!(check(ScalarKind::Inet, json!("10.0.0.1")));
        assert!(check(ScalarKind::Inet, json!("::1")));
        assert!(!check(ScalarKind::Inet, json!("10.0.0")));
        assert!(check(ScalarKind::Blob, json!("0xCAFE")));
        assert!(!check(ScalarKind::Blob, json!("0xCAF")));
    }

    #[test]
    fn test_uuids() {
        assert!(check(ScalarKind::Uuid, json!("123e4567-e89b-42d3-a456-426614174000")));
        assert!(!check(ScalarKind::Uuid, json!("not-a-uuid")));
        assert!(check(ScalarKind::TimeUuid, json!("c232ab00-9414-11ec-b3c8-9f6bdeced846")));
        assert!(!check(ScalarKind::TimeUuid, json!("123e4567-e89b-42d3-a456-426614174000")));
    }

    #[test]
    fn test_dates_and_times() {
        assert!(check(ScalarKind::Date, json!("2026-02-13")));
        assert!(!check(ScalarKind::Date, json!("2026-13-01")));
        assert!(check(ScalarKind::Time, json!("08:30:00.250")));
        assert!(check(ScalarKind::Timestamp, json!("2026-02-13T10:00:00Z")));
        assert!(check(ScalarKind::Timestamp, json!(1_770_976_800_000i64)));
        assert!(!check(ScalarKind::Timestamp, json!("yesterday")));
    }

    #[test]
    fn test_timestamp_to_cql_millis() {
        let registry = TypeRegistry::new();
        let handler = ScalarType::new("timestamp", ScalarKind::Timestamp);
        let d = TypeDescriptor::Name("timestamp".into());
        assert_eq!(
            handler.to_cql(&registry, &d, &json!("1970-01-01T00:00:01Z")),
            json!(1000)
        );
        assert_eq!(handler.to_cql(&registry, &d, &json!(5)), json!(5));
    }

    #[test]
    fn test_error_message_names_type() {
        let registry = TypeRegistry::new();
        let handler = ScalarType::new("int", ScalarKind::Int);
        let err = handler
            .validate(&registry, &TypeDescriptor::Name("int".into()), &json!("ten"))
            .unwrap_err();
        assert_eq!(err, "expected int, got string 'ten'");
    }

    #[test]
    fn test_only_counter_is_counter() {
        assert!(ScalarType::new("counter", ScalarKind::Counter).is_counter());
        assert!(!ScalarType::new("bigint", ScalarKind::BigInt).is_counter());
    }
}
