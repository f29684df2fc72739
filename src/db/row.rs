//! Row decoding into [`Record`]s.
//!
//! Decoding is two-phase: `categorize_type` classifies the column's declared
//! type, then a backend-specific decoder extracts the value. Values that no
//! decoder accepts come out as `null`.

use crate::models::Record;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde_json::Value as JsonValue;
use sqlx::error::BoxDynError;
use sqlx::mysql::{MySqlRow, MySqlTypeInfo, MySqlValueRef};
use sqlx::postgres::{PgRow, PgTypeInfo, PgValueFormat, PgValueRef};
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, ColumnIndex, Decode, Row, Type, TypeInfo};
use tracing::debug;

// =============================================================================
// Type Classification
// =============================================================================

/// Logical category for database column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Integer,
    Float,
    Boolean,
    Text,
    Binary,
    Json,
    /// Exact numerics (DECIMAL / NUMERIC), kept as strings
    Decimal,
    Uuid,
    Unknown,
}

/// Classify a database type name into a logical category.
pub fn categorize_type(type_name: &str) -> TypeCategory {
    let lower = type_name.to_lowercase();

    if lower.contains("decimal") || lower.contains("numeric") {
        return TypeCategory::Decimal;
    }

    if lower == "uuid" {
        return TypeCategory::Uuid;
    }

    if lower == "bool" || lower == "boolean" {
        return TypeCategory::Boolean;
    }

    if lower.contains("int") || lower.contains("serial") {
        return TypeCategory::Integer;
    }

    if lower.contains("float") || lower.contains("double") || lower == "real" {
        return TypeCategory::Float;
    }

    if lower == "json" || lower == "jsonb" {
        return TypeCategory::Json;
    }

    if lower.contains("blob") || lower.contains("binary") || lower == "bytea" {
        return TypeCategory::Binary;
    }

    if lower.contains("char") || lower.contains("text") || lower == "name" {
        return TypeCategory::Text;
    }

    // NULL (SQLite expressions), dates, ...
    TypeCategory::Unknown
}

// =============================================================================
// Decimal Type Support
// =============================================================================

/// DECIMAL/NUMERIC value in its exact decimal text form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDecimal(pub String);

impl Type<sqlx::MySql> for RawDecimal {
    fn type_info() -> MySqlTypeInfo {
        <String as Type<sqlx::MySql>>::type_info()
    }

    fn compatible(ty: &MySqlTypeInfo) -> bool {
        let name = ty.name().to_lowercase();
        name.contains("decimal") || name.contains("numeric")
    }
}

impl<'r> Decode<'r, sqlx::MySql> for RawDecimal {
    fn decode(value: MySqlValueRef<'r>) -> Result<Self, BoxDynError> {
        // MySQL sends DECIMAL as text in both protocols
        let s = <&str as Decode<sqlx::MySql>>::decode(value)?;
        Ok(RawDecimal(s.to_string()))
    }
}

impl Type<sqlx::Postgres> for RawDecimal {
    fn type_info() -> PgTypeInfo {
        PgTypeInfo::with_name("numeric")
    }

    fn compatible(ty: &PgTypeInfo) -> bool {
        let name = ty.name().to_lowercase();
        name.contains("numeric") || name.contains("decimal")
    }
}

impl<'r> Decode<'r, sqlx::Postgres> for RawDecimal {
    fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
        match value.format() {
            PgValueFormat::Text => Ok(RawDecimal(value.as_str()?.to_string())),
            PgValueFormat::Binary => numeric_to_string(value.as_bytes()?).map(RawDecimal),
        }
    }
}

const NUMERIC_NEG: u16 = 0x4000;
const NUMERIC_NAN: u16 = 0xC000;
const NUMERIC_PINF: u16 = 0xD000;
const NUMERIC_NINF: u16 = 0xF000;

/// Render Postgres' binary NUMERIC (base-10000 digit groups) as decimal text.
fn numeric_to_string(buf: &[u8]) -> Result<String, BoxDynError> {
    let header = |i: usize| u16::from_be_bytes([buf[i], buf[i + 1]]);
    if buf.len() < 8 {
        return Err("NUMERIC value shorter than its header".into());
    }

    let ndigits = header(0) as i16;
    let weight = header(2) as i16 as isize;
    let sign = header(4);
    let dscale = usize::from(header(6));

    match sign {
        NUMERIC_NAN => return Ok("NaN".to_string()),
        NUMERIC_PINF => return Ok("Infinity".to_string()),
        NUMERIC_NINF => return Ok("-Infinity".to_string()),
        _ => {}
    }

    let ndigits = usize::try_from(ndigits).map_err(|_| "negative NUMERIC digit count")?;
    if buf.len() != 8 + ndigits * 2 {
        return Err("NUMERIC digit count does not match value length".into());
    }
    let digits: Vec<u16> = buf[8..]
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect();
    let digit_at = |idx: isize| -> u16 {
        usize::try_from(idx)
            .ok()
            .and_then(|i| digits.get(i).copied())
            .unwrap_or(0)
    };

    let mut out = String::new();
    if sign == NUMERIC_NEG {
        out.push('-');
    }

    if weight < 0 {
        out.push('0');
    } else {
        out.push_str(&digit_at(0).to_string());
        for idx in 1..=weight {
            out.push_str(&format!("{:04}", digit_at(idx)));
        }
    }

    if dscale > 0 {
        let mut frac = String::with_capacity(dscale + 4);
        let mut idx = weight + 1;
        while frac.len() < dscale {
            frac.push_str(&format!("{:04}", digit_at(idx)));
            idx += 1;
        }
        frac.truncate(dscale);
        out.push('.');
        out.push_str(&frac);
    }

    Ok(out)
}

fn decimal_value(v: Option<RawDecimal>) -> JsonValue {
    v.map(|d| JsonValue::String(d.0)).unwrap_or(JsonValue::Null)
}

// =============================================================================
// Row to Record Trait
// =============================================================================

/// Trait for converting database rows to records.
pub trait RowToRecord {
    fn to_record(&self) -> Record;
}

macro_rules! impl_row_to_record {
    ($row:ty, $decoder:path) => {
        impl RowToRecord for $row {
            fn to_record(&self) -> Record {
                self.columns()
                    .iter()
                    .map(|col| {
                        let type_name = col.type_info().name();
                        let category = categorize_type(type_name);
                        let value = $decoder(self, col.ordinal(), category);
                        if value.is_null() {
                            debug!(column = %col.name(), type_name = %type_name, "Column decoded as null");
                        }
                        (col.name().to_string(), value)
                    })
                    .collect()
            }
        }
    };
}

impl_row_to_record!(MySqlRow, mysql::decode_column);
impl_row_to_record!(PgRow, postgres::decode_column);
impl_row_to_record!(SqliteRow, sqlite::decode_column);

// =============================================================================
// Common Helpers
// =============================================================================

/// Decode a nullable column as `T`. `Err` means the type did not match.
fn get<'r, R, T>(row: &'r R, idx: usize) -> Result<Option<T>, sqlx::Error>
where
    R: Row,
    usize: ColumnIndex<R>,
    T: Decode<'r, R::Database> + Type<R::Database>,
{
    row.try_get::<Option<T>, usize>(idx)
}

fn int_value(v: Option<i64>) -> JsonValue {
    v.map(|n| JsonValue::Number(n.into()))
        .unwrap_or(JsonValue::Null)
}

fn float_value(v: Option<f64>) -> JsonValue {
    match v {
        Some(f) => serde_json::Number::from_f64(f)
            .map(JsonValue::Number)
            .unwrap_or_else(|| JsonValue::String(f.to_string())),
        None => JsonValue::Null,
    }
}

fn binary_value(v: Option<Vec<u8>>) -> JsonValue {
    v.map(|bytes| JsonValue::String(STANDARD.encode(bytes)))
        .unwrap_or(JsonValue::Null)
}

fn text_value(v: Option<String>) -> JsonValue {
    v.map(JsonValue::String).unwrap_or(JsonValue::Null)
}

// =============================================================================
// Database-Specific Decoders
// =============================================================================

mod mysql {
    use super::*;

    pub fn decode_column(row: &MySqlRow, idx: usize, category: TypeCategory) -> JsonValue {
        match category {
            TypeCategory::Integer => decode_integer(row, idx),
            TypeCategory::Float => decode_float(row, idx),
            TypeCategory::Boolean => get::<_, bool>(row, idx)
                .ok()
                .flatten()
                .map(JsonValue::Bool)
                .unwrap_or(JsonValue::Null),
            TypeCategory::Binary => get::<_, Vec<u8>>(row, idx)
                .map(binary_value)
                .unwrap_or(JsonValue::Null),
            TypeCategory::Json => get::<_, JsonValue>(row, idx)
                .ok()
                .flatten()
                .unwrap_or(JsonValue::Null),
            TypeCategory::Decimal => get::<_, RawDecimal>(row, idx)
                .map(decimal_value)
                .unwrap_or(JsonValue::Null),
            TypeCategory::Text | TypeCategory::Uuid | TypeCategory::Unknown => {
                get::<_, String>(row, idx)
                    .map(text_value)
                    .unwrap_or(JsonValue::Null)
            }
        }
    }

    fn decode_integer(row: &MySqlRow, idx: usize) -> JsonValue {
        if let Ok(v) = get::<_, i8>(row, idx) {
            return int_value(v.map(i64::from));
        }
        if let Ok(v) = get::<_, i16>(row, idx) {
            return int_value(v.map(i64::from));
        }
        if let Ok(v) = get::<_, i32>(row, idx) {
            return int_value(v.map(i64::from));
        }
        if let Ok(v) = get::<_, i64>(row, idx) {
            return int_value(v);
        }
        if let Ok(v) = get::<_, u8>(row, idx) {
            return int_value(v.map(i64::from));
        }
        if let Ok(v) = get::<_, u16>(row, idx) {
            return int_value(v.map(i64::from));
        }
        if let Ok(v) = get::<_, u32>(row, idx) {
            return int_value(v.map(i64::from));
        }
        if let Ok(v) = get::<_, u64>(row, idx) {
            return v
                .map(|n| JsonValue::Number(n.into()))
                .unwrap_or(JsonValue::Null);
        }
        JsonValue::Null
    }

    fn decode_float(row: &MySqlRow, idx: usize) -> JsonValue {
        if let Ok(v) = get::<_, f64>(row, idx) {
            return float_value(v);
        }
        if let Ok(v) = get::<_, f32>(row, idx) {
            return float_value(v.map(f64::from));
        }
        JsonValue::Null
    }
}

mod postgres {
    use super::*;

    pub fn decode_column(row: &PgRow, idx: usize, category: TypeCategory) -> JsonValue {
        match category {
            TypeCategory::Integer => decode_integer(row, idx),
            TypeCategory::Float => decode_float(row, idx),
            TypeCategory::Boolean => get::<_, bool>(row, idx)
                .ok()
                .flatten()
                .map(JsonValue::Bool)
                .unwrap_or(JsonValue::Null),
            TypeCategory::Binary => get::<_, Vec<u8>>(row, idx)
                .map(binary_value)
                .unwrap_or(JsonValue::Null),
            TypeCategory::Json => get::<_, JsonValue>(row, idx)
                .ok()
                .flatten()
                .unwrap_or(JsonValue::Null),
            TypeCategory::Decimal => get::<_, RawDecimal>(row, idx)
                .map(decimal_value)
                .unwrap_or(JsonValue::Null),
            TypeCategory::Uuid => get::<_, uuid::Uuid>(row, idx)
                .map(|v| text_value(v.map(|u| u.to_string())))
                .unwrap_or(JsonValue::Null),
            TypeCategory::Text | TypeCategory::Unknown => get::<_, String>(row, idx)
                .map(text_value)
                .unwrap_or(JsonValue::Null),
        }
    }

    fn decode_integer(row: &PgRow, idx: usize) -> JsonValue {
        if let Ok(v) = get::<_, i16>(row, idx) {
            return int_value(v.map(i64::from));
        }
        if let Ok(v) = get::<_, i32>(row, idx) {
            return int_value(v.map(i64::from));
        }
        if let Ok(v) = get::<_, i64>(row, idx) {
            return int_value(v);
        }
        JsonValue::Null
    }

    fn decode_float(row: &PgRow, idx: usize) -> JsonValue {
        if let Ok(v) = get::<_, f32>(row, idx) {
            return float_value(v.map(f64::from));
        }
        if let Ok(v) = get::<_, f64>(row, idx) {
            return float_value(v);
        }
        JsonValue::Null
    }
}

mod sqlite {
    use super::*;

    /// SQLite is dynamically typed: the declared type is only a hint, so
    /// every category falls back to trying the storage classes in turn.
    pub fn decode_column(row: &SqliteRow, idx: usize, category: TypeCategory) -> JsonValue {
        let preferred = match category {
            TypeCategory::Integer => get::<_, i64>(row, idx).ok().map(int_value),
            TypeCategory::Float => get::<_, f64>(row, idx).ok().map(float_value),
            TypeCategory::Boolean => get::<_, bool>(row, idx)
                .ok()
                .map(|v| v.map(JsonValue::Bool).unwrap_or(JsonValue::Null)),
            TypeCategory::Binary => get::<_, Vec<u8>>(row, idx).ok().map(binary_value),
            TypeCategory::Json => get::<_, String>(row, idx).ok().map(|v| match v {
                Some(text) => serde_json::from_str(&text).unwrap_or(JsonValue::String(text)),
                None => JsonValue::Null,
            }),
            // NUMERIC affinity stores integers or reals; UUIDs are plain text
            TypeCategory::Decimal
            | TypeCategory::Uuid
            | TypeCategory::Text
            | TypeCategory::Unknown => None,
        };

        preferred.unwrap_or_else(|| decode_dynamic(row, idx))
    }

    fn decode_dynamic(row: &SqliteRow, idx: usize) -> JsonValue {
        if let Ok(v) = get::<_, i64>(row, idx) {
            return int_value(v);
        }
        if let Ok(v) = get::<_, f64>(row, idx) {
            return float_value(v);
        }
        if let Ok(v) = get::<_, String>(row, idx) {
            return text_value(v);
        }
        if let Ok(v) = get::<_, Vec<u8>>(row, idx) {
            return binary_value(v);
        }
        JsonValue::Null
    }
}
