//! Query parameter and row types.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A decoded result row: column name to JSON value, in column order as far as
/// `serde_json::Map` preserves it.
pub type Record = serde_json::Map<String, JsonValue>;

/// A parameter value for parameterized queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryParam {
    /// NULL value
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value (stored as i64 for maximum range)
    Int(i64),
    /// Floating point value
    Float(f64),
    /// String value
    String(String),
    /// Binary data (base64 encoded in JSON). Deserializing never produces
    /// this variant: base64 text arrives as `String` and becomes bytes
    /// through a `Lob` hint.
    #[serde(with = "base64_bytes")]
    Bytes(Vec<u8>),
}

/// Type hint for a bound parameter.
///
/// A hint only changes how a value is bound; values that cannot be converted
/// are bound unchanged and the database decides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    Null,
    Bool,
    Int,
    Str,
    /// Large object, bound as raw bytes (strings are base64-decoded when valid)
    Lob,
}

impl QueryParam {
    /// Check if this parameter is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Get the type name of this parameter for debugging.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Bytes(_) => "bytes",
        }
    }

    /// Convert this parameter according to a type hint.
    pub fn coerce(&self, hint: ParamType) -> QueryParam {
        match (hint, self) {
            (ParamType::Null, _) => QueryParam::Null,

            (ParamType::Bool, QueryParam::Int(n)) => QueryParam::Bool(*n != 0),
            (ParamType::Bool, QueryParam::String(s)) => match s.to_ascii_lowercase().as_str() {
                "true" | "1" => QueryParam::Bool(true),
                "false" | "0" => QueryParam::Bool(false),
                _ => self.clone(),
            },

            (ParamType::Int, QueryParam::Bool(b)) => QueryParam::Int(i64::from(*b)),
            (ParamType::Int, QueryParam::String(s)) => s
                .trim()
                .parse::<i64>()
                .map(QueryParam::Int)
                .unwrap_or_else(|_| self.clone()),
            // i64::MAX as f64 rounds up to 2^63, so the upper bound is exclusive
            (ParamType::Int, QueryParam::Float(f))
                if f.fract() == 0.0 && (i64::MIN as f64..i64::MAX as f64).contains(f) =>
            {
                QueryParam::Int(*f as i64)
            }

            (ParamType::Str, QueryParam::Bool(b)) => QueryParam::String(b.to_string()),
            (ParamType::Str, QueryParam::Int(n)) => QueryParam::String(n.to_string()),
            (ParamType::Str, QueryParam::Float(f)) => QueryParam::String(f.to_string()),
            (ParamType::Str, QueryParam::Bytes(bytes)) => match std::str::from_utf8(bytes) {
                Ok(s) => QueryParam::String(s.to_string()),
                Err(_) => self.clone(),
            },

            // Bytes travel as base64 text in JSON; anything else is taken verbatim
            (ParamType::Lob, QueryParam::String(s)) => QueryParam::Bytes(
                STANDARD
                    .decode(s)
                    .unwrap_or_else(|_| s.as_bytes().to_vec()),
            ),

            _ => self.clone(),
        }
    }
}

/// Apply positional type hints to a parameter list.
///
/// Parameters without a hint are passed through unchanged; surplus hints are
/// ignored.
pub fn apply_hints(params: &[QueryParam], hints: &[ParamType]) -> Vec<QueryParam> {
    params
        .iter()
        .enumerate()
        .map(|(idx, param)| match hints.get(idx) {
            Some(hint) => param.coerce(*hint),
            None => param.clone(),
        })
        .collect()
}

/// Custom serialization for binary data as base64.
mod base64_bytes {
    use base64::{Engine as _, engine::general_purpose::STANDARD};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(bytes: &Vec<u8>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        STANDARD.encode(bytes).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(&s).map_err(serde::de::Error::custom)
    }
}
