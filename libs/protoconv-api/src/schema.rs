use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use crate::error::SchemaError;
use crate::value::{EnumNumber, ProtoValue};

/// Primitive schema kind of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    Bool,
    Int32,
    Sint32,
    Sfixed32,
    Int64,
    Sint64,
    Sfixed64,
    Uint32,
    Fixed32,
    Uint64,
    Fixed64,
    Float,
    Double,
    String,
    Bytes,
    Enum,
    Message,
    Group,
}

impl Kind {
    pub fn is_message(self) -> bool {
        matches!(self, Kind::Message | Kind::Group)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Kind::Bool => "bool",
            Kind::Int32 => "int32",
            Kind::Sint32 => "sint32",
            Kind::Sfixed32 => "sfixed32",
            Kind::Int64 => "int64",
            Kind::Sint64 => "sint64",
            Kind::Sfixed64 => "sfixed64",
            Kind::Uint32 => "uint32",
            Kind::Fixed32 => "fixed32",
            Kind::Uint64 => "uint64",
            Kind::Fixed64 => "fixed64",
            Kind::Float => "float",
            Kind::Double => "double",
            Kind::String => "string",
            Kind::Bytes => "bytes",
            Kind::Enum => "enum",
            Kind::Message => "message",
            Kind::Group => "group",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    #[default]
    Optional,
    Required,
    Repeated,
}

/// Schema-side description of one field. Owned by the schema system;
/// converters only read it.
pub trait FieldDescriptor {
    /// Fully-qualified name (`"market.Quote.bid"`).
    fn full_name(&self) -> &str;

    fn kind(&self) -> Kind;

    fn cardinality(&self) -> Cardinality;

    fn is_list(&self) -> bool;

    fn is_map(&self) -> bool;

    /// Declared default of a singular field. `None` means the kind's zero.
    fn declared_default(&self) -> Option<ProtoValue>;

    /// Number of the first declared value of an enum field.
    fn first_enum_number(&self) -> Option<EnumNumber>;
}

// ════════════════════════════════════════════════════════════════
//  Schema documents
// ════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EnumValue {
    pub name: String,
    pub number: EnumNumber,
}

/// A single field of a schema document.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Field {
    pub name: String,
    pub kind: Kind,
    #[serde(default)]
    pub cardinality: Cardinality,
    /// Repeated field holding key/value entries.
    #[serde(default)]
    pub map: bool,
    /// Declared default. Scalars as JSON scalars, bytes as a string,
    /// enums as a number or a value name.
    #[serde(default)]
    pub default: Option<serde_json::Value>,
    /// Declared values, in declaration order (enum fields only).
    #[serde(default)]
    pub enum_values: Vec<EnumValue>,
    #[serde(skip)]
    full_name: String,
    #[serde(skip)]
    resolved_default: Option<ProtoValue>,
}

impl Field {
    pub fn new(name: impl Into<String>, kind: Kind) -> Self {
        let name = name.into();
        Self {
            full_name: name.clone(),
            name,
            kind,
            cardinality: Cardinality::Optional,
            map: false,
            default: None,
            enum_values: Vec::new(),
            resolved_default: None,
        }
    }

    pub fn repeated(mut self) -> Self {
        self.cardinality = Cardinality::Repeated;
        self
    }

    pub fn map_entries(mut self) -> Self {
        self.cardinality = Cardinality::Repeated;
        self.map = true;
        self
    }

    pub fn with_default(mut self, default: serde_json::Value) -> Result<Self, SchemaError> {
        self.default = Some(default);
        self.resolve(None)?;
        Ok(self)
    }

    pub fn with_enum_values<I, S>(mut self, values: I) -> Result<Self, SchemaError>
    where
        I: IntoIterator<Item = (S, EnumNumber)>,
        S: Into<String>,
    {
        self.enum_values = values
            .into_iter()
            .map(|(name, number)| EnumValue { name: name.into(), number })
            .collect();
        self.resolve(None)?;
        Ok(self)
    }

    /// Fixes the full name and parses the declared default.
    fn resolve(&mut self, message: Option<&str>) -> Result<(), SchemaError> {
        if let Some(message) = message {
            self.full_name = format!("{message}.{}", self.name);
        }
        if self.map && self.cardinality != Cardinality::Repeated {
            return Err(SchemaError::schema(format!(
                "map field {} must be repeated",
                self.full_name
            )));
        }
        self.resolved_default = match &self.default {
            None => None,
            Some(_) if self.cardinality == Cardinality::Repeated => {
                return Err(SchemaError::schema(format!(
                    "repeated field {} cannot declare a default",
                    self.full_name
                )));
            }
            Some(raw) => Some(
                parse_default(self.kind, raw, &self.enum_values)
                    .map_err(|e| e.with_context(&self.full_name))?,
            ),
        };
        Ok(())
    }
}

impl FieldDescriptor for Field {
    fn full_name(&self) -> &str {
        &self.full_name
    }

    fn kind(&self) -> Kind {
        self.kind
    }

    fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    fn is_list(&self) -> bool {
        self.cardinality == Cardinality::Repeated && !self.map
    }

    fn is_map(&self) -> bool {
        self.map
    }

    fn declared_default(&self) -> Option<ProtoValue> {
        self.resolved_default.clone()
    }

    fn first_enum_number(&self) -> Option<EnumNumber> {
        self.enum_values.first().map(|v| v.number)
    }
}

fn parse_default(
    kind: Kind,
    raw: &serde_json::Value,
    enum_values: &[EnumValue],
) -> Result<ProtoValue, SchemaError> {
    let invalid = || SchemaError::schema(format!("invalid {kind} default: {raw}"));
    let value = match kind {
        Kind::Bool => ProtoValue::Bool(raw.as_bool().ok_or_else(invalid)?),
        Kind::Int32 | Kind::Sint32 | Kind::Sfixed32 => ProtoValue::Int32(
            raw.as_i64().and_then(|n| i32::try_from(n).ok()).ok_or_else(invalid)?,
        ),
        Kind::Int64 | Kind::Sint64 | Kind::Sfixed64 => {
            ProtoValue::Int64(raw.as_i64().ok_or_else(invalid)?)
        }
        Kind::Uint32 | Kind::Fixed32 => ProtoValue::Uint32(
            raw.as_u64().and_then(|n| u32::try_from(n).ok()).ok_or_else(invalid)?,
        ),
        Kind::Uint64 | Kind::Fixed64 => ProtoValue::Uint64(raw.as_u64().ok_or_else(invalid)?),
        Kind::Float => ProtoValue::Float32(raw.as_f64().ok_or_else(invalid)? as f32),
        Kind::Double => ProtoValue::Float64(raw.as_f64().ok_or_else(invalid)?),
        Kind::String => ProtoValue::String(raw.as_str().ok_or_else(invalid)?.to_string()),
        Kind::Bytes => {
            let s = raw.as_str().ok_or_else(invalid)?;
            ProtoValue::Bytes((!s.is_empty()).then(|| s.as_bytes().to_vec()))
        }
        Kind::Enum => match raw {
            serde_json::Value::String(name) => enum_values
                .iter()
                .find(|v| &v.name == name)
                .map(|v| ProtoValue::Enum(v.number))
                .ok_or_else(|| SchemaError::schema(format!("unknown enum value {name}")))?,
            _ => ProtoValue::Enum(
                raw.as_i64().and_then(|n| i32::try_from(n).ok()).ok_or_else(invalid)?,
            ),
        },
        Kind::Message | Kind::Group => {
            return Err(SchemaError::schema(format!("{kind} fields have no default")));
        }
    };
    Ok(value)
}

/// Schema document: one message and its fields.
///
/// Field order is declaration order.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Schema {
    /// Fully-qualified message name (`"market.Quote"`).
    pub message: String,
    pub fields: Vec<Field>,
}

impl Schema {
    /// Load and validate a schema from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| SchemaError::from(e).with_context(path.display()))?;
        Self::parse(&content)
    }

    /// Parse and validate a schema from a JSON string.
    pub fn parse(json: &str) -> Result<Self, SchemaError> {
        let mut schema: Schema = serde_json::from_str(json)?;
        schema.validate()?;
        Ok(schema)
    }

    fn validate(&mut self) -> Result<(), SchemaError> {
        if self.message.is_empty() {
            return Err(SchemaError::schema("message name is required"));
        }
        let mut seen = HashSet::new();
        for field in &mut self.fields {
            if !seen.insert(field.name.clone()) {
                return Err(SchemaError::schema(format!(
                    "duplicate field {} in {}",
                    field.name, self.message
                )));
            }
            field.resolve(Some(&self.message))?;
        }
        Ok(())
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}
