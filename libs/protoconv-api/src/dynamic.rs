//! Bridge to `prost-reflect`: its field descriptors serve as
//! [`FieldDescriptor`]s, and scalar values cross over in both directions.

use prost::bytes::Bytes;
use prost_reflect::{ReflectMessage as _, Value};

use crate::error::SchemaError;
use crate::schema::{Cardinality, FieldDescriptor, Kind};
use crate::value::{EnumNumber, ProtoValue};

impl FieldDescriptor for prost_reflect::FieldDescriptor {
    fn full_name(&self) -> &str {
        prost_reflect::FieldDescriptor::full_name(self)
    }

    fn kind(&self) -> Kind {
        use prost_reflect::Kind as Pb;
        match prost_reflect::FieldDescriptor::kind(self) {
            Pb::Double => Kind::Double,
            Pb::Float => Kind::Float,
            Pb::Int32 => Kind::Int32,
            Pb::Int64 => Kind::Int64,
            Pb::Uint32 => Kind::Uint32,
            Pb::Uint64 => Kind::Uint64,
            Pb::Sint32 => Kind::Sint32,
            Pb::Sint64 => Kind::Sint64,
            Pb::Fixed32 => Kind::Fixed32,
            Pb::Fixed64 => Kind::Fixed64,
            Pb::Sfixed32 => Kind::Sfixed32,
            Pb::Sfixed64 => Kind::Sfixed64,
            Pb::Bool => Kind::Bool,
            Pb::String => Kind::String,
            Pb::Bytes => Kind::Bytes,
            Pb::Message(_) if self.is_group() => Kind::Group,
            Pb::Message(_) => Kind::Message,
            Pb::Enum(_) => Kind::Enum,
        }
    }

    fn cardinality(&self) -> Cardinality {
        match prost_reflect::FieldDescriptor::cardinality(self) {
            prost_reflect::Cardinality::Optional => Cardinality::Optional,
            prost_reflect::Cardinality::Required => Cardinality::Required,
            prost_reflect::Cardinality::Repeated => Cardinality::Repeated,
        }
    }

    fn is_list(&self) -> bool {
        prost_reflect::FieldDescriptor::is_list(self)
    }

    fn is_map(&self) -> bool {
        prost_reflect::FieldDescriptor::is_map(self)
    }

    fn declared_default(&self) -> Option<ProtoValue> {
        if prost_reflect::FieldDescriptor::is_list(self)
            || prost_reflect::FieldDescriptor::is_map(self)
        {
            return None;
        }
        // Messages have no scalar default.
        ProtoValue::try_from(&Value::default_value_for_field(self)).ok()
    }

    fn first_enum_number(&self) -> Option<EnumNumber> {
        prost_reflect::FieldDescriptor::kind(self)
            .as_enum()
            .map(|e| e.default_value().number())
    }
}

impl TryFrom<&Value> for ProtoValue {
    type Error = SchemaError;

    fn try_from(value: &Value) -> Result<Self, SchemaError> {
        let converted = match value {
            Value::Bool(v) => ProtoValue::Bool(*v),
            Value::I32(v) => ProtoValue::Int32(*v),
            Value::I64(v) => ProtoValue::Int64(*v),
            Value::U32(v) => ProtoValue::Uint32(*v),
            Value::U64(v) => ProtoValue::Uint64(*v),
            Value::F32(v) => ProtoValue::Float32(*v),
            Value::F64(v) => ProtoValue::Float64(*v),
            Value::String(s) => ProtoValue::String(s.clone()),
            // Empty collapses to absent.
            Value::Bytes(b) => ProtoValue::Bytes((!b.is_empty()).then(|| b.to_vec())),
            Value::EnumNumber(n) => ProtoValue::Enum(*n),
            Value::Message(m) => {
                return Err(SchemaError::format(format!(
                    "dynamic message {} has no native handle",
                    m.descriptor().full_name()
                )));
            }
            other => {
                return Err(SchemaError::format(format!(
                    "collection value has no singular form: {other:?}"
                )));
            }
        };
        Ok(converted)
    }
}

impl TryFrom<ProtoValue> for Value {
    type Error = SchemaError;

    fn try_from(value: ProtoValue) -> Result<Self, SchemaError> {
        let converted = match value {
            ProtoValue::Bool(v) => Value::Bool(v),
            ProtoValue::Int32(v) => Value::I32(v),
            ProtoValue::Int64(v) => Value::I64(v),
            ProtoValue::Uint32(v) => Value::U32(v),
            ProtoValue::Uint64(v) => Value::U64(v),
            ProtoValue::Float32(v) => Value::F32(v),
            ProtoValue::Float64(v) => Value::F64(v),
            ProtoValue::String(s) => Value::String(s),
            ProtoValue::Bytes(b) => Value::Bytes(Bytes::from(b.unwrap_or_default())),
            ProtoValue::Enum(n) => Value::EnumNumber(n),
            ProtoValue::Message(m) => {
                return Err(SchemaError::format(format!(
                    "message {} cannot become a dynamic value",
                    m.full_name()
                )));
            }
        };
        Ok(converted)
    }
}
