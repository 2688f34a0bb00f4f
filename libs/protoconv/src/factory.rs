use std::sync::Arc;

use protoconv_api::{Cardinality, FieldDescriptor, Kind, NativeRepr, NativeType, ProtoValue};

use crate::converter::{CollectionConverters, Converter};
use crate::error::{ConvertError, fatal};
use crate::message::MessageConverter;
use crate::scalar::Scalar;

/// Matches a native type with a schema field and builds the converter
/// between the two.
///
/// Enums must be backed by `i32`; messages must be a pointer to, or a
/// value of, a registered [`MessageType`](protoconv_api::MessageType).
/// Repeated and map fields go to the configured [`CollectionConverters`].
#[derive(Clone, Default)]
pub struct ConverterFactory {
    collections: Option<Arc<dyn CollectionConverters>>,
}

impl ConverterFactory {
    /// Singular fields only.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_collections(collections: Arc<dyn CollectionConverters>) -> Self {
        Self { collections: Some(collections) }
    }

    /// Panics if no converter matches. A mismatch means the native binding
    /// and the schema disagree.
    #[track_caller]
    pub fn select(&self, native: &NativeType, field: &dyn FieldDescriptor) -> Converter {
        self.try_select(native, field).unwrap_or_else(|e| fatal(e))
    }

    pub fn try_select(
        &self,
        native: &NativeType,
        field: &dyn FieldDescriptor,
    ) -> Result<Converter, ConvertError> {
        if field.is_list() {
            let collections = self.collections(field)?;
            tracing::debug!(field = %field.full_name(), %native, "delegating to list converter");
            return Ok(Converter::List(collections.list(native, field)?));
        }
        if field.is_map() {
            let collections = self.collections(field)?;
            tracing::debug!(field = %field.full_name(), %native, "delegating to map converter");
            return Ok(Converter::Map(collections.map(native, field)?));
        }
        Self::try_singular(native, field)
    }

    fn collections(
        &self,
        field: &dyn FieldDescriptor,
    ) -> Result<&Arc<dyn CollectionConverters>, ConvertError> {
        self.collections.as_ref().ok_or_else(|| ConvertError::NoCollectionConverter {
            field: field.full_name().to_string(),
        })
    }

    /// Converter for one value of `field`, ignoring list/map cardinality.
    ///
    /// Collection converters use this for their elements; a repeated field
    /// then gets the kind's zero as its default.
    pub fn try_singular(
        native: &NativeType,
        field: &dyn FieldDescriptor,
    ) -> Result<Converter, ConvertError> {
        let scalar = |zero: ProtoValue| {
            default_value(field, zero).map(|default| Scalar::new(native.clone(), default))
        };
        let repr = native.repr();
        let text = matches!(repr, NativeRepr::String | NativeRepr::ByteSlice);

        let converter = match field.kind() {
            Kind::Bool if *repr == NativeRepr::Bool => {
                Converter::Bool(scalar(ProtoValue::Bool(false))?)
            }
            Kind::Int32 | Kind::Sint32 | Kind::Sfixed32 if *repr == NativeRepr::Int32 => {
                Converter::Int32(scalar(ProtoValue::Int32(0))?)
            }
            Kind::Int64 | Kind::Sint64 | Kind::Sfixed64 if *repr == NativeRepr::Int64 => {
                Converter::Int64(scalar(ProtoValue::Int64(0))?)
            }
            Kind::Uint32 | Kind::Fixed32 if *repr == NativeRepr::Uint32 => {
                Converter::Uint32(scalar(ProtoValue::Uint32(0))?)
            }
            Kind::Uint64 | Kind::Fixed64 if *repr == NativeRepr::Uint64 => {
                Converter::Uint64(scalar(ProtoValue::Uint64(0))?)
            }
            Kind::Float if *repr == NativeRepr::Float32 => {
                Converter::Float32(scalar(ProtoValue::Float32(0.0))?)
            }
            Kind::Double if *repr == NativeRepr::Float64 => {
                Converter::Float64(scalar(ProtoValue::Float64(0.0))?)
            }
            Kind::String if text => Converter::String(scalar(ProtoValue::String(String::new()))?),
            Kind::Bytes if text => Converter::Bytes(scalar(ProtoValue::Bytes(None))?),
            Kind::Enum if *repr == NativeRepr::Int32 => {
                let first = field.first_enum_number();
                if first.is_none() && field.cardinality() == Cardinality::Repeated {
                    return Err(ConvertError::EmptyEnum { field: field.full_name().to_string() });
                }
                Converter::Enum(scalar(ProtoValue::Enum(first.unwrap_or(0)))?)
            }
            kind if kind.is_message() => match MessageConverter::new(native.clone()) {
                Some(c) => Converter::Message(c),
                None => return Err(kind_mismatch(native, field)),
            },
            _ => return Err(kind_mismatch(native, field)),
        };

        tracing::debug!(
            field = %field.full_name(),
            %native,
            kind = %field.kind(),
            "converter selected"
        );
        Ok(converter)
    }
}

fn kind_mismatch(native: &NativeType, field: &dyn FieldDescriptor) -> ConvertError {
    ConvertError::KindMismatch {
        native: native.clone(),
        field: field.full_name().to_string(),
    }
}

/// Declared default for singular fields, `zero` for repeated ones.
fn default_value(field: &dyn FieldDescriptor, zero: ProtoValue) -> Result<ProtoValue, ConvertError> {
    if field.cardinality() == Cardinality::Repeated {
        // Default isn't defined for repeated fields.
        return Ok(zero);
    }
    match field.declared_default() {
        None => Ok(zero),
        Some(value) if value.tag() == zero.tag() => Ok(value),
        Some(value) => Err(ConvertError::InvalidDefault {
            field: field.full_name().to_string(),
            kind: field.kind(),
            value,
        }),
    }
}
