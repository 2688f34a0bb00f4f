use std::fmt;
use std::sync::Arc;

use protoconv_api::{FieldDescriptor, NativeType, NativeValue, ProtoValue, ValueTag};

use crate::error::{ConvertError, fatal};
use crate::message::MessageConverter;
use crate::scalar::Scalar;

/// Field-level converter between native values and protocol values.
///
/// Solves one task: move one field's value across the boundary, in either
/// direction, without coercion. Obtained once per field shape and shared.
pub trait FieldConverter: Send + Sync + fmt::Debug {
    fn try_pb_value_of(&self, value: &NativeValue) -> Result<ProtoValue, ConvertError>;

    fn try_go_value_of(&self, value: &ProtoValue) -> Result<NativeValue, ConvertError>;

    /// Whether `value` can be handed to [`go_value_of`](Self::go_value_of).
    fn is_valid_pb(&self, value: &ProtoValue) -> bool;

    /// Whether `value` can be handed to [`pb_value_of`](Self::pb_value_of).
    fn is_valid_go(&self, value: &NativeValue) -> bool;

    /// Scalars: the field default. Composites: a fresh mutable value.
    fn new_value(&self) -> ProtoValue;

    /// Scalars: the field default. Composites: an immutable empty value.
    fn zero_value(&self) -> ProtoValue;

    /// Panics on type mismatch.
    #[track_caller]
    fn pb_value_of(&self, value: &NativeValue) -> ProtoValue {
        self.try_pb_value_of(value).unwrap_or_else(|e| fatal(e))
    }

    /// Panics on type mismatch.
    #[track_caller]
    fn go_value_of(&self, value: &ProtoValue) -> NativeValue {
        self.try_go_value_of(value).unwrap_or_else(|e| fatal(e))
    }
}

/// Constructors for repeated and map fields. Implemented outside this crate.
pub trait CollectionConverters: Send + Sync {
    fn list(
        &self,
        native: &NativeType,
        field: &dyn FieldDescriptor,
    ) -> Result<Arc<dyn FieldConverter>, ConvertError>;

    fn map(
        &self,
        native: &NativeType,
        field: &dyn FieldDescriptor,
    ) -> Result<Arc<dyn FieldConverter>, ConvertError>;
}

/// Converter for one field shape.
///
/// Immutable after construction; clone freely.
#[derive(Debug, Clone)]
pub enum Converter {
    Bool(Scalar),
    Int32(Scalar),
    Int64(Scalar),
    Uint32(Scalar),
    Uint64(Scalar),
    Float32(Scalar),
    Float64(Scalar),
    String(Scalar),
    Bytes(Scalar),
    Enum(Scalar),
    Message(MessageConverter),
    List(Arc<dyn FieldConverter>),
    Map(Arc<dyn FieldConverter>),
}

/// Borrowed view of a converter, split by how its operations are carried out.
enum Parts<'a> {
    Scalar(ValueTag, &'a Scalar),
    Message(&'a MessageConverter),
    Collection(&'a Arc<dyn FieldConverter>),
}

impl Converter {
    fn parts(&self) -> Parts<'_> {
        match self {
            Converter::Bool(s) => Parts::Scalar(ValueTag::Bool, s),
            Converter::Int32(s) => Parts::Scalar(ValueTag::Int32, s),
            Converter::Int64(s) => Parts::Scalar(ValueTag::Int64, s),
            Converter::Uint32(s) => Parts::Scalar(ValueTag::Uint32, s),
            Converter::Uint64(s) => Parts::Scalar(ValueTag::Uint64, s),
            Converter::Float32(s) => Parts::Scalar(ValueTag::Float32, s),
            Converter::Float64(s) => Parts::Scalar(ValueTag::Float64, s),
            Converter::String(s) => Parts::Scalar(ValueTag::String, s),
            Converter::Bytes(s) => Parts::Scalar(ValueTag::Bytes, s),
            Converter::Enum(s) => Parts::Scalar(ValueTag::Enum, s),
            Converter::Message(c) => Parts::Message(c),
            Converter::List(c) | Converter::Map(c) => Parts::Collection(c),
        }
    }

    /// Tag of the protocol values this converter produces. `None` for
    /// collections, whose values are defined by their own converters.
    pub fn value_tag(&self) -> Option<ValueTag> {
        match self.parts() {
            Parts::Scalar(tag, _) => Some(tag),
            Parts::Message(_) => Some(ValueTag::Message),
            Parts::Collection(_) => None,
        }
    }

    /// Resolved native type. `None` for collections.
    pub fn native_type(&self) -> Option<&NativeType> {
        match self.parts() {
            Parts::Scalar(_, s) => Some(s.native_type()),
            Parts::Message(c) => Some(c.native_type()),
            Parts::Collection(_) => None,
        }
    }
}

impl FieldConverter for Converter {
    fn try_pb_value_of(&self, value: &NativeValue) -> Result<ProtoValue, ConvertError> {
        match self.parts() {
            Parts::Scalar(tag, s) => s.to_proto(tag, value),
            Parts::Message(c) => c.to_proto(value),
            Parts::Collection(c) => c.try_pb_value_of(value),
        }
    }

    fn try_go_value_of(&self, value: &ProtoValue) -> Result<NativeValue, ConvertError> {
        match self.parts() {
            Parts::Scalar(tag, s) => s.to_native(tag, value),
            Parts::Message(c) => c.to_native(value),
            Parts::Collection(c) => c.try_go_value_of(value),
        }
    }

    fn is_valid_pb(&self, value: &ProtoValue) -> bool {
        match self.parts() {
            Parts::Scalar(tag, s) => s.accepts_proto(tag, value),
            Parts::Message(c) => c.is_valid_proto(value),
            Parts::Collection(c) => c.is_valid_pb(value),
        }
    }

    fn is_valid_go(&self, value: &NativeValue) -> bool {
        match self.parts() {
            Parts::Scalar(tag, s) => s.accepts_native(tag, value),
            Parts::Message(c) => value.ty() == c.native_type(),
            Parts::Collection(c) => c.is_valid_go(value),
        }
    }

    fn new_value(&self) -> ProtoValue {
        match self.parts() {
            Parts::Scalar(_, s) => s.default_value().clone(),
            Parts::Message(c) => c.new_value(),
            Parts::Collection(c) => c.new_value(),
        }
    }

    fn zero_value(&self) -> ProtoValue {
        match self.parts() {
            Parts::Scalar(_, s) => s.default_value().clone(),
            Parts::Message(c) => c.zero_value(),
            Parts::Collection(c) => c.zero_value(),
        }
    }
}
