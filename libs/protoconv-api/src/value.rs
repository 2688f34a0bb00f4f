use std::fmt;
use std::sync::Arc;

use crate::message::{MessageHandle, MessageRef, MessageType};

/// Numeric value of an enum constant.
pub type EnumNumber = i32;

/// Abstract protocol value, as consumed by the wire layer.
///
/// Exactly one kind-tagged payload. Messages are handles into the
/// reflection system, never raw native storage.
#[derive(Debug, Clone, PartialEq)]
pub enum ProtoValue {
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Uint32(u32),
    Uint64(u64),
    Float32(f32),
    Float64(f64),
    String(String),
    /// `None` is the absent form; `Some(vec![])` is present-but-empty.
    Bytes(Option<Vec<u8>>),
    Enum(EnumNumber),
    Message(MessageHandle),
}

/// Tag of a [`ProtoValue`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueTag {
    Bool,
    Int32,
    Int64,
    Uint32,
    Uint64,
    Float32,
    Float64,
    String,
    Bytes,
    Enum,
    Message,
}

impl fmt::Display for ValueTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueTag::Bool => "bool",
            ValueTag::Int32 => "int32",
            ValueTag::Int64 => "int64",
            ValueTag::Uint32 => "uint32",
            ValueTag::Uint64 => "uint64",
            ValueTag::Float32 => "float32",
            ValueTag::Float64 => "float64",
            ValueTag::String => "string",
            ValueTag::Bytes => "bytes",
            ValueTag::Enum => "enum",
            ValueTag::Message => "message",
        };
        f.write_str(name)
    }
}

impl ProtoValue {
    pub fn tag(&self) -> ValueTag {
        match self {
            ProtoValue::Bool(_) => ValueTag::Bool,
            ProtoValue::Int32(_) => ValueTag::Int32,
            ProtoValue::Int64(_) => ValueTag::Int64,
            ProtoValue::Uint32(_) => ValueTag::Uint32,
            ProtoValue::Uint64(_) => ValueTag::Uint64,
            ProtoValue::Float32(_) => ValueTag::Float32,
            ProtoValue::Float64(_) => ValueTag::Float64,
            ProtoValue::String(_) => ValueTag::String,
            ProtoValue::Bytes(_) => ValueTag::Bytes,
            ProtoValue::Enum(_) => ValueTag::Enum,
            ProtoValue::Message(_) => ValueTag::Message,
        }
    }

    pub fn as_message(&self) -> Option<&MessageHandle> {
        match self {
            ProtoValue::Message(m) => Some(m),
            _ => None,
        }
    }

    /// Byte view of a `Bytes` value. Absent bytes read as empty.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            ProtoValue::Bytes(b) => Some(b.as_deref().unwrap_or_default()),
            _ => None,
        }
    }
}

// ════════════════════════════════════════════════════════════════
//  Native types
// ════════════════════════════════════════════════════════════════

/// Underlying shape of a native type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NativeRepr {
    Bool,
    Int32,
    Int64,
    Uint32,
    Uint64,
    Float32,
    Float64,
    String,
    /// `Option<Vec<u8>>`; `None` is the nil slice.
    ByteSlice,
    /// Reference to a message struct; may be nil.
    Pointer(MessageType),
    /// Message struct held by value.
    Struct(MessageType),
    /// Declared shape of a repeated field. Interpreted by collection converters only.
    List(Box<NativeType>),
    /// Declared shape of a map field. Interpreted by collection converters only.
    Map(Box<NativeType>, Box<NativeType>),
}

/// Declared type of one native struct field.
///
/// Equality is exact: a named type never equals its underlying representation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NativeType {
    name: Option<Arc<str>>,
    repr: NativeRepr,
}

impl NativeType {
    pub const fn of(repr: NativeRepr) -> Self {
        Self { name: None, repr }
    }

    pub const fn bool() -> Self {
        Self::of(NativeRepr::Bool)
    }

    pub const fn int32() -> Self {
        Self::of(NativeRepr::Int32)
    }

    pub const fn int64() -> Self {
        Self::of(NativeRepr::Int64)
    }

    pub const fn uint32() -> Self {
        Self::of(NativeRepr::Uint32)
    }

    pub const fn uint64() -> Self {
        Self::of(NativeRepr::Uint64)
    }

    pub const fn float32() -> Self {
        Self::of(NativeRepr::Float32)
    }

    pub const fn float64() -> Self {
        Self::of(NativeRepr::Float64)
    }

    pub const fn string() -> Self {
        Self::of(NativeRepr::String)
    }

    pub const fn byte_slice() -> Self {
        Self::of(NativeRepr::ByteSlice)
    }

    pub fn pointer_to(message: MessageType) -> Self {
        Self::of(NativeRepr::Pointer(message))
    }

    pub fn struct_of(message: MessageType) -> Self {
        Self::of(NativeRepr::Struct(message))
    }

    pub fn list_of(elem: NativeType) -> Self {
        Self::of(NativeRepr::List(Box::new(elem)))
    }

    pub fn map_of(key: NativeType, value: NativeType) -> Self {
        Self::of(NativeRepr::Map(Box::new(key), Box::new(value)))
    }

    /// Same representation under a new name (`enum Color: i32` style).
    pub fn named(self, name: impl Into<Arc<str>>) -> Self {
        Self { name: Some(name.into()), repr: self.repr }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn repr(&self) -> &NativeRepr {
        &self.repr
    }

    /// Zero value of this type: `false`, `0`, `""`, nil slice, nil pointer,
    /// zero struct, empty collection.
    pub fn zero(&self) -> NativeValue {
        let data = match &self.repr {
            NativeRepr::Bool => NativeData::Bool(false),
            NativeRepr::Int32 => NativeData::Int32(0),
            NativeRepr::Int64 => NativeData::Int64(0),
            NativeRepr::Uint32 => NativeData::Uint32(0),
            NativeRepr::Uint64 => NativeData::Uint64(0),
            NativeRepr::Float32 => NativeData::Float32(0.0),
            NativeRepr::Float64 => NativeData::Float64(0.0),
            NativeRepr::String => NativeData::String(String::new()),
            NativeRepr::ByteSlice => NativeData::Bytes(None),
            NativeRepr::Pointer(_) => NativeData::Pointer(None),
            NativeRepr::Struct(_) => NativeData::Struct(StructSlot::Zero),
            NativeRepr::List(_) => NativeData::List(Vec::new()),
            NativeRepr::Map(_, _) => NativeData::Map(Vec::new()),
        };
        NativeValue { ty: self.clone(), data }
    }

    /// Whether `data` has the shape this type describes.
    pub fn accepts(&self, data: &NativeData) -> bool {
        match (&self.repr, data) {
            (NativeRepr::Bool, NativeData::Bool(_))
            | (NativeRepr::Int32, NativeData::Int32(_))
            | (NativeRepr::Int64, NativeData::Int64(_))
            | (NativeRepr::Uint32, NativeData::Uint32(_))
            | (NativeRepr::Uint64, NativeData::Uint64(_))
            | (NativeRepr::Float32, NativeData::Float32(_))
            | (NativeRepr::Float64, NativeData::Float64(_))
            | (NativeRepr::String, NativeData::String(_))
            | (NativeRepr::ByteSlice, NativeData::Bytes(_)) => true,
            (NativeRepr::Pointer(ty), NativeData::Pointer(ptr)) => {
                ptr.as_ref().is_none_or(|r| r.is_instance_of(ty))
            }
            (NativeRepr::Struct(ty), NativeData::Struct(slot)) => match slot {
                StructSlot::Place(r) => r.is_instance_of(ty),
                StructSlot::Zero => true,
            },
            (NativeRepr::List(elem), NativeData::List(items)) => {
                items.iter().all(|item| elem.accepts(item))
            }
            (NativeRepr::Map(k, v), NativeData::Map(entries)) => entries
                .iter()
                .all(|(key, value)| k.accepts(key) && v.accepts(value)),
            _ => false,
        }
    }
}

impl fmt::Display for NativeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.name {
            return f.write_str(name);
        }
        match &self.repr {
            NativeRepr::Bool => f.write_str("bool"),
            NativeRepr::Int32 => f.write_str("i32"),
            NativeRepr::Int64 => f.write_str("i64"),
            NativeRepr::Uint32 => f.write_str("u32"),
            NativeRepr::Uint64 => f.write_str("u64"),
            NativeRepr::Float32 => f.write_str("f32"),
            NativeRepr::Float64 => f.write_str("f64"),
            NativeRepr::String => f.write_str("String"),
            NativeRepr::ByteSlice => f.write_str("Vec<u8>"),
            NativeRepr::Pointer(m) => write!(f, "*{}", m.name()),
            NativeRepr::Struct(m) => f.write_str(m.name()),
            NativeRepr::List(elem) => write!(f, "Vec<{elem}>"),
            NativeRepr::Map(k, v) => write!(f, "Map<{k}, {v}>"),
        }
    }
}

// ════════════════════════════════════════════════════════════════
//  Native values
// ════════════════════════════════════════════════════════════════

/// Storage of a by-value message struct.
#[derive(Debug, Clone, PartialEq)]
pub enum StructSlot {
    /// Addressable storage; taking its address aliases it.
    Place(MessageRef),
    /// The type's zero value. Not addressable.
    Zero,
}

/// Payload of a [`NativeValue`].
#[derive(Debug, Clone, PartialEq)]
pub enum NativeData {
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Uint32(u32),
    Uint64(u64),
    Float32(f32),
    Float64(f64),
    String(String),
    Bytes(Option<Vec<u8>>),
    Pointer(Option<MessageRef>),
    Struct(StructSlot),
    List(Vec<NativeData>),
    Map(Vec<(NativeData, NativeData)>),
}

/// Host value with its runtime type tag.
///
/// The payload always has the shape the type describes.
#[derive(Debug, Clone, PartialEq)]
pub struct NativeValue {
    ty: NativeType,
    data: NativeData,
}

impl NativeValue {
    /// Returns `None` when `data` does not fit `ty`.
    pub fn new(ty: NativeType, data: NativeData) -> Option<Self> {
        ty.accepts(&data).then_some(Self { ty, data })
    }

    pub fn bool(v: bool) -> Self {
        Self { ty: NativeType::bool(), data: NativeData::Bool(v) }
    }

    pub fn int32(v: i32) -> Self {
        Self { ty: NativeType::int32(), data: NativeData::Int32(v) }
    }

    pub fn int64(v: i64) -> Self {
        Self { ty: NativeType::int64(), data: NativeData::Int64(v) }
    }

    pub fn uint32(v: u32) -> Self {
        Self { ty: NativeType::uint32(), data: NativeData::Uint32(v) }
    }

    pub fn uint64(v: u64) -> Self {
        Self { ty: NativeType::uint64(), data: NativeData::Uint64(v) }
    }

    pub fn float32(v: f32) -> Self {
        Self { ty: NativeType::float32(), data: NativeData::Float32(v) }
    }

    pub fn float64(v: f64) -> Self {
        Self { ty: NativeType::float64(), data: NativeData::Float64(v) }
    }

    pub fn string(v: impl Into<String>) -> Self {
        Self { ty: NativeType::string(), data: NativeData::String(v.into()) }
    }

    /// Present byte slice (possibly empty).
    pub fn bytes(v: impl Into<Vec<u8>>) -> Self {
        Self { ty: NativeType::byte_slice(), data: NativeData::Bytes(Some(v.into())) }
    }

    pub fn nil_bytes() -> Self {
        Self { ty: NativeType::byte_slice(), data: NativeData::Bytes(None) }
    }

    pub fn pointer(message: &MessageType, target: Option<MessageRef>) -> Self {
        Self {
            ty: NativeType::pointer_to(message.clone()),
            data: NativeData::Pointer(target),
        }
    }

    pub fn ty(&self) -> &NativeType {
        &self.ty
    }

    pub fn data(&self) -> &NativeData {
        &self.data
    }

    pub fn into_parts(self) -> (NativeType, NativeData) {
        (self.ty, self.data)
    }

    /// Reinterpret the payload under another type with the same
    /// representation (`i32` → `Color`).
    pub fn retype(self, ty: NativeType) -> Option<Self> {
        Self::new(ty, self.data)
    }
}
