use protoconv_api::{NativeData, NativeRepr, NativeType, NativeValue, ProtoValue, ValueTag};

use crate::error::ConvertError;

/// Resolved native type plus the precomputed field default.
///
/// Shared by the bool, integer, float, string, bytes and enum converters;
/// the [`Converter`](crate::Converter) variant fixes which tag it speaks.
#[derive(Debug, Clone)]
pub struct Scalar {
    native: NativeType,
    default: ProtoValue,
}

impl Scalar {
    pub(crate) fn new(native: NativeType, default: ProtoValue) -> Self {
        Self { native, default }
    }

    pub fn native_type(&self) -> &NativeType {
        &self.native
    }

    pub fn default_value(&self) -> &ProtoValue {
        &self.default
    }

    pub(crate) fn to_proto(&self, tag: ValueTag, v: &NativeValue) -> Result<ProtoValue, ConvertError> {
        if v.ty() != &self.native {
            return Err(ConvertError::type_mismatch(v.ty(), &self.native));
        }
        let value = match (tag, v.data()) {
            (ValueTag::Bool, NativeData::Bool(b)) => ProtoValue::Bool(*b),
            (ValueTag::Int32, NativeData::Int32(n)) => ProtoValue::Int32(*n),
            (ValueTag::Int64, NativeData::Int64(n)) => ProtoValue::Int64(*n),
            (ValueTag::Uint32, NativeData::Uint32(n)) => ProtoValue::Uint32(*n),
            (ValueTag::Uint64, NativeData::Uint64(n)) => ProtoValue::Uint64(*n),
            (ValueTag::Float32, NativeData::Float32(n)) => ProtoValue::Float32(*n),
            (ValueTag::Float64, NativeData::Float64(n)) => ProtoValue::Float64(*n),
            (ValueTag::String, NativeData::String(s)) => ProtoValue::String(s.clone()),
            (ValueTag::String, NativeData::Bytes(b)) => {
                ProtoValue::String(self.text(b.as_deref().unwrap_or_default())?)
            }
            // Empty text is absent bytes.
            (ValueTag::Bytes, NativeData::String(s)) if s.is_empty() => ProtoValue::Bytes(None),
            (ValueTag::Bytes, NativeData::String(s)) => {
                ProtoValue::Bytes(Some(s.as_bytes().to_vec()))
            }
            (ValueTag::Bytes, NativeData::Bytes(b)) => ProtoValue::Bytes(b.clone()),
            (ValueTag::Enum, NativeData::Int32(n)) => ProtoValue::Enum(*n),
            _ => return Err(ConvertError::type_mismatch(v.ty(), tag)),
        };
        Ok(value)
    }

    pub(crate) fn to_native(&self, tag: ValueTag, v: &ProtoValue) -> Result<NativeValue, ConvertError> {
        if v.tag() != tag {
            return Err(ConvertError::type_mismatch(v.tag(), tag));
        }
        let data = match (v, self.native.repr()) {
            (ProtoValue::Bool(b), _) => NativeData::Bool(*b),
            (ProtoValue::Int32(n), _) => NativeData::Int32(*n),
            (ProtoValue::Int64(n), _) => NativeData::Int64(*n),
            (ProtoValue::Uint32(n), _) => NativeData::Uint32(*n),
            (ProtoValue::Uint64(n), _) => NativeData::Uint64(*n),
            (ProtoValue::Float32(n), _) => NativeData::Float32(*n),
            (ProtoValue::Float64(n), _) => NativeData::Float64(*n),
            // Empty text is a nil slice, never an allocated empty one.
            (ProtoValue::String(s), NativeRepr::ByteSlice) => {
                NativeData::Bytes((!s.is_empty()).then(|| s.as_bytes().to_vec()))
            }
            (ProtoValue::String(s), _) => NativeData::String(s.clone()),
            (ProtoValue::Bytes(b), NativeRepr::String) => {
                NativeData::String(self.text(b.as_deref().unwrap_or_default())?)
            }
            (ProtoValue::Bytes(b), _) => NativeData::Bytes(b.clone()),
            (ProtoValue::Enum(n), _) => NativeData::Int32(*n),
            (ProtoValue::Message(_), _) => {
                return Err(ConvertError::type_mismatch(ValueTag::Message, &self.native));
            }
        };
        NativeValue::new(self.native.clone(), data)
            .ok_or_else(|| ConvertError::type_mismatch(tag, &self.native))
    }

    /// Whether [`to_proto`](Self::to_proto) accepts `v`.
    pub(crate) fn accepts_native(&self, tag: ValueTag, v: &NativeValue) -> bool {
        if v.ty() != &self.native {
            return false;
        }
        match (tag, v.data()) {
            (ValueTag::String, NativeData::Bytes(b)) => is_text(b.as_deref()),
            _ => true,
        }
    }

    /// Whether [`to_native`](Self::to_native) accepts `v`.
    pub(crate) fn accepts_proto(&self, tag: ValueTag, v: &ProtoValue) -> bool {
        if v.tag() != tag {
            return false;
        }
        match (v, self.native.repr()) {
            (ProtoValue::Bytes(b), NativeRepr::String) => is_text(b.as_deref()),
            _ => true,
        }
    }

    fn text(&self, bytes: &[u8]) -> Result<String, ConvertError> {
        String::from_utf8(bytes.to_vec())
            .map_err(|_| ConvertError::InvalidUtf8 { native: self.native.clone() })
    }
}

fn is_text(bytes: Option<&[u8]>) -> bool {
    bytes.is_none_or(|b| std::str::from_utf8(b).is_ok())
}
