use protoconv_api::{
    Capability, MessageHandle, MessageRef, MessageType, NativeData, NativeRepr, NativeType,
    NativeValue, ProtoValue, StructSlot, ValueTag,
};

use crate::error::ConvertError;
use crate::legacy;

/// Converter for message and group fields.
///
/// Handles both native shapes: a pointer to the struct (the common case)
/// and the struct held by value.
#[derive(Debug, Clone)]
pub struct MessageConverter {
    native: NativeType,
    message: MessageType,
    by_value: bool,
}

impl MessageConverter {
    /// `None` unless `native` is a pointer to, or a value of, a message struct.
    pub(crate) fn new(native: NativeType) -> Option<Self> {
        let (message, by_value) = match native.repr() {
            NativeRepr::Pointer(m) => (m.clone(), false),
            NativeRepr::Struct(m) => (m.clone(), true),
            _ => return None,
        };
        Some(Self { native, message, by_value })
    }

    pub fn native_type(&self) -> &NativeType {
        &self.native
    }

    fn wrap(&self, target: Option<MessageRef>) -> MessageHandle {
        match self.message.capability() {
            Capability::Reflective => MessageHandle::reflect(self.message.clone(), target),
            Capability::Legacy => legacy::wrap(&self.message, target),
        }
    }

    pub(crate) fn to_proto(&self, v: &NativeValue) -> Result<ProtoValue, ConvertError> {
        if v.ty() != &self.native {
            return Err(ConvertError::type_mismatch(v.ty(), &self.native));
        }
        let target = match v.data() {
            NativeData::Pointer(target) => target.clone(),
            // T => *T
            NativeData::Struct(StructSlot::Place(place)) => Some(place.clone()),
            NativeData::Struct(StructSlot::Zero) => None,
            _ => return Err(ConvertError::type_mismatch(v.ty(), &self.native)),
        };
        Ok(ProtoValue::Message(self.wrap(target)))
    }

    /// Native form behind a message value, preferring the unwrap capability.
    fn underlying(v: &ProtoValue) -> Result<NativeValue, ConvertError> {
        let ProtoValue::Message(handle) = v else {
            return Err(ConvertError::type_mismatch(v.tag(), ValueTag::Message));
        };
        let message = handle.message();
        Ok(message.proto_unwrap().unwrap_or_else(|| message.interface()))
    }

    fn pointer_type(&self) -> NativeType {
        NativeType::pointer_to(self.message.clone())
    }

    pub(crate) fn to_native(&self, v: &ProtoValue) -> Result<NativeValue, ConvertError> {
        let mut native = Self::underlying(v)?;
        if self.by_value {
            let pointer = self.pointer_type();
            if native.ty() != &pointer {
                return Err(ConvertError::type_mismatch(native.ty(), &pointer));
            }
            // *T => T
            native = match native.into_parts().1 {
                NativeData::Pointer(Some(target)) => {
                    let slot = NativeData::Struct(StructSlot::Place(target));
                    NativeValue::new(self.native.clone(), slot)
                        .ok_or_else(|| ConvertError::type_mismatch(&pointer, &self.native))?
                }
                _ => self.native.zero(),
            };
        }
        if native.ty() != &self.native {
            return Err(ConvertError::type_mismatch(native.ty(), &self.native));
        }
        Ok(native)
    }

    pub(crate) fn is_valid_proto(&self, v: &ProtoValue) -> bool {
        let Ok(native) = Self::underlying(v) else {
            return false;
        };
        if self.by_value {
            return native.ty() == &self.pointer_type();
        }
        native.ty() == &self.native
    }

    /// Fresh default instance on every call.
    pub(crate) fn new_value(&self) -> ProtoValue {
        ProtoValue::Message(self.wrap(Some(self.message.alloc())))
    }

    pub(crate) fn zero_value(&self) -> ProtoValue {
        ProtoValue::Message(self.wrap(None).into_immutable())
    }
}
