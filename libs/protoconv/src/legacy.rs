//! Reflection for struct types that do not implement [`ProtoMessage`].
//!
//! [`ProtoMessage`]: protoconv_api::ProtoMessage

use std::sync::Arc;

use protoconv_api::{Access, MessageHandle, MessageRef, MessageType, NativeValue, ReflectMessage};

#[derive(Debug)]
struct LegacyMessage {
    ty: MessageType,
    full_name: String,
    target: Option<MessageRef>,
}

impl ReflectMessage for LegacyMessage {
    fn full_name(&self) -> &str {
        &self.full_name
    }

    fn interface(&self) -> NativeValue {
        NativeValue::pointer(&self.ty, self.target.clone())
    }
}

/// Synthesizes the reflection capability for a foreign struct pointer.
pub(crate) fn wrap(ty: &MessageType, target: Option<MessageRef>) -> MessageHandle {
    let access = if target.is_some() { Access::Mutable } else { Access::Immutable };
    let message = LegacyMessage {
        ty: ty.clone(),
        full_name: derive_full_name(ty.name()),
        target,
    };
    MessageHandle::new(Arc::new(message), access)
}

/// Schema-style name for a Rust type path.
///
/// `my_crate::quotes::Quote<T>` → `my_crate.quotes.Quote`.
pub fn derive_full_name(type_path: &str) -> String {
    let base = type_path.split('<').next().unwrap_or(type_path);
    base.split("::")
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join(".")
}
