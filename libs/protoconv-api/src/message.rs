use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::value::{NativeData, NativeValue};

/// Any native struct that can live behind a [`MessageRef`].
pub trait NativeStruct: Any + Send + Sync + fmt::Debug {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any + Send + Sync + fmt::Debug> NativeStruct for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Message capability: the struct knows its schema identity and can be
/// reflected without an adapter.
pub trait ProtoMessage: NativeStruct + Default {
    /// Fully-qualified schema name (e.g. `"market.Quote"`).
    const FULL_NAME: &'static str;
}

/// How a message type is exposed to the reflection system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Implements [`ProtoMessage`].
    Reflective,
    /// Foreign struct shape; needs the legacy adapter.
    Legacy,
}

/// Shared, lock-protected storage of one native struct.
///
/// Cloning aliases the storage. Equality is identity. The stored type is
/// fixed at creation and known without locking.
#[derive(Clone)]
pub struct MessageRef {
    type_id: TypeId,
    inner: Arc<RwLock<dyn NativeStruct>>,
}

impl MessageRef {
    pub fn new<T: NativeStruct>(value: T) -> Self {
        Self { type_id: TypeId::of::<T>(), inner: Arc::new(RwLock::new(value)) }
    }

    /// Runs `f` on the stored struct if it is a `T`.
    pub fn read<T: 'static, R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        let guard = self.inner.read();
        NativeStruct::as_any(&*guard).downcast_ref::<T>().map(f)
    }

    /// Runs `f` on the stored struct if it is a `T`.
    pub fn write<T: 'static, R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        let mut guard = self.inner.write();
        NativeStruct::as_any_mut(&mut *guard).downcast_mut::<T>().map(f)
    }

    pub fn stored_type_id(&self) -> TypeId {
        self.type_id
    }

    /// Safe to call while the storage is locked.
    pub fn is_instance_of(&self, ty: &MessageType) -> bool {
        self.type_id == ty.type_id
    }

    pub fn ptr_eq(&self, other: &MessageRef) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.inner), Arc::as_ptr(&other.inner))
    }
}

impl PartialEq for MessageRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for MessageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.try_read() {
            Some(guard) => f.debug_tuple("MessageRef").field(&&*guard).finish(),
            None => f.write_str("MessageRef(<locked>)"),
        }
    }
}

/// Identity of a native message struct type.
#[derive(Clone)]
pub struct MessageType {
    name: &'static str,
    type_id: TypeId,
    capability: Capability,
    alloc: fn() -> MessageRef,
}

fn alloc_default<T: NativeStruct + Default>() -> MessageRef {
    MessageRef::new(T::default())
}

impl MessageType {
    /// Type implementing the message capability.
    pub fn of<T: ProtoMessage>() -> Self {
        Self {
            name: T::FULL_NAME,
            type_id: TypeId::of::<T>(),
            capability: Capability::Reflective,
            alloc: alloc_default::<T>,
        }
    }

    /// Foreign struct; named by its Rust type path.
    pub fn legacy<T: NativeStruct + Default>() -> Self {
        Self {
            name: std::any::type_name::<T>(),
            type_id: TypeId::of::<T>(),
            capability: Capability::Legacy,
            alloc: alloc_default::<T>,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn capability(&self) -> Capability {
        self.capability
    }

    /// Fresh default-valued instance. Never shared.
    pub fn alloc(&self) -> MessageRef {
        (self.alloc)()
    }
}

/// Equal when both the Rust type and the reflection capability match.
impl PartialEq for MessageType {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id && self.capability == other.capability
    }
}

impl Eq for MessageType {}

impl std::hash::Hash for MessageType {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
        self.capability.hash(state);
    }
}

impl fmt::Debug for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageType")
            .field("name", &self.name)
            .field("capability", &self.capability)
            .finish()
    }
}

// ════════════════════════════════════════════════════════════════
//  Reflection
// ════════════════════════════════════════════════════════════════

/// A message as seen by the reflection system.
pub trait ReflectMessage: Send + Sync + fmt::Debug {
    fn full_name(&self) -> &str;

    /// Native form: a pointer-typed value.
    fn interface(&self) -> NativeValue;

    /// Wrapper messages (lists, maps) hand back the native value they wrap.
    fn proto_unwrap(&self) -> Option<NativeValue> {
        None
    }
}

/// Whether writes through a [`MessageHandle`] are permitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Access {
    Mutable,
    /// Shared empty marker. Must not be written.
    Immutable,
}

/// Reflection over a native message implementing [`ProtoMessage`].
#[derive(Debug)]
struct Reflected {
    ty: MessageType,
    target: Option<MessageRef>,
}

impl ReflectMessage for Reflected {
    fn full_name(&self) -> &str {
        self.ty.name()
    }

    fn interface(&self) -> NativeValue {
        NativeValue::pointer(&self.ty, self.target.clone())
    }
}

/// Message payload of a [`ProtoValue::Message`](crate::value::ProtoValue::Message).
#[derive(Clone)]
pub struct MessageHandle {
    message: Arc<dyn ReflectMessage>,
    access: Access,
}

impl MessageHandle {
    pub fn new(message: Arc<dyn ReflectMessage>, access: Access) -> Self {
        Self { message, access }
    }

    /// Reflects a native pointer. A nil pointer yields an immutable handle.
    pub fn reflect(ty: MessageType, target: Option<MessageRef>) -> Self {
        let access = if target.is_some() { Access::Mutable } else { Access::Immutable };
        Self::new(Arc::new(Reflected { ty, target }), access)
    }

    pub fn message(&self) -> &dyn ReflectMessage {
        self.message.as_ref()
    }

    pub fn full_name(&self) -> &str {
        self.message.full_name()
    }

    pub fn access(&self) -> Access {
        self.access
    }

    pub fn is_mutable(&self) -> bool {
        self.access == Access::Mutable
    }

    pub fn into_immutable(self) -> Self {
        Self { access: Access::Immutable, ..self }
    }

    /// Storage behind the handle; `None` for nil messages and wrappers.
    pub fn target(&self) -> Option<MessageRef> {
        match self.message.interface().into_parts().1 {
            NativeData::Pointer(target) => target,
            _ => None,
        }
    }

    pub fn read<T: 'static, R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        self.target()?.read(f)
    }

    /// Refused (`None`) on immutable handles.
    pub fn write<T: 'static, R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        if !self.is_mutable() {
            return None;
        }
        self.target()?.write(f)
    }
}

impl PartialEq for MessageHandle {
    fn eq(&self, other: &Self) -> bool {
        self.message.full_name() == other.message.full_name()
            && self.message.interface() == other.message.interface()
    }
}

impl fmt::Debug for MessageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageHandle")
            .field("message", &self.message)
            .field("access", &self.access)
            .finish()
    }
}
