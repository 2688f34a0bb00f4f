pub mod dynamic;
pub mod error;
pub mod message;
pub mod schema;
pub mod value;

pub use error::{ErrorKind, SchemaError};
pub use message::{
    Access, Capability, MessageHandle, MessageRef, MessageType, NativeStruct, ProtoMessage,
    ReflectMessage,
};
pub use schema::{Cardinality, Field, FieldDescriptor, Kind, Schema};
pub use value::{
    EnumNumber, NativeData, NativeRepr, NativeType, NativeValue, ProtoValue, StructSlot, ValueTag,
};
