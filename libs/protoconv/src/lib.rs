//! Field converters between native Rust values and protocol values.
//!
//! A [`ConverterFactory`] pairs a native type with a schema field and
//! yields a [`Converter`] for that field shape. Converters are immutable
//! and shared freely across threads.

pub mod converter;
pub mod error;
pub mod factory;
pub mod legacy;
pub mod message;
pub mod scalar;

pub use converter::{CollectionConverters, Converter, FieldConverter};
pub use error::ConvertError;
pub use factory::ConverterFactory;
pub use message::MessageConverter;
pub use scalar::Scalar;
