use std::fmt::Display;

use protoconv_api::{Kind, NativeType, ProtoValue};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConvertError {
    #[error("invalid native type {native} for field {field}")]
    KindMismatch { native: NativeType, field: String },

    #[error("invalid type: got {got}, want {want}")]
    TypeMismatch { got: String, want: String },

    #[error("invalid default {value:?} for {kind} field {field}")]
    InvalidDefault { field: String, kind: Kind, value: ProtoValue },

    #[error("repeated enum field {field} declares no values")]
    EmptyEnum { field: String },

    #[error("no collection converter configured for field {field}")]
    NoCollectionConverter { field: String },

    #[error("invalid UTF-8 for native type {native}")]
    InvalidUtf8 { native: NativeType },
}

impl ConvertError {
    pub fn type_mismatch(got: impl Display, want: impl Display) -> Self {
        ConvertError::TypeMismatch { got: got.to_string(), want: want.to_string() }
    }
}

/// Aborts the current operation. Mismatches at this layer are binding
/// defects, not data conditions.
#[track_caller]
pub(crate) fn fatal(err: ConvertError) -> ! {
    tracing::error!(error = %err, "conversion aborted");
    panic!("{err}")
}
