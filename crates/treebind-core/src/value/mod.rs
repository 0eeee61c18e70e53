//! Value conversion between string-encoded tree values and native store
//! values.

mod convert;

pub use convert::{DefaultValueConverter, DATA_URI_SIZE_THRESHOLD};

use chrono::{DateTime, FixedOffset};

use crate::errors::ConversionError;
use crate::model::{BinaryValue, PropertyKind};

/// Engine-native property value, the default target representation for
/// stores that do not bring their own.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeValue {
    String(String),
    Boolean(bool),
    Long(i64),
    Double(f64),
    /// Arbitrary-precision decimal in canonical string form.
    Decimal(String),
    Date(DateTime<FixedOffset>),
    Binary(BinaryValue),
    /// Reference to another node, carried as its store path.
    Reference(String),
}

impl NativeValue {
    /// The property kind this value corresponds to.
    pub fn kind(&self) -> PropertyKind {
        match self {
            NativeValue::String(_) => PropertyKind::String,
            NativeValue::Boolean(_) => PropertyKind::Boolean,
            NativeValue::Long(_) => PropertyKind::Long,
            NativeValue::Double(_) => PropertyKind::Double,
            NativeValue::Decimal(_) => PropertyKind::Decimal,
            NativeValue::Date(_) => PropertyKind::Date,
            NativeValue::Binary(_) => PropertyKind::Binary,
            NativeValue::Reference(_) => PropertyKind::Path,
        }
    }
}

/// Boundary contract between string-encoded tree values and a store's native
/// value representation.
///
/// `to_native` handles one scalar string value per the type table; binary
/// payloads go through `binary_to_native` instead, never the scalar path.
/// `to_text`/`to_binary_payload` are the inverse direction, used by the
/// extraction path but part of the same contract.
pub trait ValueConverter {
    type Value;

    /// Convert one string-encoded value of the given kind to a native value.
    ///
    /// # Errors
    ///
    /// `ConversionError` when the value is malformed for the kind, or the
    /// kind has no scalar conversion (BINARY, PATH, UNDEFINED).
    fn to_native(&self, kind: PropertyKind, value: &str) -> Result<Self::Value, ConversionError>;

    /// Convert a binary payload to a native value.
    ///
    /// # Errors
    ///
    /// `ConversionError::Io` when the payload backing cannot be read.
    fn binary_to_native(&self, payload: &BinaryValue) -> Result<Self::Value, ConversionError>;

    /// String-encode a native value per the type table.
    ///
    /// # Errors
    ///
    /// `ConversionError` when the value cannot be rendered (for binaries,
    /// when the payload cannot be read or spilled).
    fn to_text(&self, value: &Self::Value) -> Result<String, ConversionError>;

    /// Turn a native binary value into a payload, spilling to external
    /// storage when it exceeds the converter's size threshold.
    ///
    /// # Errors
    ///
    /// `ConversionError::Unsupported` for non-binary values, or
    /// `ConversionError::Io` when reading or spilling fails.
    fn to_binary_payload(&self, value: &Self::Value) -> Result<BinaryValue, ConversionError>;
}
