use thiserror::Error;

use crate::model::PropertyKind;

/// Result type alias for binding operations.
pub type BindResult<T> = std::result::Result<T, BindError>;

/// Failure reported by the target node store while reading or mutating.
///
/// Store implementations produce these; the binder wraps them into a
/// [`BindError`] with node-path context. `CardinalityMismatch` is special:
/// it signals that a single-value assignment hit a definition requiring
/// multiple values, and triggers the binder's one documented retry (setting
/// the value as a one-element array).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    /// The addressed node no longer exists in the store.
    #[error("node not found: {path}")]
    NodeNotFound { path: String },

    /// The store rejected a property assignment.
    #[error("property '{name}' rejected: {reason}")]
    PropertyRejected { name: String, reason: String },

    /// Single-value assignment to a definition that requires multiple values.
    #[error("property '{name}' requires a multi-valued assignment")]
    CardinalityMismatch { name: String },

    /// A node type name was not acceptable to the store.
    #[error("invalid node type '{type_name}': {reason}")]
    InvalidType { type_name: String, reason: String },

    /// The store refused to remove a node.
    #[error("node removal refused: {path}")]
    RemoveRefused { path: String },

    /// Any other store-level failure.
    #[error("{message}")]
    Other { message: String },
}

/// A source value could not be converted to its declared kind.
///
/// The engine never substitutes a default value for a malformed one; these
/// propagate to the caller wrapped in [`BindError::Conversion`].
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("invalid BOOLEAN value '{value}'")]
    InvalidBoolean { value: String },

    #[error("invalid LONG value '{value}'")]
    InvalidLong { value: String },

    #[error("invalid DOUBLE value '{value}'")]
    InvalidDouble { value: String },

    #[error("invalid DECIMAL value '{value}'")]
    InvalidDecimal { value: String },

    #[error("invalid DATE value '{value}': {reason}")]
    InvalidDate { value: String, reason: String },

    #[error("invalid binary value: {reason}")]
    InvalidBinary { reason: String },

    /// The kind has no conversion on this path (PATH values are resolved by
    /// the binder against the store; UNDEFINED values carry no type to
    /// convert to).
    #[error("values of kind {kind} are not convertible")]
    Unsupported { kind: PropertyKind },

    #[error("binary I/O failed: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

/// The single caller-facing error for a failed `bind` call.
///
/// Carries the path of the node being reconciled when the failure occurred.
/// The binder performs no rollback: the target below the failure point may be
/// partially mutated, and callers needing atomicity must wrap the whole call
/// in a store-level transaction.
#[derive(Debug, Error)]
pub enum BindError {
    #[error("binding failed at '{path}': {source}")]
    Store {
        path: String,
        #[source]
        source: StoreError,
    },

    #[error("binding failed at '{path}', property '{property}': {source}")]
    Conversion {
        path: String,
        property: String,
        #[source]
        source: ConversionError,
    },
}

impl BindError {
    pub(crate) fn store(path: impl Into<String>, source: StoreError) -> Self {
        BindError::Store {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn conversion(
        path: impl Into<String>,
        property: impl Into<String>,
        source: ConversionError,
    ) -> Self {
        BindError::Conversion {
            path: path.into(),
            property: property.into(),
            source,
        }
    }

    /// Path of the node the binder was reconciling when the failure occurred.
    pub fn path(&self) -> &str {
        match self {
            BindError::Store { path, .. } | BindError::Conversion { path, .. } => path,
        }
    }
}
