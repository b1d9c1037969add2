//! Error types for the lamina-core library.
//!
//! This module provides comprehensive error handling using the `thiserror` crate,
//! with detailed error variants for different failure modes.
//!
//! Errors split into two families: file-local errors that are reported in the
//! response and never abort the batch, and boundary errors (framing, I/O) that
//! are fatal to the whole run.

use thiserror::Error;

/// Result type alias for lamina operations
pub type Result<T> = std::result::Result<T, Error>;

/// Comprehensive error type for all lamina operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// A schema file declares imports, which generation does not support
    #[error("file '{file}' imports other files ({imports}); imports are not supported")]
    UnsupportedFile {
        /// Name of the offending schema file
        file: String,
        /// Comma-joined list of imported file names
        imports: String,
    },

    /// Two fields in one message share a tag number
    #[error("message '{message}' declares field tag {tag} more than once")]
    DuplicateTag {
        /// Full name of the offending message
        message: String,
        /// The repeated tag value
        tag: i32,
    },

    /// Two values in one enum share a name
    #[error("enum '{enum_name}' declares value '{value}' more than once")]
    DuplicateEnumValue {
        /// Full name of the offending enum
        enum_name: String,
        /// The repeated value name
        value: String,
    },

    /// A field's descriptor carries no resolvable value kind
    #[error("field '{field}' in message '{message}' has an unsupported type")]
    UnsupportedFieldType {
        /// Full name of the owning message
        message: String,
        /// Declared field name
        field: String,
    },

    /// Failed to decode the CodeGeneratorRequest from the input stream
    #[error("failed to decode code generator request: {0}")]
    RequestDecode(#[from] prost::DecodeError),

    /// Failed to encode the CodeGeneratorResponse to the output stream
    #[error("failed to encode code generator response: {0}")]
    ResponseEncode(#[from] prost::EncodeError),

    /// I/O failure at the plugin protocol boundary
    #[error("plugin i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Creates a new unsupported-file error from an import list
    pub fn unsupported_file(file: impl Into<String>, imports: &[String]) -> Self {
        Self::UnsupportedFile {
            file: file.into(),
            imports: imports.join(", "),
        }
    }

    /// Creates a new duplicate-tag error
    pub fn duplicate_tag(message: impl Into<String>, tag: i32) -> Self {
        Self::DuplicateTag {
            message: message.into(),
            tag,
        }
    }

    /// Creates a new duplicate-enum-value error
    pub fn duplicate_enum_value(enum_name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::DuplicateEnumValue {
            enum_name: enum_name.into(),
            value: value.into(),
        }
    }

    /// Creates a new unsupported-field-type error
    pub fn unsupported_field_type(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::UnsupportedFieldType {
            message: message.into(),
            field: field.into(),
        }
    }

    /// Creates a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns true if this error is local to one schema file.
    ///
    /// File-local errors are recorded in the response for that file and never
    /// abort generation of sibling files in the same batch.
    pub fn is_file_local(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedFile { .. }
                | Self::DuplicateTag { .. }
                | Self::DuplicateEnumValue { .. }
                | Self::UnsupportedFieldType { .. }
        )
    }
}
