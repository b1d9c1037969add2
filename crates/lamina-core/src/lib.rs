//! # lamina-core
//!
//! A library implementing the generator half of a `protoc` plugin: given a
//! compiled `CodeGeneratorRequest` describing message and enum schemas, it
//! emits per-file Rust source for one of two target runtimes.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`schema`]: Owned schema model and the per-run type registry
//! - [`resolve`]: Backend selection and schema-type to generated-type mapping
//! - [`emit`]: Indentation-aware templated text emission
//! - [`gen`]: The two backend generators (accessor overlay, value converter)
//! - [`plugin`]: Batch driver over the protoc plugin protocol
//! - [`error`]: Error types and handling
//!
//! ## Example
//!
//! ```no_run
//! use lamina_core::{plugin, Backend};
//! use std::io;
//!
//! // Decode one request from stdin, write one response to stdout.
//! plugin::run(Backend::Overlay, &mut io::stdin().lock(), &mut io::stdout().lock())?;
//! # Ok::<(), lamina_core::Error>(())
//! ```
//!
//! ## Backends
//!
//! The *accessor overlay* backend generates typed message structs with
//! presence-tracked accessors. The *value converter* backend generates
//! bidirectional routines between those structs and `serde_json::Value`
//! maps keyed by field tag. Both walk the same schema model and share the
//! same type-resolution tables.

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unreachable_pub)]

pub mod emit;
pub mod error;
pub mod gen;
pub mod plugin;
pub mod resolve;
pub mod schema;

// Re-export primary types for convenience
pub use emit::CodeWriter;
pub use error::{Error, Result};
pub use gen::{ConverterGenerator, Generator, OverlayGenerator};
pub use resolve::{Backend, TypeDescriptor};
pub use schema::{Cardinality, Enum, Field, FieldKind, Message, ScalarKind, SchemaFile, TypeRegistry};

/// Crate version for programmatic access
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Maximum number of presence-tracked fields per message.
///
/// Presence of singular non-message fields in generated overlay structs is
/// tracked in a single 64-bit set; message-typed fields track presence on
/// their own slot. Schemas exceeding this record an emitter error.
pub const MAX_PRESENCE_FIELDS: usize = 64;
