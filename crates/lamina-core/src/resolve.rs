//! Backend selection and type resolution.
//!
//! Each backend targets a different runtime representation, so the same
//! schema type maps to different generated names and validation predicates
//! depending on which backend asks. The two resolution tables live here;
//! both are total over every type reachable from the run's registered files.

use crate::schema::{FieldKind, RegisteredKind, ScalarKind, TypeRegistry};

/// The two generator backends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Accessor-overlay generator: typed structs with presence-tracked accessors
    Overlay,
    /// Value-converter generator: routines between structs and tag-keyed value maps
    Converter,
}

impl Backend {
    /// Stable lowercase name, used in logs and file naming
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Overlay => "overlay",
            Backend::Converter => "converter",
        }
    }
}

/// Backend-specific metadata for one schema type
#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    /// The generated type name (value type for the overlay backend, converter
    /// struct name for message references in the converter backend)
    pub generated: String,
    /// Validate-and-extract expression template over a `serde_json::Value`;
    /// `{value}` is replaced with the source expression. Scalar and enum
    /// kinds in the converter backend only. `None` for a non-composite kind
    /// means the backend cannot represent it.
    pub predicate: Option<&'static str>,
    /// Template producing a `Value` from a native expression, write path only
    pub wrap: Option<&'static str>,
    /// True if the type is a generated composite needing recursive emission
    pub composite: bool,
}

impl TypeDescriptor {
    /// Resolves a field kind against the run's registry for one backend.
    ///
    /// # Panics
    ///
    /// Panics if the kind references a type that was never registered (see
    /// [`TypeRegistry::resolve`]).
    pub fn resolve(registry: &TypeRegistry, kind: &FieldKind, backend: Backend) -> TypeDescriptor {
        match kind {
            FieldKind::Scalar(scalar) => scalar_descriptor(*scalar, backend),
            FieldKind::Enum(full_name) => {
                // Enums lower to their integer value in both backends; the
                // registry lookup still runs so a dangling reference fails
                // fast instead of emitting code for a type nobody declared.
                let registered = registry.resolve(full_name);
                debug_assert_eq!(registered.kind, RegisteredKind::Enum);
                scalar_descriptor(ScalarKind::Int32, backend)
            }
            FieldKind::Message(full_name) => {
                let registered = registry.resolve(full_name);
                let generated = match backend {
                    Backend::Overlay => registered.overlay_type().to_string(),
                    Backend::Converter => registered.converter_type(),
                };
                TypeDescriptor {
                    generated,
                    predicate: None,
                    wrap: None,
                    composite: true,
                }
            }
        }
    }

    /// Renders the predicate template with `expr` as the source expression
    pub fn predicate_for(&self, expr: &str) -> Option<String> {
        self.predicate.map(|t| t.replace("{value}", expr))
    }

    /// Renders the wrap template with `expr` as the native expression
    pub fn wrap_for(&self, expr: &str) -> Option<String> {
        self.wrap.map(|t| t.replace("{value}", expr))
    }
}

fn scalar_descriptor(kind: ScalarKind, backend: Backend) -> TypeDescriptor {
    let generated = rust_type(kind).to_string();
    match backend {
        Backend::Overlay => TypeDescriptor {
            generated,
            predicate: None,
            wrap: None,
            composite: false,
        },
        Backend::Converter => {
            let (predicate, wrap) = converter_templates(kind);
            TypeDescriptor {
                generated,
                predicate,
                wrap,
                composite: false,
            }
        }
    }
}

/// Native Rust value type for a scalar kind
fn rust_type(kind: ScalarKind) -> &'static str {
    match kind {
        ScalarKind::Double => "f64",
        ScalarKind::Float => "f32",
        ScalarKind::Int32 => "i32",
        ScalarKind::Int64 => "i64",
        ScalarKind::Uint32 => "u32",
        ScalarKind::Uint64 => "u64",
        ScalarKind::Bool => "bool",
        ScalarKind::String => "String",
        ScalarKind::Bytes => "Vec<u8>",
    }
}

/// Extraction and wrapping templates for the converter backend.
///
/// The 32-bit integer kinds range-check through `try_from` so an
/// out-of-range value is a validation failure, not a silent truncation.
/// Bytes have no representation in the value model and yield `None`.
fn converter_templates(kind: ScalarKind) -> (Option<&'static str>, Option<&'static str>) {
    match kind {
        ScalarKind::Double => (Some("{value}.as_f64()"), Some("Value::from({value})")),
        ScalarKind::Float => (
            Some("{value}.as_f64().map(|v| v as f32)"),
            Some("Value::from(f64::from({value}))"),
        ),
        ScalarKind::Int32 => (
            Some("{value}.as_i64().and_then(|v| i32::try_from(v).ok())"),
            Some("Value::from({value})"),
        ),
        ScalarKind::Int64 => (Some("{value}.as_i64()"), Some("Value::from({value})")),
        ScalarKind::Uint32 => (
            Some("{value}.as_u64().and_then(|v| u32::try_from(v).ok())"),
            Some("Value::from({value})"),
        ),
        ScalarKind::Uint64 => (Some("{value}.as_u64()"), Some("Value::from({value})")),
        ScalarKind::Bool => (Some("{value}.as_bool()"), Some("Value::from({value})")),
        ScalarKind::String => (
            Some("{value}.as_str().map(String::from)"),
            Some("Value::from({value})"),
        ),
        ScalarKind::Bytes => (None, None),
    }
}
