//! Backend generators.
//!
//! Both backends implement [`Generator`] and are driven by the same schema
//! traversal: depth-first pre-order over each file's messages, so an outer
//! type is always fully emitted before its nested types and nested types are
//! emitted before the next sibling.
//!
//! - [`OverlayGenerator`]: typed structs with presence-tracked accessors
//! - [`ConverterGenerator`]: bidirectional struct/value conversion routines
//!
//! Naming helpers shared by the generators and the registry also live here.

mod converter;
mod overlay;

#[cfg(test)]
mod generated;

use crate::emit::CodeWriter;
use crate::resolve::Backend;
use crate::schema::{Message, SchemaFile, TypeRegistry};
use crate::MAX_PRESENCE_FIELDS;

pub use converter::ConverterGenerator;
pub use overlay::OverlayGenerator;

/// One output backend: names its generated file and writes its content.
///
/// Implementations must record problems through [`CodeWriter::add_error`]
/// rather than aborting; emission is best-effort and the driver decides what
/// to do with a file that produced errors.
pub trait Generator {
    /// Which backend this is
    fn backend(&self) -> Backend;

    /// Generated file name for a schema file with the given stem, prefixed
    /// with `output_dir` when non-empty
    fn file_name(&self, stem: &str, output_dir: &str) -> String;

    /// Emits the generated source for one schema file.
    ///
    /// Runs `check_supported` first; an unsupported file records an error
    /// and produces no content.
    fn write_file(&self, w: &mut CodeWriter, file: &SchemaFile, registry: &TypeRegistry);
}

/// Returns the generator for a backend
pub fn for_backend(backend: Backend) -> Box<dyn Generator> {
    match backend {
        Backend::Overlay => Box::new(OverlayGenerator),
        Backend::Converter => Box::new(ConverterGenerator),
    }
}

/// Checks that a message fits the presence-tracking width both backends
/// assume.
///
/// Returns false, with an error recorded, when the message has more
/// presence-tracked fields than the overlay bitset can hold; the caller
/// skips emission for the message and continues with its nested types.
pub(crate) fn check_presence_width(w: &mut CodeWriter, message: &Message) -> bool {
    let count = message.presence_bit_count();
    if count > MAX_PRESENCE_FIELDS {
        w.add_error(format!(
            "message '{}' has {} presence-tracked fields; at most {} are supported",
            message.full_name, count, MAX_PRESENCE_FIELDS
        ));
        false
    } else {
        true
    }
}

/// Joins an output directory and a file name
pub(crate) fn prefixed(output_dir: &str, file_name: &str) -> String {
    if output_dir.is_empty() {
        file_name.to_string()
    } else {
        format!("{}/{}", output_dir.trim_end_matches('/'), file_name)
    }
}

/// Converts a name to UpperCamelCase.
///
/// Schema message names are conventionally already CamelCase; this also
/// normalizes snake_case names so flattened type names stay well-formed.
pub fn upper_camel(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = true;
    for c in name.chars() {
        if c == '_' {
            upper_next = true;
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Converts a CamelCase name to snake_case
pub fn snake(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            let prev_lower = i > 0 && (chars[i - 1].is_lowercase() || chars[i - 1].is_ascii_digit());
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if i > 0 && chars[i - 1] != '_' && (prev_lower || next_lower) {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Escapes Rust keywords so schema names stay valid identifiers
pub fn rust_ident(name: &str) -> String {
    // Keywords that cannot be raw identifiers get a trailing underscore.
    match name {
        "self" | "Self" | "super" | "crate" | "_" => return format!("{}_", name),
        _ => {}
    }
    const KEYWORDS: &[&str] = &[
        "abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "do",
        "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "gen", "if", "impl", "in",
        "let", "loop", "macro", "match", "mod", "move", "mut", "override", "priv", "pub", "ref",
        "return", "static", "struct", "trait", "true", "try", "type", "typeof", "unsafe",
        "unsized", "use", "virtual", "where", "while", "yield",
    ];
    if KEYWORDS.contains(&name) {
        format!("r#{}", name)
    } else {
        name.to_string()
    }
}
