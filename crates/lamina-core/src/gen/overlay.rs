//! Accessor-overlay backend.
//!
//! Generates, per schema file, a Rust module of plain message structs.
//! Presence of singular scalar fields is tracked in an explicit bitset;
//! singular message fields store as `Option<Box<T>>` (boxed, so recursive
//! schemas stay finitely sized) and track presence on the slot itself.
//! Repeated fields are ordered `Vec` slots pre-initialized empty by the
//! factory, so accessors can assume a repeated slot always exists. Nested
//! types flatten
//! into concatenated names (`Outer.Inner` generates `OuterInner`) and are
//! emitted in depth-first pre-order, outer type first.
//!
//! Enums lower to a module of named integer constants; no accessor methods
//! are generated for them.

use crate::emit::CodeWriter;
use crate::gen::{check_presence_width, prefixed, rust_ident, Generator};
use crate::resolve::{Backend, TypeDescriptor};
use crate::schema::{Enum, Field, FieldKind, Message, ScalarKind, SchemaFile, TypeRegistry};
use tracing::debug;

/// The accessor-overlay generator
#[derive(Debug, Clone, Copy, Default)]
pub struct OverlayGenerator;

impl Generator for OverlayGenerator {
    fn backend(&self) -> Backend {
        Backend::Overlay
    }

    fn file_name(&self, stem: &str, output_dir: &str) -> String {
        prefixed(output_dir, &format!("{}.rs", stem))
    }

    fn write_file(&self, w: &mut CodeWriter, file: &SchemaFile, registry: &TypeRegistry) {
        if let Err(err) = file.check_supported() {
            w.add_error(err.to_string());
            return;
        }
        debug!("generating overlay for {}", file.name);

        w.write_generated_header(&file.name);
        w.output("#![allow(dead_code)]", &[]);
        w.output("", &[]);

        for message in &file.messages {
            self.write_message(w, message, registry);
        }
        for e in &file.enums {
            self.write_enum(w, e, registry);
        }
    }
}

impl OverlayGenerator {
    fn write_message(&self, w: &mut CodeWriter, message: &Message, registry: &TypeRegistry) {
        let name = registry.resolve(&message.full_name).overlay_type().to_string();

        if check_presence_width(w, message) {
            let slots: Vec<Slot<'_>> = message
                .fields
                .iter()
                .map(|f| Slot::new(f, registry))
                .collect();
            self.write_struct(w, message, &name, &slots);
            self.write_impl(w, message, &name, &slots);
        }

        // Nested types are separate flattened items; a problem with the
        // outer message does not suppress them.
        for nested in &message.messages {
            self.write_message(w, nested, registry);
        }
        for e in &message.enums {
            self.write_enum(w, e, registry);
        }
    }

    fn write_struct(&self, w: &mut CodeWriter, message: &Message, name: &str, slots: &[Slot<'_>]) {
        w.output(
            "/// Overlay for the `{proto}` message",
            &[("proto", message.full_name.trim_start_matches('.'))],
        );
        w.output("#[derive(Debug, Clone, PartialEq)]", &[]);
        w.output("pub struct {name} {{", &[("name", name)]);
        w.indented(|w| {
            if message.presence_bit_count() > 0 {
                w.output("has_bits: u64,", &[]);
            }
            for slot in slots {
                w.output(
                    "{field}: {ty},",
                    &[("field", &slot.ident), ("ty", &slot.declared())],
                );
            }
        });
        w.output("}}", &[]);
        w.output("", &[]);

        w.output("impl Default for {name} {{", &[("name", name)]);
        w.indented(|w| {
            w.output("fn default() -> Self {{", &[]);
            w.indented(|w| w.output("Self::new()", &[]));
            w.output("}}", &[]);
        });
        w.output("}}", &[]);
        w.output("", &[]);
    }

    fn write_impl(&self, w: &mut CodeWriter, message: &Message, name: &str, slots: &[Slot<'_>]) {
        w.output("impl {name} {{", &[("name", name)]);
        w.indented(|w| {
            self.write_factory(w, message, slots);
            let mut bit = 0;
            for slot in slots {
                w.output("", &[]);
                if slot.field.is_repeated() {
                    self.write_repeated_accessors(w, slot);
                } else if slot.field.is_message() {
                    self.write_singular_message_accessors(w, slot);
                } else {
                    self.write_singular_accessors(w, slot, bit);
                    bit += 1;
                }
            }
        });
        w.output("}}", &[]);
        w.output("", &[]);
    }

    /// The factory: every singular field starts unset, every repeated slot
    /// starts as an empty collection
    fn write_factory(&self, w: &mut CodeWriter, message: &Message, slots: &[Slot<'_>]) {
        w.output("/// Creates an instance with all fields unset", &[]);
        w.output("pub fn new() -> Self {{", &[]);
        w.indented(|w| {
            w.output("Self {{", &[]);
            w.indented(|w| {
                if message.presence_bit_count() > 0 {
                    w.output("has_bits: 0,", &[]);
                }
                for slot in slots {
                    if slot.field.is_repeated() {
                        w.output("{field}: Vec::new(),", &[("field", &slot.ident)]);
                    } else {
                        w.output(
                            "{field}: {default},",
                            &[("field", &slot.ident), ("default", &slot.default)],
                        );
                    }
                }
            });
            w.output("}}", &[]);
        });
        w.output("}}", &[]);
    }

    /// Scalar and enum singular fields: presence rides on one bit of the
    /// shared set. Method names are prefixed with the raw schema name;
    /// only the bare getter and the slot itself need keyword escaping.
    fn write_singular_accessors(&self, w: &mut CodeWriter, slot: &Slot<'_>, bit: usize) {
        let bit = bit.to_string();
        let subs: &[(&str, &str)] = &[
            ("name", &slot.ident),
            ("raw", &slot.field.name),
            ("ty", &slot.getter_ty),
            ("stored", &slot.stored),
            ("bit", &bit),
        ];

        w.output("pub fn has_{raw}(&self) -> bool {{", subs);
        w.indented(|w| w.output("self.has_bits & (1 << {bit}) != 0", subs));
        w.output("}}", subs);
        w.output("", &[]);

        let access = format!("self.{}", slot.ident);
        let expr = slot.getter_expr(&access);
        w.output("pub fn {name}(&self) -> {ty} {{", subs);
        w.indented(|w| {
            w.output("assert!(self.has_{raw}(), \"field '{raw}' is unset\");", subs);
            w.output(&expr, &[]);
        });
        w.output("}}", subs);
        w.output("", &[]);

        w.output("pub fn set_{raw}(&mut self, value: {stored}) {{", subs);
        w.indented(|w| {
            w.output("self.has_bits |= 1 << {bit};", subs);
            w.output("self.{name} = value;", subs);
        });
        w.output("}}", subs);
        w.output("", &[]);

        w.output("pub fn clear_{raw}(&mut self) {{", subs);
        w.indented(|w| {
            w.output("self.has_bits &= !(1 << {bit});", subs);
            w.output("self.{name} = {default};", &[
                ("name", &slot.ident),
                ("default", &slot.default),
            ]);
        });
        w.output("}}", subs);
    }

    /// Message singular fields: stored boxed so self-referential schemas
    /// stay finitely sized, with the `Option` carrying presence.
    fn write_singular_message_accessors(&self, w: &mut CodeWriter, slot: &Slot<'_>) {
        let subs: &[(&str, &str)] = &[
            ("name", &slot.ident),
            ("raw", &slot.field.name),
            ("stored", &slot.stored),
        ];

        w.output("pub fn has_{raw}(&self) -> bool {{", subs);
        w.indented(|w| w.output("self.{name}.is_some()", subs));
        w.output("}}", subs);
        w.output("", &[]);

        w.output("pub fn {name}(&self) -> &{stored} {{", subs);
        w.indented(|w| {
            w.output(
                "self.{name}.as_deref().expect(\"field '{raw}' is unset\")",
                subs,
            );
        });
        w.output("}}", subs);
        w.output("", &[]);

        w.output("pub fn set_{raw}(&mut self, value: {stored}) {{", subs);
        w.indented(|w| w.output("self.{name} = Some(Box::new(value));", subs));
        w.output("}}", subs);
        w.output("", &[]);

        w.output("pub fn clear_{raw}(&mut self) {{", subs);
        w.indented(|w| w.output("self.{name} = None;", subs));
        w.output("}}", subs);
        w.output("", &[]);

        w.output("pub fn {raw}_mut(&mut self) -> &mut {stored} {{", subs);
        w.indented(|w| {
            w.output(
                "self.{name}.get_or_insert_with(|| Box::new({stored}::new()))",
                subs,
            );
        });
        w.output("}}", subs);
    }

    fn write_repeated_accessors(&self, w: &mut CodeWriter, slot: &Slot<'_>) {
        let subs: &[(&str, &str)] = &[
            ("name", &slot.ident),
            ("raw", &slot.field.name),
            ("ty", &slot.getter_ty),
            ("stored", &slot.stored),
        ];

        w.output("pub fn {raw}_count(&self) -> usize {{", subs);
        w.indented(|w| w.output("self.{name}.len()", subs));
        w.output("}}", subs);
        w.output("", &[]);

        let access = format!("self.{}[idx]", slot.ident);
        let expr = slot.getter_expr(&access);
        w.output("pub fn {name}(&self, idx: usize) -> {ty} {{", subs);
        w.indented(|w| {
            w.output(
                "assert!(idx < self.{name}.len(), \"index out of range for '{raw}'\");",
                subs,
            );
            w.output(&expr, &[]);
        });
        w.output("}}", subs);
        w.output("", &[]);

        w.output("pub fn set_{raw}(&mut self, idx: usize, value: {stored}) {{", subs);
        w.indented(|w| {
            w.output(
                "assert!(idx < self.{name}.len(), \"index out of range for '{raw}'\");",
                subs,
            );
            w.output("self.{name}[idx] = value;", subs);
        });
        w.output("}}", subs);
        w.output("", &[]);

        w.output("/// Read-only view of the current elements", subs);
        w.output("pub fn {raw}_list(&self) -> &[{stored}] {{", subs);
        w.indented(|w| w.output("&self.{name}", subs));
        w.output("}}", subs);
        w.output("", &[]);

        w.output("pub fn clear_{raw}(&mut self) {{", subs);
        w.indented(|w| w.output("self.{name}.clear();", subs));
        w.output("}}", subs);
        w.output("", &[]);

        if slot.field.is_message() {
            w.output("/// Appends a fresh default instance and returns it for population", subs);
            w.output("pub fn add_{raw}(&mut self) -> &mut {stored} {{", subs);
            w.indented(|w| {
                w.output("let idx = self.{name}.len();", subs);
                w.output("self.{name}.push({stored}::new());", subs);
                w.output("&mut self.{name}[idx]", subs);
            });
            w.output("}}", subs);
        } else {
            w.output("pub fn add_{raw}(&mut self, value: {stored}) {{", subs);
            w.indented(|w| w.output("self.{name}.push(value);", subs));
            w.output("}}", subs);
        }
    }

    fn write_enum(&self, w: &mut CodeWriter, e: &Enum, registry: &TypeRegistry) {
        let module = registry.resolve(&e.full_name).enum_module();
        w.output(
            "/// Values of the `{proto}` enum",
            &[("proto", e.full_name.trim_start_matches('.'))],
        );
        w.output("pub mod {module} {{", &[("module", &module)]);
        w.indented(|w| {
            for (value_name, number) in &e.values {
                w.output(
                    "pub const {name}: i32 = {value};",
                    &[("name", value_name), ("value", &number.to_string())],
                );
            }
        });
        w.output("}}", &[]);
        w.output("", &[]);
    }
}

/// How a getter hands out a stored value
#[derive(Debug, Clone, Copy)]
enum Access {
    /// Copy types return by value
    Copy,
    /// `String` slots return `&str`
    Str,
    /// `Vec<u8>` slots return `&[u8]`
    Slice,
    /// Message slots return a shared reference
    Ref,
}

/// Per-field emission shape, resolved once per field
struct Slot<'a> {
    field: &'a Field,
    ident: String,
    stored: String,
    getter_ty: String,
    default: String,
    access: Access,
}

impl<'a> Slot<'a> {
    fn new(field: &'a Field, registry: &TypeRegistry) -> Self {
        let descriptor = TypeDescriptor::resolve(registry, &field.kind, Backend::Overlay);
        let stored = descriptor.generated;
        let (getter_ty, default, access) = match &field.kind {
            FieldKind::Scalar(ScalarKind::String) => {
                ("&str".to_string(), "String::new()".to_string(), Access::Str)
            }
            FieldKind::Scalar(ScalarKind::Bytes) => {
                ("&[u8]".to_string(), "Vec::new()".to_string(), Access::Slice)
            }
            FieldKind::Scalar(ScalarKind::Double | ScalarKind::Float) => {
                (stored.clone(), "0.0".to_string(), Access::Copy)
            }
            FieldKind::Scalar(ScalarKind::Bool) => {
                (stored.clone(), "false".to_string(), Access::Copy)
            }
            FieldKind::Scalar(_) | FieldKind::Enum(_) => {
                (stored.clone(), "0".to_string(), Access::Copy)
            }
            FieldKind::Message(_) => (format!("&{}", stored), "None".to_string(), Access::Ref),
        };
        Self {
            field,
            ident: rust_ident(&field.name),
            stored,
            getter_ty,
            default,
            access,
        }
    }

    /// Declared type of the struct slot. Singular message slots box the
    /// value so a message embedding itself stays finitely sized.
    fn declared(&self) -> String {
        if self.field.is_repeated() {
            format!("Vec<{}>", self.stored)
        } else if self.field.is_message() {
            format!("Option<Box<{}>>", self.stored)
        } else {
            self.stored.clone()
        }
    }

    fn getter_expr(&self, access: &str) -> String {
        match self.access {
            Access::Copy => access.to_string(),
            Access::Str => format!("{}.as_str()", access),
            Access::Slice => format!("{}.as_slice()", access),
            Access::Ref => format!("&{}", access),
        }
    }
}
