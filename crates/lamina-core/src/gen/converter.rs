//! Value-converter backend.
//!
//! Generates, per schema file, bidirectional conversion routines between the
//! overlay structs and `serde_json::Value` maps keyed by decimal field tag.
//!
//! The two directions are deliberately asymmetric. `write_to_value` operates
//! on an already-valid in-memory message and never fails. `read_from_value`
//! defends against arbitrary externally supplied input: it validates shape
//! and scalar kind, returns false on the first mismatch, and leaves fields
//! assigned before the failure in place (a read is not transactional).

use crate::emit::CodeWriter;
use crate::gen::{check_presence_width, prefixed, rust_ident, Generator};
use crate::resolve::{Backend, TypeDescriptor};
use crate::schema::{Field, FieldKind, Message, ScalarKind, SchemaFile, TypeRegistry};
use tracing::debug;

/// The value-converter generator
#[derive(Debug, Clone, Copy, Default)]
pub struct ConverterGenerator;

impl Generator for ConverterGenerator {
    fn backend(&self) -> Backend {
        Backend::Converter
    }

    fn file_name(&self, stem: &str, output_dir: &str) -> String {
        prefixed(output_dir, &format!("{}_converter.rs", stem))
    }

    fn write_file(&self, w: &mut CodeWriter, file: &SchemaFile, registry: &TypeRegistry) {
        if let Err(err) = file.check_supported() {
            w.add_error(err.to_string());
            return;
        }
        debug!("generating converter for {}", file.name);

        w.write_generated_header(&file.name);
        w.output("#![allow(dead_code)]", &[]);
        w.output("", &[]);
        w.output("use serde_json::{{Map, Value}};", &[]);
        w.output("", &[]);
        // The overlay module generated from the same schema file is expected
        // as a sibling module.
        w.output(
            "use super::{module} as pb;",
            &[("module", &file.stem().replace('-', "_"))],
        );
        w.output("", &[]);

        for message in &file.messages {
            self.write_message(w, message, registry);
        }
        // Nothing to generate for enums: their values travel as plain
        // integers through the overlay accessors.
    }
}

impl ConverterGenerator {
    fn write_message(&self, w: &mut CodeWriter, message: &Message, registry: &TypeRegistry) {
        // The generated routines call overlay accessors; a message the
        // overlay backend refuses gets no converter either.
        if check_presence_width(w, message) {
            let registered = registry.resolve(&message.full_name);
            let converter = registered.converter_type();
            let target = format!("pb::{}", registered.overlay_type());
            let subs: &[(&str, &str)] = &[("converter", &converter), ("target", &target)];

            w.output(
                "/// Converts between [`{target}`] and tag-keyed value maps",
                subs,
            );
            w.output("pub struct {converter};", subs);
            w.output("", &[]);
            w.output("impl {converter} {{", subs);
            w.indented(|w| {
                self.write_read(w, message, &target, registry);
                w.output("", &[]);
                self.write_write(w, message, &target, registry);
            });
            w.output("}}", subs);
            w.output("", &[]);
        }

        for nested in &message.messages {
            self.write_message(w, nested, registry);
        }
    }

    fn write_read(&self, w: &mut CodeWriter, message: &Message, target: &str, registry: &TypeRegistry) {
        w.output("/// Reads `src` into `message`.", &[]);
        w.output("///", &[]);
        w.output(
            "/// Absent tags are not errors; the field is left unset. Returns false\n\
             /// on the first shape or kind mismatch, in which case fields assigned\n\
             /// before the failure remain assigned.",
            &[],
        );
        w.output(
            "pub fn read_from_value(src: &Value, message: &mut {target}) -> bool {{",
            &[("target", target)],
        );
        w.indented(|w| {
            w.output("if !src.is_object() {{", &[]);
            w.indented(|w| w.output("return false;", &[]));
            w.output("}}", &[]);
            for field in &message.fields {
                if self.field_unsupported(w, message, field, registry) {
                    continue;
                }
                self.write_field_read(w, field, registry);
            }
            w.output("true", &[]);
        });
        w.output("}}", &[]);
    }

    fn write_field_read(&self, w: &mut CodeWriter, field: &Field, registry: &TypeRegistry) {
        let descriptor = TypeDescriptor::resolve(registry, &field.kind, Backend::Converter);
        let tag = field.tag.to_string();
        // Prefixed accessor names use the raw schema name; keyword escaping
        // only applies where the name stands alone.
        let subs: &[(&str, &str)] = &[
            ("tag", &tag),
            ("raw", &field.name),
            ("inner", &descriptor.generated),
        ];

        w.output("if let Some(value) = src.get(\"{tag}\") {{", subs);
        w.indented(|w| {
            if field.is_repeated() {
                w.output("let Some(list) = value.as_array() else {{", subs);
                w.indented(|w| w.output("return false;", &[]));
                w.output("}};", subs);
                w.output("for element in list {{", subs);
                w.indented(|w| {
                    if descriptor.composite {
                        w.output(
                            "if !{inner}::read_from_value(element, message.add_{raw}()) {{",
                            subs,
                        );
                        w.indented(|w| w.output("return false;", &[]));
                        w.output("}}", subs);
                    } else {
                        let predicate = descriptor
                            .predicate_for("element")
                            .unwrap_or_default();
                        w.output(
                            "let Some(v) = {predicate} else {{",
                            &[("predicate", &predicate)],
                        );
                        w.indented(|w| w.output("return false;", &[]));
                        w.output("}};", subs);
                        w.output("message.add_{raw}(v);", subs);
                    }
                });
                w.output("}}", subs);
            } else if descriptor.composite {
                w.output(
                    "if !{inner}::read_from_value(value, message.{raw}_mut()) {{",
                    subs,
                );
                w.indented(|w| w.output("return false;", &[]));
                w.output("}}", subs);
            } else {
                let predicate = descriptor.predicate_for("value").unwrap_or_default();
                w.output(
                    "let Some(v) = {predicate} else {{",
                    &[("predicate", &predicate)],
                );
                w.indented(|w| w.output("return false;", &[]));
                w.output("}};", subs);
                w.output("message.set_{raw}(v);", subs);
            }
        });
        w.output("}}", subs);
    }

    fn write_write(
        &self,
        w: &mut CodeWriter,
        message: &Message,
        target: &str,
        registry: &TypeRegistry,
    ) {
        w.output("/// Converts `message` into a tag-keyed value map. Never fails.", &[]);
        w.output(
            "pub fn write_to_value(message: &{target}) -> Value {{",
            &[("target", target)],
        );
        w.indented(|w| {
            w.output("let mut dict = Map::new();", &[]);
            for field in &message.fields {
                if self.field_unrepresentable(field, registry) {
                    // Error already recorded on the read pass.
                    continue;
                }
                self.write_field_write(w, field, registry);
            }
            w.output("Value::Object(dict)", &[]);
        });
        w.output("}}", &[]);
    }

    fn write_field_write(&self, w: &mut CodeWriter, field: &Field, registry: &TypeRegistry) {
        let descriptor = TypeDescriptor::resolve(registry, &field.kind, Backend::Converter);
        let tag = field.tag.to_string();
        let name = rust_ident(&field.name);
        let subs: &[(&str, &str)] = &[
            ("tag", &tag),
            ("name", &name),
            ("raw", &field.name),
            ("inner", &descriptor.generated),
        ];

        if field.is_repeated() {
            // Repeated fields are always present in the output, even empty.
            w.output("{{", &[]);
            w.indented(|w| {
                w.output(
                    "let mut list = Vec::with_capacity(message.{raw}_count());",
                    subs,
                );
                w.output("for element in message.{raw}_list() {{", subs);
                w.indented(|w| {
                    if descriptor.composite {
                        w.output("list.push({inner}::write_to_value(element));", subs);
                    } else {
                        let wrapped = descriptor
                            .wrap_for(&element_expr(field))
                            .unwrap_or_default();
                        w.output("list.push({wrapped});", &[("wrapped", &wrapped)]);
                    }
                });
                w.output("}}", subs);
                w.output(
                    "dict.insert(\"{tag}\".to_string(), Value::Array(list));",
                    subs,
                );
            });
            w.output("}}", &[]);
        } else {
            w.output("if message.has_{raw}() {{", subs);
            w.indented(|w| {
                if descriptor.composite {
                    w.output(
                        "dict.insert(\"{tag}\".to_string(), {inner}::write_to_value(message.{name}()));",
                        subs,
                    );
                } else {
                    let wrapped = descriptor
                        .wrap_for(&format!("message.{}()", name))
                        .unwrap_or_default();
                    w.output(
                        "dict.insert(\"{tag}\".to_string(), {wrapped});",
                        &[("tag", &tag), ("wrapped", &wrapped)],
                    );
                }
            });
            w.output("}}", subs);
        }
    }

    /// Records an error for fields the value model cannot express.
    ///
    /// Returns true if the field must be skipped; emission of the remaining
    /// fields continues.
    fn field_unsupported(
        &self,
        w: &mut CodeWriter,
        message: &Message,
        field: &Field,
        registry: &TypeRegistry,
    ) -> bool {
        if self.field_unrepresentable(field, registry) {
            w.add_error(format!(
                "field '{}' in message '{}': bytes fields are not representable in the value model",
                field.name, message.full_name
            ));
            true
        } else {
            false
        }
    }

    fn field_unrepresentable(&self, field: &Field, registry: &TypeRegistry) -> bool {
        let descriptor = TypeDescriptor::resolve(registry, &field.kind, Backend::Converter);
        !descriptor.composite && descriptor.predicate.is_none()
    }
}

/// Native expression for one element while iterating a repeated slot
fn element_expr(field: &Field) -> String {
    match &field.kind {
        FieldKind::Scalar(ScalarKind::String) => "element.as_str()".to_string(),
        _ => "*element".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::fixtures::{document_file, field, importing_file, person_file};
    use prost_types::field_descriptor_proto::{Label, Type};

    fn generate(proto: &prost_types::FileDescriptorProto) -> (String, Vec<String>) {
        let file = SchemaFile::from_proto(proto).unwrap();
        let mut registry = TypeRegistry::new();
        registry.register_file(&file);
        let mut w = CodeWriter::new();
        ConverterGenerator.write_file(&mut w, &file, &registry);
        w.finish()
    }

    #[test]
    fn test_file_name() {
        assert_eq!(
            ConverterGenerator.file_name("person", ""),
            "person_converter.rs"
        );
        assert_eq!(
            ConverterGenerator.file_name("person", "gen"),
            "gen/person_converter.rs"
        );
    }

    #[test]
    fn test_person_converter_read() {
        let (text, errors) = generate(&person_file());
        assert!(errors.is_empty(), "unexpected errors: {:?}", errors);

        assert!(text.contains("pub struct PersonConverter;"));
        assert!(text.contains(
            "pub fn read_from_value(src: &Value, message: &mut pb::Person) -> bool {"
        ));

        // Non-map input fails immediately.
        assert!(text.contains("if !src.is_object() {"));

        // Absent tags are skipped, present ones validated.
        assert!(text.contains("if let Some(value) = src.get(\"1\") {"));
        assert!(text.contains("let Some(v) = value.as_str().map(String::from) else {"));
        assert!(text.contains("message.set_name(v);"));

        // Repeated message field: list shape check, recursive per-element read.
        assert!(text.contains("if let Some(value) = src.get(\"2\") {"));
        assert!(text.contains("let Some(list) = value.as_array() else {"));
        assert!(text.contains(
            "if !PersonConverter::read_from_value(element, message.add_friends()) {"
        ));
    }

    #[test]
    fn test_person_converter_write() {
        let (text, _) = generate(&person_file());

        assert!(text.contains("pub fn write_to_value(message: &pb::Person) -> Value {"));
        // Singular fields are gated on presence.
        assert!(text.contains("if message.has_name() {"));
        assert!(text.contains("dict.insert(\"1\".to_string(), Value::from(message.name()));"));
        // Repeated fields are always emitted, even when empty.
        assert!(text.contains("let mut list = Vec::with_capacity(message.friends_count());"));
        assert!(text.contains("list.push(PersonConverter::write_to_value(element));"));
        assert!(text.contains("dict.insert(\"2\".to_string(), Value::Array(list));"));
        assert!(text.contains("Value::Object(dict)"));
    }

    #[test]
    fn test_overlay_module_import() {
        let (text, _) = generate(&person_file());
        assert!(text.contains("use super::person as pb;"));
        assert!(text.contains("use serde_json::{Map, Value};"));
    }

    #[test]
    fn test_nested_converters_flatten() {
        let (text, errors) = generate(&document_file());
        assert!(errors.is_empty(), "unexpected errors: {:?}", errors);

        let outer = text.find("pub struct DocumentConverter;").unwrap();
        let nested = text.find("pub struct DocumentEntryConverter;").unwrap();
        assert!(outer < nested);

        // Singular message recursion goes through the mutable accessor;
        // enum fields travel as range-checked integers.
        assert!(text.contains(
            "if !DocumentEntryConverter::read_from_value(element, message.add_entries()) {"
        ));
        assert!(text
            .contains("let Some(v) = value.as_i64().and_then(|v| i32::try_from(v).ok()) else {"));
    }

    #[test]
    fn test_scalar_repeated_elements() {
        let (text, _) = generate(&document_file());
        assert!(text.contains("let Some(v) = element.as_f64() else {"));
        assert!(text.contains("message.add_scores(v);"));
        assert!(text.contains("list.push(Value::from(*element));"));
    }

    #[test]
    fn test_bytes_field_records_error() {
        let mut proto = person_file();
        proto.message_type[0]
            .field
            .push(field("blob", 3, Label::Optional, Type::Bytes, None));
        let (text, errors) = generate(&proto);

        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("blob"));
        assert!(errors[0].contains("not representable"));
        // The remaining fields still generate.
        assert!(text.contains("message.set_name(v);"));
        assert!(!text.contains("blob"));
    }

    #[test]
    fn test_unsupported_file_yields_no_body() {
        let (text, errors) = generate(&importing_file());
        assert!(text.is_empty());
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_keyword_field_name_escaping() {
        use prost_types::{DescriptorProto, FileDescriptorProto};

        let proto = FileDescriptorProto {
            name: Some("node.proto".to_string()),
            message_type: vec![DescriptorProto {
                name: Some("Node".to_string()),
                field: vec![field("type", 1, Label::Optional, Type::String, None)],
                ..Default::default()
            }],
            ..Default::default()
        };
        let (text, errors) = generate(&proto);
        assert!(errors.is_empty(), "unexpected errors: {:?}", errors);

        // Prefixed accessor calls use the raw name; only the bare getter
        // call needs the raw-ident escape.
        assert!(text.contains("message.set_type(v);"));
        assert!(text.contains("if message.has_type() {"));
        assert!(text.contains("Value::from(message.r#type())"));
        assert!(!text.contains("_r#"));
        assert!(!text.contains("has_r#"));
    }

    #[test]
    fn test_too_many_presence_fields_records_error() {
        use prost_types::{DescriptorProto, FileDescriptorProto};

        let fields = (0..65)
            .map(|i| field(&format!("f{}", i), i + 1, Label::Optional, Type::Int32, None))
            .collect();
        let proto = FileDescriptorProto {
            name: Some("wide.proto".to_string()),
            message_type: vec![DescriptorProto {
                name: Some("Wide".to_string()),
                field: fields,
                ..Default::default()
            }],
            ..Default::default()
        };

        let (text, errors) = generate(&proto);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("65 presence-tracked fields"));
        assert!(!text.contains("WideConverter"));
    }

    /// The emitted predicates lean on these value-model behaviors.
    #[test]
    fn test_value_model_assumptions() {
        use serde_json::{json, Value};

        assert_eq!(json!(7).as_i64(), Some(7));
        assert!(json!(1.5).as_i64().is_none());
        assert!(i32::try_from(json!(i64::from(i32::MAX) + 1).as_i64().unwrap()).is_err());
        assert_eq!(Value::from(f64::from(1.5f32)).as_f64(), Some(1.5));
        assert_eq!(json!("x").as_str().map(String::from), Some("x".to_string()));
        assert!(!Value::Null.is_object());
    }

    #[test]
    fn test_singular_message_field_recurses_via_mut() {
        use prost_types::{DescriptorProto, FileDescriptorProto};
        let proto = FileDescriptorProto {
            name: Some("wrap.proto".to_string()),
            message_type: vec![
                DescriptorProto {
                    name: Some("Wrapper".to_string()),
                    field: vec![field(
                        "inner",
                        1,
                        Label::Optional,
                        Type::Message,
                        Some(".Person"),
                    )],
                    ..Default::default()
                },
                DescriptorProto {
                    name: Some("Person".to_string()),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        let (text, errors) = generate(&proto);
        assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
        assert!(text.contains(
            "if !PersonConverter::read_from_value(value, message.inner_mut()) {"
        ));
        assert!(text.contains(
            "dict.insert(\"1\".to_string(), PersonConverter::write_to_value(message.inner()));"
        ));
    }
}
