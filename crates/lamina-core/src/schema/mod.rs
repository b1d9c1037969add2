//! Owned schema model.
//!
//! This module wraps a raw descriptor set into navigable typed objects
//! ([`SchemaFile`], [`Message`], [`Field`], [`Enum`]). The model is built
//! once per generation run from the incoming request, is immutable
//! thereafter, and is discarded when the run completes.
//!
//! Model construction enforces the two structural invariants emission relies
//! on: field tags are unique within a message, and value names are unique
//! within an enum. Everything else (default values, reserved ranges, options)
//! is outside the model's concern.

mod registry;

use crate::error::{Error, Result};
use prost_types::{
    field_descriptor_proto::{Label, Type},
    DescriptorProto, EnumDescriptorProto, FieldDescriptorProto, FileDescriptorProto,
};
use std::collections::HashSet;

pub use registry::{RegisteredKind, RegisteredType, TypeRegistry};

/// Field multiplicity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    /// At most one value; presence is tracked explicitly
    Singular,
    /// An ordered sequence of values
    Repeated,
}

/// The primitive value kinds a scalar field can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum ScalarKind {
    Double,
    Float,
    Int32,
    Int64,
    Uint32,
    Uint64,
    Bool,
    String,
    Bytes,
}

/// What a field's value is: a scalar, or a reference to a named type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// A primitive value
    Scalar(ScalarKind),
    /// Reference to an enum by full proto name (`.pkg.Outer.Mode`)
    Enum(String),
    /// Reference to a message by full proto name (`.pkg.Outer.Inner`)
    Message(String),
}

/// One field of a message
#[derive(Debug, Clone)]
pub struct Field {
    /// Declared field name (snake_case, as written in the schema)
    pub name: String,
    /// Stable positive integer tag used at the serialization boundary
    pub tag: i32,
    /// Singular or repeated
    pub cardinality: Cardinality,
    /// Value kind
    pub kind: FieldKind,
}

impl Field {
    /// Returns true for repeated fields
    pub fn is_repeated(&self) -> bool {
        self.cardinality == Cardinality::Repeated
    }

    /// Returns true if the field references a message type
    pub fn is_message(&self) -> bool {
        matches!(self.kind, FieldKind::Message(_))
    }
}

/// A named enum type: an ordered sequence of (name, value) pairs
#[derive(Debug, Clone)]
pub struct Enum {
    /// Declared name
    pub name: String,
    /// Full dotted proto name, e.g. `.pkg.Outer.Mode`
    pub full_name: String,
    /// Ordered values, names unique within the enum
    pub values: Vec<(String, i32)>,
}

/// A named composite type owning fields and nested types
#[derive(Debug, Clone)]
pub struct Message {
    /// Declared name
    pub name: String,
    /// Full dotted proto name, e.g. `.pkg.Outer.Inner`
    pub full_name: String,
    /// Ordered fields, tags unique within the message
    pub fields: Vec<Field>,
    /// Nested messages, in declaration order
    pub messages: Vec<Message>,
    /// Nested enums, in declaration order
    pub enums: Vec<Enum>,
}

/// One schema compilation unit
#[derive(Debug, Clone)]
pub struct SchemaFile {
    /// File name as given in the request, e.g. `dom/person.proto`
    pub name: String,
    /// Declared package, possibly empty
    pub package: String,
    /// Imported file names; non-empty means the file is unsupported
    pub imports: Vec<String>,
    /// Top-level messages, in declaration order
    pub messages: Vec<Message>,
    /// Top-level enums, in declaration order
    pub enums: Vec<Enum>,
}

impl SchemaFile {
    /// Builds the owned model from a raw file descriptor.
    ///
    /// Fails on duplicate field tags, duplicate enum value names, and field
    /// types the generators cannot express (groups). All failures are
    /// file-local.
    pub fn from_proto(proto: &FileDescriptorProto) -> Result<Self> {
        let package = proto.package().to_string();
        let prefix = if package.is_empty() {
            String::new()
        } else {
            format!(".{}", package)
        };

        let messages = proto
            .message_type
            .iter()
            .map(|m| Message::from_proto(m, &prefix))
            .collect::<Result<Vec<_>>>()?;
        let enums = proto
            .enum_type
            .iter()
            .map(|e| Enum::from_proto(e, &prefix))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            name: proto.name().to_string(),
            package,
            imports: proto.dependency.clone(),
            messages,
            enums,
        })
    }

    /// Returns an error iff the file declares imports.
    ///
    /// Cross-file dependencies are not supported; this check must run before
    /// any code is emitted for the file.
    pub fn check_supported(&self) -> Result<()> {
        if self.imports.is_empty() {
            Ok(())
        } else {
            Err(Error::unsupported_file(&self.name, &self.imports))
        }
    }

    /// File name without directories or the `.proto` extension
    pub fn stem(&self) -> &str {
        file_stem(&self.name)
    }
}

/// Strips directories and the `.proto` extension from a schema file name
pub fn file_stem(name: &str) -> &str {
    let base = name.rsplit('/').next().unwrap_or(name);
    base.strip_suffix(".proto").unwrap_or(base)
}

impl Message {
    fn from_proto(proto: &DescriptorProto, prefix: &str) -> Result<Self> {
        let full_name = format!("{}.{}", prefix, proto.name());

        let mut seen_tags = HashSet::new();
        let fields = proto
            .field
            .iter()
            .map(|f| {
                let field = Field::from_proto(f, &full_name)?;
                if !seen_tags.insert(field.tag) {
                    return Err(Error::duplicate_tag(&full_name, field.tag));
                }
                Ok(field)
            })
            .collect::<Result<Vec<_>>>()?;

        let messages = proto
            .nested_type
            .iter()
            .map(|m| Message::from_proto(m, &full_name))
            .collect::<Result<Vec<_>>>()?;
        let enums = proto
            .enum_type
            .iter()
            .map(|e| Enum::from_proto(e, &full_name))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            name: proto.name().to_string(),
            full_name,
            fields,
            messages,
            enums,
        })
    }

    /// Number of singular non-message fields; each occupies one presence-bit
    /// slot in the generated overlay struct, in declaration order.
    /// Message-typed fields track presence on their own slot.
    pub fn presence_bit_count(&self) -> usize {
        self.fields
            .iter()
            .filter(|f| !f.is_repeated() && !f.is_message())
            .count()
    }
}

impl Enum {
    fn from_proto(proto: &EnumDescriptorProto, prefix: &str) -> Result<Self> {
        let full_name = format!("{}.{}", prefix, proto.name());

        let mut seen = HashSet::new();
        let values = proto
            .value
            .iter()
            .map(|v| {
                if !seen.insert(v.name().to_string()) {
                    return Err(Error::duplicate_enum_value(&full_name, v.name()));
                }
                Ok((v.name().to_string(), v.number()))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            name: proto.name().to_string(),
            full_name,
            values,
        })
    }
}

impl Field {
    fn from_proto(proto: &FieldDescriptorProto, message_name: &str) -> Result<Self> {
        let cardinality = if proto.label() == Label::Repeated {
            Cardinality::Repeated
        } else {
            Cardinality::Singular
        };

        let kind = match proto.r#type() {
            Type::Double => FieldKind::Scalar(ScalarKind::Double),
            Type::Float => FieldKind::Scalar(ScalarKind::Float),
            Type::Int32 | Type::Sint32 | Type::Sfixed32 => FieldKind::Scalar(ScalarKind::Int32),
            Type::Int64 | Type::Sint64 | Type::Sfixed64 => FieldKind::Scalar(ScalarKind::Int64),
            Type::Uint32 | Type::Fixed32 => FieldKind::Scalar(ScalarKind::Uint32),
            Type::Uint64 | Type::Fixed64 => FieldKind::Scalar(ScalarKind::Uint64),
            Type::Bool => FieldKind::Scalar(ScalarKind::Bool),
            Type::String => FieldKind::Scalar(ScalarKind::String),
            Type::Bytes => FieldKind::Scalar(ScalarKind::Bytes),
            Type::Enum => FieldKind::Enum(proto.type_name().to_string()),
            Type::Message => FieldKind::Message(proto.type_name().to_string()),
            Type::Group => {
                return Err(Error::unsupported_field_type(message_name, proto.name()));
            }
        };

        Ok(Self {
            name: proto.name().to_string(),
            tag: proto.number(),
            cardinality,
            kind,
        })
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Hand-built descriptor fixtures shared by module tests.

    use prost_types::{
        field_descriptor_proto::{Label, Type},
        DescriptorProto, EnumDescriptorProto, EnumValueDescriptorProto, FieldDescriptorProto,
        FileDescriptorProto,
    };

    pub(crate) fn field(
        name: &str,
        number: i32,
        label: Label,
        r#type: Type,
        type_name: Option<&str>,
    ) -> FieldDescriptorProto {
        FieldDescriptorProto {
            name: Some(name.to_string()),
            number: Some(number),
            label: Some(label as i32),
            r#type: Some(r#type as i32),
            type_name: type_name.map(str::to_string),
            ..Default::default()
        }
    }

    /// `message Person { optional string name = 1; repeated Person friends = 2; }`
    pub(crate) fn person_file() -> FileDescriptorProto {
        FileDescriptorProto {
            name: Some("person.proto".to_string()),
            message_type: vec![DescriptorProto {
                name: Some("Person".to_string()),
                field: vec![
                    field("name", 1, Label::Optional, Type::String, None),
                    field("friends", 2, Label::Repeated, Type::Message, Some(".Person")),
                ],
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    /// A file with a nested message, a nested enum, and mixed scalar fields
    pub(crate) fn document_file() -> FileDescriptorProto {
        FileDescriptorProto {
            name: Some("dom/document.proto".to_string()),
            package: Some("dom".to_string()),
            message_type: vec![DescriptorProto {
                name: Some("Document".to_string()),
                field: vec![
                    field("title", 1, Label::Optional, Type::String, None),
                    field("word_count", 2, Label::Optional, Type::Int32, None),
                    field(
                        "direction",
                        3,
                        Label::Optional,
                        Type::Enum,
                        Some(".dom.Document.Direction"),
                    ),
                    field(
                        "entries",
                        4,
                        Label::Repeated,
                        Type::Message,
                        Some(".dom.Document.Entry"),
                    ),
                    field("scores", 5, Label::Repeated, Type::Double, None),
                ],
                nested_type: vec![DescriptorProto {
                    name: Some("Entry".to_string()),
                    field: vec![field("url", 1, Label::Optional, Type::String, None)],
                    ..Default::default()
                }],
                enum_type: vec![EnumDescriptorProto {
                    name: Some("Direction".to_string()),
                    value: vec![
                        EnumValueDescriptorProto {
                            name: Some("LEFT_TO_RIGHT".to_string()),
                            number: Some(0),
                            ..Default::default()
                        },
                        EnumValueDescriptorProto {
                            name: Some("RIGHT_TO_LEFT".to_string()),
                            number: Some(1),
                            ..Default::default()
                        },
                    ],
                    ..Default::default()
                }],
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    /// A file that imports another file and is therefore unsupported
    pub(crate) fn importing_file() -> FileDescriptorProto {
        FileDescriptorProto {
            name: Some("importer.proto".to_string()),
            dependency: vec!["person.proto".to_string()],
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use pretty_assertions::assert_eq;
    use prost_types::field_descriptor_proto::{Label, Type};
    use prost_types::DescriptorProto;

    #[test]
    fn test_person_model() {
        let file = SchemaFile::from_proto(&person_file()).unwrap();
        assert_eq!(file.name, "person.proto");
        assert_eq!(file.stem(), "person");
        assert!(file.check_supported().is_ok());

        let person = &file.messages[0];
        assert_eq!(person.full_name, ".Person");
        assert_eq!(person.fields.len(), 2);
        assert_eq!(person.presence_bit_count(), 1);

        let name = &person.fields[0];
        assert_eq!(name.tag, 1);
        assert_eq!(name.cardinality, Cardinality::Singular);
        assert_eq!(name.kind, FieldKind::Scalar(ScalarKind::String));

        let friends = &person.fields[1];
        assert!(friends.is_repeated());
        assert_eq!(friends.kind, FieldKind::Message(".Person".to_string()));
    }

    #[test]
    fn test_nested_full_names() {
        let file = SchemaFile::from_proto(&document_file()).unwrap();
        let doc = &file.messages[0];
        assert_eq!(doc.full_name, ".dom.Document");
        assert_eq!(doc.messages[0].full_name, ".dom.Document.Entry");
        assert_eq!(doc.enums[0].full_name, ".dom.Document.Direction");
        assert_eq!(doc.enums[0].values[1], ("RIGHT_TO_LEFT".to_string(), 1));
    }

    #[test]
    fn test_check_supported_rejects_imports() {
        let file = SchemaFile::from_proto(&importing_file()).unwrap();
        let err = file.check_supported().unwrap_err();
        assert!(err.is_file_local());
        assert!(err.to_string().contains("importer.proto"));
    }

    #[test]
    fn test_duplicate_tag_rejected() {
        let mut proto = person_file();
        proto.message_type[0].field[1].number = Some(1);
        let err = SchemaFile::from_proto(&proto).unwrap_err();
        assert!(matches!(err, Error::DuplicateTag { tag: 1, .. }));
    }

    #[test]
    fn test_duplicate_enum_value_rejected() {
        let mut proto = document_file();
        proto.message_type[0].enum_type[0].value[1].name = Some("LEFT_TO_RIGHT".to_string());
        let err = SchemaFile::from_proto(&proto).unwrap_err();
        assert!(matches!(err, Error::DuplicateEnumValue { .. }));
    }

    #[test]
    fn test_group_field_rejected() {
        let mut proto = person_file();
        proto.message_type[0].field.push(field(
            "legacy",
            3,
            Label::Optional,
            Type::Group,
            Some(".Person.Legacy"),
        ));
        proto.message_type[0].nested_type.push(DescriptorProto {
            name: Some("Legacy".to_string()),
            ..Default::default()
        });
        let err = SchemaFile::from_proto(&proto).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFieldType { .. }));
    }

    #[test]
    fn test_scalar_kind_collapse() {
        let cases = [
            (Type::Sint32, ScalarKind::Int32),
            (Type::Sfixed32, ScalarKind::Int32),
            (Type::Fixed32, ScalarKind::Uint32),
            (Type::Sint64, ScalarKind::Int64),
            (Type::Fixed64, ScalarKind::Uint64),
        ];
        for (ty, expected) in cases {
            let f = Field::from_proto(&field("x", 1, Label::Optional, ty, None), ".M").unwrap();
            assert_eq!(f.kind, FieldKind::Scalar(expected));
        }
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem("person.proto"), "person");
        assert_eq!(file_stem("a/b/dom_distiller.proto"), "dom_distiller");
        assert_eq!(file_stem("noext"), "noext");
    }
}
