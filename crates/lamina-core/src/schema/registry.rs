//! Per-run type registry.
//!
//! The registry maps every full proto type name reachable from the current
//! run's files to the names the backends will generate for it. It is an
//! explicit context object: built at the start of a run, threaded through
//! every generation call, and discarded at run end, so no binding can go
//! stale across repeated invocations within one process.

use crate::gen::{snake, upper_camel};
use crate::schema::{Enum, Message, SchemaFile};
use std::collections::HashMap;
use tracing::trace;

/// Whether a registered type is a message or an enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisteredKind {
    /// A generated composite needing recursive emission
    Message,
    /// A terminal type lowered to integer constants
    Enum,
}

/// Registry entry: the generated names for one schema type
#[derive(Debug, Clone)]
pub struct RegisteredType {
    /// Message or enum
    pub kind: RegisteredKind,
    /// Flattened UpperCamel name (`Outer.Inner` becomes `OuterInner`)
    pub flat: String,
}

impl RegisteredType {
    /// Name of the generated overlay struct (messages only)
    pub fn overlay_type(&self) -> &str {
        &self.flat
    }

    /// Name of the generated converter struct (messages only)
    pub fn converter_type(&self) -> String {
        format!("{}Converter", self.flat)
    }

    /// Name of the generated constants module (enums only)
    pub fn enum_module(&self) -> String {
        snake(&self.flat)
    }
}

/// Maps full proto type names to their generated names for one run
#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: HashMap<String, RegisteredType>,
}

impl TypeRegistry {
    /// Creates an empty registry for a new run
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers every message and enum declared in `file`, including
    /// nested types at arbitrary depth
    pub fn register_file(&mut self, file: &SchemaFile) {
        for message in &file.messages {
            self.register_message(message, "");
        }
        for e in &file.enums {
            self.register_enum(e, "");
        }
    }

    fn register_message(&mut self, message: &Message, outer: &str) {
        let flat = format!("{}{}", outer, upper_camel(&message.name));
        trace!("registering message {} as {}", message.full_name, flat);
        self.types.insert(
            message.full_name.clone(),
            RegisteredType {
                kind: RegisteredKind::Message,
                flat: flat.clone(),
            },
        );
        for nested in &message.messages {
            self.register_message(nested, &flat);
        }
        for e in &message.enums {
            self.register_enum(e, &flat);
        }
    }

    fn register_enum(&mut self, e: &Enum, outer: &str) {
        let flat = format!("{}{}", outer, upper_camel(&e.name));
        trace!("registering enum {} as {}", e.full_name, flat);
        self.types.insert(
            e.full_name.clone(),
            RegisteredType {
                kind: RegisteredKind::Enum,
                flat,
            },
        );
    }

    /// Looks up a registered type by full proto name
    pub fn lookup(&self, full_name: &str) -> Option<&RegisteredType> {
        self.types.get(full_name)
    }

    /// Resolves a registered type by full proto name.
    ///
    /// # Panics
    ///
    /// Panics if the name was never registered. Schema references are
    /// internally consistent after a successful model build, so a miss here
    /// is a programmer error, not a recoverable condition.
    pub fn resolve(&self, full_name: &str) -> &RegisteredType {
        match self.types.get(full_name) {
            Some(ty) => ty,
            None => panic!("type '{}' referenced but never registered", full_name),
        }
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// True if nothing has been registered yet
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
