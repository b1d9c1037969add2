use serde_json::{Map, Value};

use super::person as pb;

/// Converts between [`pb::Person`] and tag-keyed value maps
pub struct PersonConverter;

impl PersonConverter {
    /// Reads `src` into `message`.
    ///
    /// Absent tags are not errors; the field is left unset. Returns false
    /// on the first shape or kind mismatch, in which case fields assigned
    /// before the failure remain assigned.
    pub fn read_from_value(src: &Value, message: &mut pb::Person) -> bool {
        if !src.is_object() {
            return false;
        }
        if let Some(value) = src.get("1") {
            let Some(v) = value.as_str().map(String::from) else {
                return false;
            };
            message.set_name(v);
        }
        if let Some(value) = src.get("2") {
            let Some(list) = value.as_array() else {
                return false;
            };
            for element in list {
                if !PersonConverter::read_from_value(element, message.add_friends()) {
                    return false;
                }
            }
        }
        true
    }

    /// Converts `message` into a tag-keyed value map. Never fails.
    pub fn write_to_value(message: &pb::Person) -> Value {
        let mut dict = Map::new();
        if message.has_name() {
            dict.insert("1".to_string(), Value::from(message.name()));
        }
        {
            let mut list = Vec::with_capacity(message.friends_count());
            for element in message.friends_list() {
                list.push(PersonConverter::write_to_value(element));
            }
            dict.insert("2".to_string(), Value::Array(list));
        }
        Value::Object(dict)
    }
}

