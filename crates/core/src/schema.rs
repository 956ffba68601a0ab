//! Output schema validation
//!
//! Every generator declares a closed structural contract for its result:
//! a fixed set of named fields with types drawn from a small alphabet.
//! Validation gates each generation result immediately after the model
//! call; a failure is terminal for the turn and never retried.

use serde_json::Value;
use thiserror::Error;

/// Why a generation result failed validation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaViolation {
    #[error("expected a JSON object at `{0}`")]
    NotAnObject(String),

    #[error("missing required field `{0}`")]
    MissingField(String),

    #[error("unknown field `{0}`")]
    UnknownField(String),

    #[error("field `{field}`: expected {expected}")]
    WrongType {
        field: String,
        expected: &'static str,
    },

    #[error("field `{field}`: value `{value}` is not in the allowed set")]
    InvalidEnumValue { field: String, value: String },
}

/// Field types a schema may declare
#[derive(Debug, Clone)]
pub enum FieldType {
    String,
    Boolean,
    Number,
    /// A string restricted to a literal set
    Enum(Vec<String>),
    /// Homogeneous array of the inner type
    Array(Box<FieldType>),
    /// Nested object with its own closed schema
    Object(Schema),
}

impl FieldType {
    fn expected_name(&self) -> &'static str {
        match self {
            FieldType::String => "a string",
            FieldType::Boolean => "a boolean",
            FieldType::Number => "a number",
            FieldType::Enum(_) => "a string from the allowed set",
            FieldType::Array(_) => "an array",
            FieldType::Object(_) => "an object",
        }
    }

    /// Wire-format rendering sent to the model as a response schema
    fn to_wire(&self) -> Value {
        match self {
            FieldType::String => serde_json::json!({ "type": "string" }),
            FieldType::Boolean => serde_json::json!({ "type": "boolean" }),
            FieldType::Number => serde_json::json!({ "type": "number" }),
            FieldType::Enum(values) => {
                serde_json::json!({ "type": "string", "enum": values })
            }
            FieldType::Array(inner) => {
                serde_json::json!({ "type": "array", "items": inner.to_wire() })
            }
            FieldType::Object(schema) => schema.to_wire(),
        }
    }
}

/// A declared field
#[derive(Debug, Clone)]
struct Field {
    name: String,
    ty: FieldType,
    required: bool,
}

/// Closed structural contract for a generation result.
///
/// Unknown fields, missing required fields, wrong types and enum values
/// outside the declared set all fail validation. Validation is idempotent:
/// a value that passed once passes again against the same schema.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    fields: Vec<Field>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a required field
    pub fn required(mut self, name: impl Into<String>, ty: FieldType) -> Self {
        self.fields.push(Field {
            name: name.into(),
            ty,
            required: true,
        });
        self
    }

    /// Declare an optional field
    pub fn optional(mut self, name: impl Into<String>, ty: FieldType) -> Self {
        self.fields.push(Field {
            name: name.into(),
            ty,
            required: false,
        });
        self
    }

    /// Validate a generation result against this schema
    pub fn validate(&self, value: &Value) -> Result<(), SchemaViolation> {
        self.validate_at(value, "")
    }

    /// Render the schema in the wire format the generation backend accepts
    pub fn to_wire(&self) -> Value {
        let mut properties = serde_json::Map::new();
        let mut required = Vec::new();
        for field in &self.fields {
            properties.insert(field.name.clone(), field.ty.to_wire());
            if field.required {
                required.push(Value::String(field.name.clone()));
            }
        }
        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    fn validate_at(&self, value: &Value, path: &str) -> Result<(), SchemaViolation> {
        let object = value
            .as_object()
            .ok_or_else(|| SchemaViolation::NotAnObject(display_path(path)))?;

        for field in &self.fields {
            let field_path = join_path(path, &field.name);
            match object.get(&field.name) {
                // Absent optional fields and explicit nulls on optional
                // fields are both acceptable.
                None | Some(Value::Null) if !field.required => {}
                None | Some(Value::Null) => {
                    return Err(SchemaViolation::MissingField(field_path));
                }
                Some(actual) => check_type(actual, &field.ty, &field_path)?,
            }
        }

        // Closed schema: anything undeclared fails.
        for key in object.keys() {
            if !self.fields.iter().any(|f| &f.name == key) {
                return Err(SchemaViolation::UnknownField(join_path(path, key)));
            }
        }

        Ok(())
    }
}

fn check_type(value: &Value, ty: &FieldType, path: &str) -> Result<(), SchemaViolation> {
    match ty {
        FieldType::String if value.is_string() => Ok(()),
        FieldType::Boolean if value.is_boolean() => Ok(()),
        FieldType::Number if value.is_number() => Ok(()),
        FieldType::Enum(allowed) => match value.as_str() {
            Some(s) if allowed.iter().any(|a| a == s) => Ok(()),
            Some(s) => Err(SchemaViolation::InvalidEnumValue {
                field: path.to_string(),
                value: s.to_string(),
            }),
            None => Err(SchemaViolation::WrongType {
                field: path.to_string(),
                expected: ty.expected_name(),
            }),
        },
        FieldType::Array(inner) => match value.as_array() {
            Some(items) => {
                for (i, item) in items.iter().enumerate() {
                    check_type(item, inner, &format!("{}[{}]", path, i))?;
                }
                Ok(())
            }
            None => Err(SchemaViolation::WrongType {
                field: path.to_string(),
                expected: ty.expected_name(),
            }),
        },
        FieldType::Object(schema) => schema.validate_at(value, path),
        _ => Err(SchemaViolation::WrongType {
            field: path.to_string(),
            expected: ty.expected_name(),
        }),
    }
}

fn join_path(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", path, name)
    }
}

fn display_path(path: &str) -> String {
    if path.is_empty() {
        "$".to_string()
    } else {
        path.to_string()
    }
}
