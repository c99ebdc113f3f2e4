//! Render a [`Schema`] as a JSON Schema document for structured outputs.
//!
//! The output satisfies OpenAI strict mode:
//! 1. `additionalProperties: false` on every object
//! 2. every property listed in `required`, optional ones typed as nullable
//! 3. no `$ref`, nested objects are inlined

use serde_json::{json, Map, Value};

use super::{FieldSpec, FieldType, ObjectSpec, Schema};

/// Render the schema as a JSON Schema object.
pub fn to_json_schema(schema: &Schema) -> Value {
    object_schema(&schema.root)
}

fn object_schema(spec: &ObjectSpec) -> Value {
    let mut properties = Map::new();
    for field in &spec.fields {
        properties.insert(field.name.to_string(), field_schema(field));
    }

    let required: Vec<Value> = spec
        .fields
        .iter()
        .map(|f| Value::String(f.name.to_string()))
        .collect();

    json!({
        "type": "object",
        "description": spec.description,
        "properties": properties,
        "required": required,
        "additionalProperties": false,
    })
}

fn field_schema(field: &FieldSpec) -> Value {
    let (type_name, mut schema) = match &field.ty {
        FieldType::Text => ("string", json!({})),
        FieldType::Number => ("number", json!({})),
        FieldType::Date => ("string", json!({})),
        FieldType::List(item) => ("array", json!({ "items": object_schema(item) })),
    };

    let type_value = if field.required {
        json!(type_name)
    } else {
        json!([type_name, "null"])
    };

    if let Value::Object(map) = &mut schema {
        map.insert("type".to_string(), type_value);
        map.insert(
            "description".to_string(),
            Value::String(field.description.to_string()),
        );
    }

    schema
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::INVOICE_SCHEMA;

    #[test]
    fn test_root_is_strict_object() {
        let schema = to_json_schema(&INVOICE_SCHEMA);
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["additionalProperties"], false);

        let required = schema["required"].as_array().unwrap();
        let properties = schema["properties"].as_object().unwrap();
        assert_eq!(required.len(), properties.len());
        assert!(required.iter().any(|v| v == "vendor_email"));
    }

    #[test]
    fn test_optional_fields_are_nullable() {
        let schema = to_json_schema(&INVOICE_SCHEMA);
        assert_eq!(schema["properties"]["vendor"]["type"], "string");
        assert_eq!(schema["properties"]["vendor_email"]["type"], json!(["string", "null"]));
        assert_eq!(schema["properties"]["due_date"]["type"], json!(["string", "null"]));
        assert_eq!(schema["properties"]["total_due"]["type"], "number");
    }

    #[test]
    fn test_items_are_inlined() {
        let schema = to_json_schema(&INVOICE_SCHEMA);
        let items = &schema["properties"]["items"];
        assert_eq!(items["type"], "array");
        assert_eq!(items["items"]["type"], "object");
        assert_eq!(items["items"]["additionalProperties"], false);
        assert_eq!(
            items["items"]["properties"]["discount"]["type"],
            json!(["number", "null"])
        );

        let rendered = serde_json::to_string(&schema).unwrap();
        assert!(!rendered.contains("$ref"));
    }

    #[test]
    fn test_descriptions_are_carried() {
        let schema = to_json_schema(&INVOICE_SCHEMA);
        assert_eq!(
            schema["properties"]["invoice_date"]["description"],
            "Invoice date in YYYY-MM-DD format."
        );
        assert_eq!(
            schema["properties"]["items"]["items"]["properties"]["tax_rate"]["description"],
            "Tax amount for the line item."
        );
    }
}
