//! Dataset-template validation.
//!
//! A pure lint over raw template JSON: no mutation, no I/O. Structural
//! problems become ordered error strings naming the offending key or field;
//! forward-compatible oddities become warnings. The input is raw
//! `serde_json::Value` so missing and mistyped keys stay distinguishable.

use serde_json::Value;

use super::types::ValidationReport;

/// Top-level keys the schema defines
const KNOWN_KEYS: &[&str] = &["id", "name", "description", "fields", "annotation_schema"];

/// Allowed field types
const ALLOWED_TYPES: &[&str] = &["string", "number", "boolean", "categorical", "array"];

/// Keys every template must carry
const REQUIRED_KEYS: &[&str] = &["id", "name", "fields"];

/// Validates a template description against the schema.
pub fn validate_template(template: &Value) -> ValidationReport {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let Some(obj) = template.as_object() else {
        return ValidationReport {
            valid: false,
            errors: vec!["template must be a JSON object".to_string()],
            warnings,
            template_id: None,
        };
    };

    let template_id = obj.get("id").and_then(|v| v.as_str()).map(String::from);

    for key in REQUIRED_KEYS {
        if !obj.contains_key(*key) {
            errors.push(format!("missing required key '{}'", key));
        }
    }

    for key in obj.keys() {
        if !KNOWN_KEYS.contains(&key.as_str()) {
            warnings.push(format!("unknown top-level key '{}'", key));
        }
    }

    if let Some(fields) = obj.get("fields") {
        match fields.as_array() {
            Some(list) if list.is_empty() => {
                errors.push("'fields' must not be empty".to_string());
            }
            Some(list) => validate_fields(list, &mut errors, &mut warnings),
            None => errors.push("'fields' must be a list".to_string()),
        }
    }

    if !obj.contains_key("annotation_schema") {
        warnings.push(
            "missing 'annotation_schema': annotation-driven consumers will reject this template"
                .to_string(),
        );
    }

    ValidationReport {
        valid: errors.is_empty(),
        errors,
        warnings,
        template_id,
    }
}

fn validate_fields(fields: &[Value], errors: &mut Vec<String>, warnings: &mut Vec<String>) {
    let mut seen_names: Vec<String> = Vec::new();

    for (index, field) in fields.iter().enumerate() {
        let Some(obj) = field.as_object() else {
            errors.push(format!("field {} must be an object", index));
            continue;
        };

        let name = match obj.get("name").and_then(|v| v.as_str()) {
            Some(name) if !name.trim().is_empty() => {
                let folded = name.to_lowercase();
                if seen_names.contains(&folded) {
                    errors.push(format!("duplicate field name '{}'", name));
                } else {
                    seen_names.push(folded);
                }
                Some(name)
            }
            Some(_) => {
                errors.push(format!("field {} has an empty name", index));
                None
            }
            None => {
                errors.push(format!("field {} is missing 'name'", index));
                None
            }
        };
        let label = name.map(|n| format!("'{}'", n)).unwrap_or_else(|| index.to_string());

        match obj.get("type").and_then(|v| v.as_str()) {
            Some(field_type) if ALLOWED_TYPES.contains(&field_type) => {
                if field_type == "categorical" {
                    let options_ok = obj
                        .get("options")
                        .and_then(|v| v.as_array())
                        .is_some_and(|opts| !opts.is_empty());
                    if !options_ok {
                        errors.push(format!(
                            "categorical field {} requires a non-empty 'options' list",
                            label
                        ));
                    }
                }
            }
            Some(field_type) => errors.push(format!(
                "field {} has unknown type '{}' (allowed: {})",
                label,
                field_type,
                ALLOWED_TYPES.join(", ")
            )),
            None => errors.push(format!("field {} is missing 'type'", label)),
        }

        if let Some(options) = obj.get("options") {
            if !options.is_array() {
                warnings.push(format!("field {} has non-list 'options'", label));
            }
        }
    }
}
