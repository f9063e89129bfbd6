//! Schema validation of candidate documents against a mapper.
//!
//! Validation is a pure function of `(mapper, candidate)` with no storage
//! access. Relationship targets are only shape-checked here; their existence
//! is the relation resolver's job.

use bson::{Bson, Document};

use crate::{
    error::{ContainerError, ContainerResult},
    mapper::{is_reserved_field, FieldSpec, FieldType, Mapper},
};

/// Validates `candidate` against `mapper`, field by field.
///
/// Rules applied:
///
/// - every present field must match its declared type;
/// - `min_length` is enforced for string (characters) and array (elements) fields;
/// - every `required` field must be present and non-empty;
/// - when `additional_properties` is false, undeclared non-reserved keys fail;
/// - array items are checked against the item spec; relationship items must be
///   plain string identifiers.
///
/// # Errors
///
/// Returns [`ContainerError::Validation`] naming the first offending field.
pub fn validate(mapper: &Mapper, candidate: &Document) -> ContainerResult<()> {
    for (field, value) in candidate.iter() {
        if is_reserved_field(field) {
            continue;
        }

        match mapper.property(field) {
            Some(spec) => validate_field(field, spec, value)?,
            None if mapper.additional_properties => {}
            None => {
                return Err(ContainerError::Validation {
                    field: field.clone(),
                    reason: "field is not declared by the mapper".to_string(),
                });
            }
        }
    }

    for field in &mapper.required {
        match candidate.get(field) {
            Some(value) if !is_empty(value) => {}
            Some(_) => {
                return Err(ContainerError::Validation {
                    field: field.clone(),
                    reason: "required field is empty".to_string(),
                });
            }
            None => {
                return Err(ContainerError::Validation {
                    field: field.clone(),
                    reason: "required field is missing".to_string(),
                });
            }
        }
    }

    Ok(())
}

fn validate_field(field: &str, spec: &FieldSpec, value: &Bson) -> ContainerResult<()> {
    if !matches_type(spec.field_type, value) {
        return Err(ContainerError::Validation {
            field: field.to_string(),
            reason: format!("expected {}, got {}", spec.field_type.name(), type_name(value)),
        });
    }

    if let Some(min_length) = spec.min_length {
        // Length constraints only apply to strings and arrays.
        let length = match value {
            Bson::String(s) => Some(s.chars().count()),
            Bson::Array(items) => Some(items.len()),
            _ => None,
        };

        match length {
            Some(length) if length < min_length => {
                return Err(ContainerError::Validation {
                    field: field.to_string(),
                    reason: format!("length {} is below the minimum of {}", length, min_length),
                });
            }
            _ => {}
        }
    }

    if let (Some(items), Bson::Array(values)) = (&spec.items, value) {
        for (index, item) in values.iter().enumerate() {
            if items.mapper.is_some() {
                // Relationship items carry identifiers only. Whether the
                // identifier points at a live record is resolved later.
                if !matches!(item, Bson::String(_)) {
                    return Err(ContainerError::Validation {
                        field: field.to_string(),
                        reason: format!(
                            "item {} must be a record identifier, got {}",
                            index,
                            type_name(item)
                        ),
                    });
                }
            } else if !matches_type(items.item_type, item) {
                return Err(ContainerError::Validation {
                    field: field.to_string(),
                    reason: format!(
                        "item {} expected {}, got {}",
                        index,
                        items.item_type.name(),
                        type_name(item)
                    ),
                });
            }
        }
    }

    Ok(())
}

fn matches_type(expected: FieldType, value: &Bson) -> bool {
    match expected {
        FieldType::String => matches!(value, Bson::String(_)),
        FieldType::Number => {
            matches!(value, Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_))
        }
        FieldType::Boolean => matches!(value, Bson::Boolean(_)),
        FieldType::Array => matches!(value, Bson::Array(_)),
        FieldType::Object => matches!(value, Bson::Document(_)),
    }
}

fn is_empty(value: &Bson) -> bool {
    match value {
        Bson::Null => true,
        Bson::String(s) => s.is_empty(),
        Bson::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn type_name(value: &Bson) -> &'static str {
    match value {
        Bson::Null => "null",
        Bson::String(_) => "string",
        Bson::Boolean(_) => "boolean",
        Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) => "number",
        Bson::Array(_) => "array",
        Bson::Document(_) => "object",
        Bson::DateTime(_) => "datetime",
        _ => "unsupported",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::ItemSpec;
    use bson::doc;

    fn people_mapper() -> Mapper {
        Mapper::builder()
            .field("firstName", FieldSpec::string().min_length(1))
            .field("preferredName", FieldSpec::string())
            .field("middleName", FieldSpec::string())
            .field("lastName", FieldSpec::string().min_length(1))
            .field("maidenName", FieldSpec::string())
            .required(["firstName", "lastName"])
            .additional_properties(false)
            .build()
    }

    #[test]
    fn accepts_well_formed_document() {
        let candidate = doc! {
            "firstName": "John",
            "middleName": "Quincy",
            "lastName": "Doe",
        };
        assert!(validate(&people_mapper(), &candidate).is_ok());
    }

    #[test]
    fn rejects_undeclared_field_when_additional_properties_is_false() {
        let candidate = doc! {
            "firstName": "John",
            "lastName": "Doe",
            "nickname": "Johnny",
        };
        let err = validate(&people_mapper(), &candidate).unwrap_err();
        assert!(matches!(err, ContainerError::Validation { field, .. } if field == "nickname"));
    }

    #[test]
    fn reserved_fields_survive_a_closed_mapper() {
        let candidate = doc! {
            "id": "abc123",
            "firstName": "John",
            "lastName": "Doe",
        };
        assert!(validate(&people_mapper(), &candidate).is_ok());
    }

    #[test]
    fn rejects_missing_required_field() {
        let candidate = doc! { "firstName": "John" };
        let err = validate(&people_mapper(), &candidate).unwrap_err();
        assert!(matches!(err, ContainerError::Validation { field, .. } if field == "lastName"));
    }

    #[test]
    fn rejects_empty_required_field() {
        let candidate = doc! { "firstName": "John", "lastName": "" };
        let err = validate(&people_mapper(), &candidate).unwrap_err();
        assert!(matches!(err, ContainerError::Validation { field, .. } if field == "lastName"));
    }

    #[test]
    fn rejects_type_mismatch() {
        let candidate = doc! { "firstName": 42, "lastName": "Doe" };
        let err = validate(&people_mapper(), &candidate).unwrap_err();
        assert!(matches!(err, ContainerError::Validation { field, .. } if field == "firstName"));
    }

    #[test]
    fn enforces_min_length_on_strings() {
        let mapper = Mapper::builder()
            .field("code", FieldSpec::string().min_length(3))
            .build();
        let err = validate(&mapper, &doc! { "code": "ab" }).unwrap_err();
        assert!(matches!(err, ContainerError::Validation { field, .. } if field == "code"));
        assert!(validate(&mapper, &doc! { "code": "abc" }).is_ok());
    }

    #[test]
    fn enforces_min_length_on_arrays() {
        let mapper = Mapper::builder()
            .field("tags", FieldSpec::array().min_length(1))
            .build();
        let err = validate(&mapper, &doc! { "tags": [] }).unwrap_err();
        assert!(matches!(err, ContainerError::Validation { field, .. } if field == "tags"));
    }

    #[test]
    fn relation_items_must_be_identifiers() {
        let mapper = Mapper::builder()
            .field("people", FieldSpec::array().items(ItemSpec::string().mapper("people")))
            .build();

        assert!(validate(&mapper, &doc! { "people": ["a", "b"] }).is_ok());

        let err = validate(&mapper, &doc! { "people": ["a", 7] }).unwrap_err();
        assert!(matches!(err, ContainerError::Validation { field, .. } if field == "people"));
    }

    #[test]
    fn plain_array_items_are_type_checked() {
        let mapper = Mapper::builder()
            .field("scores", FieldSpec::array().items(ItemSpec::number()))
            .build();

        assert!(validate(&mapper, &doc! { "scores": [1, 2.5] }).is_ok());

        let err = validate(&mapper, &doc! { "scores": [1, "two"] }).unwrap_err();
        assert!(matches!(err, ContainerError::Validation { field, .. } if field == "scores"));
    }
}
