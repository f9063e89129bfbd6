//! Declarative mapper schemas for collections.
//!
//! A [`Mapper`] describes the shape of every document in one collection: its
//! fields, which of them are required, and whether undeclared fields are
//! tolerated. Mappers are plain data (built fluently with [`MapperBuilder`]
//! or deserialized from configuration) and are interpreted
//! by a single generic validation routine rather than per-collection code.
//!
//! # Example
//!
//! ```ignore
//! use recordlayer_core::mapper::{Mapper, FieldSpec, ItemSpec};
//!
//! let people = Mapper::builder()
//!     .field("firstName", FieldSpec::string().min_length(1))
//!     .field("lastName", FieldSpec::string().min_length(1))
//!     .required(["firstName", "lastName"])
//!     .additional_properties(false)
//!     .build();
//!
//! let accounts = Mapper::builder()
//!     .field("people", FieldSpec::array().items(ItemSpec::string().mapper("people")))
//!     .build();
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Field names the container manages itself. These are admitted by every
/// mapper regardless of its additional-properties policy and are never
/// validated as declared fields.
pub const RESERVED_FIELDS: [&str; 4] = ["id", "rev", "createdAt", "updatedAt"];

/// Returns true if `name` is a container-managed metadata field.
pub fn is_reserved_field(name: &str) -> bool {
    RESERVED_FIELDS.contains(&name)
}

/// The declared type of a mapper field or array item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// UTF-8 string value.
    String,
    /// Any numeric value (integer or float).
    Number,
    /// Boolean value.
    Boolean,
    /// Array value, optionally constrained by an item spec.
    Array,
    /// Nested document value.
    Object,
}

impl FieldType {
    /// Human-readable name used in validation messages.
    pub fn name(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Array => "array",
            FieldType::Object => "object",
        }
    }
}

/// Constraint on the items of an array field.
///
/// An item spec that names a `mapper` declares a relationship: every element
/// must be the `id` of an existing record in that mapper's collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemSpec {
    /// The required type of each element.
    #[serde(rename = "type")]
    pub item_type: FieldType,
    /// Target mapper name for relationship fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapper: Option<String>,
}

impl ItemSpec {
    /// Creates an item spec requiring string elements.
    pub fn string() -> Self {
        Self { item_type: FieldType::String, mapper: None }
    }

    /// Creates an item spec requiring numeric elements.
    pub fn number() -> Self {
        Self { item_type: FieldType::Number, mapper: None }
    }

    /// Declares the elements to be identifiers of records in `mapper`'s collection.
    pub fn mapper(mut self, mapper: impl Into<String>) -> Self {
        self.mapper = Some(mapper.into());
        self
    }
}

/// Specification for a single declared field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// The required type of the field value.
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Minimum length, enforced for string and array fields only.
    #[serde(default, rename = "minLength", skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    /// Item constraint for array fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<ItemSpec>,
}

impl FieldSpec {
    fn new(field_type: FieldType) -> Self {
        Self { field_type, min_length: None, items: None }
    }

    /// Creates a string field spec.
    pub fn string() -> Self {
        Self::new(FieldType::String)
    }

    /// Creates a numeric field spec.
    pub fn number() -> Self {
        Self::new(FieldType::Number)
    }

    /// Creates a boolean field spec.
    pub fn boolean() -> Self {
        Self::new(FieldType::Boolean)
    }

    /// Creates an array field spec.
    pub fn array() -> Self {
        Self::new(FieldType::Array)
    }

    /// Creates a nested-document field spec.
    pub fn object() -> Self {
        Self::new(FieldType::Object)
    }

    /// Sets the minimum length constraint.
    pub fn min_length(mut self, min_length: usize) -> Self {
        self.min_length = Some(min_length);
        self
    }

    /// Sets the item constraint for an array field.
    pub fn items(mut self, items: ItemSpec) -> Self {
        self.items = Some(items);
        self
    }

    /// Returns the relationship target mapper, if this is a relation field.
    pub fn relation_target(&self) -> Option<&str> {
        if self.field_type != FieldType::Array {
            return None;
        }

        self.items
            .as_ref()
            .and_then(|items| items.mapper.as_deref())
    }
}

/// Declarative schema for one collection.
///
/// Field order is deterministic (lexicographic by field name), which fixes the
/// order relation failures are reported in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mapper {
    /// Declared fields, keyed by field name.
    #[serde(default)]
    pub properties: BTreeMap<String, FieldSpec>,
    /// Names of fields that must be present and non-empty.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    /// When false, undeclared non-reserved fields are rejected.
    #[serde(default = "default_additional_properties", rename = "additionalProperties")]
    pub additional_properties: bool,
}

fn default_additional_properties() -> bool {
    true
}

impl Mapper {
    /// Creates a new mapper builder for fluent construction.
    pub fn builder() -> MapperBuilder {
        MapperBuilder::new()
    }

    /// Looks up the spec for a declared field.
    pub fn property(&self, field: &str) -> Option<&FieldSpec> {
        self.properties.get(field)
    }

    /// Returns true if the named field is in the required set.
    pub fn is_required(&self, field: &str) -> bool {
        self.required.iter().any(|name| name == field)
    }

    /// Iterates the relationship fields of this mapper in deterministic order,
    /// yielding `(field name, target mapper name)` pairs.
    pub fn relations(&self) -> impl Iterator<Item = (&str, &str)> {
        self.properties.iter().filter_map(|(field, spec)| {
            spec.relation_target()
                .map(|target| (field.as_str(), target))
        })
    }
}

impl Default for Mapper {
    fn default() -> Self {
        Mapper {
            properties: BTreeMap::new(),
            required: Vec::new(),
            additional_properties: true,
        }
    }
}

/// Builder for constructing [`Mapper`] instances.
#[derive(Debug, Clone, Default)]
pub struct MapperBuilder {
    mapper: Mapper,
}

impl MapperBuilder {
    /// Creates a new builder with no fields declared.
    pub fn new() -> Self {
        MapperBuilder { mapper: Mapper::default() }
    }

    /// Declares a field with the given spec.
    pub fn field(mut self, name: impl Into<String>, spec: FieldSpec) -> Self {
        self.mapper.properties.insert(name.into(), spec);
        self
    }

    /// Marks the given fields as required.
    pub fn required<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.mapper
            .required
            .extend(names.into_iter().map(Into::into));
        self
    }

    /// Sets the additional-properties policy. Defaults to true (tolerant).
    pub fn additional_properties(mut self, allow: bool) -> Self {
        self.mapper.additional_properties = allow;
        self
    }

    /// Builds and returns the final mapper.
    pub fn build(self) -> Mapper {
        self.mapper
    }
}
