use serde::{Deserialize, Serialize};

/// The shape of a single parameter, expressive enough for the registry's
/// strict contract without pulling in a full JSON-Schema document per
/// action — `schemars` is reserved for the system-prompt rendering in
/// `wayfarer-composer`, which asks each manifest for a `schemars::Schema`
/// via [`ParamType::schema`].
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ParamType {
    String,
    Integer,
    Boolean,
    Enum { values: Vec<String> },
    Array { item: Box<ParamType> },
}

impl ParamType {
    pub fn schema(&self) -> schemars::schema::Schema {
        use schemars::schema::{InstanceType, Schema, SchemaObject};

        match self {
            ParamType::String => Schema::Object(SchemaObject {
                instance_type: Some(InstanceType::String.into()),
                ..Default::default()
            }),
            ParamType::Integer => Schema::Object(SchemaObject {
                instance_type: Some(InstanceType::Integer.into()),
                ..Default::default()
            }),
            ParamType::Boolean => Schema::Object(SchemaObject {
                instance_type: Some(InstanceType::Boolean.into()),
                ..Default::default()
            }),
            ParamType::Enum { values } => Schema::Object(SchemaObject {
                instance_type: Some(InstanceType::String.into()),
                enum_values: Some(values.iter().map(|v| serde_json::Value::String(v.clone())).collect()),
                ..Default::default()
            }),
            ParamType::Array { item } => {
                let inner = item.schema();
                Schema::Object(SchemaObject {
                    instance_type: Some(InstanceType::Array.into()),
                    array: Some(Box::new(schemars::schema::ArrayValidation {
                        items: Some(schemars::schema::SingleOrVec::Single(Box::new(inner))),
                        ..Default::default()
                    })),
                    ..Default::default()
                })
            }
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    pub ty: ParamType,
    pub required: bool,
    pub description: String,
}

impl ParamSpec {
    pub fn required(name: impl Into<String>, ty: ParamType, description: impl Into<String>) -> Self {
        Self { name: name.into(), ty, required: true, description: description.into() }
    }

    pub fn optional(name: impl Into<String>, ty: ParamType, description: impl Into<String>) -> Self {
        Self { name: name.into(), ty, required: false, description: description.into() }
    }
}

/// The registry entry for one action type: its natural-language description
/// (consumed by the composer when assembling the system prompt) and its
/// strict parameter contract.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActionManifest {
    pub name: String,
    pub description: String,
    pub params: Vec<ParamSpec>,
}

impl ActionManifest {
    pub fn new(name: impl Into<String>, description: impl Into<String>, params: Vec<ParamSpec>) -> Self {
        Self { name: name.into(), description: description.into(), params }
    }

    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }
}
