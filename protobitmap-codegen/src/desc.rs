use serde::{Deserialize, Serialize};

use protobitmap::TypeTag;

/// What the transform did to a schema, in a form tools can consume
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TransformReport {
    pub package: Option<String>,
    pub bitmaps: Vec<BitmapDesc>,
    pub retyped: Vec<RetypedField>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BitmapDesc {
    pub full_name: String,
    pub width: TypeTag,
    pub flags: Vec<FlagDesc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FlagDesc {
    pub name: String,
    pub value: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RetypedField {
    /// Full name of the message owning the field
    pub message: String,
    pub field: String,
    pub bitmap: String,
    pub width: TypeTag,
}

impl TransformReport {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn bitmap(&self, full_name: &str) -> Option<&BitmapDesc> {
        self.bitmaps.iter().find(|b| b.full_name == full_name)
    }
}
