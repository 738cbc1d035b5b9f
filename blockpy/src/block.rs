use serde::{Deserialize, Serialize};

use crate::definition::definition;
use crate::param::{ParamValue, Params};

/// One node of the visual program tree.
///
/// `block_type` references a [`crate::definition::BlockDefinition`] by its
/// type tag; `params` holds whatever the editor filled in for that
/// definition's inputs. Children are only present on container types.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockInstance {
    pub id: String,
    #[serde(rename = "type")]
    pub block_type: String,
    #[serde(default)]
    pub params: Params,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<BlockInstance>,
}

impl BlockInstance {
    /// Look up a parameter, falling back to the default declared by this
    /// block type's definition. The definitions are the authority on
    /// defaults; instances only carry what the user actually edited.
    pub fn param(&self, name: &str) -> Option<ParamValue> {
        if let Some(value) = self.params.get(name) {
            return Some(value.clone());
        }
        definition(&self.block_type)?
            .inputs
            .iter()
            .find(|input| input.name == name)?
            .default
            .as_ref()
            .map(ParamValue::from)
    }

    /// Parameter rendered as display text; empty when the parameter is
    /// neither set nor defaulted.
    pub fn param_text(&self, name: &str) -> String {
        self.param(name).map(|v| v.to_string()).unwrap_or_default()
    }
}
