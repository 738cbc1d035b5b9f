pub mod block;
pub mod definition;
pub mod error;
pub mod param;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::block::BlockInstance;
use crate::definition::definition;
use crate::error::{LoadError, ValidateError};

/// A complete visual program: the ordered list of root blocks as produced
/// by the editor. The runtime only ever reads this tree.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Program {
    pub blocks: Vec<BlockInstance>,
}

impl Program {
    /// Deserialize a program from editor-produced JSON.
    pub fn from_json(source: &str) -> Result<Program, LoadError> {
        serde_json::from_str(source).map_err(|e| LoadError::Json(e.to_string()))
    }

    /// Read and deserialize a program document from disk.
    pub fn from_file(path: &Path) -> Result<Program, LoadError> {
        let source = std::fs::read_to_string(path)
            .map_err(|e| LoadError::Io(format!("cannot read '{}': {}", path.display(), e)))?;
        Program::from_json(&source)
    }

    /// Structural checks the editor normally guarantees: every block type is
    /// known, ids are unique, and children only appear under block types
    /// whose definition allows them. The engines never rely on this; it
    /// exists for `--check` style tooling over hand-edited documents.
    pub fn validate(&self) -> Vec<ValidateError> {
        let mut errors = Vec::new();
        let mut seen_ids = Vec::new();
        for block in &self.blocks {
            validate_block(block, &mut seen_ids, &mut errors);
        }
        errors
    }
}

fn validate_block(
    block: &BlockInstance,
    seen_ids: &mut Vec<String>,
    errors: &mut Vec<ValidateError>,
) {
    if seen_ids.contains(&block.id) {
        errors.push(ValidateError::new(&block.id, "duplicate block id"));
    } else {
        seen_ids.push(block.id.clone());
    }

    match definition(&block.block_type) {
        None => {
            errors.push(ValidateError::new(
                &block.id,
                format!("unknown block type '{}'", block.block_type),
            ));
        }
        Some(def) => {
            if !def.has_children && !block.children.is_empty() {
                errors.push(ValidateError::new(
                    &block.id,
                    format!("block type '{}' does not take children", block.block_type),
                ));
            }
        }
    }

    for child in &block.children {
        validate_block(child, seen_ids, errors);
    }
}
