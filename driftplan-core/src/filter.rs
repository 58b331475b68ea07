//! Object-type filtering.

use crate::model::{ObjectKind, SchemaModel};

/// Keep only objects whose kind is in `kinds`. An empty list keeps everything.
///
/// Discovery order and warnings carry over unchanged.
pub fn filter(model: &SchemaModel, kinds: &[ObjectKind]) -> SchemaModel {
    if kinds.is_empty() {
        return model.clone();
    }
    let mut filtered = SchemaModel::new();
    for object in model.iter().filter(|o| kinds.contains(&o.kind())) {
        filtered.insert(object.clone());
    }
    for warning in model.warnings() {
        filtered.push_warning(warning.source.clone(), warning.message.clone());
    }
    log::debug!(
        "Filtered schema model; kinds={:?}, kept={}, total={}",
        kinds,
        filtered.len(),
        model.len()
    );
    filtered
}
