



// Record tables and data entry
mod records;

// Model assembly
mod model;

use crate::{Declaration, PlaybackEngine, SymbolId, Workspace, WorkspaceOptions};

/// A deferred-mode workspace over a playback engine; nothing reaches the
/// engine until a flush is forced.
pub(crate) fn deferred_ws() -> Workspace {
    Workspace::with_options(
        "test",
        Box::new(PlaybackEngine::new()),
        WorkspaceOptions::deferred(),
    )
}

/// Declare a one-dimensional set and populate it
pub(crate) fn populated_set(ws: &mut Workspace, name: &str, elements: &[&str]) -> SymbolId {
    let id = ws.declare(Declaration::set(name)).unwrap();
    ws.set_records(
        id,
        elements.iter().map(|e| (vec![e.to_string()], 1.0)).collect(),
    )
    .unwrap();
    id
}
