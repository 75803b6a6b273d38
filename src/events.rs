use crate::scenegraph::NodeId;
use std::fmt;

/// Lifecycle and bookkeeping notifications the manipulation core emits.
/// The display names are wire contracts consumed by editor panels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectEvent {
    ManipulateObjectStart,
    ManipulateObjectCleanup,
    SelectedNodePath(NodeId),
    DeselectedNodePath(NodeId),
    PreSelectNodePath(NodeId),
    Reparent { node: NodeId, old_parent: NodeId, new_parent: NodeId },
    PushUndo,
    PushRedo,
    Undo,
    Redo,
    UndoListEmpty,
    RedoListEmpty,
}

impl fmt::Display for DirectEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DirectEvent::ManipulateObjectStart => write!(f, "DIRECT_manipulateObjectStart"),
            DirectEvent::ManipulateObjectCleanup => write!(f, "DIRECT_manipulateObjectCleanup"),
            DirectEvent::SelectedNodePath(node) => {
                write!(f, "DIRECT_selectedNodePath node={}", node.index())
            }
            DirectEvent::DeselectedNodePath(node) => {
                write!(f, "DIRECT_deselectedNodePath node={}", node.index())
            }
            DirectEvent::PreSelectNodePath(node) => {
                write!(f, "DIRECT_preSelectNodePath node={}", node.index())
            }
            DirectEvent::Reparent { node, old_parent, new_parent } => write!(
                f,
                "DIRECT_reparent node={} oldParent={} newParent={}",
                node.index(),
                old_parent.index(),
                new_parent.index()
            ),
            DirectEvent::PushUndo => write!(f, "DIRECT_pushUndo"),
            DirectEvent::PushRedo => write!(f, "DIRECT_pushRedo"),
            DirectEvent::Undo => write!(f, "DIRECT_undo"),
            DirectEvent::Redo => write!(f, "DIRECT_redo"),
            DirectEvent::UndoListEmpty => write!(f, "DIRECT_undoListEmpty"),
            DirectEvent::RedoListEmpty => write!(f, "DIRECT_redoListEmpty"),
        }
    }
}

/// Synchronous event sink. Events land in order at the point of `push`;
/// the embedding drains them once per frame.
#[derive(Default)]
pub struct EventBus {
    events: Vec<DirectEvent>,
}

impl EventBus {
    pub fn push(&mut self, event: DirectEvent) {
        self.events.push(event);
    }

    pub fn drain(&mut self) -> Vec<DirectEvent> {
        self.events.drain(..).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DirectEvent> {
        self.events.iter()
    }

    pub fn contains(&self, event: &DirectEvent) -> bool {
        self.events.contains(event)
    }
}
