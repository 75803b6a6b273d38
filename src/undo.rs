use crate::events::{DirectEvent, EventBus};
use crate::scenegraph::{NodeId, SceneGraph, Transform};
use smallvec::SmallVec;

pub type PoseGroup = SmallVec<[(NodeId, Transform); 4]>;

pub const UNDO_DEPTH: usize = 25;

/// Bounded undo/redo stacks of transform snapshots. A group holds the local
/// transforms of every node touched by one drag; undo restores them exactly
/// (snapshots, not replays).
#[derive(Default)]
pub struct UndoStack {
    undo: Vec<PoseGroup>,
    redo: Vec<PoseGroup>,
}

impl UndoStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_undo(&mut self, scene: &SceneGraph, nodes: &[NodeId], events: &mut EventBus) {
        self.push_undo_group(Self::snapshot(scene, nodes), events);
        if !nodes.is_empty() {
            self.redo.clear();
            events.push(DirectEvent::RedoListEmpty);
        }
    }

    pub fn undo(&mut self, scene: &mut SceneGraph, events: &mut EventBus) {
        let Some(group) = self.undo.pop() else {
            return;
        };
        if self.undo.is_empty() {
            events.push(DirectEvent::UndoListEmpty);
        }
        let nodes: SmallVec<[NodeId; 4]> = group.iter().map(|(n, _)| *n).collect();
        self.push_redo_group(Self::snapshot(scene, &nodes), events);
        Self::restore(scene, &group);
        events.push(DirectEvent::Undo);
    }

    pub fn redo(&mut self, scene: &mut SceneGraph, events: &mut EventBus) {
        let Some(group) = self.redo.pop() else {
            return;
        };
        if self.redo.is_empty() {
            events.push(DirectEvent::RedoListEmpty);
        }
        let nodes: SmallVec<[NodeId; 4]> = group.iter().map(|(n, _)| *n).collect();
        self.push_undo_group(Self::snapshot(scene, &nodes), events);
        Self::restore(scene, &group);
        events.push(DirectEvent::Redo);
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    fn snapshot(scene: &SceneGraph, nodes: &[NodeId]) -> PoseGroup {
        nodes.iter().map(|&n| (n, scene.node(n).transform)).collect()
    }

    fn restore(scene: &mut SceneGraph, group: &PoseGroup) {
        for (node, transform) in group.iter() {
            scene.node_mut(*node).transform = *transform;
        }
    }

    fn push_undo_group(&mut self, group: PoseGroup, events: &mut EventBus) {
        self.undo.push(group);
        if self.undo.len() > UNDO_DEPTH {
            self.undo.remove(0);
        }
        events.push(DirectEvent::PushUndo);
    }

    fn push_redo_group(&mut self, group: PoseGroup, events: &mut EventBus) {
        self.redo.push(group);
        if self.redo.len() > UNDO_DEPTH {
            self.redo.remove(0);
        }
        events.push(DirectEvent::PushRedo);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn undo_restores_exact_transform() {
        let mut scene = SceneGraph::new();
        let n = scene.attach_new_node(scene.root(), "n");
        scene.node_mut(n).transform.translation = Vec3::new(1.0, 2.0, 3.0);
        let before = scene.node(n).transform;
        let mut events = EventBus::default();
        let mut stack = UndoStack::new();
        stack.push_undo(&scene, &[n], &mut events);
        scene.node_mut(n).transform.translation = Vec3::new(9.0, 9.0, 9.0);
        stack.undo(&mut scene, &mut events);
        assert_eq!(scene.node(n).transform, before);
        // Redo brings the mutation back.
        stack.redo(&mut scene, &mut events);
        assert_eq!(scene.node(n).transform.translation, Vec3::new(9.0, 9.0, 9.0));
    }

    #[test]
    fn stack_is_bounded_with_fifo_eviction() {
        let mut scene = SceneGraph::new();
        let n = scene.attach_new_node(scene.root(), "n");
        let mut events = EventBus::default();
        let mut stack = UndoStack::new();
        for i in 0..(UNDO_DEPTH + 5) {
            scene.node_mut(n).transform.translation = Vec3::new(i as f32, 0.0, 0.0);
            stack.push_undo(&scene, &[n], &mut events);
            assert!(stack.undo_len() <= UNDO_DEPTH);
        }
        assert_eq!(stack.undo_len(), UNDO_DEPTH);
        // Unwinding completely lands on the oldest surviving snapshot (5).
        for _ in 0..UNDO_DEPTH {
            stack.undo(&mut scene, &mut events);
        }
        assert_eq!(scene.node(n).transform.translation.x, 5.0);
        assert_eq!(stack.undo_len(), 0);
    }

    #[test]
    fn empty_events_fire_when_stacks_drain() {
        let mut scene = SceneGraph::new();
        let n = scene.attach_new_node(scene.root(), "n");
        let mut events = EventBus::default();
        let mut stack = UndoStack::new();
        stack.push_undo(&scene, &[n], &mut events);
        events.drain();
        stack.undo(&mut scene, &mut events);
        let fired = events.drain();
        assert!(fired.contains(&DirectEvent::UndoListEmpty));
        assert!(fired.contains(&DirectEvent::Undo));
        // Undoing with nothing left is a no-op.
        stack.undo(&mut scene, &mut events);
        assert!(!events.drain().contains(&DirectEvent::Undo));
    }
}
