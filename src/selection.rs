use crate::events::{DirectEvent, EventBus};
use crate::scenegraph::{NodeId, SceneGraph, Transform};
use glam::Mat4;
use smallvec::SmallVec;

pub struct SelectedNode {
    pub node: NodeId,
    /// Center-of-action offset: widget pose = node pose * coa_to_node.
    pub coa_to_node: Mat4,
    /// Node-in-widget snapshot captured at drag start.
    wrt_widget: Mat4,
    pub highlighted: bool,
}

/// Ordered selection store. `last` is the most recently selected node and is
/// the one the widget follows.
#[derive(Default)]
pub struct Selection {
    items: SmallVec<[SelectedNode; 4]>,
}

impl Selection {
    pub fn select(&mut self, node: NodeId, extend: bool, events: &mut EventBus) {
        if !extend {
            for item in self.items.drain(..) {
                if item.node != node {
                    events.push(DirectEvent::DeselectedNodePath(item.node));
                }
            }
        }
        if let Some(pos) = self.items.iter().position(|i| i.node == node) {
            // Re-selecting moves the node to the `last` slot.
            let item = self.items.remove(pos);
            self.items.push(item);
        } else {
            self.items.push(SelectedNode {
                node,
                coa_to_node: Mat4::IDENTITY,
                wrt_widget: Mat4::IDENTITY,
                highlighted: true,
            });
        }
        events.push(DirectEvent::SelectedNodePath(node));
    }

    pub fn deselect_all(&mut self, events: &mut EventBus) {
        for item in self.items.drain(..) {
            events.push(DirectEvent::DeselectedNodePath(item.node));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.items.iter().any(|i| i.node == node)
    }

    pub fn last(&self) -> Option<&SelectedNode> {
        self.items.last()
    }

    pub fn last_mut(&mut self) -> Option<&mut SelectedNode> {
        self.items.last_mut()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SelectedNode> {
        self.items.iter()
    }

    pub fn node_ids(&self) -> SmallVec<[NodeId; 4]> {
        self.items.iter().map(|i| i.node).collect()
    }

    /// Records every selected node's pose relative to the widget. Taken once
    /// at drag start; the snapshot stays stable for the whole drag.
    pub fn get_wrt_all(&mut self, scene: &SceneGraph, widget: NodeId) {
        for item in self.items.iter_mut() {
            item.wrt_widget = scene.mat_wrt(item.node, widget);
        }
    }

    /// Re-poses every selected node so it keeps the relationship to the
    /// widget captured by `get_wrt_all`.
    pub fn move_wrt_widget_all(&mut self, scene: &mut SceneGraph, widget: NodeId) {
        let widget_world = scene.world_mat(widget);
        for item in self.items.iter_mut() {
            let world = widget_world * item.wrt_widget;
            let parent = scene.parent_of(item.node).unwrap_or(scene.root());
            let local = scene.world_mat(parent).inverse() * world;
            scene.node_mut(item.node).transform = Transform::from_mat4(local);
        }
    }

    pub fn highlight_all(&mut self) {
        for item in self.items.iter_mut() {
            item.highlighted = true;
        }
    }

    pub fn dehighlight_all(&mut self) {
        for item in self.items.iter_mut() {
            item.highlighted = false;
        }
    }
}
