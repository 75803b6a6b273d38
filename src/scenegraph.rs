use crate::geometry::{hpr_to_quat, quat_to_hpr};
use glam::{Mat4, Quat, Vec3};

/// Local TRS of a node relative to its parent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    pub const IDENTITY: Transform =
        Transform { translation: Vec3::ZERO, rotation: Quat::IDENTITY, scale: Vec3::ONE };

    pub fn from_mat4(mat: Mat4) -> Self {
        let (scale, rotation, translation) = mat.to_scale_rotation_translation();
        Self { translation, rotation, scale }
    }

    pub fn to_mat4(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }

    /// Heading/pitch/roll in degrees.
    pub fn hpr(&self) -> Vec3 {
        quat_to_hpr(self.rotation)
    }

    pub fn set_hpr(&mut self, hpr: Vec3) {
        self.rotation = hpr_to_quat(hpr);
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

pub struct Node {
    pub name: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    pub transform: Transform,
    pub hidden: bool,
    pub pickable: bool,
    /// Bounding-sphere radius used by geometry picking; zero means "never picked".
    pub radius: f32,
}

/// Arena scene graph. Nodes are never destroyed during a session; editors
/// detach subtrees by reparenting or hiding them.
pub struct SceneGraph {
    nodes: Vec<Node>,
    root: NodeId,
}

impl SceneGraph {
    pub fn new() -> Self {
        let root = Node {
            name: "render".to_string(),
            parent: None,
            children: Vec::new(),
            transform: Transform::IDENTITY,
            hidden: false,
            pickable: false,
            radius: 0.0,
        };
        Self { nodes: vec![root], root: NodeId(0) }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn attach_new_node(&mut self, parent: NodeId, name: &str) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            name: name.to_string(),
            parent: Some(parent),
            children: Vec::new(),
            transform: Transform::IDENTITY,
            hidden: false,
            pickable: false,
            radius: 0.0,
        });
        self.nodes[parent.index()].children.push(id);
        id
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len() as u32).map(NodeId)
    }

    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].parent
    }

    pub fn children_of(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.index()].children
    }

    pub fn is_ancestor_of(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cur = self.parent_of(node);
        while let Some(p) = cur {
            if p == ancestor {
                return true;
            }
            cur = self.parent_of(p);
        }
        false
    }

    /// True when reparenting `node` under `parent` would not create a cycle.
    /// Walks the prospective parent's ancestry comparing node identity.
    pub fn is_not_cycle(&self, node: NodeId, parent: NodeId) -> bool {
        if node == parent {
            false
        } else if let Some(grand) = self.parent_of(parent) {
            self.is_not_cycle(node, grand)
        } else {
            true
        }
    }

    /// Moves `node` under `new_parent`, keeping its local transform.
    pub fn reparent_to(&mut self, node: NodeId, new_parent: NodeId) {
        if let Some(old) = self.nodes[node.index()].parent {
            self.nodes[old.index()].children.retain(|&c| c != node);
        }
        self.nodes[node.index()].parent = Some(new_parent);
        self.nodes[new_parent.index()].children.push(node);
    }

    /// Moves `node` under `new_parent`, keeping its world transform.
    pub fn wrt_reparent_to(&mut self, node: NodeId, new_parent: NodeId) {
        let local = self.world_mat(new_parent).inverse() * self.world_mat(node);
        self.reparent_to(node, new_parent);
        self.nodes[node.index()].transform = Transform::from_mat4(local);
    }

    pub fn hide(&mut self, id: NodeId) {
        self.nodes[id.index()].hidden = true;
    }

    pub fn show(&mut self, id: NodeId) {
        self.nodes[id.index()].hidden = false;
    }

    /// Hidden if the node or any ancestor is hidden.
    pub fn is_hidden(&self, id: NodeId) -> bool {
        let mut cur = Some(id);
        while let Some(n) = cur {
            if self.nodes[n.index()].hidden {
                return true;
            }
            cur = self.parent_of(n);
        }
        false
    }

    pub fn world_mat(&self, id: NodeId) -> Mat4 {
        let local = self.nodes[id.index()].transform.to_mat4();
        match self.parent_of(id) {
            Some(p) => self.world_mat(p) * local,
            None => local,
        }
    }

    fn world_rotation(&self, id: NodeId) -> Quat {
        let (_, rotation, _) = self.world_mat(id).to_scale_rotation_translation();
        rotation
    }

    /// Transform of `node` expressed in `other`'s frame.
    pub fn mat_wrt(&self, node: NodeId, other: NodeId) -> Mat4 {
        self.world_mat(other).inverse() * self.world_mat(node)
    }

    /// Origin of `node` in `reference`'s frame.
    pub fn pos_wrt(&self, node: NodeId, reference: NodeId) -> Vec3 {
        self.mat_wrt(node, reference).to_scale_rotation_translation().2
    }

    /// Places `node`'s origin at `pos` expressed in `reference`'s frame;
    /// orientation and scale are untouched. `reference` may be `node` itself,
    /// in which case `pos` is an offset in the node's own (pre-move) frame.
    pub fn set_pos_wrt(&mut self, node: NodeId, reference: NodeId, pos: Vec3) {
        let world = self.world_mat(reference).transform_point3(pos);
        let parent = self.parent_of(node).unwrap_or(self.root);
        let local = self.world_mat(parent).inverse().transform_point3(world);
        self.nodes[node.index()].transform.translation = local;
    }

    /// Sets `node`'s orientation so that, relative to `reference`, it equals
    /// the given heading/pitch/roll (degrees).
    pub fn set_hpr_wrt(&mut self, node: NodeId, reference: NodeId, hpr: Vec3) {
        let new_world = self.world_rotation(reference) * hpr_to_quat(hpr);
        self.set_world_rotation(node, new_world);
    }

    pub fn set_pos_quat_wrt(&mut self, node: NodeId, reference: NodeId, pos: Vec3, rot: Quat) {
        let new_world = self.world_rotation(reference) * rot;
        self.set_pos_wrt(node, reference, pos);
        self.set_world_rotation(node, new_world);
    }

    /// Rotates `node` by `hpr` (degrees) expressed in `base`'s frame; the
    /// node's position is unchanged.
    pub fn rel_hpr(&mut self, node: NodeId, base: NodeId, hpr: Vec3) {
        let base_rot = self.world_rotation(base);
        let node_rot = self.world_rotation(node);
        let new_world = base_rot * hpr_to_quat(hpr) * base_rot.inverse() * node_rot;
        self.set_world_rotation(node, new_world);
    }

    fn set_world_rotation(&mut self, node: NodeId, world: Quat) {
        let parent = self.parent_of(node).unwrap_or(self.root);
        let parent_rot = self.world_rotation(parent);
        self.nodes[node.index()].transform.rotation = (parent_rot.inverse() * world).normalize();
    }
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-4
    }

    #[test]
    fn world_mat_composes_through_parents() {
        let mut scene = SceneGraph::new();
        let a = scene.attach_new_node(scene.root(), "a");
        let b = scene.attach_new_node(a, "b");
        scene.node_mut(a).transform.translation = Vec3::new(1.0, 2.0, 3.0);
        scene.node_mut(b).transform.translation = Vec3::new(0.0, 0.0, 1.0);
        let origin = scene.world_mat(b).transform_point3(Vec3::ZERO);
        assert!(close(origin, Vec3::new(1.0, 2.0, 4.0)));
    }

    #[test]
    fn set_pos_wrt_self_translates_in_own_frame() {
        let mut scene = SceneGraph::new();
        let n = scene.attach_new_node(scene.root(), "n");
        scene.node_mut(n).transform.set_hpr(Vec3::new(90.0, 0.0, 0.0));
        scene.node_mut(n).transform.translation = Vec3::new(5.0, 0.0, 0.0);
        // Own +X now points along world -Y.
        scene.set_pos_wrt(n, n, Vec3::new(1.0, 0.0, 0.0));
        assert!(close(scene.pos_wrt(n, scene.root()), Vec3::new(5.0, 1.0, 0.0)));
    }

    #[test]
    fn rel_hpr_rotates_about_base_frame() {
        let mut scene = SceneGraph::new();
        let cam = scene.attach_new_node(scene.root(), "camera");
        let n = scene.attach_new_node(scene.root(), "n");
        scene.node_mut(cam).transform.set_hpr(Vec3::new(90.0, 0.0, 0.0));
        scene.rel_hpr(n, cam, Vec3::new(90.0, 0.0, 0.0));
        // Heading about the camera's Z still is heading about world Z here,
        // but expressed through the base conjugation path.
        let hpr = scene.node(n).transform.hpr();
        assert!((hpr.x - 90.0).abs() < 1e-3);
        // Position untouched.
        assert!(close(scene.pos_wrt(n, scene.root()), Vec3::ZERO));
    }

    #[test]
    fn wrt_reparent_preserves_world_pose() {
        let mut scene = SceneGraph::new();
        let a = scene.attach_new_node(scene.root(), "a");
        let b = scene.attach_new_node(scene.root(), "b");
        scene.node_mut(a).transform.translation = Vec3::new(3.0, 0.0, 0.0);
        scene.node_mut(b).transform.translation = Vec3::new(0.0, 7.0, 2.0);
        let before = scene.world_mat(b);
        scene.wrt_reparent_to(b, a);
        let after = scene.world_mat(b);
        for (x, y) in before.to_cols_array().iter().zip(after.to_cols_array().iter()) {
            assert!((x - y).abs() < 1e-4);
        }
        assert_eq!(scene.parent_of(b), Some(a));
    }

    #[test]
    fn cycle_detection_walks_ancestry() {
        let mut scene = SceneGraph::new();
        let a = scene.attach_new_node(scene.root(), "a");
        let b = scene.attach_new_node(a, "b");
        let c = scene.attach_new_node(b, "c");
        let other = scene.attach_new_node(scene.root(), "other");
        assert!(!scene.is_not_cycle(a, a));
        assert!(!scene.is_not_cycle(a, c));
        assert!(scene.is_not_cycle(c, a));
        assert!(scene.is_not_cycle(a, other));
    }

    #[test]
    fn hidden_propagates_from_ancestors() {
        let mut scene = SceneGraph::new();
        let a = scene.attach_new_node(scene.root(), "a");
        let b = scene.attach_new_node(a, "b");
        assert!(!scene.is_hidden(b));
        scene.hide(a);
        assert!(scene.is_hidden(b));
        scene.show(a);
        assert!(!scene.is_hidden(b));
    }
}
