use crate::scenegraph::{NodeId, SceneGraph};
use glam::{Vec2, Vec3};

/// Mouse state and near-plane metrics for the viewport the manipulation core
/// runs in. Mouse coordinates are normalized device coords in [-1, 1] on both
/// axes; the camera looks along its local +Y with +Z up.
#[derive(Debug, Clone)]
pub struct DisplayRegion {
    pub mouse_x: f32,
    pub mouse_y: f32,
    pub mouse_delta_x: f32,
    pub mouse_delta_y: f32,
    pub near: f32,
    pub near_width: f32,
    pub near_height: f32,
}

impl DisplayRegion {
    pub fn new(near: f32, near_width: f32, near_height: f32) -> Self {
        Self {
            mouse_x: 0.0,
            mouse_y: 0.0,
            mouse_delta_x: 0.0,
            mouse_delta_y: 0.0,
            near,
            near_width,
            near_height,
        }
    }

    /// Records the mouse position for this frame and derives the deltas.
    pub fn set_mouse(&mut self, x: f32, y: f32) {
        self.mouse_delta_x = x - self.mouse_x;
        self.mouse_delta_y = y - self.mouse_y;
        self.mouse_x = x;
        self.mouse_y = y;
    }

    pub fn mouse(&self) -> Vec2 {
        Vec2::new(self.mouse_x, self.mouse_y)
    }

    pub fn left(&self) -> f32 {
        -0.5 * self.near_width
    }

    pub fn right(&self) -> f32 {
        0.5 * self.near_width
    }

    pub fn bottom(&self) -> f32 {
        -0.5 * self.near_height
    }

    pub fn top(&self) -> f32 {
        0.5 * self.near_height
    }

    /// Vector from the eye through the mouse's position on the near plane,
    /// in camera space (not normalized).
    pub fn near_vec(&self) -> Vec3 {
        Vec3::new(0.5 * self.mouse_x * self.near_width, self.near, 0.5 * self.mouse_y * self.near_height)
    }
}

/// Camera-space projection of `node`'s origin onto the near plane.
pub fn near_projection_point(
    scene: &SceneGraph,
    camera: NodeId,
    node: NodeId,
    dr: &DisplayRegion,
) -> Vec3 {
    let pos = scene.pos_wrt(node, camera);
    if pos.y.abs() < f32::EPSILON {
        return Vec3::new(0.0, dr.near, 0.0);
    }
    pos * (dr.near / pos.y)
}

/// Projection of `node`'s origin clamped to the viewport, mapped into the
/// same [-1, 1] space as the mouse.
pub fn screen_xy(scene: &SceneGraph, camera: NodeId, node: NodeId, dr: &DisplayRegion) -> Vec2 {
    let near = near_projection_point(scene, camera, node, dr);
    let nx = near.x.clamp(dr.left(), dr.right());
    let nz = near.z.clamp(dr.bottom(), dr.top());
    let percent_x = (nx - dr.left()) / dr.near_width;
    let percent_y = (nz - dr.bottom()) / dr.near_height;
    Vec2::new(2.0 * percent_x - 1.0, 2.0 * percent_y - 1.0)
}

/// Eyepoint and unit direction of the cursor ray, expressed in `frame`'s
/// local coordinates.
pub fn mouse_ray_wrt(
    scene: &SceneGraph,
    camera: NodeId,
    dr: &DisplayRegion,
    frame: NodeId,
) -> (Vec3, Vec3) {
    let m = scene.mat_wrt(camera, frame);
    let origin = m.transform_point3(Vec3::ZERO);
    let dir = m.transform_vector3(dr.near_vec()).normalize();
    (origin, dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn near_vec_tracks_mouse() {
        let mut dr = DisplayRegion::new(1.0, 2.0, 2.0);
        dr.set_mouse(0.5, -0.25);
        let v = dr.near_vec();
        assert!((v.x - 0.5).abs() < 1e-6);
        assert!((v.y - 1.0).abs() < 1e-6);
        assert!((v.z + 0.25).abs() < 1e-6);
        dr.set_mouse(0.6, -0.25);
        assert!((dr.mouse_delta_x - 0.1).abs() < 1e-6);
        assert!(dr.mouse_delta_y.abs() < 1e-6);
    }

    #[test]
    fn screen_xy_matches_mouse_space() {
        let mut scene = SceneGraph::new();
        let camera = scene.attach_new_node(scene.root(), "camera");
        let node = scene.attach_new_node(scene.root(), "node");
        scene.node_mut(node).transform.translation = glam::Vec3::new(1.0, 10.0, -2.0);
        let dr = DisplayRegion::new(1.0, 2.0, 2.0);
        let xy = screen_xy(&scene, camera, node, &dr);
        assert!((xy.x - 0.1).abs() < 1e-5);
        assert!((xy.y + 0.2).abs() < 1e-5);
    }

    #[test]
    fn screen_xy_clamps_to_viewport() {
        let mut scene = SceneGraph::new();
        let camera = scene.attach_new_node(scene.root(), "camera");
        let node = scene.attach_new_node(scene.root(), "node");
        scene.node_mut(node).transform.translation = glam::Vec3::new(50.0, 10.0, 0.0);
        let dr = DisplayRegion::new(1.0, 2.0, 2.0);
        let xy = screen_xy(&scene, camera, node, &dr);
        assert!((xy.x - 1.0).abs() < 1e-5);
    }

    #[test]
    fn mouse_ray_points_through_cursor() {
        let mut scene = SceneGraph::new();
        let camera = scene.attach_new_node(scene.root(), "camera");
        let mut dr = DisplayRegion::new(1.0, 2.0, 2.0);
        dr.set_mouse(0.0, 0.0);
        let (origin, dir) = mouse_ray_wrt(&scene, camera, &dr, scene.root());
        assert!((origin).length() < 1e-6);
        assert!((dir - glam::Vec3::Y).length() < 1e-6);
    }
}
