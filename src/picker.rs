use crate::display::{mouse_ray_wrt, DisplayRegion};
use crate::scenegraph::{NodeId, SceneGraph};
use bitflags::bitflags;
use glam::Vec3;

bitflags! {
    /// What the geometry raycast ignores.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SkipFlags: u32 {
        const HIDDEN = 1 << 0;
        const BACKFACE = 1 << 1;
        const CAMERA = 1 << 2;
    }
}

#[derive(Debug, Clone, Copy)]
pub struct GeomHit {
    pub node: NodeId,
    /// World-space surface point.
    pub point: Vec3,
    /// Ray parameter of the hit; hits are sorted nearest-first on this.
    pub t: f32,
}

impl GeomHit {
    pub fn surface_point(&self, scene: &SceneGraph, from: NodeId) -> Vec3 {
        scene.world_mat(from).inverse().transform_point3(self.point)
    }
}

const RAY_EPSILON: f32 = 1e-4;

/// Casts the cursor ray against every pickable node's bounding sphere and
/// returns the nearest hit. A miss is a normal outcome, not an error.
pub fn pick_geom(
    scene: &SceneGraph,
    camera: NodeId,
    dr: &DisplayRegion,
    skip: SkipFlags,
) -> Option<GeomHit> {
    let (origin, dir) = mouse_ray_wrt(scene, camera, dr, scene.root());
    let mut best: Option<GeomHit> = None;
    for id in scene.ids() {
        let node = scene.node(id);
        if !node.pickable || node.radius <= 0.0 {
            continue;
        }
        if skip.contains(SkipFlags::HIDDEN) && scene.is_hidden(id) {
            continue;
        }
        if skip.contains(SkipFlags::CAMERA) && (id == camera || scene.is_ancestor_of(camera, id)) {
            continue;
        }
        let world = scene.world_mat(id);
        let center = world.transform_point3(Vec3::ZERO);
        let (scale, _, _) = world.to_scale_rotation_translation();
        let radius = node.radius * scale.max_element();
        let oc = origin - center;
        let b = oc.dot(dir);
        let c = oc.length_squared() - radius * radius;
        let disc = b * b - c;
        if disc < 0.0 {
            continue;
        }
        let inside = c < 0.0;
        if inside && skip.contains(SkipFlags::BACKFACE) {
            // Only the exit surface is reachable from inside the bound.
            continue;
        }
        let sqrt_disc = disc.sqrt();
        let t_near = -b - sqrt_disc;
        let t_far = -b + sqrt_disc;
        let t = if t_near > RAY_EPSILON { t_near } else { t_far };
        if t <= RAY_EPSILON {
            continue;
        }
        if best.as_ref().map_or(true, |h| t < h.t) {
            best = Some(GeomHit { node: id, point: origin + dir * t, t });
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        scene: SceneGraph,
        camera: NodeId,
        dr: DisplayRegion,
    }

    fn fixture() -> Fixture {
        let mut scene = SceneGraph::new();
        let camera = scene.attach_new_node(scene.root(), "camera");
        let dr = DisplayRegion::new(1.0, 2.0, 2.0);
        Fixture { scene, camera, dr }
    }

    fn add_ball(scene: &mut SceneGraph, name: &str, pos: Vec3, radius: f32) -> NodeId {
        let root = scene.root();
        let id = scene.attach_new_node(root, name);
        scene.node_mut(id).transform.translation = pos;
        scene.node_mut(id).pickable = true;
        scene.node_mut(id).radius = radius;
        id
    }

    #[test]
    fn nearest_hit_wins() {
        let mut f = fixture();
        let near = add_ball(&mut f.scene, "near", Vec3::new(0.0, 5.0, 0.0), 1.0);
        let _far = add_ball(&mut f.scene, "far", Vec3::new(0.0, 15.0, 0.0), 1.0);
        let hit = pick_geom(&f.scene, f.camera, &f.dr, SkipFlags::empty()).expect("hit");
        assert_eq!(hit.node, near);
        assert!((hit.point - Vec3::new(0.0, 4.0, 0.0)).length() < 1e-4);
    }

    #[test]
    fn miss_returns_none() {
        let mut f = fixture();
        add_ball(&mut f.scene, "ball", Vec3::new(0.0, 5.0, 0.0), 0.5);
        f.dr.set_mouse(0.9, 0.9);
        assert!(pick_geom(&f.scene, f.camera, &f.dr, SkipFlags::empty()).is_none());
    }

    #[test]
    fn skip_flags_prune_candidates() {
        let mut f = fixture();
        let ball = add_ball(&mut f.scene, "ball", Vec3::new(0.0, 5.0, 0.0), 1.0);
        f.scene.hide(ball);
        assert!(pick_geom(&f.scene, f.camera, &f.dr, SkipFlags::HIDDEN).is_none());
        assert!(pick_geom(&f.scene, f.camera, &f.dr, SkipFlags::empty()).is_some());
        f.scene.show(ball);

        // Camera-descendant geometry is skipped only when asked.
        let rig = f.scene.attach_new_node(f.camera, "rig");
        f.scene.node_mut(rig).transform.translation = Vec3::new(0.0, 3.0, 0.0);
        f.scene.node_mut(rig).pickable = true;
        f.scene.node_mut(rig).radius = 0.5;
        let hit = pick_geom(&f.scene, f.camera, &f.dr, SkipFlags::CAMERA).expect("hit");
        assert_eq!(hit.node, ball);
        let hit = pick_geom(&f.scene, f.camera, &f.dr, SkipFlags::empty()).expect("hit");
        assert_eq!(hit.node, rig);
    }

    #[test]
    fn backface_skip_drops_exit_hits() {
        let mut f = fixture();
        add_ball(&mut f.scene, "around-eye", Vec3::ZERO, 2.0);
        assert!(pick_geom(&f.scene, f.camera, &f.dr, SkipFlags::BACKFACE).is_none());
        let hit = pick_geom(&f.scene, f.camera, &f.dr, SkipFlags::empty()).expect("exit hit");
        assert!((hit.point - Vec3::new(0.0, 2.0, 0.0)).length() < 1e-4);
    }
}
