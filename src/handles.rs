use crate::display::{mouse_ray_wrt, DisplayRegion};
use crate::geometry::{ease_in_out, plane_intersect};
use crate::scenegraph::{NodeId, SceneGraph};
use crate::tasks::{TaskKey, TaskManager};
use glam::{Vec3, Vec4};

/// Half-length of an axis post, in widget units.
pub const POST_LENGTH: f32 = 1.5;
/// Radius of a rotation ring.
pub const RING_RADIUS: f32 = 1.0;
/// Half-width of the pickable band around a ring.
pub const RING_PICK_BAND: f32 = 0.1;
/// Radius of the filled planar disc inside each ring.
pub const DISC_RADIUS: f32 = 0.9;
/// Pick radius around a post's centerline.
pub const POST_PICK_RADIUS: f32 = 0.1;
/// Duration of the handle scale tween.
pub const RESIZE_DURATION: f32 = 0.5;
/// Widget tint while center-of-action rebinding is on.
pub const COA_MODE_COLOR: Vec4 = Vec4::new(0.5, 0.5, 0.5, 1.0);

const PARALLEL_EPSILON: f32 = 1e-6;
const RAY_EPSILON: f32 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub fn unit(self) -> Vec3 {
        match self {
            Axis::X => Vec3::X,
            Axis::Y => Vec3::Y,
            Axis::Z => Vec3::Z,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleKind {
    Post,
    Ring,
    Disc,
}

impl HandleKind {
    const ALL: [HandleKind; 3] = [HandleKind::Post, HandleKind::Ring, HandleKind::Disc];

    fn index(self) -> usize {
        match self {
            HandleKind::Post => 0,
            HandleKind::Ring => 1,
            HandleKind::Disc => 2,
        }
    }
}

/// One pickable part of the widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Handle {
    pub axis: Axis,
    pub kind: HandleKind,
}

impl Handle {
    pub fn name(self) -> &'static str {
        match (self.axis, self.kind) {
            (Axis::X, HandleKind::Post) => "x-post",
            (Axis::X, HandleKind::Ring) => "x-ring",
            (Axis::X, HandleKind::Disc) => "x-disc",
            (Axis::Y, HandleKind::Post) => "y-post",
            (Axis::Y, HandleKind::Ring) => "y-ring",
            (Axis::Y, HandleKind::Disc) => "y-disc",
            (Axis::Z, HandleKind::Post) => "z-post",
            (Axis::Z, HandleKind::Ring) => "z-ring",
            (Axis::Z, HandleKind::Disc) => "z-disc",
        }
    }
}

/// Addressing for bulk show/hide/enable operations.
#[derive(Debug, Clone, Copy)]
pub enum HandleSet {
    One(Handle),
    Axis(Axis),
    Kind(HandleKind),
    All,
}

impl HandleSet {
    fn matches(self, handle: Handle) -> bool {
        match self {
            HandleSet::One(h) => h == handle,
            HandleSet::Axis(a) => a == handle.axis,
            HandleSet::Kind(k) => k == handle.kind,
            HandleSet::All => true,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct HandleState {
    enabled: bool,
    visible: bool,
}

impl Default for HandleState {
    fn default() -> Self {
        Self { enabled: true, visible: true }
    }
}

/// Hit on the widget. `point` is in the scaling node's frame, where the
/// handle dimensions above are exact.
#[derive(Debug, Clone, Copy)]
pub struct WidgetHit {
    pub handle: Handle,
    pub point: Vec3,
    pub t: f32,
}

struct ScaleTween {
    from: Vec3,
    to: Vec3,
    elapsed: f32,
}

/// The manipulation widget: three posts, three rings, three discs parented
/// under a uniform scaling node. The widget node carries the pose being
/// dragged; the scaling node only carries the view-dependent size.
pub struct ObjectHandles {
    pub widget: NodeId,
    pub scaling_node: NodeId,
    oh_scaling_factor: f32,
    states: [[HandleState; 3]; 3],
    guides_visible: bool,
    tint: Option<Vec4>,
    hovered: Option<Handle>,
    active: bool,
    tween: Option<ScaleTween>,
}

impl ObjectHandles {
    pub fn new(scene: &mut SceneGraph, parent: NodeId) -> Self {
        let widget = scene.attach_new_node(parent, "objectHandles");
        let scaling_node = scene.attach_new_node(widget, "ohScalingNode");
        scene.hide(scaling_node);
        Self {
            widget,
            scaling_node,
            oh_scaling_factor: 1.0,
            states: [[HandleState::default(); 3]; 3],
            guides_visible: false,
            tint: None,
            hovered: None,
            active: false,
            tween: None,
        }
    }

    pub fn scaling_factor(&self) -> f32 {
        self.oh_scaling_factor
    }

    pub fn set_scaling_factor(&mut self, scene: &mut SceneGraph, factor: f32) {
        self.oh_scaling_factor = factor;
        self.tween = None;
        scene.node_mut(self.scaling_node).transform.scale = Vec3::splat(factor);
    }

    /// Scales the widget by `factor`, animated over `RESIZE_DURATION`.
    /// A new request retargets the running tween from the current size.
    pub fn multiply_scaling_factor_by(
        &mut self,
        scene: &SceneGraph,
        tasks: &mut TaskManager,
        factor: f32,
    ) {
        self.oh_scaling_factor *= factor;
        self.start_resize(scene, tasks);
    }

    /// Sizes the widget so it covers `coverage` of the viewport's smaller
    /// dimension at its current depth.
    pub fn grow_to_fit(
        &mut self,
        scene: &SceneGraph,
        camera: NodeId,
        dr: &DisplayRegion,
        tasks: &mut TaskManager,
        coverage: f32,
    ) {
        let pos = scene.pos_wrt(self.widget, camera);
        if pos.y <= dr.near {
            return;
        }
        let min_dim = dr.near_width.min(dr.near_height);
        self.oh_scaling_factor = 0.5 * coverage * min_dim * (pos.y / dr.near);
        self.start_resize(scene, tasks);
    }

    fn start_resize(&mut self, scene: &SceneGraph, tasks: &mut TaskManager) {
        let from = scene.node(self.scaling_node).transform.scale;
        self.tween =
            Some(ScaleTween { from, to: Vec3::splat(self.oh_scaling_factor), elapsed: 0.0 });
        tasks.add(TaskKey::ResizeObjectHandles);
    }

    /// Advances the resize tween. Returns true once it has finished.
    pub fn update_resize(&mut self, dt: f32, scene: &mut SceneGraph) -> bool {
        let Some(tween) = self.tween.as_mut() else {
            return true;
        };
        tween.elapsed += dt;
        let s = ease_in_out(tween.elapsed / RESIZE_DURATION);
        scene.node_mut(self.scaling_node).transform.scale = tween.from.lerp(tween.to, s);
        if tween.elapsed >= RESIZE_DURATION {
            scene.node_mut(self.scaling_node).transform.scale = tween.to;
            self.tween = None;
            true
        } else {
            false
        }
    }

    /// Folds any scale a drag left on the widget node into the scaling node,
    /// so the widget node's frame stays orthonormal for the next drag.
    pub fn transfer_object_handles_scale(&mut self, scene: &mut SceneGraph) {
        let outer = scene.node(self.widget).transform.scale;
        let inner = scene.node(self.scaling_node).transform.scale;
        scene.node_mut(self.scaling_node).transform.scale = inner * outer;
        scene.node_mut(self.widget).transform.scale = Vec3::ONE;
    }

    pub fn enable_handles(&mut self, set: HandleSet) {
        self.for_each(set, |state| state.enabled = true);
    }

    pub fn disable_handles(&mut self, set: HandleSet) {
        self.for_each(set, |state| state.enabled = false);
    }

    pub fn show_handle(&mut self, set: HandleSet) {
        self.for_each(set, |state| state.visible = true);
    }

    pub fn hide_handle(&mut self, set: HandleSet) {
        self.for_each(set, |state| state.visible = false);
    }

    pub fn show_all_handles(&mut self) {
        self.show_handle(HandleSet::All);
    }

    pub fn hide_all_handles(&mut self) {
        self.hide_handle(HandleSet::All);
    }

    fn for_each(&mut self, set: HandleSet, mut f: impl FnMut(&mut HandleState)) {
        for axis in Axis::ALL {
            for kind in HandleKind::ALL {
                if set.matches(Handle { axis, kind }) {
                    f(&mut self.states[axis.index()][kind.index()]);
                }
            }
        }
    }

    fn state(&self, handle: Handle) -> HandleState {
        self.states[handle.axis.index()][handle.kind.index()]
    }

    pub fn is_visible(&self, handle: Handle) -> bool {
        self.state(handle).visible
    }

    pub fn is_enabled(&self, handle: Handle) -> bool {
        self.state(handle).enabled
    }

    pub fn show_guides(&mut self) {
        self.guides_visible = true;
    }

    pub fn hide_guides(&mut self) {
        self.guides_visible = false;
    }

    pub fn guides_visible(&self) -> bool {
        self.guides_visible
    }

    pub fn coa_mode_color(&mut self) {
        self.tint = Some(COA_MODE_COLOR);
    }

    pub fn manip_mode_color(&mut self) {
        self.tint = None;
    }

    pub fn tint(&self) -> Option<Vec4> {
        self.tint
    }

    pub fn set_hovered(&mut self, handle: Option<Handle>) {
        self.hovered = handle;
    }

    pub fn hovered(&self) -> Option<Handle> {
        self.hovered
    }

    pub fn activate(&mut self, scene: &mut SceneGraph) {
        self.active = true;
        scene.show(self.scaling_node);
    }

    pub fn deactivate(&mut self, scene: &mut SceneGraph) {
        self.active = false;
        scene.hide(self.scaling_node);
    }

    pub fn toggle_widget(&mut self, scene: &mut SceneGraph) {
        if self.active {
            self.deactivate(scene);
        } else {
            self.activate(scene);
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Cursor-ray hit on `axis`, expressed in the widget's frame with the
    /// off-axis components zeroed. The pick plane is whichever coordinate
    /// plane containing the axis faces the ray more squarely.
    pub fn get_axis_intersect_pt(
        &self,
        scene: &SceneGraph,
        camera: NodeId,
        dr: &DisplayRegion,
        axis: Axis,
    ) -> Vec3 {
        let (origin, dir) = mouse_ray_wrt(scene, camera, dr, self.widget);
        let (n_a, n_b) = match axis {
            Axis::X => (Vec3::Y, Vec3::Z),
            Axis::Y => (Vec3::X, Vec3::Z),
            Axis::Z => (Vec3::X, Vec3::Y),
        };
        let normal = if dir.dot(n_a).abs() >= dir.dot(n_b).abs() { n_a } else { n_b };
        let hit = plane_intersect(origin, dir, Vec3::ZERO, normal);
        axis.unit() * hit.dot(axis.unit())
    }

    /// Cursor-ray hit on the plane through `node`'s origin perpendicular to
    /// `axis`, expressed in `node`'s frame.
    pub fn get_widget_intersect_pt(
        &self,
        scene: &SceneGraph,
        camera: NodeId,
        dr: &DisplayRegion,
        node: NodeId,
        axis: Axis,
    ) -> Vec3 {
        let (origin, dir) = mouse_ray_wrt(scene, camera, dr, node);
        plane_intersect(origin, dir, Vec3::ZERO, axis.unit())
    }

    /// Tests the cursor ray against every enabled, visible handle and returns
    /// the nearest hit. Posts win ties against coplanar rings and discs so a
    /// click on the crossing point still grabs the axis.
    pub fn pick(&self, scene: &SceneGraph, camera: NodeId, dr: &DisplayRegion) -> Option<WidgetHit> {
        if !self.active {
            return None;
        }
        let (origin, dir) = mouse_ray_wrt(scene, camera, dr, self.scaling_node);
        let mut hits: Vec<WidgetHit> = Vec::new();
        for axis in Axis::ALL {
            let n = axis.unit();
            let denom = dir.dot(n);
            if denom.abs() > PARALLEL_EPSILON {
                let t = -origin.dot(n) / denom;
                if t > RAY_EPSILON {
                    let point = origin + dir * t;
                    let r = point.length();
                    if (r - RING_RADIUS).abs() <= RING_PICK_BAND {
                        self.offer(&mut hits, Handle { axis, kind: HandleKind::Ring }, point, t);
                    }
                    if r <= DISC_RADIUS {
                        self.offer(&mut hits, Handle { axis, kind: HandleKind::Disc }, point, t);
                    }
                }
            }
            // Post: closest approach between the ray and the axis line.
            let b = dir.dot(n);
            let denom = 1.0 - b * b;
            if denom > PARALLEL_EPSILON {
                let e = dir.dot(origin);
                let f = n.dot(origin);
                let s = (f - e * b) / denom;
                let t = s * b - e;
                if t > RAY_EPSILON && s.abs() <= POST_LENGTH {
                    let on_axis = n * s;
                    let on_ray = origin + dir * t;
                    if (on_ray - on_axis).length() <= POST_PICK_RADIUS {
                        self.offer(&mut hits, Handle { axis, kind: HandleKind::Post }, on_axis, t);
                    }
                }
            }
        }
        let best_t = hits.iter().map(|h| h.t).fold(f32::INFINITY, f32::min);
        let post = hits
            .iter()
            .filter(|h| h.handle.kind == HandleKind::Post && h.t <= best_t + POST_PICK_RADIUS)
            .min_by(|a, b| a.t.total_cmp(&b.t));
        post.or_else(|| hits.iter().min_by(|a, b| a.t.total_cmp(&b.t))).copied()
    }

    fn offer(&self, hits: &mut Vec<WidgetHit>, handle: Handle, point: Vec3, t: f32) {
        let state = self.state(handle);
        if state.enabled && state.visible {
            hits.push(WidgetHit { handle, point, t });
        }
    }
}
