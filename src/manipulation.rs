use crate::display::{near_projection_point, screen_xy, DisplayRegion};
use crate::events::DirectEvent;
use crate::geometry::crank_angle;
use crate::handles::{Axis, Handle, HandleKind, HandleSet, ObjectHandles};
use crate::input::{Input, ModifierSnapshot};
use crate::picker::{pick_geom, SkipFlags};
use crate::scenegraph::{NodeId, SceneGraph};
use crate::selection::Selection;
use crate::tasks::{TaskKey, TaskManager};
use crate::undo::UndoStack;
use anyhow::{Context, Result};
use glam::{Quat, Vec2, Vec3};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Hold time before a press with no mouse motion becomes a drag.
pub const MANIPULATION_MOVE_DELAY: f32 = 0.2;
/// Mouse travel (NDC units) that promotes a press to a drag immediately.
pub const MANIPULATION_MOVE_THRESHOLD: f32 = 0.01;
/// Degrees of rotation per unit of mouse travel in free tumble.
pub const TUMBLE_RATE: f32 = 360.0;
/// Legacy roll sign workaround; off matches the shipped editor behavior.
pub const TEMP_HPR_FIX: bool = false;

#[derive(Debug, Clone, Deserialize)]
pub struct ManipConfig {
    #[serde(default = "ManipConfig::default_move_delay")]
    pub move_delay: f32,
    #[serde(default = "ManipConfig::default_motion_threshold")]
    pub motion_threshold: f32,
    #[serde(default = "ManipConfig::default_grow_to_fit_coverage")]
    pub grow_to_fit_coverage: f32,
}

impl ManipConfig {
    const fn default_move_delay() -> f32 {
        MANIPULATION_MOVE_DELAY
    }

    const fn default_motion_threshold() -> f32 {
        MANIPULATION_MOVE_THRESHOLD
    }

    const fn default_grow_to_fit_coverage() -> f32 {
        0.8
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let cfg = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(cfg)
    }

    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(err) => {
                eprintln!("[manip] Config load error: {err:?}. Falling back to defaults.");
                Self::default()
            }
        }
    }
}

impl Default for ManipConfig {
    fn default() -> Self {
        Self {
            move_delay: Self::default_move_delay(),
            motion_threshold: Self::default_motion_threshold(),
            grow_to_fit_coverage: Self::default_grow_to_fit_coverage(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragMode {
    /// Button is down but the press still counts as a click.
    Select,
    /// The press became a drag; a mode handler runs every frame.
    Move,
}

struct DragState {
    mode: DragMode,
    constraint: Option<Handle>,
    hit_pt: Vec3,
    hit_pt_dist: f32,
    prev_hit: Vec3,
    f_hit_init: bool,
    f_scale_init: bool,
    rotation_center: Vec2,
    last_crank_angle: f32,
    f_widget_top: bool,
    rotate_axis: Axis,
    init_scale: Vec3,
    init_scale_mag: f32,
    xlate_sf: f32,
    delta_near_x: f32,
    f_mouse_x: bool,
    f_mouse_y: bool,
    coa_center: Vec2,
    last_angle: f32,
    watch_init: Vec2,
}

impl DragState {
    fn new(watch_init: Vec2) -> Self {
        Self {
            mode: DragMode::Select,
            constraint: None,
            hit_pt: Vec3::ZERO,
            hit_pt_dist: 0.0,
            prev_hit: Vec3::ZERO,
            f_hit_init: true,
            f_scale_init: true,
            rotation_center: Vec2::ZERO,
            last_crank_angle: 0.0,
            f_widget_top: false,
            rotate_axis: Axis::X,
            init_scale: Vec3::ONE,
            init_scale_mag: 0.0,
            xlate_sf: 0.0,
            delta_near_x: 0.0,
            f_mouse_x: false,
            f_mouse_y: false,
            coa_center: Vec2::ZERO,
            last_angle: 0.0,
            watch_init,
        }
    }
}

/// Everything the manipulation logic reads and writes each frame: the scene,
/// the viewing camera, the viewport, and the session-level stores.
pub struct ManipulationContext {
    pub scene: SceneGraph,
    pub camera: NodeId,
    pub dr: DisplayRegion,
    pub selection: Selection,
    pub undo: UndoStack,
    pub events: crate::events::EventBus,
}

impl ManipulationContext {
    pub fn new(scene: SceneGraph, camera: NodeId, dr: DisplayRegion) -> Self {
        Self {
            scene,
            camera,
            dr,
            selection: Selection::default(),
            undo: UndoStack::new(),
            events: crate::events::EventBus::default(),
        }
    }

    /// Reparents `node` under `new_parent`, refusing requests that would
    /// make a node its own ancestor. `wrt` keeps the world pose.
    pub fn reparent(&mut self, node: NodeId, new_parent: NodeId, wrt: bool) -> bool {
        if !self.scene.is_not_cycle(node, new_parent) {
            eprintln!(
                "[manip] reparent: {} cannot become a child of {}",
                self.scene.node(node).name,
                self.scene.node(new_parent).name
            );
            return false;
        }
        let old_parent = self.scene.parent_of(node).unwrap_or(self.scene.root());
        if wrt {
            self.scene.wrt_reparent_to(node, new_parent);
        } else {
            self.scene.reparent_to(node, new_parent);
        }
        self.events.push(DirectEvent::Reparent { node, old_parent, new_parent });
        true
    }
}

struct FollowState {
    base: NodeId,
    pos: Vec3,
    rot: Quat,
}

/// The drag state machine plus the widget and tasks it drives.
pub struct ManipulationControl {
    pub handles: ObjectHandles,
    pub tasks: TaskManager,
    drag: Option<DragState>,
    mods: ModifierSnapshot,
    f_set_coa: bool,
    f_free_manip: bool,
    f_scaling: bool,
    enabled: bool,
    manip_ref: NodeId,
    follow: Option<FollowState>,
    config: ManipConfig,
}

impl ManipulationControl {
    pub fn new(ctx: &mut ManipulationContext, config: ManipConfig) -> Self {
        let root = ctx.scene.root();
        let handles = ObjectHandles::new(&mut ctx.scene, root);
        let manip_ref = ctx.scene.attach_new_node(root, "manipRef");
        ctx.scene.hide(manip_ref);
        Self {
            handles,
            tasks: TaskManager::default(),
            drag: None,
            mods: ModifierSnapshot::default(),
            f_set_coa: false,
            f_free_manip: true,
            f_scaling: false,
            enabled: false,
            manip_ref,
            follow: None,
            config,
        }
    }

    pub fn enable_manipulation(&mut self) {
        self.enabled = true;
        self.tasks.add(TaskKey::HighlightWidget);
    }

    pub fn disable_manipulation(&mut self) {
        self.enabled = false;
        self.tasks.remove(TaskKey::ManipulateObject);
        self.tasks.remove(TaskKey::ManipMoveWait);
        self.tasks.remove(TaskKey::ManipWatchMouse);
        self.tasks.remove(TaskKey::HighlightWidget);
        self.tasks.remove(TaskKey::FollowSelectedNodePath);
        self.drag = None;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// While center-of-action mode is on, drags move the widget relative to
    /// the selection instead of moving the selection.
    pub fn toggle_object_handles_mode(&mut self) {
        self.f_set_coa = !self.f_set_coa;
        if self.f_set_coa {
            self.handles.coa_mode_color();
        } else {
            self.handles.manip_mode_color();
        }
    }

    pub fn coa_mode(&self) -> bool {
        self.f_set_coa
    }

    /// Disables the unconstrained (no handle picked) drag modes.
    pub fn set_free_manipulation(&mut self, free: bool) {
        self.f_free_manip = free;
    }

    pub fn drag_mode(&self) -> Option<DragMode> {
        self.drag.as_ref().map(|d| d.mode)
    }

    pub fn drag_constraint(&self) -> Option<Handle> {
        self.drag.as_ref().and_then(|d| d.constraint)
    }

    pub fn drag_hit_point(&self) -> Option<Vec3> {
        self.drag.as_ref().map(|d| d.hit_pt)
    }

    pub fn drag_hit_distance(&self) -> Option<f32> {
        self.drag.as_ref().map(|d| d.hit_pt_dist)
    }

    /// Button press. Picks the widget for a constraint and arms the two
    /// watchers that decide between click and drag.
    pub fn manipulation_start(&mut self, ctx: &mut ManipulationContext) {
        if !self.enabled {
            return;
        }
        let mut drag = DragState::new(ctx.dr.mouse());
        if let Some(hit) = self.handles.pick(&ctx.scene, ctx.camera, &ctx.dr) {
            drag.constraint = Some(hit.handle);
            drag.hit_pt = hit.point;
            drag.hit_pt_dist = hit.t;
        }
        self.drag = Some(drag);
        self.tasks.do_later(self.config.move_delay, TaskKey::ManipMoveWait);
        self.tasks.add(TaskKey::ManipWatchMouse);
    }

    /// Button release. A press that never became a drag resolves as a
    /// selection click; a drag resolves through cleanup.
    pub fn manipulation_stop(&mut self, ctx: &mut ManipulationContext) {
        self.tasks.remove(TaskKey::ManipulateObject);
        self.tasks.remove(TaskKey::ManipMoveWait);
        self.tasks.remove(TaskKey::ManipWatchMouse);
        match self.drag.as_ref().map(|d| d.mode) {
            Some(DragMode::Select) => {
                let mut skip = SkipFlags::HIDDEN | SkipFlags::BACKFACE;
                if !self.mods.control {
                    skip |= SkipFlags::CAMERA;
                }
                match pick_geom(&ctx.scene, ctx.camera, &ctx.dr, skip) {
                    Some(hit) => self.select_node(ctx, hit.node, self.mods.shift),
                    None => self.deselect_all(ctx),
                }
            }
            Some(DragMode::Move) => self.manipulate_object_cleanup(ctx),
            None => {}
        }
        self.drag = None;
    }

    pub fn select_node(&mut self, ctx: &mut ManipulationContext, node: NodeId, extend: bool) {
        ctx.events.push(DirectEvent::PreSelectNodePath(node));
        ctx.selection.select(node, extend, &mut ctx.events);
        self.handles.activate(&mut ctx.scene);
        self.spawn_follow_selected_node_path_task(ctx);
        self.place_widget_on_follow_target(ctx);
        self.handles.grow_to_fit(
            &ctx.scene,
            ctx.camera,
            &ctx.dr,
            &mut self.tasks,
            self.config.grow_to_fit_coverage,
        );
    }

    pub fn deselect_all(&mut self, ctx: &mut ManipulationContext) {
        ctx.selection.deselect_all(&mut ctx.events);
        self.handles.deactivate(&mut ctx.scene);
        self.tasks.remove(TaskKey::FollowSelectedNodePath);
        self.follow = None;
    }

    fn spawn_follow_selected_node_path_task(&mut self, ctx: &ManipulationContext) {
        let Some(last) = ctx.selection.last() else {
            return;
        };
        let (_, rot, pos) = last.coa_to_node.to_scale_rotation_translation();
        self.follow = Some(FollowState { base: last.node, pos, rot });
        self.tasks.add(TaskKey::FollowSelectedNodePath);
    }

    fn place_widget_on_follow_target(&self, ctx: &mut ManipulationContext) {
        if let Some(f) = self.follow.as_ref() {
            ctx.scene.set_pos_quat_wrt(self.handles.widget, f.base, f.pos, f.rot);
        }
    }

    /// Promotes the press to a drag: snapshots poses for undo and for the
    /// widget-relative motion, and starts the per-frame handler.
    fn manipulate_object(&mut self, ctx: &mut ManipulationContext) {
        if ctx.selection.is_empty() {
            return;
        }
        let Some(drag) = self.drag.as_mut() else {
            return;
        };
        drag.mode = DragMode::Move;
        self.tasks.remove(TaskKey::FollowSelectedNodePath);
        self.tasks.remove(TaskKey::HighlightWidget);
        self.handles.set_hovered(None);
        ctx.undo.push_undo(&ctx.scene, &ctx.selection.node_ids(), &mut ctx.events);
        self.handles.show_guides();
        if let Some(constraint) = drag.constraint {
            self.handles.hide_all_handles();
            self.handles.show_handle(HandleSet::One(constraint));
        }
        ctx.selection.get_wrt_all(&ctx.scene, self.handles.widget);
        ctx.selection.dehighlight_all();
        ctx.events.push(DirectEvent::ManipulateObjectStart);

        drag.f_hit_init = true;
        drag.f_scale_init = true;
        drag.f_mouse_x = ctx.dr.mouse_x.abs() > 0.9;
        drag.f_mouse_y = ctx.dr.mouse_y.abs() > 0.9;
        drag.coa_center = screen_xy(&ctx.scene, ctx.camera, self.handles.widget, &ctx.dr);
        if drag.f_mouse_x && drag.f_mouse_y {
            drag.last_angle = crank_angle(drag.coa_center, ctx.dr.mouse());
        }
        self.tasks.add(TaskKey::ManipulateObject);
    }

    fn manipulate_object_task(&mut self, ctx: &mut ManipulationContext) {
        let Some(drag) = self.drag.as_mut() else {
            return;
        };
        let mods = self.mods;
        match drag.constraint {
            Some(Handle { axis, kind: HandleKind::Post }) => {
                xlate_1d(drag, &self.handles, ctx, axis);
            }
            Some(Handle { axis, kind: HandleKind::Disc }) => {
                xlate_2d(drag, &self.handles, ctx, axis);
            }
            Some(Handle { axis, kind: HandleKind::Ring }) => {
                rotate_1d(drag, &self.handles, ctx, axis);
            }
            None => {
                if !self.f_free_manip {
                    return;
                }
                if mods.control && !mods.shift {
                    self.f_scaling = true;
                    scale_3d(drag, &self.handles, ctx, self.manip_ref);
                } else if drag.f_mouse_x && drag.f_mouse_y {
                    rotate_about_view(drag, &self.handles, ctx);
                } else if drag.f_mouse_x || drag.f_mouse_y {
                    rotate_2d(drag, &self.handles, ctx);
                } else if mods.shift || mods.control {
                    xlate_cam_xy(drag, &self.handles, ctx, mods);
                } else {
                    xlate_cam_xz(drag, &self.handles, ctx);
                }
            }
        }
        if self.f_set_coa {
            if let Some(last) = ctx.selection.last_mut() {
                last.coa_to_node = ctx.scene.mat_wrt(self.handles.widget, last.node);
            }
        } else {
            ctx.selection.move_wrt_widget_all(&mut ctx.scene, self.handles.widget);
        }
    }

    fn manipulate_object_cleanup(&mut self, ctx: &mut ManipulationContext) {
        if self.f_scaling {
            self.handles.transfer_object_handles_scale(&mut ctx.scene);
            self.f_scaling = false;
        }
        ctx.selection.highlight_all();
        self.handles.show_all_handles();
        self.handles.hide_guides();
        self.spawn_follow_selected_node_path_task(ctx);
        self.tasks.add(TaskKey::HighlightWidget);
        ctx.events.push(DirectEvent::ManipulateObjectCleanup);
    }

    /// Teleports the selection onto the surface point under the cursor.
    pub fn plant_selected_node_path(&mut self, ctx: &mut ManipulationContext) {
        if ctx.selection.is_empty() {
            return;
        }
        let skip = SkipFlags::HIDDEN | SkipFlags::BACKFACE | SkipFlags::CAMERA;
        let Some(hit) = pick_geom(&ctx.scene, ctx.camera, &ctx.dr, skip) else {
            return;
        };
        ctx.undo.push_undo(&ctx.scene, &ctx.selection.node_ids(), &mut ctx.events);
        ctx.selection.get_wrt_all(&ctx.scene, self.handles.widget);
        let point = hit.surface_point(&ctx.scene, ctx.camera);
        ctx.scene.set_pos_wrt(self.handles.widget, ctx.camera, point);
        ctx.selection.move_wrt_widget_all(&mut ctx.scene, self.handles.widget);
        ctx.events.push(DirectEvent::ManipulateObjectCleanup);
    }

    /// Runs one frame: drains due tasks in spawn order and dispatches them.
    /// Both drag watchers may fire in the same frame; whichever runs first
    /// flips the mode and the other sees the guard fail.
    pub fn update(&mut self, dt: f32, ctx: &mut ManipulationContext, mods: ModifierSnapshot) {
        self.mods = mods;
        let due = self.tasks.tick(dt);
        for key in due {
            match key {
                TaskKey::ManipMoveWait => {
                    if self.drag_mode() == Some(DragMode::Select) {
                        self.tasks.remove(TaskKey::ManipWatchMouse);
                        self.manipulate_object(ctx);
                    }
                }
                TaskKey::ManipWatchMouse => {
                    // Per-axis test, not Euclidean distance.
                    let moved = self.drag.as_ref().map_or(false, |d| {
                        let delta = ctx.dr.mouse() - d.watch_init;
                        delta.x.abs() > self.config.motion_threshold
                            || delta.y.abs() > self.config.motion_threshold
                    });
                    if self.drag_mode() == Some(DragMode::Select) && moved {
                        self.tasks.remove(TaskKey::ManipMoveWait);
                        self.manipulate_object(ctx);
                    }
                }
                TaskKey::ManipulateObject => {
                    if self.drag_mode() == Some(DragMode::Move) {
                        self.manipulate_object_task(ctx);
                    }
                }
                TaskKey::FollowSelectedNodePath => {
                    self.place_widget_on_follow_target(ctx);
                }
                TaskKey::HighlightWidget => {
                    if self.drag.is_none() {
                        let hit = self.handles.pick(&ctx.scene, ctx.camera, &ctx.dr);
                        self.handles.set_hovered(hit.map(|h| h.handle));
                    }
                }
                TaskKey::ResizeObjectHandles => {
                    if self.handles.update_resize(dt, &mut ctx.scene) {
                        self.tasks.remove(TaskKey::ResizeObjectHandles);
                    }
                }
            }
        }
    }

    /// Routes the frame's buffered input into manipulation actions.
    pub fn process_input(&mut self, ctx: &mut ManipulationContext, input: &mut Input) {
        self.mods = input.modifiers();
        if input.take_toggle_coa() {
            self.toggle_object_handles_mode();
        }
        for _ in 0..input.take_widget_scale_up() {
            self.handles.multiply_scaling_factor_by(&ctx.scene, &mut self.tasks, 2.0);
        }
        for _ in 0..input.take_widget_scale_down() {
            self.handles.multiply_scaling_factor_by(&ctx.scene, &mut self.tasks, 0.5);
        }
        if input.take_grow_to_fit() {
            self.handles.grow_to_fit(
                &ctx.scene,
                ctx.camera,
                &ctx.dr,
                &mut self.tasks,
                self.config.grow_to_fit_coverage,
            );
        }
        if input.take_plant_selected() {
            self.plant_selected_node_path(ctx);
        }
        if input.take_left_click() {
            self.manipulation_start(ctx);
        }
        if input.take_left_release() {
            self.manipulation_stop(ctx);
        }
    }
}

/// True when the camera looks at the widget from the axis's positive side.
pub fn widget_check_top(scene: &SceneGraph, camera: NodeId, widget: NodeId, axis: Axis) -> bool {
    widget_axis_view_dot(scene, camera, widget, axis) < 0.0
}

/// True when the axis is seen nearly edge-on.
pub fn widget_check_edge(scene: &SceneGraph, camera: NodeId, widget: NodeId, axis: Axis) -> bool {
    widget_axis_view_dot(scene, camera, widget, axis).abs() < 0.2
}

fn widget_axis_view_dot(scene: &SceneGraph, camera: NodeId, widget: NodeId, axis: Axis) -> f32 {
    let m = scene.mat_wrt(widget, camera);
    let view_dir = m.transform_point3(Vec3::ZERO).normalize_or_zero();
    let widget_axis = m.transform_vector3(axis.unit()).normalize_or_zero();
    widget_axis.dot(view_dir)
}

/// Slide along one axis. The hit is computed in the widget's own frame, so
/// after the move the recomputed hit returns to the initial value and the
/// saved first hit keeps working as the reference.
fn xlate_1d(
    drag: &mut DragState,
    handles: &ObjectHandles,
    ctx: &mut ManipulationContext,
    axis: Axis,
) {
    let hit = handles.get_axis_intersect_pt(&ctx.scene, ctx.camera, &ctx.dr, axis);
    if drag.f_hit_init {
        drag.f_hit_init = false;
        drag.prev_hit = hit;
    } else {
        let offset = hit - drag.prev_hit;
        ctx.scene.set_pos_wrt(handles.widget, handles.widget, offset);
    }
}

/// Slide in the plane perpendicular to one axis.
fn xlate_2d(
    drag: &mut DragState,
    handles: &ObjectHandles,
    ctx: &mut ManipulationContext,
    axis: Axis,
) {
    let hit =
        handles.get_widget_intersect_pt(&ctx.scene, ctx.camera, &ctx.dr, handles.widget, axis);
    if drag.f_hit_init {
        drag.f_hit_init = false;
        drag.prev_hit = hit;
    } else {
        let offset = hit - drag.prev_hit;
        ctx.scene.set_pos_wrt(handles.widget, handles.widget, offset);
    }
}

/// Crank rotation about one axis, driven by the mouse angle around the
/// widget's screen position.
fn rotate_1d(
    drag: &mut DragState,
    handles: &ObjectHandles,
    ctx: &mut ManipulationContext,
    axis: Axis,
) {
    if drag.f_hit_init {
        drag.f_hit_init = false;
        drag.rotate_axis = axis;
        drag.f_widget_top = widget_check_top(&ctx.scene, ctx.camera, handles.widget, axis);
        drag.rotation_center = screen_xy(&ctx.scene, ctx.camera, handles.widget, &ctx.dr);
        drag.last_crank_angle = crank_angle(drag.rotation_center, ctx.dr.mouse());
    }
    let new_angle = crank_angle(drag.rotation_center, ctx.dr.mouse());
    let mut delta = drag.last_crank_angle - new_angle;
    if drag.f_widget_top {
        delta = -delta;
    }
    let widget = handles.widget;
    match drag.rotate_axis {
        Axis::X => ctx.scene.set_hpr_wrt(widget, widget, Vec3::new(0.0, delta, 0.0)),
        Axis::Y => {
            let roll = if TEMP_HPR_FIX { delta } else { -delta };
            ctx.scene.set_hpr_wrt(widget, widget, Vec3::new(0.0, 0.0, roll));
        }
        Axis::Z => ctx.scene.set_hpr_wrt(widget, widget, Vec3::new(delta, 0.0, 0.0)),
    }
    drag.last_crank_angle = new_angle;
}

/// Trackball tumble from a screen-edge drag. Motion along the entered edge
/// is ignored so the tumble axis stays stable.
fn rotate_2d(drag: &mut DragState, handles: &ObjectHandles, ctx: &mut ManipulationContext) {
    drag.f_hit_init = true;
    drag.f_scale_init = true;
    let dx = if drag.f_mouse_x && ctx.dr.mouse_x.abs() > 0.9 { 0.0 } else { ctx.dr.mouse_delta_x };
    let dy = if drag.f_mouse_y && ctx.dr.mouse_y.abs() > 0.9 { 0.0 } else { ctx.dr.mouse_delta_y };
    ctx.scene.rel_hpr(
        handles.widget,
        ctx.camera,
        Vec3::new(dx * TUMBLE_RATE, -dy * TUMBLE_RATE, 0.0),
    );
}

/// Roll about the view vector, cranked around the widget's screen position.
fn rotate_about_view(drag: &mut DragState, handles: &ObjectHandles, ctx: &mut ManipulationContext) {
    drag.f_hit_init = true;
    drag.f_scale_init = true;
    let angle = crank_angle(drag.coa_center, ctx.dr.mouse());
    let delta = angle - drag.last_angle;
    drag.last_angle = angle;
    let roll = if TEMP_HPR_FIX { -delta } else { delta };
    ctx.scene.rel_hpr(handles.widget, ctx.camera, Vec3::new(0.0, 0.0, roll));
}

/// Slide in the camera's view plane (horizontal and vertical).
fn xlate_cam_xz(drag: &mut DragState, handles: &ObjectHandles, ctx: &mut ManipulationContext) {
    drag.f_hit_init = true;
    drag.f_scale_init = true;
    let mut v = ctx.scene.pos_wrt(handles.widget, ctx.camera);
    let depth = v.y / ctx.dr.near;
    v.x += 0.5 * ctx.dr.mouse_delta_x * ctx.dr.near_width * depth;
    v.z += 0.5 * ctx.dr.mouse_delta_y * ctx.dr.near_height * depth;
    ctx.scene.set_pos_wrt(handles.widget, ctx.camera, v);
}

/// Slide in the camera's horizontal plane: vertical mouse motion pushes the
/// widget away or pulls it closer, horizontal motion keeps it under the
/// cursor. With control held the push direction is the eye-to-widget line.
fn xlate_cam_xy(
    drag: &mut DragState,
    handles: &ObjectHandles,
    ctx: &mut ManipulationContext,
    mods: ModifierSnapshot,
) {
    drag.f_scale_init = true;
    let mut v = ctx.scene.pos_wrt(handles.widget, ctx.camera);
    if drag.f_hit_init {
        drag.f_hit_init = false;
        drag.xlate_sf = v.length();
        let coa = near_projection_point(&ctx.scene, ctx.camera, handles.widget, &ctx.dr);
        drag.delta_near_x = coa.x - ctx.dr.near_vec().x;
    }
    let move_dir = if mods.control {
        let mut d = v.normalize_or_zero();
        if d.y < 0.0 {
            d = -d;
        }
        d
    } else {
        Vec3::Y
    };
    v += move_dir * (2.0 * ctx.dr.mouse_delta_y * drag.xlate_sf);
    v.x = (ctx.dr.near_vec().x + drag.delta_near_x) * (v.y / ctx.dr.near);
    ctx.scene.set_pos_wrt(handles.widget, ctx.camera, v);
}

/// Uniform scale about the widget origin, driven by the cursor's distance
/// from the widget on a camera-facing reference plane.
fn scale_3d(
    drag: &mut DragState,
    handles: &ObjectHandles,
    ctx: &mut ManipulationContext,
    manip_ref: NodeId,
) {
    if drag.f_scale_init {
        drag.f_scale_init = false;
        ctx.scene.set_pos_wrt(manip_ref, handles.widget, Vec3::ZERO);
        ctx.scene.set_hpr_wrt(manip_ref, ctx.camera, Vec3::ZERO);
        drag.init_scale_mag = handles
            .get_widget_intersect_pt(&ctx.scene, ctx.camera, &ctx.dr, manip_ref, Axis::Y)
            .length();
        drag.init_scale = ctx.scene.node(handles.widget).transform.scale;
    }
    drag.f_hit_init = true;
    if drag.init_scale_mag > f32::EPSILON {
        let mag = handles
            .get_widget_intersect_pt(&ctx.scene, ctx.camera, &ctx.dr, manip_ref, Axis::Y)
            .length();
        ctx.scene.node_mut(handles.widget).transform.scale =
            drag.init_scale * (mag / drag.init_scale_mag);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn context() -> ManipulationContext {
        let mut scene = SceneGraph::new();
        let camera = scene.attach_new_node(scene.root(), "camera");
        scene.node_mut(camera).transform.translation = Vec3::new(0.0, -10.0, 0.0);
        ManipulationContext::new(scene, camera, DisplayRegion::new(1.0, 2.0, 2.0))
    }

    #[test]
    fn widget_checks_classify_view_alignment() {
        let ctx = context();
        let mut scene = ctx.scene;
        let widget = scene.attach_new_node(scene.root(), "w");
        // Y axis points straight away from the camera: neither top nor edge.
        assert!(!widget_check_top(&scene, ctx.camera, widget, Axis::Y));
        assert!(!widget_check_edge(&scene, ctx.camera, widget, Axis::Y));
        // X and Z are seen edge-on.
        assert!(widget_check_edge(&scene, ctx.camera, widget, Axis::X));
        assert!(widget_check_edge(&scene, ctx.camera, widget, Axis::Z));
        // Flip the widget so its Y axis faces the camera.
        scene.node_mut(widget).transform.set_hpr(Vec3::new(180.0, 0.0, 0.0));
        assert!(widget_check_top(&scene, ctx.camera, widget, Axis::Y));
    }

    #[test]
    fn coa_mode_toggles_widget_tint() {
        let mut ctx = context();
        let mut control = ManipulationControl::new(&mut ctx, ManipConfig::default());
        assert!(!control.coa_mode());
        assert_eq!(control.handles.tint(), None);
        control.toggle_object_handles_mode();
        assert!(control.coa_mode());
        assert_eq!(control.handles.tint(), Some(crate::handles::COA_MODE_COLOR));
        control.toggle_object_handles_mode();
        assert_eq!(control.handles.tint(), None);
    }

    #[test]
    fn reparent_refuses_cycles_and_reports_moves() {
        let mut ctx = context();
        let a = ctx.scene.attach_new_node(ctx.scene.root(), "a");
        let b = ctx.scene.attach_new_node(a, "b");
        assert!(!ctx.reparent(a, b, true));
        assert!(ctx.events.drain().is_empty());
        let other = ctx.scene.attach_new_node(ctx.scene.root(), "other");
        assert!(ctx.reparent(b, other, true));
        let fired = ctx.events.drain();
        assert!(fired
            .contains(&DirectEvent::Reparent { node: b, old_parent: a, new_parent: other }));
    }

    #[test]
    fn config_defaults_fill_missing_fields() {
        let cfg: ManipConfig = serde_json::from_str("{\"move_delay\": 0.5}").unwrap();
        assert_eq!(cfg.move_delay, 0.5);
        assert_eq!(cfg.motion_threshold, MANIPULATION_MOVE_THRESHOLD);
        assert_eq!(cfg.grow_to_fit_coverage, 0.8);
    }

    #[test]
    fn config_falls_back_on_bad_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"not json").unwrap();
        let cfg = ManipConfig::load_or_default(file.path());
        assert_eq!(cfg.move_delay, MANIPULATION_MOVE_DELAY);
        assert!(ManipConfig::load(file.path()).is_err());
        let cfg = ManipConfig::load_or_default("/nonexistent/manip.json");
        assert_eq!(cfg.motion_threshold, MANIPULATION_MOVE_THRESHOLD);
    }

    #[test]
    fn disable_cancels_pending_watchers() {
        let mut ctx = context();
        let ball = ctx.scene.attach_new_node(ctx.scene.root(), "ball");
        ctx.scene.node_mut(ball).transform.translation = Vec3::new(0.0, 5.0, 0.0);
        ctx.scene.node_mut(ball).pickable = true;
        ctx.scene.node_mut(ball).radius = 1.0;
        let mut control = ManipulationControl::new(&mut ctx, ManipConfig::default());
        control.enable_manipulation();
        control.manipulation_start(&mut ctx);
        assert!(control.tasks.contains(TaskKey::ManipMoveWait));
        assert!(control.tasks.contains(TaskKey::ManipWatchMouse));
        control.disable_manipulation();
        assert!(control.tasks.is_empty());
        assert_eq!(control.drag_mode(), None);
        // Starting while disabled is a no-op.
        control.manipulation_start(&mut ctx);
        assert_eq!(control.drag_mode(), None);
    }
}
