use smallvec::SmallVec;

/// Named singleton tasks. Task identity is the key: adding a task first
/// removes any existing task with the same key, which is also how pending
/// timeouts and tweens get cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKey {
    ManipulateObject,
    ManipMoveWait,
    ManipWatchMouse,
    FollowSelectedNodePath,
    HighlightWidget,
    ResizeObjectHandles,
}

impl TaskKey {
    pub fn name(self) -> &'static str {
        match self {
            TaskKey::ManipulateObject => "manipulateObject",
            TaskKey::ManipMoveWait => "manip-move-wait",
            TaskKey::ManipWatchMouse => "manip-watch-mouse",
            TaskKey::FollowSelectedNodePath => "followSelectedNodePath",
            TaskKey::HighlightWidget => "highlightWidgetTask",
            TaskKey::ResizeObjectHandles => "resizeObjectHandles",
        }
    }
}

enum TaskKind {
    EveryFrame,
    DoLater { remaining: f32 },
}

struct TaskEntry {
    key: TaskKey,
    kind: TaskKind,
}

/// Single-threaded cooperative scheduler. Per-frame tasks run in spawn
/// order; delayed tasks fire once when their timer elapses and are removed.
#[derive(Default)]
pub struct TaskManager {
    entries: Vec<TaskEntry>,
}

impl TaskManager {
    pub fn add(&mut self, key: TaskKey) {
        self.remove(key);
        self.entries.push(TaskEntry { key, kind: TaskKind::EveryFrame });
    }

    pub fn do_later(&mut self, delay: f32, key: TaskKey) {
        self.remove(key);
        self.entries.push(TaskEntry { key, kind: TaskKind::DoLater { remaining: delay } });
    }

    /// Removing an absent key is a no-op.
    pub fn remove(&mut self, key: TaskKey) {
        self.entries.retain(|e| e.key != key);
    }

    pub fn contains(&self, key: TaskKey) -> bool {
        self.entries.iter().any(|e| e.key == key)
    }

    pub fn count(&self, key: TaskKey) -> usize {
        self.entries.iter().filter(|e| e.key == key).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Advances timers by `dt` and returns the keys due this frame in spawn
    /// order. Fired delayed tasks are dropped from the schedule.
    pub fn tick(&mut self, dt: f32) -> SmallVec<[TaskKey; 6]> {
        let mut due = SmallVec::new();
        for entry in self.entries.iter_mut() {
            match &mut entry.kind {
                TaskKind::EveryFrame => due.push(entry.key),
                TaskKind::DoLater { remaining } => {
                    *remaining -= dt;
                    if *remaining <= 0.0 {
                        due.push(entry.key);
                    }
                }
            }
        }
        self.entries
            .retain(|e| !matches!(&e.kind, TaskKind::DoLater { remaining } if *remaining <= 0.0));
        due
    }
}
