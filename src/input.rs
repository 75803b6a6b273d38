use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use winit::event::{ElementState, MouseButton, WindowEvent};
use winit::keyboard::{Key, NamedKey};

/// Modifier keys sampled once per frame. The drag logic reads these, never
/// the raw key stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModifierSnapshot {
    pub shift: bool,
    pub control: bool,
    pub alt: bool,
}

pub struct Input {
    bindings: InputBindings,
    pub events: Vec<InputEvent>,
    toggle_coa_pressed: bool,
    widget_scale_up_presses: u32,
    widget_scale_down_presses: u32,
    grow_to_fit_pressed: bool,
    plant_selected_pressed: bool,
    shift_held: bool,
    control_held: bool,
    alt_held: bool,
    left_pressed: bool,
    left_clicked: bool,
    left_released: bool,
}

impl Input {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(path: impl AsRef<Path>) -> Self {
        let bindings = InputBindings::load_or_default(path);
        Self::with_bindings(bindings)
    }

    fn with_bindings(bindings: InputBindings) -> Self {
        Self {
            bindings,
            events: Vec::new(),
            toggle_coa_pressed: false,
            widget_scale_up_presses: 0,
            widget_scale_down_presses: 0,
            grow_to_fit_pressed: false,
            plant_selected_pressed: false,
            shift_held: false,
            control_held: false,
            alt_held: false,
            left_pressed: false,
            left_clicked: false,
            left_released: false,
        }
    }

    pub fn push(&mut self, ev: InputEvent) {
        match &ev {
            InputEvent::Key { key, pressed } => {
                self.apply_key_binding(key, *pressed);
            }
            InputEvent::MouseButton { button, pressed } => {
                if *button == MouseButton::Left {
                    if *pressed {
                        self.left_clicked = true;
                        self.left_pressed = true;
                    } else {
                        if self.left_pressed {
                            self.left_released = true;
                        }
                        self.left_pressed = false;
                    }
                }
            }
            InputEvent::Other => {}
        }
        self.events.push(ev);
    }

    pub fn clear_frame(&mut self) {
        self.events.clear();
        self.left_clicked = false;
        self.left_released = false;
        self.toggle_coa_pressed = false;
        self.grow_to_fit_pressed = false;
        self.plant_selected_pressed = false;
        self.widget_scale_up_presses = 0;
        self.widget_scale_down_presses = 0;
    }

    pub fn modifiers(&self) -> ModifierSnapshot {
        ModifierSnapshot {
            shift: self.shift_held,
            control: self.control_held,
            alt: self.alt_held,
        }
    }

    pub fn take_toggle_coa(&mut self) -> bool {
        let v = self.toggle_coa_pressed;
        self.toggle_coa_pressed = false;
        v
    }

    /// Number of scale-up presses since the last take. Rapid repeats within
    /// one frame all count.
    pub fn take_widget_scale_up(&mut self) -> u32 {
        let v = self.widget_scale_up_presses;
        self.widget_scale_up_presses = 0;
        v
    }

    pub fn take_widget_scale_down(&mut self) -> u32 {
        let v = self.widget_scale_down_presses;
        self.widget_scale_down_presses = 0;
        v
    }

    pub fn take_grow_to_fit(&mut self) -> bool {
        let v = self.grow_to_fit_pressed;
        self.grow_to_fit_pressed = false;
        v
    }

    pub fn take_plant_selected(&mut self) -> bool {
        let v = self.plant_selected_pressed;
        self.plant_selected_pressed = false;
        v
    }

    pub fn take_left_click(&mut self) -> bool {
        let was = self.left_clicked;
        self.left_clicked = false;
        was
    }

    pub fn take_left_release(&mut self) -> bool {
        let was = self.left_released;
        self.left_released = false;
        was
    }

    pub fn left_held(&self) -> bool {
        self.left_pressed
    }

    fn apply_key_binding(&mut self, key: &Key, pressed: bool) {
        if let Some(binding_key) = InputKeyBinding::from_event_key(key) {
            let actions: Vec<_> = self.bindings.actions_for_key(&binding_key).collect();
            for action in actions {
                self.update_action_state(action, pressed);
            }
        }
    }

    fn update_action_state(&mut self, action: InputAction, pressed: bool) {
        match action {
            InputAction::ToggleCoaMode => {
                if pressed {
                    self.toggle_coa_pressed = true;
                }
            }
            InputAction::WidgetScaleUp => {
                if pressed {
                    self.widget_scale_up_presses += 1;
                }
            }
            InputAction::WidgetScaleDown => {
                if pressed {
                    self.widget_scale_down_presses += 1;
                }
            }
            InputAction::GrowToFit => {
                // Shifted chord; the bare key is reserved for camera fit.
                if pressed && self.shift_held {
                    self.grow_to_fit_pressed = true;
                }
            }
            InputAction::PlantSelected => {
                if pressed {
                    self.plant_selected_pressed = true;
                }
            }
            InputAction::ModifierShift => self.shift_held = pressed,
            InputAction::ModifierControl => self.control_held = pressed,
            InputAction::ModifierAlt => self.alt_held = pressed,
        }
    }
}

impl Default for Input {
    fn default() -> Self {
        Self::with_bindings(InputBindings::default())
    }
}

#[derive(Debug, Clone)]
struct InputBindings {
    key_to_actions: HashMap<InputKeyBinding, Vec<InputAction>>,
}

impl InputBindings {
    fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<InputConfigFile>(&contents) {
                Ok(config) => Self::from_config(config, &path.display().to_string()),
                Err(err) => {
                    eprintln!(
                        "[input] Failed to parse {}: {err}. Falling back to default bindings.",
                        path.display()
                    );
                    Self::default()
                }
            },
            Err(err) => {
                eprintln!(
                    "[input] Failed to read {}: {err}. Falling back to default bindings.",
                    path.display()
                );
                Self::default()
            }
        }
    }

    fn from_config(config: InputConfigFile, origin: &str) -> Self {
        let overrides = config.into_overrides(origin);
        Self::with_overrides(overrides)
    }

    fn with_overrides(overrides: HashMap<InputAction, Vec<InputKeyBinding>>) -> Self {
        let mut action_map = Self::default_action_map();
        for (action, keys) in overrides {
            if keys.is_empty() {
                continue;
            }
            action_map.insert(action, keys);
        }
        Self::from_action_map(action_map)
    }

    fn default_action_map() -> HashMap<InputAction, Vec<InputKeyBinding>> {
        use InputAction::*;
        let mut map = HashMap::new();
        map.insert(ToggleCoaMode, vec![InputKeyBinding::named(NamedKeyCode::Tab)]);
        map.insert(
            WidgetScaleUp,
            vec![InputKeyBinding::character("."), InputKeyBinding::character(">")],
        );
        map.insert(
            WidgetScaleDown,
            vec![InputKeyBinding::character(","), InputKeyBinding::character("<")],
        );
        map.insert(GrowToFit, vec![InputKeyBinding::character("f")]);
        map.insert(PlantSelected, vec![InputKeyBinding::character("i")]);
        map.insert(ModifierShift, vec![InputKeyBinding::named(NamedKeyCode::Shift)]);
        map.insert(ModifierControl, vec![InputKeyBinding::named(NamedKeyCode::Control)]);
        map.insert(ModifierAlt, vec![InputKeyBinding::named(NamedKeyCode::Alt)]);
        map
    }

    fn from_action_map(action_map: HashMap<InputAction, Vec<InputKeyBinding>>) -> Self {
        let mut key_to_actions: HashMap<InputKeyBinding, Vec<InputAction>> = HashMap::new();
        for (action, keys) in action_map {
            for key in keys {
                key_to_actions.entry(key).or_default().push(action);
            }
        }
        Self { key_to_actions }
    }

    fn actions_for_key(&self, key: &InputKeyBinding) -> impl Iterator<Item = InputAction> + '_ {
        self.key_to_actions.get(key).into_iter().flatten().copied()
    }
}

impl Default for InputBindings {
    fn default() -> Self {
        Self::from_action_map(Self::default_action_map())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum InputKeyBinding {
    Character(String),
    Named(NamedKeyCode),
}

impl InputKeyBinding {
    fn character(ch: &str) -> Self {
        Self::Character(ch.to_lowercase())
    }

    fn named(named: NamedKeyCode) -> Self {
        Self::Named(named)
    }

    fn from_event_key(key: &Key) -> Option<Self> {
        match key {
            Key::Character(ch) => {
                let s = ch.to_string();
                if s.is_empty() {
                    None
                } else {
                    Some(Self::Character(s.to_lowercase()))
                }
            }
            Key::Named(named) => NamedKeyCode::from_named_key(named).map(Self::Named),
            _ => None,
        }
    }

    fn from_config_value(raw: &str) -> Result<Self, ()> {
        let normalized = raw.trim().to_lowercase();
        if normalized.is_empty() {
            return Err(());
        }
        if let Some(named) = NamedKeyCode::from_str(&normalized) {
            return Ok(Self::Named(named));
        }
        if normalized.chars().count() == 1 {
            return Ok(Self::Character(normalized));
        }
        Err(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum NamedKeyCode {
    Shift,
    Control,
    Alt,
    Tab,
}

impl NamedKeyCode {
    fn from_named_key(key: &NamedKey) -> Option<Self> {
        match key {
            NamedKey::Shift => Some(Self::Shift),
            NamedKey::Control => Some(Self::Control),
            NamedKey::Alt => Some(Self::Alt),
            NamedKey::Tab => Some(Self::Tab),
            _ => None,
        }
    }

    fn from_str(value: &str) -> Option<Self> {
        match value {
            "shift" | "left_shift" | "right_shift" => Some(Self::Shift),
            "ctrl" | "control" | "left_ctrl" | "right_ctrl" => Some(Self::Control),
            "alt" | "left_alt" | "right_alt" => Some(Self::Alt),
            "tab" => Some(Self::Tab),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum InputAction {
    ToggleCoaMode,
    WidgetScaleUp,
    WidgetScaleDown,
    GrowToFit,
    PlantSelected,
    ModifierShift,
    ModifierControl,
    ModifierAlt,
}

impl InputAction {
    fn from_str(value: &str) -> Option<Self> {
        match value {
            "toggle_coa_mode" => Some(Self::ToggleCoaMode),
            "widget_scale_up" => Some(Self::WidgetScaleUp),
            "widget_scale_down" => Some(Self::WidgetScaleDown),
            "grow_to_fit" => Some(Self::GrowToFit),
            "plant_selected" => Some(Self::PlantSelected),
            "modifier_shift" => Some(Self::ModifierShift),
            "modifier_control" => Some(Self::ModifierControl),
            "modifier_alt" => Some(Self::ModifierAlt),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct InputConfigFile {
    #[serde(default)]
    bindings: HashMap<String, Vec<String>>,
}

impl InputConfigFile {
    fn into_overrides(self, origin: &str) -> HashMap<InputAction, Vec<InputKeyBinding>> {
        let mut overrides = HashMap::new();
        for (action_name, keys) in self.bindings {
            let action_key = action_name.trim().to_lowercase();
            match InputAction::from_str(&action_key) {
                Some(action) => {
                    let mut parsed = Vec::new();
                    for key in keys {
                        match InputKeyBinding::from_config_value(&key) {
                            Ok(binding) => parsed.push(binding),
                            Err(_) => eprintln!(
                                "[input] {origin}: unknown key '{key}' for action '{action_name}', ignoring."
                            ),
                        }
                    }
                    if parsed.is_empty() {
                        eprintln!(
                            "[input] {origin}: action '{action_name}' has no valid keys, keeping defaults."
                        );
                        continue;
                    }
                    overrides.insert(action, parsed);
                }
                None => eprintln!("[input] {origin}: unknown action '{action_name}', ignoring."),
            }
        }
        overrides
    }
}

pub enum InputEvent {
    Key { key: Key, pressed: bool },
    MouseButton { button: MouseButton, pressed: bool },
    Other,
}

impl InputEvent {
    pub fn from_window_event(ev: &WindowEvent) -> Self {
        match ev {
            WindowEvent::MouseInput { state, button, .. } => InputEvent::MouseButton {
                button: *button,
                pressed: *state == ElementState::Pressed,
            },
            WindowEvent::KeyboardInput { event, .. } => InputEvent::Key {
                key: event.logical_key.clone(),
                pressed: event.state == ElementState::Pressed,
            },
            _ => InputEvent::Other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(input: &mut Input, ch: &str) {
        input.push(InputEvent::Key { key: Key::Character(ch.into()), pressed: true });
        input.push(InputEvent::Key { key: Key::Character(ch.into()), pressed: false });
    }

    fn hold_named(input: &mut Input, key: NamedKey, pressed: bool) {
        input.push(InputEvent::Key { key: Key::Named(key), pressed });
    }

    #[test]
    fn default_bindings_route_actions() {
        let mut input = Input::new();
        hold_named(&mut input, NamedKey::Tab, true);
        assert!(input.take_toggle_coa());
        assert!(!input.take_toggle_coa());
        press(&mut input, "i");
        assert!(input.take_plant_selected());
    }

    #[test]
    fn scale_presses_accumulate_within_a_frame() {
        let mut input = Input::new();
        for _ in 0..5 {
            press(&mut input, ".");
        }
        press(&mut input, ",");
        assert_eq!(input.take_widget_scale_up(), 5);
        assert_eq!(input.take_widget_scale_down(), 1);
        assert_eq!(input.take_widget_scale_up(), 0);
        // The shifted variants map to the same actions.
        press(&mut input, ">");
        assert_eq!(input.take_widget_scale_up(), 1);
    }

    #[test]
    fn grow_to_fit_requires_shift() {
        let mut input = Input::new();
        press(&mut input, "f");
        assert!(!input.take_grow_to_fit());
        hold_named(&mut input, NamedKey::Shift, true);
        press(&mut input, "f");
        assert!(input.take_grow_to_fit());
        assert!(input.modifiers().shift);
        hold_named(&mut input, NamedKey::Shift, false);
        assert!(!input.modifiers().shift);
    }

    #[test]
    fn left_button_edges_fire_once() {
        let mut input = Input::new();
        input.push(InputEvent::MouseButton { button: MouseButton::Left, pressed: true });
        assert!(input.left_held());
        assert!(input.take_left_click());
        assert!(!input.take_left_click());
        input.push(InputEvent::MouseButton { button: MouseButton::Left, pressed: false });
        assert!(!input.left_held());
        assert!(input.take_left_release());
        assert!(!input.take_left_release());
    }

    #[test]
    fn overrides_replace_defaults_per_action() {
        let mut overrides = HashMap::new();
        overrides.insert(InputAction::PlantSelected, vec![InputKeyBinding::character("p")]);
        let mut input = Input::with_bindings(InputBindings::with_overrides(overrides));
        press(&mut input, "i");
        assert!(!input.take_plant_selected());
        press(&mut input, "p");
        assert!(input.take_plant_selected());
        // Untouched actions keep their defaults.
        hold_named(&mut input, NamedKey::Tab, true);
        assert!(input.take_toggle_coa());
    }
}
