use scene_manip::input::{Input, InputEvent};
use std::io::Write;
use tempfile::NamedTempFile;
use winit::keyboard::{Key, NamedKey};

#[test]
fn remapped_manipulation_keys_override_defaults() {
    let mut temp = NamedTempFile::new().expect("temp input config");
    write!(temp, r#"{{"bindings":{{"plant_selected":["g"],"toggle_coa_mode":["t"]}}}}"#)
        .expect("write remap config");

    let mut input = Input::from_config(temp.path());

    input.push(InputEvent::Key { key: Key::Character("g".into()), pressed: true });
    assert!(input.take_plant_selected(), "custom key triggers planting");

    input.push(InputEvent::Key { key: Key::Character("i".into()), pressed: true });
    assert!(!input.take_plant_selected(), "default key should no longer fire when remapped");

    input.push(InputEvent::Key { key: Key::Character("t".into()), pressed: true });
    assert!(input.take_toggle_coa(), "custom key toggles the widget mode");

    input.push(InputEvent::Key { key: Key::Named(NamedKey::Tab), pressed: true });
    assert!(!input.take_toggle_coa(), "original binding is ignored after remapping");

    // Actions that were not remapped keep their defaults.
    input.push(InputEvent::Key { key: Key::Character(".".into()), pressed: true });
    assert_eq!(input.take_widget_scale_up(), 1);
}

#[test]
fn malformed_config_keeps_default_bindings() {
    let mut temp = NamedTempFile::new().expect("temp input config");
    write!(temp, "{{ not json").expect("write bad config");

    let mut input = Input::from_config(temp.path());

    input.push(InputEvent::Key { key: Key::Character("i".into()), pressed: true });
    assert!(input.take_plant_selected(), "defaults survive a bad config file");
    input.push(InputEvent::Key { key: Key::Named(NamedKey::Tab), pressed: true });
    assert!(input.take_toggle_coa());
}
