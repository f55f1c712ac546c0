//! Input Translator: the thin adapter between normalized input events
//! and the Port State Model's mutators. Owns the button-down polarity
//! rule and the input-to-mutation operations.

use std::sync::{Arc, Mutex};

use crate::psm::{Axis, MouseButton, PortId, PortStateModel};

pub struct InputTranslator {
    psm: Arc<Mutex<PortStateModel>>,
}

impl InputTranslator {
    pub fn new(psm: Arc<Mutex<PortStateModel>>) -> Self {
        InputTranslator { psm }
    }

    pub fn on_mouse_move(&self, axis: Axis, delta: i32) {
        self.psm.lock().unwrap().mouse_move(axis, delta);
    }

    /// Button-down polarity: a logical "pressed" (true) must drive the
    /// port pin to 0. The PSM mutators already invert internally; this
    /// layer just forwards the logical `pressed` flag unchanged.
    pub fn on_mouse_button(&self, which: MouseButton, pressed: bool) {
        let mut psm = self.psm.lock().unwrap();
        match which {
            MouseButton::Left => psm.mouse_set_lmb(pressed),
            MouseButton::Right => psm.mouse_set_rmb(pressed),
        }
    }

    pub fn on_joystick_dpad(&self, port: PortId, axis: Axis, state: i8) {
        self.psm.lock().unwrap().joystick_set_axis(port, axis, state);
    }

    /// Any recognized face button maps to joystick fire 1.
    pub fn on_joystick_fire(&self, port: PortId, pressed: bool) {
        self.psm.lock().unwrap().joystick_set_fire(port, pressed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn translator() -> (InputTranslator, Arc<Mutex<PortStateModel>>) {
        let psm = Arc::new(Mutex::new(PortStateModel::new()));
        (InputTranslator::new(psm.clone()), psm)
    }

    #[test]
    fn mouse_button_polarity_drives_pin_low_when_pressed() {
        let (it, psm) = translator();
        it.on_mouse_button(MouseButton::Left, true);
        assert!(!psm.lock().unwrap().port_word(PortId::One).bit(5));
        it.on_mouse_button(MouseButton::Left, false);
        assert!(psm.lock().unwrap().port_word(PortId::One).bit(5));
    }

    #[test]
    fn joystick_fire_and_dpad_reach_the_right_port() {
        let (it, psm) = translator();
        it.on_joystick_dpad(PortId::Two, Axis::Horizontal, 1);
        it.on_joystick_fire(PortId::Two, true);
        let word = psm.lock().unwrap().port_word(PortId::Two);
        assert!(word.bit(2));
        assert!(!word.bit(3));
        assert!(!word.bit(5));
        // Port 1 is untouched.
        assert_eq!(psm.lock().unwrap().port_word(PortId::One).raw(), 0x16F);
    }

    #[test]
    fn mouse_move_reaches_accumulator() {
        let (it, psm) = translator();
        it.on_mouse_move(Axis::Vertical, 5);
        assert!(psm.lock().unwrap().accumulator(Axis::Vertical) > 0);
    }
}
