//! Port State Model: pure in-memory state for both joystick ports plus
//! the mouse encoder. No I/O happens in this module — every mutator is
//! a plain, synchronous state transition; the Signaling Engine is the
//! only thing that ever talks to hardware.

pub mod encoder;
pub mod mouse_config;
pub mod port_word;

use encoder::{EncoderBitStream, ENCODER_SEED, QUADRATURE_SEED};
use mouse_config::{Dialect, MouseConfig};
use port_word::PortWord;

/// Which of the two physical D-sub ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortId {
    One,
    Two,
}

impl PortId {
    pub fn other(self) -> PortId {
        match self {
            PortId::One => PortId::Two,
            PortId::Two => PortId::One,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
}

/// Pin bit carrying the fire / left-mouse-button line. Deliberately
/// shared between joystick fire and mouse LMB: only one device is
/// ever attached to a given port at a time (see DESIGN.md's open question
/// in §9 — intentional, undocumented in the original).
const FIRE_OR_LMB_BIT: u16 = 5;
const RMB_BIT: u16 = 8;

/// Per-axis pair of rotating bit streams (encoder phase + quadrature
/// phase) plus its undischarged movement accumulator.
#[derive(Debug, Clone, Copy)]
struct MouseAxisState {
    encoder: EncoderBitStream,
    quadrature: EncoderBitStream,
    accumulator: i64,
}

impl Default for MouseAxisState {
    fn default() -> Self {
        MouseAxisState {
            encoder: EncoderBitStream::new(ENCODER_SEED),
            quadrature: EncoderBitStream::new(QUADRATURE_SEED),
            accumulator: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PortStateModel {
    port1_pins: PortWord,
    port2_pins: PortWord,
    mouse_x: MouseAxisState,
    mouse_y: MouseAxisState,
    pub mouse: MouseConfig,
}

impl PortStateModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn port_word(&self, port: PortId) -> PortWord {
        match port {
            PortId::One => self.port1_pins,
            PortId::Two => self.port2_pins,
        }
    }

    fn port_word_mut(&mut self, port: PortId) -> &mut PortWord {
        match port {
            PortId::One => &mut self.port1_pins,
            PortId::Two => &mut self.port2_pins,
        }
    }

    /// Sets the joystick axis state for `port`.
    pub fn joystick_set_axis(&mut self, port: PortId, axis: Axis, state: i8) {
        self.port_word_mut(port).set_axis(axis, state);
    }

    /// Sets the joystick fire button state for `port`.
    pub fn joystick_set_fire(&mut self, port: PortId, pressed: bool) {
        self.port_word_mut(port).set_button(FIRE_OR_LMB_BIT, pressed);
    }

    /// Always targets the configured mouse port.
    pub fn mouse_set_lmb(&mut self, pressed: bool) {
        let port = self.mouse.port;
        self.port_word_mut(port).set_button(FIRE_OR_LMB_BIT, pressed);
    }

    /// Sets the mouse right button state, on the configured mouse port.
    pub fn mouse_set_rmb(&mut self, pressed: bool) {
        let port = self.mouse.port;
        self.port_word_mut(port).set_button(RMB_BIT, pressed);
    }

    /// Scales by speed, rounds, accumulates.
    /// No encoder rotation happens here.
    pub fn mouse_move(&mut self, axis: Axis, delta: i32) {
        let scaled = self.mouse.speed * delta as f64;
        let units = scaled.round() as i64;
        match axis {
            Axis::Horizontal => self.mouse_x.accumulator += units,
            Axis::Vertical => self.mouse_y.accumulator += units,
        }
    }

    pub fn accumulator(&self, axis: Axis) -> i64 {
        match axis {
            Axis::Horizontal => self.mouse_x.accumulator,
            Axis::Vertical => self.mouse_y.accumulator,
        }
    }

    /// Drain exactly one unit off `axis`'s accumulator by rotating its
    /// two streams `BITS_PER_UNIT` positions in the direction the sign
    /// calls for, then re-project the low bits onto the mouse port
    /// per the active dialect. A no-op when the
    /// accumulator is already zero.
    pub fn drain_one_unit(&mut self, axis: Axis) {
        use encoder::BITS_PER_UNIT;

        let state = match axis {
            Axis::Horizontal => &mut self.mouse_x,
            Axis::Vertical => &mut self.mouse_y,
        };
        let rotation = match state.accumulator.cmp(&0) {
            std::cmp::Ordering::Greater => BITS_PER_UNIT as i32,
            std::cmp::Ordering::Less => -(BITS_PER_UNIT as i32),
            std::cmp::Ordering::Equal => return,
        };
        state.encoder.rotate(rotation);
        state.quadrature.rotate(rotation);
        state.accumulator += if rotation > 0 { -1 } else { 1 };

        self.project_mouse_axis(axis);
    }

    /// Re-projects an axis's current encoder/quadrature low bits onto
    /// the mouse port's pins per the active dialect's table. Called
    /// after every rotation and whenever the dialect changes, so a
    /// mid-run dialect switch re-renders the unchanged streams onto
    /// the new pins deterministically.
    pub fn project_mouse_axis(&mut self, axis: Axis) {
        let dialect = self.mouse.dialect;
        let port = self.mouse.port;
        let (encoder_bit, quadrature_bit) = match (axis, dialect) {
            (Axis::Horizontal, Dialect::Amiga) => (1u16, 3u16),
            (Axis::Horizontal, Dialect::AtariSt) => (1u16, 0u16),
            (Axis::Vertical, Dialect::Amiga) => (0u16, 2u16),
            (Axis::Vertical, Dialect::AtariSt) => (2u16, 3u16),
        };
        let state = match axis {
            Axis::Horizontal => &self.mouse_x,
            Axis::Vertical => &self.mouse_y,
        };
        let e = state.encoder.low_bit();
        let q = state.quadrature.low_bit();
        let word = self.port_word_mut(port);
        word.set_line(encoder_bit, e);
        word.set_line(quadrature_bit, q);
    }

    /// Re-project both axes; used when the dialect changes mid-run.
    pub fn reproject_both_axes(&mut self) {
        self.project_mouse_axis(Axis::Horizontal);
        self.project_mouse_axis(Axis::Vertical);
    }

    pub fn set_dialect(&mut self, dialect: Dialect) {
        self.mouse.dialect = dialect;
        self.reproject_both_axes();
    }

    pub fn set_mouse_port(&mut self, port: PortId) {
        self.mouse.port = port;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mouse_move_zero_contributes_zero() {
        let mut psm = PortStateModel::new();
        psm.mouse_move(Axis::Horizontal, 0);
        assert_eq!(psm.accumulator(Axis::Horizontal), 0);
    }

    #[test]
    fn mouse_move_plus_then_minus_cancels() {
        let mut psm = PortStateModel::new();
        psm.mouse_move(Axis::Horizontal, 10);
        psm.mouse_move(Axis::Horizontal, -10);
        assert_eq!(psm.accumulator(Axis::Horizontal), 0);
    }

    #[test]
    fn scenario_1_speed_scaling_and_drain_count() {
        let mut psm = PortStateModel::new();
        psm.mouse.speed = 1.3;
        psm.mouse_move(Axis::Horizontal, 10);
        assert_eq!(psm.accumulator(Axis::Horizontal), 13);

        let mut drains = 0;
        while psm.accumulator(Axis::Horizontal) != 0 {
            psm.drain_one_unit(Axis::Horizontal);
            drains += 1;
        }
        assert_eq!(drains, 13);
        assert_eq!(psm.mouse_x.encoder.value().rotate_right(13 * 7), ENCODER_SEED);
    }

    #[test]
    fn decrement_never_crosses_zero() {
        let mut psm = PortStateModel::new();
        psm.mouse_move(Axis::Horizontal, 1);
        let start = psm.accumulator(Axis::Horizontal);
        psm.drain_one_unit(Axis::Horizontal);
        assert_eq!(psm.accumulator(Axis::Horizontal), start - 1);
    }

    #[test]
    fn dialect_switch_midrun_does_not_corrupt_streams() {
        let mut psm = PortStateModel::new();
        psm.mouse_move(Axis::Horizontal, 5);
        psm.drain_one_unit(Axis::Horizontal);
        let before = psm.mouse_x.encoder.value();
        psm.set_dialect(Dialect::AtariSt);
        assert_eq!(psm.mouse_x.encoder.value(), before);
    }

    #[test]
    fn scenario_6_amiga_vs_atari_parity() {
        let mut psm = PortStateModel::new();
        // force both low bits to 1 by rotating to a known alignment.
        psm.mouse_x.encoder = EncoderBitStream::new(1);
        psm.mouse_x.quadrature = EncoderBitStream::new(1);

        psm.set_dialect(Dialect::Amiga);
        let w = psm.port_word(PortId::One);
        assert!(w.bit(1));
        assert!(w.bit(3));

        psm.set_dialect(Dialect::AtariSt);
        let w = psm.port_word(PortId::One);
        assert!(w.bit(1));
        assert!(w.bit(0));
    }

    #[test]
    fn no_stray_bits_outside_usable_set() {
        let mut psm = PortStateModel::new();
        psm.joystick_set_axis(PortId::One, Axis::Horizontal, 1);
        psm.joystick_set_fire(PortId::One, true);
        psm.mouse_set_lmb(true);
        psm.mouse_set_rmb(true);
        for port in [PortId::One, PortId::Two] {
            assert_eq!(psm.port_word(port).raw() & !0x16F, 0);
        }
    }
}
