//! The 9-bit electrical image of one D-sub joystick port.

/// Idle value: all four direction pins and both button pins released.
pub const IDLE: u16 = 0x16F;

/// Bits 4, 6, 7 are reserved and must never be written.
const RESERVED_MASK: u16 = !0x16F & 0x1FF;

/// A 9-bit port word. High bits (9 and above) are always zero; the
/// reserved bits 4, 6, 7 are never written by any mutator here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortWord(u16);

impl Default for PortWord {
    fn default() -> Self {
        PortWord(IDLE)
    }
}

impl PortWord {
    pub fn new(value: u16) -> Self {
        PortWord(value & 0x1FF)
    }

    pub fn raw(self) -> u16 {
        self.0
    }

    fn set_bit(&mut self, bit: u16, value: bool) {
        if value {
            self.0 |= 1 << bit;
        } else {
            self.0 &= !(1 << bit);
        }
    }

    /// Write a single pin bit directly. Used by the mouse encoder
    /// projection, which targets different pins per axis/dialect and
    /// so can't be expressed as one of the named mutators above.
    pub fn set_line(&mut self, bit: u16, high: bool) {
        self.set_bit(bit, high);
    }

    /// Horizontal (bits 2/3) or vertical (bits 0/1) axis state, per
    /// -1 clears the low pin and sets the high pin, +1 is
    /// the mirror, 0 sets both. Anything else is a silent no-op.
    pub fn set_axis(&mut self, axis: super::Axis, state: i8) {
        if !(-1..=1).contains(&state) {
            return;
        }
        let (low, high) = match axis {
            super::Axis::Horizontal => (2u16, 3u16),
            super::Axis::Vertical => (0u16, 1u16),
        };
        match state {
            -1 => {
                self.set_bit(low, false);
                self.set_bit(high, true);
            }
            0 => {
                self.set_bit(low, true);
                self.set_bit(high, true);
            }
            1 => {
                self.set_bit(low, true);
                self.set_bit(high, false);
            }
            _ => unreachable!(),
        }
    }

    /// Fire / LMB / RMB pins share the rule: pressed (state != 0)
    /// drives the pin to 0, released drives it to 1.
    pub fn set_button(&mut self, bit: u16, pressed: bool) {
        self.set_bit(bit, !pressed);
    }

    pub fn bit(self, bit: u16) -> bool {
        (self.0 >> bit) & 1 != 0
    }

    /// The byte actually written to the MCP23017 GPIO register for
    /// this port: low nibble maps straight across, bit
    /// 5 -> GPIO bit 4, bit 8 -> GPIO bit 5. Reserved bits never reach
    /// the wire.
    pub fn gpio_byte(self) -> u8 {
        let w = self.0;
        (((w & 0x00F) | ((w & 0x020) >> 1) | ((w & 0x100) >> 3)) & 0xFF) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::psm::Axis;

    #[test]
    fn idle_is_0x16f() {
        assert_eq!(PortWord::default().raw(), 0x16F);
    }

    #[test]
    fn no_stray_bits_after_any_mutator() {
        let mut w = PortWord::default();
        w.set_axis(Axis::Horizontal, 1);
        w.set_axis(Axis::Vertical, -1);
        w.set_button(5, true);
        w.set_button(8, true);
        assert_eq!(w.raw() & !0x16F, 0);
        assert_eq!(w.raw() & RESERVED_MASK, 0);
    }

    #[test]
    fn horizontal_axis_right_matches_scenario_2() {
        let mut w = PortWord::default();
        w.set_axis(Axis::Horizontal, 1);
        assert_eq!(w.raw(), 0x167);
        assert_eq!(w.gpio_byte(), 0x37);
    }

    #[test]
    fn fire_pressed_then_released_matches_scenario_3() {
        let mut w = PortWord::default();
        w.set_button(5, true);
        assert_eq!(w.raw(), 0x14F);
        assert_eq!(w.gpio_byte(), 0x2F);
        w.set_button(5, false);
        assert_eq!(w.raw(), 0x16F);
        assert_eq!(w.gpio_byte(), 0x3F);
    }

    #[test]
    fn rmb_matches_scenario_4() {
        let mut w = PortWord::default();
        w.set_button(8, true);
        assert_eq!(w.raw(), 0x06F);
        assert_eq!(w.gpio_byte(), 0x2F);
    }

    #[test]
    fn axis_out_of_range_is_noop() {
        let mut w = PortWord::default();
        let before = w.raw();
        w.set_axis(Axis::Horizontal, 2);
        assert_eq!(w.raw(), before);
    }

    #[test]
    fn repeated_center_is_idempotent() {
        let mut a = PortWord::default();
        a.set_axis(Axis::Horizontal, 0);
        let mut b = PortWord::default();
        b.set_axis(Axis::Horizontal, 0);
        b.set_axis(Axis::Horizontal, 0);
        assert_eq!(a, b);
    }
}
