//! Normalizes "some HID device sent evdev events" down to the six
//! logical events the Input Translator understands. Device discovery
//! and classification (mouse vs. gamepad) live here, at the external
//! collaborator boundary to the core.

use std::time::Duration;

use crate::error::InputError;
use crate::psm::{Axis, MouseButton, PortId};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawEvent {
    MouseMove { axis: Axis, delta: i32 },
    MouseButton { which: MouseButton, pressed: bool },
    JoystickAxis { port: PortId, axis: Axis, state: i8 },
    JoystickButton { port: PortId, pressed: bool },
}

/// A source of normalized input events. `poll` blocks up to `timeout`
/// waiting for at least one event; an empty result is not an error.
pub trait InputSource {
    fn poll(&mut self, timeout: Duration) -> Result<Vec<RawEvent>, InputError>;
}

/// Gamepad dpad/fire event codes recognized from the original's device
/// classification (`original_source/input.c`): xbox-style hat axes,
/// generic dpad buttons, and the Sixaxis/DualShock3 nonstandard codes,
/// plus any of the four face buttons mapping to fire 1.
#[cfg(target_os = "linux")]
pub mod evdev_source {
    use super::*;
    use evdev::{AbsoluteAxisCode, Device, EventSummary, KeyCode};
    use nix::fcntl::{fcntl, FcntlArg, OFlag};
    use std::os::unix::io::{AsRawFd, BorrowedFd};

    const SIXAXIS_UP: u16 = 292;
    const SIXAXIS_RIGHT: u16 = 293;
    const SIXAXIS_DOWN: u16 = 294;
    const SIXAXIS_LEFT: u16 = 295;
    const SIXAXIS_TRIANGLE: u16 = 300;
    const SIXAXIS_CIRCLE: u16 = 301;
    const SIXAXIS_CROSS: u16 = 302;
    const SIXAXIS_SQUARE: u16 = 303;

    fn is_face_button(code: u16) -> bool {
        matches!(
            code,
            c if c == KeyCode::BTN_NORTH.0
                || c == KeyCode::BTN_EAST.0
                || c == KeyCode::BTN_SOUTH.0
                || c == KeyCode::BTN_WEST.0
                || c == SIXAXIS_TRIANGLE
                || c == SIXAXIS_CIRCLE
                || c == SIXAXIS_CROSS
                || c == SIXAXIS_SQUARE
        )
    }

    fn looks_like_mouse(dev: &Device) -> bool {
        dev.supported_events().contains(evdev::EventType::RELATIVE)
            && dev
                .supported_keys()
                .map(|k| k.contains(KeyCode::BTN_LEFT) && k.contains(KeyCode::BTN_RIGHT))
                .unwrap_or(false)
    }

    fn looks_like_gamepad(dev: &Device) -> bool {
        let has_hat = dev
            .supported_absolute_axes()
            .map(|a| {
                a.contains(AbsoluteAxisCode::ABS_HAT0X) && a.contains(AbsoluteAxisCode::ABS_HAT0Y)
            })
            .unwrap_or(false);
        let has_generic_dpad = dev
            .supported_keys()
            .map(|k| {
                k.contains(KeyCode::BTN_DPAD_UP)
                    && k.contains(KeyCode::BTN_DPAD_DOWN)
                    && k.contains(KeyCode::BTN_DPAD_LEFT)
                    && k.contains(KeyCode::BTN_DPAD_RIGHT)
            })
            .unwrap_or(false);
        let has_sixaxis_dpad = dev
            .supported_keys()
            .map(|k| {
                k.contains(KeyCode(SIXAXIS_UP))
                    && k.contains(KeyCode(SIXAXIS_DOWN))
                    && k.contains(KeyCode(SIXAXIS_LEFT))
                    && k.contains(KeyCode(SIXAXIS_RIGHT))
            })
            .unwrap_or(false);
        if !(has_hat || has_generic_dpad || has_sixaxis_dpad) {
            return false;
        }
        dev.supported_keys()
            .map(|k| {
                k.contains(KeyCode::BTN_NORTH)
                    || k.contains(KeyCode::BTN_EAST)
                    || k.contains(KeyCode::BTN_SOUTH)
                    || k.contains(KeyCode::BTN_WEST)
                    || k.contains(KeyCode(SIXAXIS_TRIANGLE))
                    || k.contains(KeyCode(SIXAXIS_CIRCLE))
                    || k.contains(KeyCode(SIXAXIS_CROSS))
                    || k.contains(KeyCode(SIXAXIS_SQUARE))
            })
            .unwrap_or(false)
    }

    /// One opened, classified evdev device dedicated to one role.
    enum Role {
        Mouse,
        Joystick(PortId),
    }

    struct AssignedDevice {
        device: Device,
        role: Role,
    }

    /// Puts a device's fd into `O_NONBLOCK`, the same mode
    /// `input_scan_devices` opens every event device with in the
    /// original (`O_RDONLY|O_NONBLOCK`). Without this, `fetch_events`
    /// blocks on a device with nothing queued, which would stall
    /// `poll`'s round-robin over every other assigned device.
    fn set_nonblocking(device: &Device) -> std::io::Result<()> {
        // SAFETY: borrowed for the duration of these two calls only;
        // the device (and its fd) outlives this function.
        let fd = unsafe { BorrowedFd::borrow_raw(device.as_raw_fd()) };
        let flags = fcntl(fd, FcntlArg::F_GETFL).map_err(errno_to_io)?;
        let flags = OFlag::from_bits_truncate(flags) | OFlag::O_NONBLOCK;
        fcntl(fd, FcntlArg::F_SETFL(flags)).map_err(errno_to_io)?;
        Ok(())
    }

    fn errno_to_io(e: nix::Error) -> std::io::Error {
        std::io::Error::from_raw_os_error(e as i32)
    }

    /// Discovers devices under `/dev/input/event*`, classifying each as
    /// a mouse or a gamepad the same way `input_scan_devices` in the
    /// original did, honoring explicit device-number overrides.
    pub struct EvdevInputSource {
        devices: Vec<AssignedDevice>,
    }

    pub struct DeviceOverrides {
        pub mouse: Option<u32>,
        pub joystick1: Option<u32>,
        pub joystick2: Option<u32>,
    }

    impl EvdevInputSource {
        pub fn discover(
            first_joystick_port: PortId,
            overrides: &DeviceOverrides,
        ) -> std::io::Result<Self> {
            let mut devices = Vec::new();
            let mut mouse_found = false;
            let joystick_ports = [first_joystick_port, first_joystick_port.other()];
            let mut next_joystick_slot = 0usize;

            for (path, device) in evdev::enumerate() {
                let devno = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .and_then(|n| n.trim_start_matches("event").parse::<u32>().ok());

                if looks_like_mouse(&device) {
                    if mouse_found {
                        continue;
                    }
                    if overrides.mouse.is_none() || overrides.mouse == devno {
                        log::info!("using \"{}\" to emulate the mouse", device.name().unwrap_or("?"));
                        set_nonblocking(&device)?;
                        mouse_found = true;
                        devices.push(AssignedDevice { device, role: Role::Mouse });
                    }
                } else if looks_like_gamepad(&device) && next_joystick_slot < 2 {
                    let wanted = if next_joystick_slot == 0 {
                        overrides.joystick1
                    } else {
                        overrides.joystick2
                    };
                    if wanted.is_none() || wanted == devno {
                        let port = joystick_ports[next_joystick_slot];
                        log::info!(
                            "using \"{}\" to emulate a joystick on port {:?}",
                            device.name().unwrap_or("?"),
                            port
                        );
                        set_nonblocking(&device)?;
                        devices.push(AssignedDevice {
                            device,
                            role: Role::Joystick(port),
                        });
                        next_joystick_slot += 1;
                    }
                }
            }
            Ok(EvdevInputSource { devices })
        }

        pub fn is_empty(&self) -> bool {
            self.devices.is_empty()
        }
    }

    impl super::InputSource for EvdevInputSource {
        fn poll(&mut self, timeout: Duration) -> Result<Vec<RawEvent>, InputError> {
            let mut out = Vec::new();
            for assigned in &mut self.devices {
                // Every device fd was set O_NONBLOCK in discover(), so a
                // device with nothing queued yields WouldBlock instead
                // of stalling the round-robin over the rest.
                let events = match assigned.device.fetch_events() {
                    Ok(events) => events,
                    Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => continue,
                    Err(e) => return Err(InputError::Io(e)),
                };
                for ev in events {
                    if let Some(translated) = translate(&assigned.role, ev) {
                        out.push(translated);
                    }
                }
            }
            if out.is_empty() {
                std::thread::sleep(timeout.min(Duration::from_millis(10)));
            }
            Ok(out)
        }
    }

    fn translate(role: &Role, ev: evdev::InputEvent) -> Option<RawEvent> {
        match (role, ev.destructure()) {
            (Role::Mouse, EventSummary::RelativeAxis(_, rel, value)) => match rel {
                evdev::RelativeAxisCode::REL_X => Some(RawEvent::MouseMove { axis: Axis::Horizontal, delta: value }),
                evdev::RelativeAxisCode::REL_Y => Some(RawEvent::MouseMove { axis: Axis::Vertical, delta: value }),
                _ => None,
            },
            (Role::Mouse, EventSummary::Key(_, key, value)) => {
                if key == KeyCode::BTN_LEFT {
                    Some(RawEvent::MouseButton { which: MouseButton::Left, pressed: value != 0 })
                } else if key == KeyCode::BTN_RIGHT {
                    Some(RawEvent::MouseButton { which: MouseButton::Right, pressed: value != 0 })
                } else {
                    None
                }
            }
            (Role::Joystick(port), EventSummary::AbsoluteAxis(_, abs, value)) => match abs {
                AbsoluteAxisCode::ABS_HAT0X => {
                    Some(RawEvent::JoystickAxis { port: *port, axis: Axis::Horizontal, state: value.signum() as i8 })
                }
                AbsoluteAxisCode::ABS_HAT0Y => {
                    Some(RawEvent::JoystickAxis { port: *port, axis: Axis::Vertical, state: value.signum() as i8 })
                }
                _ => None,
            },
            (Role::Joystick(port), EventSummary::Key(_, key, value)) => {
                let code = key.0;
                let pressed = value != 0;
                match code {
                    c if c == KeyCode::BTN_DPAD_UP.0 || c == SIXAXIS_UP => {
                        Some(RawEvent::JoystickAxis { port: *port, axis: Axis::Vertical, state: if pressed { -1 } else { 0 } })
                    }
                    c if c == KeyCode::BTN_DPAD_DOWN.0 || c == SIXAXIS_DOWN => {
                        Some(RawEvent::JoystickAxis { port: *port, axis: Axis::Vertical, state: if pressed { 1 } else { 0 } })
                    }
                    c if c == KeyCode::BTN_DPAD_LEFT.0 || c == SIXAXIS_LEFT => {
                        Some(RawEvent::JoystickAxis { port: *port, axis: Axis::Horizontal, state: if pressed { -1 } else { 0 } })
                    }
                    c if c == KeyCode::BTN_DPAD_RIGHT.0 || c == SIXAXIS_RIGHT => {
                        Some(RawEvent::JoystickAxis { port: *port, axis: Axis::Horizontal, state: if pressed { 1 } else { 0 } })
                    }
                    c if is_face_button(c) => Some(RawEvent::JoystickButton { port: *port, pressed }),
                    _ => None,
                }
            }
            _ => None,
        }
    }
}

/// A fixed, pre-recorded queue of events, used by tests and by the
/// integration suite to drive the Input Translator deterministically.
#[derive(Default)]
pub struct ChannelInputSource {
    pub pending: std::collections::VecDeque<RawEvent>,
}

impl InputSource for ChannelInputSource {
    fn poll(&mut self, _timeout: Duration) -> Result<Vec<RawEvent>, InputError> {
        Ok(self.pending.drain(..).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poll_drains_the_queue_in_order() {
        let mut source = ChannelInputSource::default();
        source.pending.push_back(RawEvent::MouseMove { axis: Axis::Horizontal, delta: 3 });
        source.pending.push_back(RawEvent::MouseButton { which: MouseButton::Left, pressed: true });

        let events = source.poll(Duration::from_millis(0)).unwrap();
        assert_eq!(events, vec![
            RawEvent::MouseMove { axis: Axis::Horizontal, delta: 3 },
            RawEvent::MouseButton { which: MouseButton::Left, pressed: true },
        ]);
    }

    #[test]
    fn poll_on_an_empty_queue_returns_an_empty_vec_not_an_error() {
        let mut source = ChannelInputSource::default();
        assert_eq!(source.poll(Duration::from_millis(0)).unwrap(), Vec::new());
    }

    #[test]
    fn events_already_drained_do_not_reappear_on_a_later_poll() {
        let mut source = ChannelInputSource::default();
        source.pending.push_back(RawEvent::JoystickButton { port: PortId::One, pressed: true });
        source.poll(Duration::from_millis(0)).unwrap();
        assert!(source.poll(Duration::from_millis(0)).unwrap().is_empty());
    }
}
