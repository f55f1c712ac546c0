//! Signaling Engine: the system's heartbeat. Drains the mouse
//! accumulators into encoder rotations at a bounded rate, and flushes
//! changed port words to the I2C sink.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::i2c::{self, Bank, I2cSink};
use crate::psm::encoder::MIN_US_PER_BIT;
use crate::psm::port_word::PortWord;
use crate::psm::{Axis, PortId, PortStateModel};

/// A source of monotonic instants, abstracted so drain timing can be
/// driven deterministically in tests instead of depending on wall time.
pub trait Clock {
    fn now(&self) -> Instant;
}

pub struct MonotonicClock;

impl Clock for MonotonicClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only advances when told to, for tests that need exact
/// control over how many ticks cross the `MIN_US_PER_BIT` threshold.
pub struct FakeClock {
    now: Mutex<Instant>,
}

impl FakeClock {
    pub fn new() -> Self {
        FakeClock { now: Mutex::new(Instant::now()) }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap()
    }
}

pub struct SignalingEngine<C: Clock, S: I2cSink> {
    clock: C,
    sink: S,
    last_drain: Instant,
    last_port1: Option<PortWord>,
    last_port2: Option<PortWord>,
}

impl<C: Clock, S: I2cSink> SignalingEngine<C, S> {
    pub fn new(clock: C, sink: S) -> Self {
        let last_drain = clock.now();
        SignalingEngine {
            clock,
            sink,
            last_drain,
            last_port1: None,
            last_port2: None,
        }
    }

    /// Runs one iteration of the algorithm: sample
    /// elapsed time, drain accumulators if enough time has passed
    /// (X first, then Y), then unconditionally flush.
    pub fn tick(&mut self, psm: &Mutex<PortStateModel>) {
        let now = self.clock.now();
        let elapsed = now.duration_since(self.last_drain);

        if elapsed >= Duration::from_micros(MIN_US_PER_BIT) {
            let mut state = psm.lock().unwrap();
            for axis in [Axis::Horizontal, Axis::Vertical] {
                state.drain_one_unit(axis);
            }
            drop(state);
            self.last_drain = now;
        }

        self.flush(psm);
    }

    /// Writes whichever port words changed since the last flush. A
    /// failed write leaves `last_portN` untouched so the next tick
    /// retries it, converging once the bus recovers.
    fn flush(&mut self, psm: &Mutex<PortStateModel>) {
        let (port1, port2) = {
            let state = psm.lock().unwrap();
            (state.port_word(PortId::One), state.port_word(PortId::Two))
        };

        if self.last_port1 != Some(port1) {
            match i2c::write_gpio(&mut self.sink, Bank::A, port1.gpio_byte()) {
                Ok(()) => self.last_port1 = Some(port1),
                Err(e) => log::warn!("I2C write to port 1 bank failed, will retry: {e}"),
            }
        }
        if self.last_port2 != Some(port2) {
            match i2c::write_gpio(&mut self.sink, Bank::B, port2.gpio_byte()) {
                Ok(()) => self.last_port2 = Some(port2),
                Err(e) => log::warn!("I2C write to port 2 bank failed, will retry: {e}"),
            }
        }
    }

    /// The GPIO byte last successfully written for `bank`, if any —
    /// exposed for integration tests driving the engine without a real
    /// bus underneath.
    pub fn last_written_gpio_byte(&self, bank: Bank) -> Option<u8> {
        match bank {
            Bank::A => self.last_port1.map(|w| w.gpio_byte()),
            Bank::B => self.last_port2.map(|w| w.gpio_byte()),
        }
    }

    /// Runs the tick loop for process lifetime, or until `shutting_down`
    /// is set. Yields between iterations rather than busy-spinning a
    /// full core; the natural I2C write latency provides most of the
    /// pacing.
    pub fn run(&mut self, psm: &Arc<Mutex<PortStateModel>>, shutting_down: &Arc<AtomicBool>) {
        while !shutting_down.load(Ordering::Relaxed) {
            self.tick(psm);
            std::thread::yield_now();
        }
    }
}

impl<S: I2cSink> SignalingEngine<FakeClock, S> {
    /// Advances the engine's fake clock, for tests controlling exactly
    /// how many ticks cross the drain threshold.
    pub fn clock_advance(&self, by: Duration) {
        self.clock.advance(by);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i2c::MockI2cSink;
    use crate::psm::mouse_config::Dialect;

    fn engine_with_mock() -> (SignalingEngine<FakeClock, MockI2cSink>, Arc<Mutex<PortStateModel>>) {
        let clock = FakeClock::new();
        let sink = MockI2cSink::default();
        let engine = SignalingEngine::new(clock, sink);
        (engine, Arc::new(Mutex::new(PortStateModel::new())))
    }

    #[test]
    fn idle_state_flushes_once_then_is_silent() {
        let (mut engine, psm) = engine_with_mock();
        engine.tick(&psm);
        let writes_after_first = engine.sink.writes.len();
        assert!(writes_after_first > 0);
        for _ in 0..10 {
            engine.tick(&psm);
        }
        assert_eq!(engine.sink.writes.len(), writes_after_first);
    }

    #[test]
    fn k_positive_accumulator_drains_in_exactly_k_ticks() {
        let (mut engine, psm) = engine_with_mock();
        {
            let mut state = psm.lock().unwrap();
            state.mouse_move(Axis::Horizontal, 5);
        }
        let k = psm.lock().unwrap().accumulator(Axis::Horizontal);
        assert!(k > 0);

        let mut ticks = 0;
        while psm.lock().unwrap().accumulator(Axis::Horizontal) != 0 {
            engine.clock.advance(Duration::from_micros(MIN_US_PER_BIT));
            engine.tick(&psm);
            ticks += 1;
            assert!(ticks <= k + 1, "drained more slowly than expected");
        }
        assert_eq!(ticks, k);
    }

    #[test]
    fn scenario_2_joystick_axis_flush_byte() {
        let (mut engine, psm) = engine_with_mock();
        psm.lock().unwrap().joystick_set_axis(PortId::One, Axis::Horizontal, 1);
        engine.tick(&psm);
        assert_eq!(*engine.sink.registers.get(&crate::i2c::mcp23017::GPIO).unwrap(), 0x37);
    }

    #[test]
    fn scenario_5_repeated_identical_mutation_suppresses_second_flush() {
        let (mut engine, psm) = engine_with_mock();
        psm.lock().unwrap().mouse_set_lmb(false);
        engine.tick(&psm);
        let writes = engine.sink.writes.len();
        psm.lock().unwrap().mouse_set_lmb(false);
        engine.tick(&psm);
        assert_eq!(engine.sink.writes.len(), writes);
    }

    #[test]
    fn failed_write_does_not_update_last_written_cache() {
        let (mut engine, psm) = engine_with_mock();
        psm.lock().unwrap().joystick_set_fire(PortId::One, true);
        engine.sink.fail_next_write = true;
        engine.tick(&psm);
        assert_eq!(engine.last_port1, None);
        engine.tick(&psm);
        assert!(engine.last_port1.is_some());
    }

    #[test]
    fn scenario_4_mouse_rmb_on_port_two() {
        let (mut engine, psm) = engine_with_mock();
        {
            let mut state = psm.lock().unwrap();
            state.set_mouse_port(PortId::Two);
            state.mouse_set_rmb(true);
        }
        engine.tick(&psm);
        assert_eq!(
            *engine.sink.registers.get(&(crate::i2c::mcp23017::GPIO + 1)).unwrap(),
            0x2F
        );
    }

    #[test]
    fn dialect_is_configurable_without_disturbing_flush() {
        let (mut engine, psm) = engine_with_mock();
        psm.lock().unwrap().set_dialect(Dialect::AtariSt);
        engine.tick(&psm);
    }
}
