//! Process entry point: parses configuration, discovers input devices,
//! opens the I2C target chip, and runs the Signaling Engine and Input
//! Translator on their own threads until interrupted.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clap::Parser;

use joyemu::config::{Args, Config};
use joyemu::engine::{MonotonicClock, SignalingEngine};
use joyemu::error::{AppError, NoInputDevicesError};
use joyemu::i2c::{initialize_mcp23017, LinuxI2cSink};
use joyemu::input_source::evdev_source::{DeviceOverrides, EvdevInputSource};
use joyemu::input_source::{InputSource, RawEvent};
use joyemu::input_translator::InputTranslator;
use joyemu::psm::PortStateModel;

fn run() -> Result<(), AppError> {
    let args = Args::parse();
    let config = Config::from_args(args)?;
    joyemu::logging::init(config.verbosity);

    log::info!(
        "starting up: mouse on port {:?}, joystick 1 on port {:?}",
        config.mouse.port,
        config.joystick1_port
    );

    let overrides = DeviceOverrides {
        mouse: config.mouse_device,
        joystick1: config.joystick1_device,
        joystick2: config.joystick2_device,
    };
    let mut input_source = EvdevInputSource::discover(config.joystick1_port, &overrides)
        .map_err(|e| {
            log::error!("failed to enumerate input devices: {e}");
            NoInputDevicesError
        })?;
    if input_source.is_empty() {
        return Err(NoInputDevicesError.into());
    }

    let mut sink = LinuxI2cSink::open(config.i2c_bus, config.i2c_address)?;
    initialize_mcp23017(&mut sink)?;

    let mut psm = PortStateModel::new();
    psm.mouse = config.mouse;
    let psm = Arc::new(Mutex::new(psm));

    let shutting_down = Arc::new(AtomicBool::new(false));
    {
        let flag = shutting_down.clone();
        ctrlc::set_handler(move || {
            log::info!("shutdown requested");
            flag.store(true, Ordering::Relaxed);
        })
        .expect("failed to install signal handler");
    }

    let engine_psm = psm.clone();
    let engine_shutdown = shutting_down.clone();
    let engine_thread = std::thread::spawn(move || {
        let mut engine = SignalingEngine::new(MonotonicClock, sink);
        engine.run(&engine_psm, &engine_shutdown);
    });

    let translator = InputTranslator::new(psm.clone());
    while !shutting_down.load(Ordering::Relaxed) {
        match input_source.poll(Duration::from_millis(10)) {
            Ok(events) => {
                for event in events {
                    dispatch(&translator, event);
                }
            }
            Err(e) => log::warn!("input read error, continuing: {e}"),
        }
    }

    engine_thread.join().expect("signaling engine thread panicked");
    log::info!("shut down cleanly");
    Ok(())
}

fn dispatch(translator: &InputTranslator, event: RawEvent) {
    match event {
        RawEvent::MouseMove { axis, delta } => translator.on_mouse_move(axis, delta),
        RawEvent::MouseButton { which, pressed } => translator.on_mouse_button(which, pressed),
        RawEvent::JoystickAxis { port, axis, state } => translator.on_joystick_dpad(port, axis, state),
        RawEvent::JoystickButton { port, pressed } => translator.on_joystick_fire(port, pressed),
    }
}

fn main() {
    if let Err(e) = run() {
        eprintln!("joyemud: {e}");
        std::process::exit(1);
    }
}
