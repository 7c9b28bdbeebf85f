//! Virtual mouse backed by the kernel uinput interface.
//!
//! Needs write access to `/dev/uinput`, usually root or membership in the `input`
//! group.

use super::{MotionSink, MouseButton, SinkError};
use evdev::uinput::{VirtualDevice, VirtualDeviceBuilder};
use evdev::{AttributeSet, EventType, InputEvent, Key, RelativeAxisType};
use tracing::{debug, info};

pub const DEVICE_NAME: &str = "Head Mouse";

pub struct UinputSink {
    device: VirtualDevice,
}

impl UinputSink {
    pub fn create() -> Result<Self, SinkError> {
        Self::create_named(DEVICE_NAME)
    }

    pub fn create_named(name: &str) -> Result<Self, SinkError> {
        debug!("Creating uinput device {:?}", name);

        let keys = AttributeSet::<Key>::from_iter([Key::BTN_LEFT, Key::BTN_RIGHT, Key::BTN_MIDDLE]);
        let axes = AttributeSet::from_iter([
            RelativeAxisType::REL_X,
            RelativeAxisType::REL_Y,
            RelativeAxisType::REL_WHEEL,
            RelativeAxisType::REL_HWHEEL,
        ]);

        let device = VirtualDeviceBuilder::new()
            .and_then(|builder| builder.name(name).with_keys(&keys))
            .and_then(|builder| builder.with_relative_axes(&axes))
            .and_then(|builder| builder.build())
            .map_err(SinkError::DeviceCreation)?;

        info!("Virtual mouse {:?} created", name);
        Ok(Self { device })
    }

    fn emit(&mut self, events: &[InputEvent]) -> Result<(), SinkError> {
        // evdev appends the SYN_REPORT
        self.device.emit(events).map_err(SinkError::Emit)
    }
}

fn button_key(button: MouseButton) -> Key {
    match button {
        MouseButton::Left => Key::BTN_LEFT,
        MouseButton::Right => Key::BTN_RIGHT,
        MouseButton::Middle => Key::BTN_MIDDLE,
    }
}

impl MotionSink for UinputSink {
    fn name(&self) -> &str {
        "uinput"
    }

    fn move_by(&mut self, dx: i32, dy: i32) -> Result<(), SinkError> {
        let mut events = Vec::with_capacity(2);
        if dx != 0 {
            events.push(InputEvent::new(EventType::RELATIVE, RelativeAxisType::REL_X.0, dx));
        }
        if dy != 0 {
            events.push(InputEvent::new(EventType::RELATIVE, RelativeAxisType::REL_Y.0, dy));
        }
        if events.is_empty() {
            return Ok(());
        }
        self.emit(&events)
    }

    fn scroll(&mut self, amount: i32, horizontal: bool) -> Result<(), SinkError> {
        if amount == 0 {
            return Ok(());
        }
        let axis = if horizontal {
            RelativeAxisType::REL_HWHEEL
        } else {
            RelativeAxisType::REL_WHEEL
        };
        self.emit(&[InputEvent::new(EventType::RELATIVE, axis.0, amount)])
    }

    fn click(&mut self, button: MouseButton, pressed: bool) -> Result<(), SinkError> {
        let key = button_key(button);
        self.emit(&[InputEvent::new(EventType::KEY, key.code(), i32::from(pressed))])
    }

    fn is_ready(&self) -> bool {
        true
    }
}
