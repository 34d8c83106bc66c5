//! # INSEN Protocol Constants and Types
//!
//! Core wire definitions and decoded record types for the INSEN text protocol.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Line terminator appended to every command
pub const INSEN_LINE_TERMINATOR: &str = "\r\n";

/// Marker that opens every structured response frame
pub const INSEN_RESPONSE_MARKER: &str = ">>> ";

/// Field separator inside a frame
pub const INSEN_FIELD_SEPARATOR: char = '|';

/// Record tag of a controller input frame
pub const INSEN_INPUT_TAG: &str = "INPUT";

/// Minimum number of fields in an INPUT record (tag included)
pub const INSEN_INPUT_MIN_FIELDS: usize = 8;

/// Placeholder the peripheral sends instead of stick data for an empty slot
pub const INSEN_DISCONNECTED_TAG: &str = "DISCONNECTED";

/// Record tag of a `LIST` reply
pub const INSEN_CONTROLLERS_TAG: &str = "CONTROLLERS";

/// Number of controller slots on the peripheral
pub const INSEN_MAX_CONTROLLERS: u8 = 4;

/// Command strings
pub const CMD_INFO: &str = "INFO";
pub const CMD_STATUS: &str = "STATUS";
pub const CMD_LIST: &str = "LIST";
pub const CMD_GET: &str = "GET";

/// Controller buttons and their bit in the `buttons` mask
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    A,
    B,
    X,
    Y,
    LeftBumper,
    RightBumper,
    Select,
    Start,
    Home,
    LeftStick,
    RightStick,
}

/// Button table in bit order
pub const BUTTON_TABLE: [Button; 11] = [
    Button::A,
    Button::B,
    Button::X,
    Button::Y,
    Button::LeftBumper,
    Button::RightBumper,
    Button::Select,
    Button::Start,
    Button::Home,
    Button::LeftStick,
    Button::RightStick,
];

impl Button {
    /// Bit of this button in the `buttons` mask
    pub const fn mask(self) -> u32 {
        match self {
            Button::A => 0x01,
            Button::B => 0x02,
            Button::X => 0x04,
            Button::Y => 0x08,
            Button::LeftBumper => 0x10,
            Button::RightBumper => 0x20,
            Button::Select => 0x40,
            Button::Start => 0x80,
            Button::Home => 0x100,
            Button::LeftStick => 0x200,
            Button::RightStick => 0x400,
        }
    }

    /// Protocol name of the button
    pub const fn name(self) -> &'static str {
        match self {
            Button::A => "A",
            Button::B => "B",
            Button::X => "X",
            Button::Y => "Y",
            Button::LeftBumper => "LB",
            Button::RightBumper => "RB",
            Button::Select => "SELECT",
            Button::Start => "START",
            Button::Home => "HOME",
            Button::LeftStick => "LSB",
            Button::RightStick => "RSB",
        }
    }
}

/// D-pad position as reported by the peripheral
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DpadDirection {
    Neutral,
    Up,
    UpRight,
    Right,
    DownRight,
    Down,
    DownLeft,
    Left,
    UpLeft,
}

impl DpadDirection {
    /// Map a raw d-pad value, `None` for values outside 0-8
    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(Self::Neutral),
            1 => Some(Self::Up),
            2 => Some(Self::UpRight),
            3 => Some(Self::Right),
            4 => Some(Self::DownRight),
            5 => Some(Self::Down),
            6 => Some(Self::DownLeft),
            7 => Some(Self::Left),
            8 => Some(Self::UpLeft),
            _ => None,
        }
    }
}

/// Analog stick deflection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StickPosition {
    pub x: i32,
    pub y: i32,
}

impl StickPosition {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Snapshot of one controller's input
///
/// Values are copied out of the registry and handed to observers by value,
/// so a snapshot never changes after decoding. Numeric fields keep whatever
/// the peripheral sent; ranges are not clamped or validated here.
#[derive(Debug, Clone, Serialize)]
pub struct ControllerState {
    /// Controller slot index
    pub id: u8,

    /// Left stick deflection
    pub left_stick: StickPosition,

    /// Right stick deflection
    pub right_stick: StickPosition,

    /// Left analog trigger
    pub left_trigger: i32,

    /// Right analog trigger
    pub right_trigger: i32,

    /// Button bitmask, see [`BUTTON_TABLE`]
    pub buttons: u32,

    /// Raw d-pad value
    pub dpad: i32,

    /// Battery level in percent
    pub battery: i32,

    /// Capture time, assigned when the frame was decoded
    pub timestamp: DateTime<Utc>,
}

impl ControllerState {
    /// Names of the pressed buttons, in table order
    pub fn pressed_buttons(&self) -> Vec<&'static str> {
        BUTTON_TABLE
            .iter()
            .filter(|button| self.is_pressed(**button))
            .map(|button| button.name())
            .collect()
    }

    pub fn is_pressed(&self, button: Button) -> bool {
        self.buttons & button.mask() != 0
    }

    pub fn dpad_direction(&self) -> Option<DpadDirection> {
        DpadDirection::from_raw(self.dpad)
    }

    /// True when a stick axis exceeds `threshold` or any button is held
    pub fn has_significant_input(&self, threshold: u16) -> bool {
        let threshold = i64::from(threshold);
        [
            self.left_stick.x,
            self.left_stick.y,
            self.right_stick.x,
            self.right_stick.y,
        ]
        .iter()
        .any(|axis| i64::from(*axis).abs() > threshold)
            || self.buttons != 0
    }

    /// Compare every decoded field, ignoring `timestamp`
    pub fn same_input(&self, other: &ControllerState) -> bool {
        self.id == other.id
            && self.left_stick == other.left_stick
            && self.right_stick == other.right_stick
            && self.left_trigger == other.left_trigger
            && self.right_trigger == other.right_trigger
            && self.buttons == other.buttons
            && self.dpad == other.dpad
            && self.battery == other.battery
    }
}

/// Firmware details from the `INFO` reply
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FirmwareInfo {
    pub version: String,
    pub build_date: String,
    pub controller_count: Option<u8>,
    pub makcu_compatible: bool,
    pub status_ok: bool,
}

/// Counters from the `STATUS` reply
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SystemStatus {
    pub active_controllers: u32,
    pub total_inputs: u32,
    pub api_commands: u32,
    pub free_heap: u32,
}

/// One entry of the `LIST` reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControllerInfo {
    pub id: u8,
    /// Controller type reported by the peripheral, e.g. `XBOX_ONE`
    pub kind: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with(buttons: u32, left: StickPosition) -> ControllerState {
        ControllerState {
            id: 0,
            left_stick: left,
            right_stick: StickPosition::default(),
            left_trigger: 0,
            right_trigger: 0,
            buttons,
            dpad: 0,
            battery: 100,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_button_masks_are_distinct_bits() {
        let mut seen = 0u32;
        for (bit, button) in BUTTON_TABLE.iter().enumerate() {
            assert_eq!(button.mask(), 1 << bit, "{} out of order", button.name());
            assert_eq!(seen & button.mask(), 0);
            seen |= button.mask();
        }
        assert_eq!(seen, 0x7FF);
    }

    #[test]
    fn test_pressed_buttons_a_and_x() {
        let state = state_with(0x05, StickPosition::default());
        assert_eq!(state.pressed_buttons(), vec!["A", "X"]);
    }

    #[test]
    fn test_pressed_buttons_rsb_only() {
        let state = state_with(0x400, StickPosition::default());
        assert_eq!(state.pressed_buttons(), vec!["RSB"]);
        assert!(state.is_pressed(Button::RightStick));
        assert!(!state.is_pressed(Button::LeftStick));
    }

    #[test]
    fn test_unknown_bits_have_no_name() {
        // Bits above RSB are reserved
        let state = state_with(0x1800, StickPosition::default());
        assert!(state.pressed_buttons().is_empty());
    }

    #[test]
    fn test_dpad_directions() {
        assert_eq!(DpadDirection::from_raw(0), Some(DpadDirection::Neutral));
        assert_eq!(DpadDirection::from_raw(3), Some(DpadDirection::Right));
        assert_eq!(DpadDirection::from_raw(8), Some(DpadDirection::UpLeft));
        assert_eq!(DpadDirection::from_raw(9), None);
    }

    #[test]
    fn test_significant_input() {
        let idle = state_with(0, StickPosition::new(4000, -4000));
        assert!(!idle.has_significant_input(5000));

        let pushed = state_with(0, StickPosition::new(0, -32768));
        assert!(pushed.has_significant_input(5000));

        let pressed = state_with(Button::Home.mask(), StickPosition::default());
        assert!(pressed.has_significant_input(5000));
    }

    #[test]
    fn test_significant_input_beyond_i16() {
        let wide = state_with(0, StickPosition::new(i32::MIN, 0));
        assert!(wide.has_significant_input(u16::MAX));

        let reserved = state_with(0x10000, StickPosition::default());
        assert!(reserved.has_significant_input(5000));
        assert!(reserved.pressed_buttons().is_empty());
    }

    #[test]
    fn test_negative_dpad_has_no_direction() {
        let mut state = state_with(0, StickPosition::default());
        state.dpad = -1;
        assert_eq!(state.dpad_direction(), None);
    }

    #[test]
    fn test_same_input_ignores_timestamp() {
        let a = state_with(0x81, StickPosition::new(1, 2));
        let mut b = a.clone();
        b.timestamp = a.timestamp + chrono::Duration::seconds(5);
        assert!(a.same_input(&b));

        b.battery = 10;
        assert!(!a.same_input(&b));
    }
}
