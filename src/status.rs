// Unit-scaled readback structures returned by the status-read paths.
//
// Wire integers carry physical values multiplied by 100 (speed, position,
// current, supply voltage) or 100 000 (PID gains); the bus divides them back
// out before handing these to the caller, so every field here is in physical
// units. Serialized as JSON by the CLI.

use serde::{Deserialize, Serialize};

/// Motor state: command 0x40 / response 0x50.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MotorStatus {
    /// Shaft speed [RPM].
    pub speed: f64,
    /// Shaft position [counts].
    pub position: f64,
    /// Phase current [mA].
    pub current: f64,
    pub mode: u8,
    pub status: u8,
    pub error: u8,
}

/// Electrical and peripheral state: command 0x41 / response 0x51.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtherStatus {
    /// Supply voltage [V].
    pub vin: f64,
    /// Controller temperature [degC].
    pub temp: i32,
    pub encoder_counter: i32,
    pub rgb_mode: u8,
    pub rgb_brightness: u8,
}

/// Speed-loop PID gains and LED color: command 0x42 / response 0x52.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeedPidRgb {
    pub speed_p: f64,
    pub speed_i: f64,
    pub speed_d: f64,
    pub rgb_r: u8,
    pub rgb_g: u8,
    pub rgb_b: u8,
}

/// Position-loop PID gains and bus settings: command 0x43 / response 0x53.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionPidBus {
    pub position_p: f64,
    pub position_i: f64,
    pub position_d: f64,
    pub rs485_id: u8,
    pub rs485_bps: u8,
    pub button_switch_mode: u8,
}
