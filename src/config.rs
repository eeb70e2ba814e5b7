// Serial defaults, timing and value-range configuration
use std::time::Duration;

// Serial defaults
pub const DEFAULT_BAUD_RATE: u32 = 115_200;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);
pub const DEFAULT_TARGET: u8 = 0;

// Settling delay between writing a request and reading its response;
// the peripheral needs this long to process a command. Exactly one read
// attempt follows, never a retry.
pub const SETTLE_DELAY: Duration = Duration::from_millis(50);

// Clamp limits applied before scaling
pub const SPEED_LIMIT: f64 = 21_000_000.0; // RPM
pub const POSITION_LIMIT: f64 = 21_000_000.0; // counts
pub const CURRENT_LIMIT: f64 = 1_200.0; // mA
pub const BRIGHTNESS_LIMIT: u8 = 100;

// Wire scale factors
pub const VALUE_SCALE: f64 = 100.0; // speed, position, current
pub const PID_SCALE: f64 = 100_000.0; // PID gains
