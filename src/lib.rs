// Driver for the M5Stack Unit-Roller485 motor controller
//
// Provides:
// - Binary frame codec for the Roller485 bus protocol (src/protocol)
// - Synchronous exchange engine, one write + one read per operation (src/bus)
// - Serial transport seam and the clap CLI used by the roller485 binary

pub mod bus;
pub mod cli;
pub mod config;
pub mod protocol;
pub mod status;
pub mod transport;

pub use bus::{BaudRate, BusError, ButtonMode, MotorMode, Roller485, Switch};
pub use protocol::{CommandCode, Frame, FrameError, Payload, crc8, frame_length};
pub use status::{MotorStatus, OtherStatus, PositionPidBus, SpeedPidRgb};
pub use transport::{SerialTransport, Transport};
