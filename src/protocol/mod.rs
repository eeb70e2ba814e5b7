// Wire protocol for the Unit-Roller485 motor controller.
//
// Provides:
// - CRC-8 checksum (reflected, polynomial 0x8C)
// - Command vocabulary and the per-code frame length table
// - Frame encode/decode over the variant payload shapes

pub mod command;
pub mod crc;
pub mod frame;

pub use command::{CommandCode, PayloadKind, frame_length};
pub use crc::crc8;
pub use frame::{Frame, FrameError, I2C_DATA_LEN, Payload, RESPONSE_MAGIC};
