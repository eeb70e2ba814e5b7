// Frame layer: lossless conversion between typed frames and wire bytes.
//
// Request:  cmd(1) dev(1) payload crc(1)
// Response: AA 55 cmd(1) dev(1) payload crc(1)
//
// The first wire byte being 0xAA is the only request/response discriminator.
// Decoding is a single linear pass; the payload shape is selected by the
// command code alone. The checksum byte is carried verbatim in both
// directions — validating it is the exchange engine's job, since the codec is
// also used to build frames before their checksum is known.

use thiserror::Error;

use super::command::{CommandCode, PayloadKind, frame_length};

/// Marker pair that opens every response frame.
pub const RESPONSE_MAGIC: [u8; 2] = [0xAA, 0x55];

/// Fixed capacity of the I2C data field.
pub const I2C_DATA_LEN: usize = 16;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("frame too short: needed {needed} bytes, got {actual}")]
    TooShort { needed: usize, actual: usize },

    #[error("unknown command code 0x{code:02X}")]
    UnknownCommand { code: u8 },

    #[error("bad response marker: expected 0x55 after 0xAA, got 0x{actual:02X}")]
    BadMagic { actual: u8 },
}

/// Payload variants, one per wire shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Config {
        data1: i32,
        data2: i32,
        data3: i32,
    },
    ReadTrigger {
        read_flag: u8,
    },
    MotorStatus {
        speed: i32,
        position: i32,
        current: i32,
        mode: u8,
        status: u8,
        error: u8,
    },
    OtherStatus {
        vin_x100: u32,
        temp: i32,
        encoder_counter: i32,
        rgb_mode: u8,
        rgb_brightness: u8,
        reserve: u8,
    },
    SpeedPidRgb {
        p: u32,
        i: u32,
        d: u32,
        rgb_b: u8,
        rgb_g: u8,
        rgb_r: u8,
    },
    PositionPidBus {
        p: u32,
        i: u32,
        d: u32,
        rs485_id: u8,
        rs485_bps: u8,
        button_switch_mode: u8,
    },
    I2cReadRegRequest {
        address: u8,
        register_len: u8,
        register: u16,
        data_len: u8,
    },
    I2cWriteRegRequest {
        address: u8,
        register_len: u8,
        register: u16,
        data_len: u8,
        reserve: [u8; 3],
        data: [u8; I2C_DATA_LEN],
    },
    I2cReadRawRequest {
        address: u8,
        data_len: u8,
    },
    I2cWriteRawRequest {
        address: u8,
        data_len: u8,
        stop_bit: u8,
        reserve: [u8; 3],
        data: [u8; I2C_DATA_LEN],
    },
    I2cReadResponse {
        status: u8,
        reserve1: u8,
        data_len: u8,
        reserve2: [u8; 3],
        data: [u8; I2C_DATA_LEN],
    },
    I2cWriteResponse {
        status: u8,
    },
}

/// One complete protocol message, checksum byte included.
///
/// A frame exists only for the duration of one encode or decode; it owns no
/// resources and has no identity beyond its field values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub command: CommandCode,
    pub is_response: bool,
    pub device_id: u8,
    pub payload: Payload,
    pub crc8: u8,
}

impl Frame {
    /// Parse one frame from `bytes`.
    pub fn decode(bytes: &[u8]) -> Result<Self, FrameError> {
        let mut r = Reader::new(bytes);
        let first = r.u8()?;
        let (command_byte, is_response) = if first == RESPONSE_MAGIC[0] {
            let magic2 = r.u8()?;
            if magic2 != RESPONSE_MAGIC[1] {
                return Err(FrameError::BadMagic { actual: magic2 });
            }
            (r.u8()?, true)
        } else {
            (first, false)
        };
        let command = CommandCode::from_raw(command_byte)
            .ok_or(FrameError::UnknownCommand { code: command_byte })?;
        let device_id = r.u8()?;
        let payload = Payload::read(command.payload_kind(), &mut r)?;
        let crc8 = r.u8()?;
        Ok(Self {
            command,
            is_response,
            device_id,
            payload,
            crc8,
        })
    }

    /// Serialize to the exact byte sequence a matching decode would consume.
    /// The stored checksum byte is written verbatim.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(frame_length(self.command as u8));
        if self.is_response {
            buf.extend_from_slice(&RESPONSE_MAGIC);
        }
        buf.push(self.command as u8);
        buf.push(self.device_id);
        self.payload.write(&mut buf);
        buf.push(self.crc8);
        buf
    }
}

impl Payload {
    fn read(kind: PayloadKind, r: &mut Reader<'_>) -> Result<Self, FrameError> {
        let payload = match kind {
            PayloadKind::Config => Self::Config {
                data1: r.i32le()?,
                data2: r.i32le()?,
                data3: r.i32le()?,
            },
            PayloadKind::ReadTrigger => Self::ReadTrigger { read_flag: r.u8()? },
            PayloadKind::MotorStatus => Self::MotorStatus {
                speed: r.i32le()?,
                position: r.i32le()?,
                current: r.i32le()?,
                mode: r.u8()?,
                status: r.u8()?,
                error: r.u8()?,
            },
            PayloadKind::OtherStatus => Self::OtherStatus {
                vin_x100: r.u32le()?,
                temp: r.i32le()?,
                encoder_counter: r.i32le()?,
                rgb_mode: r.u8()?,
                rgb_brightness: r.u8()?,
                reserve: r.u8()?,
            },
            PayloadKind::SpeedPidRgb => Self::SpeedPidRgb {
                p: r.u32le()?,
                i: r.u32le()?,
                d: r.u32le()?,
                rgb_b: r.u8()?,
                rgb_g: r.u8()?,
                rgb_r: r.u8()?,
            },
            PayloadKind::PositionPidBus => Self::PositionPidBus {
                p: r.u32le()?,
                i: r.u32le()?,
                d: r.u32le()?,
                rs485_id: r.u8()?,
                rs485_bps: r.u8()?,
                button_switch_mode: r.u8()?,
            },
            PayloadKind::I2cReadRegRequest => Self::I2cReadRegRequest {
                address: r.u8()?,
                register_len: r.u8()?,
                register: r.u16le()?,
                data_len: r.u8()?,
            },
            PayloadKind::I2cWriteRegRequest => Self::I2cWriteRegRequest {
                address: r.u8()?,
                register_len: r.u8()?,
                register: r.u16le()?,
                data_len: r.u8()?,
                reserve: r.array()?,
                data: r.array()?,
            },
            PayloadKind::I2cReadRawRequest => Self::I2cReadRawRequest {
                address: r.u8()?,
                data_len: r.u8()?,
            },
            PayloadKind::I2cWriteRawRequest => Self::I2cWriteRawRequest {
                address: r.u8()?,
                data_len: r.u8()?,
                stop_bit: r.u8()?,
                reserve: r.array()?,
                data: r.array()?,
            },
            PayloadKind::I2cReadResponse => Self::I2cReadResponse {
                status: r.u8()?,
                reserve1: r.u8()?,
                data_len: r.u8()?,
                reserve2: r.array()?,
                data: r.array()?,
            },
            PayloadKind::I2cWriteResponse => Self::I2cWriteResponse { status: r.u8()? },
        };
        Ok(payload)
    }

    fn write(&self, buf: &mut Vec<u8>) {
        match *self {
            Self::Config {
                data1,
                data2,
                data3,
            } => {
                buf.extend_from_slice(&data1.to_le_bytes());
                buf.extend_from_slice(&data2.to_le_bytes());
                buf.extend_from_slice(&data3.to_le_bytes());
            }
            Self::ReadTrigger { read_flag } => buf.push(read_flag),
            Self::MotorStatus {
                speed,
                position,
                current,
                mode,
                status,
                error,
            } => {
                buf.extend_from_slice(&speed.to_le_bytes());
                buf.extend_from_slice(&position.to_le_bytes());
                buf.extend_from_slice(&current.to_le_bytes());
                buf.extend_from_slice(&[mode, status, error]);
            }
            Self::OtherStatus {
                vin_x100,
                temp,
                encoder_counter,
                rgb_mode,
                rgb_brightness,
                reserve,
            } => {
                buf.extend_from_slice(&vin_x100.to_le_bytes());
                buf.extend_from_slice(&temp.to_le_bytes());
                buf.extend_from_slice(&encoder_counter.to_le_bytes());
                buf.extend_from_slice(&[rgb_mode, rgb_brightness, reserve]);
            }
            Self::SpeedPidRgb {
                p,
                i,
                d,
                rgb_b,
                rgb_g,
                rgb_r,
            } => {
                buf.extend_from_slice(&p.to_le_bytes());
                buf.extend_from_slice(&i.to_le_bytes());
                buf.extend_from_slice(&d.to_le_bytes());
                buf.extend_from_slice(&[rgb_b, rgb_g, rgb_r]);
            }
            Self::PositionPidBus {
                p,
                i,
                d,
                rs485_id,
                rs485_bps,
                button_switch_mode,
            } => {
                buf.extend_from_slice(&p.to_le_bytes());
                buf.extend_from_slice(&i.to_le_bytes());
                buf.extend_from_slice(&d.to_le_bytes());
                buf.extend_from_slice(&[rs485_id, rs485_bps, button_switch_mode]);
            }
            Self::I2cReadRegRequest {
                address,
                register_len,
                register,
                data_len,
            } => {
                buf.extend_from_slice(&[address, register_len]);
                buf.extend_from_slice(&register.to_le_bytes());
                buf.push(data_len);
            }
            Self::I2cWriteRegRequest {
                address,
                register_len,
                register,
                data_len,
                reserve,
                data,
            } => {
                buf.extend_from_slice(&[address, register_len]);
                buf.extend_from_slice(&register.to_le_bytes());
                buf.push(data_len);
                buf.extend_from_slice(&reserve);
                buf.extend_from_slice(&data);
            }
            Self::I2cReadRawRequest { address, data_len } => {
                buf.extend_from_slice(&[address, data_len]);
            }
            Self::I2cWriteRawRequest {
                address,
                data_len,
                stop_bit,
                reserve,
                data,
            } => {
                buf.extend_from_slice(&[address, data_len, stop_bit]);
                buf.extend_from_slice(&reserve);
                buf.extend_from_slice(&data);
            }
            Self::I2cReadResponse {
                status,
                reserve1,
                data_len,
                reserve2,
                data,
            } => {
                buf.extend_from_slice(&[status, reserve1, data_len]);
                buf.extend_from_slice(&reserve2);
                buf.extend_from_slice(&data);
            }
            Self::I2cWriteResponse { status } => buf.push(status),
        }
    }
}

/// Linear byte reader; never backtracks.
struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], FrameError> {
        if self.pos + n > self.buf.len() {
            return Err(FrameError::TooShort {
                needed: self.pos + n,
                actual: self.buf.len(),
            });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, FrameError> {
        Ok(self.take(1)?[0])
    }

    fn u16le(&mut self) -> Result<u16, FrameError> {
        Ok(u16::from_le_bytes(self.array()?))
    }

    fn i32le(&mut self) -> Result<i32, FrameError> {
        Ok(i32::from_le_bytes(self.array()?))
    }

    fn u32le(&mut self) -> Result<u32, FrameError> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], FrameError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::crc::crc8;

    fn request_bytes(command: u8, device_id: u8, data1: i32, data2: i32, data3: i32) -> Vec<u8> {
        let mut buf = vec![command, device_id];
        buf.extend_from_slice(&data1.to_le_bytes());
        buf.extend_from_slice(&data2.to_le_bytes());
        buf.extend_from_slice(&data3.to_le_bytes());
        buf.push(crc8(&buf));
        buf
    }

    fn response_bytes(command: u8, device_id: u8, data1: i32, data2: i32, data3: i32) -> Vec<u8> {
        let mut body = vec![command, device_id];
        body.extend_from_slice(&data1.to_le_bytes());
        body.extend_from_slice(&data2.to_le_bytes());
        body.extend_from_slice(&data3.to_le_bytes());
        body.push(crc8(&body[..body.len()]));
        let mut buf = RESPONSE_MAGIC.to_vec();
        buf.append(&mut body);
        buf
    }

    #[test]
    fn first_byte_discriminates_request_from_response() {
        let req = request_bytes(0x00, 0, 1, 0, 0);
        let frame = Frame::decode(&req).unwrap();
        assert!(!frame.is_response);
        assert_eq!(frame.command, CommandCode::MotorSwitch);

        let resp = response_bytes(0x10, 0, 1, 0, 0);
        let frame = Frame::decode(&resp).unwrap();
        assert!(frame.is_response);
        // Logical command comes from the third byte.
        assert_eq!(frame.command, CommandCode::MotorSwitchResp);
    }

    #[test]
    fn config_payload_fields_parse() {
        let bytes = request_bytes(0x00, 5, 1, 200, -300);
        let frame = Frame::decode(&bytes).unwrap();
        assert_eq!(frame.device_id, 5);
        assert_eq!(
            frame.payload,
            Payload::Config {
                data1: 1,
                data2: 200,
                data3: -300
            }
        );
    }

    #[test]
    fn negative_values_parse_as_signed_32bit() {
        let bytes = request_bytes(0x20, 0, -100_000, -50_000, 0);
        let frame = Frame::decode(&bytes).unwrap();
        let Payload::Config { data1, data2, .. } = frame.payload else {
            panic!("expected config payload");
        };
        assert_eq!(data1, -100_000);
        assert_eq!(data2, -50_000);
    }

    #[test]
    fn readback_request_parses_read_flag() {
        let mut bytes = vec![0x40, 0x00, 0x00];
        bytes.push(crc8(&bytes));
        let frame = Frame::decode(&bytes).unwrap();
        assert_eq!(frame.command, CommandCode::MotorStatusReadback);
        assert_eq!(frame.payload, Payload::ReadTrigger { read_flag: 0 });
    }

    #[test]
    fn motor_status_response_parses() {
        let mut body = vec![0x50, 0x00];
        body.extend_from_slice(&10000i32.to_le_bytes());
        body.extend_from_slice(&(-50000i32).to_le_bytes());
        body.extend_from_slice(&25000i32.to_le_bytes());
        body.extend_from_slice(&[1, 0, 0]);
        body.push(crc8(&body));
        let mut bytes = RESPONSE_MAGIC.to_vec();
        bytes.extend_from_slice(&body);

        let frame = Frame::decode(&bytes).unwrap();
        assert!(frame.is_response);
        assert_eq!(
            frame.payload,
            Payload::MotorStatus {
                speed: 10000,
                position: -50000,
                current: 25000,
                mode: 1,
                status: 0,
                error: 0,
            }
        );
    }

    #[test]
    fn i2c_read_register_request_parses() {
        let mut bytes = vec![0x60, 0x00, 0x50, 0x01];
        bytes.extend_from_slice(&0x1234u16.to_le_bytes());
        bytes.push(8);
        bytes.push(crc8(&bytes));
        assert_eq!(bytes.len(), frame_length(0x60));

        let frame = Frame::decode(&bytes).unwrap();
        assert_eq!(
            frame.payload,
            Payload::I2cReadRegRequest {
                address: 0x50,
                register_len: 1,
                register: 0x1234,
                data_len: 8,
            }
        );
    }

    #[test]
    fn round_trip_request() {
        let original = request_bytes(0x20, 0, 100_000, 50_000, 0);
        let frame = Frame::decode(&original).unwrap();
        assert_eq!(frame.encode(), original);
    }

    #[test]
    fn round_trip_response() {
        let original = response_bytes(0x30, 0, 100_000, 50_000, 0);
        let frame = Frame::decode(&original).unwrap();
        assert_eq!(frame.encode(), original);
    }

    #[test]
    fn round_trip_preserves_reserve_bytes() {
        // I2C read response with non-zero reserved fields must survive.
        let mut body = vec![0x70, 0x00, 1, 0xEE, 4, 0xA1, 0xA2, 0xA3];
        body.extend_from_slice(&[0x11; 16]);
        body.push(crc8(&body));
        let mut bytes = RESPONSE_MAGIC.to_vec();
        bytes.extend_from_slice(&body);
        assert_eq!(bytes.len(), frame_length(0x70));

        let frame = Frame::decode(&bytes).unwrap();
        assert_eq!(frame.encode(), bytes);
    }

    #[test]
    fn round_trip_every_enumerated_code() {
        // Shape-correct dummy frames for the whole vocabulary.
        for code in 0u8..=255 {
            let Some(command) = CommandCode::from_raw(code) else {
                continue;
            };
            let is_response = command.is_response();
            let payload_len = {
                // Everything but the marker pair, command, id and crc bytes.
                let overhead = if is_response { 5 } else { 3 };
                // The write-register request is longer than its table entry;
                // derive the payload size from the shape instead.
                match command {
                    CommandCode::I2cWriteRegister => 24,
                    _ => frame_length(code) - overhead,
                }
            };
            let mut body = vec![code, 0x07];
            body.extend((0..payload_len).map(|i| i as u8));
            body.push(crc8(&body));
            let mut bytes = Vec::new();
            if is_response {
                bytes.extend_from_slice(&RESPONSE_MAGIC);
            }
            bytes.extend_from_slice(&body);

            let frame = Frame::decode(&bytes)
                .unwrap_or_else(|e| panic!("decode failed for {code:#04x}: {e}"));
            assert_eq!(frame.encode(), bytes, "round trip failed for {code:#04x}");
        }
    }

    #[test]
    fn short_input_is_rejected() {
        let bytes = request_bytes(0x00, 0, 1, 0, 0);
        let err = Frame::decode(&bytes[..10]).unwrap_err();
        assert!(matches!(err, FrameError::TooShort { .. }));
    }

    #[test]
    fn unknown_command_is_rejected() {
        let mut bytes = vec![0x05u8, 0x00];
        bytes.extend_from_slice(&[0u8; 12]);
        bytes.push(crc8(&bytes));
        let err = Frame::decode(&bytes).unwrap_err();
        assert_eq!(err, FrameError::UnknownCommand { code: 0x05 });
    }

    #[test]
    fn bad_second_marker_byte_is_rejected() {
        let mut bytes = response_bytes(0x10, 0, 1, 0, 0);
        bytes[1] = 0x54;
        let err = Frame::decode(&bytes).unwrap_err();
        assert_eq!(err, FrameError::BadMagic { actual: 0x54 });
    }

    #[test]
    fn checksum_byte_is_carried_not_validated() {
        let mut bytes = request_bytes(0x00, 0, 1, 0, 0);
        let n = bytes.len();
        bytes[n - 1] ^= 0xFF;
        // Decode accepts it; the stored value is the corrupted byte.
        let frame = Frame::decode(&bytes).unwrap();
        assert_eq!(frame.crc8, bytes[n - 1]);
        assert_eq!(frame.encode(), bytes);
    }
}
