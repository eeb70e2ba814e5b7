// Exchange engine for the Unit-Roller485.
//
// Every peripheral operation is one synchronous exchange: build a request
// frame, write it, wait out the settling delay, read the expected number of
// bytes, decode, check the checksum, compare the echoed fields. The device
// acknowledges a setting by echoing the values it applied, so "success" means
// the echo equals what was sent (after clamping and scaling, which happen
// here and never inside the codec).

use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::{
    BRIGHTNESS_LIMIT, CURRENT_LIMIT, PID_SCALE, POSITION_LIMIT, SETTLE_DELAY, SPEED_LIMIT,
    VALUE_SCALE,
};
use crate::protocol::{CommandCode, Frame, FrameError, I2C_DATA_LEN, Payload, crc8, frame_length};
use crate::status::{MotorStatus, OtherStatus, PositionPidBus, SpeedPidRgb};
use crate::transport::{SerialTransport, Transport};

/// Errors surfaced by the exchange engine. Checksum and echo mismatches are
/// not errors — they come back as `false`/`None`.
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed frame: {0}")]
    Frame(#[from] FrameError),

    #[error("i2c data too long: {len} bytes, at most {I2C_DATA_LEN} allowed")]
    I2cDataTooLong { len: usize },
}

pub type Result<T> = std::result::Result<T, BusError>;

/// Motor power state.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Switch {
    Off = 0,
    On = 1,
}

/// Closed-loop control mode. Persisted to flash by the device.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotorMode {
    Speed = 1,
    Position = 2,
    Current = 3,
    Encoder = 4,
}

/// Mode-switch-by-button behavior (hold 5 s while running).
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonMode {
    Off = 0,
    On = 1,
}

/// RS485 baud rate selector, wire-encoded as 0/1/2.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaudRate {
    Baud115200 = 0,
    Baud19200 = 1,
    Baud9600 = 2,
}

/// Handle for one Unit-Roller485 on a shared half-duplex bus.
///
/// Holds the transport and the target device id; nothing else is retained
/// between operations. The caller owns serialization across threads.
pub struct Roller485<T> {
    transport: T,
    target: u8,
}

impl Roller485<SerialTransport> {
    /// Open the serial port and address device `target`.
    pub fn open(port: &str, target: u8, baud_rate: u32, timeout: Duration) -> Result<Self> {
        let transport = SerialTransport::open(port, baud_rate, timeout)?;
        Ok(Self::with_transport(transport, target))
    }
}

impl<T: Transport> Roller485<T> {
    pub fn with_transport(transport: T, target: u8) -> Self {
        Self { transport, target }
    }

    pub fn is_open(&self) -> bool {
        self.transport.is_open()
    }

    /// Access the underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn flush(&mut self) -> Result<()> {
        self.transport.flush()?;
        Ok(())
    }

    // === Settings ===

    /// Turn the motor on or off.
    pub fn motor_switch(&mut self, state: Switch) -> Result<bool> {
        self.setting(
            CommandCode::MotorSwitch,
            CommandCode::MotorSwitchResp,
            state as i32,
            0,
            0,
        )
    }

    /// Set the control mode. Persisted to flash.
    pub fn set_mode(&mut self, mode: MotorMode) -> Result<bool> {
        self.setting(
            CommandCode::ModeSetting,
            CommandCode::ModeSettingResp,
            mode as i32,
            0,
            0,
        )
    }

    /// Clear a protection latch by its status code.
    pub fn remove_protection(&mut self, status: u16) -> Result<bool> {
        let status = status.min(255) as i32;
        self.setting(
            CommandCode::RemoveProtection,
            CommandCode::RemoveProtectionResp,
            status,
            0,
            0,
        )
    }

    /// Commit current settings to persistent flash.
    pub fn save_to_flash(&mut self) -> Result<bool> {
        self.setting(CommandCode::SaveToFlash, CommandCode::SaveToFlashResp, 1, 0, 0)
    }

    /// Overwrite the encoder count.
    pub fn set_encoder(&mut self, value: i32) -> Result<bool> {
        self.setting(CommandCode::Encoder, CommandCode::EncoderResp, value, 0, 0)
    }

    /// Enable or disable mode switching via the device button.
    pub fn set_button_mode(&mut self, mode: ButtonMode) -> Result<bool> {
        self.setting(
            CommandCode::ButtonSwitchMode,
            CommandCode::ButtonSwitchModeResp,
            mode as i32,
            0,
            0,
        )
    }

    /// Set LED color, mode and brightness. Persisted to flash.
    ///
    /// Channels clamp to 0-255, mode to 0-1, brightness to 0-100; the color
    /// packs into one field as r + g*256 + b*256^2 + mode*256^3.
    pub fn set_rgb_led(&mut self, r: u16, g: u16, b: u16, mode: u8, brightness: u8) -> Result<bool> {
        let (r, g, b) = (r.min(255) as u32, g.min(255) as u32, b.min(255) as u32);
        let mode = mode.min(1) as u32;
        let brightness = brightness.min(BRIGHTNESS_LIMIT) as i32;
        let packed = (r + (g << 8) + (b << 16) + (mode << 24)) as i32;
        self.setting(
            CommandCode::RgbLedControl,
            CommandCode::RgbLedControlResp,
            packed,
            brightness,
            0,
        )
    }

    /// Set the RS485 baud rate. Persisted to flash.
    pub fn set_baud_rate(&mut self, baud_rate: BaudRate) -> Result<bool> {
        self.setting(
            CommandCode::Rs485BaudRate,
            CommandCode::Rs485BaudRateResp,
            baud_rate as i32,
            0,
            0,
        )
    }

    /// Assign a new device id (clamped to 0-255). Persisted to flash.
    pub fn set_device_id(&mut self, device_id: u16) -> Result<bool> {
        let device_id = device_id.min(255) as i32;
        self.setting(CommandCode::DeviceId, CommandCode::DeviceIdResp, device_id, 0, 0)
    }

    /// Enable or disable jam protection.
    pub fn set_jam_protection(&mut self, enable: bool) -> Result<bool> {
        self.setting(
            CommandCode::MotorJamProtection,
            CommandCode::MotorJamProtectionResp,
            enable as i32,
            0,
            0,
        )
    }

    /// Enable or disable position over-range protection. Persisted to flash.
    pub fn set_position_over_range_protection(&mut self, enable: bool) -> Result<bool> {
        self.setting(
            CommandCode::MotorPositionOverRangeProtection,
            CommandCode::MotorPositionOverRangeProtectionResp,
            enable as i32,
            0,
            0,
        )
    }

    // === Closed-loop control ===

    /// Set target speed [RPM] and current limit [mA] for speed mode.
    pub fn set_speed(&mut self, speed: f64, max_current: f64) -> Result<bool> {
        self.setting(
            CommandCode::SpeedControl,
            CommandCode::SpeedControlResp,
            scale_value(speed, SPEED_LIMIT),
            scale_value(max_current, CURRENT_LIMIT),
            0,
        )
    }

    /// Set speed-loop PID gains. Persisted to flash.
    pub fn set_speed_pid(&mut self, p: f64, i: f64, d: f64) -> Result<bool> {
        self.setting(
            CommandCode::SpeedPidConfig,
            CommandCode::SpeedPidConfigResp,
            scale_pid(p),
            scale_pid(i),
            scale_pid(d),
        )
    }

    /// Set target position [counts] and current limit [mA] for position mode.
    pub fn set_position(&mut self, position: f64, max_current: f64) -> Result<bool> {
        self.setting(
            CommandCode::PositionControl,
            CommandCode::PositionControlResp,
            scale_value(position, POSITION_LIMIT),
            scale_value(max_current, CURRENT_LIMIT),
            0,
        )
    }

    /// Set position-loop PID gains. Persisted to flash.
    pub fn set_position_pid(&mut self, p: f64, i: f64, d: f64) -> Result<bool> {
        self.setting(
            CommandCode::PositionPidConfig,
            CommandCode::PositionPidConfigResp,
            scale_pid(p),
            scale_pid(i),
            scale_pid(d),
        )
    }

    /// Set target current [mA] for current mode.
    pub fn set_current(&mut self, current: f64) -> Result<bool> {
        self.setting(
            CommandCode::CurrentControl,
            CommandCode::CurrentControlResp,
            scale_value(current, CURRENT_LIMIT),
            0,
            0,
        )
    }

    // === Status readback ===

    /// Read speed, position, current, mode and error state.
    pub fn motor_status(&mut self) -> Result<Option<MotorStatus>> {
        self.send_readback(CommandCode::MotorStatusReadback)?;
        self.settle();
        let Some(frame) = self.read_verified(CommandCode::MotorStatusReadbackResp)? else {
            return Ok(None);
        };
        let Payload::MotorStatus {
            speed,
            position,
            current,
            mode,
            status,
            error,
        } = frame.payload
        else {
            return Ok(None);
        };
        Ok(Some(MotorStatus {
            speed: speed as f64 / VALUE_SCALE,
            position: position as f64 / VALUE_SCALE,
            current: current as f64 / VALUE_SCALE,
            mode,
            status,
            error,
        }))
    }

    /// Read supply voltage, temperature, encoder counter and LED state.
    pub fn other_status(&mut self) -> Result<Option<OtherStatus>> {
        self.send_readback(CommandCode::OtherStatusReadback)?;
        self.settle();
        let Some(frame) = self.read_verified(CommandCode::OtherStatusReadbackResp)? else {
            return Ok(None);
        };
        let Payload::OtherStatus {
            vin_x100,
            temp,
            encoder_counter,
            rgb_mode,
            rgb_brightness,
            ..
        } = frame.payload
        else {
            return Ok(None);
        };
        Ok(Some(OtherStatus {
            vin: vin_x100 as f64 / VALUE_SCALE,
            temp,
            encoder_counter,
            rgb_mode,
            rgb_brightness,
        }))
    }

    /// Read the speed-loop PID gains and the LED color.
    pub fn speed_pid_rgb(&mut self) -> Result<Option<SpeedPidRgb>> {
        self.send_readback(CommandCode::SpeedPidReadback)?;
        self.settle();
        let Some(frame) = self.read_verified(CommandCode::SpeedPidReadbackResp)? else {
            return Ok(None);
        };
        let Payload::SpeedPidRgb {
            p,
            i,
            d,
            rgb_b,
            rgb_g,
            rgb_r,
        } = frame.payload
        else {
            return Ok(None);
        };
        Ok(Some(SpeedPidRgb {
            speed_p: p as f64 / PID_SCALE,
            speed_i: i as f64 / PID_SCALE,
            speed_d: d as f64 / PID_SCALE,
            rgb_r,
            rgb_g,
            rgb_b,
        }))
    }

    /// Read the position-loop PID gains and the bus settings.
    pub fn position_pid_bus(&mut self) -> Result<Option<PositionPidBus>> {
        self.send_readback(CommandCode::PositionPidReadback)?;
        self.settle();
        let Some(frame) = self.read_verified(CommandCode::PositionPidReadbackResp)? else {
            return Ok(None);
        };
        let Payload::PositionPidBus {
            p,
            i,
            d,
            rs485_id,
            rs485_bps,
            button_switch_mode,
        } = frame.payload
        else {
            return Ok(None);
        };
        Ok(Some(PositionPidBus {
            position_p: p as f64 / PID_SCALE,
            position_i: i as f64 / PID_SCALE,
            position_d: d as f64 / PID_SCALE,
            rs485_id,
            rs485_bps,
            button_switch_mode,
        }))
    }

    // === I2C pass-through ===

    /// Read up to 16 bytes from a register behind the device's I2C master.
    /// `register_len` selects a 1-byte (0) or 2-byte (1) register address.
    pub fn read_i2c_register(
        &mut self,
        address: u8,
        register_len: u8,
        register: u16,
        data_len: u8,
    ) -> Result<Option<Vec<u8>>> {
        self.send_request(
            CommandCode::I2cReadRegister,
            Payload::I2cReadRegRequest {
                address,
                register_len,
                register,
                data_len,
            },
        )?;
        self.settle();
        self.read_i2c_data(CommandCode::I2cReadRegisterResp)
    }

    /// Write up to 16 bytes to a register behind the device's I2C master.
    pub fn write_i2c_register(
        &mut self,
        address: u8,
        register_len: u8,
        register: u16,
        data: &[u8],
    ) -> Result<bool> {
        let (data, data_len) = i2c_data_field(data)?;
        self.send_request(
            CommandCode::I2cWriteRegister,
            Payload::I2cWriteRegRequest {
                address,
                register_len,
                register,
                data_len,
                reserve: [0; 3],
                data,
            },
        )?;
        self.settle();
        self.read_i2c_ack(CommandCode::I2cWriteRegisterResp)
    }

    /// Raw I2C read without register addressing.
    pub fn read_i2c_raw(&mut self, address: u8, data_len: u8) -> Result<Option<Vec<u8>>> {
        self.send_request(
            CommandCode::I2cReadRaw,
            Payload::I2cReadRawRequest { address, data_len },
        )?;
        self.settle();
        self.read_i2c_data(CommandCode::I2cReadRawResp)
    }

    /// Raw I2C write with an explicit stop-bit flag.
    pub fn write_i2c_raw(&mut self, address: u8, stop_bit: bool, data: &[u8]) -> Result<bool> {
        let (data, data_len) = i2c_data_field(data)?;
        self.send_request(
            CommandCode::I2cWriteRaw,
            Payload::I2cWriteRawRequest {
                address,
                data_len,
                stop_bit: stop_bit as u8,
                reserve: [0; 3],
                data,
            },
        )?;
        self.settle();
        self.read_i2c_ack(CommandCode::I2cWriteRawResp)
    }

    // === Exchange plumbing ===

    fn settle(&self) {
        thread::sleep(SETTLE_DELAY);
    }

    /// One settings exchange: send, settle, verify the echoed values.
    fn setting(
        &mut self,
        command: CommandCode,
        response: CommandCode,
        data1: i32,
        data2: i32,
        data3: i32,
    ) -> Result<bool> {
        self.send_request(
            command,
            Payload::Config {
                data1,
                data2,
                data3,
            },
        )?;
        self.settle();
        let Some(frame) = self.read_verified(response)? else {
            return Ok(false);
        };
        let confirmed = matches!(
            frame.payload,
            Payload::Config {
                data1: r1,
                data2: r2,
                data3: r3,
            } if r1 == data1 && r2 == data2 && r3 == data3
        );
        if !confirmed {
            warn!(command = ?command, "device echoed different values than requested");
        }
        Ok(confirmed)
    }

    /// Encode a request frame, patch in the checksum, write it out.
    fn send_request(&mut self, command: CommandCode, payload: Payload) -> Result<()> {
        let frame = Frame {
            command,
            is_response: false,
            device_id: self.target,
            payload,
            crc8: 0,
        };
        let mut buf = frame.encode();
        let end = buf.len() - 1;
        buf[end] = crc8(&buf[..end]);
        debug!(command = ?command, "tx {:02X?}", buf);
        self.transport.write(&buf)?;
        self.transport.flush()?;
        Ok(())
    }

    fn send_readback(&mut self, command: CommandCode) -> Result<()> {
        self.send_request(command, Payload::ReadTrigger { read_flag: 0 })
    }

    /// Read one response frame and gate it on its checksum. The checksum
    /// covers everything between the marker pair and the final byte.
    fn read_verified(&mut self, response: CommandCode) -> Result<Option<Frame>> {
        let raw = self.transport.read(frame_length(response as u8))?;
        debug!(command = ?response, "rx {:02X?}", raw);
        let frame = Frame::decode(&raw)?;
        let computed = crc8(&raw[2..raw.len() - 1]);
        if computed != frame.crc8 {
            warn!(
                command = ?response,
                expected = computed,
                received = frame.crc8,
                "checksum mismatch, dropping response"
            );
            return Ok(None);
        }
        Ok(Some(frame))
    }

    fn read_i2c_data(&mut self, response: CommandCode) -> Result<Option<Vec<u8>>> {
        let Some(frame) = self.read_verified(response)? else {
            return Ok(None);
        };
        let Payload::I2cReadResponse { data_len, data, .. } = frame.payload else {
            return Ok(None);
        };
        let n = (data_len as usize).min(I2C_DATA_LEN);
        Ok(Some(data[..n].to_vec()))
    }

    fn read_i2c_ack(&mut self, response: CommandCode) -> Result<bool> {
        let Some(frame) = self.read_verified(response)? else {
            return Ok(false);
        };
        let Payload::I2cWriteResponse { status } = frame.payload else {
            return Ok(false);
        };
        Ok(status == 1)
    }
}

/// Clamp a physical value to `limit`, scale by 100 and truncate.
fn scale_value(value: f64, limit: f64) -> i32 {
    (value.clamp(-limit, limit) * VALUE_SCALE) as i32
}

/// Scale a PID gain by 100 000 and truncate.
fn scale_pid(gain: f64) -> i32 {
    (gain * PID_SCALE) as i32
}

/// Zero-pad caller data into the fixed 16-byte I2C field.
fn i2c_data_field(data: &[u8]) -> Result<([u8; I2C_DATA_LEN], u8)> {
    if data.len() > I2C_DATA_LEN {
        return Err(BusError::I2cDataTooLong { len: data.len() });
    }
    let mut field = [0u8; I2C_DATA_LEN];
    field[..data.len()].copy_from_slice(data);
    Ok((field, data.len() as u8))
}
