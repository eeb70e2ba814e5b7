// Command vocabulary for the Unit-Roller485.
//
// Codes are partitioned by numeric range: plain settings (0x00-0x0E) ack at
// +0x10, closed-loop control (0x20-0x24) ack at +0x10, status readbacks
// (0x40-0x43) respond at +0x10, I2C pass-through (0x60-0x63) responds at
// +0x10.

/// One-byte operation identifier.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandCode {
    // Settings
    MotorSwitch = 0x00,
    ModeSetting = 0x01,
    RemoveProtection = 0x06,
    SaveToFlash = 0x07,
    Encoder = 0x08,
    ButtonSwitchMode = 0x09,
    RgbLedControl = 0x0A,
    Rs485BaudRate = 0x0B,
    DeviceId = 0x0C,
    MotorJamProtection = 0x0D,
    MotorPositionOverRangeProtection = 0x0E,
    // Settings acks
    MotorSwitchResp = 0x10,
    ModeSettingResp = 0x11,
    RemoveProtectionResp = 0x16,
    SaveToFlashResp = 0x17,
    EncoderResp = 0x18,
    ButtonSwitchModeResp = 0x19,
    RgbLedControlResp = 0x1A,
    Rs485BaudRateResp = 0x1B,
    DeviceIdResp = 0x1C,
    MotorJamProtectionResp = 0x1D,
    MotorPositionOverRangeProtectionResp = 0x1E,
    // Closed-loop control
    SpeedControl = 0x20,
    SpeedPidConfig = 0x21,
    PositionControl = 0x22,
    PositionPidConfig = 0x23,
    CurrentControl = 0x24,
    // Closed-loop control acks
    SpeedControlResp = 0x30,
    SpeedPidConfigResp = 0x31,
    PositionControlResp = 0x32,
    PositionPidConfigResp = 0x33,
    CurrentControlResp = 0x34,
    // Status readback requests
    MotorStatusReadback = 0x40,
    OtherStatusReadback = 0x41,
    SpeedPidReadback = 0x42,
    PositionPidReadback = 0x43,
    // Status readback responses
    MotorStatusReadbackResp = 0x50,
    OtherStatusReadbackResp = 0x51,
    SpeedPidReadbackResp = 0x52,
    PositionPidReadbackResp = 0x53,
    // I2C pass-through requests
    I2cReadRegister = 0x60,
    I2cWriteRegister = 0x61,
    I2cReadRaw = 0x62,
    I2cWriteRaw = 0x63,
    // I2C pass-through responses
    I2cReadRegisterResp = 0x70,
    I2cWriteRegisterResp = 0x71,
    I2cReadRawResp = 0x72,
    I2cWriteRawResp = 0x73,
}

/// Wire shape of the payload that follows the device-id byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    /// Three s32le fields, 12 bytes. Settings and their acks.
    Config,
    /// Single read-flag byte. Status readback requests.
    ReadTrigger,
    /// speed/position/current + mode/status/error, 15 bytes.
    MotorStatus,
    /// vin/temp/encoder + rgb mode/brightness/reserve, 15 bytes.
    OtherStatus,
    /// Speed PID gains + BGR channels, 15 bytes.
    SpeedPidRgb,
    /// Position PID gains + bus id/baud/button mode, 15 bytes.
    PositionPidBus,
    /// addr, reg len, reg addr, data len, 5 bytes.
    I2cReadRegRequest,
    /// Read-register prefix + reserve + 16 data bytes, 24 bytes.
    I2cWriteRegRequest,
    /// addr, data len, 2 bytes.
    I2cReadRawRequest,
    /// addr, data len, stop bit, reserve, 16 data bytes, 22 bytes.
    I2cWriteRawRequest,
    /// status, reserves, data len, 16 data bytes, 22 bytes.
    I2cReadResponse,
    /// Single write-status byte.
    I2cWriteResponse,
}

impl CommandCode {
    /// Map a raw wire byte to the vocabulary. `None` for unassigned codes.
    pub fn from_raw(code: u8) -> Option<Self> {
        let cmd = match code {
            0x00 => Self::MotorSwitch,
            0x01 => Self::ModeSetting,
            0x06 => Self::RemoveProtection,
            0x07 => Self::SaveToFlash,
            0x08 => Self::Encoder,
            0x09 => Self::ButtonSwitchMode,
            0x0A => Self::RgbLedControl,
            0x0B => Self::Rs485BaudRate,
            0x0C => Self::DeviceId,
            0x0D => Self::MotorJamProtection,
            0x0E => Self::MotorPositionOverRangeProtection,
            0x10 => Self::MotorSwitchResp,
            0x11 => Self::ModeSettingResp,
            0x16 => Self::RemoveProtectionResp,
            0x17 => Self::SaveToFlashResp,
            0x18 => Self::EncoderResp,
            0x19 => Self::ButtonSwitchModeResp,
            0x1A => Self::RgbLedControlResp,
            0x1B => Self::Rs485BaudRateResp,
            0x1C => Self::DeviceIdResp,
            0x1D => Self::MotorJamProtectionResp,
            0x1E => Self::MotorPositionOverRangeProtectionResp,
            0x20 => Self::SpeedControl,
            0x21 => Self::SpeedPidConfig,
            0x22 => Self::PositionControl,
            0x23 => Self::PositionPidConfig,
            0x24 => Self::CurrentControl,
            0x30 => Self::SpeedControlResp,
            0x31 => Self::SpeedPidConfigResp,
            0x32 => Self::PositionControlResp,
            0x33 => Self::PositionPidConfigResp,
            0x34 => Self::CurrentControlResp,
            0x40 => Self::MotorStatusReadback,
            0x41 => Self::OtherStatusReadback,
            0x42 => Self::SpeedPidReadback,
            0x43 => Self::PositionPidReadback,
            0x50 => Self::MotorStatusReadbackResp,
            0x51 => Self::OtherStatusReadbackResp,
            0x52 => Self::SpeedPidReadbackResp,
            0x53 => Self::PositionPidReadbackResp,
            0x60 => Self::I2cReadRegister,
            0x61 => Self::I2cWriteRegister,
            0x62 => Self::I2cReadRaw,
            0x63 => Self::I2cWriteRaw,
            0x70 => Self::I2cReadRegisterResp,
            0x71 => Self::I2cWriteRegisterResp,
            0x72 => Self::I2cReadRawResp,
            0x73 => Self::I2cWriteRawResp,
            _ => return None,
        };
        Some(cmd)
    }

    /// Whether this code names a device-to-host response.
    pub fn is_response(self) -> bool {
        matches!(self as u8, 0x10..=0x1E | 0x30..=0x34 | 0x50..=0x53 | 0x70..=0x73)
    }

    /// Payload shape selected by this code.
    pub fn payload_kind(self) -> PayloadKind {
        match self {
            Self::MotorStatusReadback
            | Self::OtherStatusReadback
            | Self::SpeedPidReadback
            | Self::PositionPidReadback => PayloadKind::ReadTrigger,
            Self::MotorStatusReadbackResp => PayloadKind::MotorStatus,
            Self::OtherStatusReadbackResp => PayloadKind::OtherStatus,
            Self::SpeedPidReadbackResp => PayloadKind::SpeedPidRgb,
            Self::PositionPidReadbackResp => PayloadKind::PositionPidBus,
            Self::I2cReadRegister => PayloadKind::I2cReadRegRequest,
            Self::I2cWriteRegister => PayloadKind::I2cWriteRegRequest,
            Self::I2cReadRaw => PayloadKind::I2cReadRawRequest,
            Self::I2cWriteRaw => PayloadKind::I2cWriteRawRequest,
            Self::I2cReadRegisterResp | Self::I2cReadRawResp => PayloadKind::I2cReadResponse,
            Self::I2cWriteRegisterResp | Self::I2cWriteRawResp => PayloadKind::I2cWriteResponse,
            _ => PayloadKind::Config,
        }
    }
}

/// Total frame length in bytes for a command code, marker bytes included.
///
/// The I2C entries reproduce the device documentation verbatim; they are not
/// derivable from the payload shapes alone.
pub fn frame_length(code: u8) -> usize {
    match code {
        // Status readback requests
        0x40..=0x43 => 4,
        // Status readback responses (18 + 2 marker bytes)
        0x50..=0x53 => 20,
        // I2C requests
        0x60 => 8,
        0x61 => 25,
        0x62 => 5,
        0x63 => 25,
        // I2C responses (payload + 2 marker bytes)
        0x70 => 27,
        0x71 => 6,
        0x72 => 27,
        0x73 => 6,
        // Settings / control acks (15 + 2 marker bytes)
        0x10..=0x1E | 0x30..=0x34 => 17,
        // Settings / control requests
        _ => 15,
    }
}
