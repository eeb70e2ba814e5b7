// Command-line surface for the Unit-Roller485 control tool.
//
// One subcommand per peripheral operation. Setting commands print OK/FAILED
// and exit 0/1; status commands print the readback as pretty JSON; I2C reads
// print the returned bytes as lowercase hex.

use std::error::Error;
use std::str::FromStr;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

use crate::bus::{BaudRate, ButtonMode, MotorMode, Roller485, Switch};
use crate::config::{DEFAULT_BAUD_RATE, DEFAULT_TARGET, DEFAULT_TIMEOUT};

#[derive(Debug, Parser)]
#[command(name = "roller485", about = "Unit-Roller485 control tool")]
pub struct Cli {
    /// Serial port (e.g. /dev/ttyUSB0, /dev/tty.usbserial-10)
    #[arg(long)]
    pub port: String,

    /// Target device id
    #[arg(long, default_value_t = DEFAULT_TARGET)]
    pub target: u8,

    /// Baud rate
    #[arg(long, default_value_t = DEFAULT_BAUD_RATE)]
    pub baudrate: u32,

    /// Read timeout in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT.as_secs_f64())]
    pub timeout: f64,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Turn the motor on or off
    MotorSwitch { state: SwitchArg },
    /// Set the control mode (saved to flash)
    ModeSetting { mode: ModeArg },
    /// Remove a protection latch by status code
    RemoveProtection { status: u16 },
    /// Save settings to flash memory
    SaveToFlash,
    /// Overwrite the encoder count
    SetEncoder { value: i32 },
    /// Allow switching modes with the device button
    ButtonSwitchingMode { mode: SwitchArg },
    /// Control the RGB LED (saved to flash)
    RgbLedControl {
        /// Red (0-255)
        #[arg(long, default_value_t = 0)]
        r: u16,
        /// Green (0-255)
        #[arg(long, default_value_t = 0)]
        g: u16,
        /// Blue (0-255)
        #[arg(long, default_value_t = 0)]
        b: u16,
        /// 0: system state display, 1: user-defined color
        #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=1))]
        mode: u8,
        /// Brightness (0-100)
        #[arg(long, default_value_t = 100)]
        brightness: u8,
    },
    /// Set the RS485 baud rate (saved to flash)
    SetRs485BaudRate { baud_rate: BaudArg },
    /// Set the device id (saved to flash)
    SetDeviceId { device_id: u16 },
    /// Enable or disable motor jam protection
    SetMotorJamProtection { enable: SwitchArg },
    /// Enable or disable position over-range protection (saved to flash)
    SetMotorPositionOverRangeProtection { enable: SwitchArg },
    /// Set motor speed [RPM] and max current [mA]
    SetSpeedAndMaxCurrent { speed: f64, max_current: f64 },
    /// Set speed PID gains (saved to flash)
    SetSpeedPid { p: f64, i: f64, d: f64 },
    /// Set motor position [counts] and max current [mA]
    SetPositionAndMaxCurrent { position: f64, max_current: f64 },
    /// Set position PID gains (saved to flash)
    SetPositionPid { p: f64, i: f64, d: f64 },
    /// Set motor current [mA]
    SetCurrent { current: f64 },
    /// Read motor status
    GetMotorStatus,
    /// Read supply voltage, temperature and LED status
    GetOtherStatus,
    /// Read speed PID gains and LED color
    GetSpeedPidAndRgb,
    /// Read position PID gains and bus settings
    GetPositionPidAndOther,
    /// Read an I2C register through the device
    ReadI2c {
        /// I2C address (e.g. 0x50)
        #[arg(value_parser = parse_u8)]
        addr: u8,
        /// Register address length (0: 1 byte, 1: 2 bytes)
        #[arg(value_parser = clap::value_parser!(u8).range(0..=1))]
        reg_len: u8,
        /// Register address (e.g. 0x00)
        #[arg(value_parser = parse_u16)]
        reg_addr: u16,
        /// Number of bytes to read (0-16)
        #[arg(value_parser = clap::value_parser!(u8).range(0..=16))]
        data_len: u8,
    },
    /// Write an I2C register through the device
    WriteI2c {
        #[arg(value_parser = parse_u8)]
        addr: u8,
        #[arg(value_parser = clap::value_parser!(u8).range(0..=1))]
        reg_len: u8,
        #[arg(value_parser = parse_u16)]
        reg_addr: u16,
        /// Data to write (hex string, e.g. 0102ff)
        data: HexData,
    },
    /// Read raw I2C data
    ReadI2cRaw {
        #[arg(value_parser = parse_u8)]
        addr: u8,
        #[arg(value_parser = clap::value_parser!(u8).range(0..=16))]
        data_len: u8,
    },
    /// Write raw I2C data
    WriteI2cRaw {
        #[arg(value_parser = parse_u8)]
        addr: u8,
        /// Stop bit (0: none, 1: present)
        #[arg(value_parser = clap::value_parser!(u8).range(0..=1))]
        stop_bit: u8,
        /// Data to write (hex string, e.g. 0102ff)
        data: HexData,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SwitchArg {
    On,
    Off,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ModeArg {
    Speed,
    Position,
    Current,
    Encoder,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum BaudArg {
    #[value(name = "115200")]
    Baud115200,
    #[value(name = "19200")]
    Baud19200,
    #[value(name = "9600")]
    Baud9600,
}

impl From<SwitchArg> for Switch {
    fn from(arg: SwitchArg) -> Self {
        match arg {
            SwitchArg::On => Switch::On,
            SwitchArg::Off => Switch::Off,
        }
    }
}

impl From<SwitchArg> for ButtonMode {
    fn from(arg: SwitchArg) -> Self {
        match arg {
            SwitchArg::On => ButtonMode::On,
            SwitchArg::Off => ButtonMode::Off,
        }
    }
}

impl From<SwitchArg> for bool {
    fn from(arg: SwitchArg) -> Self {
        matches!(arg, SwitchArg::On)
    }
}

impl From<ModeArg> for MotorMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Speed => MotorMode::Speed,
            ModeArg::Position => MotorMode::Position,
            ModeArg::Current => MotorMode::Current,
            ModeArg::Encoder => MotorMode::Encoder,
        }
    }
}

impl From<BaudArg> for BaudRate {
    fn from(arg: BaudArg) -> Self {
        match arg {
            BaudArg::Baud115200 => BaudRate::Baud115200,
            BaudArg::Baud19200 => BaudRate::Baud19200,
            BaudArg::Baud9600 => BaudRate::Baud9600,
        }
    }
}

/// Hex-string positional argument ("0102ff" -> [0x01, 0x02, 0xFF]).
#[derive(Debug, Clone)]
pub struct HexData(pub Vec<u8>);

impl FromStr for HexData {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() % 2 != 0 {
            return Err("hex data needs an even number of digits".into());
        }
        (0..s.len())
            .step_by(2)
            .map(|i| {
                u8::from_str_radix(&s[i..i + 2], 16)
                    .map_err(|_| format!("invalid hex byte {:?}", &s[i..i + 2]))
            })
            .collect::<Result<Vec<u8>, _>>()
            .map(HexData)
    }
}

/// Integer argument with an optional 0x/0o/0b radix prefix.
fn parse_u16(s: &str) -> Result<u16, String> {
    let (radix, digits) = split_radix(s);
    u16::from_str_radix(digits, radix).map_err(|e| e.to_string())
}

fn parse_u8(s: &str) -> Result<u8, String> {
    let (radix, digits) = split_radix(s);
    u8::from_str_radix(digits, radix).map_err(|e| e.to_string())
}

fn split_radix(s: &str) -> (u32, &str) {
    if let Some(rest) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        (16, rest)
    } else if let Some(rest) = s.strip_prefix("0o").or_else(|| s.strip_prefix("0O")) {
        (8, rest)
    } else if let Some(rest) = s.strip_prefix("0b").or_else(|| s.strip_prefix("0B")) {
        (2, rest)
    } else {
        (10, s)
    }
}

/// Parse arguments, run the command, return the process exit code.
pub fn run() -> i32 {
    let cli = Cli::parse();
    match execute(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            1
        }
    }
}

fn execute(cli: Cli) -> Result<i32, Box<dyn Error>> {
    let mut bus = Roller485::open(
        &cli.port,
        cli.target,
        cli.baudrate,
        Duration::from_secs_f64(cli.timeout),
    )?;
    if !bus.is_open() {
        return Err("serial port is not ready".into());
    }

    let code = match cli.command {
        Command::MotorSwitch { state } => outcome(bus.motor_switch(state.into())?),
        Command::ModeSetting { mode } => outcome(bus.set_mode(mode.into())?),
        Command::RemoveProtection { status } => outcome(bus.remove_protection(status)?),
        Command::SaveToFlash => outcome(bus.save_to_flash()?),
        Command::SetEncoder { value } => outcome(bus.set_encoder(value)?),
        Command::ButtonSwitchingMode { mode } => outcome(bus.set_button_mode(mode.into())?),
        Command::RgbLedControl {
            r,
            g,
            b,
            mode,
            brightness,
        } => outcome(bus.set_rgb_led(r, g, b, mode, brightness)?),
        Command::SetRs485BaudRate { baud_rate } => outcome(bus.set_baud_rate(baud_rate.into())?),
        Command::SetDeviceId { device_id } => outcome(bus.set_device_id(device_id)?),
        Command::SetMotorJamProtection { enable } => {
            outcome(bus.set_jam_protection(enable.into())?)
        }
        Command::SetMotorPositionOverRangeProtection { enable } => {
            outcome(bus.set_position_over_range_protection(enable.into())?)
        }
        Command::SetSpeedAndMaxCurrent { speed, max_current } => {
            outcome(bus.set_speed(speed, max_current)?)
        }
        Command::SetSpeedPid { p, i, d } => outcome(bus.set_speed_pid(p, i, d)?),
        Command::SetPositionAndMaxCurrent {
            position,
            max_current,
        } => outcome(bus.set_position(position, max_current)?),
        Command::SetPositionPid { p, i, d } => outcome(bus.set_position_pid(p, i, d)?),
        Command::SetCurrent { current } => outcome(bus.set_current(current)?),
        Command::GetMotorStatus => json_outcome(bus.motor_status()?)?,
        Command::GetOtherStatus => json_outcome(bus.other_status()?)?,
        Command::GetSpeedPidAndRgb => json_outcome(bus.speed_pid_rgb()?)?,
        Command::GetPositionPidAndOther => json_outcome(bus.position_pid_bus()?)?,
        Command::ReadI2c {
            addr,
            reg_len,
            reg_addr,
            data_len,
        } => data_outcome(bus.read_i2c_register(addr, reg_len, reg_addr, data_len)?),
        Command::WriteI2c {
            addr,
            reg_len,
            reg_addr,
            data,
        } => outcome(bus.write_i2c_register(addr, reg_len, reg_addr, &data.0)?),
        Command::ReadI2cRaw { addr, data_len } => data_outcome(bus.read_i2c_raw(addr, data_len)?),
        Command::WriteI2cRaw {
            addr,
            stop_bit,
            data,
        } => outcome(bus.write_i2c_raw(addr, stop_bit != 0, &data.0)?),
    };

    bus.flush()?;
    Ok(code)
}

fn outcome(confirmed: bool) -> i32 {
    if confirmed {
        println!("OK");
        0
    } else {
        eprintln!("FAILED");
        1
    }
}

fn json_outcome<T: Serialize>(result: Option<T>) -> Result<i32, Box<dyn Error>> {
    match result {
        Some(value) => {
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(0)
        }
        None => {
            println!("{{}}");
            Ok(1)
        }
    }
}

fn data_outcome(result: Option<Vec<u8>>) -> i32 {
    match result {
        Some(data) => {
            let hex: String = data.iter().map(|b| format!("{b:02x}")).collect();
            println!("{hex}");
            0
        }
        None => {
            eprintln!("Read failed");
            1
        }
    }
}
