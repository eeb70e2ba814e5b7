// Byte transport seam for the RS485 bus.
//
// The exchange engine only needs a half-duplex, timeout-bounded byte channel;
// keeping it behind a trait lets the tests script exchanges without hardware.

use std::io::{self, Read, Write};
use std::time::Duration;

use serialport::SerialPort;
use tracing::info;

/// Half-duplex byte channel with a bounded blocking read.
pub trait Transport {
    /// Write the whole buffer.
    fn write(&mut self, buf: &[u8]) -> io::Result<()>;

    /// Read up to `n` bytes, blocking no longer than the configured timeout.
    /// May return fewer than `n` bytes if the device stops talking.
    fn read(&mut self, n: usize) -> io::Result<Vec<u8>>;

    /// Block until all written bytes are on the wire.
    fn flush(&mut self) -> io::Result<()>;

    /// Readiness signal polled before the first command.
    fn is_open(&self) -> bool;
}

/// Production transport over a serial port.
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
}

impl SerialTransport {
    pub fn open(
        port_name: &str,
        baud_rate: u32,
        timeout: Duration,
    ) -> Result<Self, serialport::Error> {
        info!("Opening serial port {} at {} baud", port_name, baud_rate);
        let port = serialport::new(port_name, baud_rate)
            .timeout(timeout)
            .open()?;
        Ok(Self { port })
    }
}

impl Transport for SerialTransport {
    fn write(&mut self, buf: &[u8]) -> io::Result<()> {
        self.port.write_all(buf)
    }

    fn read(&mut self, n: usize) -> io::Result<Vec<u8>> {
        let mut buf = vec![0u8; n];
        let mut filled = 0;
        while filled < n {
            match self.port.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(count) => filled += count,
                // A short read surfaces as a malformed frame upstream.
                Err(e) if e.kind() == io::ErrorKind::TimedOut => break,
                Err(e) => return Err(e),
            }
        }
        buf.truncate(filled);
        Ok(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.port.flush()
    }

    fn is_open(&self) -> bool {
        true
    }
}
