// End-to-end exchange scenarios over a scripted transport.

use std::collections::VecDeque;
use std::io;

use roller485::protocol::{Frame, Payload, RESPONSE_MAGIC, crc8};
use roller485::{Roller485, Switch, Transport};

/// Replays canned response bytes and records every outgoing frame.
struct ScriptedPort {
    written: Vec<Vec<u8>>,
    responses: VecDeque<Vec<u8>>,
}

impl ScriptedPort {
    fn new(responses: impl IntoIterator<Item = Vec<u8>>) -> Self {
        Self {
            written: Vec::new(),
            responses: responses.into_iter().collect(),
        }
    }
}

impl Transport for ScriptedPort {
    fn write(&mut self, buf: &[u8]) -> io::Result<()> {
        self.written.push(buf.to_vec());
        Ok(())
    }

    fn read(&mut self, n: usize) -> io::Result<Vec<u8>> {
        let mut next = self.responses.pop_front().unwrap_or_default();
        next.truncate(n);
        Ok(next)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn is_open(&self) -> bool {
        true
    }
}

/// Build a well-formed response frame: AA 55 body crc, crc over the body.
fn response(command: u8, device_id: u8, payload: &[u8]) -> Vec<u8> {
    let mut body = vec![command, device_id];
    body.extend_from_slice(payload);
    body.push(crc8(&body));
    let mut buf = RESPONSE_MAGIC.to_vec();
    buf.extend_from_slice(&body);
    buf
}

fn config_payload(data1: i32, data2: i32, data3: i32) -> Vec<u8> {
    let mut payload = Vec::with_capacity(12);
    payload.extend_from_slice(&data1.to_le_bytes());
    payload.extend_from_slice(&data2.to_le_bytes());
    payload.extend_from_slice(&data3.to_le_bytes());
    payload
}

#[test]
fn motor_on_exchange_produces_the_documented_frame() {
    let ack = response(0x10, 0, &config_payload(1, 0, 0));
    let mut bus = Roller485::with_transport(ScriptedPort::new([ack]), 0);

    assert!(bus.motor_switch(Switch::On).unwrap());

    // 00 00 01 00 00 00 00 00 00 00 00 00 00 00 <crc>, 15 bytes total.
    let sent = &bus.transport().written[0];
    assert_eq!(sent.len(), 15);
    assert_eq!(sent[0], 0x00);
    assert_eq!(sent[1], 0x00);
    assert_eq!(sent[2], 0x01);
    assert!(sent[3..14].iter().all(|&b| b == 0));
    assert_eq!(sent[14], crc8(&sent[..14]));

    // The outgoing frame decodes back to exactly what was sent.
    let frame = Frame::decode(sent).unwrap();
    assert!(!frame.is_response);
    assert_eq!(frame.encode(), *sent);
}

#[test]
fn settings_are_addressed_to_the_configured_target() {
    let ack = response(0x10, 7, &config_payload(0, 0, 0));
    let mut bus = Roller485::with_transport(ScriptedPort::new([ack]), 7);

    assert!(bus.motor_switch(Switch::Off).unwrap());
    assert_eq!(bus.transport().written[0][1], 7);
}

#[test]
fn corrupting_the_final_byte_fails_verification() {
    let mut ack = response(0x30, 0, &config_payload(10_000, 50_000, 0));
    let end = ack.len() - 1;
    ack[end] ^= 0x01;
    let mut bus = Roller485::with_transport(ScriptedPort::new([ack]), 0);

    // Field values match the request exactly; the checksum alone fails it.
    assert!(!bus.set_speed(100.0, 500.0).unwrap());
}

#[test]
fn mismatched_echo_fails_verification_despite_valid_checksum() {
    let ack = response(0x30, 0, &config_payload(10_001, 50_000, 0));
    let mut bus = Roller485::with_transport(ScriptedPort::new([ack]), 0);

    assert!(!bus.set_speed(100.0, 500.0).unwrap());
}

#[test]
fn speed_scaling_round_trips_through_the_wire() {
    // 100 RPM is sent as 10000 and a 10000 readback comes back as 100.0.
    let ack = response(0x30, 0, &config_payload(10_000, 0, 0));
    let mut bus = Roller485::with_transport(ScriptedPort::new([ack]), 0);
    assert!(bus.set_speed(100.0, 0.0).unwrap());

    let mut status_payload = Vec::new();
    status_payload.extend_from_slice(&10_000i32.to_le_bytes());
    status_payload.extend_from_slice(&0i32.to_le_bytes());
    status_payload.extend_from_slice(&0i32.to_le_bytes());
    status_payload.extend_from_slice(&[1, 0, 0]);
    let resp = response(0x50, 0, &status_payload);
    let mut bus = Roller485::with_transport(ScriptedPort::new([resp]), 0);

    let status = bus.motor_status().unwrap().unwrap();
    assert_eq!(status.speed, 100.0);
}

#[test]
fn pid_scaling_round_trips_through_the_wire() {
    let ack = response(0x31, 0, &config_payload(150_000, 0, 0));
    let mut bus = Roller485::with_transport(ScriptedPort::new([ack]), 0);
    assert!(bus.set_speed_pid(1.5, 0.0, 0.0).unwrap());

    let mut payload = Vec::new();
    payload.extend_from_slice(&150_000u32.to_le_bytes());
    payload.extend_from_slice(&0u32.to_le_bytes());
    payload.extend_from_slice(&0u32.to_le_bytes());
    payload.extend_from_slice(&[0, 0, 0]);
    let resp = response(0x52, 0, &payload);
    let mut bus = Roller485::with_transport(ScriptedPort::new([resp]), 0);

    let pid = bus.speed_pid_rgb().unwrap().unwrap();
    assert_eq!(pid.speed_p, 1.5);
}

#[test]
fn i2c_register_write_then_read() {
    let write_ack = response(0x71, 0, &[1]);
    let mut read_payload = vec![1, 0, 3, 0, 0, 0];
    read_payload.extend_from_slice(&[0xCA, 0xFE, 0x42]);
    read_payload.extend_from_slice(&[0u8; 13]);
    let read_resp = response(0x70, 0, &read_payload);

    let mut bus = Roller485::with_transport(ScriptedPort::new([write_ack, read_resp]), 0);

    assert!(bus.write_i2c_register(0x50, 0, 0x10, &[0xCA, 0xFE, 0x42]).unwrap());
    let data = bus.read_i2c_register(0x50, 0, 0x10, 3).unwrap().unwrap();
    assert_eq!(data, vec![0xCA, 0xFE, 0x42]);

    // The write request carried the payload zero-padded to 16 bytes.
    let sent = &bus.transport().written[0];
    let frame = Frame::decode(sent).unwrap();
    let Payload::I2cWriteRegRequest { data_len, data, .. } = frame.payload else {
        panic!("expected a write-register request");
    };
    assert_eq!(data_len, 3);
    assert_eq!(&data[..3], &[0xCA, 0xFE, 0x42]);
    assert!(data[3..].iter().all(|&b| b == 0));
}

#[test]
fn timeout_short_read_surfaces_as_an_error() {
    // A device that answers with half a frame.
    let ack = response(0x10, 0, &config_payload(1, 0, 0));
    let mut bus = Roller485::with_transport(ScriptedPort::new([ack[..8].to_vec()]), 0);

    assert!(bus.motor_switch(Switch::On).is_err());
}
