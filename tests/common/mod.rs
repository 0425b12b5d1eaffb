//! Simulated feeder board
//!
//! A scripted in-memory peer used by the integration tests. Every line the
//! host writes is recorded and handed to a responder that queues the
//! device's replies. Each queued line is delivered by a separate `read`
//! call, and an empty queue reads as a transport timeout.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::sync::Arc;

use parking_lot::Mutex;
use zaf::config::Config;
use zaf::transport::{Connector, Transport};
use zaf::{Controller, ZafError};

/// One read's worth of device output
#[derive(Debug, Clone)]
pub enum Chunk {
    Data(Vec<u8>),
    /// The device says nothing for a whole read timeout
    Silence,
    /// The cable is pulled: this read fails
    Unplug,
}

/// A newline-terminated line
pub fn line(text: &str) -> Chunk {
    Chunk::Data(format!("{}\n", text).into_bytes())
}

type Responder = Box<dyn FnMut(&str) -> Vec<Chunk> + Send>;

struct SimState {
    inbound: VecDeque<Chunk>,
    written: Vec<u8>,
    pending: Vec<u8>,
    responder: Option<Responder>,
    fail_writes: bool,
    fail_reads: bool,
    reads: usize,
    clears: usize,
    opens: usize,
}

/// Handle on the simulated board; clones share state
#[derive(Clone)]
pub struct SimDevice {
    shared: Arc<Mutex<SimState>>,
}

impl SimDevice {
    /// A board that never answers
    pub fn silent() -> Self {
        Self {
            shared: Arc::new(Mutex::new(SimState {
                inbound: VecDeque::new(),
                written: Vec::new(),
                pending: Vec::new(),
                responder: None,
                fail_writes: false,
                fail_reads: false,
                reads: 0,
                clears: 0,
                opens: 0,
            })),
        }
    }

    /// A board that answers through `responder`
    pub fn with_responder(responder: impl FnMut(&str) -> Vec<Chunk> + Send + 'static) -> Self {
        let device = Self::silent();
        device.shared.lock().responder = Some(Box::new(responder));
        device
    }

    /// A board running the stock firmware
    pub fn firmware() -> Self {
        Self::with_responder(firmware_reply)
    }

    /// Queue output as if the board had already sent it
    pub fn push(&self, chunk: Chunk) {
        self.shared.lock().inbound.push_back(chunk);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.shared.lock().fail_writes = fail;
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.shared.lock().fail_reads = fail;
    }

    /// Everything the host wrote
    pub fn written(&self) -> String {
        String::from_utf8(self.shared.lock().written.clone()).unwrap()
    }

    /// Host writes split into lines (without newlines)
    pub fn written_lines(&self) -> Vec<String> {
        self.written().lines().map(str::to_string).collect()
    }

    /// Number of `read` calls made by the host
    pub fn reads(&self) -> usize {
        self.shared.lock().reads
    }

    /// Number of input-buffer clears
    pub fn clears(&self) -> usize {
        self.shared.lock().clears
    }

    /// Number of times the port was opened
    pub fn opens(&self) -> usize {
        self.shared.lock().opens
    }

    /// Queued output the host has not read
    pub fn unread(&self) -> usize {
        self.shared.lock().inbound.len()
    }

    pub fn connector(&self) -> SimConnector {
        SimConnector {
            device: Some(self.clone()),
        }
    }
}

/// Replies of the stock firmware
pub fn firmware_reply(command: &str) -> Vec<Chunk> {
    let parts: Vec<&str> = command.split(':').collect();
    match parts.as_slice() {
        ["PING"] => vec![line("PONG")],
        ["DISPENSE", n] => {
            let cycles: u32 = n.parse().unwrap();
            let mut out = vec![line("DISPENSING...")];
            for i in 1..=cycles {
                out.push(line(&format!("CYCLE {}/{}", i, cycles)));
            }
            out.push(line("DISPENSE_COMPLETE"));
            out
        }
        ["RUMBLE", "1"] => vec![line("RUMBLE_ON")],
        ["RUMBLE", "0"] => vec![line("RUMBLE_OFF")],
        ["PUMP", id, speed, dir] => {
            vec![line(&format!("PUMP {} SPEED {} DIR {}", id, speed, dir))]
        }
        _ => vec![line("ERR:UNKNOWN")],
    }
}

/// Opens the simulated board, or fails like a missing port
pub struct SimConnector {
    device: Option<SimDevice>,
}

impl SimConnector {
    /// A connector whose port does not exist
    pub fn missing() -> Self {
        Self { device: None }
    }
}

impl Connector for SimConnector {
    fn open(&self, config: &Config) -> zaf::Result<Box<dyn Transport>> {
        match &self.device {
            Some(device) => {
                device.shared.lock().opens += 1;
                Ok(Box::new(SimTransport {
                    shared: Arc::clone(&device.shared),
                }))
            }
            None => Err(ZafError::TransportOpen {
                port: config.port.clone(),
                source: io::Error::new(io::ErrorKind::NotFound, "No such file or directory"),
            }),
        }
    }
}

struct SimTransport {
    shared: Arc<Mutex<SimState>>,
}

impl Read for SimTransport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.shared.lock();
        state.reads += 1;
        if state.fail_reads {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "device unplugged"));
        }
        match state.inbound.pop_front() {
            Some(Chunk::Data(mut data)) => {
                let n = data.len().min(buf.len());
                buf[..n].copy_from_slice(&data[..n]);
                if n < data.len() {
                    let rest = data.split_off(n);
                    state.inbound.push_front(Chunk::Data(rest));
                }
                Ok(n)
            }
            Some(Chunk::Unplug) => {
                Err(io::Error::new(io::ErrorKind::BrokenPipe, "device unplugged"))
            }
            Some(Chunk::Silence) | None => {
                Err(io::Error::new(io::ErrorKind::TimedOut, "Operation timed out"))
            }
        }
    }
}

impl Write for SimTransport {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.shared.lock();
        if state.fail_writes {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "device unplugged"));
        }
        state.written.extend_from_slice(buf);
        state.pending.extend_from_slice(buf);

        while let Some(pos) = state.pending.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = state.pending.drain(..=pos).collect();
            let text = String::from_utf8_lossy(&raw[..raw.len() - 1]).into_owned();
            let replies = match state.responder.as_mut() {
                Some(responder) => responder(&text),
                None => Vec::new(),
            };
            state.inbound.extend(replies);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Transport for SimTransport {
    fn clear_input(&mut self) -> io::Result<()> {
        let mut state = self.shared.lock();
        state.inbound.clear();
        state.clears += 1;
        Ok(())
    }
}

/// Config for tests: no settle delay, short timeout
pub fn test_config() -> Config {
    Config::builder()
        .port("sim0")
        .read_timeout_ms(200)
        .settle_ms(0)
        .build()
}

/// A controller wired to `device`, not yet connected
pub fn controller_for(device: &SimDevice) -> Controller {
    Controller::builder(test_config())
        .connector(device.connector())
        .build()
}

/// A controller wired to `device` and connected
pub fn connected(device: &SimDevice) -> Controller {
    let mut controller = controller_for(device);
    let report = controller.connect();
    assert!(report.connected);
    controller
}
