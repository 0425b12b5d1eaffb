//! Device Worker
//!
//! Owns the controller on a dedicated thread and executes requests one at a
//! time, so a multi-threaded web layer can never interleave two commands on
//! the serial line.

use std::io;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::RwLock;

use super::report::{FeedReport, StatusReport};
use crate::controller::{ConnectionReport, ConnectionState, Controller};
use crate::error::{Result, ZafError};
use crate::protocol::{PumpDirection, PumpId};

/// A queued request and the channel its result goes back on
enum Request {
    Connect {
        reply: Sender<ConnectionReport>,
    },
    Feed {
        cycles: NonZeroU32,
        reply: Sender<FeedReport>,
    },
    Rumble {
        on: bool,
        reply: Sender<String>,
    },
    Pump {
        id: PumpId,
        speed: u8,
        direction: PumpDirection,
        reply: Sender<String>,
    },
    Shutdown,
}

/// Runs a [`Controller`] on its own thread
///
/// Dropping the worker (or calling [`DeviceWorker::shutdown`]) finishes the
/// requests queued so far, disconnects the controller and joins the thread.
pub struct DeviceWorker {
    handle: DeviceHandle,
    thread: Option<JoinHandle<()>>,
}

impl DeviceWorker {
    /// Move `controller` onto a new worker thread
    pub fn spawn(controller: Controller) -> io::Result<Self> {
        let (requests_tx, requests_rx) = channel::unbounded();
        let state = Arc::new(RwLock::new(controller.state()));
        let worker_state = Arc::clone(&state);

        let thread = thread::Builder::new()
            .name("zaf-device".to_string())
            .spawn(move || run(controller, requests_rx, worker_state))?;

        Ok(Self {
            handle: DeviceHandle {
                requests: requests_tx,
                state,
            },
            thread: Some(thread),
        })
    }

    /// A cloneable handle for submitting requests
    pub fn handle(&self) -> DeviceHandle {
        self.handle.clone()
    }

    /// Stop the worker and wait for it to exit
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(thread) = self.thread.take() {
            let _ = self.handle.requests.send(Request::Shutdown);
            if thread.join().is_err() {
                tracing::error!("Device worker panicked");
            }
        }
    }
}

impl Drop for DeviceWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Submits requests to a [`DeviceWorker`]
///
/// Every call blocks until the worker has executed it. Calls fail with
/// `WorkerUnavailable` once the worker has stopped.
#[derive(Clone)]
pub struct DeviceHandle {
    requests: Sender<Request>,
    state: Arc<RwLock<ConnectionState>>,
}

impl DeviceHandle {
    /// Connection state after the last completed request.
    ///
    /// Does not wait for an in-flight request.
    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    /// Body for `GET /status`
    pub fn status(&self) -> StatusReport {
        StatusReport::from_state(self.state())
    }

    pub fn connect(&self) -> Result<ConnectionReport> {
        self.call(|reply| Request::Connect { reply })
    }

    /// Body for `POST /feed`. Simulated when the device is not connected.
    pub fn feed(&self, cycles: NonZeroU32) -> Result<FeedReport> {
        self.call(|reply| Request::Feed { cycles, reply })
    }

    pub fn rumble(&self, on: bool) -> Result<String> {
        self.call(|reply| Request::Rumble { on, reply })
    }

    pub fn pump(&self, id: PumpId, speed: u8, direction: PumpDirection) -> Result<String> {
        self.call(|reply| Request::Pump {
            id,
            speed,
            direction,
            reply,
        })
    }

    fn call<T>(&self, make: impl FnOnce(Sender<T>) -> Request) -> Result<T> {
        let (reply_tx, reply_rx) = channel::bounded(1);
        self.requests
            .send(make(reply_tx))
            .map_err(|_| ZafError::WorkerUnavailable)?;
        reply_rx.recv().map_err(|_| ZafError::WorkerUnavailable)
    }
}

/// Worker loop: one request at a time until shutdown
fn run(
    mut controller: Controller,
    requests: Receiver<Request>,
    state: Arc<RwLock<ConnectionState>>,
) {
    tracing::debug!("Device worker started");

    for request in requests.iter() {
        match request {
            Request::Shutdown => break,
            Request::Connect { reply } => {
                let _ = reply.send(controller.connect());
            }
            Request::Feed { cycles, reply } => {
                let report = if controller.is_connected() {
                    FeedReport::from_outcome(&controller.dispense_food(cycles))
                } else {
                    tracing::info!("Simulation: Feeding triggered (Hardware Offline)");
                    FeedReport::simulated()
                };
                let _ = reply.send(report);
            }
            Request::Rumble { on, reply } => {
                let _ = reply.send(controller.set_rumble_pack(on));
            }
            Request::Pump {
                id,
                speed,
                direction,
                reply,
            } => {
                let _ = reply.send(controller.control_pump(id, speed, direction));
            }
        }
        *state.write() = controller.state();
    }

    controller.disconnect();
    *state.write() = ConnectionState::Disconnected;
    tracing::debug!("Device worker stopped");
}
