//! Service Module
//!
//! What a web front end needs from the device.
//!
//! ## Architecture
//! - One worker thread owns the `Controller`
//! - Requests arrive over a channel and run strictly in order
//! - Results come back as the report types the web layer serializes

mod report;
mod worker;

pub use report::{DeviceStatus, FeedReport, FeedStatus, StatusReport};
pub use worker::{DeviceHandle, DeviceWorker};
