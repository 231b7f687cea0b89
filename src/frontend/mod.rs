//! Front-end Transports
//!
//! Builders that turn an NVMe controller and its subsystem into the listener
//! parameters the engine needs to expose the controller.

pub mod vfiouser;

pub use vfiouser::{controller_dir_path, VfiouserTransport};
