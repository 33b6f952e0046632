#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

//! mbcon
//!
//! mbcon drives a request/response Modbus-style field-bus device through an
//! interactive or scripted console session, and can stand in for such a
//! device itself by answering out of a simulated register memory.
//!
//! Main pieces:
//! - a sequential command engine ([`engine::Engine`]) turning textual
//!   commands into strictly ordered operations against one transport
//! - argument validators ([`validate`]) with uniform, human-readable
//!   failure texts
//! - a register/float codec ([`codec`]) covering the four word/byte-order
//!   conventions used to pack IEEE-754 singles into register pairs
//! - an addressable memory model ([`memory`]) with derived coil/discrete
//!   bit addressing, backing the device-simulation transport
//!
//! Quick example (against the simulated device):
//! ```no_run
//! use mbcon::{DeviceMemory, Engine, EngineOptions, MemoryTransport};
//!
//! # async fn demo() {
//! let transport = MemoryTransport::new(DeviceMemory::new(2000, 2000), 1);
//! let engine = Engine::spawn(transport, EngineOptions::default());
//! let mut events = engine.subscribe();
//! engine.enqueue("fc3", vec!["0".into(), "8".into()]);
//! # let _ = events.recv().await;
//! # }
//! ```

pub mod codec;
pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod format;
pub mod memory;
pub mod script;
pub mod transport;
pub mod validate;

pub use codec::ByteOrder;
pub use command::CommandKind;
pub use engine::{Engine, EngineOptions, Event, Job};
pub use error::{MbconError, ValidationError};
pub use memory::{Bank, DeviceMemory, MemoryImage};
pub use transport::{MemoryTransport, Transport};
