//! Client-side replica of a sparse 2D canvas kept in sync with a coordination service.
//!
//! The canvas is split into square regions of cells. Each region lives under its own
//! node in the service namespace, and each populated cell is a child node whose data
//! is the cell's color name. [`SyncEngine`] opens regions, writes cells and turns
//! watch notifications into minimal updates of the local [`Canvas`].

pub mod cache;
pub mod color;
pub mod config;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod memory_service;
pub mod path_codec;
pub mod retry;
pub mod service;
pub mod shapes;

pub use cache::{Canvas, Cell, Region, REGION_SIZE};
pub use color::Color;
pub use config::SyncConfig;
pub use dispatcher::{Dispatcher, RequestMode};
pub use engine::{Direction, DrawReport, SyncEngine, UnknownDirection, ViewReceiver, ViewSender, ViewUpdate};
pub use error::SyncError;
pub use memory_service::{MemoryCluster, MemoryService};
pub use service::{event_channel, Coordination, Event, EventReceiver, EventSender, SessionState};
