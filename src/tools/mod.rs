// tools/mod.rs - Platform Tools
//
//! Platform tools for debugging agent conversations
//!
//! - Message sniffer recording every delivery on the bus

pub mod sniffer;

pub use sniffer::{MessageSniffer, SnifferConfig, SnifferFilter, TraceEntry};
