// platform/mod.rs - FIPA Platform Services
//
//! FIPA Platform Services
//!
//! - **DF (Directory Facilitator)**: yellow pages shared by all agents
//! - **Discovery**: behaviors that publish services and find providers
//! - **Platform**: owns the shared bus and directory and creates agents

pub mod container;
pub mod df;
pub mod discovery;

pub use container::{Platform, PlatformError, RESERVED_NAMES};
pub use df::{DFConfig, DFError, DFStats, DirectoryFacilitator};
pub use discovery::{
    DiscoveryOutcome, DiscoveryPolicy, PublishServices, SearchService, ServiceProviders,
};
