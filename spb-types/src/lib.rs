//! Sparkplug B types shared by the primary host crates.
//!
//! Contains the protobuf payload definitions, topic helpers and the conversions
//! between protobuf metric values and their Rust scalar representation.

pub mod constants;

mod generated {
    pub(crate) mod sparkplug_payload;
}

/// generated types
pub mod payload;

pub mod topic;

pub mod utils;

mod value;

pub use value::*;
