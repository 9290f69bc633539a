//! Protocol implementations
//!
//! This module contains the SST26V instruction sequences, written against
//! the [`CommandBus`](crate::transport::CommandBus) seam.

mod sst26v;

pub use sst26v::*;
