//! Reactive and proactive route storage.

pub mod decision;
pub mod table;
pub mod types;

pub use table::{ExpiredRoutes, RoutingTable};
pub use types::{Precursor, RouteEntry, RouteLookup, RouteUpdate};
