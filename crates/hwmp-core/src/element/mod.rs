//! Information elements exchanged by the path selection protocol.

pub(crate) mod codec;
pub mod perr;
pub mod prep;
pub mod preq;
pub mod prune;

pub use perr::{FailedDestination, PerrElement};
pub use prep::PrepElement;
pub use preq::{PreqDestination, PreqElement};
pub use prune::{PruneElement, PruneHeader, PruneUnit};
