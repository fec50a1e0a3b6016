//! Capabilities the protocol consumes from whoever drives it.
//!
//! The protocol never blocks and never owns a clock. Everything time-related
//! goes through [`TimerService`]: a handler schedules a [`TimerEvent`] and
//! the driver hands it back through `HwmpProtocol::handle_timer` when it
//! fires. Events scheduled for the same instant must be delivered in the
//! order they were scheduled.

use std::time::Duration;

use hwmp_core::types::{InterfaceId, MacAddress};
use rand::Rng;

/// Current time, measured from an arbitrary fixed origin.
pub trait Clock {
    fn now(&self) -> Duration;
}

pub trait TimerService {
    fn schedule(&mut self, delay: Duration, event: TimerEvent) -> TimerHandle;
    fn cancel(&mut self, handle: TimerHandle);
}

pub trait NeighborProvider {
    /// Peers with an established link on `interface`.
    fn active_neighbors(&self, interface: InterfaceId) -> Vec<MacAddress>;
}

pub trait FrameTransport {
    /// Send `frame` to `receiver` (possibly broadcast) on `interface`.
    fn send(&mut self, interface: InterfaceId, receiver: MacAddress, kind: FrameKind, frame: Vec<u8>);
}

pub trait RandomSource {
    /// Uniformly distributed duration in `[min, max]`.
    fn uniform(&mut self, min: Duration, max: Duration) -> Duration;
}

/// Everything a protocol handler may touch.
pub trait Environment: Clock + TimerService + NeighborProvider + FrameTransport + RandomSource {}

impl<T> Environment for T where
    T: Clock + TimerService + NeighborProvider + FrameTransport + RandomSource + ?Sized
{
}

/// Identifies a scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(pub u64);

impl TimerHandle {
    /// Cancel the timer. Cancelling one that already fired is harmless.
    pub fn cancel<T: TimerService + ?Sized>(self, timers: &mut T) {
        timers.cancel(self);
    }
}

/// What a timer means when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    /// Path discovery retry. `attempt` guards against stale timers.
    PreqRetry { destination: MacAddress, attempt: u8 },
    /// Periodic root announcement.
    ProactivePreq,
    /// Rate-limited PREQs waiting on an interface.
    FlushPreq { interface: InterfaceId },
    /// Rate-limited PERR waiting on an interface.
    FlushPerr { interface: InterfaceId },
    /// Route expiry and prune purge.
    Maintenance,
}

/// Link-layer frame class: management action frames or mesh data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Control,
    Data,
}

/// [`RandomSource`] backed by any `rand` generator.
#[derive(Debug, Clone)]
pub struct RngSource<R>(pub R);

impl<R: Rng> RandomSource for RngSource<R> {
    fn uniform(&mut self, min: Duration, max: Duration) -> Duration {
        if max <= min {
            return min;
        }
        let lo = u64::try_from(min.as_nanos()).unwrap_or(u64::MAX);
        let hi = u64::try_from(max.as_nanos()).unwrap_or(u64::MAX);
        Duration::from_nanos(self.0.gen_range(lo..=hi))
    }
}
