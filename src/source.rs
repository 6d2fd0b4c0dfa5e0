//! Source trait for telemetry snapshots

use crate::Result;
use crate::snapshot::Snapshot;

/// A live (or scripted) telemetry feed the monitor can poll.
///
/// Implementations mirror the shape of the iRacing SDK: an explicit
/// startup/shutdown pair, a cheap connectivity flag, and a freeze call that
/// copies the most recent frame into a consistent [`Snapshot`].
pub trait TelemetrySource: Send {
    /// Establish the telemetry session.
    ///
    /// Returns a retryable [`ClipsError::Connection`](crate::ClipsError::Connection)
    /// when the simulator is not running.
    fn startup(&mut self) -> Result<()>;

    /// Tear down the telemetry session. Safe to call more than once.
    fn shutdown(&mut self);

    /// Whether the simulator is currently publishing telemetry.
    fn is_connected(&self) -> bool;

    /// Freeze the latest published frame.
    fn freeze_latest(&mut self) -> Result<Snapshot>;
}
