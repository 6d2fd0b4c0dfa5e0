//! Telemetry source implementations

pub mod live;
pub mod scripted;

pub use live::LiveSource;
pub use scripted::ScriptedSource;
