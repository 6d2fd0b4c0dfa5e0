//! Live iRacing telemetry source

use crate::Result;
use crate::snapshot::Snapshot;
use crate::source::TelemetrySource;

#[cfg(windows)]
use {
    crate::types::VariableSchema,
    crate::windows::Connection,
    std::sync::Arc,
    tracing::{debug, info, warn},
};

/// Telemetry source backed by iRacing's shared memory.
#[cfg(windows)]
#[derive(Default)]
pub struct LiveSource {
    connection: Option<Connection>,
    schema: Option<Arc<VariableSchema>>,
}

#[cfg(windows)]
impl LiveSource {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(windows)]
impl TelemetrySource for LiveSource {
    fn startup(&mut self) -> Result<()> {
        let connection = Connection::try_connect()?;
        let schema = Arc::new(connection.schema()?);

        if !connection.is_connected() {
            warn!("Shared memory mapped but iRacing is not publishing telemetry yet");
        }

        let header = connection.header();
        info!(
            sdk_version = header.ver,
            tick_rate = header.tick_rate,
            num_vars = header.num_vars,
            "Connected to iRacing shared memory"
        );

        self.connection = Some(connection);
        self.schema = Some(schema);
        Ok(())
    }

    fn shutdown(&mut self) {
        if self.connection.take().is_some() {
            debug!("Released iRacing shared memory");
        }
        self.schema = None;
    }

    fn is_connected(&self) -> bool {
        self.connection.as_ref().is_some_and(Connection::is_connected)
    }

    fn freeze_latest(&mut self) -> Result<Snapshot> {
        let (connection, schema) = match (&self.connection, &self.schema) {
            (Some(connection), Some(schema)) => (connection, schema),
            _ => return Err(crate::ClipsError::connection_failed("live source was not started")),
        };

        // iRacing republishes headers when the session changes car count
        let (data, tick) = connection.freeze_latest()?;
        if data.len() != schema.frame_size {
            let refreshed = Arc::new(connection.schema()?);
            debug!(frame_size = refreshed.frame_size, "Telemetry layout changed");
            self.schema = Some(Arc::clone(&refreshed));
            return Ok(Snapshot::new(data, tick, refreshed));
        }

        Ok(Snapshot::new(data, tick, Arc::clone(schema)))
    }
}

// Non-Windows stub implementation
#[cfg(not(windows))]
#[derive(Debug, Default)]
pub struct LiveSource {
    _private: (),
}

#[cfg(not(windows))]
impl LiveSource {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(not(windows))]
impl TelemetrySource for LiveSource {
    /// Live telemetry is only available on Windows.
    fn startup(&mut self) -> Result<()> {
        Err(crate::ClipsError::unsupported_platform("Live telemetry", "Windows"))
    }

    fn shutdown(&mut self) {}

    fn is_connected(&self) -> bool {
        false
    }

    fn freeze_latest(&mut self) -> Result<Snapshot> {
        Err(crate::ClipsError::unsupported_platform("Live telemetry", "Windows"))
    }
}

#[cfg(all(test, not(windows)))]
mod tests {
    use super::*;
    use crate::ClipsError;

    #[test]
    fn live_source_is_unsupported_off_windows() {
        let mut source = LiveSource::new();
        assert!(matches!(source.startup(), Err(ClipsError::UnsupportedPlatform { .. })));
        assert!(!source.is_connected());
        assert!(source.freeze_latest().is_err());
    }
}
