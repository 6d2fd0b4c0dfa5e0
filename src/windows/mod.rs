//! iRacing shared memory access
//!
//! Direct, read-only access to iRacing's shared memory telemetry following the
//! same patterns as the official C++ SDK.
//!
//! - **Direct Memory Access**: the telemetry file is mapped as-is
//! - **C++ SDK Alignment**: identical struct layouts to `irsdk_defines.h`
//! - **Buffer Rotation**: the newest of iRacing's rotating buffers is chosen by
//!   tick count and copied with a before/after tick check
//!
//! # Usage
//!
//! ```rust,ignore
//! use raceclips::windows::Connection;
//!
//! let connection = Connection::try_connect()?;
//! let schema = connection.schema()?;
//! if connection.is_connected() {
//!     let (frame, tick) = connection.freeze_latest()?;
//! }
//! ```

mod connection;

pub use connection::{Connection, IRSDKHeader, VarBuf};
