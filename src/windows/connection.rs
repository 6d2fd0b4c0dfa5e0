//! iRacing shared memory connection aligned with the C++ SDK
//!
//! Maps the telemetry file read-only and copies out the newest of the rotating
//! variable buffers, the equivalent of `irsdk_freezeVarBufferLatest`.

use crate::types::{VariableInfo, VariableSchema, VariableType};
use crate::{ClipsError, Result};
use std::collections::HashMap;
use std::ptr::NonNull;
use tracing::{debug, trace, warn};
use windows::Win32::Foundation::{CloseHandle, HANDLE};
use windows::Win32::System::Memory::{
    FILE_MAP_READ, MEMORY_MAPPED_VIEW_ADDRESS, MapViewOfFile, OpenFileMappingW, UnmapViewOfFile,
};
use windows::core::PCWSTR;

/// iRacing shared memory file name
const IRSDK_MEMMAPFILENAME: &str = "Local\\IRSDKMemMapFileName";
/// Expected SDK version
const IRSDK_VER: i32 = 2;
/// Connection status flag
const IRSDK_ST_CONNECTED: i32 = 1;
/// Maximum number of telemetry buffers
const IRSDK_MAX_BUFS: usize = 4;
/// Attempts at copying a buffer before giving up on this tick
const FREEZE_ATTEMPTS: usize = 3;

/// Variable buffer containing tick count and offset information
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct VarBuf {
    pub tick_count: i32, // Used to detect changes in data
    pub buf_offset: i32, // Offset from header
    pub pad: [i32; 2],   // 16-byte alignment
}

/// Variable header structure from iRacing SDK
#[repr(C)]
#[derive(Debug)]
pub struct IRSDKVarHeader {
    pub var_type: i32,                    // irsdk_VarType
    pub offset: i32,                      // Offset from start of buffer row
    pub count: i32,                       // Number of entries (array)
    pub count_as_time: bool,              // Values in array represent timeseries data
    pub pad: [u8; 3],                     // 16-byte alignment padding
    pub name: [std::os::raw::c_char; 32], // Variable name
    pub desc: [std::os::raw::c_char; 64], // Variable description
    pub unit: [std::os::raw::c_char; 32], // Variable units
}

impl IRSDKVarHeader {
    fn text(field: &[std::os::raw::c_char]) -> String {
        // Fields are fixed-size and not guaranteed to be terminated
        let bytes: Vec<u8> =
            field.iter().map(|&c| c as u8).take_while(|&b| b != 0).collect();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// Convert to our schema representation. Unknown types are skipped.
    fn to_variable_info(&self) -> Option<VariableInfo> {
        let data_type = VariableType::from_irsdk(self.var_type)?;
        if self.offset < 0 || self.count <= 0 {
            return None;
        }
        Some(VariableInfo {
            name: Self::text(&self.name),
            data_type,
            offset: self.offset as usize,
            count: self.count as usize,
            units: Self::text(&self.unit),
            description: Self::text(&self.desc),
        })
    }
}

/// Main iRacing header structure matching the C++ SDK exactly
#[repr(C)]
#[derive(Debug)]
pub struct IRSDKHeader {
    pub ver: i32,       // API header version (should be IRSDK_VER)
    pub status: i32,    // Bitfield using status flags
    pub tick_rate: i32, // Ticks per second (60 or 360 etc)

    // Session information, updated periodically
    pub session_info_update: i32,
    pub session_info_len: i32,
    pub session_info_offset: i32,

    // State data, output at tick_rate
    pub num_vars: i32,          // Length of array pointed to by var_header_offset
    pub var_header_offset: i32, // Offset to variable header array

    pub num_buf: i32,                      // Number of buffers (<= IRSDK_MAX_BUFS)
    pub buf_len: i32,                      // Length in bytes for one line
    pub pad1: [i32; 2],                    // 16-byte alignment
    pub var_buf: [VarBuf; IRSDK_MAX_BUFS], // Buffers of data being written to
}

/// Read-only mapping of iRacing's telemetry file
pub struct Connection {
    mapping: HANDLE,
    base: NonNull<u8>,
}

impl Connection {
    /// Map the shared memory file. Fails when iRacing has never been started.
    pub fn try_connect() -> Result<Self> {
        trace!("Attempting to map iRacing shared memory");

        let mapping = unsafe {
            let wide_name = wide_string(IRSDK_MEMMAPFILENAME);
            OpenFileMappingW(FILE_MAP_READ.0, false, PCWSTR::from_raw(wide_name.as_ptr()))
                .map_err(|e| {
                    ClipsError::connection_failed_with_source(
                        "iRacing shared memory is not available",
                        Box::new(e),
                    )
                })?
        };

        let base = unsafe {
            let ptr = MapViewOfFile(mapping, FILE_MAP_READ, 0, 0, 0);
            match NonNull::new(ptr.Value as *mut u8) {
                Some(base) => base,
                None => {
                    let win_err = windows::core::Error::from_thread();
                    let _ = CloseHandle(mapping);
                    return Err(ClipsError::windows_api_error("MapViewOfFile", win_err));
                }
            }
        };

        let connection = Self { mapping, base };
        connection.validate_connection()?;

        debug!("Mapped iRacing shared memory");
        Ok(connection)
    }

    /// Get direct access to the header
    pub fn header(&self) -> &IRSDKHeader {
        unsafe { &*(self.base.as_ptr() as *const IRSDKHeader) }
    }

    /// Check if iRacing is publishing telemetry right now
    pub fn is_connected(&self) -> bool {
        let status = unsafe { std::ptr::read_volatile(&self.header().status) };
        status & IRSDK_ST_CONNECTED != 0
    }

    /// Build a schema from the variable headers
    pub fn schema(&self) -> Result<VariableSchema> {
        let header = self.header();
        let mut variables = HashMap::new();

        if header.num_vars > 0 && header.var_header_offset > 0 {
            unsafe {
                let var_header_ptr = self.base.as_ptr().add(header.var_header_offset as usize);
                for i in 0..header.num_vars as usize {
                    let var_ptr = var_header_ptr.add(i * std::mem::size_of::<IRSDKVarHeader>());
                    let var_header = &*(var_ptr as *const IRSDKVarHeader);
                    if let Some(info) = var_header.to_variable_info() {
                        variables.insert(info.name.clone(), info);
                    }
                }
            }
        }

        debug!(variables = variables.len(), buf_len = header.buf_len, "Read variable headers");
        VariableSchema::new(variables, header.buf_len.max(0) as usize)
    }

    /// Copy the most recent telemetry buffer.
    ///
    /// Returns the frame bytes and their tick count. The tick is read before
    /// and after the copy; if the simulator rotated into the buffer meanwhile
    /// the copy is retried.
    pub fn freeze_latest(&self) -> Result<(Vec<u8>, u32)> {
        let header = self.header();
        let buf_len = header.buf_len.max(0) as usize;

        for attempt in 0..FREEZE_ATTEMPTS {
            let latest = self.find_latest_buffer(header);
            let var_buf = &header.var_buf[latest];

            let tick_before = unsafe { std::ptr::read_volatile(&var_buf.tick_count) };
            let data = unsafe {
                let data_ptr = self.base.as_ptr().add(var_buf.buf_offset as usize);
                std::slice::from_raw_parts(data_ptr, buf_len).to_vec()
            };
            let tick_after = unsafe { std::ptr::read_volatile(&var_buf.tick_count) };

            if tick_before == tick_after {
                trace!(tick = tick_before, buffer = latest, "Froze telemetry buffer");
                return Ok((data, tick_before as u32));
            }

            debug!(
                attempt = attempt + 1,
                before = tick_before,
                after = tick_after,
                "Buffer rotated while copying"
            );
        }

        warn!("Failed to freeze a consistent telemetry buffer");
        Err(ClipsError::connection_failed("telemetry buffer kept changing while copying"))
    }

    fn validate_connection(&self) -> Result<()> {
        let header = self.header();

        if header.ver != IRSDK_VER {
            return Err(ClipsError::Version {
                expected: IRSDK_VER as u32,
                found: header.ver as u32,
            });
        }

        debug!(
            ver = header.ver,
            num_vars = header.num_vars,
            num_buf = header.num_buf,
            "Validated iRacing header"
        );

        Ok(())
    }

    /// Find the buffer with the highest tick count
    pub fn find_latest_buffer(&self, header: &IRSDKHeader) -> usize {
        let num_buf = (header.num_buf.max(1) as usize).min(IRSDK_MAX_BUFS);
        let tick = |i: usize| unsafe { std::ptr::read_volatile(&header.var_buf[i].tick_count) };

        let mut latest = 0;
        for i in 1..num_buf {
            if tick(latest) < tick(i) {
                latest = i;
            }
        }
        latest
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        unsafe {
            let addr = MEMORY_MAPPED_VIEW_ADDRESS { Value: self.base.as_ptr() as *mut _ };
            let _ = UnmapViewOfFile(addr);
            let _ = CloseHandle(self.mapping);
        }
    }
}

// SAFETY: The Connection only holds a mapping handle and a read-only view
// pointer, both of which may move between threads.
unsafe impl Send for Connection {}

/// Convert string to null-terminated wide string for Windows APIs
fn wide_string(s: &str) -> Vec<u16> {
    use std::ffi::OsStr;
    use std::os::windows::ffi::OsStrExt;
    OsStr::new(s).encode_wide().chain(std::iter::once(0)).collect()
}

#[cfg(all(test, windows))]
mod tests {
    use super::*;

    #[test]
    fn constants_match_iracing_sdk() {
        assert_eq!(IRSDK_MEMMAPFILENAME, "Local\\IRSDKMemMapFileName");
        assert_eq!(IRSDK_VER, 2);
        assert_eq!(IRSDK_ST_CONNECTED, 1);
    }

    #[test]
    fn header_struct_layout() {
        assert_eq!(std::mem::size_of::<IRSDKHeader>(), 112);
        assert_eq!(std::mem::align_of::<IRSDKHeader>(), 4);
        assert_eq!(std::mem::size_of::<VarBuf>(), 16);
        assert_eq!(std::mem::size_of::<IRSDKVarHeader>(), 144);
    }

    #[test]
    fn var_header_text_stops_at_nul() {
        let mut name = [0 as std::os::raw::c_char; 32];
        for (dst, src) in name.iter_mut().zip(b"SessionTime") {
            *dst = *src as std::os::raw::c_char;
        }
        assert_eq!(IRSDKVarHeader::text(&name), "SessionTime");
    }

    #[test]
    #[ignore = "iracing_required"]
    fn freezes_live_frame_with_monitor_channels() {
        let connection = Connection::try_connect().expect("Failed to connect to iRacing");
        let schema = connection.schema().expect("schema");
        assert!(schema.has_variable("CarIdxPosition"));
        assert!(schema.has_variable("SessionTime"));

        let (data, _tick) = connection.freeze_latest().expect("freeze");
        assert_eq!(data.len(), schema.frame_size);
    }
}
