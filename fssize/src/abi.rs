//! Host plugin ABI — `#[repr(C)]` mirrors of the request, result and item
//! table structures the monitoring daemon hands to a loadable module.
//!
//! Field order and widths follow the host headers exactly; the host owns the
//! request, and every string stored into a result must come from the C
//! allocator because the host releases it with `free()`.

use std::ffi::{c_char, c_double, c_int, c_uint, c_void, CStr, CString, OsStr};
use std::os::unix::ffi::OsStrExt;

/// The only module interface version the host understands.
pub const ZBX_MODULE_API_VERSION_ONE: c_int = 1;

pub const ZBX_MODULE_OK: c_int = 0;
pub const ZBX_MODULE_FAIL: c_int = -1;

pub const SYSINFO_RET_OK: c_int = 0;
pub const SYSINFO_RET_FAIL: c_int = 1;

/// Item key accepts parameters.
pub const CF_HAVEPARAMS: c_uint = 0x01;

pub const AR_UINT64: c_int = 0x01;
pub const AR_DOUBLE: c_int = 0x02;
pub const AR_STRING: c_int = 0x04;
pub const AR_TEXT: c_int = 0x08;
pub const AR_LOG: c_int = 0x10;
pub const AR_MESSAGE: c_int = 0x20;

/// Signature of an item handler registered in the metric table.
pub type MetricHandler = unsafe extern "C" fn(*mut AgentRequest, *mut AgentResult) -> c_int;

/// `AGENT_REQUEST`
#[repr(C)]
#[derive(Debug)]
pub struct AgentRequest {
    pub key: *mut c_char,
    pub nparam: c_int,
    pub params: *mut *mut c_char,
    pub lastlogsize: u64,
    pub mtime: c_int,
}

impl AgentRequest {
    /// Parameter `index`, or `None` when out of range or NULL (`get_rparam`).
    pub fn param(&self, index: usize) -> Option<&CStr> {
        if self.params.is_null() || index >= self.param_count() {
            return None;
        }
        // SAFETY: the host guarantees `params` holds `nparam` entries.
        let ptr = unsafe { *self.params.add(index) };
        if ptr.is_null() {
            None
        } else {
            // SAFETY: non-NULL parameters are NUL-terminated host strings.
            Some(unsafe { CStr::from_ptr(ptr) })
        }
    }

    pub fn param_count(&self) -> usize {
        usize::try_from(self.nparam).unwrap_or(0)
    }

    /// Every parameter as raw bytes, NULL slots kept as `None`.
    pub fn params(&self) -> Vec<Option<&OsStr>> {
        (0..self.param_count())
            .map(|i| self.param(i).map(|p| OsStr::from_bytes(p.to_bytes())))
            .collect()
    }
}

/// `AGENT_RESULT`
#[repr(C)]
#[derive(Debug)]
pub struct AgentResult {
    pub r#type: c_int,
    pub ui64: u64,
    pub dbl: c_double,
    pub str: *mut c_char,
    pub text: *mut c_char,
    pub msg: *mut c_char,
    pub logs: *mut *mut c_void,
}

impl AgentResult {
    /// `SET_STR_RESULT`
    pub fn set_str(&mut self, value: &str) {
        self.r#type |= AR_STRING;
        self.str = host_strdup(value);
    }

    /// `SET_MSG_RESULT`
    pub fn set_msg(&mut self, message: &str) {
        self.r#type |= AR_MESSAGE;
        self.msg = host_strdup(message);
    }
}

impl Default for AgentResult {
    fn default() -> Self {
        Self {
            r#type: 0,
            ui64: 0,
            dbl: 0.0,
            str: std::ptr::null_mut(),
            text: std::ptr::null_mut(),
            msg: std::ptr::null_mut(),
            logs: std::ptr::null_mut(),
        }
    }
}

/// `ZBX_METRIC` — one row of the table returned by `zbx_module_item_list`.
#[repr(C)]
#[derive(Debug)]
pub struct Metric {
    pub key: *const c_char,
    pub flags: c_uint,
    pub function: Option<MetricHandler>,
    pub test_param: *const c_char,
}

impl Metric {
    /// Table terminator (`{NULL}`).
    pub const fn terminator() -> Self {
        Self {
            key: std::ptr::null(),
            flags: 0,
            function: None,
            test_param: std::ptr::null(),
        }
    }
}

/// Copy `value` into a `malloc`-owned C string. Anything after an interior
/// NUL is dropped.
pub fn host_strdup(value: &str) -> *mut c_char {
    let bytes = value.as_bytes();
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    let owned = CString::new(&bytes[..end]).unwrap_or_default();
    // SAFETY: `owned` is a valid NUL-terminated string for the duration of the call.
    unsafe { libc::strdup(owned.as_ptr()) }
}
