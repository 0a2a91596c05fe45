//! Exported module entry points.
//!
//! The host resolves these by name after `dlopen`, calls `zbx_module_init`
//! once, fetches the item table, and from then on invokes item handlers from
//! its collector processes. Nothing here may unwind into the host.

use std::ffi::c_int;
use std::panic;
use std::sync::atomic::{AtomicI32, Ordering};
use tracing::{debug, error, info, warn};

use crate::abi::{
    AgentRequest, AgentResult, Metric, CF_HAVEPARAMS, SYSINFO_RET_FAIL, SYSINFO_RET_OK,
    ZBX_MODULE_API_VERSION_ONE, ZBX_MODULE_FAIL, ZBX_MODULE_OK,
};
use crate::config::{self, LogConfig};
use crate::fssize;
use crate::host::{self, ProgramType};
use crate::logging;
use crate::MODULE_NAME;

/// Item processing timeout in seconds, 0 when unset.
static ITEM_TIMEOUT: AtomicI32 = AtomicI32::new(0);

struct MetricTable([Metric; 2]);

// SAFETY: the table only holds pointers to 'static string literals and a fn pointer.
unsafe impl Sync for MetricTable {}

static KEYS: MetricTable = MetricTable([
    Metric {
        key: c"vfs.fs.size.master".as_ptr(),
        flags: CF_HAVEPARAMS,
        function: Some(zbx_module_fssize),
        test_param: c"/".as_ptr(),
    },
    Metric::terminator(),
]);

pub fn item_timeout() -> i32 {
    ITEM_TIMEOUT.load(Ordering::Relaxed)
}

#[no_mangle]
pub extern "C" fn zbx_module_api_version() -> c_int {
    ZBX_MODULE_API_VERSION_ONE
}

#[no_mangle]
pub extern "C" fn zbx_module_item_timeout(timeout: c_int) {
    ITEM_TIMEOUT.store(timeout, Ordering::Relaxed);
    debug!("[{MODULE_NAME}] item timeout set to {timeout}s");
}

/// NULL-terminated item table. The host only reads it.
#[no_mangle]
pub extern "C" fn zbx_module_item_list() -> *mut Metric {
    KEYS.0.as_ptr().cast_mut()
}

/// Handler for `vfs.fs.size.master[<path>]`.
///
/// # Safety
///
/// `request` and `result` must be NULL or point to valid host structures.
#[no_mangle]
pub unsafe extern "C" fn zbx_module_fssize(
    request: *mut AgentRequest,
    result: *mut AgentResult,
) -> c_int {
    let (Some(request), Some(result)) = (request.as_ref(), result.as_mut()) else {
        return SYSINFO_RET_FAIL;
    };

    let params = request.params();
    let precision = config::current().report.effective_precision();

    match panic::catch_unwind(|| fssize::collect(&params, precision)) {
        Ok(Ok(json)) => {
            result.set_str(&json);
            SYSINFO_RET_OK
        }
        Ok(Err(e)) => {
            debug!("[{MODULE_NAME}] {}{params:?}: {e}", fssize::ITEM_KEY);
            result.set_msg(&e.to_string());
            SYSINFO_RET_FAIL
        }
        Err(_) => {
            error!("[{MODULE_NAME}] {} panicked for {params:?}", fssize::ITEM_KEY);
            result.set_msg("Internal error while collecting filesystem size.");
            SYSINFO_RET_FAIL
        }
    }
}

#[no_mangle]
pub extern "C" fn zbx_module_init() -> c_int {
    panic::catch_unwind(init).unwrap_or(ZBX_MODULE_FAIL)
}

#[no_mangle]
pub extern "C" fn zbx_module_uninit() -> c_int {
    info!("[{MODULE_NAME}] module unloaded");
    ZBX_MODULE_OK
}

fn init() -> c_int {
    let loaded = config::load();
    let log = loaded
        .as_ref()
        .map(|(config, _)| config.log.clone())
        .unwrap_or_default();
    start_logging(&log);

    let (config, source) = match loaded {
        Ok(loaded) => loaded,
        Err(e) => {
            error!("[{MODULE_NAME}] {e}");
            return ZBX_MODULE_FAIL;
        }
    };
    match source {
        Some(path) => info!("[{MODULE_NAME}] loaded config from {}", path.display()),
        None => debug!("[{MODULE_NAME}] no config file, using defaults"),
    }
    config::install(config);

    accept_host(host::program_type())
}

fn start_logging(log: &LogConfig) {
    if let Err(e) = logging::init(log) {
        let fallback = LogConfig {
            file: None,
            ..log.clone()
        };
        let _ = logging::init(&fallback);
        warn!("[{MODULE_NAME}] cannot open log file, logging to stderr: {e}");
    }
}

/// Decide whether the loading process is one this module supports.
pub fn accept_host(program_type: Option<ProgramType>) -> c_int {
    match program_type {
        Some(pt) if pt.is_daemon() => {
            debug!("[{MODULE_NAME}] module loaded by {pt} process. [{}]", pt.raw());
            ZBX_MODULE_OK
        }
        Some(pt) => {
            debug!("[{MODULE_NAME}] unknown value program_type [{}]", pt.raw());
            ZBX_MODULE_FAIL
        }
        None => {
            debug!("[{MODULE_NAME}] program_type is not available in this process");
            ZBX_MODULE_FAIL
        }
    }
}
