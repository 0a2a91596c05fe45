//! Host process introspection — which daemon loaded us, and where it keeps
//! its modules.
//!
//! The host exports these as plain globals. They are resolved at run time
//! through the global symbol namespace so the library still links (and
//! tests still run) without a host around it.

use std::ffi::{c_char, c_void, CStr};
use std::fmt;
use std::path::PathBuf;

/// Daemon classification from the host's `program_type` global.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramType {
    Server,
    ProxyActive,
    ProxyPassive,
    Proxy,
    Agentd,
    Sender,
    Get,
    Unknown(u8),
}

impl ProgramType {
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            0x01 => Self::Server,
            0x02 => Self::ProxyActive,
            0x04 => Self::ProxyPassive,
            0x06 => Self::Proxy,
            0x08 => Self::Agentd,
            0x10 => Self::Sender,
            0x20 => Self::Get,
            other => Self::Unknown(other),
        }
    }

    pub fn raw(self) -> u8 {
        match self {
            Self::Server => 0x01,
            Self::ProxyActive => 0x02,
            Self::ProxyPassive => 0x04,
            Self::Proxy => 0x06,
            Self::Agentd => 0x08,
            Self::Sender => 0x10,
            Self::Get => 0x20,
            Self::Unknown(raw) => raw,
        }
    }

    /// Same wording as the host's own `get_program_type_string`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Server => "server",
            Self::ProxyActive => "active proxy",
            Self::ProxyPassive => "passive proxy",
            Self::Proxy => "proxy",
            Self::Agentd => "agent",
            Self::Sender => "sender",
            Self::Get => "get",
            Self::Unknown(_) => "unknown",
        }
    }

    /// Daemons that are allowed to load this module.
    pub fn is_daemon(self) -> bool {
        matches!(
            self,
            Self::Server | Self::ProxyActive | Self::ProxyPassive | Self::Proxy | Self::Agentd
        )
    }
}

impl fmt::Display for ProgramType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn lookup(symbol: &CStr) -> Option<*mut c_void> {
    // SAFETY: RTLD_DEFAULT searches already-loaded objects; `symbol` is NUL-terminated.
    let addr = unsafe { libc::dlsym(libc::RTLD_DEFAULT, symbol.as_ptr()) };
    (!addr.is_null()).then_some(addr)
}

/// The loading daemon, or `None` when not running inside a host.
pub fn program_type() -> Option<ProgramType> {
    let addr = lookup(c"program_type")?;
    // SAFETY: the host declares `unsigned char program_type`.
    let raw = unsafe { *(addr as *const u8) };
    Some(ProgramType::from_raw(raw))
}

/// The host's `LoadModulePath` setting.
pub fn load_module_path() -> Option<PathBuf> {
    let addr = lookup(c"CONFIG_LOAD_MODULE_PATH")?;
    // SAFETY: the host declares `char *CONFIG_LOAD_MODULE_PATH`.
    let value = unsafe { *(addr as *const *const c_char) };
    if value.is_null() {
        return None;
    }
    // SAFETY: non-NULL config strings are NUL-terminated.
    let path = unsafe { CStr::from_ptr(value) }.to_string_lossy().into_owned();
    (!path.is_empty()).then(|| PathBuf::from(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_raw_known_values() {
        assert_eq!(ProgramType::from_raw(0x01), ProgramType::Server);
        assert_eq!(ProgramType::from_raw(0x02), ProgramType::ProxyActive);
        assert_eq!(ProgramType::from_raw(0x04), ProgramType::ProxyPassive);
        assert_eq!(ProgramType::from_raw(0x06), ProgramType::Proxy);
        assert_eq!(ProgramType::from_raw(0x08), ProgramType::Agentd);
        assert_eq!(ProgramType::from_raw(0x10), ProgramType::Sender);
        assert_eq!(ProgramType::from_raw(0x20), ProgramType::Get);
        assert_eq!(ProgramType::from_raw(0x40), ProgramType::Unknown(0x40));
    }

    #[test]
    fn test_raw_roundtrips_for_all_bits() {
        for raw in 0..=u8::MAX {
            assert_eq!(ProgramType::from_raw(raw).raw(), raw);
        }
    }

    #[test]
    fn test_only_daemons_may_load() {
        assert!(ProgramType::Server.is_daemon());
        assert!(ProgramType::Proxy.is_daemon());
        assert!(ProgramType::ProxyActive.is_daemon());
        assert!(ProgramType::ProxyPassive.is_daemon());
        assert!(ProgramType::Agentd.is_daemon());
        assert!(!ProgramType::Sender.is_daemon());
        assert!(!ProgramType::Get.is_daemon());
        assert!(!ProgramType::Unknown(0).is_daemon());
    }

    #[test]
    fn test_display_matches_host_wording() {
        assert_eq!(ProgramType::Agentd.to_string(), "agent");
        assert_eq!(ProgramType::ProxyPassive.to_string(), "passive proxy");
        assert_eq!(ProgramType::Unknown(9).to_string(), "unknown");
    }

    #[test]
    fn test_no_host_symbols_in_test_binary() {
        assert!(program_type().is_none());
        assert!(load_module_path().is_none());
    }
}
