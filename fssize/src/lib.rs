//! zbx-fssize — loadable monitoring module reporting filesystem size
//!
//! Built as a `cdylib`, the library exports the module ABI the monitoring
//! daemons expect (`zbx_module_api_version`, `zbx_module_item_timeout`,
//! `zbx_module_item_list`, `zbx_module_init`, `zbx_module_uninit`) and a
//! single item, `vfs.fs.size.master[<path>]`, which answers with a flat JSON
//! object built from `statvfs`:
//!
//! ```text
//! {"FS_NAME":"/","FS_TOTAL":...,"FS_FREE":...,"FS_USED":...,"FS_PFREE":...,"FS_PUSED":...}
//! ```
//!
//! On failure the item returns one of these messages to the host:
//!
//! - `Invalid number of parameters.`
//! - `Filesystem name cannot be empty.`
//! - `Cannot obtain filesystem information: <errno>`, where the errno text
//!   (e.g. `ENOENT: No such file or directory`) tells a missing path apart
//!   from a permission problem
//! - `Filesystem reports zero total blocks.` for pseudo filesystems such as
//!   `/proc`; the C module this replaces said `s.f_blocks is zero`

pub mod abi;
pub mod config;
pub mod fssize;
pub mod host;
pub mod logging;
pub mod module;

/// File name the host loads this module as.
pub const MODULE_NAME: &str = "libfssize.so";

pub use fssize::{collect, FsReport, FsSizeError, FsStats, ITEM_KEY};
pub use host::ProgramType;
