//! vfs.fs.size.master — filesystem size report for one mount path

use nix::errno::Errno;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use nix::sys::statvfs::statvfs;
use serde::ser::{Error as _, SerializeStruct};
use serde::{Serialize, Serializer};
use serde_json::value::RawValue;
use thiserror::Error;
use tracing::debug;

/// Item key served by [`collect`].
pub const ITEM_KEY: &str = "vfs.fs.size.master";

/// Decimals printed for the percentage fields unless configured otherwise.
pub const DEFAULT_PRECISION: usize = 6;

/// Largest precision that still changes an `f64` rendering.
pub const MAX_PRECISION: usize = 17;

#[derive(Debug, Error)]
pub enum FsSizeError {
    #[error("Invalid number of parameters.")]
    InvalidParamCount(usize),

    #[error("Filesystem name cannot be empty.")]
    EmptyName,

    #[error("Cannot obtain filesystem information: {source}")]
    Stat {
        path: PathBuf,
        #[source]
        source: Errno,
    },

    #[error("Filesystem reports zero total blocks.")]
    ZeroBlocks,

    #[error("Cannot build report: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Raw block counts as reported by `statvfs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FsStats {
    pub blocks: u64,
    pub blocks_free: u64,
    pub fragment_size: u64,
}

impl FsStats {
    #[allow(clippy::unnecessary_cast)]
    pub fn query(path: &Path) -> Result<Self, FsSizeError> {
        let stat = statvfs(path).map_err(|source| FsSizeError::Stat {
            path: path.to_path_buf(),
            source,
        })?;

        // f_blocks and f_bfree are counted in f_frsize units
        Ok(Self {
            blocks: stat.blocks() as u64,
            blocks_free: stat.blocks_free() as u64,
            fragment_size: stat.fragment_size() as u64,
        })
    }
}

/// The payload handed back to the host.
///
/// Serialises as a flat object with the keys `FS_NAME`, `FS_TOTAL`,
/// `FS_FREE`, `FS_USED`, `FS_PFREE`, `FS_PUSED` in that order. The two
/// percentages are bare numbers with a fixed count of decimals.
#[derive(Debug, Clone, PartialEq)]
pub struct FsReport {
    pub name: String,
    pub total: u64,
    pub free: u64,
    pub used: u64,
    pub pfree: f64,
    pub pused: f64,
    pub precision: usize,
}

impl FsReport {
    pub fn from_stats(name: &str, stats: &FsStats, precision: usize) -> Result<Self, FsSizeError> {
        if stats.blocks == 0 {
            return Err(FsSizeError::ZeroBlocks);
        }

        let used_blocks = stats.blocks.saturating_sub(stats.blocks_free);
        let blocks = stats.blocks as f64;

        Ok(Self {
            name: name.to_string(),
            total: stats.blocks.saturating_mul(stats.fragment_size),
            free: stats.blocks_free.saturating_mul(stats.fragment_size),
            used: used_blocks.saturating_mul(stats.fragment_size),
            pfree: 100.0 * stats.blocks_free as f64 / blocks,
            pused: 100.0 * used_blocks as f64 / blocks,
            precision: precision.min(MAX_PRECISION),
        })
    }
}

fn fixed_point(value: f64, precision: usize) -> Result<Box<RawValue>, serde_json::Error> {
    RawValue::from_string(format!("{value:.precision$}"))
}

impl Serialize for FsReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let pfree = fixed_point(self.pfree, self.precision).map_err(S::Error::custom)?;
        let pused = fixed_point(self.pused, self.precision).map_err(S::Error::custom)?;

        let mut s = serializer.serialize_struct("FsReport", 6)?;
        s.serialize_field("FS_NAME", &self.name)?;
        s.serialize_field("FS_TOTAL", &self.total)?;
        s.serialize_field("FS_FREE", &self.free)?;
        s.serialize_field("FS_USED", &self.used)?;
        s.serialize_field("FS_PFREE", &pfree)?;
        s.serialize_field("FS_PUSED", &pused)?;
        s.end()
    }
}

/// Run the item: exactly one non-empty parameter naming the mount path.
///
/// The path is passed to `statvfs` byte for byte; only `FS_NAME` is
/// converted to UTF-8, lossily.
pub fn collect(params: &[Option<&OsStr>], precision: usize) -> Result<String, FsSizeError> {
    let fs = match params {
        [Some(fs)] if !fs.is_empty() => Path::new(fs),
        [_] => return Err(FsSizeError::EmptyName),
        other => return Err(FsSizeError::InvalidParamCount(other.len())),
    };

    let stats = FsStats::query(fs)?;
    let name = fs.to_string_lossy();
    debug!(
        "{ITEM_KEY}[{name}]: blocks={} free={} frsize={}",
        stats.blocks, stats.blocks_free, stats.fragment_size
    );

    let report = FsReport::from_stats(&name, &stats, precision)?;
    Ok(serde_json::to_string(&report)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(blocks: u64, blocks_free: u64, fragment_size: u64) -> FsStats {
        FsStats {
            blocks,
            blocks_free,
            fragment_size,
        }
    }

    #[test]
    fn test_report_byte_counts() {
        let report = FsReport::from_stats("/data", &stats(1000, 250, 4096), 6).unwrap();
        assert_eq!(report.total, 4_096_000);
        assert_eq!(report.free, 1_024_000);
        assert_eq!(report.used, 3_072_000);
        assert_eq!(report.pfree, 25.0);
        assert_eq!(report.pused, 75.0);
    }

    #[test]
    fn test_report_wire_format() {
        let report = FsReport::from_stats("/data", &stats(1000, 250, 4096), 6).unwrap();
        assert_eq!(
            serde_json::to_string(&report).unwrap(),
            r#"{"FS_NAME":"/data","FS_TOTAL":4096000,"FS_FREE":1024000,"FS_USED":3072000,"FS_PFREE":25.000000,"FS_PUSED":75.000000}"#
        );
    }

    #[test]
    fn test_report_precision() {
        let report = FsReport::from_stats("/", &stats(3, 1, 512), 2).unwrap();
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.ends_with(r#""FS_PFREE":33.33,"FS_PUSED":66.67}"#), "{json}");

        let report = FsReport::from_stats("/", &stats(3, 1, 512), 0).unwrap();
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.ends_with(r#""FS_PFREE":33,"FS_PUSED":67}"#), "{json}");
    }

    #[test]
    fn test_precision_is_clamped() {
        let report = FsReport::from_stats("/", &stats(4, 1, 512), 99).unwrap();
        assert_eq!(report.precision, MAX_PRECISION);
    }

    #[test]
    fn test_name_is_escaped() {
        let report = FsReport::from_stats("/mnt/\"odd\"", &stats(10, 5, 1), 1).unwrap();
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.starts_with(r#"{"FS_NAME":"/mnt/\"odd\"","#), "{json}");
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["FS_NAME"], "/mnt/\"odd\"");
    }

    #[test]
    fn test_zero_blocks_rejected() {
        let err = FsReport::from_stats("/proc", &stats(0, 0, 4096), 6).unwrap_err();
        assert!(matches!(err, FsSizeError::ZeroBlocks));
        assert_eq!(err.to_string(), "Filesystem reports zero total blocks.");
    }

    #[test]
    fn test_free_above_total_saturates() {
        let report = FsReport::from_stats("/", &stats(10, 12, 1), 6).unwrap();
        assert_eq!(report.used, 0);
        assert_eq!(report.pused, 0.0);
    }

    #[test]
    fn test_collect_parameter_errors() {
        let err = collect(&[], 6).unwrap_err();
        assert_eq!(err.to_string(), "Invalid number of parameters.");

        let two = [Some(OsStr::new("/")), Some(OsStr::new("/tmp"))];
        assert!(matches!(
            collect(&two, 6).unwrap_err(),
            FsSizeError::InvalidParamCount(2)
        ));

        let err = collect(&[Some(OsStr::new(""))], 6).unwrap_err();
        assert_eq!(err.to_string(), "Filesystem name cannot be empty.");
        assert!(matches!(collect(&[None], 6).unwrap_err(), FsSizeError::EmptyName));
    }

    #[test]
    fn test_collect_missing_path() {
        let err = collect(&[Some(OsStr::new("/definitely/not/here"))], 6).unwrap_err();
        assert!(matches!(err, FsSizeError::Stat { source: Errno::ENOENT, .. }));
        assert!(err
            .to_string()
            .starts_with("Cannot obtain filesystem information: "));
    }

    #[test]
    fn test_collect_on_temp_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().to_str().unwrap();

        let json = collect(&[Some(dir.path().as_os_str())], 6).unwrap();
        let v: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(v["FS_NAME"], path);
        let total = v["FS_TOTAL"].as_u64().unwrap();
        let free = v["FS_FREE"].as_u64().unwrap();
        let used = v["FS_USED"].as_u64().unwrap();
        assert!(total > 0);
        assert_eq!(free + used, total);

        let pfree = v["FS_PFREE"].as_f64().unwrap();
        let pused = v["FS_PUSED"].as_f64().unwrap();
        assert!((pfree + pused - 100.0).abs() < 1e-3);
    }

    #[test]
    fn test_collect_non_utf8_path() {
        use std::os::unix::ffi::OsStrExt;

        let dir = tempfile::tempdir().unwrap();
        let mount = dir.path().join(OsStr::from_bytes(b"mnt\xff"));
        std::fs::create_dir(&mount).unwrap();

        let json = collect(&[Some(mount.as_os_str())], 6).unwrap();
        let v: serde_json::Value = serde_json::from_str(&json).unwrap();
        let name = v["FS_NAME"].as_str().unwrap();
        assert!(name.ends_with("mnt\u{FFFD}"), "{name}");
        assert!(v["FS_TOTAL"].as_u64().unwrap() > 0);
    }
}
