use std::env;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use getset::CopyGetters;

use crate::consts;
use crate::error::RunrootlessError;

/// Where to look for the emulator and how to configure it. Built once at the
/// CLI boundary; the transformer itself never touches the process environment.
#[derive(Clone, Debug, CopyGetters)]
pub struct ProotConfig {
	home_dir: PathBuf,

	#[get_copy = "pub"]
	/// Whether proot should keep its seccomp-based syscall interception.
	seccomp: bool,
}

impl ProotConfig {
	pub fn new<P: Into<PathBuf>>(home_dir: P, seccomp: bool) -> Self {
		Self {
			home_dir: home_dir.into(),
			seccomp,
		}
	}

	/// Reads `$HOME` directly instead of the passwd database, which is
	/// unavailable in statically linked binaries.
	pub fn from_env() -> Self {
		let home_dir = env::var_os("HOME").map(PathBuf::from).unwrap_or_default();
		let seccomp = env::var(consts::SECCOMP_ENV)
			.ok()
			.as_deref()
			.and_then(parse_bool)
			.unwrap_or(false);
		Self { home_dir, seccomp }
	}

	/// Resolves the installed emulator binary. Re-stats on every call, the
	/// binary may be (re)installed between transformations.
	pub fn proot_path(&self) -> Result<PathBuf, RunrootlessError> {
		let path = self
			.home_dir
			.join(consts::PROOT_INSTALL_DIR)
			.join(consts::PROOT_INSTALL_BINARY);
		match std::fs::metadata(&path) {
			Ok(_) => Ok(path),
			Err(err) if err.kind() == io::ErrorKind::NotFound => {
				Err(RunrootlessError::ProotNotInstalled { path })
			}
			Err(err) => Err(RunrootlessError::ProotStat { path, source: err }),
		}
	}
}

/// Lenient boolean parsing for the seccomp switch: accepts the usual
/// `1/t/true` and `0/f/false` spellings in any case, anything else is `None`.
pub fn parse_bool(value: &str) -> Option<bool> {
	match value.to_ascii_lowercase().as_str() {
		"1" | "t" | "true" => Some(true),
		"0" | "f" | "false" => Some(false),
		_ => None,
	}
}

/// Copies `source` to `dest` with all metadata intact. This shells out to
/// `cp --preserve=all` because std::fs::copy keeps the mode but drops
/// ownership, timestamps and extended attributes.
pub fn copy_preserving(source: &Path, dest: &Path) -> Result<(), RunrootlessError> {
	let status = Command::new("cp")
		.arg("--preserve=all")
		.arg(source)
		.arg(dest)
		.status()
		.map_err(|err| RunrootlessError::ProotCopy {
			path: source.to_path_buf(),
			source: err,
		})?;
	if !status.success() {
		return Err(RunrootlessError::ProotCopy {
			path: source.to_path_buf(),
			source: io::Error::new(
				io::ErrorKind::Other,
				format!("cp exited with {}", status),
			),
		});
	}
	Ok(())
}
