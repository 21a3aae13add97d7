use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RunrootlessError {
	#[error("{} not found. please install runrootless-proot according to the README", path.display())]
	ProotNotInstalled { path: PathBuf },

	#[error("could not stat emulator binary at {}: {source}", path.display())]
	ProotStat {
		path: PathBuf,
		source: std::io::Error,
	},

	#[error("could not copy {} into the container root: {source}", path.display())]
	ProotCopy {
		path: PathBuf,
		source: std::io::Error,
	},

	#[error("rootless conversion failed: {0}")]
	Downgrade(String),

	#[error("invalid bundle: {0}")]
	InvalidBundle(String),

	#[error("specification error: {0}")]
	Spec(#[from] oci_spec::OciSpecError),

	#[error("could not serialize container record: {0}")]
	Record(#[from] serde_json::Error),

	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
}
