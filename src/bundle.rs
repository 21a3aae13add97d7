use std::fs::{DirBuilder, OpenOptions};
use std::io::Write;
use std::os::unix::fs::DirBuilderExt;
use std::path::Path;

use getset::Getters;
use oci_spec::runtime::Spec;
use serde::{Deserialize, Serialize};

use crate::consts;
use crate::error::RunrootlessError;
use crate::proot::ProotConfig;
use crate::rootless::PrivilegeDowngrade;
use crate::transform;

#[derive(Debug, Getters, Serialize, Deserialize)]
/// Record of a prepared rootless bundle.
pub struct RootlessBundle {
	#[get = "pub"]
	/// Unique identifier of the container.
	id: String,

	#[get = "pub"]
	/// Original bundle directory, canonicalized.
	bundle: String,

	#[get = "pub"]
	/// Directory holding the transformed configuration.
	prepared: String,

	#[get = "pub"]
	/// Transformed OCI Runtime Specification of the container.
	spec: Spec,
}

/// Materializes a second bundle under `project_dir/<id>` whose configuration
/// has been rewritten for unprivileged execution. The original bundle is
/// never modified; its rootfs is referenced by absolute path.
pub fn prepare_bundle(
	project_dir: &Path,
	id: &str,
	bundle: &Path,
	downgrade: &dyn PrivilegeDowngrade,
	proot: &ProotConfig,
) -> Result<RootlessBundle, RunrootlessError> {
	// the transform joins relative rootfs paths onto the bundle dir, so the
	// anchor has to be absolute
	let old_bundle = std::fs::canonicalize(bundle)?;
	let config_file = old_bundle.join(consts::CONFIG_FILE);
	if !config_file.exists() {
		return Err(RunrootlessError::InvalidBundle(format!(
			"no {} in {:?}",
			consts::CONFIG_FILE,
			old_bundle
		)));
	}
	let mut spec = Spec::load(&config_file)?;

	let prepared_dir = project_dir.join(id);
	if prepared_dir.exists() {
		return Err(RunrootlessError::InvalidBundle(format!(
			"container {} already exists in {:?}",
			id, project_dir
		)));
	}
	DirBuilder::new()
		.recursive(true)
		.mode(0o755)
		.create(&prepared_dir)?;

	transform::transform_spec(&mut spec, &old_bundle, downgrade, proot)?;
	spec.save(&prepared_dir.join(consts::CONFIG_FILE))?;
	debug!("Wrote transformed configuration to {:?}", prepared_dir);

	let container = RootlessBundle {
		id: id.to_string(),
		bundle: old_bundle.to_string_lossy().into_owned(),
		prepared: prepared_dir.to_string_lossy().into_owned(),
		spec,
	};

	let mut record = OpenOptions::new()
		.write(true)
		.create_new(true)
		.open(prepared_dir.join(consts::CONTAINER_FILE))?;
	record.write_all(serde_json::to_string(&container)?.as_bytes())?;

	Ok(container)
}
