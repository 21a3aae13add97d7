use std::path::{Path, PathBuf};
use std::process::Command;

use crate::bundle;
use crate::error::RunrootlessError;
use crate::proot::ProotConfig;
use crate::rootless::ToRootless;

/// Prepares the bundle and hands it to the external OCI runtime. Container
/// lifecycle stays with the runtime; we only deliver a corrected bundle.
pub fn run_container(
	project_dir: PathBuf,
	id: &str,
	bundle: &Path,
	runtime: &str,
) -> Result<i32, RunrootlessError> {
	let proot = ProotConfig::from_env();
	let container = bundle::prepare_bundle(&project_dir, id, bundle, &ToRootless, &proot)?;
	info!(
		"Prepared rootless bundle for container {} at {}",
		container.id(),
		container.prepared()
	);
	debug!(
		"Container rootfs: {:?}",
		container.spec().root().as_ref().map(|root| root.path())
	);

	debug!("Handing over to {}", runtime);
	let status = Command::new(runtime)
		.arg("run")
		.arg("--bundle")
		.arg(container.prepared())
		.arg(id)
		.spawn()?
		.wait()?;

	Ok(status.code().unwrap_or(1))
}
