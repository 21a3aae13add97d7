use std::path::Path;

use oci_spec::runtime::{MountBuilder, ProcessBuilder, RootBuilder, SpecBuilder};

use crate::consts;
use crate::error::RunrootlessError;
use crate::rootless::{PrivilegeDowngrade, ToRootless};

/// Writes an example `config.json` into the bundle directory that an
/// unprivileged runtime accepts as-is.
pub fn create_spec(bundle: &Path) -> Result<(), RunrootlessError> {
	let config_file = bundle.join(consts::CONFIG_FILE);
	let mut spec = SpecBuilder::default()
		.hostname("runrootless")
		.root(RootBuilder::default().path("rootfs").readonly(false).build()?)
		.process(
			ProcessBuilder::default()
				.args(vec!["sh".to_string()])
				.env(vec![
					"PATH=/usr/local/sbin:/usr/local/bin:/usr/sbin:/usr/bin:/sbin:/bin"
						.to_string(),
					"TERM=xterm".to_string(),
				])
				.cwd("/")
				.build()?,
		)
		.mounts(vec![
			MountBuilder::default()
				.destination("/proc")
				.typ("proc")
				.source("proc")
				.build()?,
			MountBuilder::default()
				.destination("/dev")
				.typ("tmpfs")
				.source("tmpfs")
				.options(vec![
					"nosuid".to_string(),
					"strictatime".to_string(),
					"mode=755".to_string(),
					"size=65536k".to_string(),
				])
				.build()?,
		])
		.build()?;

	ToRootless.downgrade(&mut spec)?;
	spec.save(&config_file)?;
	info!("Wrote new specification file to {:?}", config_file);
	Ok(())
}
