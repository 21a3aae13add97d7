use std::path::Path;

use oci_spec::runtime::{MountBuilder, Spec};
use path_clean::PathClean;

use crate::consts;
use crate::error::RunrootlessError;
use crate::proot::{self, ProotConfig};
use crate::rootless::PrivilegeDowngrade;

/// Rewrites a bundle spec so the container can run without privileges:
/// relax the spec, anchor the root filesystem at the original bundle and
/// make the emulator the container entry point. The spec is mutated in
/// place; on error it may be left partially transformed and must not be
/// reused.
pub fn transform_spec(
	spec: &mut Spec,
	old_bundle: &Path,
	downgrade: &dyn PrivilegeDowngrade,
	proot: &ProotConfig,
) -> Result<(), RunrootlessError> {
	downgrade.downgrade(spec)?;
	to_absolute_rootfs(spec, old_bundle);
	inject_proot(spec, proot)
}

/// The prepared bundle lives in a different directory than the original, so
/// a relative rootfs would resolve against the wrong tree once the runtime
/// picks it up. Purely lexical, no symlink resolution.
fn to_absolute_rootfs(spec: &mut Spec, old_bundle: &Path) {
	if let Some(root) = spec.root() {
		if !root.path().is_absolute() {
			let mut root = root.clone();
			root.set_path(old_bundle.join(root.path()).clean());
			spec.set_root(Some(root));
		}
	}
}

fn inject_proot(spec: &mut Spec, config: &ProotConfig) -> Result<(), RunrootlessError> {
	let proot_binary = config.proot_path()?;

	let root_path = spec
		.root()
		.as_ref()
		.map(|root| root.path().clone())
		.ok_or_else(|| RunrootlessError::InvalidBundle("spec has no root filesystem".into()))?;

	// copy the binary into the rootfs instead of bind-mounting it: bind
	// mounts set up out here are not visible to a runtime running in its own
	// namespaced process group (e.g. under snap confinement)
	proot::copy_preserving(&proot_binary, &root_path.join("proot"))?;

	let mut mounts = spec.mounts().clone().unwrap_or_default();
	mounts.push(
		MountBuilder::default()
			.destination(consts::PROOT_TMP_DIR)
			.typ("tmpfs")
			.source("tmpfs")
			.options(vec![
				"exec".to_string(),
				"mode=755".to_string(),
				"size=32256k".to_string(),
			])
			.build()?,
	);
	spec.set_mounts(Some(mounts));

	let mut process = spec
		.process()
		.clone()
		.ok_or_else(|| RunrootlessError::InvalidBundle("spec has no process".into()))?;

	let mut args = vec![
		consts::PROOT_CONTAINER_PATH.to_string(),
		consts::PROOT_ROOT_FLAG.to_string(),
	];
	args.extend(process.args().clone().unwrap_or_default());
	process.set_args(Some(args));

	let mut env = process.env().clone().unwrap_or_default();
	env.push(format!("PROOT_TMP_DIR={}", consts::PROOT_TMP_DIR));
	if !config.seccomp() {
		// seccomp emulation is expensive and flaky, keep it off unless the
		// operator explicitly asked for it
		env.push("PROOT_NO_SECCOMP=1".to_string());
	}
	process.set_env(Some(env));
	spec.set_process(Some(process));

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::consts;
	use crate::proot::ProotConfig;
	use oci_spec::runtime::{
		MountBuilder, ProcessBuilder, RootBuilder, Spec, SpecBuilder,
	};
	use std::os::unix::fs::PermissionsExt;
	use std::path::PathBuf;
	use tempfile::TempDir;

	/// Downgrade stand-in so transformer tests do not depend on the real
	/// rootless conversion.
	struct NoDowngrade;

	impl PrivilegeDowngrade for NoDowngrade {
		fn downgrade(&self, _spec: &mut Spec) -> Result<(), RunrootlessError> {
			Ok(())
		}
	}

	fn test_spec(root_path: &str, args: Vec<&str>, env: Vec<&str>) -> Spec {
		SpecBuilder::default()
			.root(RootBuilder::default().path(root_path).build().unwrap())
			.process(
				ProcessBuilder::default()
					.args(args.into_iter().map(String::from).collect::<Vec<_>>())
					.env(env.into_iter().map(String::from).collect::<Vec<_>>())
					.build()
					.unwrap(),
			)
			.build()
			.unwrap()
	}

	fn install_fake_proot(home: &TempDir) -> PathBuf {
		let dir = home.path().join(consts::PROOT_INSTALL_DIR);
		std::fs::create_dir_all(&dir).unwrap();
		let binary = dir.join(consts::PROOT_INSTALL_BINARY);
		std::fs::write(&binary, b"#!/bin/sh\n").unwrap();
		std::fs::set_permissions(&binary, std::fs::Permissions::from_mode(0o755)).unwrap();
		binary
	}

	#[test]
	fn absolute_rootfs_is_left_untouched() {
		let mut spec = test_spec("/somewhere/rootfs", vec!["/bin/sh"], vec![]);
		to_absolute_rootfs(&mut spec, Path::new("/bundles/mycontainer"));
		assert_eq!(
			spec.root().as_ref().unwrap().path(),
			&PathBuf::from("/somewhere/rootfs")
		);
	}

	#[test]
	fn relative_rootfs_is_anchored_and_cleaned() {
		let mut spec = test_spec("../c", vec!["/bin/sh"], vec![]);
		to_absolute_rootfs(&mut spec, Path::new("/a/b"));
		assert_eq!(spec.root().as_ref().unwrap().path(), &PathBuf::from("/a/c"));
	}

	#[test]
	fn injection_prepends_proot_invocation() {
		let home = TempDir::new().unwrap();
		install_fake_proot(&home);
		let bundle = TempDir::new().unwrap();
		std::fs::create_dir(bundle.path().join("rootfs")).unwrap();
		let config = ProotConfig::new(home.path(), false);

		let mut spec = test_spec(
			bundle.path().join("rootfs").to_str().unwrap(),
			vec!["/bin/sh", "-c", "id"],
			vec![],
		);
		inject_proot(&mut spec, &config).unwrap();

		let args = spec.process().as_ref().unwrap().args().as_ref().unwrap();
		assert_eq!(
			args,
			&vec![
				"/proot".to_string(),
				"-0".to_string(),
				"/bin/sh".to_string(),
				"-c".to_string(),
				"id".to_string()
			]
		);
	}

	#[test]
	fn injection_appends_exactly_one_tmpfs_mount() {
		let home = TempDir::new().unwrap();
		install_fake_proot(&home);
		let bundle = TempDir::new().unwrap();
		std::fs::create_dir(bundle.path().join("rootfs")).unwrap();
		let config = ProotConfig::new(home.path(), false);

		let mut spec = test_spec(
			bundle.path().join("rootfs").to_str().unwrap(),
			vec!["/bin/sh"],
			vec![],
		);
		let proc_mount = MountBuilder::default()
			.destination("/proc")
			.typ("proc")
			.source("proc")
			.build()
			.unwrap();
		spec.set_mounts(Some(vec![proc_mount.clone()]));

		inject_proot(&mut spec, &config).unwrap();

		let mounts = spec.mounts().as_ref().unwrap();
		assert_eq!(mounts.len(), 2);
		assert_eq!(mounts[0], proc_mount);
		let added = &mounts[1];
		assert_eq!(added.destination().to_str(), Some("/dev/proot"));
		assert_eq!(added.typ().as_deref(), Some("tmpfs"));
		assert_eq!(added.source().as_deref(), Some(Path::new("tmpfs")));
		assert_eq!(
			added.options().as_ref().unwrap(),
			&vec![
				"exec".to_string(),
				"mode=755".to_string(),
				"size=32256k".to_string()
			]
		);
	}

	#[test]
	fn seccomp_disabled_adds_no_seccomp_variable() {
		let home = TempDir::new().unwrap();
		install_fake_proot(&home);
		let bundle = TempDir::new().unwrap();
		std::fs::create_dir(bundle.path().join("rootfs")).unwrap();

		let mut spec = test_spec(
			bundle.path().join("rootfs").to_str().unwrap(),
			vec!["/bin/sh"],
			vec!["PATH=/usr/bin"],
		);
		inject_proot(&mut spec, &ProotConfig::new(home.path(), false)).unwrap();

		let env = spec.process().as_ref().unwrap().env().as_ref().unwrap();
		assert_eq!(
			env,
			&vec![
				"PATH=/usr/bin".to_string(),
				"PROOT_TMP_DIR=/dev/proot".to_string(),
				"PROOT_NO_SECCOMP=1".to_string()
			]
		);
	}

	#[test]
	fn seccomp_enabled_keeps_proot_default() {
		let home = TempDir::new().unwrap();
		install_fake_proot(&home);
		let bundle = TempDir::new().unwrap();
		std::fs::create_dir(bundle.path().join("rootfs")).unwrap();

		let mut spec = test_spec(
			bundle.path().join("rootfs").to_str().unwrap(),
			vec!["/bin/sh"],
			vec!["PATH=/usr/bin"],
		);
		inject_proot(&mut spec, &ProotConfig::new(home.path(), true)).unwrap();

		let env = spec.process().as_ref().unwrap().env().as_ref().unwrap();
		assert_eq!(
			env,
			&vec![
				"PATH=/usr/bin".to_string(),
				"PROOT_TMP_DIR=/dev/proot".to_string()
			]
		);
	}

	#[test]
	fn missing_emulator_fails_after_rootfs_resolution() {
		let home = TempDir::new().unwrap(); // nothing installed
		let config = ProotConfig::new(home.path(), false);

		let mut spec = test_spec("rootfs", vec!["/bin/sh"], vec!["PATH=/usr/bin"]);
		let err = transform_spec(
			&mut spec,
			Path::new("/bundles/mycontainer"),
			&NoDowngrade,
			&config,
		)
		.unwrap_err();

		match err {
			RunrootlessError::ProotNotInstalled { .. } => {}
			other => panic!("unexpected error: {}", other),
		}
		// resolution has no failure mode and already happened
		assert_eq!(
			spec.root().as_ref().unwrap().path(),
			&PathBuf::from("/bundles/mycontainer/rootfs")
		);
		// the failing step did not get around to touching process or mounts
		let process = spec.process().as_ref().unwrap();
		assert_eq!(
			process.args().as_ref().unwrap(),
			&vec!["/bin/sh".to_string()]
		);
		assert_eq!(
			process.env().as_ref().unwrap(),
			&vec!["PATH=/usr/bin".to_string()]
		);
	}

	#[test]
	fn full_transformation_scenario() {
		let home = TempDir::new().unwrap();
		install_fake_proot(&home);
		let bundle = TempDir::new().unwrap();
		std::fs::create_dir(bundle.path().join("rootfs")).unwrap();
		let config = ProotConfig::new(home.path(), false);

		let mut spec = test_spec("rootfs", vec!["/bin/sh"], vec!["PATH=/usr/bin"]);
		transform_spec(&mut spec, bundle.path(), &NoDowngrade, &config).unwrap();

		let expected_rootfs = bundle.path().join("rootfs");
		assert_eq!(spec.root().as_ref().unwrap().path(), &expected_rootfs);

		let process = spec.process().as_ref().unwrap();
		assert_eq!(
			process.args().as_ref().unwrap(),
			&vec!["/proot".to_string(), "-0".to_string(), "/bin/sh".to_string()]
		);
		assert_eq!(
			process.env().as_ref().unwrap(),
			&vec![
				"PATH=/usr/bin".to_string(),
				"PROOT_TMP_DIR=/dev/proot".to_string(),
				"PROOT_NO_SECCOMP=1".to_string()
			]
		);

		let mounts = spec.mounts().as_ref().unwrap();
		assert_eq!(mounts.len(), 1);
		assert_eq!(mounts[0].destination().to_str(), Some("/dev/proot"));

		// the emulator was staged inside the rootfs with its mode intact
		let staged = expected_rootfs.join("proot");
		let mode = std::fs::metadata(&staged).unwrap().permissions().mode();
		assert_eq!(mode & 0o7777, 0o755);
	}
}
