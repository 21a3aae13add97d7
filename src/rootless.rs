use oci_spec::runtime::{
	Linux, LinuxIdMappingBuilder, LinuxNamespaceBuilder, LinuxNamespaceType, Spec,
};

use crate::error::RunrootlessError;

/// Seam for the privilege-relaxation step of the bundle transformation.
/// Implementations mutate the spec so that it no longer asks for operations
/// an unprivileged runtime cannot perform.
pub trait PrivilegeDowngrade {
	fn downgrade(&self, spec: &mut Spec) -> Result<(), RunrootlessError>;
}

/// Default downgrade: map the container root user onto the invoking user in
/// a fresh user namespace and drop everything that needs real root.
pub struct ToRootless;

impl PrivilegeDowngrade for ToRootless {
	fn downgrade(&self, spec: &mut Spec) -> Result<(), RunrootlessError> {
		let mut linux = spec.linux().clone().unwrap_or_else(Linux::default);

		let mut namespaces = linux.namespaces().clone().unwrap_or_default();
		if !namespaces
			.iter()
			.any(|ns| ns.typ() == LinuxNamespaceType::User)
		{
			namespaces.push(
				LinuxNamespaceBuilder::default()
					.typ(LinuxNamespaceType::User)
					.build()?,
			);
		}
		linux.set_namespaces(Some(namespaces));

		let uid = nix::unistd::geteuid().as_raw();
		let gid = nix::unistd::getegid().as_raw();
		linux.set_uid_mappings(Some(vec![LinuxIdMappingBuilder::default()
			.host_id(uid)
			.container_id(0u32)
			.size(1u32)
			.build()?]));
		linux.set_gid_mappings(Some(vec![LinuxIdMappingBuilder::default()
			.host_id(gid)
			.container_id(0u32)
			.size(1u32)
			.build()?]));

		// cgroup control is unavailable without privilege
		linux.set_resources(None);
		linux.set_cgroups_path(None);
		spec.set_linux(Some(linux));

		// unprivileged mounts reject id-mapping options; entries keep their
		// position, only the offending options are dropped
		if let Some(mounts) = spec.mounts() {
			let mounts = mounts
				.iter()
				.map(|mount| {
					let mut mount = mount.clone();
					if let Some(options) = mount.options() {
						let filtered: Vec<String> = options
							.iter()
							.filter(|opt| {
								!opt.starts_with("uid=") && !opt.starts_with("gid=")
							})
							.cloned()
							.collect();
						mount.set_options(Some(filtered));
					}
					mount
				})
				.collect();
			spec.set_mounts(Some(mounts));
		}

		// setgroups is denied in a fresh user namespace
		if let Some(process) = spec.process() {
			let mut process = process.clone();
			let mut user = process.user().clone();
			user.set_additional_gids(None);
			process.set_user(user);
			spec.set_process(Some(process));
		}

		Ok(())
	}
}
