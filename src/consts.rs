/// Directory below `$HOME` where the emulator is installed.
pub const PROOT_INSTALL_DIR: &str = ".runrootless";
/// Name of the installed emulator binary.
pub const PROOT_INSTALL_BINARY: &str = "runrootless-proot";

/// Path of the emulator copy inside the container root filesystem.
pub const PROOT_CONTAINER_PATH: &str = "/proot";
/// Flag that makes proot fake uid 0 for the traced process.
pub const PROOT_ROOT_FLAG: &str = "-0";

/// In-container scratch directory for the emulator's runtime state.
pub const PROOT_TMP_DIR: &str = "/dev/proot";

pub const SECCOMP_ENV: &str = "RUNROOTLESS_SECCOMP";

pub const CONFIG_FILE: &str = "config.json";
pub const CONTAINER_FILE: &str = "container.json";
