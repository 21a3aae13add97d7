#[macro_use]
extern crate colour;
#[macro_use]
extern crate log;

mod bundle;
mod consts;
mod error;
mod logging;
mod proot;
mod rootless;
mod run;
mod spec;
mod transform;

use crate::run::run_container;
use crate::spec::create_spec;
use clap::{crate_description, crate_version, Arg, Command};
use std::{env, path::PathBuf};

fn parse_matches(app: Command) {
	let matches = app.get_matches();

	let project_dir = PathBuf::from(matches.get_one::<String>("ROOT").unwrap());

	// initialize logger
	logging::init(matches.get_one::<String>("LOG_LEVEL").map(|s| s.as_str()));
	info!("Welcome to runrootless {}", crate_version!());
	debug!(
		"Runrootless was started with command {}",
		env::args().collect::<Vec<String>>().join(" ")
	);

	let result = match matches.subcommand() {
		Some(("spec", sub_m)) => {
			let bundle = PathBuf::from(sub_m.get_one::<String>("BUNDLE").unwrap());
			create_spec(&bundle).map(|_| 0)
		}
		Some(("run", sub_m)) => run_container(
			project_dir,
			sub_m.get_one::<String>("CONTAINER_ID").unwrap(),
			&PathBuf::from(sub_m.get_one::<String>("BUNDLE").unwrap()),
			sub_m.get_one::<String>("RUNTIME").unwrap(),
		),
		_ => {
			error!(
				"Subcommand is missing or currently not supported! Run `runrootless -h` for more information!"
			);
			std::process::exit(1);
		}
	};

	match result {
		Ok(code) => std::process::exit(code),
		Err(err) => {
			error!("{}", err);
			std::process::exit(1);
		}
	}
}

pub fn main() {
	std::panic::set_hook(Box::new(|panic_info| {
		error!("PANIC: {}", panic_info);
	}));

	let app = Command::new("runrootless")
		.version(crate_version!())
		.about(crate_description!())
		.arg(
			Arg::new("ROOT")
				.long("root")
				.default_value("/run/user/1000/runrootless")
				.help("root directory for storage of prepared bundles"),
		)
		.arg(
			Arg::new("LOG_LEVEL")
				.long("log-level")
				.short('l')
				.default_value("info")
				.value_parser(["trace", "debug", "info", "warn", "error", "off"])
				.help("The logging level of the application."),
		)
		.subcommand(
			Command::new("spec")
				.about("Create a new specification file")
				.version(crate_version!())
				.arg(
					Arg::new("BUNDLE")
						.long("bundle")
						.short('b')
						.required(true)
						.help("path to the root of the bundle directory"),
				),
		)
		.subcommand(
			Command::new("run")
				.about("Prepare a rootless bundle and run it with the OCI runtime")
				.version(crate_version!())
				.arg(
					Arg::new("CONTAINER_ID")
						.required(true)
						.help("Id of the container"),
				)
				.arg(
					Arg::new("BUNDLE")
						.long("bundle")
						.short('b')
						.required(true)
						.help("Path to the root of the bundle directory"),
				)
				.arg(
					Arg::new("RUNTIME")
						.long("runtime")
						.default_value("runc")
						.help("OCI runtime used to run the prepared bundle"),
				),
		);

	parse_matches(app);
}
