use log::{set_logger, set_max_level, Level, LevelFilter, Metadata, Record};

struct RunrootlessLogger;

impl log::Log for RunrootlessLogger {
	fn enabled(&self, _metadata: &Metadata) -> bool {
		true
	}

	// errors and warnings go to stderr so they survive piping the
	// container's stdout
	fn log(&self, record: &Record) {
		match record.level() {
			Level::Error => {
				e_red!("[{}]", record.level());
				eprintln!(" {}", record.args());
			}
			Level::Warn => {
				e_yellow!("[{}]", record.level());
				eprintln!(" {}", record.args());
			}
			Level::Info => {
				green!("[{}]", record.level());
				println!(" {}", record.args());
			}
			Level::Debug => {
				blue!("[{}]", record.level());
				println!(" {}", record.args());
			}
			Level::Trace => {
				grey!("[{}]", record.level());
				println!(" {}", record.args());
			}
		}
	}

	fn flush(&self) {}
}

pub fn init(log_level: Option<&str>) {
	set_logger(&RunrootlessLogger).expect("Can't initialize logger");
	let max_level = log_level
		.and_then(|level| level.parse::<LevelFilter>().ok())
		.unwrap_or(LevelFilter::Info);
	set_max_level(max_level);
}
