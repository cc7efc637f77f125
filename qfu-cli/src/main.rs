use std::io::{self, Write};
use std::process::ExitCode;

use camino::Utf8PathBuf;
use chrono::Local;
use clap::Parser;
use env_logger::fmt::Formatter;
use env_logger::{Logger, Target};
use log::{Level, LevelFilter, Log, Metadata, Record};
use qfu::{ActionFlags, BusDev, Config, Engine, SysfsEnumerator, UpdateParams, VidPid, Workflows};

const PROGRAM_NAME: &str = "qmi-firmware-update";

const EXAMPLES: &str = "\
E.g. an update operation:
 $ sudo qmi-firmware-update \\
       --update \\
       --device /dev/cdc-wdm4 \\
       --firmware-version 05.05.58.00 \\
       --config-version 005.025_002 \\
       --carrier Generic \\
       SWI9X15C_05.05.58.00.cwe \\
       SWI9X15C_05.05.58.00_Generic_005.025_002.nvu

E.g. a verify operation:
 $ sudo qmi-firmware-update \\
       --verify \\
       SWI9X15C_05.05.58.00.cwe \\
       SWI9X15C_05.05.58.00_Generic_005.025_002.nvu";

#[derive(Parser)]
#[command(name = PROGRAM_NAME, about = "Update firmware in QMI devices")]
#[command(disable_version_flag = true, after_help = EXAMPLES)]
struct Cli {
    /// Select device by bus and device number (in decimal)
    #[arg(short = 'N', long, value_name = "[BUS:]DEV", value_parser = qfu::parse_busnum_devnum, help_heading = "Generic device selection options")]
    busnum_devnum: Option<BusDev>,

    /// Select device by device vendor and product id (in hexadecimal)
    #[arg(short = 'D', long, value_name = "VID:[PID]", value_parser = qfu::parse_vid_pid, help_heading = "Generic device selection options")]
    vid_pid: Option<VidPid>,

    /// Launch firmware update process
    #[arg(short = 'u', long, help_heading = "Update options")]
    update: bool,

    /// Specify cdc-wdm device path (e.g. /dev/cdc-wdm0)
    #[arg(short = 'd', long, value_name = "PATH", help_heading = "Update options")]
    device: Option<Utf8PathBuf>,

    /// Firmware version (e.g. '05.05.58.00')
    #[arg(short = 'f', long, value_name = "VERSION", help_heading = "Update options")]
    firmware_version: Option<String>,

    /// Config version (e.g. '005.025_002')
    #[arg(short = 'c', long, value_name = "VERSION", help_heading = "Update options")]
    config_version: Option<String>,

    /// Carrier name (e.g. 'Generic')
    #[arg(short = 'C', long, value_name = "CARRIER", help_heading = "Update options")]
    carrier: Option<String>,

    /// Request to use the 'qmi-proxy' proxy
    #[arg(short = 'p', long, help_heading = "Update options")]
    device_open_proxy: bool,

    /// Open an MBIM device with EXT_QMUX support
    #[arg(long, help_heading = "Update options")]
    device_open_mbim: bool,

    /// Launch firmware update process in QDL mode
    #[arg(short = 'U', long, help_heading = "Update options (QDL mode)")]
    update_qdl: bool,

    /// Specify QDL serial device path (e.g. /dev/ttyUSB0)
    #[arg(short = 's', long, value_name = "PATH", help_heading = "Update options (QDL mode)")]
    serial: Option<Utf8PathBuf>,

    /// Analyze and verify firmware images
    #[arg(short = 'z', long, help_heading = "Verify options")]
    verify: bool,

    /// Run action with verbose logs, including the debug ones
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Run action with no logs; not even the error/warning ones
    #[arg(long)]
    silent: bool,

    /// Print version
    #[arg(short = 'V', long)]
    version: bool,

    /// Firmware and config images
    #[arg(value_name = "FILE")]
    images: Vec<Utf8PathBuf>,
}

impl From<Cli> for Config {
    fn from(cli: Cli) -> Self {
        Config {
            vid_pid: cli.vid_pid,
            bus_dev: cli.busnum_devnum,
            actions: ActionFlags {
                update: cli.update,
                update_qdl: cli.update_qdl,
                verify: cli.verify,
            },
            device: cli.device,
            update: UpdateParams {
                firmware_version: cli.firmware_version,
                config_version: cli.config_version,
                carrier: cli.carrier,
                use_proxy: cli.device_open_proxy,
                use_mbim: cli.device_open_mbim,
            },
            serial: cli.serial,
            images: cli.images,
        }
    }
}

fn print_version() {
    println!();
    println!("{} {}", PROGRAM_NAME, env!("CARGO_PKG_VERSION"));
    println!("Copyright (C) 2016 Bjørn Mork");
    println!("Copyright (C) 2016 Zodiac Inflight Innovations");
    println!("Copyright (C) 2016 Aleksander Morgado");
    println!("License GPLv2+: GNU GPL version 2 or later <http://gnu.org/licenses/gpl-2.0.html>");
    println!("This is free software: you are free to change and redistribute it.");
    println!("There is NO WARRANTY, to the extent permitted by law.");
    println!();
}

fn log_level(verbose: bool, silent: bool) -> LevelFilter {
    if silent {
        LevelFilter::Off
    } else if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    }
}

fn level_tag(level: Level) -> &'static str {
    match level {
        Level::Error => "-Error **",
        Level::Warn => "-Warning **",
        Level::Info => "",
        Level::Debug | Level::Trace => "[Debug]",
    }
}

fn format_record(buf: &mut Formatter, record: &Record) -> io::Result<()> {
    writeln!(
        buf,
        "[{}] {} {}",
        Local::now().format("%d %b %Y, %H:%M:%S"),
        level_tag(record.level()),
        record.args()
    )
}

/// Whether records of `level` go to stderr rather than stdout.
fn is_error_level(level: Level) -> bool {
    level <= Level::Warn
}

/// Sends warnings and errors to stderr, everything else to stdout.
struct SplitLogger {
    stdout: Logger,
    stderr: Logger,
}

impl Log for SplitLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        if is_error_level(metadata.level()) {
            self.stderr.enabled(metadata)
        } else {
            self.stdout.enabled(metadata)
        }
    }

    fn log(&self, record: &Record) {
        if is_error_level(record.level()) {
            self.stderr.log(record)
        } else {
            self.stdout.log(record)
        }
    }

    fn flush(&self) {
        self.stdout.flush();
        self.stderr.flush();
    }
}

fn build_logger(target: Target, level: LevelFilter) -> Logger {
    env_logger::Builder::new()
        .filter_level(level)
        .target(target)
        .format(format_record)
        .build()
}

fn init_logging(verbose: bool, silent: bool) {
    let level = log_level(verbose, silent);
    let logger = SplitLogger {
        stdout: build_logger(Target::Stdout, level),
        stderr: build_logger(Target::Stderr, level),
    };
    if log::set_boxed_logger(Box::new(logger)).is_ok() {
        log::set_max_level(level);
    }
}

fn run(config: Config) -> anyhow::Result<()> {
    let engine = Engine::new(SysfsEnumerator::new(), Workflows);
    engine.run(config)?;
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.version {
        print_version();
        return ExitCode::SUCCESS;
    }

    init_logging(cli.verbose, cli.silent);

    match run(cli.into()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
