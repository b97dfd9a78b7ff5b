pub mod actions;

use anyhow::{anyhow, Result};
use clap::{parser::ValueSource, Arg, ArgMatches, Command};

use crate::{
    output::{OutputFormat, OutputSink},
    protocol::{Parity, SnifferConfig, StopBits},
};

/// Build the command-line definition.
pub fn build_command() -> Command {
    Command::new("rtutap")
        .about("Passive Modbus RTU bus monitor")
        .version(env!("CARGO_PKG_VERSION"))
        .arg(
            Arg::new("port")
                .long("port")
                .short('p')
                .help("Serial device to listen on, e.g. /dev/ttyUSB0 or COM3")
                .value_name("PORT"),
        )
        .arg(
            Arg::new("baud-rate")
                .long("baud-rate")
                .short('b')
                .help("Serial port baud rate")
                .value_name("BAUD")
                .default_value("9600")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new("parity")
                .long("parity")
                .help("Parity: none, even, odd, mark, space")
                .value_name("PARITY")
                .default_value("none")
                .value_parser(|s: &str| s.parse::<Parity>().map_err(|e| e.to_string())),
        )
        .arg(
            Arg::new("stop-bits")
                .long("stop-bits")
                .help("Stop bits: 1, 1.5, 2")
                .value_name("BITS")
                .default_value("1")
                .value_parser(|s: &str| s.parse::<StopBits>().map_err(|e| e.to_string())),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .short('t')
                .help(
                    "Inter-frame silence in seconds \
                     (default: 3.5 characters at the baud rate, +30%)",
                )
                .value_name("SECS")
                .value_parser(clap::value_parser!(f64)),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .help("JSON configuration file; explicit flags override its values")
                .value_name("FILE"),
        )
        .arg(
            Arg::new("output")
                .long("output")
                .short('o')
                .help("Record destination: stdout, file:<path> or pipe:<path>")
                .value_name("OUTPUT")
                .default_value("stdout")
                .value_parser(|s: &str| s.parse::<OutputSink>().map_err(|e| e.to_string())),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .short('j')
                .help("Emit JSON objects instead of DATE=..;ERR=.. lines")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("list-ports")
                .long("list-ports")
                .short('l')
                .help("List all available serial ports and exit")
                .action(clap::ArgAction::SetTrue),
        )
}

/// Parse command line arguments and return ArgMatches.
pub fn parse_args() -> ArgMatches {
    build_command().get_matches()
}

/// Value of `id` only when it was typed on the command line, not a clap default.
fn given<'a, T>(matches: &'a ArgMatches, id: &str) -> Option<&'a T>
where
    T: Clone + Send + Sync + 'static,
{
    if matches.value_source(id) == Some(ValueSource::CommandLine) {
        matches.get_one::<T>(id)
    } else {
        None
    }
}

/// Merge defaults, the optional config file and explicit flags, in that order.
pub fn config_from_matches(matches: &ArgMatches) -> Result<SnifferConfig> {
    let mut cfg = match matches.get_one::<String>("config") {
        Some(path) => SnifferConfig::from_file(path)?,
        None => SnifferConfig::default(),
    };

    // clap defaults mirror SnifferConfig::default(), so only explicit flags apply
    if let Some(port) = matches.get_one::<String>("port") {
        cfg.device = port.clone();
    }
    if let Some(baud) = given::<u32>(matches, "baud-rate") {
        cfg.baud_rate = *baud;
    }
    if let Some(parity) = given::<Parity>(matches, "parity") {
        cfg.parity = *parity;
    }
    if let Some(stop_bits) = given::<StopBits>(matches, "stop-bits") {
        cfg.stop_bits = *stop_bits;
    }
    if let Some(timeout) = matches.get_one::<f64>("timeout") {
        cfg.timeout = Some(*timeout);
    }

    if cfg.device.is_empty() {
        return Err(anyhow!(
            "No serial port given. Use --port <PORT> or set \"device\" in the config file"
        ));
    }
    cfg.validate()?;
    Ok(cfg)
}

pub fn output_format(matches: &ArgMatches) -> OutputFormat {
    if matches.get_flag("json") {
        OutputFormat::Json
    } else {
        OutputFormat::Line
    }
}

pub fn output_sink(matches: &ArgMatches) -> OutputSink {
    matches
        .get_one::<OutputSink>("output")
        .cloned()
        .unwrap_or_default()
}
