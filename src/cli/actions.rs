use anyhow::{Context, Result};
use clap::ArgMatches;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use super::{config_from_matches, output_format, output_sink};
use crate::{
    output::OutputFormat,
    protocol::{open_serial, FrameCollector},
    runtime::{self, FrameStats},
    utils::enumerate_ports,
};

/// Print available serial ports, one per line or as a JSON array.
pub fn list_ports(matches: &ArgMatches) -> Result<()> {
    let ports = enumerate_ports()?;
    match output_format(matches) {
        OutputFormat::Json => println!("{}", serde_json::to_string(&ports)?),
        OutputFormat::Line => {
            for port in &ports {
                println!("{}\t{}", port.name, port.kind);
            }
        }
    }
    Ok(())
}

/// Open the bus and monitor it until interrupted or the device fails.
pub fn run_monitor(matches: &ArgMatches) -> Result<FrameStats> {
    let cfg = config_from_matches(matches)?;
    let mut sink = output_sink(matches).writer(output_format(matches))?;

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = stop.clone();
        ctrlc::set_handler(move || {
            log::info!("Interrupt received, stopping after the current read");
            stop.store(true, Ordering::Relaxed);
        })
        .context("Failed to install interrupt handler")?;
    }

    // The port lives only inside this scope and is closed when the collector drops
    let port = open_serial(&cfg)?;
    let mut collector = FrameCollector::new(port);
    runtime::run(&mut collector, &mut sink, &stop)
        .with_context(|| format!("Monitoring {} failed", cfg.device))
}
