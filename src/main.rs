use rtutap::{boot, cli};

fn main() {
    boot::init_logging();
    let matches = cli::parse_args();

    let result = if matches.get_flag("list-ports") {
        cli::actions::list_ports(&matches)
    } else {
        cli::actions::run_monitor(&matches).map(|_| ())
    };

    if let Err(err) = result {
        if std::env::var_os(boot::LOG_FILE_ENV).is_some() {
            log::error!("{err:#}");
        }
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}
