//! mapsync binary entry point.

fn main() {
    if let Err(err) = mapsync::cli::run() {
        eprintln!("error: {:#}", err);
        std::process::exit(1);
    }
}
