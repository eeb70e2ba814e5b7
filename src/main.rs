use tracing_subscriber::EnvFilter;

fn main() {
    // Setup logging (set RUST_LOG=info or debug)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("warn".parse().unwrap()))
        .with_writer(std::io::stderr) // keep stdout clean for OK/JSON output
        .init(); // installs the subscriber globally

    std::process::exit(roller485::cli::run());
}
