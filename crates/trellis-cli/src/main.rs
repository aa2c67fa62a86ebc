#![forbid(unsafe_code)]

fn main() {
    trellis_cli::init_tracing();
    if let Err(error) = trellis_cli::run_from_env() {
        eprintln!("{error}");
        std::process::exit(error.exit_code());
    }
}
