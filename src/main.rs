//! # Cube World Demo
//!
//! Streams the world around a walking observer without a window and logs
//! what is loaded.
//!
//! ## Usage
//!
//! ```bash
//! RUST_LOG=info cargo run --release -- [config.json] [steps]
//! ```

use std::{env, path::PathBuf, process::ExitCode};

const DEFAULT_STEPS: usize = 40;

fn main() -> ExitCode {
    let mut args = env::args().skip(1);
    let config_path = args.next().map(PathBuf::from);
    let steps = args
        .next()
        .and_then(|steps| steps.parse().ok())
        .unwrap_or(DEFAULT_STEPS);

    match cube_world::run(config_path.as_deref(), steps) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{}", err);
            eprintln!("{}", err);
            ExitCode::FAILURE
        }
    }
}
