//! EmbedHub server binary.
//! Run with: cargo run --bin embedhub-server

use std::process::ExitCode;

use embedhub::start_embedhub;

fn main() -> ExitCode {
    start_embedhub::run()
}
