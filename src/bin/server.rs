//! Discussion facilitator server binary.
//! Run with: cargo run --bin facilitator-server

use std::process::ExitCode;

use discussion_facilitator::start_facilitator;

fn main() -> ExitCode {
    start_facilitator::run()
}
