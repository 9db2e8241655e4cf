use std::process::ExitCode;

fn main() -> ExitCode {
    birkbot_cli::run()
}
