use std::process::ExitCode;

fn main() -> ExitCode {
    cotador_cli::run()
}
