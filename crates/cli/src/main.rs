use std::process::ExitCode;

fn main() -> ExitCode {
    facturador_cli::run()
}
