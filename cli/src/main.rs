use clap::Parser;
use presentation::cli::{exit_code, report_error, Cli, CliApp};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    shared::telemetry::init_tracing();
    let cli = Cli::parse();
    let result = match CliApp::from_env() {
        Ok(app) => app.run(cli).await,
        Err(err) => Err(err),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report_error(&err);
            ExitCode::from(exit_code(&err))
        }
    }
}
