use std::process::ExitCode;

use user_sync::config::{resolve_logging_config, ProcessEnv};
use user_sync::utils::init_logging;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(e) = init_logging(&resolve_logging_config(&ProcessEnv)) {
        eprintln!("warning: {}", e);
    }

    match user_sync::run(&ProcessEnv, &mut std::io::stdout()).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Fatal error: {}", e);
            ExitCode::FAILURE
        }
    }
}
