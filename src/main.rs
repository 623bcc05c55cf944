use cookbook::app::{self, exit_code};
use cookbook::{config::Config, logging, AppError};
use tracing::instrument::WithSubscriber;
use tracing::{error, info};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let env_file = dotenvy::dotenv();

    // Load configuration
    let config = match Config::from_env().map_err(AppError::from) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(exit_code::<Config>(&Err(e)));
        }
    };

    let handle = logging::dispatch(&config.log);

    let code = async {
        match &env_file {
            Ok(path) => info!(path = %path.display(), "Loaded .env file"),
            Err(e) => info!(error = %e, "No .env file found"),
        }

        let result = app::run(&config).await;
        match &result {
            Ok(outcome) => {
                if let Some(text) = &outcome.rendered {
                    println!("{}", text);
                }
            }
            Err(e) => error!(error = %e, "Fatal error"),
        }
        exit_code(&result)
    }
    .with_subscriber(handle)
    .await;

    std::process::exit(code);
}
