//! Sequential run: connect, migrate, seed, read back.

use crate::config::{Config, ReadBackMode};
use crate::db::{self, Repository};
use crate::domain::RecipeId;
use crate::error::AppError;
use crate::readback;
use crate::seed::{self, SeedPlan};
use tracing::info;

/// What a run produced.
#[derive(Debug, Default)]
pub struct RunOutcome {
    /// Id of the recipe written by the seed stage, when it ran.
    pub seeded_recipe: Option<RecipeId>,
    /// Rendered read-back text, when requested and a recipe exists.
    pub rendered: Option<String>,
}

/// Process exit status for a successful run.
pub const EXIT_SUCCESS: i32 = 0;
/// Process exit status for any fatal error, configuration included.
pub const EXIT_FAILURE: i32 = 1;

/// Map a run result to the process exit status.
pub fn exit_code<T>(result: &Result<T, AppError>) -> i32 {
    match result {
        Ok(_) => EXIT_SUCCESS,
        Err(_) => EXIT_FAILURE,
    }
}

/// Run every stage in order, stopping at the first failure.
///
/// The pool is closed before returning, whether or not a stage failed.
pub async fn run(config: &Config) -> Result<RunOutcome, AppError> {
    let database = &config.database;
    let db_path = database.database_path();

    let pool = db::connect(&db_path, database.max_connections)
        .await
        .map_err(AppError::Connection)?;

    let repo = Repository::new(pool);
    let result = run_stages(&repo, config).await;
    repo.pool().close().await;
    result
}

async fn run_stages(repo: &Repository, config: &Config) -> Result<RunOutcome, AppError> {
    db::run_migrations(repo.pool())
        .await
        .map_err(AppError::Migration)?;
    info!("Database migration completed successfully");

    let mut outcome = RunOutcome::default();

    if config.seed_demo {
        let report = seed::run(
            repo,
            &SeedPlan::strawberry_spinach_salad(),
            &config.password_hash,
        )
        .await?;
        outcome.seeded_recipe = Some(report.recipe_id);
    } else {
        info!("Seeding disabled");
    }

    let timezone = config.database.timezone;
    outcome.rendered = match config.read_back {
        ReadBackMode::Off => None,
        ReadBackMode::Summary => match readback::first_recipe(repo).await? {
            Some(recipe) => Some(readback::render(&recipe, timezone)?),
            None => None,
        },
        ReadBackMode::Detail => match readback::first_recipe(repo).await? {
            Some(recipe) => {
                let detail = readback::recipe_detail(repo, recipe.id).await?;
                Some(readback::render(&detail, timezone)?)
            }
            None => None,
        },
    };
    if config.read_back != ReadBackMode::Off && outcome.rendered.is_none() {
        info!("No recipe stored, nothing to read back");
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;

    #[test]
    fn test_exit_code_mapping() {
        let ok: Result<RunOutcome, AppError> = Ok(RunOutcome::default());
        assert_eq!(exit_code(&ok), EXIT_SUCCESS);

        let config_err: Result<Config, AppError> = Err(ConfigError::InvalidValue(
            "DB_PORT".to_string(),
            "must be a valid u16".to_string(),
        )
        .into());
        assert_eq!(exit_code(&config_err), EXIT_FAILURE);

        let seed_err: Result<RunOutcome, AppError> = Err(AppError::Seed {
            step: "user",
            source: sqlx::Error::RowNotFound,
        });
        assert_eq!(exit_code(&seed_err), EXIT_FAILURE);
    }
}
