pub mod app;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod logging;
pub mod readback;
pub mod seed;

pub use config::Config;
pub use db::{init_db, Repository};
pub use domain::{
    Category, Ingredient, Instruction, Month, Quantity, Recipe, RecipeIngredient, Season,
    Seasonality, Tag, User,
};
pub use error::AppError;
pub use seed::{SeedPlan, SeedReport};
