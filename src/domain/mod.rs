//! Domain types for the recipe catalog.
//!
//! This module provides:
//! - Typed row identifiers and millisecond timestamps
//! - Entity rows for users, recipes, ingredients, categories and tags
//! - `Month`/`Season` with wrap-around seasons
//! - `Quantity` and instruction step validation
//! - Argon2 password hashing

pub mod catalog;
pub mod credential;
pub mod primitives;
pub mod recipe;
pub mod season;

pub use catalog::{Category, Ingredient, NewUser, Seasonality, Tag, User};
pub use credential::{CredentialError, HashedPassword};
pub use primitives::{
    CategoryId, IngredientId, InstructionId, RecipeId, SeasonalityId, TagId, TimeMs, UserId,
};
pub use recipe::{
    validate_step_sequence, IngredientLine, Instruction, InvalidQuantity, NewInstruction,
    NewRecipe, Quantity, Recipe, RecipeIngredient, StepSequenceError,
};
pub use season::{InvalidMonth, Month, Season};
