//! Users and the shared catalog: ingredients, seasonality, categories, tags.

use crate::domain::{
    CategoryId, HashedPassword, IngredientId, Season, SeasonalityId, TagId, TimeMs, UserId,
};
use serde::Serialize;

/// A registered user. The password hash is never serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    #[serde(skip)]
    pub password_hash: HashedPassword,
    pub created_at: TimeMs,
    pub updated_at: TimeMs,
}

/// Values for a user insert; the password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: HashedPassword,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ingredient {
    pub id: IngredientId,
    pub name: String,
    pub created_at: TimeMs,
    pub updated_at: TimeMs,
}

/// When an ingredient is in season. At most one per ingredient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Seasonality {
    pub id: SeasonalityId,
    pub ingredient_id: IngredientId,
    #[serde(flatten)]
    pub season: Season,
    pub created_at: TimeMs,
    pub updated_at: TimeMs,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub created_at: TimeMs,
    pub updated_at: TimeMs,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
}
