//! Recipes, their ingredient lines and ordered instructions.

use crate::domain::{IngredientId, InstructionId, RecipeId, TimeMs, UserId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recipe {
    pub id: RecipeId,
    pub user_id: UserId,
    pub title: String,
    pub description: String,
    pub prep_time_minutes: i64,
    pub cook_time_minutes: i64,
    pub servings: i64,
    pub created_at: TimeMs,
    pub updated_at: TimeMs,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecipe {
    pub user_id: UserId,
    pub title: String,
    pub description: String,
    pub prep_time_minutes: i64,
    pub cook_time_minutes: i64,
    pub servings: i64,
}

#[derive(Debug, Error, PartialEq)]
#[error("quantity must be a positive finite number, got {0}")]
pub struct InvalidQuantity(pub f64);

/// Amount of an ingredient used by a recipe. Always finite and > 0.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Quantity(f64);

impl Quantity {
    pub fn new(value: f64) -> Result<Self, InvalidQuantity> {
        if value.is_finite() && value > 0.0 {
            Ok(Quantity(value))
        } else {
            Err(InvalidQuantity(value))
        }
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for Quantity {
    type Error = InvalidQuantity;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Quantity::new(value)
    }
}

impl From<Quantity> for f64 {
    fn from(quantity: Quantity) -> Self {
        quantity.0
    }
}

/// Join row between a recipe and an ingredient.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecipeIngredient {
    pub recipe_id: RecipeId,
    pub ingredient_id: IngredientId,
    pub quantity: Quantity,
    pub unit: String,
}

/// A recipe ingredient joined with the ingredient's name, for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngredientLine {
    pub ingredient_id: IngredientId,
    pub name: String,
    pub quantity: Quantity,
    pub unit: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Instruction {
    pub id: InstructionId,
    pub recipe_id: RecipeId,
    pub step_number: i64,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInstruction {
    pub step_number: i64,
    pub description: String,
}

impl NewInstruction {
    pub fn new(step_number: i64, description: impl Into<String>) -> Self {
        NewInstruction {
            step_number,
            description: description.into(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StepSequenceError {
    #[error("step {0} appears more than once")]
    Duplicate(i64),
    #[error("expected step {expected}, found {found}")]
    Gap { expected: i64, found: i64 },
    #[error("step {0} has an empty description")]
    EmptyDescription(i64),
}

/// Check that step numbers form exactly `1..=n` with non-empty text.
///
/// Input order does not matter; the sorted numbers must be contiguous.
pub fn validate_step_sequence(steps: &[NewInstruction]) -> Result<(), StepSequenceError> {
    if let Some(step) = steps.iter().find(|s| s.description.trim().is_empty()) {
        return Err(StepSequenceError::EmptyDescription(step.step_number));
    }

    let mut numbers: Vec<i64> = steps.iter().map(|s| s.step_number).collect();
    numbers.sort_unstable();

    for (index, &found) in numbers.iter().enumerate() {
        let expected = index as i64 + 1;
        if index > 0 && numbers[index - 1] == found {
            return Err(StepSequenceError::Duplicate(found));
        }
        if found != expected {
            return Err(StepSequenceError::Gap { expected, found });
        }
    }

    Ok(())
}
