//! Demo data: a user, ingredients and one fully linked recipe.
//!
//! The whole plan is written in a single transaction. Any failed insert rolls
//! the transaction back, so a failed run leaves no rows behind.

use crate::config::PasswordHashConfig;
use crate::db::repo::{catalog, recipes, users};
use crate::db::Repository;
use crate::domain::{
    validate_step_sequence, CategoryId, HashedPassword, IngredientId, InstructionId,
    NewInstruction, NewRecipe, NewUser, Quantity, RecipeId, RecipeIngredient, Season, TagId,
    UserId,
};
use crate::error::AppError;
use serde::Serialize;
use sqlx::sqlite::Sqlite;
use sqlx::Transaction;
use std::collections::{HashMap, HashSet};
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct SeedUser {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// A planned ingredient; `season` holds raw start and end months.
#[derive(Debug, Clone)]
pub struct SeedIngredient {
    pub name: String,
    pub season: Option<(i64, i64)>,
}

#[derive(Debug, Clone)]
pub struct SeedRecipe {
    pub title: String,
    pub description: String,
    pub prep_time_minutes: i64,
    pub cook_time_minutes: i64,
    pub servings: i64,
}

/// One ingredient line, referring to a planned ingredient by name.
#[derive(Debug, Clone)]
pub struct SeedLine {
    pub ingredient: String,
    pub quantity: f64,
    pub unit: String,
}

#[derive(Debug, Clone)]
pub struct SeedPlan {
    pub user: SeedUser,
    pub ingredients: Vec<SeedIngredient>,
    pub recipe: SeedRecipe,
    pub lines: Vec<SeedLine>,
    pub instructions: Vec<NewInstruction>,
    pub categories: Vec<String>,
    pub tags: Vec<String>,
}

/// Ids of everything a seed run created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub user_id: UserId,
    pub ingredient_ids: Vec<IngredientId>,
    pub recipe_id: RecipeId,
    pub instruction_ids: Vec<InstructionId>,
    pub category_ids: Vec<CategoryId>,
    pub tag_ids: Vec<TagId>,
}

impl SeedPlan {
    /// The strawberry spinach salad demo.
    pub fn strawberry_spinach_salad() -> Self {
        let ingredient = |name: &str, season: Option<(i64, i64)>| SeedIngredient {
            name: name.to_string(),
            season,
        };
        let line = |name: &str, quantity: f64, unit: &str| SeedLine {
            ingredient: name.to_string(),
            quantity,
            unit: unit.to_string(),
        };

        SeedPlan {
            user: SeedUser {
                username: "exampleuser".to_string(),
                email: "user@example.com".to_string(),
                password: "password".to_string(),
            },
            ingredients: vec![
                ingredient("Strawberries", Some((5, 7))),
                ingredient("Spinach", Some((10, 4))),
                ingredient("Almonds", None),
                ingredient("Feta Cheese", None),
                ingredient("Balsamic Vinaigrette", None),
            ],
            recipe: SeedRecipe {
                title: "Strawberry Spinach Salad".to_string(),
                description: "A fresh and healthy salad combining strawberries and spinach."
                    .to_string(),
                prep_time_minutes: 15,
                cook_time_minutes: 0,
                servings: 2,
            },
            lines: vec![
                line("Strawberries", 200.0, "grams"),
                line("Spinach", 100.0, "grams"),
                line("Almonds", 50.0, "grams"),
                line("Feta Cheese", 50.0, "grams"),
                line("Balsamic Vinaigrette", 30.0, "ml"),
            ],
            instructions: vec![
                NewInstruction::new(1, "Wash and slice strawberries."),
                NewInstruction::new(2, "Wash spinach and dry it thoroughly."),
                NewInstruction::new(
                    3,
                    "Mix spinach, strawberries, almonds, and feta cheese in a large bowl.",
                ),
                NewInstruction::new(4, "Drizzle balsamic vinaigrette over the salad."),
                NewInstruction::new(5, "Toss the salad gently and serve immediately."),
            ],
            categories: vec!["Salad".to_string()],
            tags: vec!["vegetarian".to_string(), "quick".to_string()],
        }
    }

    /// Reject plans that could only fail halfway through the transaction.
    pub fn validate(&self) -> Result<(), AppError> {
        let invalid = |msg: String| Err(AppError::Validation(msg));

        if self.user.username.trim().is_empty() {
            return invalid("username must not be empty".to_string());
        }
        if !self.user.email.contains('@') {
            return invalid(format!("email {:?} is not an address", self.user.email));
        }
        if self.recipe.title.trim().is_empty() {
            return invalid("recipe title must not be empty".to_string());
        }

        let mut planned = HashSet::new();
        for ingredient in &self.ingredients {
            if ingredient.name.trim().is_empty() {
                return invalid("ingredient name must not be empty".to_string());
            }
            if !planned.insert(ingredient.name.as_str()) {
                return invalid(format!("ingredient {} planned twice", ingredient.name));
            }
            ingredient.parsed_season()?;
        }

        for line in &self.lines {
            line.parsed_quantity()?;
            if !planned.contains(line.ingredient.as_str()) {
                return invalid(format!(
                    "ingredient line refers to unplanned ingredient {}",
                    line.ingredient
                ));
            }
            if line.unit.trim().is_empty() {
                return invalid(format!("unit for {} must not be empty", line.ingredient));
            }
        }

        validate_step_sequence(&self.instructions)
            .map_err(|e| AppError::Validation(e.to_string()))
    }
}

impl SeedIngredient {
    fn parsed_season(&self) -> Result<Option<Season>, AppError> {
        self.season
            .map(|(start, end)| Season::from_numbers(start, end))
            .transpose()
            .map_err(|e| AppError::Validation(format!("season of {}: {}", self.name, e)))
    }
}

impl SeedLine {
    fn parsed_quantity(&self) -> Result<Quantity, AppError> {
        Quantity::new(self.quantity)
            .map_err(|e| AppError::Validation(format!("{}: {}", self.ingredient, e)))
    }
}

/// Tag an insert failure with the step it happened in.
fn at(step: &'static str) -> impl Fn(sqlx::Error) -> AppError {
    move |source| AppError::Seed { step, source }
}

/// Write `plan` in one transaction.
///
/// Validation and password hashing happen before the transaction opens. On
/// any insert failure the transaction is rolled back and the failing step is
/// reported.
pub async fn run(
    repo: &Repository,
    plan: &SeedPlan,
    password_config: &PasswordHashConfig,
) -> Result<SeedReport, AppError> {
    plan.validate()?;
    let password_hash = HashedPassword::hash(&plan.user.password, password_config)?;

    let mut tx = repo.begin().await?;
    match insert_plan(&mut tx, plan, password_hash).await {
        Ok(report) => {
            tx.commit().await?;
            info!(recipe_id = %report.recipe_id, "Recipe created successfully");
            Ok(report)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(error = %rollback_err, "Rollback failed");
            }
            Err(err)
        }
    }
}

async fn insert_plan(
    tx: &mut Transaction<'static, Sqlite>,
    plan: &SeedPlan,
    password_hash: HashedPassword,
) -> Result<SeedReport, AppError> {
    let user_id = users::insert_user(
        &mut **tx,
        &NewUser {
            username: plan.user.username.clone(),
            email: plan.user.email.clone(),
            password_hash,
        },
    )
    .await
    .map_err(at("user"))?;

    let mut ingredient_ids = Vec::with_capacity(plan.ingredients.len());
    let mut by_name = HashMap::new();
    for ingredient in &plan.ingredients {
        let id = catalog::insert_ingredient(&mut **tx, &ingredient.name)
            .await
            .map_err(at("ingredient"))?;
        if let Some(season) = ingredient.parsed_season()? {
            catalog::insert_seasonality(&mut **tx, id, season)
                .await
                .map_err(at("seasonality"))?;
        }
        by_name.insert(ingredient.name.as_str(), id);
        ingredient_ids.push(id);
    }

    let recipe_id = recipes::insert_recipe(
        &mut **tx,
        &NewRecipe {
            user_id,
            title: plan.recipe.title.clone(),
            description: plan.recipe.description.clone(),
            prep_time_minutes: plan.recipe.prep_time_minutes,
            cook_time_minutes: plan.recipe.cook_time_minutes,
            servings: plan.recipe.servings,
        },
    )
    .await
    .map_err(at("recipe"))?;

    for line in &plan.lines {
        let ingredient_id = by_name
            .get(line.ingredient.as_str())
            .copied()
            .ok_or_else(|| AppError::NotFound(format!("ingredient {}", line.ingredient)))?;
        recipes::insert_recipe_ingredient(
            &mut **tx,
            &RecipeIngredient {
                recipe_id,
                ingredient_id,
                quantity: line.parsed_quantity()?,
                unit: line.unit.clone(),
            },
        )
        .await
        .map_err(at("recipe ingredient"))?;
    }

    let mut instruction_ids = Vec::with_capacity(plan.instructions.len());
    for step in &plan.instructions {
        let id = recipes::insert_instruction(&mut **tx, recipe_id, step)
            .await
            .map_err(at("instruction"))?;
        instruction_ids.push(id);
    }

    let mut category_ids = Vec::with_capacity(plan.categories.len());
    for name in &plan.categories {
        let id = catalog::insert_category(&mut **tx, name)
            .await
            .map_err(at("category"))?;
        catalog::attach_category(&mut **tx, recipe_id, id)
            .await
            .map_err(at("recipe category"))?;
        category_ids.push(id);
    }

    let mut tag_ids = Vec::with_capacity(plan.tags.len());
    for name in &plan.tags {
        let id = catalog::insert_tag(&mut **tx, name).await.map_err(at("tag"))?;
        catalog::attach_tag(&mut **tx, recipe_id, id)
            .await
            .map_err(at("recipe tag"))?;
        tag_ids.push(id);
    }

    Ok(SeedReport {
        user_id,
        ingredient_ids,
        recipe_id,
        instruction_ids,
        category_ids,
        tag_ids,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_salad_plan_is_valid() {
        let plan = SeedPlan::strawberry_spinach_salad();
        plan.validate().expect("demo plan must validate");
        assert_eq!(plan.ingredients.len(), 5);
        assert_eq!(plan.lines.len(), 5);
        assert_eq!(plan.instructions.len(), 5);
        assert!(plan.ingredients[1].parsed_season().unwrap().unwrap().wraps());
    }

    #[test]
    fn test_line_for_unplanned_ingredient_rejected() {
        let mut plan = SeedPlan::strawberry_spinach_salad();
        plan.lines[0].ingredient = "Blueberries".to_string();
        assert!(matches!(plan.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_duplicate_planned_ingredient_rejected() {
        let mut plan = SeedPlan::strawberry_spinach_salad();
        plan.ingredients.push(SeedIngredient {
            name: "Spinach".to_string(),
            season: None,
        });
        assert!(matches!(plan.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_non_positive_quantity_rejected() {
        let mut plan = SeedPlan::strawberry_spinach_salad();
        plan.lines[4].quantity = 0.0;
        assert!(matches!(plan.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_out_of_range_season_rejected() {
        let mut plan = SeedPlan::strawberry_spinach_salad();
        plan.ingredients[0].season = Some((0, 13));
        assert!(matches!(plan.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_gap_in_steps_rejected() {
        let mut plan = SeedPlan::strawberry_spinach_salad();
        plan.instructions.remove(2);
        assert!(matches!(plan.validate(), Err(AppError::Validation(_))));
    }
}
