//! Read stored recipes back and render them as structured text.

use crate::config::Timezone;
use crate::db::Repository;
use crate::domain::{IngredientLine, Instruction, Recipe, RecipeId, TimeMs};
use crate::error::AppError;
use serde::Serialize;
use serde_json::Value;

/// A recipe with everything hanging off it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecipeDetail {
    #[serde(flatten)]
    pub recipe: Recipe,
    pub ingredients: Vec<IngredientLine>,
    pub instructions: Vec<Instruction>,
    pub categories: Vec<String>,
    pub tags: Vec<String>,
}

/// The first stored recipe, without related rows.
pub async fn first_recipe(repo: &Repository) -> Result<Option<Recipe>, AppError> {
    Ok(repo.first_recipe().await?)
}

/// A recipe with its ingredient lines, ordered instructions, categories and tags.
pub async fn recipe_detail(repo: &Repository, id: RecipeId) -> Result<RecipeDetail, AppError> {
    let recipe = repo
        .get_recipe(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("recipe {}", id)))?;

    let ingredients = repo.list_ingredient_lines(id).await?;
    let instructions = repo.list_instructions(id).await?;
    let categories = repo
        .list_recipe_categories(id)
        .await?
        .into_iter()
        .map(|c| c.name)
        .collect();
    let tags = repo
        .list_recipe_tags(id)
        .await?
        .into_iter()
        .map(|t| t.name)
        .collect();

    Ok(RecipeDetail {
        recipe,
        ingredients,
        instructions,
        categories,
        tags,
    })
}

/// Render `value` as indented JSON.
///
/// `created_at`/`updated_at` fields holding epoch milliseconds are rewritten
/// as RFC 3339 timestamps in `timezone`.
pub fn render<T: Serialize>(value: &T, timezone: Timezone) -> Result<String, AppError> {
    let mut json = serde_json::to_value(value)?;
    localize_timestamps(&mut json, timezone);
    Ok(serde_json::to_string_pretty(&json)?)
}

fn localize_timestamps(value: &mut Value, timezone: Timezone) {
    match value {
        Value::Object(map) => {
            for (key, field) in map.iter_mut() {
                if key == "created_at" || key == "updated_at" {
                    if let Some(ms) = field.as_i64() {
                        if let Some(dt) = TimeMs::new(ms).to_datetime() {
                            *field = Value::String(timezone.rfc3339(dt));
                        }
                    }
                } else {
                    localize_timestamps(field, timezone);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                localize_timestamps(item, timezone);
            }
        }
        _ => {}
    }
}
