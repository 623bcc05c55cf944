//! Recipe, recipe ingredient and instruction operations for the repository.

use crate::domain::{
    validate_step_sequence, IngredientId, IngredientLine, Instruction, InstructionId,
    NewInstruction, NewRecipe, Quantity, Recipe, RecipeId, RecipeIngredient, TimeMs, UserId,
};
use crate::error::AppError;
use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::Row;
use tracing::debug;

use super::{decode_error, Repository};

const RECIPE_COLUMNS: &str = "id, user_id, title, description, prep_time_minutes, \
                              cook_time_minutes, servings, created_at, updated_at";

fn recipe_from_row(row: &SqliteRow) -> Recipe {
    Recipe {
        id: RecipeId::new(row.get("id")),
        user_id: UserId::new(row.get("user_id")),
        title: row.get("title"),
        description: row.get("description"),
        prep_time_minutes: row.get("prep_time_minutes"),
        cook_time_minutes: row.get("cook_time_minutes"),
        servings: row.get("servings"),
        created_at: TimeMs::new(row.get("created_at")),
        updated_at: TimeMs::new(row.get("updated_at")),
    }
}

fn instruction_from_row(row: &SqliteRow) -> Instruction {
    Instruction {
        id: InstructionId::new(row.get("id")),
        recipe_id: RecipeId::new(row.get("recipe_id")),
        step_number: row.get("step_number"),
        description: row.get("description"),
    }
}

// =========================================================================
// Recipes
// =========================================================================

/// Insert a recipe owned by `recipe.user_id`.
///
/// # Errors
/// Fails with a foreign key violation when the user does not exist.
pub async fn insert_recipe(
    conn: &mut SqliteConnection,
    recipe: &NewRecipe,
) -> Result<RecipeId, sqlx::Error> {
    let now = TimeMs::now();
    let result = sqlx::query(
        r#"
        INSERT INTO recipes (
            user_id, title, description, prep_time_minutes, cook_time_minutes,
            servings, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(recipe.user_id.as_i64())
    .bind(&recipe.title)
    .bind(&recipe.description)
    .bind(recipe.prep_time_minutes)
    .bind(recipe.cook_time_minutes)
    .bind(recipe.servings)
    .bind(now.as_i64())
    .bind(now.as_i64())
    .execute(&mut *conn)
    .await?;

    Ok(RecipeId::new(result.last_insert_rowid()))
}

pub async fn get_recipe(
    conn: &mut SqliteConnection,
    id: RecipeId,
) -> Result<Option<Recipe>, sqlx::Error> {
    let row = sqlx::query(&format!("SELECT {} FROM recipes WHERE id = ?", RECIPE_COLUMNS))
        .bind(id.as_i64())
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.as_ref().map(recipe_from_row))
}

/// The first recipe in storage order (lowest id).
pub async fn first_recipe(conn: &mut SqliteConnection) -> Result<Option<Recipe>, sqlx::Error> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM recipes ORDER BY id ASC LIMIT 1",
        RECIPE_COLUMNS
    ))
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row.as_ref().map(recipe_from_row))
}

pub async fn list_recipes_by_user(
    conn: &mut SqliteConnection,
    user_id: UserId,
) -> Result<Vec<Recipe>, sqlx::Error> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM recipes WHERE user_id = ? ORDER BY id ASC",
        RECIPE_COLUMNS
    ))
    .bind(user_id.as_i64())
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows.iter().map(recipe_from_row).collect())
}

/// Delete a recipe along with its instructions and join rows.
pub async fn delete_recipe(conn: &mut SqliteConnection, id: RecipeId) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM recipes WHERE id = ?")
        .bind(id.as_i64())
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

// =========================================================================
// Recipe ingredients
// =========================================================================

/// Link an ingredient to a recipe with a quantity and unit.
///
/// # Errors
/// Fails with a foreign key violation when either side does not exist, or a
/// unique violation when the pair is already linked.
pub async fn insert_recipe_ingredient(
    conn: &mut SqliteConnection,
    line: &RecipeIngredient,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO recipe_ingredients (recipe_id, ingredient_id, quantity, unit)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(line.recipe_id.as_i64())
    .bind(line.ingredient_id.as_i64())
    .bind(line.quantity.value())
    .bind(&line.unit)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Ingredient lines of a recipe joined with ingredient names, by name.
pub async fn list_ingredient_lines(
    conn: &mut SqliteConnection,
    recipe_id: RecipeId,
) -> Result<Vec<IngredientLine>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT ri.ingredient_id, i.name, ri.quantity, ri.unit
        FROM recipe_ingredients ri
        JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE ri.recipe_id = ?
        ORDER BY i.name ASC
        "#,
    )
    .bind(recipe_id.as_i64())
    .fetch_all(&mut *conn)
    .await?;

    rows.iter()
        .map(|row| -> Result<IngredientLine, sqlx::Error> {
            Ok(IngredientLine {
                ingredient_id: IngredientId::new(row.get("ingredient_id")),
                name: row.get("name"),
                quantity: Quantity::new(row.get("quantity")).map_err(decode_error)?,
                unit: row.get("unit"),
            })
        })
        .collect()
}

// =========================================================================
// Instructions
// =========================================================================

/// Insert a single instruction step.
///
/// # Errors
/// Fails with a unique violation when the recipe already has this step number.
pub async fn insert_instruction(
    conn: &mut SqliteConnection,
    recipe_id: RecipeId,
    step: &NewInstruction,
) -> Result<InstructionId, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO instructions (recipe_id, step_number, description) VALUES (?, ?, ?)",
    )
    .bind(recipe_id.as_i64())
    .bind(step.step_number)
    .bind(&step.description)
    .execute(&mut *conn)
    .await?;

    Ok(InstructionId::new(result.last_insert_rowid()))
}

/// Instructions of a recipe ordered by step number.
pub async fn list_instructions(
    conn: &mut SqliteConnection,
    recipe_id: RecipeId,
) -> Result<Vec<Instruction>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT id, recipe_id, step_number, description
        FROM instructions
        WHERE recipe_id = ?
        ORDER BY step_number ASC
        "#,
    )
    .bind(recipe_id.as_i64())
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows.iter().map(instruction_from_row).collect())
}

impl Repository {
    pub async fn create_recipe(&self, recipe: &NewRecipe) -> Result<RecipeId, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        insert_recipe(&mut conn, recipe).await
    }

    pub async fn get_recipe(&self, id: RecipeId) -> Result<Option<Recipe>, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        get_recipe(&mut conn, id).await
    }

    pub async fn first_recipe(&self) -> Result<Option<Recipe>, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        first_recipe(&mut conn).await
    }

    pub async fn list_recipes_by_user(&self, user_id: UserId) -> Result<Vec<Recipe>, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        list_recipes_by_user(&mut conn, user_id).await
    }

    pub async fn delete_recipe(&self, id: RecipeId) -> Result<bool, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        delete_recipe(&mut conn, id).await
    }

    pub async fn add_recipe_ingredient(&self, line: &RecipeIngredient) -> Result<(), sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        insert_recipe_ingredient(&mut conn, line).await
    }

    pub async fn list_ingredient_lines(
        &self,
        recipe_id: RecipeId,
    ) -> Result<Vec<IngredientLine>, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        list_ingredient_lines(&mut conn, recipe_id).await
    }

    /// Insert a recipe's full step list.
    ///
    /// The steps must number exactly `1..=n`; nothing is written otherwise.
    /// All steps are inserted in one transaction.
    pub async fn add_instructions(
        &self,
        recipe_id: RecipeId,
        steps: &[NewInstruction],
    ) -> Result<Vec<InstructionId>, AppError> {
        validate_step_sequence(steps).map_err(|e| AppError::Validation(e.to_string()))?;

        let mut tx = self.pool.begin().await?;
        let mut ids = Vec::with_capacity(steps.len());
        for step in steps {
            ids.push(insert_instruction(&mut *tx, recipe_id, step).await?);
        }
        tx.commit().await?;

        debug!(recipe_id = %recipe_id, steps = ids.len(), "Inserted instructions");
        Ok(ids)
    }

    pub async fn list_instructions(
        &self,
        recipe_id: RecipeId,
    ) -> Result<Vec<Instruction>, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        list_instructions(&mut conn, recipe_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PasswordHashConfig;
    use crate::db::repo::test_support::setup_test_db;
    use crate::db::{constraint_violation, ConstraintViolation};
    use crate::domain::{HashedPassword, NewUser};

    async fn owner(repo: &Repository) -> UserId {
        let config = PasswordHashConfig {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        };
        repo.create_user(&NewUser {
            username: "cook".to_string(),
            email: "cook@example.com".to_string(),
            password_hash: HashedPassword::hash("secret", &config).unwrap(),
        })
        .await
        .unwrap()
    }

    fn new_recipe(user_id: UserId, title: &str) -> NewRecipe {
        NewRecipe {
            user_id,
            title: title.to_string(),
            description: String::new(),
            prep_time_minutes: 5,
            cook_time_minutes: 0,
            servings: 1,
        }
    }

    #[tokio::test]
    async fn test_first_recipe_is_lowest_id() {
        let (repo, _temp) = setup_test_db().await;
        let user = owner(&repo).await;

        assert!(repo.first_recipe().await.unwrap().is_none());

        let first = repo.create_recipe(&new_recipe(user, "Soup")).await.unwrap();
        repo.create_recipe(&new_recipe(user, "Stew")).await.unwrap();

        let recipe = repo.first_recipe().await.unwrap().unwrap();
        assert_eq!(recipe.id, first);
        assert_eq!(recipe.title, "Soup");
        assert_eq!(repo.list_recipes_by_user(user).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_recipe_requires_existing_user() {
        let (repo, _temp) = setup_test_db().await;

        let err = repo
            .create_recipe(&new_recipe(UserId::new(404), "Orphan"))
            .await
            .expect_err("orphan recipe accepted");
        assert_eq!(
            constraint_violation(&err),
            Some(ConstraintViolation::ForeignKey)
        );
    }

    #[tokio::test]
    async fn test_instructions_listed_in_step_order() {
        let (repo, _temp) = setup_test_db().await;
        let user = owner(&repo).await;
        let recipe = repo.create_recipe(&new_recipe(user, "Toast")).await.unwrap();

        repo.add_instructions(
            recipe,
            &[
                NewInstruction::new(2, "Toast the bread."),
                NewInstruction::new(1, "Slice the bread."),
                NewInstruction::new(3, "Butter it."),
            ],
        )
        .await
        .unwrap();

        let steps: Vec<i64> = repo
            .list_instructions(recipe)
            .await
            .unwrap()
            .iter()
            .map(|i| i.step_number)
            .collect();
        assert_eq!(steps, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_non_contiguous_steps_write_nothing() {
        let (repo, _temp) = setup_test_db().await;
        let user = owner(&repo).await;
        let recipe = repo.create_recipe(&new_recipe(user, "Toast")).await.unwrap();

        let result = repo
            .add_instructions(
                recipe,
                &[
                    NewInstruction::new(1, "Slice."),
                    NewInstruction::new(3, "Butter."),
                ],
            )
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
        assert!(repo.list_instructions(recipe).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_step_number_rejected_by_storage() {
        let (repo, _temp) = setup_test_db().await;
        let user = owner(&repo).await;
        let recipe = repo.create_recipe(&new_recipe(user, "Toast")).await.unwrap();

        let mut conn = repo.pool().acquire().await.unwrap();
        insert_instruction(&mut conn, recipe, &NewInstruction::new(1, "Slice."))
            .await
            .unwrap();
        let err = insert_instruction(&mut conn, recipe, &NewInstruction::new(1, "Again."))
            .await
            .expect_err("duplicate step accepted");
        assert_eq!(constraint_violation(&err), Some(ConstraintViolation::Unique));
    }

    #[tokio::test]
    async fn test_ingredient_lines_join_names() {
        let (repo, _temp) = setup_test_db().await;
        let user = owner(&repo).await;
        let recipe = repo.create_recipe(&new_recipe(user, "Toast")).await.unwrap();
        let butter = repo.create_ingredient("Butter").await.unwrap();

        repo.add_recipe_ingredient(&RecipeIngredient {
            recipe_id: recipe,
            ingredient_id: butter,
            quantity: Quantity::new(10.0).unwrap(),
            unit: "grams".to_string(),
        })
        .await
        .unwrap();

        let lines = repo.list_ingredient_lines(recipe).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].name, "Butter");
        assert_eq!(lines[0].quantity.value(), 10.0);
        assert_eq!(lines[0].unit, "grams");
    }

    #[tokio::test]
    async fn test_deleting_recipe_cascades_to_instructions() {
        let (repo, _temp) = setup_test_db().await;
        let user = owner(&repo).await;
        let recipe = repo.create_recipe(&new_recipe(user, "Toast")).await.unwrap();
        repo.add_instructions(recipe, &[NewInstruction::new(1, "Slice.")])
            .await
            .unwrap();

        assert!(repo.delete_recipe(recipe).await.unwrap());
        assert!(repo.list_instructions(recipe).await.unwrap().is_empty());
        assert!(repo.get_recipe(recipe).await.unwrap().is_none());
    }
}
