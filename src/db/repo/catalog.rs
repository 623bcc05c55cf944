//! Ingredient, seasonality, category and tag operations for the repository.

use crate::domain::{
    Category, CategoryId, Ingredient, IngredientId, Month, RecipeId, Season, Seasonality,
    SeasonalityId, Tag, TagId, TimeMs,
};
use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::Row;

use super::{decode_error, Repository};

fn ingredient_from_row(row: &SqliteRow) -> Ingredient {
    Ingredient {
        id: IngredientId::new(row.get("id")),
        name: row.get("name"),
        created_at: TimeMs::new(row.get("created_at")),
        updated_at: TimeMs::new(row.get("updated_at")),
    }
}

fn seasonality_from_row(row: &SqliteRow) -> Result<Seasonality, sqlx::Error> {
    let start = Month::new(row.get("season_start")).map_err(decode_error)?;
    let end = Month::new(row.get("season_end")).map_err(decode_error)?;
    Ok(Seasonality {
        id: SeasonalityId::new(row.get("id")),
        ingredient_id: IngredientId::new(row.get("ingredient_id")),
        season: Season::new(start, end),
        created_at: TimeMs::new(row.get("created_at")),
        updated_at: TimeMs::new(row.get("updated_at")),
    })
}

fn category_from_row(row: &SqliteRow) -> Category {
    Category {
        id: CategoryId::new(row.get("id")),
        name: row.get("name"),
        created_at: TimeMs::new(row.get("created_at")),
        updated_at: TimeMs::new(row.get("updated_at")),
    }
}

fn tag_from_row(row: &SqliteRow) -> Tag {
    Tag {
        id: TagId::new(row.get("id")),
        name: row.get("name"),
    }
}

// =========================================================================
// Ingredients
// =========================================================================

pub async fn insert_ingredient(
    conn: &mut SqliteConnection,
    name: &str,
) -> Result<IngredientId, sqlx::Error> {
    let now = TimeMs::now();
    let result = sqlx::query(
        "INSERT INTO ingredients (name, created_at, updated_at) VALUES (?, ?, ?)",
    )
    .bind(name)
    .bind(now.as_i64())
    .bind(now.as_i64())
    .execute(&mut *conn)
    .await?;

    Ok(IngredientId::new(result.last_insert_rowid()))
}

pub async fn find_ingredient_by_name(
    conn: &mut SqliteConnection,
    name: &str,
) -> Result<Option<Ingredient>, sqlx::Error> {
    let row = sqlx::query(
        "SELECT id, name, created_at, updated_at FROM ingredients WHERE name = ?",
    )
    .bind(name)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row.as_ref().map(ingredient_from_row))
}

/// Delete an ingredient and its seasonality.
///
/// # Errors
/// Fails with a foreign key violation while any recipe still uses it.
pub async fn delete_ingredient(
    conn: &mut SqliteConnection,
    id: IngredientId,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM ingredients WHERE id = ?")
        .bind(id.as_i64())
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Record the season of an ingredient.
///
/// # Errors
/// Fails with a unique violation if the ingredient already has one.
pub async fn insert_seasonality(
    conn: &mut SqliteConnection,
    ingredient_id: IngredientId,
    season: Season,
) -> Result<SeasonalityId, sqlx::Error> {
    let now = TimeMs::now();
    let result = sqlx::query(
        r#"
        INSERT INTO seasonalities (ingredient_id, season_start, season_end, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(ingredient_id.as_i64())
    .bind(i64::from(season.start))
    .bind(i64::from(season.end))
    .bind(now.as_i64())
    .bind(now.as_i64())
    .execute(&mut *conn)
    .await?;

    Ok(SeasonalityId::new(result.last_insert_rowid()))
}

pub async fn get_seasonality(
    conn: &mut SqliteConnection,
    ingredient_id: IngredientId,
) -> Result<Option<Seasonality>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT id, ingredient_id, season_start, season_end, created_at, updated_at
        FROM seasonalities
        WHERE ingredient_id = ?
        "#,
    )
    .bind(ingredient_id.as_i64())
    .fetch_optional(&mut *conn)
    .await?;
    row.as_ref().map(seasonality_from_row).transpose()
}

// =========================================================================
// Categories and tags
// =========================================================================

pub async fn insert_category(
    conn: &mut SqliteConnection,
    name: &str,
) -> Result<CategoryId, sqlx::Error> {
    let now = TimeMs::now();
    let result = sqlx::query(
        "INSERT INTO categories (name, created_at, updated_at) VALUES (?, ?, ?)",
    )
    .bind(name)
    .bind(now.as_i64())
    .bind(now.as_i64())
    .execute(&mut *conn)
    .await?;

    Ok(CategoryId::new(result.last_insert_rowid()))
}

pub async fn find_category_by_name(
    conn: &mut SqliteConnection,
    name: &str,
) -> Result<Option<Category>, sqlx::Error> {
    let row = sqlx::query("SELECT id, name, created_at, updated_at FROM categories WHERE name = ?")
        .bind(name)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.as_ref().map(category_from_row))
}

pub async fn insert_tag(conn: &mut SqliteConnection, name: &str) -> Result<TagId, sqlx::Error> {
    let result = sqlx::query("INSERT INTO tags (name) VALUES (?)")
        .bind(name)
        .execute(&mut *conn)
        .await?;

    Ok(TagId::new(result.last_insert_rowid()))
}

pub async fn find_tag_by_name(
    conn: &mut SqliteConnection,
    name: &str,
) -> Result<Option<Tag>, sqlx::Error> {
    let row = sqlx::query("SELECT id, name FROM tags WHERE name = ?")
        .bind(name)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.as_ref().map(tag_from_row))
}

pub async fn attach_category(
    conn: &mut SqliteConnection,
    recipe_id: RecipeId,
    category_id: CategoryId,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO recipe_categories (recipe_id, category_id) VALUES (?, ?)")
        .bind(recipe_id.as_i64())
        .bind(category_id.as_i64())
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn attach_tag(
    conn: &mut SqliteConnection,
    recipe_id: RecipeId,
    tag_id: TagId,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO recipe_tags (recipe_id, tag_id) VALUES (?, ?)")
        .bind(recipe_id.as_i64())
        .bind(tag_id.as_i64())
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Categories of a recipe, by name.
pub async fn list_recipe_categories(
    conn: &mut SqliteConnection,
    recipe_id: RecipeId,
) -> Result<Vec<Category>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT c.id, c.name, c.created_at, c.updated_at
        FROM categories c
        JOIN recipe_categories rc ON rc.category_id = c.id
        WHERE rc.recipe_id = ?
        ORDER BY c.name ASC
        "#,
    )
    .bind(recipe_id.as_i64())
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows.iter().map(category_from_row).collect())
}

/// Tags of a recipe, by name.
pub async fn list_recipe_tags(
    conn: &mut SqliteConnection,
    recipe_id: RecipeId,
) -> Result<Vec<Tag>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT t.id, t.name
        FROM tags t
        JOIN recipe_tags rt ON rt.tag_id = t.id
        WHERE rt.recipe_id = ?
        ORDER BY t.name ASC
        "#,
    )
    .bind(recipe_id.as_i64())
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows.iter().map(tag_from_row).collect())
}

impl Repository {
    pub async fn create_ingredient(&self, name: &str) -> Result<IngredientId, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        insert_ingredient(&mut conn, name).await
    }

    pub async fn find_ingredient_by_name(
        &self,
        name: &str,
    ) -> Result<Option<Ingredient>, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        find_ingredient_by_name(&mut conn, name).await
    }

    pub async fn delete_ingredient(&self, id: IngredientId) -> Result<bool, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        delete_ingredient(&mut conn, id).await
    }

    pub async fn set_seasonality(
        &self,
        ingredient_id: IngredientId,
        season: Season,
    ) -> Result<SeasonalityId, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        insert_seasonality(&mut conn, ingredient_id, season).await
    }

    pub async fn get_seasonality(
        &self,
        ingredient_id: IngredientId,
    ) -> Result<Option<Seasonality>, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        get_seasonality(&mut conn, ingredient_id).await
    }

    pub async fn create_category(&self, name: &str) -> Result<CategoryId, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        insert_category(&mut conn, name).await
    }

    pub async fn find_category_by_name(&self, name: &str) -> Result<Option<Category>, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        find_category_by_name(&mut conn, name).await
    }

    pub async fn create_tag(&self, name: &str) -> Result<TagId, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        insert_tag(&mut conn, name).await
    }

    pub async fn find_tag_by_name(&self, name: &str) -> Result<Option<Tag>, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        find_tag_by_name(&mut conn, name).await
    }

    pub async fn attach_category(
        &self,
        recipe_id: RecipeId,
        category_id: CategoryId,
    ) -> Result<(), sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        attach_category(&mut conn, recipe_id, category_id).await
    }

    pub async fn attach_tag(&self, recipe_id: RecipeId, tag_id: TagId) -> Result<(), sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        attach_tag(&mut conn, recipe_id, tag_id).await
    }

    pub async fn list_recipe_categories(
        &self,
        recipe_id: RecipeId,
    ) -> Result<Vec<Category>, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        list_recipe_categories(&mut conn, recipe_id).await
    }

    pub async fn list_recipe_tags(&self, recipe_id: RecipeId) -> Result<Vec<Tag>, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        list_recipe_tags(&mut conn, recipe_id).await
    }
}
