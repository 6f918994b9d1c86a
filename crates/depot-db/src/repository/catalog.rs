//! # Catalog Repository
//!
//! Items, locations, categories and users.
//!
//! The ledger never mutates these rows; it only resolves references to
//! them. Creation lives here so the seed binary, the CLI and tests can set
//! up data with the same validation rules.
//!
//! ## Category Reconciliation
//! ```text
//! NewItem { category_id: Some(id), .. }
//!      │
//!      ├── category exists?  no  → NotFound
//!      └── yes → items.category_id = id, items.category = category.name
//!
//! NewItem { category_id: None, category: Some(label), .. }
//!      │
//!      ├── category named `label` exists → link its id
//!      └── otherwise → keep the free-text label only
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult, LedgerError, LedgerResult};
use depot_core::validation::{
    validate_code, validate_min_stock, validate_name, validate_optional_text,
};
use depot_core::{
    Category, CoreError, Item, ItemRef, Location, LocationRef, NewCategory, NewItem, NewLocation,
    NewUser, User, ValidationError, DEFAULT_UNIT,
};

const ITEM_COLUMNS: &str = "id, code, name, category, category_id, unit, min_stock, \
                            brand, model, spec, description, created_at";

/// Repository for catalog entities.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

impl CatalogRepository {
    /// Creates a new CatalogRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CatalogRepository { pool }
    }

    // -------------------------------------------------------------------------
    // Categories
    // -------------------------------------------------------------------------

    /// Creates a category.
    ///
    /// ## Returns
    /// * `Err(Rejected(Validation::Duplicate))` - name already taken
    /// * `Err(Rejected(NotFound))` - `parent_id` does not exist
    pub async fn create_category(&self, input: &NewCategory) -> LedgerResult<Category> {
        validate_name("category name", &input.name)?;
        validate_optional_text("description", input.description.as_deref())?;

        if let Some(parent_id) = &input.parent_id {
            if self.get_category(parent_id).await?.is_none() {
                return Err(CoreError::not_found("Category", parent_id.clone()).into());
            }
        }

        let category = Category {
            id: Uuid::new_v4().to_string(),
            name: input.name.trim().to_string(),
            parent_id: input.parent_id.clone(),
            description: input.description.clone(),
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO categories (id, name, parent_id, description, created_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&category.id)
        .bind(&category.name)
        .bind(&category.parent_id)
        .bind(&category.description)
        .bind(category.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| duplicate_as_rejection(e, "category name", &category.name))?;

        info!(id = %category.id, name = %category.name, "Category created");
        Ok(category)
    }

    /// Gets a category by id.
    pub async fn get_category(&self, id: &str) -> DbResult<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(
            "SELECT id, name, parent_id, description, created_at FROM categories WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(category)
    }

    /// Gets a category by its (unique) name.
    pub async fn get_category_by_name(&self, name: &str) -> DbResult<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(
            "SELECT id, name, parent_id, description, created_at FROM categories WHERE name = ?",
        )
        .bind(name.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(category)
    }

    /// Lists all categories, flat, ordered by name.
    pub async fn list_categories(&self) -> DbResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT id, name, parent_id, description, created_at FROM categories ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }

    // -------------------------------------------------------------------------
    // Items
    // -------------------------------------------------------------------------

    /// Creates an item.
    ///
    /// ## Arguments
    /// * `input` - Item fields; `unit` defaults to `DEFAULT_UNIT`, `min_stock` to 0
    ///
    /// ## Returns
    /// * `Err(Rejected(Validation))` - bad code/name/min_stock or duplicate code
    /// * `Err(Rejected(NotFound))` - `category_id` does not exist
    pub async fn create_item(&self, input: &NewItem) -> LedgerResult<Item> {
        validate_code("item code", &input.code)?;
        validate_name("item name", &input.name)?;
        let min_stock = input.min_stock.unwrap_or(0);
        validate_min_stock(min_stock)?;
        validate_optional_text("description", input.description.as_deref())?;

        let (category, category_id) = self
            .reconcile_category(input.category.as_deref(), input.category_id.as_deref())
            .await?;

        let unit = input
            .unit
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .unwrap_or(DEFAULT_UNIT)
            .to_string();

        let item = Item {
            id: Uuid::new_v4().to_string(),
            code: input.code.trim().to_string(),
            name: input.name.trim().to_string(),
            category,
            category_id,
            unit,
            min_stock,
            brand: input.brand.clone(),
            model: input.model.clone(),
            spec: input.spec.clone(),
            description: input.description.clone(),
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO items (
                id, code, name, category, category_id, unit, min_stock,
                brand, model, spec, description, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&item.id)
        .bind(&item.code)
        .bind(&item.name)
        .bind(&item.category)
        .bind(&item.category_id)
        .bind(&item.unit)
        .bind(item.min_stock)
        .bind(&item.brand)
        .bind(&item.model)
        .bind(&item.spec)
        .bind(&item.description)
        .bind(item.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| duplicate_as_rejection(e, "item code", &item.code))?;

        info!(id = %item.id, code = %item.code, "Item created");
        Ok(item)
    }

    async fn reconcile_category(
        &self,
        label: Option<&str>,
        category_id: Option<&str>,
    ) -> LedgerResult<(Option<String>, Option<String>)> {
        if let Some(id) = category_id {
            let category = self
                .get_category(id)
                .await?
                .ok_or_else(|| CoreError::not_found("Category", id))?;
            return Ok((Some(category.name), Some(category.id)));
        }

        match label.map(str::trim).filter(|l| !l.is_empty()) {
            Some(label) => {
                let linked = self.get_category_by_name(label).await?.map(|c| c.id);
                Ok((Some(label.to_string()), linked))
            }
            None => Ok((None, None)),
        }
    }

    /// Gets an item by its ID.
    pub async fn get_item(&self, id: &str) -> DbResult<Option<Item>> {
        let item = sqlx::query_as::<_, Item>(&format!(
            "SELECT {} FROM items WHERE id = ?",
            ITEM_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(item)
    }

    /// Gets an item by its scannable code.
    pub async fn get_item_by_code(&self, code: &str) -> DbResult<Option<Item>> {
        let item = sqlx::query_as::<_, Item>(&format!(
            "SELECT {} FROM items WHERE code = ?",
            ITEM_COLUMNS
        ))
        .bind(code.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(item)
    }

    /// Lists all items ordered by code.
    pub async fn list_items(&self) -> DbResult<Vec<Item>> {
        let items = sqlx::query_as::<_, Item>(&format!(
            "SELECT {} FROM items ORDER BY code",
            ITEM_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Resolves an item reference.
    ///
    /// ## Returns
    /// * `Err(Rejected(NotFound))` - no item with that id / code
    pub async fn resolve_item(&self, item: &ItemRef) -> LedgerResult<Item> {
        let found = match item {
            ItemRef::Id(id) => self.get_item(id).await?,
            ItemRef::Code(code) => self.get_item_by_code(code).await?,
        };

        debug!(reference = %item, found = found.is_some(), "Resolved item");
        found.ok_or_else(|| CoreError::not_found("Item", item.to_string()).into())
    }

    // -------------------------------------------------------------------------
    // Locations
    // -------------------------------------------------------------------------

    /// Creates a location.
    pub async fn create_location(&self, input: &NewLocation) -> LedgerResult<Location> {
        validate_code("location code", &input.code)?;
        validate_name("location name", &input.name)?;
        validate_optional_text("description", input.description.as_deref())?;

        let location = Location {
            id: Uuid::new_v4().to_string(),
            code: input.code.trim().to_string(),
            name: input.name.trim().to_string(),
            area: input.area.clone(),
            description: input.description.clone(),
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO locations (id, code, name, area, description, created_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&location.id)
        .bind(&location.code)
        .bind(&location.name)
        .bind(&location.area)
        .bind(&location.description)
        .bind(location.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| duplicate_as_rejection(e, "location code", &location.code))?;

        info!(id = %location.id, code = %location.code, "Location created");
        Ok(location)
    }

    /// Gets a location by its ID.
    pub async fn get_location(&self, id: &str) -> DbResult<Option<Location>> {
        let location = sqlx::query_as::<_, Location>(
            "SELECT id, code, name, area, description, created_at FROM locations WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(location)
    }

    /// Gets a location by its scannable code.
    pub async fn get_location_by_code(&self, code: &str) -> DbResult<Option<Location>> {
        let location = sqlx::query_as::<_, Location>(
            "SELECT id, code, name, area, description, created_at FROM locations WHERE code = ?",
        )
        .bind(code.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(location)
    }

    /// Lists all locations ordered by code.
    pub async fn list_locations(&self) -> DbResult<Vec<Location>> {
        let locations = sqlx::query_as::<_, Location>(
            "SELECT id, code, name, area, description, created_at FROM locations ORDER BY code",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(locations)
    }

    /// Resolves a location reference.
    pub async fn resolve_location(&self, location: &LocationRef) -> LedgerResult<Location> {
        let found = match location {
            LocationRef::Id(id) => self.get_location(id).await?,
            LocationRef::Code(code) => self.get_location_by_code(code).await?,
        };

        debug!(reference = %location, found = found.is_some(), "Resolved location");
        found.ok_or_else(|| CoreError::not_found("Location", location.to_string()).into())
    }

    // -------------------------------------------------------------------------
    // Users
    // -------------------------------------------------------------------------

    /// Creates a user. `role` defaults to `"user"`.
    pub async fn create_user(&self, input: &NewUser) -> LedgerResult<User> {
        validate_code("username", &input.username)?;
        validate_name("user name", &input.name)?;

        let user = User {
            id: Uuid::new_v4().to_string(),
            username: input.username.trim().to_string(),
            name: input.name.trim().to_string(),
            role: input
                .role
                .clone()
                .filter(|r| !r.trim().is_empty())
                .unwrap_or_else(|| "user".to_string()),
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO users (id, username, name, role, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.name)
        .bind(&user.role)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| duplicate_as_rejection(e, "username", &user.username))?;

        info!(id = %user.id, username = %user.username, "User created");
        Ok(user)
    }

    /// Gets a user by ID.
    pub async fn get_user(&self, id: &str) -> DbResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, name, role, created_at FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Gets a user by username.
    pub async fn get_user_by_username(&self, username: &str) -> DbResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, name, role, created_at FROM users WHERE username = ?",
        )
        .bind(username.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Lists all users ordered by username.
    pub async fn list_users(&self) -> DbResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            "SELECT id, username, name, role, created_at FROM users ORDER BY username",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    /// Counts items, for seed and diagnostics.
    pub async fn count_items(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM items")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

/// Maps a unique violation to a `Duplicate` rejection; anything else stays a store error.
fn duplicate_as_rejection(
    err: sqlx::Error,
    field: &str,
    value: &str,
) -> LedgerError {
    match DbError::from(err) {
        DbError::UniqueViolation { .. } => ValidationError::Duplicate {
            field: field.to_string(),
            value: value.to_string(),
        }
        .into(),
        other => other.into(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
