//! Database operations for transaction categories.

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    database_id::CategoryId,
    transaction::{TransactionKind, kind_from_row},
};

/// A label for grouping transactions, e.g. "Groceries", "Rent", "Salary".
///
/// Categories form a tree through `parent_id`; a transaction may only use a
/// category whose kind matches its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    /// The ID of the category.
    pub id: CategoryId,
    /// The display name of the category.
    pub name: String,
    /// Whether the category labels income or expenses.
    pub kind: TransactionKind,
    /// The parent category, if this category is a subcategory.
    pub parent_id: Option<CategoryId>,
    /// Free-text notes about what belongs in the category.
    pub description: String,
}

/// Create a category and return it with its generated ID.
///
/// # Errors
/// Returns [Error::InvalidCategory] if `parent_id` does not refer to a real
/// category, or [Error::SqlError] for any other SQL error.
pub fn create_category(
    name: &str,
    kind: TransactionKind,
    parent_id: Option<CategoryId>,
    description: &str,
    connection: &Connection,
) -> Result<Category, Error> {
    connection
        .execute(
            "INSERT INTO category (name, kind, parent_id, description) VALUES (?1, ?2, ?3, ?4)",
            (name, kind.as_str(), parent_id, description),
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
                },
                _,
            ) => Error::InvalidCategory(parent_id.unwrap_or_default()),
            error => error.into(),
        })?;

    let id = connection.last_insert_rowid();

    Ok(Category {
        id,
        name: name.to_owned(),
        kind,
        parent_id,
        description: description.to_owned(),
    })
}

/// Retrieve a single category by ID.
///
/// # Errors
/// Returns [Error::NotFound] if `id` does not refer to a valid category.
pub fn get_category(id: CategoryId, connection: &Connection) -> Result<Category, Error> {
    connection
        .prepare("SELECT id, name, kind, parent_id, description FROM category WHERE id = :id;")?
        .query_row(&[(":id", &id)], map_category_row)
        .map_err(|error| error.into())
}

/// Retrieve all categories of one kind, ordered alphabetically by name.
///
/// # Errors
/// Returns [Error::SqlError] if the query fails.
pub fn get_categories_by_kind(
    kind: TransactionKind,
    connection: &Connection,
) -> Result<Vec<Category>, Error> {
    connection
        .prepare(
            "SELECT id, name, kind, parent_id, description FROM category
             WHERE kind = :kind ORDER BY name ASC;",
        )?
        .query_map(&[(":kind", kind.as_str())], map_category_row)?
        .map(|maybe_category| maybe_category.map_err(|error| error.into()))
        .collect()
}

/// Look a category up by name and kind.
pub(crate) fn find_category(
    name: &str,
    kind: TransactionKind,
    connection: &Connection,
) -> Result<Option<Category>, Error> {
    let existing = connection
        .prepare(
            "SELECT id, name, kind, parent_id, description FROM category
             WHERE name = :name AND kind = :kind LIMIT 1;",
        )?
        .query_row(
            &[(":name", name), (":kind", kind.as_str())],
            map_category_row,
        );

    match existing {
        Ok(category) => Ok(Some(category)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(error) => Err(error.into()),
    }
}

/// Look a category up by name and kind, creating it when absent.
///
/// This is the primitive the bootstrap routine builds its defaults on; it is
/// idempotent and never creates a second row for the same (name, kind) pair.
pub fn get_or_create_category(
    name: &str,
    kind: TransactionKind,
    connection: &Connection,
) -> Result<Category, Error> {
    match find_category(name, kind, connection)? {
        Some(category) => Ok(category),
        None => create_category(name, kind, None, "", connection),
    }
}

/// Update a category's fields. Returns an error if the category doesn't exist.
///
/// # Errors
/// Returns [Error::UpdateMissingCategory] if `id` does not refer to a real
/// row, or [Error::InvalidCategory] if `parent_id` is not a real category.
pub fn update_category(
    id: CategoryId,
    name: &str,
    kind: TransactionKind,
    parent_id: Option<CategoryId>,
    description: &str,
    connection: &Connection,
) -> Result<Category, Error> {
    let rows_affected = connection
        .execute(
            "UPDATE category SET name = ?1, kind = ?2, parent_id = ?3, description = ?4 WHERE id = ?5",
            (name, kind.as_str(), parent_id, description, id),
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
                },
                _,
            ) => Error::InvalidCategory(parent_id.unwrap_or_default()),
            error => error.into(),
        })?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingCategory);
    }

    get_category(id, connection)
}

/// Delete a category by ID.
///
/// Deletion is protective: a category that still labels transactions, or
/// that still has child categories, cannot be removed.
///
/// # Errors
/// Returns [Error::DeleteMissingCategory] if the category doesn't exist, or
/// [Error::CategoryInUse] if it is still referenced.
pub fn delete_category(id: CategoryId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection
        .execute("DELETE FROM category WHERE id = ?1", [id])
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
                },
                _,
            ) => Error::CategoryInUse,
            error => error.into(),
        })?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingCategory);
    }

    Ok(())
}

/// Initialize the category table and indexes.
pub fn create_category_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS category (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            kind TEXT NOT NULL,
            parent_id INTEGER,
            description TEXT NOT NULL DEFAULT '',
            FOREIGN KEY(parent_id) REFERENCES category(id) ON UPDATE CASCADE ON DELETE RESTRICT
        );

        CREATE INDEX IF NOT EXISTS idx_category_name ON category(name);
        CREATE INDEX IF NOT EXISTS idx_category_kind ON category(kind);",
    )?;

    Ok(())
}

fn map_category_row(row: &Row) -> Result<Category, rusqlite::Error> {
    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
        kind: kind_from_row(row, 2)?,
        parent_id: row.get(3)?,
        description: row.get(4)?,
    })
}
