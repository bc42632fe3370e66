//! Walks a category's parent chain.

use std::collections::HashSet;

use rusqlite::Connection;

use crate::{Error, database_id::CategoryId};

use super::core::{Category, get_category};

/// How many ancestors [hierarchy_limited] keeps.
const HIERARCHY_DISPLAY_LIMIT: usize = 3;

/// Get the parent chain of a category, root first, ending at the category
/// itself.
///
/// The chain is built by following `parent_id` links one row at a time. The
/// store does not enforce that the tree is acyclic, so the walk keeps a
/// visited set and fails rather than looping forever.
///
/// # Errors
/// Returns [Error::NotFound] if `category_id` (or a parent link) does not
/// refer to a real category, or [Error::CategoryCycle] if the parent chain
/// loops back on itself.
pub fn hierarchy(category_id: CategoryId, connection: &Connection) -> Result<Vec<Category>, Error> {
    walk_parents(category_id, None, connection)
}

/// Like [hierarchy], but keeps only the category and its nearest ancestors,
/// capped at three entries.
pub fn hierarchy_limited(
    category_id: CategoryId,
    connection: &Connection,
) -> Result<Vec<Category>, Error> {
    walk_parents(category_id, Some(HIERARCHY_DISPLAY_LIMIT), connection)
}

/// Render the full parent chain as `"Parent > Child"`.
pub fn display_path(category_id: CategoryId, connection: &Connection) -> Result<String, Error> {
    let chain = hierarchy(category_id, connection)?;

    let names: Vec<&str> = chain.iter().map(|category| category.name.as_str()).collect();

    Ok(names.join(" > "))
}

fn walk_parents(
    category_id: CategoryId,
    limit: Option<usize>,
    connection: &Connection,
) -> Result<Vec<Category>, Error> {
    let mut chain = Vec::new();
    let mut visited = HashSet::new();
    let mut next = Some(category_id);

    while let Some(id) = next {
        if !visited.insert(id) {
            return Err(Error::CategoryCycle(id));
        }

        let category = get_category(id, connection)?;
        next = category.parent_id;
        chain.push(category);

        if limit.is_some_and(|n| chain.len() == n) {
            break;
        }
    }

    // The walk collects child-to-root; callers want root first.
    chain.reverse();

    Ok(chain)
}
