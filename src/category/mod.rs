//! Transaction categories, arranged in a parent/child tree.

mod core;
mod hierarchy;

pub use core::{
    Category, create_category, create_category_table, delete_category, get_categories_by_kind,
    get_category, get_or_create_category, update_category,
};
pub(crate) use core::find_category;
pub use hierarchy::{display_path, hierarchy, hierarchy_limited};
