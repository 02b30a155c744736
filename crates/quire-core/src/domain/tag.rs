use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::slug::slugify;

/// Tag entity - a free-form label attached to posts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
}

impl Tag {
    /// Create a new tag; the slug is derived from the name.
    pub fn new(name: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            slug: slugify(&name),
            name,
        }
    }
}

/// Split a comma-separated tag field into distinct, trimmed names.
///
/// Names are compared case-insensitively; the first spelling wins. Entries
/// that would produce an empty slug are dropped.
pub fn parse_tag_names(input: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for raw in input.split(',') {
        let name = raw.trim();
        if name.is_empty() || slugify(name).is_empty() {
            continue;
        }
        if names.iter().any(|n| n.eq_ignore_ascii_case(name)) {
            continue;
        }
        names.push(name.to_string());
    }
    names
}
