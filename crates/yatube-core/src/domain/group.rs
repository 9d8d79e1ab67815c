use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Group entity - a named category posts may optionally belong to.
///
/// The slug is the public unique key used in URLs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub description: String,
}

impl Group {
    pub const TITLE_MAX_CHARS: usize = 200;
    pub const SLUG_MAX_CHARS: usize = 250;

    pub fn new(title: String, slug: String, description: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            title,
            slug,
            description,
        }
    }
}

impl std::fmt::Display for Group {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.title)
    }
}
