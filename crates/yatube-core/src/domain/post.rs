use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Number of characters shown in a post summary.
pub const SUMMARY_CHARS: usize = 15;

/// Post entity - an authored text entry, optionally grouped and illustrated.
///
/// Posts are ordered newest-first by `pub_date`, which is fixed at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub group_id: Option<Uuid>,
    pub author_id: Uuid,
    /// Storage path of the attached image, e.g. `posts/small.gif`.
    pub image: Option<String>,
}

impl Post {
    /// Create a new post authored by `author_id`.
    pub fn new(author_id: Uuid, text: String, group_id: Option<Uuid>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text,
            pub_date: Utc::now(),
            group_id,
            author_id,
            image: None,
        }
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    /// Apply an edit. Publication date and author never change.
    pub fn edit(&mut self, text: String, group_id: Option<Uuid>, image: Option<String>) {
        self.text = text;
        self.group_id = group_id;
        if image.is_some() {
            self.image = image;
        }
    }

    pub fn is_authored_by(&self, user_id: Uuid) -> bool {
        self.author_id == user_id
    }

    /// Display-only summary: the first [`SUMMARY_CHARS`] characters of the text.
    pub fn summary(&self) -> &str {
        match self.text.char_indices().nth(SUMMARY_CHARS) {
            Some((idx, _)) => &self.text[..idx],
            None => &self.text,
        }
    }
}

impl std::fmt::Display for Post {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.summary())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_truncates_to_fifteen_chars() {
        let post = Post::new(Uuid::new_v4(), "A fairly long post body".to_string(), None);
        assert_eq!(post.summary(), "A fairly long p");
        assert_eq!(post.to_string(), "A fairly long p");
    }

    #[test]
    fn test_summary_counts_characters_not_bytes() {
        let post = Post::new(Uuid::new_v4(), "Тестовый пост с текстом".to_string(), None);
        assert_eq!(post.summary(), "Тестовый пост с");
    }

    #[test]
    fn test_summary_of_short_text_is_whole_text() {
        let post = Post::new(Uuid::new_v4(), "short".to_string(), None);
        assert_eq!(post.summary(), "short");
    }

    #[test]
    fn test_edit_keeps_pub_date_and_image_when_none_given() {
        let mut post = Post::new(Uuid::new_v4(), "before".to_string(), None).with_image("posts/a.gif");
        let pub_date = post.pub_date;
        let group = Uuid::new_v4();

        post.edit("after".to_string(), Some(group), None);

        assert_eq!(post.text, "after");
        assert_eq!(post.group_id, Some(group));
        assert_eq!(post.pub_date, pub_date);
        assert_eq!(post.image.as_deref(), Some("posts/a.gif"));
    }
}
