use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Follow relation - `user_id` follows `author_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Follow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub author_id: Uuid,
}

impl Follow {
    /// Build a follow relation, or `None` for a self-follow.
    pub fn between(user_id: Uuid, author_id: Uuid) -> Option<Self> {
        if user_id == author_id {
            return None;
        }
        Some(Self {
            id: Uuid::new_v4(),
            user_id,
            author_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_self_follow_is_rejected() {
        let id = Uuid::new_v4();
        assert!(Follow::between(id, id).is_none());
    }

    #[test]
    fn test_follow_between_distinct_users() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let follow = Follow::between(a, b).unwrap();
        assert_eq!(follow.user_id, a);
        assert_eq!(follow.author_id, b);
    }
}
