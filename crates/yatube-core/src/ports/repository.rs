use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Comment, Follow, Group, Post, User};
use crate::error::RepoError;

/// Generic repository trait defining standard CRUD operations.
#[async_trait]
pub trait BaseRepository<T, ID>: Send + Sync {
    /// Find an entity by its unique ID.
    async fn find_by_id(&self, id: ID) -> Result<Option<T>, RepoError>;

    /// Insert a new entity.
    async fn insert(&self, entity: T) -> Result<T, RepoError>;

    /// Overwrite an existing entity.
    async fn update(&self, entity: T) -> Result<T, RepoError>;

    /// Delete an entity by its ID. Missing rows are `RepoError::NotFound`.
    async fn delete(&self, id: ID) -> Result<(), RepoError>;
}

/// User repository. Deleting a user removes their posts, comments and follows.
#[async_trait]
pub trait UserRepository: BaseRepository<User, Uuid> {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError>;

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>, RepoError>;
}

/// Group repository. Deleting a group detaches its posts.
#[async_trait]
pub trait GroupRepository: BaseRepository<Group, Uuid> {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Group>, RepoError>;

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Group>, RepoError>;

    /// All groups ordered by title.
    async fn list(&self) -> Result<Vec<Group>, RepoError>;
}

/// Which posts a list query covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostFilter {
    All,
    Group(Uuid),
    Author(Uuid),
    /// Posts by every author the given user follows.
    FollowedBy(Uuid),
}

/// Post repository. Lists are always newest-first by publication date.
#[async_trait]
pub trait PostRepository: BaseRepository<Post, Uuid> {
    async fn count(&self, filter: &PostFilter) -> Result<u64, RepoError>;

    async fn list(
        &self,
        filter: &PostFilter,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Post>, RepoError>;

    async fn count_by_author(&self, author_id: Uuid) -> Result<u64, RepoError> {
        self.count(&PostFilter::Author(author_id)).await
    }
}

/// Comment repository. Deleting a post detaches its comments.
#[async_trait]
pub trait CommentRepository: BaseRepository<Comment, Uuid> {
    /// Every comment on a post, oldest first.
    async fn find_by_post(&self, post_id: Uuid) -> Result<Vec<Comment>, RepoError>;

    async fn count_by_post(&self, post_id: Uuid) -> Result<u64, RepoError>;
}

/// Follow repository. Uniqueness of a (user, author) pair is kept here, not by the schema.
#[async_trait]
pub trait FollowRepository: BaseRepository<Follow, Uuid> {
    async fn exists(&self, user_id: Uuid, author_id: Uuid) -> Result<bool, RepoError>;

    /// Return the existing relation or insert `follow`. Never creates a duplicate.
    async fn get_or_create(&self, follow: Follow) -> Result<(Follow, bool), RepoError>;

    /// Delete the relation. `RepoError::NotFound` when it does not exist.
    async fn delete_pair(&self, user_id: Uuid, author_id: Uuid) -> Result<(), RepoError>;

    /// Number of authors the user follows.
    async fn count_for_user(&self, user_id: Uuid) -> Result<u64, RepoError>;
}
