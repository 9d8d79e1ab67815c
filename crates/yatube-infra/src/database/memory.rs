//! In-memory entity store - used when no database is configured, and in tests.
//!
//! Reproduces the relational rules the PostgreSQL schema enforces: unique
//! usernames and slugs, foreign-key checks on insert, SET NULL when a group or
//! post is deleted, CASCADE when a user is deleted.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use yatube_core::domain::{Comment, Follow, Group, Post, User};
use yatube_core::error::RepoError;
use yatube_core::ports::{
    BaseRepository, CommentRepository, FollowRepository, GroupRepository, PostFilter,
    PostRepository, UserRepository,
};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    groups: Vec<Group>,
    posts: Vec<Post>,
    comments: Vec<Comment>,
    follows: Vec<Follow>,
}

impl Tables {
    fn has_user(&self, id: Uuid) -> bool {
        self.users.iter().any(|u| u.id == id)
    }

    fn has_group(&self, id: Uuid) -> bool {
        self.groups.iter().any(|g| g.id == id)
    }

    fn has_post(&self, id: Uuid) -> bool {
        self.posts.iter().any(|p| p.id == id)
    }

    fn matches(&self, post: &Post, filter: &PostFilter) -> bool {
        match *filter {
            PostFilter::All => true,
            PostFilter::Group(group_id) => post.group_id == Some(group_id),
            PostFilter::Author(author_id) => post.author_id == author_id,
            PostFilter::FollowedBy(user_id) => self
                .follows
                .iter()
                .any(|f| f.user_id == user_id && f.author_id == post.author_id),
        }
    }

    /// Posts matching `filter`, newest first. Equal timestamps keep the later insert first.
    fn ordered_posts(&self, filter: &PostFilter) -> Vec<&Post> {
        let mut posts: Vec<&Post> = self
            .posts
            .iter()
            .rev()
            .filter(|p| self.matches(p, filter))
            .collect();
        posts.sort_by(|a, b| b.pub_date.cmp(&a.pub_date));
        posts
    }

    fn delete_user(&mut self, id: Uuid) {
        let removed_posts: Vec<Uuid> = self
            .posts
            .iter()
            .filter(|p| p.author_id == id)
            .map(|p| p.id)
            .collect();
        self.posts.retain(|p| p.author_id != id);
        self.comments.retain(|c| c.author_id != id);
        self.detach_comments(&removed_posts);
        self.follows.retain(|f| f.user_id != id && f.author_id != id);
    }

    fn detach_comments(&mut self, post_ids: &[Uuid]) {
        for comment in &mut self.comments {
            if comment.post_id.is_some_and(|p| post_ids.contains(&p)) {
                comment.post_id = None;
            }
        }
    }
}

fn violation(what: &str) -> RepoError {
    RepoError::Constraint(format!("{what} violates a foreign key"))
}

fn replace<T>(rows: &mut [T], id_of: impl Fn(&T) -> Uuid, entity: T) -> Result<T, RepoError>
where
    T: Clone,
{
    let id = id_of(&entity);
    let slot = rows
        .iter_mut()
        .find(|row| id_of(row) == id)
        .ok_or(RepoError::NotFound)?;
    *slot = entity.clone();
    Ok(entity)
}

/// Shared in-memory tables. Cloning shares the same data.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn users(&self) -> InMemoryUserRepository {
        InMemoryUserRepository {
            tables: self.tables.clone(),
        }
    }

    pub fn groups(&self) -> InMemoryGroupRepository {
        InMemoryGroupRepository {
            tables: self.tables.clone(),
        }
    }

    pub fn posts(&self) -> InMemoryPostRepository {
        InMemoryPostRepository {
            tables: self.tables.clone(),
        }
    }

    pub fn comments(&self) -> InMemoryCommentRepository {
        InMemoryCommentRepository {
            tables: self.tables.clone(),
        }
    }

    pub fn follows(&self) -> InMemoryFollowRepository {
        InMemoryFollowRepository {
            tables: self.tables.clone(),
        }
    }
}

pub struct InMemoryUserRepository {
    tables: Arc<RwLock<Tables>>,
}

#[async_trait]
impl BaseRepository<User, Uuid> for InMemoryUserRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn insert(&self, user: User) -> Result<User, RepoError> {
        let mut tables = self.tables.write().await;
        if tables
            .users
            .iter()
            .any(|u| u.id == user.id || u.username == user.username)
        {
            return Err(RepoError::Constraint("Entity already exists".to_string()));
        }
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn update(&self, user: User) -> Result<User, RepoError> {
        let mut tables = self.tables.write().await;
        if tables
            .users
            .iter()
            .any(|u| u.id != user.id && u.username == user.username)
        {
            return Err(RepoError::Constraint("Entity already exists".to_string()));
        }
        replace(&mut tables.users, |u| u.id, user)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let mut tables = self.tables.write().await;
        if !tables.has_user(id) {
            return Err(RepoError::NotFound);
        }
        tables.users.retain(|u| u.id != id);
        tables.delete_user(id);
        Ok(())
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.username == username).cloned())
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .filter(|u| ids.contains(&u.id))
            .cloned()
            .collect())
    }
}

pub struct InMemoryGroupRepository {
    tables: Arc<RwLock<Tables>>,
}

#[async_trait]
impl BaseRepository<Group, Uuid> for InMemoryGroupRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Group>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.groups.iter().find(|g| g.id == id).cloned())
    }

    async fn insert(&self, group: Group) -> Result<Group, RepoError> {
        let mut tables = self.tables.write().await;
        if tables
            .groups
            .iter()
            .any(|g| g.id == group.id || g.slug == group.slug)
        {
            return Err(RepoError::Constraint("Entity already exists".to_string()));
        }
        tables.groups.push(group.clone());
        Ok(group)
    }

    async fn update(&self, group: Group) -> Result<Group, RepoError> {
        let mut tables = self.tables.write().await;
        if tables
            .groups
            .iter()
            .any(|g| g.id != group.id && g.slug == group.slug)
        {
            return Err(RepoError::Constraint("Entity already exists".to_string()));
        }
        replace(&mut tables.groups, |g| g.id, group)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let mut tables = self.tables.write().await;
        if !tables.has_group(id) {
            return Err(RepoError::NotFound);
        }
        tables.groups.retain(|g| g.id != id);
        for post in &mut tables.posts {
            if post.group_id == Some(id) {
                post.group_id = None;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl GroupRepository for InMemoryGroupRepository {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Group>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.groups.iter().find(|g| g.slug == slug).cloned())
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Group>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables
            .groups
            .iter()
            .filter(|g| ids.contains(&g.id))
            .cloned()
            .collect())
    }

    async fn list(&self) -> Result<Vec<Group>, RepoError> {
        let tables = self.tables.read().await;
        let mut groups = tables.groups.clone();
        groups.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(groups)
    }
}

pub struct InMemoryPostRepository {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryPostRepository {
    fn check_references(tables: &Tables, post: &Post) -> Result<(), RepoError> {
        if !tables.has_user(post.author_id) {
            return Err(violation("posts.author_id"));
        }
        if post.group_id.is_some_and(|g| !tables.has_group(g)) {
            return Err(violation("posts.group_id"));
        }
        Ok(())
    }
}

#[async_trait]
impl BaseRepository<Post, Uuid> for InMemoryPostRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.posts.iter().find(|p| p.id == id).cloned())
    }

    async fn insert(&self, post: Post) -> Result<Post, RepoError> {
        let mut tables = self.tables.write().await;
        if tables.has_post(post.id) {
            return Err(RepoError::Constraint("Entity already exists".to_string()));
        }
        Self::check_references(&tables, &post)?;
        tables.posts.push(post.clone());
        Ok(post)
    }

    async fn update(&self, post: Post) -> Result<Post, RepoError> {
        let mut tables = self.tables.write().await;
        Self::check_references(&tables, &post)?;
        replace(&mut tables.posts, |p| p.id, post)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let mut tables = self.tables.write().await;
        if !tables.has_post(id) {
            return Err(RepoError::NotFound);
        }
        tables.posts.retain(|p| p.id != id);
        tables.detach_comments(&[id]);
        Ok(())
    }
}

#[async_trait]
impl PostRepository for InMemoryPostRepository {
    async fn count(&self, filter: &PostFilter) -> Result<u64, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.posts.iter().filter(|p| tables.matches(p, filter)).count() as u64)
    }

    async fn list(
        &self,
        filter: &PostFilter,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Post>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables
            .ordered_posts(filter)
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

pub struct InMemoryCommentRepository {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryCommentRepository {
    fn check_references(tables: &Tables, comment: &Comment) -> Result<(), RepoError> {
        if !tables.has_user(comment.author_id) {
            return Err(violation("comments.author_id"));
        }
        if comment.post_id.is_some_and(|p| !tables.has_post(p)) {
            return Err(violation("comments.post_id"));
        }
        Ok(())
    }
}

#[async_trait]
impl BaseRepository<Comment, Uuid> for InMemoryCommentRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Comment>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.comments.iter().find(|c| c.id == id).cloned())
    }

    async fn insert(&self, comment: Comment) -> Result<Comment, RepoError> {
        let mut tables = self.tables.write().await;
        if tables.comments.iter().any(|c| c.id == comment.id) {
            return Err(RepoError::Constraint("Entity already exists".to_string()));
        }
        Self::check_references(&tables, &comment)?;
        tables.comments.push(comment.clone());
        Ok(comment)
    }

    async fn update(&self, comment: Comment) -> Result<Comment, RepoError> {
        let mut tables = self.tables.write().await;
        Self::check_references(&tables, &comment)?;
        replace(&mut tables.comments, |c| c.id, comment)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let mut tables = self.tables.write().await;
        let before = tables.comments.len();
        tables.comments.retain(|c| c.id != id);
        if tables.comments.len() == before {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl CommentRepository for InMemoryCommentRepository {
    async fn find_by_post(&self, post_id: Uuid) -> Result<Vec<Comment>, RepoError> {
        let tables = self.tables.read().await;
        let mut comments: Vec<Comment> = tables
            .comments
            .iter()
            .filter(|c| c.post_id == Some(post_id))
            .cloned()
            .collect();
        comments.sort_by(|a, b| a.created.cmp(&b.created));
        Ok(comments)
    }

    async fn count_by_post(&self, post_id: Uuid) -> Result<u64, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables
            .comments
            .iter()
            .filter(|c| c.post_id == Some(post_id))
            .count() as u64)
    }
}

pub struct InMemoryFollowRepository {
    tables: Arc<RwLock<Tables>>,
}

#[async_trait]
impl BaseRepository<Follow, Uuid> for InMemoryFollowRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Follow>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.follows.iter().find(|f| f.id == id).cloned())
    }

    async fn insert(&self, follow: Follow) -> Result<Follow, RepoError> {
        let mut tables = self.tables.write().await;
        if tables.follows.iter().any(|f| f.id == follow.id) {
            return Err(RepoError::Constraint("Entity already exists".to_string()));
        }
        if !tables.has_user(follow.user_id) || !tables.has_user(follow.author_id) {
            return Err(violation("follows"));
        }
        tables.follows.push(follow.clone());
        Ok(follow)
    }

    async fn update(&self, follow: Follow) -> Result<Follow, RepoError> {
        let mut tables = self.tables.write().await;
        replace(&mut tables.follows, |f| f.id, follow)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let mut tables = self.tables.write().await;
        let before = tables.follows.len();
        tables.follows.retain(|f| f.id != id);
        if tables.follows.len() == before {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl FollowRepository for InMemoryFollowRepository {
    async fn exists(&self, user_id: Uuid, author_id: Uuid) -> Result<bool, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables
            .follows
            .iter()
            .any(|f| f.user_id == user_id && f.author_id == author_id))
    }

    async fn get_or_create(&self, follow: Follow) -> Result<(Follow, bool), RepoError> {
        let mut tables = self.tables.write().await;
        if let Some(existing) = tables
            .follows
            .iter()
            .find(|f| f.user_id == follow.user_id && f.author_id == follow.author_id)
        {
            return Ok((existing.clone(), false));
        }
        if !tables.has_user(follow.user_id) || !tables.has_user(follow.author_id) {
            return Err(violation("follows"));
        }
        tables.follows.push(follow.clone());
        Ok((follow, true))
    }

    async fn delete_pair(&self, user_id: Uuid, author_id: Uuid) -> Result<(), RepoError> {
        let mut tables = self.tables.write().await;
        let before = tables.follows.len();
        tables
            .follows
            .retain(|f| !(f.user_id == user_id && f.author_id == author_id));
        if tables.follows.len() == before {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn count_for_user(&self, user_id: Uuid) -> Result<u64, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.follows.iter().filter(|f| f.user_id == user_id).count() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        store: InMemoryStore,
        author: User,
        reader: User,
        group: Group,
    }

    async fn fixture() -> Fixture {
        let store = InMemoryStore::new();
        let author = store
            .users()
            .insert(User::new("test_name".to_string(), "hash".to_string()))
            .await
            .unwrap();
        let reader = store
            .users()
            .insert(User::new("no_author".to_string(), "hash".to_string()))
            .await
            .unwrap();
        let group = store
            .groups()
            .insert(Group::new(
                "Test group".to_string(),
                "test_slug".to_string(),
                "Description".to_string(),
            ))
            .await
            .unwrap();
        Fixture {
            store,
            author,
            reader,
            group,
        }
    }

    #[tokio::test]
    async fn test_duplicate_username_is_a_constraint_violation() {
        let fx = fixture().await;
        let result = fx
            .store
            .users()
            .insert(User::new("test_name".to_string(), "other".to_string()))
            .await;
        assert!(matches!(result, Err(RepoError::Constraint(_))));
    }

    #[tokio::test]
    async fn test_post_with_unknown_author_is_rejected() {
        let fx = fixture().await;
        let result = fx
            .store
            .posts()
            .insert(Post::new(Uuid::new_v4(), "orphan".to_string(), None))
            .await;
        assert!(matches!(result, Err(RepoError::Constraint(_))));
    }

    #[tokio::test]
    async fn test_deleting_group_detaches_posts() {
        let fx = fixture().await;
        let posts = fx.store.posts();
        let post = posts
            .insert(Post::new(fx.author.id, "grouped".to_string(), Some(fx.group.id)))
            .await
            .unwrap();

        fx.store.groups().delete(fx.group.id).await.unwrap();

        let reloaded = posts.find_by_id(post.id).await.unwrap().unwrap();
        assert_eq!(reloaded.group_id, None);
        assert_eq!(reloaded.text, "grouped");
    }

    #[tokio::test]
    async fn test_deleting_post_detaches_comments() {
        let fx = fixture().await;
        let post = fx
            .store
            .posts()
            .insert(Post::new(fx.author.id, "commented".to_string(), None))
            .await
            .unwrap();
        let comment = fx
            .store
            .comments()
            .insert(Comment::new(post.id, fx.reader.id, "hi".to_string()))
            .await
            .unwrap();

        fx.store.posts().delete(post.id).await.unwrap();

        let reloaded = fx.store.comments().find_by_id(comment.id).await.unwrap().unwrap();
        assert_eq!(reloaded.post_id, None);
    }

    #[tokio::test]
    async fn test_deleting_user_cascades() {
        let fx = fixture().await;
        let own = fx
            .store
            .posts()
            .insert(Post::new(fx.author.id, "mine".to_string(), None))
            .await
            .unwrap();
        let other = fx
            .store
            .posts()
            .insert(Post::new(fx.reader.id, "theirs".to_string(), None))
            .await
            .unwrap();
        fx.store
            .comments()
            .insert(Comment::new(other.id, fx.author.id, "by author".to_string()))
            .await
            .unwrap();
        let survivor = fx
            .store
            .comments()
            .insert(Comment::new(own.id, fx.reader.id, "by reader".to_string()))
            .await
            .unwrap();
        fx.store
            .follows()
            .get_or_create(Follow::between(fx.reader.id, fx.author.id).unwrap())
            .await
            .unwrap();

        fx.store.users().delete(fx.author.id).await.unwrap();

        assert_eq!(fx.store.posts().count(&PostFilter::Author(fx.author.id)).await.unwrap(), 0);
        assert_eq!(fx.store.posts().count(&PostFilter::All).await.unwrap(), 1);
        assert_eq!(fx.store.comments().count_by_post(other.id).await.unwrap(), 0);
        let survivor = fx.store.comments().find_by_id(survivor.id).await.unwrap().unwrap();
        assert_eq!(survivor.post_id, None);
        assert_eq!(fx.store.follows().count_for_user(fx.reader.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_posts_are_listed_newest_first() {
        let fx = fixture().await;
        let posts = fx.store.posts();
        for i in 0..3 {
            posts
                .insert(Post::new(fx.author.id, format!("post {i}"), None))
                .await
                .unwrap();
        }

        let listed = posts.list(&PostFilter::All, 0, 10).await.unwrap();
        let texts: Vec<_> = listed.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(texts, vec!["post 2", "post 1", "post 0"]);
    }

    #[tokio::test]
    async fn test_get_or_create_is_idempotent() {
        let fx = fixture().await;
        let follows = fx.store.follows();

        let (_, created) = follows
            .get_or_create(Follow::between(fx.reader.id, fx.author.id).unwrap())
            .await
            .unwrap();
        let (_, created_again) = follows
            .get_or_create(Follow::between(fx.reader.id, fx.author.id).unwrap())
            .await
            .unwrap();

        assert!(created);
        assert!(!created_again);
        assert_eq!(follows.count_for_user(fx.reader.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_delete_missing_follow_is_not_found() {
        let fx = fixture().await;
        let result = fx.store.follows().delete_pair(fx.reader.id, fx.author.id).await;
        assert!(matches!(result, Err(RepoError::NotFound)));
    }

    #[tokio::test]
    async fn test_followed_by_filter() {
        let fx = fixture().await;
        let posts = fx.store.posts();
        posts
            .insert(Post::new(fx.author.id, "followed".to_string(), None))
            .await
            .unwrap();
        posts
            .insert(Post::new(fx.reader.id, "own".to_string(), None))
            .await
            .unwrap();
        fx.store
            .follows()
            .get_or_create(Follow::between(fx.reader.id, fx.author.id).unwrap())
            .await
            .unwrap();

        let feed = posts
            .list(&PostFilter::FollowedBy(fx.reader.id), 0, 10)
            .await
            .unwrap();
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].author_id, fx.author.id);
        assert_eq!(
            posts.count(&PostFilter::FollowedBy(fx.author.id)).await.unwrap(),
            0
        );
    }
}
