use async_trait::async_trait;

use super::domain::{User, UserId};

/// Storage abstraction for user documents so the service can be exercised in isolation.
///
/// `save` replaces the whole document, including the embedded application.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, RepositoryError>;
    async fn save(&self, user: &User) -> Result<(), RepositoryError>;
    /// Users ordered by id, skipping `offset` and returning at most `count`.
    async fn list(&self, offset: usize, count: usize) -> Result<Vec<User>, RepositoryError>;
    async fn count(&self) -> Result<usize, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
