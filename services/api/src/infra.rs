use async_trait::async_trait;
use hackathon::error::AppError;
use hackathon::workflows::application::{
    MailError, MailMessage, Mailer, RepositoryError, User, UserId, UserRepository,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Process-local user store keyed (and therefore listed) by id.
#[derive(Default, Clone)]
pub(crate) struct InMemoryUserRepository {
    records: Arc<Mutex<BTreeMap<UserId, User>>>,
}

impl InMemoryUserRepository {
    pub(crate) fn with_users(users: Vec<User>) -> Self {
        let records = users
            .into_iter()
            .map(|user| (user.id.clone(), user))
            .collect();
        Self {
            records: Arc::new(Mutex::new(records)),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<UserId, User>>, RepositoryError> {
        self.records
            .lock()
            .map_err(|_| RepositoryError::Unavailable("user store lock poisoned".to_string()))
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.lock()?.get(id).cloned())
    }

    async fn save(&self, user: &User) -> Result<(), RepositoryError> {
        let mut guard = self.lock()?;
        match guard.get_mut(&user.id) {
            Some(existing) => {
                *existing = user.clone();
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn list(&self, offset: usize, count: usize) -> Result<Vec<User>, RepositoryError> {
        let guard = self.lock()?;
        Ok(guard.values().skip(offset).take(count).cloned().collect())
    }

    async fn count(&self) -> Result<usize, RepositoryError> {
        Ok(self.lock()?.len())
    }
}

/// Mailer that records confirmations in the service log instead of relaying them.
#[derive(Debug, Default, Clone)]
pub(crate) struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: MailMessage) -> Result<(), MailError> {
        if !message.to.contains('@') {
            return Err(MailError::Rejected {
                recipient: message.to,
                reason: "no deliverable address".to_string(),
            });
        }
        info!(
            from = %message.from,
            to = %message.to,
            subject = %message.subject,
            "confirmation email queued"
        );
        Ok(())
    }
}

pub(crate) async fn load_seed_users(path: &Path) -> Result<Vec<User>, AppError> {
    let raw = tokio::fs::read_to_string(path).await?;
    let users: Vec<User> = serde_json::from_str(&raw)?;
    info!(path = %path.display(), count = users.len(), "seeded users");
    Ok(users)
}
