use crate::repository::MessageRepository;
use actix_middleware::{AccountLookup, AccountStatus};
use async_trait::async_trait;
use std::sync::Arc;

/// Feeds the auth middleware's existence and ban checks from the users table.
pub struct RepositoryAccounts {
    repo: Arc<dyn MessageRepository>,
}

impl RepositoryAccounts {
    pub fn new(repo: Arc<dyn MessageRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl AccountLookup for RepositoryAccounts {
    async fn account_status(&self, user_id: i64) -> Result<AccountStatus, String> {
        let account = self
            .repo
            .find_account(user_id)
            .await
            .map_err(|e| e.to_string())?;
        Ok(match account {
            None => AccountStatus::Missing,
            Some(a) if a.banned => AccountStatus::Banned,
            Some(_) => AccountStatus::Active,
        })
    }
}
