use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::Mutex;

use crate::auth::{
    repo::{StoreError, UserStore},
    repo_types::{NewUser, User},
};

/// In-process store backing unit and router tests.
#[derive(Default)]
pub struct MemoryUserStore {
    users: Mutex<Vec<User>>,
}

impl MemoryUserStore {
    pub async fn snapshot(&self) -> Vec<User> {
        self.users.lock().await.clone()
    }
}

fn live(user: &User, token: &str, now: OffsetDateTime) -> bool {
    user.reset_token.as_deref() == Some(token)
        && user.reset_token_expires_at.is_some_and(|exp| exp > now)
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let users = self.users.lock().await;
        Ok(users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<User>> {
        let users = self.users.lock().await;
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    async fn create(&self, new_user: &NewUser) -> Result<User, StoreError> {
        let mut users = self.users.lock().await;
        if users
            .iter()
            .any(|u| u.email.eq_ignore_ascii_case(&new_user.email))
        {
            return Err(StoreError::DuplicateEmail);
        }
        let user = User {
            id: users.len() as i64 + 1,
            email: new_user.email.clone(),
            password_hash: new_user.password_hash.clone(),
            first_name: new_user.first_name.clone(),
            last_name: new_user.last_name.clone(),
            phone: None,
            address: None,
            avatar_url: None,
            reset_token: None,
            reset_token_expires_at: None,
            created_at: OffsetDateTime::now_utc(),
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn set_reset_token(
        &self,
        user_id: i64,
        token: &str,
        expires_at: OffsetDateTime,
    ) -> anyhow::Result<()> {
        let mut users = self.users.lock().await;
        if let Some(u) = users.iter_mut().find(|u| u.id == user_id) {
            u.reset_token = Some(token.to_string());
            u.reset_token_expires_at = Some(expires_at);
        }
        Ok(())
    }

    async fn find_by_reset_token(
        &self,
        token: &str,
        now: OffsetDateTime,
    ) -> anyhow::Result<Option<User>> {
        let users = self.users.lock().await;
        Ok(users.iter().find(|u| live(u, token, now)).cloned())
    }

    async fn consume_reset_token(
        &self,
        token: &str,
        now: OffsetDateTime,
        password_hash: &str,
    ) -> anyhow::Result<bool> {
        let mut users = self.users.lock().await;
        match users.iter_mut().find(|u| live(u, token, now)) {
            Some(u) => {
                u.password_hash = password_hash.to_string();
                u.reset_token = None;
                u.reset_token_expires_at = None;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn clear_expired_reset_token(
        &self,
        token: &str,
        now: OffsetDateTime,
    ) -> anyhow::Result<bool> {
        let mut users = self.users.lock().await;
        let expired = users.iter_mut().find(|u| {
            u.reset_token.as_deref() == Some(token)
                && u.reset_token_expires_at.is_some_and(|exp| exp <= now)
        });
        match expired {
            Some(u) => {
                u.reset_token = None;
                u.reset_token_expires_at = None;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
