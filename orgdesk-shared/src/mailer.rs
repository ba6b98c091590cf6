/// Outbound mail behind a trait so transports can be swapped
///
/// The only message the system sends today is the invitation email.
/// [`LogMailer`] writes it to the log (the default in development);
/// [`MemoryMailer`] captures it for assertions in tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Mutex;
use tracing::info;

/// Delivery interface for outbound mail
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Sends an invitation email carrying the redemption link
    async fn send_invitation(
        &self,
        to: &str,
        organization_name: &str,
        link: &str,
        expires_at: DateTime<Utc>,
    ) -> anyhow::Result<()>;
}

/// Mailer that logs instead of sending
#[derive(Debug, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_invitation(
        &self,
        to: &str,
        organization_name: &str,
        link: &str,
        expires_at: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        info!(
            to = %to,
            organization = %organization_name,
            link = %link,
            expires_at = %expires_at,
            "invitation email (log transport)"
        );
        Ok(())
    }
}

/// A captured invitation email
#[derive(Debug, Clone)]
pub struct SentInvitation {
    pub to: String,
    pub organization_name: String,
    pub link: String,
    pub expires_at: DateTime<Utc>,
}

impl SentInvitation {
    /// The bearer token embedded as the link's last path segment
    pub fn token(&self) -> &str {
        self.link.rsplit('/').next().unwrap_or_default()
    }
}

/// Mailer that records messages in memory for tests
#[derive(Debug, Default)]
pub struct MemoryMailer {
    sent: Mutex<Vec<SentInvitation>>,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every message captured so far
    pub fn sent(&self) -> Vec<SentInvitation> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send_invitation(
        &self,
        to: &str,
        organization_name: &str,
        link: &str,
        expires_at: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push(SentInvitation {
            to: to.to_string(),
            organization_name: organization_name.to_string(),
            link: link.to_string(),
            expires_at,
        });
        Ok(())
    }
}
