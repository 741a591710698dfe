use serde::Serialize;

use super::domain::{DeliverySession, SessionId, TransactionReference};
use crate::workflows::documents::AssembledDocument;

/// Storage abstraction so the workflow can be exercised in isolation.
pub trait SessionRepository: Send + Sync {
    fn insert(&self, session: DeliverySession) -> Result<DeliverySession, RepositoryError>;
    fn update(&self, session: DeliverySession) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &SessionId) -> Result<Option<DeliverySession>, RepositoryError>;
    /// Session owning `reference`, whether current or superseded.
    fn find_by_reference(
        &self,
        reference: &TransactionReference,
    ) -> Result<Option<DeliverySession>, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("session already exists")]
    Conflict,
    #[error("session not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Outbound e-mail hook used once documents are unlocked.
pub trait DocumentMailer: Send + Sync {
    fn send(&self, delivery: DocumentEmail) -> Result<(), MailerError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentEmail {
    pub session_id: SessionId,
    pub recipient: String,
    pub subject: String,
    pub documents: Vec<AssembledDocument>,
}

#[derive(Debug, thiserror::Error)]
pub enum MailerError {
    #[error("mail transport unavailable: {0}")]
    Transport(String),
}
