//! Domain services used by the HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own business logic and store access so route handlers can
//! stay focused on protocol translation and session plumbing. Every service
//! takes the document store as `&dyn DocumentStore` and the caller's identity
//! explicitly; nothing reads a global current user.
//!
//! ERROR HANDLING
//! ==============
//! Reporting services return `ReportError`. A store permission failure becomes
//! `ReportError::DemoModeRequested`; only the HTTP layer decides whether that
//! turns into demonstration data.

pub mod cashbook;
pub mod dashboard;
pub mod demo;
pub mod directory;
pub mod ledger;
pub mod loans;
pub mod messages;
pub mod period;
pub mod poller;
pub mod reports;
pub mod session;
pub mod synthesis;

use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("store denied access; demonstration data requested")]
    DemoModeRequested,
    #[error("shop not visible to caller: {0}")]
    Forbidden(String),
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for ReportError {
    fn from(err: StoreError) -> Self {
        if err.is_permission_denied() { Self::DemoModeRequested } else { Self::Store(err) }
    }
}
