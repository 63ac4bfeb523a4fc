//! Upstream legislative data: the source abstraction, the Câmara adapter, and
//! the orchestrator that fans requests out with bounded parallelism.

mod cache;
pub mod camara;
mod orchestrator;

pub use cache::StatusCache;
pub use camara::CamaraClient;
pub use orchestrator::{FetchOrchestrator, MAX_PAGINATED_ITEMS};

use chrono::{Days, NaiveDate};

use super::domain::{Proposal, ProposalId, StatusSnapshot};

/// Inclusive calendar-day range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    /// `days` before `today` up to and including `today`. Saturates at the
    /// earliest representable date.
    pub fn lookback(today: NaiveDate, days: u32) -> Self {
        Self {
            start: today
                .checked_sub_days(Days::new(u64::from(days)))
                .unwrap_or(NaiveDate::MIN),
            end: today,
        }
    }

    /// `today` up to `days` ahead, saturating at the latest representable date.
    pub fn lookahead(today: NaiveDate, days: u32) -> Self {
        Self {
            start: today,
            end: today
                .checked_add_days(Days::new(u64::from(days)))
                .unwrap_or(NaiveDate::MAX),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingQuery {
    pub type_code: String,
    pub window: DateWindow,
    pub page_size: usize,
}

/// One page of upstream results plus the cursor for the next one.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next: Option<String>,
}

/// Proposal scheduled on a committee or floor agenda.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgendaItem {
    pub proposal_id: ProposalId,
    pub scheduled_for: String,
    pub organ: String,
}

/// Read-only access to one legislative house's open-data API.
#[async_trait::async_trait]
pub trait LegislativeSource: Send + Sync {
    /// One page of proposals presented inside `query.window`. `cursor` is the
    /// opaque value returned in a previous [`Page::next`].
    async fn list_page(
        &self,
        query: &ListingQuery,
        cursor: Option<&str>,
    ) -> Result<Page<Proposal>, SourceError>;

    /// Full proposal detail, including the current status.
    async fn proposal(&self, id: &ProposalId) -> Result<Proposal, SourceError>;

    async fn status(&self, id: &ProposalId) -> Result<StatusSnapshot, SourceError>;

    /// Agenda entries for events inside `window` held by one of `committees`.
    async fn agenda(
        &self,
        window: &DateWindow,
        committees: &[String],
    ) -> Result<Vec<AgendaItem>, SourceError>;
}

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected payload from {url}: {message}")]
    Decode { url: String, message: String },
    #[error("{0} does not belong to this source")]
    ForeignId(ProposalId),
    #[error("invalid upstream url: {0}")]
    InvalidUrl(String),
}
