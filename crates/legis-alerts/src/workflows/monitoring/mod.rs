//! Legislative proposal monitoring: profile matching, scoring, deduplicated
//! notification, and the greeting/scan/summary run cycle.

pub mod dispatch;
pub mod domain;
pub mod matching;
pub mod profile;
pub mod router;
pub mod service;
pub mod sources;
pub mod state;

#[cfg(test)]
mod tests;

pub use dispatch::{
    Audience, Branding, Channel, ChannelError, ChannelKind, Clock, DeliveryOutcome,
    DispatchReport, Dispatcher, EmailChannel, FixedClock, LogChannel, Message, SystemClock,
    TelegramChannel,
};
pub use domain::{
    AlertLevel, Match, Proposal, ProposalContext, ProposalId, ProposalSource, StatusSnapshot,
};
pub use matching::{AlertClassifier, MatchingEngine, Rejection, ScoreComponent, ScoreFactor};
pub use profile::{InterestProfile, ProfileError, QuietHours, Theme};
pub use router::monitor_router;
pub use service::{
    AlertSummary, MonitorService, MonitorSettings, ParseRunModeError, ProfileSource, RunMode,
    RunReport,
};
pub use sources::{
    AgendaItem, CamaraClient, DateWindow, FetchOrchestrator, LegislativeSource, ListingQuery,
    Page, SourceError, StatusCache,
};
pub use state::{
    DedupKey, JsonFileStore, MemoryStore, NotificationRecord, NotificationStore, StoreError,
};
