use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tokio::sync::Mutex;

use super::dispatch::{Audience, Branding, DispatchReport, Dispatcher, Message};
use super::domain::{AlertLevel, Proposal, ProposalContext, ProposalId};
use super::matching::MatchingEngine;
use super::profile::InterestProfile;
use super::sources::{DateWindow, FetchOrchestrator, LegislativeSource};
use super::state::{DedupKey, NotificationRecord, NotificationStore, StoreError};
use crate::config::MonitorConfig;

/// The three cycles a scheduler can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    Greeting,
    Scan,
    Summary,
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RunMode::Greeting => "greeting",
            RunMode::Scan => "scan",
            RunMode::Summary => "summary",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown run mode '{0}' (expected greeting, scan or summary)")]
pub struct ParseRunModeError(pub String);

impl FromStr for RunMode {
    type Err = ParseRunModeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "greeting" | "bom_dia" => Ok(RunMode::Greeting),
            "scan" | "varredura" => Ok(RunMode::Scan),
            "summary" | "resumo" => Ok(RunMode::Summary),
            _ => Err(ParseRunModeError(value.to_string())),
        }
    }
}

/// Where each run reads its interest profile from.
#[derive(Debug, Clone)]
pub enum ProfileSource {
    /// Re-read on every run, with template/empty fallbacks.
    File(PathBuf),
    Fixed(InterestProfile),
}

impl ProfileSource {
    pub fn resolve(&self) -> InterestProfile {
        match self {
            ProfileSource::File(path) => InterestProfile::load_or_fallback(path),
            ProfileSource::Fixed(profile) => profile.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MonitorSettings {
    pub profile: ProfileSource,
    pub lookback_days: u32,
    pub agenda_lookahead_days: u32,
    pub include_agenda: bool,
    /// Matches scoring below this are dropped unless critical.
    pub min_score: u8,
    pub per_type_limit: usize,
    /// Pause between consecutive match notifications.
    pub send_interval: Duration,
    pub branding: Branding,
}

impl MonitorSettings {
    pub fn from_config(config: &MonitorConfig) -> Self {
        Self {
            profile: ProfileSource::File(config.profile_path.clone()),
            lookback_days: config.lookback_days,
            agenda_lookahead_days: config.agenda_lookahead_days,
            include_agenda: config.include_agenda,
            min_score: config.min_score,
            per_type_limit: config.per_type_limit,
            send_interval: config.send_interval,
            branding: Branding {
                name: config.brand_name.clone(),
                panel_url: config.panel_url.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlertSummary {
    pub proposal_id: ProposalId,
    pub label: String,
    pub level: AlertLevel,
    pub score: u8,
    pub delivered: bool,
}

/// What one run did, returned to the CLI and the HTTP trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub mode: RunMode,
    pub day: NaiveDate,
    pub started_at: DateTime<Utc>,
    pub candidates: usize,
    pub matched: usize,
    pub below_min_score: usize,
    pub duplicates: usize,
    pub notified: usize,
    pub state_errors: usize,
    pub alerts: Vec<AlertSummary>,
    pub digest_items: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub announcement: Option<DispatchReport>,
}

impl RunReport {
    fn new(mode: RunMode, day: NaiveDate, started_at: DateTime<Utc>) -> Self {
        Self {
            mode,
            day,
            started_at,
            candidates: 0,
            matched: 0,
            below_min_score: 0,
            duplicates: 0,
            notified: 0,
            state_errors: 0,
            alerts: Vec::new(),
            digest_items: Vec::new(),
            announcement: None,
        }
    }
}

/// Runs greeting, scan, and summary cycles. Runs are serialized within the
/// process; separate processes sharing one state directory are not.
pub struct MonitorService<S, N> {
    orchestrator: FetchOrchestrator<S>,
    store: Arc<N>,
    dispatcher: Dispatcher,
    settings: MonitorSettings,
    run_lock: Mutex<()>,
}

impl<S, N> MonitorService<S, N>
where
    S: LegislativeSource + 'static,
    N: NotificationStore + 'static,
{
    pub fn new(
        orchestrator: FetchOrchestrator<S>,
        store: Arc<N>,
        dispatcher: Dispatcher,
        settings: MonitorSettings,
    ) -> Self {
        Self {
            orchestrator,
            store,
            dispatcher,
            settings,
            run_lock: Mutex::new(()),
        }
    }

    pub fn settings(&self) -> &MonitorSettings {
        &self.settings
    }

    pub async fn run(&self, mode: RunMode) -> RunReport {
        match mode {
            RunMode::Greeting => self.greeting().await,
            RunMode::Scan => self.scan().await,
            RunMode::Summary => self.summary().await,
        }
    }

    /// Start a fresh digest for today and say good morning on real-time channels.
    pub async fn greeting(&self) -> RunReport {
        let _guard = self.run_lock.lock().await;
        let now = self.dispatcher.clock().now();
        let mut report = RunReport::new(RunMode::Greeting, now.date_naive(), now.with_timezone(&Utc));
        tracing::info!(day = %report.day, "greeting run started");

        if let Err(error) = self.store.reset_digest(report.day) {
            tracing::warn!(%error, "digest reset failed");
            report.state_errors += 1;
        }

        let profile = self.settings.profile.resolve();
        let message = Message::greeting(&self.settings.branding, &now);
        report.announcement = Some(
            self.dispatcher
                .dispatch(
                    Audience::RealTimeOnly,
                    &message,
                    AlertLevel::Info,
                    profile.quiet_hours.as_ref(),
                )
                .await,
        );

        report
    }

    /// Fetch, match, deduplicate, and notify, in fetch order.
    pub async fn scan(&self) -> RunReport {
        let _guard = self.run_lock.lock().await;
        let now = self.dispatcher.clock().now();
        let today = now.date_naive();
        let detected_at = now.with_timezone(&Utc);
        let mut report = RunReport::new(RunMode::Scan, today, detected_at);

        let profile = self.settings.profile.resolve();
        let engine = MatchingEngine::new(&profile);
        tracing::info!(
            client = %profile.client_id,
            themes = profile.themes.len(),
            keywords = profile.keyword_count(),
            "scan started"
        );

        self.orchestrator.invalidate_cache();

        let proposals = self.gather(&profile, today).await;
        report.candidates = proposals.len();

        for proposal in &proposals {
            let Some(found) = engine.evaluate(proposal, detected_at) else {
                continue;
            };
            report.matched += 1;

            if found.score < self.settings.min_score && found.level != AlertLevel::Critical {
                tracing::debug!(proposal = %proposal.id, score = found.score, "below minimum score");
                report.below_min_score += 1;
                continue;
            }

            let key = DedupKey::new(proposal.id.clone(), proposal.status.status_at.clone());
            match self.store.already_sent(&key) {
                Ok(true) => {
                    report.duplicates += 1;
                    continue;
                }
                Ok(false) => {}
                Err(error) => {
                    tracing::warn!(%key, %error, "dedup lookup failed, skipping");
                    report.state_errors += 1;
                    continue;
                }
            }

            let label = proposal.label();
            let record = NotificationRecord {
                label: label.clone(),
                level: found.level,
                score: found.score,
                sent_at: self.dispatcher.clock().now().with_timezone(&Utc),
            };
            if let Err(error) = self.store.record(&key, record) {
                tracing::warn!(%key, %error, "notification record not persisted");
                report.state_errors += 1;
            }

            if report.notified > 0 && !self.settings.send_interval.is_zero() {
                tokio::time::sleep(self.settings.send_interval).await;
            }

            let message = Message::match_alert(&self.settings.branding, proposal, &found);
            let delivery = self
                .dispatcher
                .dispatch(
                    Audience::AllChannels,
                    &message,
                    found.level,
                    profile.quiet_hours.as_ref(),
                )
                .await;

            if let Err(error) = self.store.add_to_digest(today, &label) {
                tracing::warn!(%label, %error, "digest update failed");
                report.state_errors += 1;
            }

            tracing::info!(
                proposal = %proposal.id,
                %label,
                level = %found.level,
                score = found.score,
                delivered = delivery.succeeded(),
                "match notified"
            );
            report.notified += 1;
            report.alerts.push(AlertSummary {
                proposal_id: proposal.id.clone(),
                label,
                level: found.level,
                score: found.score,
                delivered: delivery.succeeded(),
            });
        }

        if report.notified == 0 {
            let verbose = self.store.previous_scan_found_news().unwrap_or_else(|error| {
                tracing::warn!(%error, "run state unreadable");
                true
            });
            let message = Message::no_news(&self.settings.branding, &now, verbose);
            report.announcement = Some(
                self.dispatcher
                    .dispatch(
                        Audience::RealTimeOnly,
                        &message,
                        AlertLevel::Info,
                        profile.quiet_hours.as_ref(),
                    )
                    .await,
            );
        }

        if let Err(error) = self.store.set_previous_scan_found_news(report.notified > 0) {
            tracing::warn!(%error, "run state not persisted");
            report.state_errors += 1;
        }

        report.digest_items = self.store.digest(today).unwrap_or_default();
        tracing::info!(
            candidates = report.candidates,
            matched = report.matched,
            notified = report.notified,
            duplicates = report.duplicates,
            "scan finished"
        );
        report
    }

    /// Drain today's digest into the end-of-day summary on every channel.
    pub async fn summary(&self) -> RunReport {
        let _guard = self.run_lock.lock().await;
        let now = self.dispatcher.clock().now();
        let mut report = RunReport::new(RunMode::Summary, now.date_naive(), now.with_timezone(&Utc));

        let labels = self.store.drain_digest(report.day).unwrap_or_else(|error| {
            tracing::warn!(%error, "digest unreadable, summarizing nothing");
            report.state_errors += 1;
            Vec::new()
        });
        tracing::info!(day = %report.day, items = labels.len(), "summary run started");

        let profile = self.settings.profile.resolve();
        let message = Message::daily_summary(&self.settings.branding, &now, &labels);
        report.announcement = Some(
            self.dispatcher
                .dispatch(
                    Audience::AllChannels,
                    &message,
                    AlertLevel::Info,
                    profile.quiet_hours.as_ref(),
                )
                .await,
        );
        report.digest_items = labels;

        report
    }

    /// Today's digest as currently stored.
    pub fn digest_today(&self) -> Result<(NaiveDate, Vec<String>), StoreError> {
        let day = self.dispatcher.clock().now().date_naive();
        Ok((day, self.store.digest(day)?))
    }

    /// Listing, details, agenda merge, and status refresh for one scan.
    async fn gather(&self, profile: &InterestProfile, today: NaiveDate) -> Vec<Proposal> {
        let window = DateWindow::lookback(today, self.settings.lookback_days);
        let listed = self
            .orchestrator
            .collect_candidates(&window, &profile.monitored_types, self.settings.per_type_limit)
            .await;
        let mut proposals = self.orchestrator.enrich(listed).await;

        if self.settings.include_agenda {
            let agenda_window = DateWindow::lookahead(today, self.settings.agenda_lookahead_days);
            let scheduled = self
                .orchestrator
                .agenda_proposals(&agenda_window, &profile.committees)
                .await;
            merge_agenda(&mut proposals, scheduled);
        }

        let ids: Vec<ProposalId> = proposals.iter().map(|proposal| proposal.id.clone()).collect();
        let statuses = self.orchestrator.build_status_map(&ids).await;
        for proposal in &mut proposals {
            if let Some(snapshot) = statuses.get(&proposal.id) {
                proposal.status = snapshot.clone().or(&proposal.status);
            }
        }

        proposals
    }
}

/// Agenda arrivals upgrade an already listed proposal in place; new ones
/// are appended after the listing.
fn merge_agenda(proposals: &mut Vec<Proposal>, scheduled: Vec<Proposal>) {
    for agenda in scheduled {
        match proposals.iter_mut().find(|existing| existing.id == agenda.id) {
            Some(existing) => {
                if let ProposalContext::Agenda { .. } = agenda.context {
                    existing.context = agenda.context;
                }
            }
            None => proposals.push(agenda),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_modes_accept_legacy_names() {
        assert_eq!("bom_dia".parse::<RunMode>(), Ok(RunMode::Greeting));
        assert_eq!("VARREDURA".parse::<RunMode>(), Ok(RunMode::Scan));
        assert_eq!("resumo".parse::<RunMode>(), Ok(RunMode::Summary));
        assert_eq!("summary".parse::<RunMode>(), Ok(RunMode::Summary));
        assert!("weekly".parse::<RunMode>().is_err());
        assert_eq!(RunMode::Greeting.to_string(), "greeting");
    }
}
