use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, TimeZone};
use chrono_tz::Tz;

use crate::workflows::monitoring::dispatch::{
    Branding, Channel, ChannelError, ChannelKind, Dispatcher, FixedClock, Message,
};
use crate::workflows::monitoring::domain::{
    Proposal, ProposalContext, ProposalId, StatusSnapshot,
};
use crate::workflows::monitoring::profile::{InterestProfile, Theme};
use crate::workflows::monitoring::service::{MonitorService, MonitorSettings, ProfileSource};
use crate::workflows::monitoring::sources::{
    AgendaItem, DateWindow, FetchOrchestrator, LegislativeSource, ListingQuery, Page,
    SourceError, StatusCache,
};
use crate::workflows::monitoring::state::MemoryStore;

pub(super) fn proposal(id: &str, type_code: &str, summary: &str, situation: &str) -> Proposal {
    Proposal {
        id: ProposalId::camara(id),
        type_code: type_code.to_string(),
        type_description: String::new(),
        number: id.parse().unwrap_or(1),
        year: 2025,
        summary: summary.to_string(),
        keywords: String::new(),
        status: StatusSnapshot {
            situation: situation.to_string(),
            organ: "CCJC".to_string(),
            status_at: "2025-03-10T14:30".to_string(),
            ..StatusSnapshot::default()
        },
        context: ProposalContext::Listing,
    }
}

/// PEC 10/2025 on ICMS, awaiting a rapporteur's opinion.
pub(super) fn pec_icms() -> Proposal {
    Proposal {
        number: 10,
        ..proposal(
            "2501234",
            "PEC",
            "reforma tributária e ICMS",
            "aguardando parecer",
        )
    }
}

pub(super) fn theme(name: &str, keywords: &[&str], weight: u32) -> Theme {
    Theme {
        name: name.to_string(),
        keywords: keywords.iter().map(|k| crate::text::normalize(k)).collect(),
        weight,
    }
}

/// Single "Tributário" theme on "icms", weight 10, no exclusions.
pub(super) fn tax_profile() -> InterestProfile {
    InterestProfile {
        client_id: "teste".to_string(),
        display_name: "Cliente Teste".to_string(),
        themes: vec![theme("Tributário", &["icms"], 10)],
        monitored_types: vec!["PEC".to_string(), "PL".to_string()],
        ..InterestProfile::empty()
    }
}

pub(super) fn at(day: u32, hour: u32) -> DateTime<Tz> {
    chrono_tz::America::Sao_Paulo
        .with_ymd_and_hms(2025, 3, day, hour, 0, 0)
        .single()
        .expect("unambiguous local time")
}

pub(super) fn branding() -> Branding {
    Branding {
        name: "Monitor Teste".to_string(),
        panel_url: Some("https://painel.example.org".to_string()),
    }
}

pub(super) type SentLog = Arc<Mutex<Vec<Message>>>;

pub(super) struct RecordingChannel {
    name: &'static str,
    kind: ChannelKind,
    fail: bool,
    sent: SentLog,
}

pub(super) fn recording_channel(
    name: &'static str,
    kind: ChannelKind,
    fail: bool,
) -> (Box<dyn Channel>, SentLog) {
    let sent = SentLog::default();
    let channel = RecordingChannel {
        name,
        kind,
        fail,
        sent: Arc::clone(&sent),
    };
    (Box::new(channel), sent)
}

#[async_trait::async_trait]
impl Channel for RecordingChannel {
    fn name(&self) -> &str {
        self.name
    }

    fn kind(&self) -> ChannelKind {
        self.kind
    }

    async fn deliver(&self, message: &Message) -> Result<(), ChannelError> {
        if self.fail {
            return Err(ChannelError::Smtp("connection refused".to_string()));
        }
        self.sent.lock().expect("sent log").push(message.clone());
        Ok(())
    }
}

pub(super) fn sent(log: &SentLog) -> Vec<Message> {
    log.lock().expect("sent log").clone()
}

/// In-memory upstream. Listings are paged `page_size` items at a time using
/// the offset as cursor; details and statuses come from the same records.
#[derive(Default)]
pub(super) struct FakeSource {
    listings: Mutex<HashMap<String, Vec<Proposal>>>,
    details: Mutex<HashMap<ProposalId, Proposal>>,
    agenda: Mutex<Vec<AgendaItem>>,
    failing_ids: Mutex<HashSet<ProposalId>>,
    failing_types: HashSet<String>,
    page_size: usize,
    pub(super) list_calls: AtomicUsize,
    pub(super) status_calls: AtomicUsize,
}

impl FakeSource {
    pub(super) fn new(page_size: usize) -> Self {
        Self {
            page_size,
            ..Self::default()
        }
    }

    pub(super) fn with_failing_type(mut self, type_code: &str) -> Self {
        self.failing_types.insert(type_code.to_string());
        self
    }

    pub(super) fn list(&self, type_code: &str, proposals: Vec<Proposal>) {
        let mut details = self.details.lock().expect("details");
        for proposal in &proposals {
            details.insert(proposal.id.clone(), proposal.clone());
        }
        self.listings
            .lock()
            .expect("listings")
            .insert(type_code.to_string(), proposals);
    }

    /// Replace the upstream record without touching the listing.
    pub(super) fn update(&self, proposal: Proposal) {
        self.details
            .lock()
            .expect("details")
            .insert(proposal.id.clone(), proposal);
    }

    pub(super) fn schedule(&self, proposal: Proposal, organ: &str) {
        self.agenda.lock().expect("agenda").push(AgendaItem {
            proposal_id: proposal.id.clone(),
            scheduled_for: "2025-03-11T10:00".to_string(),
            organ: organ.to_string(),
        });
        self.update(proposal);
    }

    pub(super) fn fail(&self, id: &ProposalId) {
        self.failing_ids.lock().expect("failing").insert(id.clone());
    }

    fn check(&self, id: &ProposalId) -> Result<(), SourceError> {
        if self.failing_ids.lock().expect("failing").contains(id) {
            return Err(SourceError::Decode {
                url: format!("fake://{id}"),
                message: "upstream timeout".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl LegislativeSource for FakeSource {
    async fn list_page(
        &self,
        query: &ListingQuery,
        cursor: Option<&str>,
    ) -> Result<Page<Proposal>, SourceError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_types.contains(&query.type_code) {
            return Err(SourceError::Decode {
                url: format!("fake://proposicoes?siglaTipo={}", query.type_code),
                message: "503".to_string(),
            });
        }

        let listings = self.listings.lock().expect("listings");
        let all = listings.get(&query.type_code).cloned().unwrap_or_default();
        let offset: usize = cursor.and_then(|c| c.parse().ok()).unwrap_or(0);
        let page_size = self.page_size.max(1);
        let end = (offset + page_size).min(all.len());
        let items = all.get(offset..end).map(<[Proposal]>::to_vec).unwrap_or_default();
        let next = (end < all.len()).then(|| end.to_string());
        Ok(Page { items, next })
    }

    async fn proposal(&self, id: &ProposalId) -> Result<Proposal, SourceError> {
        self.check(id)?;
        self.details
            .lock()
            .expect("details")
            .get(id)
            .cloned()
            .ok_or_else(|| SourceError::ForeignId(id.clone()))
    }

    async fn status(&self, id: &ProposalId) -> Result<StatusSnapshot, SourceError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        self.check(id)?;
        Ok(self
            .details
            .lock()
            .expect("details")
            .get(id)
            .map(|proposal| proposal.status.clone())
            .unwrap_or_default())
    }

    async fn agenda(
        &self,
        _window: &DateWindow,
        _committees: &[String],
    ) -> Result<Vec<AgendaItem>, SourceError> {
        Ok(self.agenda.lock().expect("agenda").clone())
    }
}

pub(super) fn orchestrator(source: Arc<FakeSource>) -> FetchOrchestrator<FakeSource> {
    FetchOrchestrator::new(source, Arc::new(StatusCache::new(64)), 4)
}

pub(super) fn settings(profile: InterestProfile) -> MonitorSettings {
    MonitorSettings {
        profile: ProfileSource::Fixed(profile),
        lookback_days: 7,
        agenda_lookahead_days: 7,
        include_agenda: true,
        min_score: 0,
        per_type_limit: 50,
        send_interval: Duration::ZERO,
        branding: branding(),
    }
}

pub(super) struct Harness {
    pub service: Arc<MonitorService<FakeSource, MemoryStore>>,
    pub source: Arc<FakeSource>,
    pub store: Arc<MemoryStore>,
    pub clock: Arc<FixedClock>,
    pub realtime: SentLog,
    pub consolidated: SentLog,
}

pub(super) fn harness(settings: MonitorSettings) -> Harness {
    harness_with(settings, false, false)
}

pub(super) fn harness_with(
    settings: MonitorSettings,
    realtime_fails: bool,
    consolidated_fails: bool,
) -> Harness {
    let source = Arc::new(FakeSource::new(10));
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(FixedClock::new(at(10, 12)));
    let (telegram, realtime) = recording_channel("telegram", ChannelKind::RealTime, realtime_fails);
    let (email, consolidated) =
        recording_channel("email", ChannelKind::Consolidated, consolidated_fails);
    let dispatcher = Dispatcher::new(vec![telegram, email], clock.clone());

    let service = Arc::new(MonitorService::new(
        orchestrator(Arc::clone(&source)),
        Arc::clone(&store),
        dispatcher,
        settings,
    ));

    Harness {
        service,
        source,
        store,
        clock,
        realtime,
        consolidated,
    }
}
