use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::stream::{self, StreamExt};

use super::{DateWindow, LegislativeSource, ListingQuery, StatusCache};
use crate::workflows::monitoring::domain::{Proposal, ProposalContext, ProposalId, StatusSnapshot};

/// Hard ceiling on items pulled per proposal type, whatever the configured limit.
pub const MAX_PAGINATED_ITEMS: usize = 500;
const MAX_PAGE_SIZE: usize = 100;

/// Pulls candidate proposals from a source with bounded fan-out. Every
/// upstream failure degrades a single item or type, never the batch.
pub struct FetchOrchestrator<S> {
    source: Arc<S>,
    cache: Arc<StatusCache>,
    concurrency: usize,
}

impl<S> FetchOrchestrator<S>
where
    S: LegislativeSource + 'static,
{
    pub fn new(source: Arc<S>, cache: Arc<StatusCache>, concurrency: usize) -> Self {
        Self {
            source,
            cache,
            concurrency: concurrency.max(1),
        }
    }

    pub fn cache(&self) -> &StatusCache {
        &self.cache
    }

    /// Drop every memoized status so a new scan sees fresh upstream data.
    pub fn invalidate_cache(&self) {
        self.cache.clear();
    }

    /// Page through the listing of every type in `type_codes`, capped at
    /// `per_type_limit` (and [`MAX_PAGINATED_ITEMS`]) per type.
    pub async fn collect_candidates(
        &self,
        window: &DateWindow,
        type_codes: &[String],
        per_type_limit: usize,
    ) -> Vec<Proposal> {
        let limit = per_type_limit.min(MAX_PAGINATED_ITEMS);
        let mut seen: HashSet<ProposalId> = HashSet::new();
        let mut candidates = Vec::new();

        for type_code in type_codes {
            let query = ListingQuery {
                type_code: type_code.clone(),
                window: *window,
                page_size: limit.clamp(1, MAX_PAGE_SIZE),
            };

            let mut collected = 0usize;
            let mut cursor: Option<String> = None;
            while collected < limit {
                let page = match self.source.list_page(&query, cursor.as_deref()).await {
                    Ok(page) => page,
                    Err(error) => {
                        tracing::warn!(%type_code, %error, "listing page failed, skipping remaining pages");
                        break;
                    }
                };

                for proposal in page.items {
                    if collected >= limit {
                        break;
                    }
                    collected += 1;
                    if seen.insert(proposal.id.clone()) {
                        candidates.push(proposal);
                    }
                }

                match page.next {
                    Some(next) if cursor.as_deref() != Some(next.as_str()) => cursor = Some(next),
                    _ => break,
                }
            }

            tracing::debug!(%type_code, collected, "listing collected");
        }

        candidates
    }

    /// Replace listing records with full details, preserving input order.
    /// Items whose detail fetch fails keep their listing data.
    pub async fn enrich(&self, proposals: Vec<Proposal>) -> Vec<Proposal> {
        let source = Arc::clone(&self.source);
        let cache = Arc::clone(&self.cache);

        stream::iter(proposals)
            .map(move |listing| {
                let source = Arc::clone(&source);
                let cache = Arc::clone(&cache);
                async move {
                    match source.proposal(&listing.id).await {
                        Ok(mut detail) => {
                            detail.context = listing.context;
                            detail.status = detail.status.or(&listing.status);
                            if !detail.status.is_empty() {
                                cache.insert(detail.id.clone(), detail.status.clone());
                            }
                            detail
                        }
                        Err(error) => {
                            tracing::warn!(proposal = %listing.id, %error, "detail fetch failed, keeping listing record");
                            listing
                        }
                    }
                }
            })
            .buffered(self.concurrency)
            .collect()
            .await
    }

    /// Current status for every id. Cached entries are reused; a failed
    /// fetch yields an empty snapshot for that id.
    pub async fn build_status_map(&self, ids: &[ProposalId]) -> HashMap<ProposalId, StatusSnapshot> {
        let mut statuses = HashMap::with_capacity(ids.len());
        let mut missing = Vec::new();

        for id in ids {
            match self.cache.get(id) {
                Some(snapshot) => {
                    statuses.insert(id.clone(), snapshot);
                }
                None => missing.push(id.clone()),
            }
        }

        let source = Arc::clone(&self.source);
        let fetched: Vec<(ProposalId, StatusSnapshot)> = stream::iter(missing)
            .map(move |id| {
                let source = Arc::clone(&source);
                async move {
                    match source.status(&id).await {
                        Ok(snapshot) => (id, snapshot),
                        Err(error) => {
                            tracing::warn!(proposal = %id, %error, "status fetch failed");
                            (id, StatusSnapshot::default())
                        }
                    }
                }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        for (id, snapshot) in fetched {
            if !snapshot.is_empty() {
                self.cache.insert(id.clone(), snapshot.clone());
            }
            statuses.insert(id, snapshot);
        }

        statuses
    }

    /// Proposals on the agenda of `committees` inside `window`, resolved to
    /// full records and tagged with [`ProposalContext::Agenda`].
    pub async fn agenda_proposals(&self, window: &DateWindow, committees: &[String]) -> Vec<Proposal> {
        let items = match self.source.agenda(window, committees).await {
            Ok(items) => items,
            Err(error) => {
                tracing::warn!(%error, "agenda fetch failed");
                return Vec::new();
            }
        };

        let mut seen = HashSet::new();
        let items: Vec<_> = items
            .into_iter()
            .filter(|item| seen.insert(item.proposal_id.clone()))
            .collect();

        let source = Arc::clone(&self.source);
        let cache = Arc::clone(&self.cache);
        let resolved: Vec<Option<Proposal>> = stream::iter(items)
            .map(move |item| {
                let source = Arc::clone(&source);
                let cache = Arc::clone(&cache);
                async move {
                    match source.proposal(&item.proposal_id).await {
                        Ok(mut proposal) => {
                            proposal.context = ProposalContext::Agenda {
                                scheduled_for: item.scheduled_for,
                                organ: item.organ,
                            };
                            if !proposal.status.is_empty() {
                                cache.insert(proposal.id.clone(), proposal.status.clone());
                            }
                            Some(proposal)
                        }
                        Err(error) => {
                            tracing::warn!(proposal = %item.proposal_id, %error, "agenda item could not be resolved");
                            None
                        }
                    }
                }
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        resolved.into_iter().flatten().collect()
    }
}
