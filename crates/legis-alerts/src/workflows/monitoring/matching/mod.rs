mod classifier;
mod scoring;
mod vocabulary;

pub use classifier::AlertClassifier;
pub use scoring::{ScoreComponent, ScoreFactor};

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use super::domain::{Match, Proposal};
use super::profile::{InterestProfile, Theme};
use crate::text::{contains_term, normalize};
use scoring::ScoreInputs;

const MAX_MATCHED_KEYWORDS: usize = 10;

/// Why a proposal produced no match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    Terminal,
    Excluded(String),
    NoMatch,
}

/// Stateless matcher built once per run from the active profile.
pub struct MatchingEngine {
    exclusions: Vec<String>,
    themes: Vec<Theme>,
    priority_keywords: Vec<String>,
    priority_weight: u32,
}

impl MatchingEngine {
    pub fn new(profile: &InterestProfile) -> Self {
        let mut exclusions = profile.exclusions.clone();
        exclusions.extend(
            vocabulary::GLOBAL_EXCLUSIONS
                .iter()
                .map(|term| (*term).to_string()),
        );

        Self {
            exclusions,
            themes: profile.themes.clone(),
            priority_keywords: profile.priority_keywords.clone(),
            priority_weight: profile.priority_weight,
        }
    }

    pub fn evaluate(&self, proposal: &Proposal, detected_at: DateTime<Utc>) -> Option<Match> {
        match self.assess(proposal, detected_at) {
            Ok(found) => Some(found),
            Err(rejection) => {
                tracing::debug!(proposal = %proposal.id, ?rejection, "proposal not matched");
                None
            }
        }
    }

    /// Same as [`MatchingEngine::evaluate`] but reports the rejection reason.
    pub fn assess(&self, proposal: &Proposal, detected_at: DateTime<Utc>) -> Result<Match, Rejection> {
        let situation = normalize(&proposal.status.situation);
        if vocabulary::is_terminal(&situation) {
            return Err(Rejection::Terminal);
        }

        let analysis = format!(
            "{} {} {}",
            normalize(&proposal.summary),
            normalize(&proposal.keywords),
            normalize(&proposal.type_description)
        );

        if let Some(term) = self
            .exclusions
            .iter()
            .find(|term| contains_term(&analysis, term))
        {
            return Err(Rejection::Excluded(term.clone()));
        }

        let mut keywords: BTreeSet<String> = BTreeSet::new();

        let priority_hits: Vec<&String> = self
            .priority_keywords
            .iter()
            .filter(|term| contains_term(&analysis, term))
            .collect();
        keywords.extend(priority_hits.iter().map(|term| (*term).clone()));

        let mut matched_themes: Vec<&Theme> = Vec::new();
        for theme in &self.themes {
            if let Some(term) = theme
                .keywords
                .iter()
                .find(|term| contains_term(&analysis, term))
            {
                keywords.insert(term.clone());
                if !matched_themes.iter().any(|seen| seen.name == theme.name) {
                    matched_themes.push(theme);
                }
            }
        }

        if priority_hits.is_empty() && matched_themes.is_empty() {
            return Err(Rejection::NoMatch);
        }

        let (components, score) = scoring::score(&ScoreInputs {
            priority_hits: priority_hits.len(),
            priority_weight: self.priority_weight,
            themes: &matched_themes,
            type_code: &proposal.type_code,
            situation: &situation,
            regime: &normalize(&proposal.status.regime),
        });

        let level = AlertClassifier::classify(
            &proposal.status.situation,
            &proposal.status.regime,
            score,
        );
        let level = AlertClassifier::escalate(level, &proposal.context);

        Ok(Match {
            proposal_id: proposal.id.clone(),
            themes: matched_themes
                .iter()
                .map(|theme| theme.name.clone())
                .collect(),
            keywords: keywords.into_iter().take(MAX_MATCHED_KEYWORDS).collect(),
            score,
            components,
            level,
            detected_at,
        })
    }
}
