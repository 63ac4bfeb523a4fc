use super::vocabulary;
use crate::text::normalize;
use crate::workflows::monitoring::domain::{AlertLevel, ProposalContext};

/// Maps a proposal's procedural state and score onto a severity.
pub struct AlertClassifier;

impl AlertClassifier {
    /// Pure: the same `(situation, regime, score)` always yields the same level.
    pub fn classify(situation: &str, regime: &str, score: u8) -> AlertLevel {
        let situation = normalize(situation);
        let regime = normalize(regime);

        if vocabulary::is_on_agenda(&situation) {
            AlertLevel::Critical
        } else if vocabulary::is_urgent(&regime) {
            AlertLevel::High
        } else if score >= 70 {
            AlertLevel::High
        } else if score >= 50 {
            AlertLevel::Medium
        } else if score >= 30 {
            AlertLevel::Low
        } else {
            AlertLevel::Info
        }
    }

    /// Agenda arrivals are always critical.
    pub fn escalate(level: AlertLevel, context: &ProposalContext) -> AlertLevel {
        if context.is_agenda() {
            AlertLevel::Critical
        } else {
            level
        }
    }
}
