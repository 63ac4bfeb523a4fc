use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::matching::ScoreComponent;

/// Upstream legislative house a proposal was fetched from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalSource {
    Camara,
    Senado,
}

impl ProposalSource {
    pub fn prefix(&self) -> &'static str {
        match self {
            ProposalSource::Camara => "camara",
            ProposalSource::Senado => "senado",
        }
    }

    /// Public page where the proposal's tramitation can be followed.
    pub fn tracking_url(&self, native_id: &str) -> String {
        match self {
            ProposalSource::Camara => format!(
                "https://www.camara.leg.br/proposicoesWeb/fichadetramitacao?idProposicao={native_id}"
            ),
            ProposalSource::Senado => format!(
                "https://www25.senado.leg.br/web/atividade/materias/-/materia/{native_id}"
            ),
        }
    }
}

/// Identifier namespaced by source so chamber and senate ids never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProposalId {
    pub source: ProposalSource,
    pub native_id: String,
}

impl ProposalId {
    pub fn camara(native_id: impl Into<String>) -> Self {
        Self {
            source: ProposalSource::Camara,
            native_id: native_id.into(),
        }
    }

    pub fn tracking_url(&self) -> String {
        self.source.tracking_url(&self.native_id)
    }
}

impl fmt::Display for ProposalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source.prefix(), self.native_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{0}' is not a namespaced proposal id (expected camara:<id> or senado:<id>)")]
pub struct ParseProposalIdError(String);

impl FromStr for ProposalId {
    type Err = ParseProposalIdError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (prefix, native_id) = value
            .split_once(':')
            .ok_or_else(|| ParseProposalIdError(value.to_string()))?;
        let source = match prefix {
            "camara" => ProposalSource::Camara,
            "senado" => ProposalSource::Senado,
            _ => return Err(ParseProposalIdError(value.to_string())),
        };
        if native_id.trim().is_empty() {
            return Err(ParseProposalIdError(value.to_string()));
        }
        Ok(Self {
            source,
            native_id: native_id.to_string(),
        })
    }
}

impl TryFrom<String> for ProposalId {
    type Error = ParseProposalIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ProposalId> for String {
    fn from(value: ProposalId) -> Self {
        value.to_string()
    }
}

/// Current tramitation status as reported upstream; refreshed on every poll.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub situation: String,
    pub organ: String,
    pub status_at: String,
    pub dispatch: String,
    pub regime: String,
    pub rapporteur: String,
}

impl StatusSnapshot {
    pub fn is_empty(&self) -> bool {
        self.situation.is_empty() && self.organ.is_empty() && self.status_at.is_empty()
    }

    /// Fill blank fields from `fallback`, keeping anything this snapshot already has.
    pub fn or(self, fallback: &StatusSnapshot) -> StatusSnapshot {
        fn pick(primary: String, fallback: &str) -> String {
            if primary.trim().is_empty() {
                fallback.to_string()
            } else {
                primary
            }
        }

        StatusSnapshot {
            situation: pick(self.situation, &fallback.situation),
            organ: pick(self.organ, &fallback.organ),
            status_at: pick(self.status_at, &fallback.status_at),
            dispatch: pick(self.dispatch, &fallback.dispatch),
            regime: pick(self.regime, &fallback.regime),
            rapporteur: pick(self.rapporteur, &fallback.rapporteur),
        }
    }
}

/// How a proposal entered the current cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProposalContext {
    #[default]
    Listing,
    Agenda {
        scheduled_for: String,
        organ: String,
    },
}

impl ProposalContext {
    pub fn is_agenda(&self) -> bool {
        matches!(self, ProposalContext::Agenda { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: ProposalId,
    pub type_code: String,
    pub type_description: String,
    pub number: u32,
    pub year: u32,
    pub summary: String,
    pub keywords: String,
    pub status: StatusSnapshot,
    pub context: ProposalContext,
}

impl Proposal {
    /// Display label such as `PEC 10/2025`, falling back to the raw id.
    pub fn label(&self) -> String {
        let type_code = self.type_code.trim();
        if !type_code.is_empty() && self.number > 0 && self.year > 0 {
            format!("{type_code} {}/{}", self.number, self.year)
        } else {
            format!("ID {}", self.id.native_id)
        }
    }
}

/// Severity ordered from least to most urgent so `Ord` reads naturally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertLevel {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl AlertLevel {
    pub fn emoji(&self) -> &'static str {
        match self {
            AlertLevel::Critical => "🚨",
            AlertLevel::High => "⚠️",
            AlertLevel::Medium => "🔔",
            AlertLevel::Low => "📋",
            AlertLevel::Info => "ℹ️",
        }
    }

    pub fn headline(&self) -> &'static str {
        match self {
            AlertLevel::Critical => "CRÍTICO",
            AlertLevel::High => "ALTO",
            AlertLevel::Medium => "MÉDIO",
            AlertLevel::Low => "BAIXO",
            AlertLevel::Info => "INFO",
        }
    }
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AlertLevel::Critical => "CRITICAL",
            AlertLevel::High => "HIGH",
            AlertLevel::Medium => "MEDIUM",
            AlertLevel::Low => "LOW",
            AlertLevel::Info => "INFO",
        };
        f.write_str(label)
    }
}

/// Outcome of matching one proposal against the active profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub proposal_id: ProposalId,
    pub themes: BTreeSet<String>,
    pub keywords: Vec<String>,
    pub score: u8,
    pub components: Vec<ScoreComponent>,
    pub level: AlertLevel,
    pub detected_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proposal_ids_are_namespaced() {
        let id = ProposalId::camara("2501234");
        assert_eq!(id.to_string(), "camara:2501234");
        assert_eq!("camara:2501234".parse::<ProposalId>(), Ok(id.clone()));
        assert_ne!(
            "senado:2501234".parse::<ProposalId>().expect("valid id"),
            id
        );
        assert!("2501234".parse::<ProposalId>().is_err());
        assert!("camara:".parse::<ProposalId>().is_err());
    }

    #[test]
    fn proposal_id_serializes_as_string() {
        let id = ProposalId::camara("42");
        let json = serde_json::to_string(&id).expect("serializes");
        assert_eq!(json, "\"camara:42\"");
    }

    #[test]
    fn alert_levels_order_by_urgency() {
        assert!(AlertLevel::Critical > AlertLevel::High);
        assert!(AlertLevel::High > AlertLevel::Medium);
        assert!(AlertLevel::Medium > AlertLevel::Low);
        assert!(AlertLevel::Low > AlertLevel::Info);
    }

    #[test]
    fn snapshot_fallback_fills_only_blank_fields() {
        let fresh = StatusSnapshot {
            situation: "Aguardando Parecer".to_string(),
            ..StatusSnapshot::default()
        };
        let listing = StatusSnapshot {
            situation: "Em tramitação".to_string(),
            organ: "CFT".to_string(),
            ..StatusSnapshot::default()
        };
        let merged = fresh.or(&listing);
        assert_eq!(merged.situation, "Aguardando Parecer");
        assert_eq!(merged.organ, "CFT");
    }
}
