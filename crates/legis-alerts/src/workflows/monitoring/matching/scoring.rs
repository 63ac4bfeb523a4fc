use serde::{Deserialize, Serialize};

use super::vocabulary;
use crate::workflows::monitoring::profile::Theme;

const PRIORITY_CAP: u32 = 40;
const THEME_CAP: u32 = 15;
const MULTI_THEME_BONUS: u32 = 15;
const TYPE_MULTIPLIER: u32 = 4;
const AGENDA_POINTS: u32 = 25;
const ACTIVE_POINTS: u32 = 20;
const URGENT_POINTS: u32 = 15;
const MAX_SCORE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreFactor {
    PriorityKeywords,
    Theme,
    MultiTheme,
    ProposalType,
    Procedure,
}

/// Discrete contribution to a relevance score, kept for the alert breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreComponent {
    pub factor: ScoreFactor,
    pub score: u8,
    pub notes: String,
}

pub(crate) struct ScoreInputs<'a> {
    pub priority_hits: usize,
    pub priority_weight: u32,
    pub themes: &'a [&'a Theme],
    pub type_code: &'a str,
    /// Normalized situation text.
    pub situation: &'a str,
    /// Normalized regime text.
    pub regime: &'a str,
}

pub(crate) fn score(inputs: &ScoreInputs<'_>) -> (Vec<ScoreComponent>, u8) {
    let mut components = Vec::new();

    if inputs.priority_hits > 0 {
        let hits = u32::try_from(inputs.priority_hits).unwrap_or(u32::MAX);
        let points = hits.saturating_mul(inputs.priority_weight).min(PRIORITY_CAP);
        push(
            &mut components,
            ScoreFactor::PriorityKeywords,
            points,
            format!("{hits} palavra(s)-chave prioritária(s)"),
        );
    }

    for theme in inputs.themes {
        push(
            &mut components,
            ScoreFactor::Theme,
            theme.weight.min(THEME_CAP),
            format!("tema {}", theme.name),
        );
    }

    if inputs.themes.len() >= 2 {
        push(
            &mut components,
            ScoreFactor::MultiTheme,
            MULTI_THEME_BONUS,
            format!("{} temas simultâneos", inputs.themes.len()),
        );
    }

    let type_points = u32::from(vocabulary::type_weight(inputs.type_code)) * TYPE_MULTIPLIER;
    push(
        &mut components,
        ScoreFactor::ProposalType,
        type_points,
        format!("tipo {}", inputs.type_code.trim().to_ascii_uppercase()),
    );

    let procedure = if vocabulary::is_on_agenda(inputs.situation) {
        Some((AGENDA_POINTS, "em pauta"))
    } else if vocabulary::is_active(inputs.situation) {
        Some((ACTIVE_POINTS, "tramitação ativa"))
    } else if vocabulary::is_urgent(inputs.regime) {
        Some((URGENT_POINTS, "regime de urgência"))
    } else {
        None
    };
    if let Some((points, notes)) = procedure {
        push(&mut components, ScoreFactor::Procedure, points, notes.to_string());
    }

    let total: u32 = components
        .iter()
        .map(|component| u32::from(component.score))
        .sum();
    let total = total.min(MAX_SCORE) as u8;

    (components, total)
}

fn push(components: &mut Vec<ScoreComponent>, factor: ScoreFactor, points: u32, notes: String) {
    if points == 0 {
        return;
    }
    components.push(ScoreComponent {
        factor,
        score: points.min(MAX_SCORE) as u8,
        notes,
    });
}
