//! Fixed, normalized vocabularies describing tramitation stages.

/// Situations after which a proposal can no longer move.
const TERMINAL_SITUATIONS: &[&str] = &[
    "arquivada",
    "arquivado",
    "transformada em norma juridica",
    "transformado em norma juridica",
    "transformada em lei",
    "transformado em lei",
    "perdeu a eficacia",
    "retirada pelo autor",
    "retirado pelo autor",
    "retirado pelo(a) autor(a)",
    "rejeitada",
    "rejeitado",
    "prejudicada",
    "prejudicado",
    "devolvida ao autor",
    "devolvido ao autor",
    "devolvida ao(a) autor(a)",
    "vetada totalmente",
    "vetado totalmente",
    "veto total",
];

/// Floor or committee agenda, or a vote pending: the item is about to be voted.
const AGENDA_SITUATIONS: &[&str] = &[
    "incluida na ordem do dia",
    "ordem do dia",
    "em pauta",
    "pronta para pauta",
    "materia em votacao",
    "em votacao",
    "aguardando votacao",
    "aguardando deliberacao",
];

const ACTIVE_SITUATIONS: &[&str] = &[
    "aguardando parecer",
    "aguardando designacao de relator",
    "em tramitacao",
];

const URGENT_REGIMES: &[&str] = &["urgencia", "urgente"];

/// Ceremonial proposals nobody wants alerts for, regardless of profile.
pub(crate) const GLOBAL_EXCLUSIONS: &[&str] = &[
    "institui o dia nacional",
    "inscreve o nome",
    "confere o titulo de",
];

pub(crate) fn is_terminal(situation: &str) -> bool {
    // "desarquivada" is a live situation that happens to contain "arquivada"
    let situation = situation.replace("desarquivad", "");
    crate::text::contains_any(&situation, TERMINAL_SITUATIONS)
}

pub(crate) fn is_on_agenda(situation: &str) -> bool {
    crate::text::contains_any(situation, AGENDA_SITUATIONS)
}

pub(crate) fn is_active(situation: &str) -> bool {
    crate::text::contains_any(situation, ACTIVE_SITUATIONS)
}

pub(crate) fn is_urgent(regime: &str) -> bool {
    crate::text::contains_any(regime, URGENT_REGIMES)
}

/// Relative weight of a proposal type, 1 to 5.
pub(crate) fn type_weight(type_code: &str) -> u8 {
    match type_code.trim().to_ascii_uppercase().as_str() {
        "PEC" => 5,
        "PLP" | "MPV" => 4,
        "PL" => 3,
        "PDL" => 2,
        _ => 1,
    }
}
