use chrono::{TimeZone, Utc};

use super::common::{pec_icms, proposal, tax_profile, theme};
use crate::workflows::monitoring::domain::{AlertLevel, ProposalContext};
use crate::workflows::monitoring::matching::{MatchingEngine, Rejection, ScoreFactor};
use crate::workflows::monitoring::profile::InterestProfile;

fn detected_at() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, 15, 0, 0)
        .single()
        .expect("valid instant")
}

#[test]
fn pec_on_tax_theme_scores_medium() {
    let engine = MatchingEngine::new(&tax_profile());
    let found = engine
        .evaluate(&pec_icms(), detected_at())
        .expect("proposal should match");

    assert_eq!(found.themes.iter().map(String::as_str).collect::<Vec<_>>(), vec!["Tributário"]);
    assert_eq!(found.keywords, vec!["icms".to_string()]);
    assert_eq!(found.score, 50);
    assert_eq!(found.level, AlertLevel::Medium);

    let factors: Vec<ScoreFactor> = found.components.iter().map(|c| c.factor).collect();
    assert_eq!(
        factors,
        vec![ScoreFactor::Theme, ScoreFactor::ProposalType, ScoreFactor::Procedure]
    );
    let total: u32 = found.components.iter().map(|c| u32::from(c.score)).sum();
    assert_eq!(total, 50);
}

#[test]
fn order_of_the_day_is_critical() {
    let engine = MatchingEngine::new(&tax_profile());
    let mut pec = pec_icms();
    pec.status.situation = "Incluída na Ordem do Dia".to_string();

    let found = engine.evaluate(&pec, detected_at()).expect("match");
    assert_eq!(found.level, AlertLevel::Critical);
}

#[test]
fn agenda_context_forces_critical() {
    let engine = MatchingEngine::new(&tax_profile());
    let mut pec = pec_icms();
    pec.status.situation = "Aguardando Designação de Relator".to_string();
    pec.context = ProposalContext::Agenda {
        scheduled_for: "2025-03-11T10:00".to_string(),
        organ: "CFT".to_string(),
    };

    let found = engine.evaluate(&pec, detected_at()).expect("match");
    assert_eq!(found.level, AlertLevel::Critical);
}

#[test]
fn terminal_situations_never_match() {
    let engine = MatchingEngine::new(&tax_profile());
    for situation in ["Arquivada", "Transformado em Norma Jurídica", "Retirado pelo Autor"] {
        let mut pec = pec_icms();
        pec.status.situation = situation.to_string();
        assert_eq!(
            engine.assess(&pec, detected_at()).map(|found| found.score),
            Err(Rejection::Terminal),
            "{situation}"
        );
    }
}

#[test]
fn unarchived_proposals_are_not_terminal() {
    let engine = MatchingEngine::new(&tax_profile());
    let mut pec = pec_icms();
    pec.status.situation = "Desarquivada".to_string();
    assert!(engine.evaluate(&pec, detected_at()).is_some());
}

#[test]
fn exclusions_win_over_keywords() {
    let profile = InterestProfile {
        exclusions: vec!["homenagem".to_string()],
        priority_keywords: vec!["servidor".to_string()],
        ..tax_profile()
    };
    let engine = MatchingEngine::new(&profile);
    let tribute = proposal("77", "PL", "Homenagem aos servidores do ICMS", "aguardando parecer");

    assert_eq!(
        engine.assess(&tribute, detected_at()).map(|found| found.score),
        Err(Rejection::Excluded("homenagem".to_string()))
    );
    assert!(engine.evaluate(&tribute, detected_at()).is_none());
}

#[test]
fn ceremonial_bills_are_excluded_for_every_profile() {
    let engine = MatchingEngine::new(&tax_profile());
    let ceremonial = proposal("78", "PL", "Institui o Dia Nacional do Fiscal do ICMS", "");
    assert!(matches!(
        engine.assess(&ceremonial, detected_at()),
        Err(Rejection::Excluded(_))
    ));
}

#[test]
fn unrelated_proposals_report_no_match() {
    let engine = MatchingEngine::new(&tax_profile());
    let unrelated = proposal("79", "PL", "Dispõe sobre o trânsito urbano", "");
    assert_eq!(
        engine.assess(&unrelated, detected_at()).map(|found| found.score),
        Err(Rejection::NoMatch)
    );
}

#[test]
fn matching_ignores_accents_and_case() {
    let profile = InterestProfile {
        priority_keywords: vec![crate::text::normalize("Previdência")],
        ..tax_profile()
    };
    let engine = MatchingEngine::new(&profile);
    let pension = proposal("80", "PL", "ALTERA A PREVIDENCIA COMPLEMENTAR", "");

    let found = engine.evaluate(&pension, detected_at()).expect("match");
    assert_eq!(found.keywords, vec!["previdencia".to_string()]);
    assert!(found.themes.is_empty());
}

#[test]
fn keyword_fields_and_type_description_are_searched() {
    let engine = MatchingEngine::new(&tax_profile());
    let mut bill = proposal("81", "PLP", "Altera a Lei Complementar nº 87", "");
    assert!(engine.evaluate(&bill, detected_at()).is_none());

    bill.keywords = "Imposto, ICMS, Substituição tributária".to_string();
    assert!(engine.evaluate(&bill, detected_at()).is_some());
}

#[test]
fn matched_keywords_are_sorted_and_capped() {
    let terms: Vec<String> = (b'a'..=b'l')
        .map(|c| format!("termo{}", c as char))
        .collect();
    let profile = InterestProfile {
        priority_keywords: terms.clone(),
        ..tax_profile()
    };
    let engine = MatchingEngine::new(&profile);
    let bill = proposal("82", "PL", &terms.join(" "), "");

    let found = engine.evaluate(&bill, detected_at()).expect("match");
    assert_eq!(found.keywords.len(), 10);
    let mut sorted = found.keywords.clone();
    sorted.sort();
    assert_eq!(found.keywords, sorted);
    assert_eq!(found.keywords.first().map(String::as_str), Some("termoa"));
}

#[test]
fn more_themes_never_lower_the_score() {
    let profile = InterestProfile {
        themes: vec![
            theme("Tributário", &["icms"], 10),
            theme("Saúde", &["medicamento"], 10),
            theme("Energia", &["energia"], 10),
            theme("Trabalho", &["jornada"], 10),
        ],
        ..tax_profile()
    };
    let engine = MatchingEngine::new(&profile);
    let summaries = [
        "icms",
        "icms sobre medicamento",
        "icms sobre medicamento e energia",
        "icms sobre medicamento, energia e jornada",
    ];

    let scores: Vec<u8> = summaries
        .iter()
        .map(|summary| {
            engine
                .evaluate(&proposal("83", "PL", summary, ""), detected_at())
                .expect("match")
                .score
        })
        .collect();
    assert!(scores.windows(2).all(|pair| pair[0] <= pair[1]), "{scores:?}");
}

#[test]
fn scores_are_clamped_to_one_hundred() {
    let profile = InterestProfile {
        themes: vec![
            theme("Tributário", &["icms"], 100),
            theme("Saúde", &["medicamento"], 100),
        ],
        priority_keywords: vec!["icms".to_string(), "medicamento".to_string()],
        priority_weight: 100,
        ..tax_profile()
    };
    let engine = MatchingEngine::new(&profile);
    let pec = proposal("84", "PEC", "icms sobre medicamento", "Pronta para Pauta");

    let found = engine.evaluate(&pec, detected_at()).expect("match");
    assert_eq!(found.score, 100);
}

#[test]
fn evaluation_is_deterministic() {
    let engine = MatchingEngine::new(&InterestProfile::template());
    let bill = proposal(
        "85",
        "PLP",
        "Reforma tributária: ICMS sobre energia elétrica e medicamentos",
        "Aguardando Parecer do Relator",
    );
    let first = engine.evaluate(&bill, detected_at());
    let second = engine.evaluate(&bill, detected_at());
    assert!(first.is_some());
    assert_eq!(first, second);
}

#[test]
fn more_priority_keywords_never_lower_the_score() {
    let profile = InterestProfile {
        priority_keywords: vec![
            "icms".to_string(),
            "ipi".to_string(),
            "pis".to_string(),
            "cofins".to_string(),
            "iss".to_string(),
        ],
        priority_weight: 12,
        themes: Vec::new(),
        ..tax_profile()
    };
    let engine = MatchingEngine::new(&profile);
    let summaries = ["icms", "icms ipi", "icms ipi pis", "icms ipi pis cofins", "icms ipi pis cofins iss"];

    let scores: Vec<u8> = summaries
        .iter()
        .map(|summary| {
            engine
                .evaluate(&proposal("86", "PL", summary, ""), detected_at())
                .expect("match")
                .score
        })
        .collect();
    assert!(scores.windows(2).all(|pair| pair[0] <= pair[1]), "{scores:?}");
    assert_eq!(scores[4], 52);
}
