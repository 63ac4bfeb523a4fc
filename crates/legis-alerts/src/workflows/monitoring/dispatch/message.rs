//! Channel-neutral message documents for every notification the monitor sends.

use chrono::{DateTime, TimeZone};
use serde::Serialize;

use crate::text::truncate_chars;
use crate::workflows::monitoring::domain::{Match, Proposal, ProposalContext};

const SUMMARY_PREVIEW: usize = 240;
const DIGEST_PREVIEW: usize = 12;

/// Deployment identity shown in titles and footers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branding {
    pub name: String,
    pub panel_url: Option<String>,
}

impl Branding {
    fn panel_link(&self) -> Option<Link> {
        self.panel_url.as_ref().map(|url| Link {
            icon: "🖥️".to_string(),
            label: "Abrir painel".to_string(),
            url: url.clone(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Block {
    Heading(String),
    Emphasis(String),
    Text(String),
    Field { label: String, value: String },
    Bullet(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Section {
    pub blocks: Vec<Block>,
}

impl Section {
    fn of(blocks: Vec<Block>) -> Self {
        Self { blocks }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Link {
    pub icon: String,
    pub label: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub icon: String,
    pub title: String,
    /// E-mail subject line.
    pub subject: String,
    pub sections: Vec<Section>,
    pub links: Vec<Link>,
}

impl Message {
    pub fn greeting<Tz: TimeZone>(branding: &Branding, now: &DateTime<Tz>) -> Self
    where
        Tz::Offset: std::fmt::Display,
    {
        Self {
            icon: "☀️".to_string(),
            title: format!("Bom dia! {}", branding.name),
            subject: format!("☀️ {} - Bom dia", branding.name),
            sections: vec![
                Section::of(vec![Block::Emphasis(format!(
                    "{} - Varredura automática ativada.",
                    now.format("%d/%m/%Y")
                ))]),
                Section::of(vec![
                    Block::Bullet("Canal em tempo real recebe status e alertas".to_string()),
                    Block::Bullet(
                        "E-mail recebe somente quando houver match e o resumo do dia".to_string(),
                    ),
                ]),
            ],
            links: branding.panel_link().into_iter().collect(),
        }
    }

    /// Verbose after a scan that found news, terse after a quiet one.
    pub fn no_news<Tz: TimeZone>(branding: &Branding, now: &DateTime<Tz>, verbose: bool) -> Self
    where
        Tz::Offset: std::fmt::Display,
    {
        let time = now.format("%H:%M");
        if !verbose {
            return Self {
                icon: "✅".to_string(),
                title: format!("{}: sem novidades ({time}).", branding.name),
                subject: format!("✅ {} - Sem novidades", branding.name),
                sections: Vec::new(),
                links: Vec::new(),
            };
        }

        Self {
            icon: "✅".to_string(),
            title: branding.name.clone(),
            subject: format!("✅ {} - Sem novidades", branding.name),
            sections: vec![Section::of(vec![
                Block::Text(format!("Sem novos matches nesta varredura ({time}).")),
                Block::Text(
                    "Isso é bom: nada novo bateu nos temas e palavras configurados.".to_string(),
                ),
            ])],
            links: branding.panel_link().into_iter().collect(),
        }
    }

    pub fn match_alert(branding: &Branding, proposal: &Proposal, found: &Match) -> Self {
        let label = proposal.label();
        let status = &proposal.status;

        let themes = if found.themes.is_empty() {
            "Palavras-chave (geral)".to_string()
        } else {
            found.themes.iter().cloned().collect::<Vec<_>>().join(", ")
        };
        let triggers = if found.keywords.is_empty() {
            "-".to_string()
        } else {
            found.keywords.join(", ")
        };
        let breakdown = found
            .components
            .iter()
            .map(|component| format!("{} +{}", component.notes, component.score))
            .collect::<Vec<_>>()
            .join(", ");

        let mut fields = vec![
            field("Status", or_placeholder(&status.situation, "Em tramitação")),
            field("Órgão", or_placeholder(&status.organ, "—")),
            field("Relator(a)", or_placeholder(&status.rapporteur, "—")),
        ];
        if let ProposalContext::Agenda {
            scheduled_for,
            organ,
        } = &proposal.context
        {
            fields.push(field(
                "Pauta",
                format!(
                    "{} {}",
                    or_placeholder(organ, "—"),
                    or_placeholder(scheduled_for, "")
                )
                .trim()
                .to_string(),
            ));
        }
        fields.push(field("Temas", themes));
        fields.push(field("Gatilhos", triggers));
        fields.push(field("Relevância", format!("{}/100", found.score)));
        if !breakdown.is_empty() {
            fields.push(Block::Emphasis(breakdown));
        }

        let mut links = vec![Link {
            icon: "🔗".to_string(),
            label: "Ver tramitação".to_string(),
            url: proposal.id.tracking_url(),
        }];
        links.extend(branding.panel_link());

        Self {
            icon: found.level.emoji().to_string(),
            title: format!("{} | {}", branding.name, found.level.headline()),
            subject: format!(
                "{} {} | Match: {label}",
                found.level.emoji(),
                branding.name
            ),
            sections: vec![
                Section::of(vec![
                    Block::Heading(label.clone()),
                    Block::Emphasis(truncate_chars(&proposal.summary, SUMMARY_PREVIEW)),
                ]),
                Section::of(fields),
            ],
            links,
        }
    }

    pub fn daily_summary<Tz: TimeZone>(
        branding: &Branding,
        now: &DateTime<Tz>,
        labels: &[String],
    ) -> Self
    where
        Tz::Offset: std::fmt::Display,
    {
        let body = if labels.is_empty() {
            vec![Block::Text("Nenhum match foi detectado hoje.".to_string())]
        } else {
            let mut blocks = vec![Block::Heading(format!("Matches do dia ({}):", labels.len()))];
            blocks.extend(
                labels
                    .iter()
                    .take(DIGEST_PREVIEW)
                    .map(|label| Block::Bullet(label.clone())),
            );
            if labels.len() > DIGEST_PREVIEW {
                blocks.push(Block::Text(format!(
                    "… +{} item(ns)",
                    labels.len() - DIGEST_PREVIEW
                )));
            }
            blocks
        };

        Self {
            icon: "🌙".to_string(),
            title: format!(
                "Resumo do Dia - {} ({})",
                branding.name,
                now.format("%d/%m/%Y")
            ),
            subject: format!("🌙 {} - Resumo do Dia", branding.name),
            sections: vec![Section::of(body)],
            links: branding.panel_link().into_iter().collect(),
        }
    }
}

fn field(label: &str, value: String) -> Block {
    Block::Field {
        label: label.to_string(),
        value,
    }
}

fn or_placeholder(value: &str, placeholder: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        placeholder.to_string()
    } else {
        value.to_string()
    }
}
