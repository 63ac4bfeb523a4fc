//! Adapter for the Câmara dos Deputados open-data API (v2).

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::{AgendaItem, DateWindow, LegislativeSource, ListingQuery, Page, SourceError};
use crate::text::normalize;
use crate::workflows::monitoring::domain::{
    Proposal, ProposalContext, ProposalId, ProposalSource, StatusSnapshot,
};

const USER_AGENT: &str = concat!("legis-alerts/", env!("CARGO_PKG_VERSION"));
const PLENARY: &str = "PLEN";
const MAX_EVENTS: usize = 200;

pub struct CamaraClient {
    http: reqwest::Client,
    base_url: String,
}

impl CamaraClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, SourceError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<Envelope<T>, SourceError> {
        let body = self
            .http
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .query(query)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        serde_json::from_str(&body).map_err(|error| SourceError::Decode {
            url: url.to_string(),
            message: error.to_string(),
        })
    }

    fn native_id<'a>(&self, id: &'a ProposalId) -> Result<&'a str, SourceError> {
        if id.source == ProposalSource::Camara {
            Ok(&id.native_id)
        } else {
            Err(SourceError::ForeignId(id.clone()))
        }
    }

    async fn events(&self, window: &DateWindow) -> Result<Vec<WireEvent>, SourceError> {
        let mut events = Vec::new();
        let first_url = format!("{}/eventos", self.base_url);
        let mut envelope: Envelope<Vec<WireEvent>> = self
            .get_json(
                &first_url,
                &[
                    ("dataInicio", window.start.format("%Y-%m-%d").to_string()),
                    ("dataFim", window.end.format("%Y-%m-%d").to_string()),
                    ("ordem", "ASC".to_string()),
                    ("ordenarPor", "dataHoraInicio".to_string()),
                    ("itens", "100".to_string()),
                ],
            )
            .await?;

        loop {
            let next = next_link(&envelope.links).map(str::to_string);
            events.append(&mut envelope.dados);
            match next {
                Some(url) if events.len() < MAX_EVENTS => {
                    self.check_cursor(&url)?;
                    envelope = self.get_json(&url, &[]).await?;
                }
                _ => break,
            }
        }

        events.truncate(MAX_EVENTS);
        Ok(events)
    }

    fn check_cursor(&self, cursor: &str) -> Result<(), SourceError> {
        if cursor.starts_with(&self.base_url) {
            Ok(())
        } else {
            Err(SourceError::InvalidUrl(cursor.to_string()))
        }
    }
}

#[async_trait::async_trait]
impl LegislativeSource for CamaraClient {
    async fn list_page(
        &self,
        query: &ListingQuery,
        cursor: Option<&str>,
    ) -> Result<Page<Proposal>, SourceError> {
        let envelope: Envelope<Vec<WireProposal>> = match cursor {
            Some(url) => {
                self.check_cursor(url)?;
                self.get_json(url, &[]).await?
            }
            None => {
                let url = format!("{}/proposicoes", self.base_url);
                self.get_json(
                    &url,
                    &[
                        ("siglaTipo", query.type_code.clone()),
                        ("dataInicio", query.window.start.format("%Y-%m-%d").to_string()),
                        ("dataFim", query.window.end.format("%Y-%m-%d").to_string()),
                        ("ordem", "DESC".to_string()),
                        ("ordenarPor", "id".to_string()),
                        ("itens", query.page_size.to_string()),
                    ],
                )
                .await?
            }
        };

        Ok(Page {
            next: next_link(&envelope.links).map(str::to_string),
            items: envelope
                .dados
                .into_iter()
                .map(WireProposal::into_proposal)
                .collect(),
        })
    }

    async fn proposal(&self, id: &ProposalId) -> Result<Proposal, SourceError> {
        let native_id = self.native_id(id)?;
        let url = format!("{}/proposicoes/{native_id}", self.base_url);
        let envelope: Envelope<WireProposal> = self.get_json(&url, &[]).await?;
        Ok(envelope.dados.into_proposal())
    }

    async fn status(&self, id: &ProposalId) -> Result<StatusSnapshot, SourceError> {
        Ok(self.proposal(id).await?.status)
    }

    async fn agenda(
        &self,
        window: &DateWindow,
        committees: &[String],
    ) -> Result<Vec<AgendaItem>, SourceError> {
        let events = self.events(window).await?;
        let mut items = Vec::new();

        for event in events
            .into_iter()
            .filter(|event| event.is_relevant(committees))
        {
            let url = format!("{}/eventos/{}/pauta", self.base_url, event.id);
            let envelope: Envelope<Vec<WireAgendaEntry>> = match self.get_json(&url, &[]).await {
                Ok(envelope) => envelope,
                Err(error) => {
                    tracing::warn!(event = event.id, %error, "event agenda unavailable");
                    continue;
                }
            };

            let organ = event.organ(committees);
            let scheduled_for = event.data_hora_inicio.clone().unwrap_or_default();
            items.extend(envelope.dados.into_iter().filter_map(|entry| {
                entry.proposal_id().map(|native_id| AgendaItem {
                    proposal_id: ProposalId::camara(native_id),
                    scheduled_for: scheduled_for.clone(),
                    organ: organ.clone(),
                })
            }));
        }

        Ok(items)
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    dados: T,
    #[serde(default)]
    links: Vec<WireLink>,
}

#[derive(Debug, Deserialize)]
struct WireLink {
    rel: String,
    href: String,
}

fn next_link(links: &[WireLink]) -> Option<&str> {
    links
        .iter()
        .find(|link| link.rel == "next")
        .map(|link| link.href.as_str())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireProposal {
    id: u64,
    sigla_tipo: Option<String>,
    numero: Option<u32>,
    ano: Option<u32>,
    ementa: Option<String>,
    keywords: Option<String>,
    descricao_tipo: Option<String>,
    status_proposicao: Option<WireStatus>,
}

impl WireProposal {
    fn into_proposal(self) -> Proposal {
        Proposal {
            id: ProposalId::camara(self.id.to_string()),
            type_code: self.sigla_tipo.unwrap_or_default().trim().to_string(),
            type_description: self.descricao_tipo.unwrap_or_default(),
            number: self.numero.unwrap_or_default(),
            year: self.ano.unwrap_or_default(),
            summary: self.ementa.unwrap_or_default(),
            keywords: self.keywords.unwrap_or_default(),
            status: self
                .status_proposicao
                .map(WireStatus::into_snapshot)
                .unwrap_or_default(),
            context: ProposalContext::Listing,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireStatus {
    data_hora: Option<String>,
    sigla_orgao: Option<String>,
    regime: Option<String>,
    descricao_situacao: Option<String>,
    despacho: Option<String>,
    nome_relator: Option<String>,
}

impl WireStatus {
    fn into_snapshot(self) -> StatusSnapshot {
        StatusSnapshot {
            situation: self.descricao_situacao.unwrap_or_default(),
            organ: self.sigla_orgao.unwrap_or_default(),
            status_at: self.data_hora.unwrap_or_default(),
            dispatch: self.despacho.unwrap_or_default(),
            regime: self.regime.unwrap_or_default(),
            rapporteur: self.nome_relator.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireEvent {
    id: u64,
    data_hora_inicio: Option<String>,
    situacao: Option<String>,
    #[serde(default)]
    orgaos: Vec<WireOrgan>,
}

#[derive(Debug, Deserialize)]
struct WireOrgan {
    sigla: Option<String>,
}

impl WireEvent {
    fn sigla_list(&self) -> impl Iterator<Item = String> + '_ {
        self.orgaos
            .iter()
            .filter_map(|organ| organ.sigla.as_deref())
            .map(|sigla| sigla.trim().to_ascii_uppercase())
    }

    /// Held by a strategic committee (or the plenary when none are
    /// configured) and not cancelled.
    fn is_relevant(&self, committees: &[String]) -> bool {
        let cancelled = self
            .situacao
            .as_deref()
            .map(|situation| normalize(situation).contains("cancelad"))
            .unwrap_or(false);
        if cancelled {
            return false;
        }

        let mut siglas = self.sigla_list();
        if committees.is_empty() {
            siglas.any(|sigla| sigla == PLENARY)
        } else {
            siglas.any(|sigla| committees.iter().any(|code| *code == sigla))
        }
    }

    fn organ(&self, committees: &[String]) -> String {
        self.sigla_list()
            .find(|sigla| committees.is_empty() || committees.contains(sigla))
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct WireAgendaEntry {
    #[serde(rename = "proposicao_")]
    proposicao: Option<WireReference>,
}

#[derive(Debug, Deserialize)]
struct WireReference {
    id: Option<u64>,
    uri: Option<String>,
}

impl WireAgendaEntry {
    fn proposal_id(&self) -> Option<String> {
        let reference = self.proposicao.as_ref()?;
        if let Some(id) = reference.id.filter(|id| *id > 0) {
            return Some(id.to_string());
        }
        reference
            .uri
            .as_deref()
            .and_then(|uri| uri.trim_end_matches('/').rsplit('/').next())
            .filter(|segment| !segment.is_empty() && segment.chars().all(|c| c.is_ascii_digit()))
            .map(str::to_string)
    }
}
