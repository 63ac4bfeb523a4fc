use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::text::normalize;

const DEFAULT_THEME_WEIGHT: i64 = 10;
const DEFAULT_PRIORITY_WEIGHT: i64 = 10;
const DEFAULT_MONITORED_TYPES: [&str; 5] = ["PL", "PLP", "PEC", "MPV", "PDL"];

/// Named group of keywords with an integer weight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Theme {
    pub name: String,
    pub keywords: Vec<String>,
    pub weight: u32,
}

/// Hour window (0-23, operating timezone) during which non-critical
/// real-time notifications are held back. May wrap past midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuietHours {
    #[serde(alias = "inicio")]
    pub start: u8,
    #[serde(alias = "fim")]
    pub end: u8,
}

impl QuietHours {
    pub fn contains(&self, hour: u32) -> bool {
        let start = u32::from(self.start);
        let end = u32::from(self.end);
        if start > end {
            hour >= start || hour < end
        } else {
            start <= hour && hour < end
        }
    }
}

/// Validated client interest profile. Every term is stored normalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InterestProfile {
    pub client_id: String,
    pub display_name: String,
    pub exclusions: Vec<String>,
    pub themes: Vec<Theme>,
    pub priority_keywords: Vec<String>,
    pub priority_weight: u32,
    pub quiet_hours: Option<QuietHours>,
    pub monitored_types: Vec<String>,
    pub committees: Vec<String>,
}

impl InterestProfile {
    /// Profile that matches nothing; used when the configured file is unusable.
    pub fn empty() -> Self {
        Self {
            client_id: "empty".to_string(),
            display_name: String::new(),
            exclusions: Vec::new(),
            themes: Vec::new(),
            priority_keywords: Vec::new(),
            priority_weight: DEFAULT_PRIORITY_WEIGHT as u32,
            quiet_hours: None,
            monitored_types: default_types(),
            committees: Vec::new(),
        }
    }

    /// Demo profile built from the stock theme catalogue.
    pub fn template() -> Self {
        let themes = TEMPLATE_THEMES
            .iter()
            .map(|(name, keywords)| Theme {
                name: (*name).to_string(),
                keywords: normalize_all(keywords.iter().copied()),
                weight: DEFAULT_THEME_WEIGHT as u32,
            })
            .collect();

        Self {
            client_id: "demo".to_string(),
            display_name: "Empresa Demo".to_string(),
            exclusions: Vec::new(),
            themes,
            priority_keywords: normalize_all(["reforma tributária", "medicamento", "energia"]),
            priority_weight: DEFAULT_PRIORITY_WEIGHT as u32,
            quiet_hours: None,
            monitored_types: default_types(),
            committees: vec!["CFT".to_string(), "CSSF".to_string(), "CME".to_string()],
        }
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ProfileError> {
        let file: ProfileFile = toml::from_str(raw)?;
        file.validate()
    }

    pub fn load(path: &Path) -> Result<Self, ProfileError> {
        let raw = std::fs::read_to_string(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                ProfileError::Missing(path.to_path_buf())
            } else {
                ProfileError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        Self::from_toml_str(&raw)
    }

    /// Load the profile for a run. A missing file falls back to the template;
    /// an unreadable or invalid one degrades to the empty profile.
    pub fn load_or_fallback(path: &Path) -> Self {
        match Self::load(path) {
            Ok(profile) => profile,
            Err(ProfileError::Missing(path)) => {
                tracing::warn!(path = %path.display(), "profile file not found, using template profile");
                Self::template()
            }
            Err(error) => {
                tracing::error!(path = %path.display(), %error, "profile rejected, scanning with an empty profile");
                Self::empty()
            }
        }
    }

    pub fn keyword_count(&self) -> usize {
        self.priority_keywords.len()
            + self
                .themes
                .iter()
                .map(|theme| theme.keywords.len())
                .sum::<usize>()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("profile file {0} does not exist")]
    Missing(PathBuf),
    #[error("unable to read profile {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("profile is not valid TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("quiet hour {0} is outside 0-23")]
    InvalidQuietHour(u8),
    #[error("theme '{theme}' has negative weight {weight}")]
    InvalidWeight { theme: String, weight: i64 },
    #[error("theme '{0}' has no keywords")]
    EmptyTheme(String),
}

#[derive(Debug, Default, Deserialize)]
struct ProfileFile {
    #[serde(default, alias = "cliente")]
    client: ClientSection,
    #[serde(default, alias = "palavras")]
    priority_keywords: Vec<String>,
    #[serde(default, alias = "peso")]
    priority_weight: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct ClientSection {
    #[serde(default)]
    id: Option<String>,
    #[serde(default, alias = "nome")]
    name: Option<String>,
    #[serde(default, alias = "exclusoes")]
    exclusions: Vec<String>,
    #[serde(default, alias = "temas")]
    themes: BTreeMap<String, ThemeSection>,
    #[serde(default, alias = "tipos")]
    types: Vec<String>,
    #[serde(default, alias = "comissoes")]
    committees: Vec<String>,
    #[serde(default, alias = "horario_silencioso")]
    quiet_hours: Option<QuietHours>,
}

#[derive(Debug, Deserialize)]
struct ThemeSection {
    #[serde(default, alias = "nome")]
    name: Option<String>,
    #[serde(default, alias = "palavras")]
    keywords: Vec<String>,
    #[serde(default, alias = "peso")]
    weight: Option<i64>,
}

impl ProfileFile {
    fn validate(self) -> Result<InterestProfile, ProfileError> {
        let client = self.client;

        if let Some(hours) = client.quiet_hours {
            for hour in [hours.start, hours.end] {
                if hour > 23 {
                    return Err(ProfileError::InvalidQuietHour(hour));
                }
            }
        }

        let mut themes = Vec::with_capacity(client.themes.len());
        for (theme_id, section) in client.themes {
            let name = section
                .name
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty())
                .unwrap_or(theme_id);
            let weight = section.weight.unwrap_or(DEFAULT_THEME_WEIGHT);
            if weight < 0 {
                return Err(ProfileError::InvalidWeight {
                    theme: name,
                    weight,
                });
            }
            let keywords = normalize_all(section.keywords.iter().map(String::as_str));
            if keywords.is_empty() {
                return Err(ProfileError::EmptyTheme(name));
            }
            themes.push(Theme {
                name,
                keywords,
                weight: u32::try_from(weight).unwrap_or(u32::MAX),
            });
        }

        let priority_weight = self.priority_weight.unwrap_or(DEFAULT_PRIORITY_WEIGHT);
        if priority_weight < 0 {
            return Err(ProfileError::InvalidWeight {
                theme: "priority keywords".to_string(),
                weight: priority_weight,
            });
        }

        let display_name = client.name.unwrap_or_default().trim().to_string();
        let client_id = client
            .id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| normalize(&display_name).replace(' ', "-"));

        let monitored_types = if client.types.is_empty() {
            default_types()
        } else {
            client
                .types
                .iter()
                .map(|code| code.trim().to_ascii_uppercase())
                .filter(|code| !code.is_empty())
                .collect()
        };

        Ok(InterestProfile {
            client_id,
            display_name,
            exclusions: normalize_all(client.exclusions.iter().map(String::as_str)),
            themes,
            priority_keywords: normalize_all(self.priority_keywords.iter().map(String::as_str)),
            priority_weight: u32::try_from(priority_weight).unwrap_or(u32::MAX),
            quiet_hours: client.quiet_hours,
            monitored_types,
            committees: client
                .committees
                .iter()
                .map(|code| code.trim().to_ascii_uppercase())
                .filter(|code| !code.is_empty())
                .collect(),
        })
    }
}

fn normalize_all<'a>(terms: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::new();
    for term in terms {
        let term = normalize(term);
        if !term.is_empty() && !normalized.contains(&term) {
            normalized.push(term);
        }
    }
    normalized
}

fn default_types() -> Vec<String> {
    DEFAULT_MONITORED_TYPES
        .iter()
        .map(|code| (*code).to_string())
        .collect()
}

const TEMPLATE_THEMES: [(&str, &[&str]); 8] = [
    (
        "Saúde",
        &[
            "anvisa",
            "medicamento",
            "plano de saúde",
            "sus",
            "vacina",
            "hospital",
            "farmácia",
            "genérico",
            "biossimilar",
            "registro sanitário",
        ],
    ),
    (
        "Tributário",
        &[
            "imposto",
            "tributo",
            "icms",
            "pis",
            "cofins",
            "irpj",
            "csll",
            "reforma tributária",
            "ibs",
            "cbs",
            "zona franca",
            "incentivo fiscal",
        ],
    ),
    (
        "Trabalhista",
        &[
            "clt",
            "trabalho",
            "trabalhador",
            "emprego",
            "sindicato",
            "terceirização",
            "home office",
            "férias",
            "13º",
            "fgts",
        ],
    ),
    (
        "Ambiental",
        &[
            "meio ambiente",
            "ibama",
            "licenciamento",
            "carbono",
            "sustentável",
            "desmatamento",
            "reserva legal",
            "área de preservação permanente",
            "código florestal",
        ],
    ),
    (
        "Energia",
        &[
            "energia",
            "aneel",
            "tarifa",
            "distribuidora",
            "geração",
            "renovável",
            "solar",
            "eólica",
            "gás natural",
            "petróleo",
        ],
    ),
    (
        "Financeiro",
        &[
            "banco central",
            "bacen",
            "pix",
            "drex",
            "fintech",
            "open banking",
            "crédito",
            "juros",
            "regulação bancária",
            "cvm",
            "mercado de capitais",
        ],
    ),
    (
        "Tecnologia",
        &[
            "lgpd",
            "dados pessoais",
            "inteligência artificial",
            "marco civil",
            "plataformas digitais",
            "criptomoeda",
            "blockchain",
        ],
    ),
    (
        "Agronegócio",
        &[
            "agricultura",
            "pecuária",
            "agrotóxico",
            "defensivo",
            "funrural",
            "crédito rural",
            "seguro agrícola",
            "código florestal",
        ],
    ),
];
