//! Détection du statut foncier (ИЖС, ЛПХ, СНТ, ДНП)
//!
//! Enrichissement au mieux à partir des textes libres du NSPD
//! (`permitted_use`, `land_category`). Non autoritaire : en cas de doute,
//! pas de classification.

use serde::Serialize;

use crate::types::CadastralRecord;

/// Statut foncier local
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LandStatus {
    /// Construction de logement individuel
    #[serde(rename = "ИЖС")]
    Izhs,
    /// Exploitation agricole personnelle
    #[serde(rename = "ЛПХ")]
    Lph,
    /// Partenariat de jardinage
    #[serde(rename = "СНТ")]
    Snt,
    /// Partenariat de datchas
    #[serde(rename = "ДНП")]
    Dnp,
}

impl LandStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Izhs => "ИЖС",
            Self::Lph => "ЛПХ",
            Self::Snt => "СНТ",
            Self::Dnp => "ДНП",
        }
    }
}

impl std::fmt::Display for LandStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Mots-clés par statut, testés dans l'ordre (ДНП avant СНТ : "дачное
/// садоводство" est un ДНП)
const KEYWORDS: &[(LandStatus, &[&str])] = &[
    (
        LandStatus::Izhs,
        &[
            "индивидуальное жилищное строительство",
            "индивидуального жилищного строительства",
            "индивидуальной жилой застройки",
            "ижс",
        ],
    ),
    (
        LandStatus::Lph,
        &[
            "личное подсобное хозяйство",
            "личного подсобного хозяйства",
            "лпх",
        ],
    ),
    (LandStatus::Dnp, &["дачное", "дачного", "днп"]),
    (
        LandStatus::Snt,
        &["садоводство", "садоводства", "садовый", "снт"],
    ),
];

/// Catégorie "земли населённых пунктов" (avec ou sans ё)
const SETTLEMENT_CATEGORY: &[&str] = &["населенных пунктов", "населённых пунктов"];

/// Classe un texte d'usage autorisé
fn classify(text: &str) -> Option<LandStatus> {
    let lower = text.to_lowercase();
    KEYWORDS
        .iter()
        .find(|(_, words)| words.iter().any(|w| lower.contains(w)))
        .map(|(status, _)| *status)
}

/// Détecte le statut foncier d'une parcelle
///
/// Mots-clés cherchés dans l'usage autorisé, puis dans la catégorie ; à
/// défaut, une parcelle en zone urbanisée sans usage déclaré est un ИЖС.
pub fn detect_land_status(record: &CadastralRecord) -> Option<LandStatus> {
    detect(record.permitted_use.as_deref(), record.land_category.as_deref())
}

/// Variante sur les champs bruts
pub fn detect(permitted_use: Option<&str>, land_category: Option<&str>) -> Option<LandStatus> {
    let permitted_use = permitted_use.map(str::trim).filter(|s| !s.is_empty());

    let status = permitted_use
        .and_then(classify)
        .or_else(|| land_category.and_then(classify));
    if status.is_some() {
        return status;
    }

    let category = land_category.unwrap_or_default().to_lowercase();
    if permitted_use.is_none() && SETTLEMENT_CATEGORY.iter().any(|c| category.contains(c)) {
        return Some(LandStatus::Izhs);
    }

    None
}
