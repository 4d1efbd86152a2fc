//! Types de données pour le crate secheresse

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::SecheresseError;

/// Niveau d'alerte normalisé, du moins au plus sévère
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NiveauAlerte {
    #[serde(rename = "Aucun")]
    Aucun = 0,
    #[serde(rename = "Vigilance")]
    Vigilance = 1,
    #[serde(rename = "Alerte")]
    Alerte = 2,
    #[serde(rename = "Alerte renforcée")]
    AlerteRenforcee = 3,
    #[serde(rename = "Crise")]
    Crise = 4,
}

impl NiveauAlerte {
    /// Tous les niveaux dans l'ordre croissant
    pub const ALL: [NiveauAlerte; 5] = [
        NiveauAlerte::Aucun,
        NiveauAlerte::Vigilance,
        NiveauAlerte::Alerte,
        NiveauAlerte::AlerteRenforcee,
        NiveauAlerte::Crise,
    ];

    /// Valeur ordinale (0 = aucune restriction, 4 = crise)
    pub fn ordinal(self) -> u8 {
        self as u8
    }

    /// Libellé affiché aux usagers
    pub fn label(self) -> &'static str {
        match self {
            NiveauAlerte::Aucun => "Aucun",
            NiveauAlerte::Vigilance => "Vigilance",
            NiveauAlerte::Alerte => "Alerte",
            NiveauAlerte::AlerteRenforcee => "Alerte renforcée",
            NiveauAlerte::Crise => "Crise",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|n| n.label() == label)
    }
}

impl fmt::Display for NiveauAlerte {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Table de correspondance niveau brut → niveau normalisé
///
/// L'ordre des entrées définit l'ordinal brut: une entrée placée plus loin
/// correspond à un niveau déclaré plus sévère. Les niveaux normalisés doivent
/// être croissants (au sens large) le long de la table.
#[derive(Debug, Clone)]
pub struct NiveauxTable {
    entries: Vec<(String, NiveauAlerte)>,
    positions: HashMap<String, usize>,
}

impl NiveauxTable {
    /// Construit une table en vérifiant sa cohérence
    pub fn new(entries: Vec<(String, NiveauAlerte)>) -> Result<Self, SecheresseError> {
        if entries.is_empty() {
            return Err(SecheresseError::InvalidNiveauxTable(
                "table is empty".to_string(),
            ));
        }

        let mut positions = HashMap::with_capacity(entries.len());
        for (idx, (raw, _)) in entries.iter().enumerate() {
            if positions.insert(raw.clone(), idx).is_some() {
                return Err(SecheresseError::InvalidNiveauxTable(format!(
                    "duplicate raw level '{}'",
                    raw
                )));
            }
        }

        if let Some(pair) = entries.windows(2).find(|w| w[1].1 < w[0].1) {
            return Err(SecheresseError::InvalidNiveauxTable(format!(
                "'{}' ({}) follows '{}' ({})",
                pair[1].0, pair[1].1, pair[0].0, pair[0].1
            )));
        }

        Ok(Self { entries, positions })
    }

    /// Table usuelle des arrêtés sécheresse
    pub fn standard() -> Self {
        let entries = vec![
            ("Vigilance".to_string(), NiveauAlerte::Vigilance),
            ("Alerte".to_string(), NiveauAlerte::Alerte),
            ("Alerte renforcée".to_string(), NiveauAlerte::AlerteRenforcee),
            ("Crise".to_string(), NiveauAlerte::Crise),
        ];

        Self {
            positions: entries
                .iter()
                .enumerate()
                .map(|(idx, (raw, _))| (raw.clone(), idx))
                .collect(),
            entries,
        }
    }

    /// Ordinal brut d'un niveau déclaré
    pub fn rank(&self, raw: &str) -> Option<usize> {
        self.positions.get(raw).copied()
    }

    /// Niveau normalisé d'un niveau déclaré
    pub fn niveau(&self, raw: &str) -> Option<NiveauAlerte> {
        self.rank(raw).map(|idx| self.entries[idx].1)
    }

    pub fn entries(&self) -> &[(String, NiveauAlerte)] {
        &self.entries
    }
}

/// Type de zone d'alerte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeZone {
    /// Eaux souterraines
    #[serde(rename = "SOU")]
    Sou,
    /// Eaux superficielles
    #[serde(rename = "SUP")]
    Sup,
    /// Alimentation en eau potable
    #[serde(rename = "AEP")]
    Aep,
}

impl TypeZone {
    pub fn code(self) -> &'static str {
        match self {
            TypeZone::Sou => "SOU",
            TypeZone::Sup => "SUP",
            TypeZone::Aep => "AEP",
        }
    }
}

impl std::str::FromStr for TypeZone {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "SOU" => Ok(TypeZone::Sou),
            "SUP" => Ok(TypeZone::Sup),
            "AEP" => Ok(TypeZone::Aep),
            _ => Err(format!("Invalid zone type: {}. Use: SOU, SUP, AEP", s)),
        }
    }
}

/// Profil d'un abonné
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profil {
    Particulier,
    Exploitation,
    Entreprise,
    Collectivite,
}

impl Profil {
    /// Seul le profil particulier est résolu en un niveau unique
    pub fn is_particulier(self) -> bool {
        matches!(self, Profil::Particulier)
    }
}

impl std::str::FromStr for Profil {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "particulier" => Ok(Profil::Particulier),
            "exploitation" => Ok(Profil::Exploitation),
            "entreprise" => Ok(Profil::Entreprise),
            "collectivite" => Ok(Profil::Collectivite),
            _ => Err(format!("Invalid profil: {}", s)),
        }
    }
}

/// Zone d'alerte déclarée par un arrêté
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Zone {
    /// Identifiant stable de la zone
    pub id_zone: String,

    /// Code département (ex: "38", "2A", "971")
    pub departement: String,

    /// Type de restriction
    pub type_zone: TypeZone,

    /// Niveau d'alerte tel que déclaré (non normalisé)
    pub niveau_alerte: String,

    /// Codes des communes concernées
    #[serde(default)]
    pub communes: Vec<String>,
}

/// Commune du référentiel administratif
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commune {
    pub code: String,
    pub nom: String,
    pub departement: String,
}

/// Règles de gestion d'un département
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReglesGestion {
    /// Types de zone par ordre de priorité d'affichage en cas de superposition
    #[serde(default)]
    pub affichage_restriction_si_superposition_type_zone: Vec<TypeZone>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_niveau_ordinal_and_label() {
        assert_eq!(NiveauAlerte::Aucun.ordinal(), 0);
        assert_eq!(NiveauAlerte::Crise.ordinal(), 4);
        assert_eq!(NiveauAlerte::AlerteRenforcee.label(), "Alerte renforcée");
        assert_eq!(
            NiveauAlerte::from_label("Alerte renforcée"),
            Some(NiveauAlerte::AlerteRenforcee)
        );
        assert_eq!(NiveauAlerte::from_label("inconnu"), None);
    }

    #[test]
    fn test_niveau_serde_uses_labels() {
        let json = serde_json::to_string(&NiveauAlerte::AlerteRenforcee).unwrap();
        assert_eq!(json, "\"Alerte renforcée\"");
        let parsed: NiveauAlerte = serde_json::from_str("\"Crise\"").unwrap();
        assert_eq!(parsed, NiveauAlerte::Crise);
    }

    #[test]
    fn test_standard_table() {
        let table = NiveauxTable::standard();
        assert_eq!(table.niveau("Vigilance"), Some(NiveauAlerte::Vigilance));
        assert_eq!(table.niveau("Crise"), Some(NiveauAlerte::Crise));
        assert_eq!(table.rank("Alerte"), Some(1));
        assert_eq!(table.niveau("Pas d'arrêté"), None);
    }

    #[test]
    fn test_table_is_monotonic() {
        let table = NiveauxTable::standard();
        for a in table.entries() {
            for b in table.entries() {
                if table.rank(&a.0) > table.rank(&b.0) {
                    assert!(table.niveau(&a.0) >= table.niveau(&b.0));
                }
            }
        }
    }

    #[test]
    fn test_table_rejects_invalid_entries() {
        assert!(NiveauxTable::new(vec![]).is_err());

        let duplicate = NiveauxTable::new(vec![
            ("Alerte".to_string(), NiveauAlerte::Alerte),
            ("Alerte".to_string(), NiveauAlerte::Crise),
        ]);
        assert!(duplicate.is_err());

        let decreasing = NiveauxTable::new(vec![
            ("Crise".to_string(), NiveauAlerte::Crise),
            ("Vigilance".to_string(), NiveauAlerte::Vigilance),
        ]);
        assert!(decreasing.is_err());

        let plateau = NiveauxTable::new(vec![
            ("Vigilance".to_string(), NiveauAlerte::Vigilance),
            ("Vigilance renforcée".to_string(), NiveauAlerte::Vigilance),
            ("Crise".to_string(), NiveauAlerte::Crise),
        ]);
        assert!(plateau.is_ok());
    }

    #[test]
    fn test_zone_deserialize() {
        let zone: Zone = serde_json::from_str(
            r#"{"idZone":"12","departement":"75","typeZone":"SOU","niveauAlerte":"Alerte","communes":["75056"]}"#,
        )
        .unwrap();
        assert_eq!(zone.id_zone, "12");
        assert_eq!(zone.type_zone, TypeZone::Sou);
        assert_eq!(zone.communes, vec!["75056".to_string()]);
    }

    #[test]
    fn test_profil_from_str() {
        assert_eq!("particulier".parse::<Profil>(), Ok(Profil::Particulier));
        assert_eq!("Exploitation".parse::<Profil>(), Ok(Profil::Exploitation));
        assert!("agriculteur".parse::<Profil>().is_err());
        assert!(Profil::Particulier.is_particulier());
        assert!(!Profil::Collectivite.is_particulier());
    }
}
