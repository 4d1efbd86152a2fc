//! Configuration du calcul des niveaux

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use secheresse::{NiveauAlerte, NiveauxTable, ReglesGestion};

/// Configuration principale
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Correspondance niveaux déclarés → niveaux normalisés, du moins au plus sévère
    pub niveaux: Vec<NiveauMapping>,

    /// Règles de gestion par code département
    #[serde(default)]
    pub regles_gestion: HashMap<String, ReglesGestion>,
}

/// Correspondance d'un niveau déclaré
#[derive(Debug, Deserialize, Serialize)]
pub struct NiveauMapping {
    /// Libellé tel que publié dans les arrêtés
    pub brut: String,

    /// Niveau normalisé
    pub niveau: NiveauAlerte,
}

impl Config {
    /// Charge une configuration depuis un fichier
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;

        serde_json::from_str(&content).context("Failed to parse config JSON")
    }

    /// Charge une configuration depuis un preset embarqué
    pub fn from_preset(preset: &str) -> Result<Self> {
        match preset {
            "default" => Self::load_embedded(include_str!("presets/default.json")),
            _ => anyhow::bail!("Unknown preset: {}. Use: default", preset),
        }
    }

    /// Preset embarqué ou chemin vers un fichier JSON
    pub fn resolve(spec: &str) -> Result<Self> {
        let path = Path::new(spec);
        if path.exists() {
            Self::load(path)
        } else {
            Self::from_preset(spec)
        }
    }

    fn load_embedded(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse embedded config")
    }

    /// Construit la table de normalisation des niveaux
    pub fn niveaux_table(&self) -> Result<NiveauxTable> {
        let entries = self
            .niveaux
            .iter()
            .map(|m| (m.brut.clone(), m.niveau))
            .collect();

        NiveauxTable::new(entries).context("Invalid niveaux in config")
    }

    /// Règles de gestion d'un département
    pub fn get_regles_gestion(&self, departement: &str) -> Option<&ReglesGestion> {
        self.regles_gestion.get(departement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secheresse::TypeZone;

    #[test]
    fn test_default_preset() {
        let config = Config::from_preset("default").unwrap();
        let table = config.niveaux_table().unwrap();

        assert_eq!(table.niveau("Crise"), Some(NiveauAlerte::Crise));
        assert_eq!(table.niveau("Alerte renforcée"), Some(NiveauAlerte::AlerteRenforcee));

        let regles = config.get_regles_gestion("38").unwrap();
        assert_eq!(
            regles.affichage_restriction_si_superposition_type_zone,
            vec![TypeZone::Sup, TypeZone::Sou]
        );
        assert!(config.get_regles_gestion("2A").is_some());
        assert!(config.get_regles_gestion("971").is_some());
        assert!(config.get_regles_gestion("20").is_none());
    }

    #[test]
    fn test_unknown_preset() {
        assert!(Config::from_preset("full").is_err());
    }

    #[test]
    fn test_invalid_niveaux_rejected() {
        let config: Config = serde_json::from_str(
            r#"{"niveaux":[{"brut":"Crise","niveau":"Crise"},{"brut":"Vigilance","niveau":"Vigilance"}]}"#,
        )
        .unwrap();
        assert!(config.niveaux_table().is_err());
        assert!(config.regles_gestion.is_empty());
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join("secheresse_test_config.json");
        std::fs::write(
            &path,
            r#"{"niveaux":[{"brut":"Alerte","niveau":"Alerte"}],"reglesGestion":{"75":{"affichageRestrictionSiSuperpositionTypeZone":["SOU"]}}}"#,
        )
        .unwrap();

        let config = Config::resolve(path.to_str().unwrap()).unwrap();
        assert_eq!(config.niveaux.len(), 1);
        assert!(config.get_regles_gestion("75").is_some());

        std::fs::remove_file(path).ok();
    }
}
