//! Types d'erreurs pour le crate secheresse

use thiserror::Error;

/// Erreurs pouvant survenir lors du calcul des niveaux d'alerte
#[derive(Debug, Error)]
pub enum SecheresseError {
    /// Commune absente du référentiel
    #[error("Unknown commune: {0}")]
    UnknownCommune(String),

    /// Département sans règles de gestion
    #[error("No règles de gestion for departement {departement}")]
    MissingReglesGestion { departement: String },

    /// Zone ou commune sans géométrie
    #[error("Missing geometry for {id}")]
    MissingGeometry { id: String },

    /// Niveau d'alerte brut absent de la table de correspondance
    #[error("Unknown niveau d'alerte '{niveau}' for zone {id_zone}")]
    UnknownNiveau { id_zone: String, niveau: String },

    /// Table des niveaux incohérente
    #[error("Invalid niveaux table: {0}")]
    InvalidNiveauxTable(String),

    /// Erreur du stockage des abonnements
    #[error("Subscription store error: {0}")]
    Store(String),

    /// Erreur lors de l'émission d'une notification
    #[error("Notification error: {0}")]
    Notification(String),
}

impl SecheresseError {
    /// Crée une erreur de niveau inconnu
    pub fn unknown_niveau(id_zone: impl Into<String>, niveau: impl Into<String>) -> Self {
        Self::UnknownNiveau {
            id_zone: id_zone.into(),
            niveau: niveau.into(),
        }
    }

    /// Crée une erreur de règles de gestion manquantes
    pub fn missing_regles(departement: impl Into<String>) -> Self {
        Self::MissingReglesGestion {
            departement: departement.into(),
        }
    }

    /// Indique une donnée de référence manquante (non fatale pour le batch)
    pub fn is_missing_reference(&self) -> bool {
        matches!(
            self,
            Self::UnknownCommune(_) | Self::MissingReglesGestion { .. } | Self::MissingGeometry { .. }
        )
    }
}
