//! Compteurs de la mise à jour des situations et message récapitulatif

use serde::Serialize;

use crate::types::NiveauAlerte;

/// Échec de traitement d'un abonnement
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriptionFailure {
    pub subscription_id: i64,
    pub message: String,
}

/// Compteurs par issue
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileStats {
    /// Notifications émises, indexées par ordinal de niveau
    pub par_niveau: [usize; 5],
    /// Abonnements sans changement
    pub inchanges: usize,
    /// Abonnements en erreur
    pub erreurs: usize,
    /// Abonnements en attente de validation de leur arrêté
    pub non_valides: usize,
    /// Détail des erreurs
    pub failures: Vec<SubscriptionFailure>,
}

impl ReconcileStats {
    pub fn record_notification(&mut self, niveau: NiveauAlerte) {
        self.par_niveau[niveau.ordinal() as usize] += 1;
    }

    pub fn record_unchanged(&mut self) {
        self.inchanges += 1;
    }

    pub fn record_pending(&mut self) {
        self.non_valides += 1;
    }

    pub fn record_error(&mut self, subscription_id: i64, message: impl Into<String>) {
        self.erreurs += 1;
        self.failures.push(SubscriptionFailure {
            subscription_id,
            message: message.into(),
        });
    }

    pub fn notified(&self, niveau: NiveauAlerte) -> usize {
        self.par_niveau[niveau.ordinal() as usize]
    }

    pub fn total_notified(&self) -> usize {
        self.par_niveau.iter().sum()
    }

    /// Message récapitulatif, une ligne par compteur non nul
    ///
    /// Une exécution sans aucun compteur produit une chaîne vide.
    pub fn digest(&self) -> String {
        let mut sentences = Vec::new();

        for niveau in NiveauAlerte::ALL {
            let count = self.notified(niveau);
            if count == 0 {
                continue;
            }
            sentences.push(match niveau {
                NiveauAlerte::Aucun => format!("- **{}** usagers n’ont plus de restrictions 🚰", count),
                NiveauAlerte::Vigilance => {
                    format!("- **{}** usagers sont passés en **Vigilance** 💧", count)
                }
                NiveauAlerte::Alerte => format!("- **{}** usagers sont passés en **Alerte** 😬", count),
                NiveauAlerte::AlerteRenforcee => {
                    format!("- **{}** usagers sont passés en **Alerte renforcée** 🥵", count)
                }
                NiveauAlerte::Crise => format!("- **{}** usagers sont passés en **Crise** 🔥", count),
            });
        }

        if self.inchanges > 0 {
            sentences.push(format!(
                "- **{}** usagers n’ont pas de changement 👻",
                self.inchanges
            ));
        }

        if self.erreurs > 0 {
            sentences.push(format!("- **{}** usagers sont en erreur 🧨", self.erreurs));
        }

        if self.non_valides > 0 {
            sentences.push(format!(
                "- **{}** situations non évaluées en attente de validation de leur arrêté 🕵️‍♀️",
                self.non_valides
            ));
        }

        sentences.join("\n")
    }
}
