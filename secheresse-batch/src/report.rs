//! Rapport d'exécution de la mise à jour des situations
//!
//! Collecte les compteurs du lot, les erreurs par abonnement et le statut
//! global, pour affichage console ou sauvegarde JSON.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;

use secheresse::{NiveauAlerte, ReconcileStats};

/// Statut global de l'exécution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunStatus {
    /// Tous les abonnements traités sans erreur
    Success,
    /// Certains abonnements en erreur
    PartialSuccess,
    /// Aucun abonnement traité avec succès
    Failed,
}

/// Rapport complet d'une exécution
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Durée de l'exécution
    pub duration_secs: f64,
    /// Statut global
    pub status: RunStatus,
    /// Simulation sans écriture
    pub dry_run: bool,
    /// Nombre de zones validées lues dans le flux
    pub validated_zones: usize,
    /// Message récapitulatif envoyé au webhook
    pub digest_sent: bool,
    /// Compteurs de la réconciliation
    pub stats: ReconcileStats,
}

impl RunReport {
    pub fn new(stats: ReconcileStats, validated_zones: usize, dry_run: bool) -> Self {
        let mut report = Self {
            duration_secs: 0.0,
            status: RunStatus::Success,
            dry_run,
            validated_zones,
            digest_sent: false,
            stats,
        };
        report.finalize();
        report
    }

    /// Définit la durée de l'exécution
    pub fn set_duration(&mut self, duration: Duration) {
        self.duration_secs = duration.as_secs_f64();
    }

    /// Détermine le statut à partir des erreurs
    pub fn finalize(&mut self) {
        let has_errors = self.stats.erreurs > 0;
        let has_success = self.stats.total_notified() > 0
            || self.stats.inchanges > 0
            || self.stats.non_valides > 0;

        self.status = match (has_errors, has_success) {
            (false, _) => RunStatus::Success,
            (true, true) => RunStatus::PartialSuccess,
            (true, false) => RunStatus::Failed,
        };
    }

    /// Nombre d'abonnements traités, toutes issues confondues
    ///
    /// Un abonné professionnel peut compter plusieurs notifications.
    pub fn total_processed(&self) -> usize {
        self.stats.total_notified() + self.stats.inchanges + self.stats.erreurs + self.stats.non_valides
    }

    /// Affiche le rapport sur la console
    pub fn display(&self) {
        println!("\n{}", "=".repeat(60));
        println!("SITUATIONS REPORT{}", if self.dry_run { " (dry run)" } else { "" });
        println!("{}", "=".repeat(60));

        println!("\nStatus: {:?}", self.status);
        println!("Duration: {:.2}s", self.duration_secs);
        println!("Validated zones: {}", self.validated_zones);

        println!("\n--- NOTIFICATIONS ---");
        for niveau in NiveauAlerte::ALL {
            println!("  {}: {}", niveau, self.stats.notified(niveau));
        }

        println!("\n--- SUMMARY ---");
        println!(
            "Subscriptions: {} unchanged, {} pending validation, {} errors",
            self.stats.inchanges, self.stats.non_valides, self.stats.erreurs
        );
        println!("Digest sent: {}", self.digest_sent);

        if !self.stats.failures.is_empty() {
            println!("\n--- ERRORS ({}) ---", self.stats.failures.len());
            for f in self.stats.failures.iter().take(20) {
                println!("  [{}] {}", f.subscription_id, f.message);
            }
            if self.stats.failures.len() > 20 {
                println!("  ... and {} more", self.stats.failures.len() - 20);
            }
        }

        println!("\n{}", "=".repeat(60));
    }

    /// Sauvegarde le rapport en JSON
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write report: {}", path.display()))?;
        Ok(())
    }

    /// Affichage compact pour le résumé
    pub fn summary(&self) -> String {
        format!(
            "{} notified, {} unchanged, {} pending, {} errors",
            self.stats.total_notified(),
            self.stats.inchanges,
            self.stats.non_valides,
            self.stats.erreurs
        )
    }
}
