//! Mise à jour incrémentale des situations des abonnés
//!
//! Pour chaque abonnement: résolution des niveaux à partir de la commune,
//! contrôle de validation des zones, comparaison avec la situation enregistrée,
//! notification puis persistance si un niveau a changé. Une erreur sur un
//! abonnement est comptée et n'interrompt jamais le lot.

use std::collections::HashSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::resolve::{LevelResolver, Resolution};
use crate::stats::ReconcileStats;
use crate::types::{NiveauAlerte, Profil, TypeZone};
use crate::SecheresseError;

/// Dernière situation enregistrée pour un abonné
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Situation {
    #[serde(default)]
    pub particulier: Option<NiveauAlerte>,
    #[serde(default)]
    pub sou: Option<NiveauAlerte>,
    #[serde(default)]
    pub sup: Option<NiveauAlerte>,
}

impl From<&Resolution> for Situation {
    fn from(resolution: &Resolution) -> Self {
        Self {
            particulier: resolution.particulier,
            sou: resolution.sou,
            sup: resolution.sup,
        }
    }
}

/// Abonnement aux alertes
#[derive(Debug, Clone, PartialEq)]
pub struct Subscription {
    pub id: i64,
    pub email: String,
    /// Coordonnées conservées pour l'affichage, non utilisées pour la résolution
    pub lon: f64,
    pub lat: f64,
    pub commune: String,
    pub profil: Profil,
    pub types_zones: Vec<TypeZone>,
    pub libelle_localisation: String,
    pub situation: Situation,
}

/// Changement de niveau à notifier à un abonné
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertChange {
    pub subscription_id: i64,
    pub email: String,
    pub niveau: NiveauAlerte,
    pub code_commune: String,
    pub commune: String,
    pub libelle_localisation: String,
}

/// Zones dont l'arrêté est publié pour cette exécution
#[derive(Debug, Clone, Default)]
pub struct ValidatedZones(HashSet<String>);

impl ValidatedZones {
    pub fn contains(&self, id_zone: &str) -> bool {
        self.0.contains(id_zone)
    }

    /// Vrai si toutes les zones sont validées (vrai pour une liste vide)
    pub fn all_validated(&self, zones: &[String]) -> bool {
        zones.iter().all(|id| self.contains(id))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<String> for ValidatedZones {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Stockage des abonnements
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Tous les abonnements
    async fn subscriptions(&self) -> Result<Vec<Subscription>, SecheresseError>;

    /// Remplace la situation d'un abonnement
    async fn update_situation(&self, id: i64, situation: &Situation) -> Result<(), SecheresseError>;
}

/// Destination des notifications individuelles
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn notify(&self, change: &AlertChange) -> Result<(), SecheresseError>;
}

/// Destination par défaut: trace les changements
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

#[async_trait]
impl AlertSink for LogSink {
    async fn notify(&self, change: &AlertChange) -> Result<(), SecheresseError> {
        info!(
            subscription = change.subscription_id,
            commune = %change.commune,
            localisation = %change.libelle_localisation,
            niveau = %change.niveau,
            "Alert level changed"
        );
        Ok(())
    }
}

/// Issue du traitement d'un abonnement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Niveaux notifiés et situation enregistrée
    Updated(Vec<NiveauAlerte>),
    /// Aucun changement
    Unchanged,
    /// Zones non encore validées
    Pending,
}

/// Réconciliation des situations sur l'ensemble des abonnements
pub struct Reconciler<'a> {
    resolver: &'a LevelResolver<'a>,
    validated: &'a ValidatedZones,
    dry_run: bool,
}

impl<'a> Reconciler<'a> {
    pub fn new(resolver: &'a LevelResolver<'a>, validated: &'a ValidatedZones) -> Self {
        Self {
            resolver,
            validated,
            dry_run: false,
        }
    }

    /// En mode simulation, aucune situation n'est enregistrée
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Traite un abonnement
    pub async fn reconcile<S, A>(
        &self,
        subscription: &Subscription,
        store: &S,
        sink: &A,
    ) -> Result<Outcome, SecheresseError>
    where
        S: SubscriptionStore + ?Sized,
        A: AlertSink + ?Sized,
    {
        let resolution = self.resolver.resolve_commune(
            &subscription.commune,
            subscription.profil,
            &subscription.types_zones,
        )?;

        if !self.validated.all_validated(&resolution.zones) {
            debug!(subscription = subscription.id, zones = ?resolution.zones, "Zones not validated yet");
            return Ok(Outcome::Pending);
        }

        let changes = changed_levels(subscription, &resolution);
        if changes.is_empty() {
            return Ok(Outcome::Unchanged);
        }

        let commune = self
            .resolver
            .referentiel()
            .commune(&subscription.commune)
            .map(|c| c.nom.clone())
            .ok_or_else(|| SecheresseError::UnknownCommune(subscription.commune.clone()))?;

        for niveau in &changes {
            sink.notify(&AlertChange {
                subscription_id: subscription.id,
                email: subscription.email.clone(),
                niveau: *niveau,
                code_commune: subscription.commune.clone(),
                commune: commune.clone(),
                libelle_localisation: subscription.libelle_localisation.clone(),
            })
            .await?;
        }

        if !self.dry_run {
            store
                .update_situation(subscription.id, &Situation::from(&resolution))
                .await?;
        }

        Ok(Outcome::Updated(changes))
    }

    /// Traite séquentiellement tous les abonnements du stockage
    ///
    /// Seule l'impossibilité de lister les abonnements est une erreur.
    pub async fn run<S, A>(&self, store: &S, sink: &A) -> Result<ReconcileStats, SecheresseError>
    where
        S: SubscriptionStore + ?Sized,
        A: AlertSink + ?Sized,
    {
        let subscriptions = store.subscriptions().await?;
        info!(
            subscriptions = subscriptions.len(),
            validated_zones = self.validated.len(),
            dry_run = self.dry_run,
            "Updating situations"
        );

        let mut stats = ReconcileStats::default();

        for subscription in &subscriptions {
            match self.reconcile(subscription, store, sink).await {
                Ok(Outcome::Updated(niveaux)) => {
                    for niveau in niveaux {
                        stats.record_notification(niveau);
                    }
                }
                Ok(Outcome::Unchanged) => stats.record_unchanged(),
                Ok(Outcome::Pending) => stats.record_pending(),
                Err(e) if e.is_missing_reference() => {
                    warn!(
                        subscription = subscription.id,
                        commune = %subscription.commune,
                        error = %e,
                        "Missing reference data for subscription"
                    );
                    stats.record_error(subscription.id, e.to_string());
                }
                Err(e) => {
                    warn!(
                        subscription = subscription.id,
                        commune = %subscription.commune,
                        error = %e,
                        "Subscription processing failed"
                    );
                    stats.record_error(subscription.id, e.to_string());
                }
            }
        }

        Ok(stats)
    }
}

/// Niveaux ayant changé depuis la situation enregistrée
fn changed_levels(subscription: &Subscription, resolution: &Resolution) -> Vec<NiveauAlerte> {
    let previous = &subscription.situation;

    if subscription.profil.is_particulier() {
        return match resolution.particulier {
            Some(niveau) if previous.particulier != Some(niveau) => vec![niveau],
            _ => Vec::new(),
        };
    }

    [(resolution.sou, previous.sou), (resolution.sup, previous.sup)]
        .into_iter()
        .filter_map(|(current, previous)| match current {
            Some(niveau) if previous != Some(niveau) => Some(niveau),
            _ => None,
        })
        .collect()
}
