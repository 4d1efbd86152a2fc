//! # secheresse
//!
//! Calcul des niveaux d'alerte sécheresse par commune et par abonné.
//!
//! Les restrictions d'usage de l'eau sont déclarées par zones d'alerte (bassins,
//! sous-bassins) et non par commune. Ce crate:
//!
//! - affecte les communes aux zones par intersection géométrique (seuil de 10 ha)
//! - départage les zones superposées selon les règles de gestion du département
//! - réconcilie la situation enregistrée de chaque abonné avec le niveau recalculé
//! - compose la carte des niveaux par commune
//!
//! Aucun accès réseau, fichier ou base de données: le stockage des abonnements
//! et les notifications passent par les traits [`SubscriptionStore`] et [`AlertSink`].
//!
//! ## Usage
//!
//! ```rust,ignore
//! use secheresse::{CommuneZonesIndex, LevelResolver, NiveauxTable, Profil};
//!
//! let index = CommuneZonesIndex::build(zones);
//! let niveaux = NiveauxTable::standard();
//! let resolver = LevelResolver::new(&referentiel, &index, &niveaux);
//!
//! let resolution = resolver.resolve_commune("38185", Profil::Particulier, &[])?;
//! println!("Niveau: {:?}", resolution.particulier);
//! ```

pub mod assign;
pub mod error;
pub mod index;
pub mod map;
pub mod reconcile;
pub mod resolve;
pub mod score;
pub mod stats;
pub mod types;

pub use assign::{AssignReport, CommuneShape, GeometryAssigner, MIN_AREA_SIZE_IN_SQ_DEGREES};
pub use error::SecheresseError;
pub use index::{CommuneZonesIndex, Referentiel};
pub use map::{compose_map, CommuneAlerte, MapReport};
pub use reconcile::{
    AlertChange, AlertSink, LogSink, Outcome, Reconciler, Situation, Subscription,
    SubscriptionStore, ValidatedZones,
};
pub use resolve::{resolve, resolve_general, LevelResolver, Resolution};
pub use score::{compute_zone_score, max_zone, TypePriority, ZoneScore};
pub use stats::{ReconcileStats, SubscriptionFailure};
pub use types::{Commune, NiveauAlerte, NiveauxTable, Profil, ReglesGestion, TypeZone, Zone};
