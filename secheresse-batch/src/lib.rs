//! # secheresse-batch
//!
//! Traitements planifiés autour du calcul des niveaux d'alerte sécheresse.
//!
//! ## Features
//!
//! - Affectation géométrique des communes aux zones d'alerte
//! - Carte des niveaux par commune (GeoJSON, style et emprises)
//! - Mise à jour des situations des abonnés stockées dans PostgreSQL
//! - Récapitulatif envoyé sur un webhook de messagerie
//!
//! ## Usage CLI
//!
//! ```bash
//! # Communes concernées par chaque zone
//! secheresse-batch compute-communes --zones zones.json \
//!     --zone-geometries zones.geojson --commune-geometries communes.geojson
//!
//! # Carte des niveaux
//! secheresse-batch compute-maps --zones zones.json --communes communes.json \
//!     --commune-geometries communes-simplifiees.geojson --output ./cartes/
//!
//! # Situations des abonnés (PROPLUVIA_DATA_URL et PG* depuis l'environnement)
//! secheresse-batch update-situations --zones zones.json --communes communes.json
//! ```

pub mod cli;
pub mod config;
pub mod data;
pub mod export;
pub mod feed;
pub mod report;
pub mod store;
pub mod webhook;

pub use config::Config;
pub use report::{RunReport, RunStatus};
pub use store::{create_pool, DatabaseConfig, PgSubscriptionStore};
