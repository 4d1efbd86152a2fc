//! Stockage PostgreSQL des abonnements
//!
//! Lecture complète de la table puis mises à jour ciblées de la colonne
//! `situation` (JSONB), une requête par abonnement modifié.

use anyhow::{Context, Result};
use async_trait::async_trait;
use deadpool_postgres::Pool;
use futures::{pin_mut, TryStreamExt};
use tokio_postgres::Row;
use tracing::{debug, info, warn};

use secheresse::{Profil, SecheresseError, Situation, Subscription, SubscriptionStore, TypeZone};

/// Schéma par défaut de la table des abonnements
pub const DEFAULT_SCHEMA: &str = "public";

/// Abonnements stockés dans `<schema>.subscriptions`
#[derive(Clone)]
pub struct PgSubscriptionStore {
    pool: Pool,
    table: String,
}

impl PgSubscriptionStore {
    pub fn new(pool: Pool, schema: &str) -> Result<Self> {
        if !is_valid_identifier(schema) {
            anyhow::bail!("Invalid schema name: {}", schema);
        }
        Ok(Self {
            pool,
            table: format!("{}.subscriptions", schema),
        })
    }

    /// Crée la table si elle n'existe pas
    pub async fn ensure_table(&self) -> Result<()> {
        let client = self
            .pool
            .get()
            .await
            .context("Failed to get connection from pool")?;
        client
            .batch_execute(&format!(
                "CREATE TABLE IF NOT EXISTS {} (
                    id BIGSERIAL PRIMARY KEY,
                    email TEXT NOT NULL,
                    lon DOUBLE PRECISION NOT NULL,
                    lat DOUBLE PRECISION NOT NULL,
                    commune TEXT NOT NULL,
                    profil TEXT NOT NULL,
                    types_zones TEXT[] NOT NULL DEFAULT '{{}}',
                    libelle_localisation TEXT NOT NULL DEFAULT '',
                    situation JSONB
                )",
                self.table
            ))
            .await
            .with_context(|| format!("Failed to create table {}", self.table))?;
        info!(table = %self.table, "Subscriptions table ready");
        Ok(())
    }
}

fn store_error(e: impl std::fmt::Display) -> SecheresseError {
    SecheresseError::Store(e.to_string())
}

#[async_trait]
impl SubscriptionStore for PgSubscriptionStore {
    async fn subscriptions(&self) -> Result<Vec<Subscription>, SecheresseError> {
        let client = self.pool.get().await.map_err(store_error)?;
        let query = format!(
            "SELECT id, email, lon, lat, commune, profil, types_zones, libelle_localisation,
                    situation::text AS situation
             FROM {} ORDER BY id",
            self.table
        );

        let rows = client
            .query_raw(&query, std::iter::empty::<i64>())
            .await
            .map_err(store_error)?;
        pin_mut!(rows);

        let mut subscriptions = Vec::new();
        let mut skipped = 0usize;
        while let Some(row) = rows.try_next().await.map_err(store_error)? {
            match row_to_subscription(&row) {
                Ok(subscription) => subscriptions.push(subscription),
                Err(e) => {
                    skipped += 1;
                    warn!(error = %e, "Invalid subscription row, skipping");
                }
            }
        }

        debug!(loaded = subscriptions.len(), skipped, "Subscriptions loaded");
        Ok(subscriptions)
    }

    async fn update_situation(&self, id: i64, situation: &Situation) -> Result<(), SecheresseError> {
        let json = serde_json::to_string(situation).map_err(store_error)?;
        let client = self.pool.get().await.map_err(store_error)?;
        let query = format!(
            "UPDATE {} SET situation = $1::text::jsonb WHERE id = $2",
            self.table
        );

        let updated = client
            .execute(&query, &[&json, &id])
            .await
            .map_err(store_error)?;
        if updated == 0 {
            return Err(SecheresseError::Store(format!("Subscription {} not found", id)));
        }
        Ok(())
    }
}

/// Convertit une ligne en abonnement
fn row_to_subscription(row: &Row) -> Result<Subscription> {
    let id: i64 = row.try_get("id")?;
    let profil: String = row.try_get("profil")?;
    let types_zones: Vec<String> = row.try_get("types_zones")?;
    let situation: Option<String> = row.try_get("situation")?;

    Ok(Subscription {
        id,
        email: row.try_get("email")?,
        lon: row.try_get("lon")?,
        lat: row.try_get("lat")?,
        commune: row.try_get("commune")?,
        profil: profil
            .parse::<Profil>()
            .map_err(anyhow::Error::msg)
            .with_context(|| format!("Subscription {}", id))?,
        types_zones: parse_types_zones(&types_zones)
            .with_context(|| format!("Subscription {}", id))?,
        libelle_localisation: row.try_get("libelle_localisation")?,
        situation: parse_situation(situation.as_deref())
            .with_context(|| format!("Subscription {}", id))?,
    })
}

fn parse_types_zones(raw: &[String]) -> Result<Vec<TypeZone>> {
    raw.iter()
        .map(|t| t.parse::<TypeZone>().map_err(anyhow::Error::msg))
        .collect()
}

/// Situation enregistrée (absente = aucun niveau connu)
fn parse_situation(raw: Option<&str>) -> Result<Situation> {
    match raw {
        None => Ok(Situation::default()),
        Some(json) => serde_json::from_str(json).context("Invalid situation JSON"),
    }
}

fn is_valid_identifier(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !name.starts_with(|c: char| c.is_ascii_digit())
}
