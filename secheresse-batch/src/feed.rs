//! Zones validées publiées par le flux de données

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use tracing::{debug, info};

use secheresse::ValidatedZones;

/// Chemin du fichier des changements de niveau, relatif à l'URL de base
const VALIDATED_ZONES_PATH: &str = "csv/alerting/latest/zones_changement_niveau_alerte.csv";

/// Colonne contenant l'identifiant de zone
const ID_ZONE_COLUMN: &str = "id_zone";

/// URL du fichier des zones validées
pub fn validated_zones_url(base_url: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), VALIDATED_ZONES_PATH)
}

/// Télécharge et lit la liste des zones validées
///
/// Toute erreur est fatale: aucun abonnement ne doit être traité sans cette liste.
pub async fn fetch_validated_zones(base_url: &str) -> Result<ValidatedZones> {
    let url = validated_zones_url(base_url);
    let client = Client::builder()
        .timeout(Duration::from_secs(60))
        .build()
        .context("Failed to create HTTP client")?;

    debug!(url = %url, "Fetching validated zones");
    let body = client
        .get(&url)
        .send()
        .await
        .with_context(|| format!("Failed to fetch {}", url))?
        .error_for_status()
        .with_context(|| format!("Unexpected status for {}", url))?
        .text()
        .await
        .context("Failed to read validated zones body")?;

    let zones = parse_validated_zones(&body)?;
    info!(url = %url, zones = zones.len(), "Validated zones loaded");
    Ok(zones)
}

/// Lit la colonne `id_zone` d'un CSV avec en-tête
pub fn parse_validated_zones(content: &str) -> Result<ValidatedZones> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers = reader.headers().context("Failed to read CSV header")?.clone();
    let column = headers
        .iter()
        .position(|h| h.trim() == ID_ZONE_COLUMN)
        .with_context(|| format!("Missing column {} in validated zones CSV", ID_ZONE_COLUMN))?;

    let mut ids = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let row = result.with_context(|| format!("Failed to read row {}", idx + 1))?;
        match row.get(column).map(str::trim) {
            Some(id) if !id.is_empty() => ids.push(id.to_string()),
            _ => continue,
        }
    }

    Ok(ids.into_iter().collect())
}
