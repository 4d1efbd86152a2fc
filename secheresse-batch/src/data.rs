//! Chargement des données d'entrée (zones, référentiel, contours GeoJSON)

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use geo::{Geometry, MultiPolygon};
use geojson::{Feature, FeatureCollection, GeoJson};
use tracing::{info, warn};

use secheresse::{Commune, CommuneShape, Referentiel, Zone};

use crate::config::Config;

/// Charge les zones déclarées (tableau JSON)
pub fn load_zones(path: &Path) -> Result<Vec<Zone>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read zones file: {}", path.display()))?;
    let zones: Vec<Zone> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse zones JSON: {}", path.display()))?;

    info!(path = %path.display(), zones = zones.len(), "Zones loaded");
    Ok(zones)
}

/// Écrit les zones avec leurs communes
pub fn save_zones(path: &Path, zones: &[Zone]) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create file: {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, zones)?;
    writer.flush()?;
    Ok(())
}

/// Charge les communes du référentiel administratif (tableau JSON)
pub fn load_communes(path: &Path) -> Result<Vec<Commune>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read communes file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse communes JSON: {}", path.display()))
}

/// Construit le référentiel à partir des communes et de la configuration
pub fn load_referentiel(communes_path: &Path, config: &Config) -> Result<Referentiel> {
    let communes = load_communes(communes_path)?;
    let referentiel = Referentiel::new(communes, config.regles_gestion.clone());

    info!(
        communes = referentiel.len(),
        departements = config.regles_gestion.len(),
        "Referentiel loaded"
    );
    Ok(referentiel)
}

/// Contours des zones indexés par `id_zone`
pub fn load_zone_geometries(path: &Path) -> Result<HashMap<String, MultiPolygon<f64>>> {
    let collection = read_feature_collection(path)?;
    let mut geometries = HashMap::with_capacity(collection.features.len());

    for feature in collection.features {
        let Some(id_zone) = property_string(&feature, "id_zone") else {
            warn!("Zone feature without id_zone, skipping");
            continue;
        };
        match feature_geometry(feature).and_then(to_multi_polygon) {
            Some(geometry) => {
                geometries.insert(id_zone, geometry);
            }
            None => warn!(zone = %id_zone, "No polygon geometry for zone"),
        }
    }

    info!(path = %path.display(), zones = geometries.len(), "Zone geometries loaded");
    Ok(geometries)
}

/// Contours des communes avec leur département, pour l'affectation
pub fn load_commune_shapes(path: &Path) -> Result<Vec<CommuneShape>> {
    let collection = read_feature_collection(path)?;
    let mut shapes = Vec::with_capacity(collection.features.len());

    for feature in collection.features {
        let (Some(code), Some(departement)) = (
            property_string(&feature, "code"),
            property_string(&feature, "departement"),
        ) else {
            warn!("Commune feature without code or departement, skipping");
            continue;
        };
        match feature_geometry(feature).and_then(to_multi_polygon) {
            Some(geometry) => shapes.push(CommuneShape {
                code,
                departement,
                geometry,
            }),
            None => warn!(commune = %code, "No polygon geometry for commune"),
        }
    }

    info!(path = %path.display(), communes = shapes.len(), "Commune shapes loaded");
    Ok(shapes)
}

/// Contours simplifiés des communes pour la carte, indexés par code
pub fn load_commune_geometries(path: &Path) -> Result<HashMap<String, Geometry<f64>>> {
    let collection = read_feature_collection(path)?;
    let mut geometries = HashMap::with_capacity(collection.features.len());

    for feature in collection.features {
        let Some(code) = property_string(&feature, "code") else {
            continue;
        };
        if let Some(geometry) = feature_geometry(feature) {
            geometries.insert(code, geometry);
        }
    }

    Ok(geometries)
}

fn read_feature_collection(path: &Path) -> Result<FeatureCollection> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read GeoJSON file: {}", path.display()))?;
    let geojson: GeoJson = content
        .parse()
        .with_context(|| format!("Failed to parse GeoJSON: {}", path.display()))?;
    FeatureCollection::try_from(geojson)
        .with_context(|| format!("Expected a FeatureCollection in {}", path.display()))
}

/// Valeur d'une propriété en texte (les identifiants sont parfois numériques)
fn property_string(feature: &Feature, key: &str) -> Option<String> {
    match feature.property(key)? {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn feature_geometry(feature: Feature) -> Option<Geometry<f64>> {
    let geometry = feature.geometry?;
    match Geometry::<f64>::try_from(geometry) {
        Ok(geometry) => Some(geometry),
        Err(e) => {
            warn!(error = %e, "Invalid GeoJSON geometry");
            None
        }
    }
}

fn to_multi_polygon(geometry: Geometry<f64>) -> Option<MultiPolygon<f64>> {
    match geometry {
        Geometry::Polygon(polygon) => Some(MultiPolygon::new(vec![polygon])),
        Geometry::MultiPolygon(multi) => Some(multi),
        _ => None,
    }
}
