//! Affectation des communes aux zones d'alerte par intersection géométrique
//!
//! Une commune est retenue pour une zone si l'aire de leur intersection dépasse
//! 10 ha. Si l'intersection ne peut pas être calculée (géométrie dégénérée),
//! on se rabat sur un simple test d'intersection topologique.

use std::collections::{HashMap, HashSet};
use std::panic::{catch_unwind, AssertUnwindSafe};

use geo::{Area, BooleanOps, BoundingRect, Intersects, MultiPolygon, Rect};
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::types::Zone;

/// Seuil d'aire d'intersection (10 ha exprimés en degrés carrés, WGS84)
pub const MIN_AREA_SIZE_IN_SQ_DEGREES: f64 = 0.000_090_42;

/// Contour d'une commune
#[derive(Debug, Clone)]
pub struct CommuneShape {
    pub code: String,
    pub departement: String,
    pub geometry: MultiPolygon<f64>,
}

#[derive(Debug)]
struct IndexedShape {
    code: String,
    geometry: MultiPolygon<f64>,
    bbox: Option<Rect<f64>>,
}

/// Rapport d'affectation pour un lot de zones
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AssignReport {
    /// Zones dont la liste de communes a été recalculée
    pub assigned: usize,
    /// Zones sans contour (liste de communes conservée)
    pub missing_geometry: Vec<String>,
    /// Nombre total de couples zone/commune retenus
    pub links: usize,
}

/// Calcule les communes concernées par chaque zone
///
/// Les communes sont partitionnées par département une seule fois; chaque zone
/// n'est comparée qu'aux communes de son département.
#[derive(Debug)]
pub struct GeometryAssigner {
    zone_geometries: HashMap<String, MultiPolygon<f64>>,
    communes_by_dep: HashMap<String, Vec<IndexedShape>>,
}

impl GeometryAssigner {
    pub fn new(zone_geometries: HashMap<String, MultiPolygon<f64>>, communes: Vec<CommuneShape>) -> Self {
        let mut communes_by_dep: HashMap<String, Vec<IndexedShape>> = HashMap::new();
        let mut seen = HashSet::new();

        for commune in communes {
            if !seen.insert(commune.code.clone()) {
                warn!(commune = %commune.code, "Duplicate commune geometry, keeping first");
                continue;
            }
            let bbox = commune.geometry.bounding_rect();
            communes_by_dep
                .entry(commune.departement)
                .or_default()
                .push(IndexedShape {
                    code: commune.code,
                    geometry: commune.geometry,
                    bbox,
                });
        }

        debug!(
            zones = zone_geometries.len(),
            departements = communes_by_dep.len(),
            "Geometry assigner ready"
        );

        Self {
            zone_geometries,
            communes_by_dep,
        }
    }

    /// Contour d'une zone
    pub fn zone_geometry(&self, id_zone: &str) -> Option<&MultiPolygon<f64>> {
        let geometry = self.zone_geometries.get(id_zone);
        if geometry.is_none() {
            warn!(zone = %id_zone, "Zone geometry not found, skipping");
        }
        geometry
    }

    /// Communes matériellement concernées par une zone
    ///
    /// Retourne `None` si la zone n'a pas de contour.
    pub fn compute_communes(&self, zone: &Zone) -> Option<Vec<String>> {
        let zone_geometry = self.zone_geometry(&zone.id_zone)?;
        let zone_bbox = zone_geometry.bounding_rect()?;

        let Some(candidates) = self.communes_by_dep.get(&zone.departement) else {
            warn!(zone = %zone.id_zone, departement = %zone.departement, "No commune for departement");
            return Some(Vec::new());
        };

        let communes = candidates
            .iter()
            .filter(|shape| shape.bbox.is_some_and(|bbox| bbox.intersects(&zone_bbox)))
            .filter(|shape| commune_is_affected(&shape.geometry, zone_geometry))
            .map(|shape| shape.code.clone())
            .collect();

        Some(communes)
    }

    /// Recalcule en parallèle les communes de toutes les zones
    pub fn assign_all(&self, zones: &mut [Zone]) -> AssignReport {
        let computed: Vec<Option<Vec<String>>> =
            zones.par_iter().map(|zone| self.compute_communes(zone)).collect();

        let mut report = AssignReport::default();
        for (zone, communes) in zones.iter_mut().zip(computed) {
            match communes {
                Some(communes) => {
                    report.assigned += 1;
                    report.links += communes.len();
                    zone.communes = communes;
                }
                None => report.missing_geometry.push(zone.id_zone.clone()),
            }
        }

        report
    }
}

/// Test d'affectation d'une commune à une zone
pub fn commune_is_affected(commune: &MultiPolygon<f64>, zone: &MultiPolygon<f64>) -> bool {
    keep_commune(intersection_area(commune, zone), || polygons_intersect(commune, zone))
}

/// Décision à partir de l'aire d'intersection, avec repli topologique
pub fn keep_commune(area: Option<f64>, intersects: impl FnOnce() -> bool) -> bool {
    match area {
        Some(area) => area > MIN_AREA_SIZE_IN_SQ_DEGREES,
        None => intersects(),
    }
}

/// Aire de l'intersection, `None` si elle n'est pas définie
pub fn intersection_area(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> Option<f64> {
    // Les opérations booléennes de `geo` peuvent paniquer sur des anneaux invalides
    let intersection = catch_unwind(AssertUnwindSafe(|| a.intersection(b))).ok()?;
    let area = intersection.unsigned_area();
    area.is_finite().then_some(area)
}

fn polygons_intersect(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> bool {
    a.0.iter().any(|pa| b.0.iter().any(|pb| pa.intersects(pb)))
}
