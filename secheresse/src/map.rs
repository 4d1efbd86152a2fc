//! Composition de la carte des niveaux d'alerte par commune

use std::collections::HashMap;

use geo::Geometry;
use tracing::{debug, warn};

use crate::resolve::LevelResolver;
use crate::types::NiveauAlerte;
use crate::SecheresseError;

/// Commune colorée selon son niveau d'alerte
#[derive(Debug, Clone, PartialEq)]
pub struct CommuneAlerte {
    pub code: String,
    pub niveau: NiveauAlerte,
    pub geometry: Geometry<f64>,
}

/// Rapport de composition
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MapReport {
    /// Communes hors périmètre (département sans règles de gestion)
    pub out_of_scope: usize,
    /// Communes sans contour
    pub missing_geometry: usize,
    /// Communes ignorées sur erreur de résolution
    pub errors: usize,
}

/// Résout le niveau de chaque commune du référentiel disposant d'un contour
pub fn compose_map(
    resolver: &LevelResolver<'_>,
    geometries: &HashMap<String, Geometry<f64>>,
) -> (Vec<CommuneAlerte>, MapReport) {
    let mut features = Vec::new();
    let mut report = MapReport::default();

    for commune in resolver.referentiel().communes() {
        if resolver
            .referentiel()
            .regles_gestion(&commune.departement)
            .is_none()
        {
            report.out_of_scope += 1;
            continue;
        }

        let Some(geometry) = geometries.get(&commune.code) else {
            debug!(commune = %commune.code, "No geometry for commune");
            report.missing_geometry += 1;
            continue;
        };

        match resolver.resolve_commune_general(&commune.code) {
            Ok(niveau) => features.push(CommuneAlerte {
                code: commune.code.clone(),
                niveau,
                geometry: geometry.clone(),
            }),
            Err(SecheresseError::UnknownNiveau { id_zone, niveau }) => {
                warn!(commune = %commune.code, zone = %id_zone, niveau = %niveau, "Unknown alert level, commune skipped");
                report.errors += 1;
            }
            Err(e) => {
                warn!(commune = %commune.code, error = %e, "Commune skipped");
                report.errors += 1;
            }
        }
    }

    if report.missing_geometry > 0 {
        warn!(count = report.missing_geometry, "Communes without geometry");
    }

    (features, report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{CommuneZonesIndex, Referentiel};
    use crate::types::{Commune, NiveauxTable, ReglesGestion, TypeZone, Zone};
    use geo::Point;

    fn commune(code: &str, departement: &str) -> Commune {
        Commune {
            code: code.to_string(),
            nom: code.to_string(),
            departement: departement.to_string(),
        }
    }

    fn zone(id: &str, type_zone: TypeZone, niveau: &str, communes: &[&str]) -> Zone {
        Zone {
            id_zone: id.to_string(),
            departement: "38".to_string(),
            type_zone,
            niveau_alerte: niveau.to_string(),
            communes: communes.iter().map(|c| c.to_string()).collect(),
        }
    }

    #[test]
    fn test_compose_map() {
        let mut regles = HashMap::new();
        regles.insert(
            "38".to_string(),
            ReglesGestion {
                affichage_restriction_si_superposition_type_zone: vec![TypeZone::Sou, TypeZone::Sup],
            },
        );
        let referentiel = Referentiel::new(
            vec![
                commune("38185", "38"),
                commune("38421", "38"),
                commune("38500", "38"),
                commune("38999", "38"),
                commune("73065", "73"),
            ],
            regles,
        );
        let index = CommuneZonesIndex::build(vec![
            zone("A", TypeZone::Sou, "Vigilance", &["38185"]),
            zone("B", TypeZone::Sup, "Crise", &["38185"]),
            zone("C", TypeZone::Sup, "Inconnu", &["38500"]),
        ]);
        let niveaux = NiveauxTable::standard();
        let resolver = LevelResolver::new(&referentiel, &index, &niveaux);

        let mut geometries = HashMap::new();
        for code in ["38185", "38421", "38500", "73065"] {
            geometries.insert(code.to_string(), Geometry::Point(Point::new(5.7, 45.2)));
        }

        let (features, report) = compose_map(&resolver, &geometries);

        assert_eq!(features.len(), 2);
        assert_eq!(features[0].code, "38185");
        assert_eq!(features[0].niveau, NiveauAlerte::Crise);
        assert_eq!(features[1].code, "38421");
        assert_eq!(features[1].niveau, NiveauAlerte::Aucun);

        assert_eq!(report.out_of_scope, 1);
        assert_eq!(report.missing_geometry, 1);
        assert_eq!(report.errors, 1);
    }
}
