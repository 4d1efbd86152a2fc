//! Résolution du niveau d'alerte effectif d'une commune ou d'un abonné

use crate::index::{CommuneZonesIndex, Referentiel};
use crate::score::{max_zone, TypePriority};
use crate::types::{NiveauAlerte, NiveauxTable, Profil, TypeZone, Zone};
use crate::SecheresseError;

/// Résultat de la résolution pour une localisation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Zones candidates de la localisation
    pub zones: Vec<String>,
    /// Niveau unique (profil particulier)
    pub particulier: Option<NiveauAlerte>,
    /// Niveau eaux souterraines (autres profils)
    pub sou: Option<NiveauAlerte>,
    /// Niveau eaux superficielles (autres profils)
    pub sup: Option<NiveauAlerte>,
}

/// Résout les niveaux d'un ensemble de zones candidates
///
/// Particulier: zone maximale toutes catégories confondues, `Aucun` si aucune
/// candidate. Autres profils: `sou` et `sup` résolus séparément, absents
/// quand aucune zone du type ne s'applique. `types_zones` restreint les axes
/// calculés pour les profils non particuliers (liste vide = tous).
pub fn resolve(
    candidates: &[&Zone],
    profil: Profil,
    types_zones: &[TypeZone],
    priority: &TypePriority,
    niveaux: &NiveauxTable,
) -> Result<Resolution, SecheresseError> {
    let zones = candidates.iter().map(|z| z.id_zone.clone()).collect();

    if profil.is_particulier() {
        let particulier = match max_zone(candidates.iter().copied(), true, priority, niveaux)? {
            Some(zone) => normalize(zone, niveaux)?,
            None => NiveauAlerte::Aucun,
        };

        return Ok(Resolution {
            zones,
            particulier: Some(particulier),
            sou: None,
            sup: None,
        });
    }

    let axis = |type_zone: TypeZone| -> Result<Option<NiveauAlerte>, SecheresseError> {
        if !types_zones.is_empty() && !types_zones.contains(&type_zone) {
            return Ok(None);
        }
        let subset = candidates
            .iter()
            .copied()
            .filter(|z| z.type_zone == type_zone);
        max_zone(subset, false, priority, niveaux)?
            .map(|zone| normalize(zone, niveaux))
            .transpose()
    };

    Ok(Resolution {
        zones,
        particulier: None,
        sou: axis(TypeZone::Sou)?,
        sup: axis(TypeZone::Sup)?,
    })
}

/// Niveau de la commune pour la carte: toutes les zones, ordre général
pub fn resolve_general(
    candidates: &[&Zone],
    priority: &TypePriority,
    niveaux: &NiveauxTable,
) -> Result<NiveauAlerte, SecheresseError> {
    match max_zone(candidates.iter().copied(), false, priority, niveaux)? {
        Some(zone) => normalize(zone, niveaux),
        None => Ok(NiveauAlerte::Aucun),
    }
}

fn normalize(zone: &Zone, niveaux: &NiveauxTable) -> Result<NiveauAlerte, SecheresseError> {
    niveaux
        .niveau(&zone.niveau_alerte)
        .ok_or_else(|| SecheresseError::unknown_niveau(&zone.id_zone, &zone.niveau_alerte))
}

/// Résolution par code commune, à partir des index de l'exécution
pub struct LevelResolver<'a> {
    referentiel: &'a Referentiel,
    index: &'a CommuneZonesIndex,
    niveaux: &'a NiveauxTable,
}

impl<'a> LevelResolver<'a> {
    pub fn new(
        referentiel: &'a Referentiel,
        index: &'a CommuneZonesIndex,
        niveaux: &'a NiveauxTable,
    ) -> Self {
        Self {
            referentiel,
            index,
            niveaux,
        }
    }

    pub fn referentiel(&self) -> &'a Referentiel {
        self.referentiel
    }

    /// Priorité des types pour le département de la commune
    fn priority_for(&self, code_commune: &str) -> Result<TypePriority, SecheresseError> {
        let commune = self
            .referentiel
            .commune(code_commune)
            .ok_or_else(|| SecheresseError::UnknownCommune(code_commune.to_string()))?;
        let regles = self
            .referentiel
            .regles_gestion(&commune.departement)
            .ok_or_else(|| SecheresseError::missing_regles(&commune.departement))?;
        Ok(TypePriority::from_regles(regles))
    }

    /// Niveaux d'un abonné à partir de sa commune
    pub fn resolve_commune(
        &self,
        code_commune: &str,
        profil: Profil,
        types_zones: &[TypeZone],
    ) -> Result<Resolution, SecheresseError> {
        let priority = self.priority_for(code_commune)?;
        let candidates = self.index.zones_for(code_commune);
        resolve(&candidates, profil, types_zones, &priority, self.niveaux)
    }

    /// Niveau d'une commune pour la carte
    pub fn resolve_commune_general(&self, code_commune: &str) -> Result<NiveauAlerte, SecheresseError> {
        let priority = self.priority_for(code_commune)?;
        let candidates = self.index.zones_for(code_commune);
        resolve_general(&candidates, &priority, self.niveaux)
    }
}
