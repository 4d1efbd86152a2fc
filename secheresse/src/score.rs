//! Score des zones pour départager les superpositions

use std::cmp::Ordering;

use crate::types::{NiveauxTable, ReglesGestion, TypeZone, Zone};
use crate::SecheresseError;

/// Priorité des types de zone pour un département
///
/// Le premier type de la liste des règles de gestion a le rang le plus élevé;
/// un type absent de la liste a le rang 0.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypePriority {
    order: Vec<TypeZone>,
}

impl TypePriority {
    pub fn from_preferences(preferences: &[TypeZone]) -> Self {
        let mut order = Vec::with_capacity(preferences.len());
        for type_zone in preferences {
            if !order.contains(type_zone) {
                order.push(*type_zone);
            }
        }
        Self { order }
    }

    pub fn from_regles(regles: &ReglesGestion) -> Self {
        Self::from_preferences(&regles.affichage_restriction_si_superposition_type_zone)
    }

    pub fn rank(&self, type_zone: TypeZone) -> usize {
        self.order
            .iter()
            .position(|t| *t == type_zone)
            .map(|idx| self.order.len() - idx)
            .unwrap_or(0)
    }
}

/// Score comparable d'une zone: rang du type, puis ordinal du niveau brut
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ZoneScore {
    type_rank: usize,
    niveau_rank: usize,
}

impl ZoneScore {
    pub fn type_rank(&self) -> usize {
        self.type_rank
    }

    pub fn niveau_rank(&self) -> usize {
        self.niveau_rank
    }
}

/// Calcule le score d'une zone
///
/// Pour un particulier la priorité de type domine puis le niveau brut
/// départage. Sinon seul le niveau brut compte.
pub fn compute_zone_score(
    zone: &Zone,
    is_particulier: bool,
    priority: &TypePriority,
    niveaux: &NiveauxTable,
) -> Result<ZoneScore, SecheresseError> {
    let niveau_rank = niveaux
        .rank(&zone.niveau_alerte)
        .ok_or_else(|| SecheresseError::unknown_niveau(&zone.id_zone, &zone.niveau_alerte))?;

    let type_rank = if is_particulier {
        priority.rank(zone.type_zone)
    } else {
        0
    };

    Ok(ZoneScore {
        type_rank,
        niveau_rank,
    })
}

/// Sélectionne la zone de score maximal
///
/// À score égal, la zone d'identifiant le plus petit l'emporte, ce qui rend
/// le résultat indépendant de l'ordre des candidates.
pub fn max_zone<'a, I>(
    zones: I,
    is_particulier: bool,
    priority: &TypePriority,
    niveaux: &NiveauxTable,
) -> Result<Option<&'a Zone>, SecheresseError>
where
    I: IntoIterator<Item = &'a Zone>,
{
    let mut best: Option<(ZoneScore, &'a Zone)> = None;

    for zone in zones {
        let score = compute_zone_score(zone, is_particulier, priority, niveaux)?;
        let better = match &best {
            None => true,
            Some((best_score, best_zone)) => match score.cmp(best_score) {
                Ordering::Greater => true,
                Ordering::Equal => zone.id_zone < best_zone.id_zone,
                Ordering::Less => false,
            },
        };
        if better {
            best = Some((score, zone));
        }
    }

    Ok(best.map(|(_, zone)| zone))
}
