//! Index construits une fois par exécution puis partagés en lecture seule

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::{debug, warn};

use crate::types::{Commune, ReglesGestion, Zone};

/// Référentiel administratif: communes et règles de gestion par département
#[derive(Debug, Clone, Default)]
pub struct Referentiel {
    communes: BTreeMap<String, Commune>,
    regles: HashMap<String, ReglesGestion>,
}

impl Referentiel {
    pub fn new(communes: Vec<Commune>, regles: HashMap<String, ReglesGestion>) -> Self {
        let mut by_code = BTreeMap::new();
        for commune in communes {
            if by_code.contains_key(&commune.code) {
                warn!(commune = %commune.code, "Duplicate commune in referentiel, keeping first");
                continue;
            }
            by_code.insert(commune.code.clone(), commune);
        }

        Self {
            communes: by_code,
            regles,
        }
    }

    /// Communes triées par code
    pub fn communes(&self) -> impl Iterator<Item = &Commune> {
        self.communes.values()
    }

    pub fn commune(&self, code: &str) -> Option<&Commune> {
        self.communes.get(code)
    }

    /// Règles de gestion d'un département (absentes = département hors périmètre)
    pub fn regles_gestion(&self, departement: &str) -> Option<&ReglesGestion> {
        self.regles.get(departement)
    }

    pub fn len(&self) -> usize {
        self.communes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.communes.is_empty()
    }
}

/// Index inversé commune → zones qui la concernent
#[derive(Debug, Clone, Default)]
pub struct CommuneZonesIndex {
    zones: Vec<Zone>,
    by_commune: HashMap<String, Vec<usize>>,
}

impl CommuneZonesIndex {
    /// Construit l'index depuis les listes de communes de chaque zone
    ///
    /// Une zone dont l'identifiant est déjà présent est ignorée; une commune
    /// listée deux fois par la même zone n'est indexée qu'une fois.
    pub fn build(zones: Vec<Zone>) -> Self {
        let mut kept = Vec::with_capacity(zones.len());
        let mut seen = HashSet::new();
        for zone in zones {
            if !seen.insert(zone.id_zone.clone()) {
                warn!(zone = %zone.id_zone, "Duplicate zone, keeping first declaration");
                continue;
            }
            kept.push(zone);
        }

        let mut by_commune: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, zone) in kept.iter().enumerate() {
            for code in &zone.communes {
                let entry = by_commune.entry(code.clone()).or_default();
                if !entry.contains(&idx) {
                    entry.push(idx);
                }
            }
        }

        debug!(
            zones = kept.len(),
            communes = by_commune.len(),
            "Commune index built"
        );

        Self {
            zones: kept,
            by_commune,
        }
    }

    /// Zones candidates pour une commune, dans l'ordre de déclaration
    pub fn zones_for(&self, code: &str) -> Vec<&Zone> {
        self.by_commune
            .get(code)
            .map(|indices| indices.iter().map(|&i| &self.zones[i]).collect())
            .unwrap_or_default()
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    /// Nombre de communes concernées par au moins une zone
    pub fn communes_count(&self) -> usize {
        self.by_commune.len()
    }
}
