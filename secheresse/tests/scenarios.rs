//! Scénarios de bout en bout: affectation, résolution et réconciliation

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use geo::{polygon, MultiPolygon, Polygon};
use secheresse::{
    AlertChange, AlertSink, CommuneShape, CommuneZonesIndex, GeometryAssigner, LevelResolver,
    NiveauAlerte, NiveauxTable, Outcome, Profil, Reconciler, Referentiel, ReglesGestion,
    SecheresseError, Situation, Subscription, SubscriptionStore, TypeZone, ValidatedZones, Zone,
};

#[derive(Default)]
struct MemoryStore {
    subscriptions: Mutex<Vec<Subscription>>,
    updates: Mutex<Vec<(i64, Situation)>>,
}

impl MemoryStore {
    fn with(subscriptions: Vec<Subscription>) -> Self {
        Self {
            subscriptions: Mutex::new(subscriptions),
            updates: Mutex::new(Vec::new()),
        }
    }

    fn update_count(&self) -> usize {
        self.updates.lock().unwrap().len()
    }

    fn situation(&self, id: i64) -> Situation {
        self.subscriptions
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.id == id)
            .map(|s| s.situation)
            .unwrap()
    }
}

#[async_trait]
impl SubscriptionStore for MemoryStore {
    async fn subscriptions(&self) -> Result<Vec<Subscription>, SecheresseError> {
        Ok(self.subscriptions.lock().unwrap().clone())
    }

    async fn update_situation(&self, id: i64, situation: &Situation) -> Result<(), SecheresseError> {
        if let Some(sub) = self.subscriptions.lock().unwrap().iter_mut().find(|s| s.id == id) {
            sub.situation = *situation;
        }
        self.updates.lock().unwrap().push((id, *situation));
        Ok(())
    }
}

/// Stockage dont les écritures échouent
struct ReadOnlyStore(MemoryStore);

#[async_trait]
impl SubscriptionStore for ReadOnlyStore {
    async fn subscriptions(&self) -> Result<Vec<Subscription>, SecheresseError> {
        self.0.subscriptions().await
    }

    async fn update_situation(&self, _id: i64, _situation: &Situation) -> Result<(), SecheresseError> {
        Err(SecheresseError::Store("read-only".to_string()))
    }
}

#[derive(Default)]
struct RecordingSink(Mutex<Vec<AlertChange>>);

#[async_trait]
impl AlertSink for RecordingSink {
    async fn notify(&self, change: &AlertChange) -> Result<(), SecheresseError> {
        self.0.lock().unwrap().push(change.clone());
        Ok(())
    }
}

fn square(x: f64, y: f64, width: f64, height: f64) -> MultiPolygon<f64> {
    let poly: Polygon<f64> = polygon![
        (x: x, y: y),
        (x: x + width, y: y),
        (x: x + width, y: y + height),
        (x: x, y: y + height),
        (x: x, y: y),
    ];
    MultiPolygon::new(vec![poly])
}

fn zone(id: &str, type_zone: TypeZone, niveau: &str, communes: &[&str]) -> Zone {
    Zone {
        id_zone: id.to_string(),
        departement: "75".to_string(),
        type_zone,
        niveau_alerte: niveau.to_string(),
        communes: communes.iter().map(|c| c.to_string()).collect(),
    }
}

fn referentiel() -> Referentiel {
    let mut regles = HashMap::new();
    regles.insert(
        "75".to_string(),
        ReglesGestion {
            affichage_restriction_si_superposition_type_zone: vec![TypeZone::Sou, TypeZone::Sup],
        },
    );
    Referentiel::new(
        vec![secheresse::Commune {
            code: "75056".to_string(),
            nom: "Paris".to_string(),
            departement: "75".to_string(),
        }],
        regles,
    )
}

fn subscription(id: i64, profil: Profil, commune: &str, situation: Situation) -> Subscription {
    Subscription {
        id,
        email: format!("usager{}@example.org", id),
        lon: 2.35,
        lat: 48.85,
        commune: commune.to_string(),
        profil,
        types_zones: vec![],
        libelle_localisation: "Paris".to_string(),
        situation,
    }
}

fn validated(ids: &[&str]) -> ValidatedZones {
    ids.iter().map(|id| id.to_string()).collect()
}

#[test]
fn test_assignment_then_priority_resolution() {
    // Z recouvre 0.01° x 0.0109° de la commune (~12 ha), Y la recouvre entièrement
    let mut geometries = HashMap::new();
    geometries.insert("Z".to_string(), square(2.3, 48.8, 0.01, 0.0109));
    geometries.insert("Y".to_string(), square(2.2, 48.7, 0.5, 0.5));
    let assigner = GeometryAssigner::new(
        geometries,
        vec![CommuneShape {
            code: "75056".to_string(),
            departement: "75".to_string(),
            geometry: square(2.25, 48.75, 0.2, 0.2),
        }],
    );

    let mut zones = vec![
        zone("Z", TypeZone::Sou, "Alerte renforcée", &[]),
        zone("Y", TypeZone::Sup, "Crise", &[]),
    ];
    let report = assigner.assign_all(&mut zones);
    assert_eq!(report.assigned, 2);
    assert_eq!(zones[0].communes, vec!["75056".to_string()]);
    assert_eq!(zones[1].communes, vec!["75056".to_string()]);

    let referentiel = referentiel();
    let index = CommuneZonesIndex::build(zones);
    let niveaux = NiveauxTable::standard();
    let resolver = LevelResolver::new(&referentiel, &index, &niveaux);

    let resolution = resolver
        .resolve_commune("75056", Profil::Particulier, &[])
        .unwrap();
    assert_eq!(resolution.particulier, Some(NiveauAlerte::AlerteRenforcee));
}

#[tokio::test]
async fn test_professional_with_surface_zones_only() {
    let referentiel = referentiel();
    let index = CommuneZonesIndex::build(vec![
        zone("A", TypeZone::Sup, "Vigilance", &["75056"]),
        zone("B", TypeZone::Sup, "Alerte", &["75056"]),
    ]);
    let niveaux = NiveauxTable::standard();
    let resolver = LevelResolver::new(&referentiel, &index, &niveaux);
    let validated = validated(&["A", "B"]);
    let reconciler = Reconciler::new(&resolver, &validated);

    let store = MemoryStore::with(vec![subscription(
        1,
        Profil::Exploitation,
        "75056",
        Situation::default(),
    )]);
    let sink = RecordingSink::default();

    let stats = reconciler.run(&store, &sink).await.unwrap();

    assert_eq!(stats.notified(NiveauAlerte::Alerte), 1);
    assert_eq!(
        store.situation(1),
        Situation {
            particulier: None,
            sou: None,
            sup: Some(NiveauAlerte::Alerte),
        }
    );
    let changes = sink.0.lock().unwrap();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].commune, "Paris");
    assert_eq!(changes[0].niveau, NiveauAlerte::Alerte);
}

#[tokio::test]
async fn test_unchanged_situation_is_not_persisted() {
    let referentiel = referentiel();
    let index = CommuneZonesIndex::build(vec![zone("A", TypeZone::Sou, "Alerte", &["75056"])]);
    let niveaux = NiveauxTable::standard();
    let resolver = LevelResolver::new(&referentiel, &index, &niveaux);
    let validated = validated(&["A"]);
    let reconciler = Reconciler::new(&resolver, &validated);

    let sub = subscription(
        1,
        Profil::Particulier,
        "75056",
        Situation {
            particulier: Some(NiveauAlerte::Alerte),
            ..Default::default()
        },
    );
    let store = MemoryStore::with(vec![sub.clone()]);
    let sink = RecordingSink::default();

    let outcome = reconciler.reconcile(&sub, &store, &sink).await.unwrap();
    assert_eq!(outcome, Outcome::Unchanged);
    assert_eq!(store.update_count(), 0);
    assert!(sink.0.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_second_run_is_idempotent() {
    let referentiel = referentiel();
    let index = CommuneZonesIndex::build(vec![
        zone("A", TypeZone::Sou, "Crise", &["75056"]),
        zone("B", TypeZone::Sup, "Vigilance", &["75056"]),
    ]);
    let niveaux = NiveauxTable::standard();
    let resolver = LevelResolver::new(&referentiel, &index, &niveaux);
    let validated = validated(&["A", "B"]);
    let reconciler = Reconciler::new(&resolver, &validated);

    let store = MemoryStore::with(vec![
        subscription(1, Profil::Particulier, "75056", Situation::default()),
        subscription(2, Profil::Collectivite, "75056", Situation::default()),
    ]);
    let sink = RecordingSink::default();

    let first = reconciler.run(&store, &sink).await.unwrap();
    assert_eq!(first.notified(NiveauAlerte::Crise), 2);
    assert_eq!(first.notified(NiveauAlerte::Vigilance), 1);
    assert_eq!(store.update_count(), 2);

    let second = reconciler.run(&store, &sink).await.unwrap();
    assert_eq!(second.inchanges, 2);
    assert_eq!(second.total_notified(), 0);
    assert_eq!(store.update_count(), 2);
}

#[tokio::test]
async fn test_validation_gate_blocks_even_without_change() {
    let referentiel = referentiel();
    let index = CommuneZonesIndex::build(vec![
        zone("A", TypeZone::Sou, "Alerte", &["75056"]),
        zone("B", TypeZone::Sup, "Crise", &["75056"]),
    ]);
    let niveaux = NiveauxTable::standard();
    let resolver = LevelResolver::new(&referentiel, &index, &niveaux);
    let validated = validated(&["A"]);
    let reconciler = Reconciler::new(&resolver, &validated);

    let store = MemoryStore::with(vec![
        subscription(1, Profil::Particulier, "75056", Situation::default()),
        subscription(
            2,
            Profil::Particulier,
            "75056",
            Situation {
                particulier: Some(NiveauAlerte::Alerte),
                ..Default::default()
            },
        ),
    ]);
    let sink = RecordingSink::default();

    let stats = reconciler.run(&store, &sink).await.unwrap();
    assert_eq!(stats.non_valides, 2);
    assert_eq!(stats.inchanges, 0);
    assert_eq!(store.update_count(), 0);
    assert!(sink.0.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_commune_without_zone_defaults_to_aucun() {
    let referentiel = referentiel();
    let index = CommuneZonesIndex::build(vec![]);
    let niveaux = NiveauxTable::standard();
    let resolver = LevelResolver::new(&referentiel, &index, &niveaux);
    let validated = ValidatedZones::default();
    let reconciler = Reconciler::new(&resolver, &validated);

    let store = MemoryStore::with(vec![subscription(
        1,
        Profil::Particulier,
        "75056",
        Situation {
            particulier: Some(NiveauAlerte::Vigilance),
            ..Default::default()
        },
    )]);
    let sink = RecordingSink::default();

    let stats = reconciler.run(&store, &sink).await.unwrap();
    assert_eq!(stats.notified(NiveauAlerte::Aucun), 1);
    assert_eq!(store.situation(1).particulier, Some(NiveauAlerte::Aucun));
    assert!(stats.digest().contains("n’ont plus de restrictions"));
}

#[tokio::test]
async fn test_errors_do_not_abort_the_batch() {
    let referentiel = referentiel();
    let index = CommuneZonesIndex::build(vec![
        zone("A", TypeZone::Sou, "Alerte", &["75056"]),
        zone("X", TypeZone::Sup, "Niveau inconnu", &["75999"]),
    ]);
    let niveaux = NiveauxTable::standard();
    let resolver = LevelResolver::new(&referentiel, &index, &niveaux);
    let validated = validated(&["A", "X"]);
    let reconciler = Reconciler::new(&resolver, &validated);

    let store = MemoryStore::with(vec![
        subscription(1, Profil::Particulier, "99999", Situation::default()),
        subscription(2, Profil::Particulier, "75056", Situation::default()),
    ]);
    let sink = RecordingSink::default();

    let stats = reconciler.run(&store, &sink).await.unwrap();
    assert_eq!(stats.erreurs, 1);
    assert_eq!(stats.failures[0].subscription_id, 1);
    assert_eq!(stats.notified(NiveauAlerte::Alerte), 1);
    assert_eq!(store.update_count(), 1);
}

#[tokio::test]
async fn test_store_failure_is_counted() {
    let referentiel = referentiel();
    let index = CommuneZonesIndex::build(vec![zone("A", TypeZone::Sou, "Alerte", &["75056"])]);
    let niveaux = NiveauxTable::standard();
    let resolver = LevelResolver::new(&referentiel, &index, &niveaux);
    let validated = validated(&["A"]);
    let reconciler = Reconciler::new(&resolver, &validated);

    let store = ReadOnlyStore(MemoryStore::with(vec![subscription(
        1,
        Profil::Particulier,
        "75056",
        Situation::default(),
    )]));
    let sink = RecordingSink::default();

    let stats = reconciler.run(&store, &sink).await.unwrap();
    assert_eq!(stats.erreurs, 1);
    assert_eq!(stats.total_notified(), 0);
}

#[tokio::test]
async fn test_dry_run_never_persists() {
    let referentiel = referentiel();
    let index = CommuneZonesIndex::build(vec![zone("A", TypeZone::Sou, "Alerte", &["75056"])]);
    let niveaux = NiveauxTable::standard();
    let resolver = LevelResolver::new(&referentiel, &index, &niveaux);
    let validated = validated(&["A"]);
    let reconciler = Reconciler::new(&resolver, &validated).dry_run(true);

    let store = MemoryStore::with(vec![subscription(
        1,
        Profil::Particulier,
        "75056",
        Situation::default(),
    )]);
    let sink = RecordingSink::default();

    let stats = reconciler.run(&store, &sink).await.unwrap();
    assert_eq!(stats.notified(NiveauAlerte::Alerte), 1);
    assert_eq!(store.update_count(), 0);
}

#[tokio::test]
async fn test_empty_run_has_empty_digest() {
    let referentiel = referentiel();
    let index = CommuneZonesIndex::build(vec![]);
    let niveaux = NiveauxTable::standard();
    let resolver = LevelResolver::new(&referentiel, &index, &niveaux);
    let validated = ValidatedZones::default();
    let reconciler = Reconciler::new(&resolver, &validated);

    let stats = reconciler
        .run(&MemoryStore::default(), &RecordingSink::default())
        .await
        .unwrap();
    assert_eq!(stats.digest(), "");
}
