//! Définition et implémentation des commandes CLI
//!
//! - `compute-communes`: affectation géométrique des communes aux zones
//! - `compute-maps`: carte des niveaux par commune (GeoJSON + style)
//! - `update-situations`: mise à jour des situations des abonnés

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use tracing::{info, warn};

use secheresse::{
    compose_map, CommuneZonesIndex, GeometryAssigner, LevelResolver, LogSink, Reconciler,
};

use crate::config::Config;
use crate::data;
use crate::export::{self, VIEWPORTS};
use crate::feed;
use crate::report::RunReport;
use crate::store::{self, DatabaseConfig, DatabaseOverrides, PgSubscriptionStore};
use crate::webhook;

/// Nom du fichier GeoJSON de la carte
const MAP_FILE: &str = "carte.geojson";

#[derive(Subcommand)]
pub enum Commands {
    /// Compute the communes affected by each zone from their geometries
    ComputeCommunes {
        /// Zone declarations (JSON array)
        #[arg(short, long)]
        zones: PathBuf,

        /// Zone polygons (GeoJSON, `id_zone` property)
        #[arg(long)]
        zone_geometries: PathBuf,

        /// Commune polygons (GeoJSON, `code` and `departement` properties)
        #[arg(long)]
        commune_geometries: PathBuf,

        /// Output file (défaut : réécrit le fichier des zones)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Compute the alert level map by commune
    ComputeMaps {
        /// Zone declarations with their communes (JSON array)
        #[arg(short, long)]
        zones: PathBuf,

        /// Commune reference data (JSON array)
        #[arg(short, long)]
        communes: PathBuf,

        /// Simplified commune polygons (GeoJSON, `code` property)
        #[arg(long)]
        commune_geometries: PathBuf,

        /// Config preset name (default) or path to a JSON config
        #[arg(long, default_value = "default")]
        config: String,

        /// Output directory
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Update subscriber situations and send the digest
    UpdateSituations {
        /// Zone declarations with their communes (JSON array)
        #[arg(short, long)]
        zones: PathBuf,

        /// Commune reference data (JSON array)
        #[arg(short, long)]
        communes: PathBuf,

        /// Config preset name (default) or path to a JSON config
        #[arg(long, default_value = "default")]
        config: String,

        /// Base URL of the alerting data feed
        #[arg(long, env = "PROPLUVIA_DATA_URL")]
        data_url: String,

        /// Webhook receiving the digest (optionnel)
        #[arg(long, env = "WEBHOOK_URL")]
        webhook_url: Option<String>,

        /// PostgreSQL schema of the subscriptions table
        #[arg(long, default_value = store::DEFAULT_SCHEMA)]
        schema: String,

        /// Compute without persisting situations nor sending the digest
        #[arg(long)]
        dry_run: bool,

        /// Save the run report as JSON
        #[arg(long)]
        report: Option<PathBuf>,

        #[command(flatten)]
        database: DatabaseArgs,
    },
}

/// Options de connexion PostgreSQL
#[derive(Args, Debug, Clone, Default)]
pub struct DatabaseArgs {
    /// PostgreSQL host (défaut : env PGHOST / localhost)
    #[arg(long)]
    pub host: Option<String>,

    /// PostgreSQL database name (défaut : env PGDATABASE / secheresse)
    #[arg(long)]
    pub database: Option<String>,

    /// PostgreSQL user (défaut : env PGUSER / postgres)
    #[arg(long)]
    pub user: Option<String>,

    /// PostgreSQL password (défaut : env PGPASSWORD)
    #[arg(long)]
    pub password: Option<String>,

    /// PostgreSQL port (défaut : env PGPORT / 5432)
    #[arg(long)]
    pub port: Option<u16>,

    /// SSL mode: disable, prefer, require (défaut : env PGSSLMODE / disable)
    #[arg(long)]
    pub ssl: Option<String>,
}

impl From<DatabaseArgs> for DatabaseOverrides {
    fn from(args: DatabaseArgs) -> Self {
        Self {
            host: args.host,
            port: args.port,
            database: args.database,
            user: args.user,
            password: args.password,
            ssl: args.ssl,
        }
    }
}

/// Exécute une commande
pub async fn run(command: Commands) -> Result<()> {
    match command {
        Commands::ComputeCommunes {
            zones,
            zone_geometries,
            commune_geometries,
            output,
        } => {
            let output = output.unwrap_or_else(|| zones.clone());
            tokio::task::spawn_blocking(move || {
                cmd_compute_communes(&zones, &zone_geometries, &commune_geometries, &output)
            })
            .await
            .context("Compute communes task failed")?
        }
        Commands::ComputeMaps {
            zones,
            communes,
            commune_geometries,
            config,
            output,
        } => cmd_compute_maps(&zones, &communes, &commune_geometries, &config, &output),
        Commands::UpdateSituations {
            zones,
            communes,
            config,
            data_url,
            webhook_url,
            schema,
            dry_run,
            report,
            database,
        } => {
            cmd_update_situations(UpdateOptions {
                zones,
                communes,
                config,
                data_url,
                webhook_url,
                schema,
                dry_run,
                report,
                database: database.into(),
            })
            .await
        }
    }
}

/// Recalcule les communes de chaque zone et réécrit les déclarations
pub fn cmd_compute_communes(
    zones_path: &Path,
    zone_geometries: &Path,
    commune_geometries: &Path,
    output: &Path,
) -> Result<()> {
    let started_at = Instant::now();
    let mut zones = data::load_zones(zones_path)?;
    let assigner = GeometryAssigner::new(
        data::load_zone_geometries(zone_geometries)?,
        data::load_commune_shapes(commune_geometries)?,
    );

    let report = assigner.assign_all(&mut zones);
    data::save_zones(output, &zones)?;

    println!("\n=== Summary ===");
    println!("Zones: {}", zones.len());
    println!("Assigned: {}", report.assigned);
    println!("Zone/commune links: {}", report.links);
    if !report.missing_geometry.is_empty() {
        println!(
            "Zones without geometry (unchanged): {}",
            report.missing_geometry.len()
        );
    }
    println!("Duration: {:.2?}", started_at.elapsed());

    info!(
        output = %output.display(),
        assigned = report.assigned,
        links = report.links,
        "Communes computed"
    );
    Ok(())
}

/// Compose la carte et écrit la collection, le style et les emprises
pub fn cmd_compute_maps(
    zones_path: &Path,
    communes_path: &Path,
    commune_geometries: &Path,
    config_spec: &str,
    output: &Path,
) -> Result<()> {
    let config = Config::resolve(config_spec)?;
    let niveaux = config.niveaux_table()?;
    let referentiel = data::load_referentiel(communes_path, &config)?;
    let index = CommuneZonesIndex::build(data::load_zones(zones_path)?);
    let geometries = data::load_commune_geometries(commune_geometries)?;

    let resolver = LevelResolver::new(&referentiel, &index, &niveaux);
    let (features, report) = compose_map(&resolver, &geometries);

    std::fs::create_dir_all(output)
        .with_context(|| format!("Failed to create directory: {}", output.display()))?;

    export::geojson::export_to_geojson(&features, &output.join(MAP_FILE))?;
    write_json(&output.join("style.json"), &export::map_style(MAP_FILE))?;
    write_json(&output.join("viewports.json"), &VIEWPORTS)?;

    println!("\n=== Summary ===");
    println!("Communes on map: {}", features.len());
    println!("Out of scope (no règles de gestion): {}", report.out_of_scope);
    println!("Without geometry: {}", report.missing_geometry);
    if report.errors > 0 {
        println!("Skipped on error: {}", report.errors);
    }

    info!(output = %output.display(), communes = features.len(), "Map computed");
    Ok(())
}

fn write_json<T: serde::Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}

/// Paramètres de `update-situations`
pub struct UpdateOptions {
    pub zones: PathBuf,
    pub communes: PathBuf,
    pub config: String,
    pub data_url: String,
    pub webhook_url: Option<String>,
    pub schema: String,
    pub dry_run: bool,
    pub report: Option<PathBuf>,
    pub database: DatabaseOverrides,
}

/// Met à jour les situations de tous les abonnés
///
/// Les données d'entrée et la connexion sont toutes vérifiées avant de
/// traiter le premier abonnement.
pub async fn cmd_update_situations(options: UpdateOptions) -> Result<()> {
    let started_at = Instant::now();

    let validated = feed::fetch_validated_zones(&options.data_url).await?;

    let config = Config::resolve(&options.config)?;
    let niveaux = config.niveaux_table()?;
    let referentiel = data::load_referentiel(&options.communes, &config)?;
    let index = CommuneZonesIndex::build(data::load_zones(&options.zones)?);

    let db_config = DatabaseConfig::from_env().with_overrides(options.database)?;
    println!(
        "Database: {}@{}:{}/{} (SSL: {:?})",
        db_config.user, db_config.host, db_config.port, db_config.dbname, db_config.ssl_mode
    );
    let pool = store::create_pool(&db_config)?;
    store::test_connection(&pool).await?;
    let subscriptions = PgSubscriptionStore::new(pool, &options.schema)?;

    let resolver = LevelResolver::new(&referentiel, &index, &niveaux);
    let reconciler = Reconciler::new(&resolver, &validated).dry_run(options.dry_run);
    let stats = reconciler
        .run(&subscriptions, &LogSink)
        .await
        .context("Failed to update situations")?;

    let mut report = RunReport::new(stats, validated.len(), options.dry_run);
    let digest = report.stats.digest();

    if options.dry_run {
        println!("\n{}", digest);
    } else {
        match webhook::send_message(options.webhook_url.as_deref(), &digest).await {
            Ok(sent) => report.digest_sent = sent,
            Err(e) => warn!(error = %e, "Failed to send digest"),
        }
    }

    report.set_duration(started_at.elapsed());
    report.display();

    if let Some(path) = &options.report {
        report.save_to_file(path)?;
        println!("Report saved to {}", path.display());
    }

    info!("Situations updated: {}", report.summary());
    Ok(())
}
