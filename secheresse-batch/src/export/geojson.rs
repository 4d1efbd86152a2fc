//! Export de la carte des niveaux en GeoJSON avec geozero (streaming)

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use geozero::geojson::GeoJsonWriter;
use geozero::GeozeroGeometry;

use secheresse::CommuneAlerte;

/// Exporte les communes colorées en FeatureCollection GeoJSON
pub fn export_to_geojson(features: &[CommuneAlerte], output_path: &Path) -> Result<()> {
    let file = File::create(output_path)
        .context(format!("Failed to create file: {}", output_path.display()))?;
    let mut writer = BufWriter::new(file);

    write_feature_collection(&mut writer, features)?;
    writer.flush()?;

    Ok(())
}

/// Écrit la FeatureCollection complète
pub fn write_feature_collection<W: Write>(writer: &mut W, features: &[CommuneAlerte]) -> Result<()> {
    write!(writer, r#"{{"type":"FeatureCollection","features":["#)?;

    for (i, feature) in features.iter().enumerate() {
        if i > 0 {
            write!(writer, ",")?;
        }
        write_feature(writer, feature)?;
    }

    write!(writer, "]}}")?;
    Ok(())
}

/// Écrit une commune en GeoJSON
fn write_feature<W: Write>(writer: &mut W, feature: &CommuneAlerte) -> Result<()> {
    write!(writer, r#"{{"type":"Feature","geometry":"#)?;

    let mut geom_buf = Vec::new();
    let mut geom_writer = GeoJsonWriter::new(&mut geom_buf);
    feature.geometry.process_geom(&mut geom_writer)?;
    writer.write_all(&geom_buf)?;

    write!(
        writer,
        r#","properties":{{"commune":"{}","niveauAlerte":{}}}}}"#,
        escape_json(&feature.code),
        feature.niveau.ordinal()
    )?;

    Ok(())
}

/// Échappe une chaîne pour JSON
fn escape_json(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => result.push_str("\\\""),
            '\\' => result.push_str("\\\\"),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\t' => result.push_str("\\t"),
            c if c.is_control() => {
                result.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => result.push(c),
        }
    }
    result
}
