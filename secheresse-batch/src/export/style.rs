//! Style déclaratif et emprises des cartes pour le moteur de rendu externe

use serde::Serialize;
use serde_json::{json, Value};

use secheresse::NiveauAlerte;

/// Taille des images rendues (pixels)
pub const MAP_SIZE: u32 = 1024;

/// Emprise d'une carte
#[derive(Debug, Clone, Serialize)]
pub struct Viewport {
    pub name: &'static str,
    pub center: [f64; 2],
    pub zoom: f64,
    pub width: u32,
    pub height: u32,
}

const fn viewport(name: &'static str, center: [f64; 2], zoom: f64) -> Viewport {
    Viewport {
        name,
        center,
        zoom,
        width: MAP_SIZE,
        height: MAP_SIZE,
    }
}

/// Métropole et outre-mer
pub const VIEWPORTS: &[Viewport] = &[
    viewport("metropole", [2.35, 46.5], 5.5),
    viewport("guadeloupe", [-61.4, 16.17], 9.7),
    viewport("martinique", [-61.02, 14.64], 10.3),
    viewport("guyane", [-53.2, 3.95], 7.5),
    viewport("reunion", [55.53, -21.13], 10.0),
    viewport("mayotte", [45.15, -12.82], 10.8),
];

/// Couleur de remplissage d'un niveau
pub fn niveau_color(niveau: NiveauAlerte) -> &'static str {
    match niveau {
        NiveauAlerte::Aucun => "#D7D7D7",
        NiveauAlerte::Vigilance => "#009081",
        NiveauAlerte::Alerte => "#c3992a",
        NiveauAlerte::AlerteRenforcee => "#ce614a",
        NiveauAlerte::Crise => "#e1000f",
    }
}

/// Style de la carte: fond blanc, communes colorées selon `niveauAlerte`
pub fn map_style(source_url: &str) -> Value {
    let mut fill_color = vec![json!("match"), json!(["get", "niveauAlerte"])];
    for niveau in NiveauAlerte::ALL {
        fill_color.push(json!(niveau.ordinal()));
        fill_color.push(json!(niveau_color(niveau)));
    }
    fill_color.push(json!("#000"));

    json!({
        "version": 8,
        "sources": {
            "communes": {
                "type": "geojson",
                "data": source_url
            }
        },
        "layers": [
            {
                "id": "background",
                "type": "background",
                "paint": {"background-color": "#fff"}
            },
            {
                "id": "commune-alerte",
                "type": "fill",
                "source": "communes",
                "paint": {"fill-color": fill_color}
            }
        ]
    })
}
