//! Modules d'export de la carte (GeoJSON, style de rendu)

pub mod geojson;
pub mod style;

pub use style::{map_style, Viewport, VIEWPORTS};
