//! Boundary geometry loading for site placement.
//!
//! Each site has one GeoJSON file named `<site_id>.geojson`. Files come from
//! several historical exports and are not consistently UTF-8, so every file
//! is decoded with an ordered list of strict decoders (UTF-8, Windows-1252,
//! Latin-1) and the first one that yields parseable GeoJSON wins.
//!
//! Per-file failures never abort the load: the file is skipped and a
//! [`GeometryWarning`] is recorded in the returned [`GeometryIndex`].

use crate::site::{Bounds, Centroid, Site, SiteId, SourceEncoding};
use anyhow::Context;
use geo::{BoundingRect, Centroid as _, CoordsIter};
use geojson::{Feature, GeoJson};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// File extension of boundary files.
pub const GEOMETRY_EXTENSION: &str = "geojson";

/// Canonical name property key. Preferred when both variants are present.
pub const NAME_KEY: &str = "RAM_NAME";
/// Lower-case variant found in some exports.
pub const NAME_KEY_LOWER: &str = "ram_name";

/// Placeholder display name for boundaries that carry no name property.
pub const UNNAMED: &str = "N/A";

/// Decoders in the order they are attempted.
const DECODERS: [SourceEncoding; 3] = [
    SourceEncoding::Utf8,
    SourceEncoding::Windows1252,
    SourceEncoding::Latin1,
];

/// Bytes left undefined by the Windows-1252 code page.
const CP1252_UNDEFINED: [u8; 5] = [0x81, 0x8D, 0x8F, 0x90, 0x9D];

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// A non-fatal problem with one boundary file.
#[derive(Debug, Clone, PartialEq)]
pub enum GeometryWarning {
    /// The file could not be read from disk.
    Unreadable { path: PathBuf, reason: String },
    /// No decoder produced valid GeoJSON.
    Undecodable { site_id: SiteId, path: PathBuf },
    /// The GeoJSON has no usable polygon coordinates.
    NoGeometry { site_id: SiteId },
    /// Neither name property key is present.
    MissingName { site_id: SiteId },
}

impl fmt::Display for GeometryWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeometryWarning::Unreadable { path, reason } => {
                write!(f, "could not read {}: {}", path.display(), reason)
            }
            GeometryWarning::Undecodable { site_id, path } => write!(
                f,
                "site {}: {} is not valid GeoJSON under UTF-8, Windows-1252 or Latin-1",
                site_id,
                path.display()
            ),
            GeometryWarning::NoGeometry { site_id } => {
                write!(f, "site {}: boundary has no coordinates", site_id)
            }
            GeometryWarning::MissingName { site_id } => {
                write!(f, "site {}: no {} property, using '{}'", site_id, NAME_KEY, UNNAMED)
            }
        }
    }
}

/// Loaded sites keyed by id, plus the warnings collected along the way.
#[derive(Debug, Clone, Default)]
pub struct GeometryIndex {
    sites: BTreeMap<SiteId, Site>,
    warnings: Vec<GeometryWarning>,
}

impl GeometryIndex {
    pub fn from_sites(sites: impl IntoIterator<Item = Site>) -> Self {
        GeometryIndex {
            sites: sites.into_iter().map(|s| (s.id.clone(), s)).collect(),
            warnings: Vec::new(),
        }
    }

    pub fn get(&self, id: &SiteId) -> Option<&Site> {
        self.sites.get(id)
    }

    pub fn contains(&self, id: &SiteId) -> bool {
        self.sites.contains_key(id)
    }

    /// Sites in id order.
    pub fn sites(&self) -> impl Iterator<Item = &Site> {
        self.sites.values()
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    pub fn warnings(&self) -> &[GeometryWarning] {
        &self.warnings
    }
}

/// Load every `*.geojson` file in `dir`.
///
/// Only a missing or unlistable directory is an error.
pub fn load_geometry_dir(dir: &Path) -> anyhow::Result<GeometryIndex> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to list geometry directory {}", dir.display()))?;

    let mut paths = Vec::new();
    let mut index = GeometryIndex::default();
    for entry in entries {
        match entry {
            Ok(entry) => {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) == Some(GEOMETRY_EXTENSION) {
                    paths.push(path);
                }
            }
            Err(e) => index.warnings.push(GeometryWarning::Unreadable {
                path: dir.to_path_buf(),
                reason: e.to_string(),
            }),
        }
    }
    paths.sort();

    for path in paths {
        let Some(site_id) = path.file_stem().and_then(|s| s.to_str()).map(SiteId::from) else {
            index.warnings.push(GeometryWarning::Unreadable {
                path: path.clone(),
                reason: "file name is not valid UTF-8".to_string(),
            });
            continue;
        };
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) => {
                index.warnings.push(GeometryWarning::Unreadable {
                    path,
                    reason: e.to_string(),
                });
                continue;
            }
        };
        match parse_site(site_id, &path, &bytes, &mut index.warnings) {
            Some(site) => {
                index.sites.insert(site.id.clone(), site);
            }
            None => continue,
        }
    }

    for warning in &index.warnings {
        log::warn!("[WSD] geometry: {}", warning);
    }
    log::info!(
        "[WSD] geometry: Loaded {} site boundaries from {}, {} warnings",
        index.sites.len(),
        dir.display(),
        index.warnings.len()
    );
    Ok(index)
}

/// Decode, parse and place one boundary file.
pub fn parse_site(
    site_id: SiteId,
    path: &Path,
    bytes: &[u8],
    warnings: &mut Vec<GeometryWarning>,
) -> Option<Site> {
    let Some((geojson, encoding)) = decode_geojson(bytes) else {
        warnings.push(GeometryWarning::Undecodable {
            site_id,
            path: path.to_path_buf(),
        });
        return None;
    };
    if encoding != SourceEncoding::Utf8 {
        log::debug!("[WSD] geometry: site {} decoded as {}", site_id, encoding);
    }

    let features = features_of(geojson);
    let name = match display_name(&features) {
        Some(name) => name,
        None => {
            warnings.push(GeometryWarning::MissingName {
                site_id: site_id.clone(),
            });
            UNNAMED.to_string()
        }
    };

    let Some((centroid, bounds)) = placement(features) else {
        warnings.push(GeometryWarning::NoGeometry { site_id });
        return None;
    };

    Some(Site {
        id: site_id,
        name,
        centroid,
        bounds,
        encoding,
    })
}

/// Try each decoder in order, returning the first text that parses.
fn decode_geojson(bytes: &[u8]) -> Option<(GeoJson, SourceEncoding)> {
    DECODERS.iter().find_map(|encoding| {
        let text = decode_strict(*encoding, bytes)?;
        match text.parse::<GeoJson>() {
            Ok(geojson) => Some((geojson, *encoding)),
            Err(e) => {
                log::debug!("[WSD] geometry: {} text did not parse: {}", encoding, e);
                None
            }
        }
    })
}

/// Decode without ever substituting replacement characters.
pub fn decode_strict(encoding: SourceEncoding, bytes: &[u8]) -> Option<String> {
    match encoding {
        SourceEncoding::Utf8 => {
            let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
            encoding_rs::UTF_8
                .decode_without_bom_handling_and_without_replacement(bytes)
                .map(|text| text.into_owned())
        }
        SourceEncoding::Windows1252 => {
            if bytes.iter().any(|b| CP1252_UNDEFINED.contains(b)) {
                return None;
            }
            encoding_rs::WINDOWS_1252
                .decode_without_bom_handling_and_without_replacement(bytes)
                .map(|text| text.into_owned())
        }
        // ISO-8859-1 maps every byte to the code point of the same value.
        SourceEncoding::Latin1 => Some(bytes.iter().map(|&b| char::from(b)).collect()),
    }
}

fn features_of(geojson: GeoJson) -> Vec<Feature> {
    match geojson {
        GeoJson::FeatureCollection(collection) => collection.features,
        GeoJson::Feature(feature) => vec![feature],
        GeoJson::Geometry(geometry) => vec![Feature {
            bbox: None,
            geometry: Some(geometry),
            id: None,
            properties: None,
            foreign_members: None,
        }],
    }
}

/// Name from the first feature that has one, `RAM_NAME` before `ram_name`.
fn display_name(features: &[Feature]) -> Option<String> {
    features.iter().find_map(|feature| {
        [NAME_KEY, NAME_KEY_LOWER].iter().find_map(|key| {
            match feature.property(key)? {
                serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                serde_json::Value::Number(n) => Some(n.to_string()),
                _ => None,
            }
        })
    })
}

/// Centroid and bounding box over all feature geometries.
fn placement(features: Vec<Feature>) -> Option<(Centroid, Bounds)> {
    let geometries: Vec<geo::Geometry<f64>> = features
        .into_iter()
        .filter_map(|feature| feature.geometry)
        .filter_map(|geometry| match geo::Geometry::<f64>::try_from(&geometry.value) {
            Ok(g) => Some(g),
            Err(e) => {
                log::debug!("[WSD] geometry: unsupported geometry: {}", e);
                None
            }
        })
        .collect();
    let collection = geo::GeometryCollection(geometries);

    let rect = collection.bounding_rect()?;
    let bounds = Bounds {
        min_lon: rect.min().x,
        min_lat: rect.min().y,
        max_lon: rect.max().x,
        max_lat: rect.max().y,
    };

    let centroid = collection
        .centroid()
        .map(|p| Centroid { lat: p.y(), lon: p.x() })
        .filter(|c| c.lat.is_finite() && c.lon.is_finite() && bounds.contains(c))
        .or_else(|| vertex_mean(&collection))?;
    Some((centroid, bounds))
}

/// Arithmetic mean of all vertices.
fn vertex_mean(collection: &geo::GeometryCollection<f64>) -> Option<Centroid> {
    let (mut sum_x, mut sum_y, mut n) = (0.0, 0.0, 0usize);
    for coord in collection.coords_iter() {
        sum_x += coord.x;
        sum_y += coord.y;
        n += 1;
    }
    if n == 0 {
        return None;
    }
    Some(Centroid {
        lat: sum_y / n as f64,
        lon: sum_x / n as f64,
    })
}
