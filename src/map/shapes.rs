use geo::{Contains, LineString, MultiPolygon, Point, Polygon};
use serde::Deserialize;
use serde_json::Value as JsonValue;

use super::MapDataError;

/// One country outline from the world GeoJSON, in lon/lat degrees.
#[derive(Debug, Clone, PartialEq)]
pub struct CountryShape {
    pub name: String,
    pub geometry: MultiPolygon<f64>,
}

impl CountryShape {
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        self.geometry.contains(&Point::new(lon, lat))
    }

    /// Every ring (exteriors and holes) as plot points.
    pub fn rings(&self) -> impl Iterator<Item = Vec<[f64; 2]>> + '_ {
        self.geometry.iter().flat_map(|polygon| {
            std::iter::once(polygon.exterior())
                .chain(polygon.interiors())
                .map(|ring| ring.coords().map(|c| [c.x, c.y]).collect())
        })
    }
}

/// All country shapes, in file order.
#[derive(Debug, Clone, Default)]
pub struct WorldShapes {
    pub countries: Vec<CountryShape>,
}

#[derive(Deserialize)]
struct FeatureCollection {
    features: Vec<Feature>,
}

#[derive(Deserialize)]
struct Feature {
    #[serde(default)]
    properties: Properties,
    geometry: Option<JsonValue>,
}

#[derive(Deserialize, Default)]
struct Properties {
    name: Option<String>,
}

/// Parse a GeoJSON `FeatureCollection`.
///
/// Expected shape (as in the folium world-countries file):
///
/// ```json
/// { "type": "FeatureCollection",
///   "features": [
///     { "properties": { "name": "Chile" },
///       "geometry": { "type": "Polygon", "coordinates": [[[lon, lat], ...]] } } ] }
/// ```
///
/// Features without a name or with a non-polygonal geometry are skipped.
pub fn parse_world(bytes: &[u8]) -> Result<WorldShapes, MapDataError> {
    let collection: FeatureCollection = serde_json::from_slice(bytes)?;

    let countries: Vec<CountryShape> = collection
        .features
        .into_iter()
        .filter_map(|f| {
            let name = f.properties.name?;
            let geometry = f.geometry.as_ref().and_then(multi_polygon)?;
            Some(CountryShape { name, geometry })
        })
        .collect();

    if countries.is_empty() {
        return Err(MapDataError::NoFeatures);
    }
    Ok(WorldShapes { countries })
}

fn multi_polygon(geometry: &JsonValue) -> Option<MultiPolygon<f64>> {
    let coords = geometry.get("coordinates")?;
    let polygons: Vec<&JsonValue> = match geometry.get("type")?.as_str()? {
        "Polygon" => vec![coords],
        "MultiPolygon" => coords.as_array()?.iter().collect(),
        _ => return None,
    };

    let polygons = polygons
        .into_iter()
        .map(polygon)
        .collect::<Option<Vec<_>>>()?;
    (!polygons.is_empty()).then(|| MultiPolygon::new(polygons))
}

/// First ring is the exterior, the rest are holes.
fn polygon(rings: &JsonValue) -> Option<Polygon<f64>> {
    let mut rings = rings.as_array()?.iter().map(line_string);
    let exterior = rings.next()??;
    let interiors = rings.collect::<Option<Vec<_>>>()?;
    Some(Polygon::new(exterior, interiors))
}

fn line_string(ring: &JsonValue) -> Option<LineString<f64>> {
    let coords: Vec<[f64; 2]> = ring
        .as_array()?
        .iter()
        .map(|pos| {
            let pos = pos.as_array()?;
            Some([pos.first()?.as_f64()?, pos.get(1)?.as_f64()?])
        })
        .collect::<Option<_>>()?;
    Some(LineString::from(coords))
}
