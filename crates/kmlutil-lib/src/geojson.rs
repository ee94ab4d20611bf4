//! GeoJSON export of the paths of a document

use crate::{Coordinate, Document, FeatureArena, Geometry, PathStyle};
use serde_json::{Value, json};

fn position(c: &Coordinate) -> Value {
    match c.alt {
        Some(alt) => json!([c.lon, c.lat, alt]),
        None => json!([c.lon, c.lat]),
    }
}

fn line(coords: &[Coordinate]) -> Value {
    Value::Array(coords.iter().map(position).collect())
}

/// Export every path Placemark as a GeoJSON `FeatureCollection`
///
/// Single paths become `LineString`s and split paths `MultiLineString`s. The
/// resolved line style is carried in the `stroke`, `stroke-width` and
/// `stroke-opacity` properties; `name` is left out for unnamed paths.
pub fn export_paths(doc: &Document) -> Value {
    #[cfg(feature = "profiling")]
    profiling::scope!("geojson::export_paths");

    let ids = doc.id_index();
    let arena = FeatureArena::from_document(doc);

    let features: Vec<Value> = arena
        .iter()
        .filter_map(|feature| {
            let geometry = match feature.geometry.as_ref()? {
                Geometry::Path(coords) => json!({
                    "type": "LineString",
                    "coordinates": line(coords),
                }),
                Geometry::MultiPath(parts) => json!({
                    "type": "MultiLineString",
                    "coordinates": parts.iter().map(|p| line(p)).collect::<Vec<_>>(),
                }),
                _ => return None,
            };
            let style = PathStyle::resolve(doc, feature.node, &ids);
            let mut properties = json!({
                "stroke": format!("#{}", style.color),
                "stroke-width": style.width,
                "stroke-opacity": (style.opacity * 1000.0).round() / 1000.0,
            });
            if let Some(name) = feature.name.as_deref().filter(|n| !n.is_empty()) {
                properties["name"] = Value::from(name);
            }
            Some(json!({
                "type": "Feature",
                "properties": properties,
                "geometry": geometry,
            }))
        })
        .collect();

    tracing::debug!("Exported {} path(s) as GeoJSON", features.len());
    json!({
        "type": "FeatureCollection",
        "features": features,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_paths() {
        let doc = Document::parse(
            r##"<kml><Document>
<Style id="s"><LineStyle><color>800000ff</color><width>5</width></LineStyle></Style>
<Placemark><name>Ridge</name><styleUrl>#s</styleUrl><LineString><coordinates>1,2 3,4,5</coordinates></LineString></Placemark>
<Placemark><name>Hut</name><Point><coordinates>1,1</coordinates></Point></Placemark>
<Placemark><MultiGeometry><LineString><coordinates>0,0 1,1</coordinates></LineString><LineString><coordinates>2,2 3,3</coordinates></LineString></MultiGeometry></Placemark>
</Document></kml>"##,
        )
        .unwrap();

        let collection = export_paths(&doc);
        assert_eq!(collection["type"], "FeatureCollection");
        let features = collection["features"].as_array().unwrap();
        assert_eq!(features.len(), 2);

        let ridge = &features[0];
        assert_eq!(ridge["properties"]["name"], "Ridge");
        assert_eq!(ridge["properties"]["stroke"], "#ff0000");
        assert_eq!(ridge["properties"]["stroke-width"], 5.0);
        assert_eq!(ridge["properties"]["stroke-opacity"], 0.502);
        assert_eq!(ridge["geometry"]["type"], "LineString");
        assert_eq!(ridge["geometry"]["coordinates"], json!([[1.0, 2.0], [3.0, 4.0, 5.0]]));

        let split = &features[1];
        assert!(split["properties"].get("name").is_none());
        assert_eq!(split["properties"]["stroke"], "#000000");
        assert_eq!(split["geometry"]["type"], "MultiLineString");
        assert_eq!(split["geometry"]["coordinates"].as_array().unwrap().len(), 2);
    }
}
