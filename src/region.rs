//! Region of interest and the point-in-polygon filter
//!
//! A region is a simple closed polygon in the (longitude, latitude) plane plus the
//! bounding box derived from it. The bounding box is only a pre-filter for upstream
//! queries; membership is always decided against the exact polygon.
//!
//! Points lying exactly on an edge or vertex are treated as outside. That boundary
//! case is accepted as ambiguous rather than handled specially.

use std::path::Path;

use anyhow::{Context, Result, bail};
use geo::algorithm::line_intersection::line_intersection;
use geo::{Area, BoundingRect, Contains, Coord, LineString, Point, Polygon};
use serde::{Deserialize, Serialize};

/// Axis-aligned box in degrees, inclusive on every side
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    pub fn contains(&self, longitude: f64, latitude: f64) -> bool {
        (self.min_lon..=self.max_lon).contains(&longitude)
            && (self.min_lat..=self.max_lat).contains(&latitude)
    }
}

/// Point-in-polygon test over (longitude, latitude)
///
/// Pure; callers run it once per candidate position per pass. Non-finite
/// coordinates are never inside.
pub fn contains(polygon: &Polygon<f64>, point: Point<f64>) -> bool {
    if !point.x().is_finite() || !point.y().is_finite() {
        return false;
    }
    polygon.contains(&point)
}

#[derive(Debug, Clone)]
pub struct Region {
    name: String,
    polygon: Polygon<f64>,
    bbox: BoundingBox,
}

impl Region {
    /// Build a region from (longitude, latitude) vertices
    ///
    /// The ring is closed automatically. Rejects rings with fewer than three
    /// distinct vertices, coordinates outside WGS84 ranges, and self-intersecting rings.
    pub fn new(name: impl Into<String>, vertices: &[(f64, f64)]) -> Result<Self> {
        let name = name.into();

        for (i, (lon, lat)) in vertices.iter().enumerate() {
            if !lon.is_finite() || !(-180.0..=180.0).contains(lon) {
                bail!("Region {}: vertex {} longitude {} out of range", name, i, lon);
            }
            if !lat.is_finite() || !(-90.0..=90.0).contains(lat) {
                bail!("Region {}: vertex {} latitude {} out of range", name, i, lat);
            }
        }

        let exterior: LineString<f64> = vertices
            .iter()
            .map(|&(x, y)| Coord { x, y })
            .collect::<Vec<_>>()
            .into();
        let polygon = Polygon::new(exterior, vec![]);

        // exterior() is closed here, so the last coordinate repeats the first
        let distinct_vertices = polygon.exterior().0.len().saturating_sub(1);
        if distinct_vertices < 3 {
            bail!(
                "Region {}: polygon needs at least 3 vertices, got {}",
                name,
                distinct_vertices
            );
        }

        if is_self_intersecting(&polygon) {
            bail!("Region {}: polygon edges must not cross", name);
        }

        // Collinear vertices pass the crossing check but enclose nothing
        if polygon.unsigned_area() == 0.0 {
            bail!("Region {}: polygon has zero area", name);
        }

        let rect = polygon
            .bounding_rect()
            .with_context(|| format!("Region {}: polygon has no extent", name))?;
        let bbox = BoundingBox {
            min_lat: rect.min().y,
            max_lat: rect.max().y,
            min_lon: rect.min().x,
            max_lon: rect.max().x,
        };

        Ok(Self {
            name,
            polygon,
            bbox,
        })
    }

    /// Rough national box used when no region file is configured
    pub fn turkey() -> Self {
        Self::new(
            "Turkey",
            &[(25.0, 35.0), (45.5, 35.0), (45.5, 42.5), (25.0, 42.5)],
        )
        .expect("built-in region is valid")
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn polygon(&self) -> &Polygon<f64> {
        &self.polygon
    }

    pub fn bounding_box(&self) -> BoundingBox {
        self.bbox
    }

    pub fn contains(&self, longitude: f64, latitude: f64) -> bool {
        contains(&self.polygon, Point::new(longitude, latitude))
    }
}

/// Any two non-adjacent edges touching means the ring is not simple
fn is_self_intersecting(polygon: &Polygon<f64>) -> bool {
    let edges: Vec<_> = polygon.exterior().lines().collect();
    let n = edges.len();

    for i in 0..n {
        for j in (i + 1)..n {
            let adjacent = j == i + 1 || (i == 0 && j == n - 1);
            if adjacent {
                continue;
            }
            if line_intersection(edges[i], edges[j]).is_some() {
                return true;
            }
        }
    }
    false
}

/// Region file layout (TOML)
///
/// ```toml
/// name = "Turkey"
/// flagged_prefixes = ["LL"]
/// vertices = [[25.0, 35.0], [45.5, 35.0], [45.5, 42.5], [25.0, 42.5]]
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionFile {
    pub name: String,
    #[serde(default = "default_flagged_prefixes")]
    pub flagged_prefixes: Vec<String>,
    pub vertices: Vec<[f64; 2]>,
}

fn default_flagged_prefixes() -> Vec<String> {
    vec!["LL".to_string()]
}

impl RegionFile {
    pub fn load(path: &Path) -> Result<Self> {
        let contents =
            std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
        toml::from_str(&contents).with_context(|| format!("Failed to parse {:?}", path))
    }

    pub fn region(&self) -> Result<Region> {
        let vertices: Vec<(f64, f64)> = self.vertices.iter().map(|v| (v[0], v[1])).collect();
        Region::new(self.name.clone(), &vertices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> Region {
        Region::new("triangle", &[(0.0, 0.0), (10.0, 0.0), (5.0, 10.0)]).unwrap()
    }

    #[test]
    fn test_interior_points_are_inside() {
        let region = Region::turkey();

        assert!(region.contains(32.85, 39.93)); // Ankara
        assert!(region.contains(28.97, 41.01)); // Istanbul
        assert!(region.contains(25.01, 35.01));
    }

    #[test]
    fn test_far_points_are_outside() {
        let region = Region::turkey();

        assert!(!region.contains(34.88, 32.01)); // south of the box
        assert!(!region.contains(2.35, 48.85));
        assert!(!region.contains(-100.0, -45.0));
    }

    #[test]
    fn test_polygon_is_tighter_than_bbox() {
        let region = triangle();
        let bbox = region.bounding_box();

        // Inside the bbox corner, outside the triangle
        assert!(bbox.contains(0.5, 9.5));
        assert!(!region.contains(0.5, 9.5));
        assert!(region.contains(5.0, 5.0));
    }

    #[test]
    fn test_bbox_covers_polygon() {
        let region = triangle();
        let bbox = region.bounding_box();

        assert_eq!(bbox.min_lon, 0.0);
        assert_eq!(bbox.max_lon, 10.0);
        assert_eq!(bbox.min_lat, 0.0);
        assert_eq!(bbox.max_lat, 10.0);
        for coord in region.polygon().exterior().coords() {
            assert!(bbox.contains(coord.x, coord.y));
        }
    }

    #[test]
    fn test_winding_direction_does_not_matter() {
        let clockwise = Region::new("cw", &[(0.0, 0.0), (0.0, 4.0), (4.0, 4.0), (4.0, 0.0)]).unwrap();
        let counter =
            Region::new("ccw", &[(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0)]).unwrap();

        assert!(clockwise.contains(2.0, 2.0));
        assert!(counter.contains(2.0, 2.0));
        assert!(!clockwise.contains(5.0, 2.0));
        assert!(!counter.contains(5.0, 2.0));
    }

    #[test]
    fn test_non_finite_point_is_outside() {
        let region = Region::turkey();
        assert!(!region.contains(f64::NAN, 39.0));
        assert!(!region.contains(30.0, f64::INFINITY));
    }

    #[test]
    fn test_explicitly_closed_ring_is_accepted() {
        let region = Region::new(
            "closed",
            &[(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0), (0.0, 0.0)],
        )
        .unwrap();
        assert!(region.contains(1.0, 1.0));
    }

    #[test]
    fn test_rejects_too_few_vertices() {
        assert!(Region::new("line", &[(0.0, 0.0), (1.0, 1.0)]).is_err());
    }

    #[test]
    fn test_rejects_collinear_vertices() {
        let result = Region::new("line", &[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)]);
        assert!(result.is_err());
        assert!(Region::new("diagonal", &[(0.0, 0.0), (1.0, 1.0), (3.0, 3.0), (2.0, 2.0)]).is_err());
    }

    #[test]
    fn test_rejects_bow_tie() {
        let result = Region::new("bowtie", &[(0.0, 0.0), (4.0, 4.0), (4.0, 0.0), (0.0, 4.0)]);
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_out_of_range_coordinates() {
        assert!(Region::new("bad", &[(0.0, 0.0), (190.0, 0.0), (5.0, 5.0)]).is_err());
        assert!(Region::new("bad", &[(0.0, 0.0), (10.0, 95.0), (5.0, 5.0)]).is_err());
    }

    #[test]
    fn test_region_file_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("region.toml");
        std::fs::write(
            &path,
            r#"
name = "Cyprus"
flagged_prefixes = ["LL", "OJ"]
vertices = [[32.2, 34.5], [34.6, 34.5], [34.6, 35.7], [32.2, 35.7]]
"#,
        )
        .unwrap();

        let file = RegionFile::load(&path).unwrap();
        assert_eq!(file.flagged_prefixes, vec!["LL", "OJ"]);

        let region = file.region().unwrap();
        assert_eq!(region.name(), "Cyprus");
        assert!(region.contains(33.4, 35.1));
    }

    #[test]
    fn test_region_file_defaults_prefixes() {
        let file: RegionFile = toml::from_str(
            r#"
name = "Box"
vertices = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0]]
"#,
        )
        .unwrap();
        assert_eq!(file.flagged_prefixes, vec!["LL"]);
    }
}
