//! The geographic service area of a DRT mode.
use anyhow::{Context, Result, ensure};
use geo::{Contains, Coord, EuclideanDistance, MultiPolygon, Point};
use std::path::Path;

/// The polygonal area within which a DRT mode offers service.
///
/// Coordinates are expected in the scenario CRS (metres), the same system the network and
/// transit schedule use. Immutable after construction and therefore safe to share between
/// concurrent readers.
#[derive(Debug, Clone)]
pub struct ServiceArea {
    area: MultiPolygon<f64>,
}

impl ServiceArea {
    /// Load a service area from an ESRI shapefile.
    ///
    /// All polygon records of the file are merged into one multi-polygon. This is the only
    /// fallible part of the type; queries never fail.
    pub fn from_shapefile(shapefile_path: &Path) -> Result<ServiceArea> {
        let shapes = shapefile::read_shapes_as::<_, shapefile::Polygon>(shapefile_path)
            .with_context(|| {
                format!(
                    "Could not read service area shapefile {}",
                    shapefile_path.display()
                )
            })?;
        ensure!(
            !shapes.is_empty(),
            "Service area shapefile {} contains no polygons",
            shapefile_path.display()
        );

        let polygons = shapes
            .into_iter()
            .flat_map(|shape| MultiPolygon::<f64>::from(shape).0)
            .collect();

        Ok(Self::from_multi_polygon(MultiPolygon(polygons)))
    }

    /// Create a service area directly from a multi-polygon.
    pub fn from_multi_polygon(area: MultiPolygon<f64>) -> ServiceArea {
        ServiceArea { area }
    }

    /// Whether the given coordinate lies inside the service area.
    pub fn contains(&self, coord: Coord<f64>) -> bool {
        self.area.contains(&Point::from(coord))
    }

    /// Whether the given coordinate lies inside the service area expanded by `buffer` metres.
    ///
    /// True for every interior point and for every exterior point whose distance to the area
    /// boundary is at most `buffer`.
    pub fn contains_with_buffer(&self, coord: Coord<f64>, buffer: f64) -> bool {
        let point = Point::from(coord);
        if self.area.contains(&point) {
            return true;
        }

        self.area
            .0
            .iter()
            .any(|polygon| point.euclidean_distance(polygon) <= buffer)
    }
}
