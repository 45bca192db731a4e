// Copyright 2025 the Vigil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Geometry values and the narrow geometry-service interface.
//!
//! The alert engine never does exact geometry itself. Everything that needs
//! projection, geodesic buffering or precise intersection goes through a
//! [`GeometryEngine`]. [`SphericalEngine`] is the reference implementation,
//! built on the `geo` crate over a mean-radius sphere; hosts with a full
//! projection library plug that in instead.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

use geo::{Contains, Destination, Distance, Haversine, Intersects, MapCoords};
use kurbo::{Point, Rect};

/// Coordinate system a [`Geometry`] is expressed in.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum SpatialReference {
    /// Longitude/latitude in degrees (`x` is longitude).
    #[default]
    Wgs84,
    /// Spherical Web Mercator in meters.
    WebMercator,
}

/// Unit of a linear distance.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum LinearUnit {
    /// Meters.
    #[default]
    Meters,
    /// Kilometers.
    Kilometers,
    /// International feet.
    Feet,
    /// Statute miles.
    Miles,
    /// Nautical miles.
    NauticalMiles,
}

impl LinearUnit {
    /// Converts `value` in this unit to meters.
    #[must_use]
    pub fn to_meters(self, value: f64) -> f64 {
        match self {
            Self::Meters => value,
            Self::Kilometers => value * 1_000.0,
            Self::Feet => value * 0.3048,
            Self::Miles => value * 1_609.344,
            Self::NauticalMiles => value * 1_852.0,
        }
    }
}

/// The shape part of a [`Geometry`].
#[derive(Clone, Debug, PartialEq)]
pub enum Shape {
    /// A single position.
    Point(Point),
    /// An open line through the vertices.
    Polyline(Vec<Point>),
    /// A single closed ring; the closing edge is implied.
    Polygon(Vec<Point>),
}

/// A shape tagged with its spatial reference.
#[derive(Clone, Debug, PartialEq)]
pub struct Geometry {
    shape: Shape,
    spatial_reference: SpatialReference,
}

impl Geometry {
    /// Creates a geometry from a shape and spatial reference.
    #[must_use]
    pub fn new(shape: Shape, spatial_reference: SpatialReference) -> Self {
        Self {
            shape,
            spatial_reference,
        }
    }

    /// A WGS84 point at `lon`, `lat` degrees.
    #[must_use]
    pub fn wgs84_point(lon: f64, lat: f64) -> Self {
        Self::new(Shape::Point(Point::new(lon, lat)), SpatialReference::Wgs84)
    }

    /// A WGS84 polygon through `vertices` (degrees).
    #[must_use]
    pub fn wgs84_polygon(vertices: impl IntoIterator<Item = (f64, f64)>) -> Self {
        let ring = vertices.into_iter().map(Point::from).collect();
        Self::new(Shape::Polygon(ring), SpatialReference::Wgs84)
    }

    /// The four-corner polygon covering `rect`.
    #[must_use]
    pub fn envelope(rect: Rect, spatial_reference: SpatialReference) -> Self {
        let r = rect.abs();
        Self::new(
            Shape::Polygon(vec![
                Point::new(r.x0, r.y0),
                Point::new(r.x1, r.y0),
                Point::new(r.x1, r.y1),
                Point::new(r.x0, r.y1),
            ]),
            spatial_reference,
        )
    }

    /// The shape.
    #[must_use]
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// The spatial reference.
    #[must_use]
    pub fn spatial_reference(&self) -> SpatialReference {
        self.spatial_reference
    }

    /// Returns the position if this is a point.
    #[must_use]
    pub fn as_point(&self) -> Option<Point> {
        match self.shape {
            Shape::Point(p) => Some(p),
            _ => None,
        }
    }

    /// Returns `true` for polygons.
    #[must_use]
    pub fn is_polygon(&self) -> bool {
        matches!(self.shape, Shape::Polygon(_))
    }

    /// All vertices, in order. A point has one.
    #[must_use]
    pub fn vertices(&self) -> &[Point] {
        match &self.shape {
            Shape::Point(p) => std::slice::from_ref(p),
            Shape::Polyline(v) | Shape::Polygon(v) => v,
        }
    }

    /// Axis-aligned bounding extent, or `None` for an empty shape.
    #[must_use]
    pub fn extent(&self) -> Option<Rect> {
        let mut vertices = self.vertices().iter();
        let first = *vertices.next()?;
        let mut r = Rect::from_points(first, first);
        for p in vertices {
            r = r.union_pt(*p);
        }
        Some(r)
    }

    /// A representative position: the point itself, or the center of the extent.
    #[must_use]
    pub fn representative_point(&self) -> Option<Point> {
        self.as_point().or_else(|| self.extent().map(|r| r.center()))
    }

    fn map_vertices(&self, spatial_reference: SpatialReference, f: impl Fn(Point) -> Point) -> Self {
        let shape = match &self.shape {
            Shape::Point(p) => Shape::Point(f(*p)),
            Shape::Polyline(v) => Shape::Polyline(v.iter().copied().map(&f).collect()),
            Shape::Polygon(v) => Shape::Polygon(v.iter().copied().map(&f).collect()),
        };
        Self::new(shape, spatial_reference)
    }
}

/// Geometry services consumed by the alert engine.
///
/// Implementations must not panic; failures are reported as `None`, an empty
/// vector, or `false`.
pub trait GeometryEngine {
    /// Re-expresses `geometry` in `to`.
    fn project(&self, geometry: &Geometry, to: SpatialReference) -> Option<Geometry>;

    /// A WGS84 polygon covering every position within `distance` of the WGS84 `center`.
    fn buffer_geodetic(&self, center: Point, distance: f64, unit: LinearUnit) -> Option<Geometry>;

    /// Moves each WGS84 point `distance` along the geodesic starting at `azimuth_degrees`
    /// (clockwise from north).
    fn move_geodetic(
        &self,
        points: &[Point],
        distance: f64,
        unit: LinearUnit,
        azimuth_degrees: f64,
    ) -> Vec<Point>;

    /// Returns `true` if the two geometries share at least one point.
    fn intersects(&self, a: &Geometry, b: &Geometry) -> bool;

    /// Returns `true` if `container` contains every point of `contained`.
    fn contains(&self, container: &Geometry, contained: &Geometry) -> bool;
}

/// Mean Earth radius used for geodesic math, in meters.
pub const MEAN_EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Web Mercator sphere radius (the WGS84 semi-major axis), in meters.
const MERCATOR_RADIUS_M: f64 = 6_378_137.0;

/// Latitude limit of the Web Mercator square, in degrees.
const MERCATOR_MAX_LAT: f64 = 85.051_128_779_806_59;

/// Reference [`GeometryEngine`] on a sphere, backed by `geo`.
///
/// Geodesic operations use `geo`'s haversine measure on a sphere of radius
/// [`MEAN_EARTH_RADIUS_M`]. Predicates are evaluated with `geo`'s
/// [`Intersects`] and [`Contains`] in WGS84 degree space after projecting
/// both operands.
///
/// Buffers and moved points near the antimeridian keep longitudes continuous
/// with their origin, so a buffer around `179.999` may reach past `180`.
/// [`intersects`](GeometryEngine::intersects) accounts for that by also
/// testing the other operand shifted by a full turn.
///
/// # Example
///
/// ```rust
/// use kurbo::Point;
/// use vigil_alerts::{Geometry, GeometryEngine, LinearUnit, SphericalEngine};
///
/// let engine = SphericalEngine::default();
/// let buffer = engine
///     .buffer_geodetic(Point::new(0.0, 0.0), 100.0, LinearUnit::Meters)
///     .unwrap();
/// assert!(engine.intersects(&buffer, &Geometry::wgs84_point(0.0005, 0.0)));
/// assert!(!engine.intersects(&buffer, &Geometry::wgs84_point(0.002, 0.0)));
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SphericalEngine {
    /// Number of vertices in a buffer polygon.
    pub buffer_segments: usize,
}

impl Default for SphericalEngine {
    fn default() -> Self {
        Self {
            buffer_segments: 64,
        }
    }
}

impl SphericalEngine {
    /// Sets [`buffer_segments`](Self::buffer_segments); values below 8 are raised to 8.
    #[must_use]
    pub fn with_buffer_segments(mut self, segments: usize) -> Self {
        self.buffer_segments = segments.max(8);
        self
    }

    /// Great-circle distance between two WGS84 points, in meters.
    #[must_use]
    pub fn haversine_m(a: Point, b: Point) -> f64 {
        Haversine.distance(to_geo_point(a), to_geo_point(b))
    }

    /// Destination reached from `from` after `meters` along `azimuth_degrees`.
    ///
    /// The longitude is normalized to `[-180, 180]`.
    #[must_use]
    pub fn destination(from: Point, meters: f64, azimuth_degrees: f64) -> Point {
        let to = Self::destination_unwrapped(from, meters, azimuth_degrees);
        Point::new(normalize_lon(to.x), to.y)
    }

    /// Like [`destination`](Self::destination), but the longitude stays within
    /// half a turn of `from` instead of being normalized.
    fn destination_unwrapped(from: Point, meters: f64, azimuth_degrees: f64) -> Point {
        let to = Haversine.destination(to_geo_point(from), azimuth_degrees, meters);
        let mut lon = normalize_lon(to.x());
        if lon - from.x > 180.0 {
            lon -= 360.0;
        } else if lon - from.x < -180.0 {
            lon += 360.0;
        }
        Point::new(lon, to.y())
    }

    fn to_wgs84(geometry: &Geometry) -> Geometry {
        match geometry.spatial_reference {
            SpatialReference::Wgs84 => geometry.clone(),
            SpatialReference::WebMercator => {
                geometry.map_vertices(SpatialReference::Wgs84, |p| {
                    let lon = (p.x / MERCATOR_RADIUS_M).to_degrees();
                    let lat = 2.0 * (p.y / MERCATOR_RADIUS_M).exp().atan() - FRAC_PI_2;
                    Point::new(lon, lat.to_degrees())
                })
            }
        }
    }

    fn to_web_mercator(geometry: &Geometry) -> Geometry {
        match geometry.spatial_reference {
            SpatialReference::WebMercator => geometry.clone(),
            SpatialReference::Wgs84 => geometry.map_vertices(SpatialReference::WebMercator, |p| {
                let lat = p.y.clamp(-MERCATOR_MAX_LAT, MERCATOR_MAX_LAT).to_radians();
                Point::new(
                    MERCATOR_RADIUS_M * p.x.to_radians(),
                    MERCATOR_RADIUS_M * (FRAC_PI_4 + lat / 2.0).tan().ln(),
                )
            }),
        }
    }

    fn to_geo_wgs84(&self, geometry: &Geometry) -> Option<geo::Geometry<f64>> {
        self.project(geometry, SpatialReference::Wgs84)
            .map(|g| to_geo(g.shape()))
    }
}

impl GeometryEngine for SphericalEngine {
    fn project(&self, geometry: &Geometry, to: SpatialReference) -> Option<Geometry> {
        if geometry.vertices().iter().any(|p| !p.is_finite()) {
            return None;
        }
        Some(match to {
            SpatialReference::Wgs84 => Self::to_wgs84(geometry),
            SpatialReference::WebMercator => Self::to_web_mercator(geometry),
        })
    }

    fn buffer_geodetic(&self, center: Point, distance: f64, unit: LinearUnit) -> Option<Geometry> {
        let meters = unit.to_meters(distance);
        if !center.is_finite() || !meters.is_finite() || meters < 0.0 {
            return None;
        }
        if meters == 0.0 {
            return Some(Geometry::new(Shape::Point(center), SpatialReference::Wgs84));
        }
        let n = self.buffer_segments.max(8);
        let step = 360.0 / n as f64;
        let ring = (0..n)
            .map(|i| Self::destination_unwrapped(center, meters, i as f64 * step))
            .collect();
        Some(Geometry::new(Shape::Polygon(ring), SpatialReference::Wgs84))
    }

    fn move_geodetic(
        &self,
        points: &[Point],
        distance: f64,
        unit: LinearUnit,
        azimuth_degrees: f64,
    ) -> Vec<Point> {
        let meters = unit.to_meters(distance);
        points
            .iter()
            .map(|p| Self::destination(*p, meters, azimuth_degrees))
            .collect()
    }

    fn intersects(&self, a: &Geometry, b: &Geometry) -> bool {
        let (Some(ga), Some(gb)) = (self.to_geo_wgs84(a), self.to_geo_wgs84(b)) else {
            return false;
        };
        if ga.intersects(&gb) {
            return true;
        }
        // Either operand may reach past the antimeridian.
        [-360.0, 360.0]
            .into_iter()
            .any(|dx| ga.intersects(&gb.map_coords(|c| geo::Coord { x: c.x + dx, y: c.y })))
    }

    fn contains(&self, container: &Geometry, contained: &Geometry) -> bool {
        let (Some(a), Some(b)) = (self.to_geo_wgs84(container), self.to_geo_wgs84(contained))
        else {
            return false;
        };
        a.contains(&b)
    }
}

fn to_geo_point(p: Point) -> geo::Point<f64> {
    geo::Point::new(p.x, p.y)
}

fn to_geo_line(vertices: &[Point]) -> geo::LineString<f64> {
    vertices.iter().map(|p| geo::Coord { x: p.x, y: p.y }).collect()
}

fn to_geo(shape: &Shape) -> geo::Geometry<f64> {
    match shape {
        Shape::Point(p) => geo::Geometry::Point(to_geo_point(*p)),
        Shape::Polyline(v) => geo::Geometry::LineString(to_geo_line(v)),
        Shape::Polygon(v) => geo::Geometry::Polygon(geo::Polygon::new(to_geo_line(v), Vec::new())),
    }
}

fn normalize_lon(lon: f64) -> f64 {
    let wrapped = (lon + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped == -180.0 && lon > 0.0 { 180.0 } else { wrapped }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(half: f64) -> Geometry {
        Geometry::wgs84_polygon([(-half, -half), (half, -half), (half, half), (-half, half)])
    }

    #[test]
    fn unit_conversion() {
        assert_eq!(LinearUnit::Kilometers.to_meters(1.5), 1_500.0);
        assert!((LinearUnit::NauticalMiles.to_meters(1.0) - 1_852.0).abs() < 1e-9);
    }

    #[test]
    fn extent_of_polygon() {
        let g = square(1.0);
        assert_eq!(g.extent(), Some(Rect::new(-1.0, -1.0, 1.0, 1.0)));
        assert_eq!(g.representative_point(), Some(Point::ORIGIN));
    }

    #[test]
    fn destination_round_trip_distance() {
        let start = Point::new(10.0, 45.0);
        let end = SphericalEngine::destination(start, 1_000.0, 30.0);
        let d = SphericalEngine::haversine_m(start, end);
        assert!((d - 1_000.0).abs() < 1e-6, "distance was {d}");
    }

    #[test]
    fn mercator_round_trip() {
        let engine = SphericalEngine::default();
        let g = Geometry::wgs84_point(12.5, 41.9);
        let m = engine.project(&g, SpatialReference::WebMercator).unwrap();
        assert_eq!(m.spatial_reference(), SpatialReference::WebMercator);
        let back = engine.project(&m, SpatialReference::Wgs84).unwrap();
        let p = back.as_point().unwrap();
        assert!((p.x - 12.5).abs() < 1e-9 && (p.y - 41.9).abs() < 1e-9);
    }

    #[test]
    fn point_in_polygon_including_boundary() {
        let engine = SphericalEngine::default();
        let sq = square(1.0);
        assert!(engine.intersects(&Geometry::wgs84_point(0.0, 0.0), &sq));
        assert!(engine.intersects(&Geometry::wgs84_point(1.0, 0.5), &sq));
        assert!(!engine.intersects(&Geometry::wgs84_point(10.0, 10.0), &sq));
    }

    #[test]
    fn polygons_overlap_without_shared_vertices() {
        let engine = SphericalEngine::default();
        let a = square(1.0);
        let cross = Geometry::wgs84_polygon([(-2.0, -0.1), (2.0, -0.1), (2.0, 0.1), (-2.0, 0.1)]);
        assert!(engine.intersects(&a, &cross));

        let far = Geometry::wgs84_polygon([(5.0, 5.0), (6.0, 5.0), (6.0, 6.0)]);
        assert!(!engine.intersects(&a, &far));
    }

    #[test]
    fn containment() {
        let engine = SphericalEngine::default();
        assert!(engine.contains(&square(2.0), &square(1.0)));
        assert!(!engine.contains(&square(1.0), &square(2.0)));
        assert!(engine.contains(&square(1.0), &Geometry::wgs84_point(0.2, 0.3)));
    }

    #[test]
    fn buffer_reaches_about_the_requested_distance() {
        let engine = SphericalEngine::default();
        let buffer = engine
            .buffer_geodetic(Point::ORIGIN, 100.0, LinearUnit::Meters)
            .unwrap();
        // ~50 m east of the center.
        assert!(engine.intersects(&buffer, &Geometry::wgs84_point(0.00045, 0.0)));
        // ~150 m east of the center.
        assert!(!engine.intersects(&buffer, &Geometry::wgs84_point(0.00135, 0.0)));
    }

    #[test]
    fn invalid_inputs_fail_quietly() {
        let engine = SphericalEngine::default();
        assert!(engine.buffer_geodetic(Point::ORIGIN, -1.0, LinearUnit::Meters).is_none());
        let bad = Geometry::wgs84_point(f64::NAN, 0.0);
        assert!(engine.project(&bad, SpatialReference::WebMercator).is_none());
        assert!(!engine.intersects(&bad, &square(1.0)));
    }

    #[test]
    fn longitude_wraps() {
        let p = SphericalEngine::destination(Point::new(179.999, 0.0), 1_000.0, 90.0);
        assert!(p.x < -179.0, "wrapped to {}", p.x);
    }

    #[test]
    fn buffer_crossing_the_antimeridian() {
        let engine = SphericalEngine::default();
        let buffer = engine
            .buffer_geodetic(Point::new(179.9995, 0.0), 200.0, LinearUnit::Meters)
            .unwrap();
        // ~110 m away on the far side of the line.
        assert!(engine.intersects(&buffer, &Geometry::wgs84_point(-179.9995, 0.0)));
        assert!(!engine.intersects(&buffer, &Geometry::wgs84_point(-179.99, 0.0)));
    }
}
