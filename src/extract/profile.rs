//! Profile evaluator facade.
//!
//! A profile maps raw OSM tags to typed routing attributes. The trait is the
//! seam a scripting host would plug into; the built-in `CarProfile` covers
//! automobile routing with the usual highway-class speed table.

use anyhow::Result;

use crate::extract::source::{OsmNode, OsmWay};
use crate::geo::FixedCoordinate;

/// Travel modes are profile-defined; the extractor stores them opaquely.
pub const TRAVEL_MODE_INACCESSIBLE: u8 = 0;
pub const TRAVEL_MODE_DRIVING: u8 = 1;
pub const TRAVEL_MODE_FERRY: u8 = 2;

/// Per-node routing attributes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractionNode {
    pub barrier: bool,
    pub traffic_light: bool,
}

/// Per-way routing attributes. Speeds are km/h; a direction with speed <= 0
/// is not traversable. `duration` (seconds over the whole way) overrides
/// speed-derived weights when present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractionWay {
    pub id: i64,
    pub forward_speed: f64,
    pub backward_speed: f64,
    pub forward_mode: u8,
    pub backward_mode: u8,
    pub name: String,
    pub roundabout: bool,
    pub access_restricted: bool,
    pub is_startpoint: bool,
    pub duration: Option<f64>,
    pub node_refs: Vec<i64>,
}

impl ExtractionWay {
    pub fn is_routable(&self) -> bool {
        (self.forward_speed > 0.0 || self.backward_speed > 0.0 || self.duration.is_some())
            && self.node_refs.len() >= 2
    }
}

/// Typed per-entity callbacks. One instance is created per worker thread;
/// `source_init` runs once on a primary instance before any entity is seen.
pub trait Profile: Send {
    fn name(&self) -> &'static str;

    /// Load profile-declared auxiliary sources (rasters etc.). Called once
    /// before parsing starts.
    fn source_init(&mut self) -> Result<()> {
        Ok(())
    }

    fn evaluate_node(&self, node: &OsmNode) -> Result<ExtractionNode>;

    fn evaluate_way(&self, way: &OsmWay) -> Result<ExtractionWay>;

    /// Whether `segment_hook` should be invoked during weight finalization.
    fn has_segment_hook(&self) -> bool {
        false
    }

    /// Per-segment speed adjustment once coordinates are known.
    fn segment_hook(
        &self,
        _source: FixedCoordinate,
        _target: FixedCoordinate,
        _distance_meters: f64,
        _speed_kmh: &mut f64,
    ) {
    }

    /// Vehicle classes this profile belongs to, used to match
    /// `restriction:<class>` tags and `except` lists on relations.
    fn vehicle_classes(&self) -> &[&'static str];
}

/// Automobile profile.
pub struct CarProfile;

const CAR_VEHICLE_CLASSES: &[&str] = &["vehicle", "motor_vehicle", "motorcar"];

const FERRY_SPEED_KMH: f64 = 5.0;

fn is_denied(value: Option<&str>) -> bool {
    matches!(
        value,
        Some("no") | Some("agricultural") | Some("forestry") | Some("emergency")
    )
}

fn is_restricted(value: Option<&str>) -> bool {
    matches!(value, Some("private") | Some("delivery") | Some("destination"))
}

/// Parse an OSM duration tag: "HH:MM:SS", "HH:MM", or plain minutes.
fn parse_duration(value: &str) -> Option<f64> {
    let parts: Vec<&str> = value.split(':').collect();
    match parts.as_slice() {
        [minutes] => minutes.trim().parse::<f64>().ok().map(|m| m * 60.0),
        [hours, minutes] => {
            let h = hours.trim().parse::<f64>().ok()?;
            let m = minutes.trim().parse::<f64>().ok()?;
            Some(h * 3600.0 + m * 60.0)
        }
        [hours, minutes, seconds] => {
            let h = hours.trim().parse::<f64>().ok()?;
            let m = minutes.trim().parse::<f64>().ok()?;
            let s = seconds.trim().parse::<f64>().ok()?;
            Some(h * 3600.0 + m * 60.0 + s)
        }
        _ => None,
    }
}

/// Parse a maxspeed tag, handling "50", "50 km/h" and "30 mph".
fn parse_maxspeed(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if let Some(mph) = trimmed.strip_suffix("mph") {
        return mph.trim().parse::<f64>().ok().map(|v| v * 1.609_344);
    }
    let numeric: String = trimmed
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    numeric.parse::<f64>().ok()
}

impl CarProfile {
    fn base_speed(highway: &str) -> Option<f64> {
        let speed = match highway {
            "motorway" => 110.0,
            "motorway_link" => 60.0,
            "trunk" => 90.0,
            "trunk_link" => 50.0,
            "primary" => 70.0,
            "primary_link" => 40.0,
            "secondary" => 60.0,
            "secondary_link" => 40.0,
            "tertiary" => 50.0,
            "tertiary_link" => 30.0,
            "unclassified" => 50.0,
            "residential" => 30.0,
            "service" => 20.0,
            "living_street" => 10.0,
            _ => return None,
        };
        Some(speed)
    }
}

impl Profile for CarProfile {
    fn name(&self) -> &'static str {
        "car"
    }

    fn evaluate_node(&self, node: &OsmNode) -> Result<ExtractionNode> {
        let barrier = match node.tag("barrier") {
            // Passable barriers do not block cars.
            Some("no") | Some("cattle_grid") | Some("border_control") | Some("toll_booth")
            | Some("checkpoint") | Some("entrance") | None => false,
            Some(_) => !matches!(node.tag("access"), Some("yes") | Some("permissive")),
        };
        let traffic_light = node.tag("highway") == Some("traffic_signals");
        Ok(ExtractionNode {
            barrier,
            traffic_light,
        })
    }

    fn evaluate_way(&self, way: &OsmWay) -> Result<ExtractionWay> {
        let mut result = ExtractionWay {
            id: way.id,
            is_startpoint: true,
            ..Default::default()
        };

        if is_denied(way.tag("access"))
            || is_denied(way.tag("vehicle"))
            || is_denied(way.tag("motor_vehicle"))
            || is_denied(way.tag("motorcar"))
        {
            return Ok(result);
        }

        if way.tag("route") == Some("ferry") {
            result.forward_speed = FERRY_SPEED_KMH;
            result.backward_speed = FERRY_SPEED_KMH;
            result.forward_mode = TRAVEL_MODE_FERRY;
            result.backward_mode = TRAVEL_MODE_FERRY;
            result.duration = way.tag("duration").and_then(parse_duration);
            result.is_startpoint = false;
            result.name = way.tag("name").unwrap_or("").to_string();
            result.node_refs = way.refs.clone();
            return Ok(result);
        }

        let highway = match way.tag("highway") {
            Some(h) => h,
            None => return Ok(result),
        };
        let mut speed = match Self::base_speed(highway) {
            Some(s) => s,
            None => return Ok(result),
        };

        if let Some(maxspeed) = way.tag("maxspeed").and_then(parse_maxspeed) {
            if maxspeed > 0.0 {
                speed = maxspeed;
            }
        }

        result.forward_speed = speed;
        result.backward_speed = speed;
        result.forward_mode = TRAVEL_MODE_DRIVING;
        result.backward_mode = TRAVEL_MODE_DRIVING;

        result.roundabout = way.tag("junction") == Some("roundabout");
        let oneway_default = result.roundabout
            || highway == "motorway"
            || highway == "motorway_link";
        match way.tag("oneway") {
            Some("yes") | Some("1") | Some("true") => {
                result.backward_speed = 0.0;
                result.backward_mode = TRAVEL_MODE_INACCESSIBLE;
            }
            Some("-1") | Some("reverse") => {
                result.forward_speed = 0.0;
                result.forward_mode = TRAVEL_MODE_INACCESSIBLE;
            }
            Some(_) => {}
            None if oneway_default => {
                result.backward_speed = 0.0;
                result.backward_mode = TRAVEL_MODE_INACCESSIBLE;
            }
            None => {}
        }

        result.access_restricted = is_restricted(way.tag("access"))
            || is_restricted(way.tag("motor_vehicle"))
            || is_restricted(way.tag("motorcar"));

        result.name = way
            .tag("name")
            .or_else(|| way.tag("ref"))
            .unwrap_or("")
            .to_string();
        result.node_refs = way.refs.clone();

        Ok(result)
    }

    fn vehicle_classes(&self) -> &[&'static str] {
        CAR_VEHICLE_CLASSES
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn way(id: i64, refs: &[i64], tags: &[(&str, &str)]) -> OsmWay {
        OsmWay {
            id,
            refs: refs.to_vec(),
            tags: tags
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    fn node(id: i64, tags: &[(&str, &str)]) -> OsmNode {
        OsmNode {
            id,
            lat: 0.0,
            lon: 0.0,
            tags: tags
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    #[test]
    fn test_residential_way_is_bidirectional() {
        let profile = CarProfile;
        let result = profile
            .evaluate_way(&way(1, &[1, 2, 3], &[("highway", "residential")]))
            .unwrap();
        assert!(result.is_routable());
        assert_eq!(result.forward_speed, 30.0);
        assert_eq!(result.backward_speed, 30.0);
        assert_eq!(result.forward_mode, TRAVEL_MODE_DRIVING);
    }

    #[test]
    fn test_footway_not_routable() {
        let profile = CarProfile;
        let result = profile
            .evaluate_way(&way(1, &[1, 2], &[("highway", "footway")]))
            .unwrap();
        assert!(!result.is_routable());
    }

    #[test]
    fn test_oneway_reverse_disables_forward() {
        let profile = CarProfile;
        let result = profile
            .evaluate_way(&way(
                1,
                &[1, 2],
                &[("highway", "primary"), ("oneway", "-1")],
            ))
            .unwrap();
        assert_eq!(result.forward_speed, 0.0);
        assert!(result.backward_speed > 0.0);
    }

    #[test]
    fn test_motorway_oneway_by_default() {
        let profile = CarProfile;
        let result = profile
            .evaluate_way(&way(1, &[1, 2], &[("highway", "motorway")]))
            .unwrap();
        assert!(result.forward_speed > 0.0);
        assert_eq!(result.backward_speed, 0.0);
    }

    #[test]
    fn test_maxspeed_overrides_base_speed() {
        let profile = CarProfile;
        let result = profile
            .evaluate_way(&way(
                1,
                &[1, 2],
                &[("highway", "residential"), ("maxspeed", "50")],
            ))
            .unwrap();
        assert_eq!(result.forward_speed, 50.0);
    }

    #[test]
    fn test_maxspeed_mph() {
        assert!((parse_maxspeed("30 mph").unwrap() - 48.280).abs() < 0.01);
        assert_eq!(parse_maxspeed("50 km/h"), Some(50.0));
    }

    #[test]
    fn test_ferry_duration() {
        let profile = CarProfile;
        let result = profile
            .evaluate_way(&way(
                1,
                &[1, 2],
                &[("route", "ferry"), ("duration", "01:30")],
            ))
            .unwrap();
        assert_eq!(result.duration, Some(5400.0));
        assert!(!result.is_startpoint);
        assert_eq!(result.forward_mode, TRAVEL_MODE_FERRY);
    }

    #[test]
    fn test_parse_duration_forms() {
        assert_eq!(parse_duration("90"), Some(5400.0));
        assert_eq!(parse_duration("00:45"), Some(2700.0));
        assert_eq!(parse_duration("01:00:30"), Some(3630.0));
        assert_eq!(parse_duration("abc"), None);
    }

    #[test]
    fn test_barrier_node() {
        let profile = CarProfile;
        assert!(
            profile
                .evaluate_node(&node(1, &[("barrier", "gate")]))
                .unwrap()
                .barrier
        );
        assert!(
            !profile
                .evaluate_node(&node(1, &[("barrier", "toll_booth")]))
                .unwrap()
                .barrier
        );
        assert!(
            !profile
                .evaluate_node(&node(1, &[("barrier", "gate"), ("access", "yes")]))
                .unwrap()
                .barrier
        );
    }

    #[test]
    fn test_traffic_signal_node() {
        let profile = CarProfile;
        let result = profile
            .evaluate_node(&node(1, &[("highway", "traffic_signals")]))
            .unwrap();
        assert!(result.traffic_light);
        assert!(!result.barrier);
    }

    #[test]
    fn test_access_no_blocks_way() {
        let profile = CarProfile;
        let result = profile
            .evaluate_way(&way(
                1,
                &[1, 2],
                &[("highway", "primary"), ("access", "no")],
            ))
            .unwrap();
        assert!(!result.is_routable());
    }

    #[test]
    fn test_access_private_sets_restricted_flag() {
        let profile = CarProfile;
        let result = profile
            .evaluate_way(&way(
                1,
                &[1, 2],
                &[("highway", "service"), ("access", "private")],
            ))
            .unwrap();
        assert!(result.is_routable());
        assert!(result.access_restricted);
    }
}
