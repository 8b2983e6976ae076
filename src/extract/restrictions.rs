//! Turn-restriction parsing.
//!
//! An OSM relation becomes an `InputRestriction` only when it carries a
//! restriction tag relevant to the active profile and exactly one from-way,
//! one via-node and one to-way member.

use crate::extract::profile::Profile;
use crate::extract::source::{MemberKind, OsmRelation};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestrictionKind {
    No = 0,
    Only = 1,
}

impl RestrictionKind {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(RestrictionKind::No),
            1 => Some(RestrictionKind::Only),
            _ => None,
        }
    }
}

/// A restriction still expressed in OSM identifiers. The via node must turn
/// out to be a shared endpoint of both ways or the restriction is dropped
/// during resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputRestriction {
    pub from_way: i64,
    pub via_node: i64,
    pub to_way: i64,
    pub kind: RestrictionKind,
}

pub struct RestrictionParser {
    vehicle_classes: Vec<&'static str>,
}

impl RestrictionParser {
    pub fn new(profile: &dyn Profile) -> Self {
        Self {
            vehicle_classes: profile.vehicle_classes().to_vec(),
        }
    }

    /// Find the restriction value, honoring class-scoped tags. A
    /// `restriction:<class>` tag only applies when the class is one of the
    /// profile's vehicle classes.
    fn restriction_value<'a>(&self, relation: &'a OsmRelation) -> Option<&'a str> {
        for (key, value) in &relation.tags {
            if key == "restriction" {
                return Some(value);
            }
            if let Some(class) = key.strip_prefix("restriction:") {
                if self.vehicle_classes.iter().any(|&c| c == class) {
                    return Some(value);
                }
            }
        }
        None
    }

    /// The `except` tag lists vehicle classes exempt from the restriction.
    fn is_exempt(&self, relation: &OsmRelation) -> bool {
        match relation.tag("except") {
            Some(except) => except
                .split(';')
                .any(|class| self.vehicle_classes.iter().any(|&c| c == class.trim())),
            None => false,
        }
    }

    pub fn try_parse(&self, relation: &OsmRelation) -> Option<InputRestriction> {
        if relation.tag("type") != Some("restriction") {
            return None;
        }

        let value = self.restriction_value(relation)?;
        let kind = if value.starts_with("no_") {
            RestrictionKind::No
        } else if value.starts_with("only_") {
            RestrictionKind::Only
        } else {
            return None;
        };

        if self.is_exempt(relation) {
            return None;
        }

        let mut from_way = None;
        let mut via_node = None;
        let mut to_way = None;
        for member in &relation.members {
            match (member.role.as_str(), member.kind) {
                ("from", MemberKind::Way) => {
                    if from_way.replace(member.ref_id).is_some() {
                        return None;
                    }
                }
                ("via", MemberKind::Node) => {
                    if via_node.replace(member.ref_id).is_some() {
                        return None;
                    }
                }
                ("to", MemberKind::Way) => {
                    if to_way.replace(member.ref_id).is_some() {
                        return None;
                    }
                }
                _ => {}
            }
        }

        Some(InputRestriction {
            from_way: from_way?,
            via_node: via_node?,
            to_way: to_way?,
            kind,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::profile::CarProfile;
    use crate::extract::source::OsmRelMember;

    fn member(role: &str, kind: MemberKind, ref_id: i64) -> OsmRelMember {
        OsmRelMember {
            role: role.to_string(),
            kind,
            ref_id,
        }
    }

    fn relation(tags: &[(&str, &str)], members: Vec<OsmRelMember>) -> OsmRelation {
        OsmRelation {
            id: 1,
            members,
            tags: tags
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    fn parser() -> RestrictionParser {
        RestrictionParser::new(&CarProfile)
    }

    #[test]
    fn test_parses_no_left_turn() {
        let rel = relation(
            &[("type", "restriction"), ("restriction", "no_left_turn")],
            vec![
                member("from", MemberKind::Way, 10),
                member("via", MemberKind::Node, 20),
                member("to", MemberKind::Way, 30),
            ],
        );
        let parsed = parser().try_parse(&rel).unwrap();
        assert_eq!(
            parsed,
            InputRestriction {
                from_way: 10,
                via_node: 20,
                to_way: 30,
                kind: RestrictionKind::No,
            }
        );
    }

    #[test]
    fn test_parses_only_straight_on() {
        let rel = relation(
            &[("type", "restriction"), ("restriction", "only_straight_on")],
            vec![
                member("from", MemberKind::Way, 1),
                member("via", MemberKind::Node, 2),
                member("to", MemberKind::Way, 3),
            ],
        );
        assert_eq!(parser().try_parse(&rel).unwrap().kind, RestrictionKind::Only);
    }

    #[test]
    fn test_rejects_missing_members() {
        let rel = relation(
            &[("type", "restriction"), ("restriction", "no_u_turn")],
            vec![
                member("from", MemberKind::Way, 1),
                member("to", MemberKind::Way, 3),
            ],
        );
        assert!(parser().try_parse(&rel).is_none());
    }

    #[test]
    fn test_rejects_duplicate_from() {
        let rel = relation(
            &[("type", "restriction"), ("restriction", "no_u_turn")],
            vec![
                member("from", MemberKind::Way, 1),
                member("from", MemberKind::Way, 2),
                member("via", MemberKind::Node, 4),
                member("to", MemberKind::Way, 3),
            ],
        );
        assert!(parser().try_parse(&rel).is_none());
    }

    #[test]
    fn test_rejects_via_way() {
        let rel = relation(
            &[("type", "restriction"), ("restriction", "no_u_turn")],
            vec![
                member("from", MemberKind::Way, 1),
                member("via", MemberKind::Way, 4),
                member("to", MemberKind::Way, 3),
            ],
        );
        assert!(parser().try_parse(&rel).is_none());
    }

    #[test]
    fn test_rejects_unknown_value() {
        let rel = relation(
            &[("type", "restriction"), ("restriction", "maybe_left_turn")],
            vec![
                member("from", MemberKind::Way, 1),
                member("via", MemberKind::Node, 2),
                member("to", MemberKind::Way, 3),
            ],
        );
        assert!(parser().try_parse(&rel).is_none());
    }

    #[test]
    fn test_class_scoped_restriction_for_other_mode_ignored() {
        let rel = relation(
            &[("type", "restriction"), ("restriction:bicycle", "no_left_turn")],
            vec![
                member("from", MemberKind::Way, 1),
                member("via", MemberKind::Node, 2),
                member("to", MemberKind::Way, 3),
            ],
        );
        assert!(parser().try_parse(&rel).is_none());
    }

    #[test]
    fn test_class_scoped_restriction_for_own_mode_applies() {
        let rel = relation(
            &[
                ("type", "restriction"),
                ("restriction:motorcar", "no_right_turn"),
            ],
            vec![
                member("from", MemberKind::Way, 1),
                member("via", MemberKind::Node, 2),
                member("to", MemberKind::Way, 3),
            ],
        );
        assert!(parser().try_parse(&rel).is_some());
    }

    #[test]
    fn test_except_motorcar_exempts_car_profile() {
        let rel = relation(
            &[
                ("type", "restriction"),
                ("restriction", "no_left_turn"),
                ("except", "bicycle;motorcar"),
            ],
            vec![
                member("from", MemberKind::Way, 1),
                member("via", MemberKind::Node, 2),
                member("to", MemberKind::Way, 3),
            ],
        );
        assert!(parser().try_parse(&rel).is_none());
    }
}
