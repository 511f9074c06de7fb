//! Field selection for example generation
//!
//! Solves the inverse of requirement validation: given the requirements, the
//! declared field names and the fields that already have values, choose one
//! field subset that satisfies every requirement.
//!
//! Stages run in a fixed order and later stages never un-ban or drop a field
//! accepted earlier:
//!
//! 1. `all`: accept every listed field
//! 2. `exclusive`, `exactly(1)`, `at_most(1)`: accept one, ban the rest
//! 3. `at_least(n)`: accept up to `n`
//! 4. `at_most(n)`, `exactly(n)` with `n > 1`: accept up to / exactly `n`, ban the rest
//! 5. accept every field that is neither accepted nor banned
//!
//! Candidates are ordered by field declaration order, with fields that have
//! known values first.

use std::collections::BTreeSet;

use tracing::debug;

use crate::error::{Result, SchemaError};
use crate::requirement::{Requirement, RequirementKind};

#[derive(Debug)]
pub struct AttributeSelector<'a> {
    requirements: &'a [Requirement],
    fields: &'a [String],
    known: BTreeSet<String>,
    accepted: BTreeSet<String>,
    banned: BTreeSet<String>,
}

impl<'a> AttributeSelector<'a> {
    pub fn new<I, S>(requirements: &'a [Requirement], fields: &'a [String], known: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            requirements,
            fields,
            known: known.into_iter().map(Into::into).collect(),
            accepted: BTreeSet::new(),
            banned: BTreeSet::new(),
        }
    }

    /// Run every stage and return the accepted fields in declaration order
    pub fn process(mut self) -> Result<Vec<String>> {
        self.process_required();
        self.process_single_choice()?;
        self.process_at_least()?;
        self.process_bounded()?;
        self.process_default();

        debug!(
            accepted = self.accepted.len(),
            banned = self.banned.len(),
            "selected example fields"
        );

        Ok(self
            .fields
            .iter()
            .filter(|name| self.accepted.contains(name.as_str()))
            .cloned()
            .collect())
    }

    fn process_required(&mut self) {
        for requirement in self.of_kind(|r| r.kind() == RequirementKind::All) {
            for name in requirement.attributes() {
                self.accepted.insert(name.clone());
            }
        }
    }

    fn process_single_choice(&mut self) -> Result<()> {
        let single = |r: &Requirement| match r.kind() {
            RequirementKind::Exclusive => true,
            RequirementKind::Exactly | RequirementKind::AtMost => r.count() == Some(1),
            _ => false,
        };
        for requirement in self.of_kind(single) {
            let members = requirement.attributes();
            let already = self.accepted_members(members);
            if already.len() > 1 {
                return Err(unfeasible(requirement, "more than one member is already required"));
            }

            let chosen = match already.into_iter().next() {
                Some(name) => Some(name),
                None => self.candidates(members).into_iter().next(),
            };

            match chosen {
                Some(name) => {
                    self.accepted.insert(name.clone());
                    self.ban_except(members, &[name]);
                }
                None if members.is_empty() || requirement.kind() == RequirementKind::AtMost => {}
                None => return Err(unfeasible(requirement, "every member is banned")),
            }
        }
        Ok(())
    }

    fn process_at_least(&mut self) -> Result<()> {
        for requirement in self.of_kind(|r| r.kind() == RequirementKind::AtLeast) {
            let members = requirement.attributes();
            let needed = requirement
                .count()
                .unwrap_or(0)
                .saturating_sub(self.accepted_members(members).len());
            let candidates = self.candidates(members);
            if candidates.len() < needed {
                return Err(unfeasible(requirement, "not enough selectable members"));
            }
            for name in candidates.into_iter().take(needed) {
                self.accepted.insert(name);
            }
        }
        Ok(())
    }

    fn process_bounded(&mut self) -> Result<()> {
        let bounded = |r: &Requirement| {
            matches!(r.kind(), RequirementKind::AtMost | RequirementKind::Exactly)
                && r.count().map_or(false, |n| n != 1)
        };
        for requirement in self.of_kind(bounded) {
            let members = requirement.attributes();
            let count = requirement.count().unwrap_or(0);
            let already = self.accepted_members(members);
            if already.len() > count {
                return Err(unfeasible(requirement, "too many members are already required"));
            }

            let wanted = count - already.len();
            let candidates = self.candidates(members);
            if requirement.kind() == RequirementKind::Exactly && candidates.len() < wanted {
                return Err(unfeasible(requirement, "not enough selectable members"));
            }

            let mut keep = already;
            keep.extend(candidates.into_iter().take(wanted));
            for name in &keep {
                self.accepted.insert(name.clone());
            }
            self.ban_except(members, &keep);
        }
        Ok(())
    }

    fn process_default(&mut self) {
        for name in self.fields {
            if !self.banned.contains(name.as_str()) {
                self.accepted.insert(name.clone());
            }
        }
    }

    fn of_kind<F>(&self, predicate: F) -> Vec<&'a Requirement>
    where
        F: Fn(&Requirement) -> bool,
    {
        let requirements: &'a [Requirement] = self.requirements;
        requirements.iter().filter(|r| predicate(r)).collect()
    }

    fn accepted_members(&self, members: &[String]) -> Vec<String> {
        self.ordered(members)
            .into_iter()
            .filter(|name| self.accepted.contains(name.as_str()))
            .collect()
    }

    /// Selectable members: neither banned nor accepted, known values first
    fn candidates(&self, members: &[String]) -> Vec<String> {
        let open: Vec<String> = self
            .ordered(members)
            .into_iter()
            .filter(|name| !self.banned.contains(name.as_str()) && !self.accepted.contains(name.as_str()))
            .collect();
        let (known, unknown): (Vec<String>, Vec<String>) = open
            .into_iter()
            .partition(|name| self.known.contains(name.as_str()));
        known.into_iter().chain(unknown).collect()
    }

    /// Members sorted by field declaration order
    fn ordered(&self, members: &[String]) -> Vec<String> {
        self.fields
            .iter()
            .filter(|name| members.contains(*name))
            .cloned()
            .collect()
    }

    fn ban_except(&mut self, members: &[String], keep: &[String]) {
        for name in members {
            if !keep.contains(name) && !self.accepted.contains(name.as_str()) {
                self.banned.insert(name.clone());
            }
        }
    }
}

fn unfeasible(requirement: &Requirement, reason: &str) -> SchemaError {
    SchemaError::UnfeasibleRequirements(format!("{} ({})", requirement, reason))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_no_requirements_accepts_everything() {
        let fields = fields(&["a", "b"]);
        let selected = AttributeSelector::new(&[], &fields, Vec::<String>::new())
            .process()
            .unwrap();
        assert_eq!(selected, vec!["a", "b"]);
    }

    #[test]
    fn test_exclusive_prefers_known_value() {
        let fields = fields(&["a", "x", "y", "z"]);
        let requirements = vec![Requirement::exclusive(["x", "y", "z"])];
        let selected = AttributeSelector::new(&requirements, &fields, ["y"])
            .process()
            .unwrap();
        assert_eq!(selected, vec!["a", "y"]);
    }

    #[test]
    fn test_exclusive_takes_first_in_declaration_order() {
        let fields = fields(&["y", "x"]);
        let requirements = vec![Requirement::exclusive(["x", "y"])];
        let selected = AttributeSelector::new(&requirements, &fields, Vec::<String>::new())
            .process()
            .unwrap();
        assert_eq!(selected, vec!["y"]);
    }

    #[test]
    fn test_exclusive_groups_share_bans() {
        let fields = fields(&["a", "b", "c"]);
        let requirements = vec![
            Requirement::exclusive(["a", "b"]),
            Requirement::exactly(1, ["a", "c"]),
        ];
        let selected = AttributeSelector::new(&requirements, &fields, Vec::<String>::new())
            .process()
            .unwrap();
        assert_eq!(selected, vec!["a"]);
    }

    #[test]
    fn test_fully_banned_group_is_unfeasible() {
        let fields = fields(&["a", "b"]);
        let requirements = vec![
            Requirement::all(["a"]),
            Requirement::exclusive(["a", "b"]),
            Requirement::exactly(1, ["b"]),
        ];
        let err = AttributeSelector::new(&requirements, &fields, Vec::<String>::new())
            .process()
            .unwrap_err();
        assert!(matches!(err, SchemaError::UnfeasibleRequirements(_)));
    }

    #[test]
    fn test_at_least_and_at_most() {
        let fields = fields(&["p", "q", "r", "s"]);
        let requirements = vec![
            Requirement::at_least(2, ["p", "q", "r"]),
            Requirement::at_most(2, ["p", "q", "r", "s"]),
        ];
        let selected = AttributeSelector::new(&requirements, &fields, ["r"])
            .process()
            .unwrap();
        assert_eq!(selected, vec!["p", "r"]);
    }

    #[test]
    fn test_exactly_many_unfeasible() {
        let fields = fields(&["a", "b"]);
        let requirements = vec![Requirement::exactly(3, ["a", "b"])];
        assert!(AttributeSelector::new(&requirements, &fields, Vec::<String>::new())
            .process()
            .is_err());
    }

    #[test]
    fn test_deterministic() {
        let fields = fields(&["a", "b", "c", "d", "e"]);
        let requirements = vec![
            Requirement::exclusive(["a", "b"]),
            Requirement::at_least(1, ["c", "d"]),
            Requirement::exactly(2, ["c", "d", "e"]),
        ];
        let first = AttributeSelector::new(&requirements, &fields, ["d"]).process().unwrap();
        let second = AttributeSelector::new(&requirements, &fields, ["d"]).process().unwrap();
        assert_eq!(first, second);
    }
}
