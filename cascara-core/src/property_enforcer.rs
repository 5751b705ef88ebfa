// Copyright (c) 2023-2024 CMU Database Group
//
// Use of this source code is governed by an MIT-style license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Synthesizes the physical operators that make a group provide a missing property.

use tracing::trace;

use crate::cascades::{GroupExpression, GroupId};
use crate::operators::Operator;
use crate::property::Property;

/// The operator that establishes `property` on its input.
pub fn enforcer_operator(property: &Property) -> Operator {
    match property {
        Property::Sort(sort) => Operator::OrderBy {
            sort_keys: sort.sort_keys().to_vec(),
        },
    }
}

/// Wraps group expressions with enforcers. Holds no state between calls, so one instance can
/// be reused for many (expression, property) pairs.
#[derive(Default)]
pub struct PropertyEnforcer {
    input_group: Option<GroupId>,
}

impl PropertyEnforcer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a group expression that provides `property` over the group of `input`. The result
    /// is not memoized.
    ///
    /// Panics if `input` has not been inserted into a memo.
    pub fn enforce_property(
        &mut self,
        input: &GroupExpression,
        property: &Property,
    ) -> GroupExpression {
        let Some(group_id) = input.group_id() else {
            panic!("cannot enforce {} on {}: not in any group", property, input);
        };
        self.input_group = Some(group_id);
        let enforcer = match property {
            Property::Sort(_) => self.enforce_sort(property),
        };
        self.input_group = None;
        trace!(event = "enforce_property", property = %property, input = %input, enforcer = %enforcer);
        enforcer
    }

    fn enforce_sort(&self, property: &Property) -> GroupExpression {
        let Some(input_group) = self.input_group else {
            unreachable!("enforcer invoked outside enforce_property")
        };
        GroupExpression::new(enforcer_operator(property), vec![input_group])
    }
}

#[cfg(test)]
mod tests {
    use cascara_expr::testing::col;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::operators::OrderDirection;
    use crate::property::PropertySort;

    fn sort_by_a() -> Property {
        Property::Sort(PropertySort::new(vec![(
            col("t1", "a"),
            OrderDirection::Asc,
        )]))
    }

    fn scan_in_group(group_id: GroupId) -> GroupExpression {
        let mut scan = GroupExpression::new(
            Operator::SeqScan {
                table: "t1".to_string(),
                alias: "t1".to_string(),
                predicates: vec![],
            },
            vec![],
        );
        scan.set_group_id(group_id);
        scan
    }

    #[test]
    fn enforce_sort_wraps_input_group() {
        let mut enforcer = PropertyEnforcer::new();
        let enforced = enforcer.enforce_property(&scan_in_group(GroupId(37)), &sort_by_a());
        assert_eq!(enforced.child_groups(), &[GroupId(37)]);
        assert_eq!(
            enforced.op(),
            &Operator::OrderBy {
                sort_keys: vec![(col("t1", "a"), OrderDirection::Asc)]
            }
        );
        assert_eq!(enforced.group_id(), None);
        assert_eq!(enforced.to_string(), "(OrderBy [t1.a Asc] !37)");
    }

    #[test]
    fn enforcer_is_reusable() {
        let mut enforcer = PropertyEnforcer::new();
        let first = enforcer.enforce_property(&scan_in_group(GroupId(1)), &sort_by_a());
        let second = enforcer.enforce_property(&scan_in_group(GroupId(2)), &sort_by_a());
        assert_eq!(first.child_groups(), &[GroupId(1)]);
        assert_eq!(second.child_groups(), &[GroupId(2)]);
        assert_eq!(enforcer.input_group, None);
    }

    #[test]
    #[should_panic(expected = "not in any group")]
    fn input_must_be_memoized() {
        let scan = GroupExpression::new(
            Operator::SeqScan {
                table: "t1".to_string(),
                alias: "t1".to_string(),
                predicates: vec![],
            },
            vec![],
        );
        PropertyEnforcer::new().enforce_property(&scan, &sort_by_a());
    }
}
