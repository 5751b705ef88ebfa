// Copyright (c) 2023-2024 CMU Database Group
//
// Use of this source code is governed by an MIT-style license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use std::fmt::Display;
use std::hash::{Hash, Hasher};

use cascara_expr::explain::explain_to_string;
use pretty_xmlish::Pretty;

use super::GroupId;
use crate::operators::Operator;

/// One alternative inside a group: an operator whose inputs are other groups.
///
/// Two group expressions are equal when their operators and child groups are equal. The group
/// an expression belongs to is not part of its identity.
#[derive(Clone, Debug)]
pub struct GroupExpression {
    op: Operator,
    child_groups: Vec<GroupId>,
    group_id: Option<GroupId>,
}

impl GroupExpression {
    pub fn new(op: Operator, child_groups: Vec<GroupId>) -> Self {
        assert_eq!(
            op.num_inputs(),
            child_groups.len(),
            "{} takes {} inputs",
            op.name(),
            op.num_inputs()
        );
        Self {
            op,
            child_groups,
            group_id: None,
        }
    }

    pub fn op(&self) -> &Operator {
        &self.op
    }

    pub fn child_groups(&self) -> &[GroupId] {
        &self.child_groups
    }

    pub fn child_group(&self, idx: usize) -> GroupId {
        self.child_groups[idx]
    }

    /// The group this expression was memoized into, if any.
    pub fn group_id(&self) -> Option<GroupId> {
        self.group_id
    }

    pub(crate) fn set_group_id(&mut self, group_id: GroupId) {
        self.group_id = Some(group_id);
    }

    pub fn explain(&self) -> Pretty<'static> {
        let mut fields = self.op.explain_fields();
        if let Some(group_id) = self.group_id {
            fields.push(("group", Pretty::display(&group_id)));
        }
        Pretty::simple_record(
            self.op.name(),
            fields,
            self.child_groups
                .iter()
                .map(|child| Pretty::display(child))
                .collect(),
        )
    }

    pub fn explain_to_string(&self) -> String {
        explain_to_string(&self.explain())
    }
}

impl PartialEq for GroupExpression {
    fn eq(&self, other: &Self) -> bool {
        self.op == other.op && self.child_groups == other.child_groups
    }
}

impl Eq for GroupExpression {}

impl Hash for GroupExpression {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.op.hash(state);
        self.child_groups.hash(state);
    }
}

impl Display for GroupExpression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}", self.op)?;
        for child in &self.child_groups {
            write!(f, " {}", child)?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use cascara_expr::testing::{cmp, col};
    use cascara_expr::{AnnotatedExpression, ExprType};
    use pretty_assertions::assert_eq;

    use super::*;

    fn get(table: &str) -> Operator {
        Operator::LogicalGet {
            table: table.to_string(),
            alias: table.to_string(),
        }
    }

    #[test]
    fn group_id_is_not_identity() {
        let a = GroupExpression::new(get("t1"), vec![]);
        let mut b = a.clone();
        b.set_group_id(GroupId(3));
        assert_eq!(a, b);
        assert_eq!(a.group_id(), None);
        assert_eq!(b.group_id(), Some(GroupId(3)));
        let set: HashSet<_> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn children_are_groups() {
        let join = GroupExpression::new(
            Operator::LogicalInnerJoin {
                join_predicates: vec![],
            },
            vec![GroupId(1), GroupId(2)],
        );
        assert_eq!(join.child_groups(), &[GroupId(1), GroupId(2)]);
        assert_eq!(join.to_string(), "(LogicalInnerJoin !1 !2)");
        assert!(join.explain_to_string().contains("LogicalInnerJoin"));
    }

    #[test]
    fn explain_renders_operator_fields_and_children() {
        let predicate = AnnotatedExpression::new(cmp(
            ExprType::CompareEqual,
            col("t1", "a"),
            col("t2", "b"),
        ));
        let mut join = GroupExpression::new(
            Operator::LogicalInnerJoin {
                join_predicates: vec![predicate],
            },
            vec![GroupId(1), GroupId(2)],
        );
        join.set_group_id(GroupId(3));
        let out = join.explain_to_string();
        assert_eq!(out, explain_to_string(&join.explain()));
        assert!(out.contains("cond"));
        assert!(out.contains("CompareEqual"));
        assert!(out.contains("!1"));
        assert!(out.contains("!2"));
        assert!(out.contains("group"));
        assert!(out.contains("!3"));
    }

    #[test]
    #[should_panic(expected = "LogicalInnerJoin takes 2 inputs")]
    fn input_count_is_checked() {
        GroupExpression::new(
            Operator::LogicalInnerJoin {
                join_predicates: vec![],
            },
            vec![GroupId(1)],
        );
    }
}
