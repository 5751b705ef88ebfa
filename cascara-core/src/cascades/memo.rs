// Copyright (c) 2023-2024 CMU Database Group
//
// Use of this source code is governed by an MIT-style license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use std::collections::HashMap;

use anyhow::{bail, Context, Result};
use tracing::trace;

use super::{ExprId, GroupExpression, GroupId};

/// An equivalence class of group expressions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Group {
    id: GroupId,
    logical_exprs: Vec<ExprId>,
    physical_exprs: Vec<ExprId>,
    /// Physical expressions synthesized by property enforcers.
    enforced_exprs: Vec<ExprId>,
}

impl Group {
    fn new(id: GroupId) -> Self {
        Self {
            id,
            logical_exprs: vec![],
            physical_exprs: vec![],
            enforced_exprs: vec![],
        }
    }

    pub fn id(&self) -> GroupId {
        self.id
    }

    pub fn logical_exprs(&self) -> &[ExprId] {
        &self.logical_exprs
    }

    pub fn physical_exprs(&self) -> &[ExprId] {
        &self.physical_exprs
    }

    pub fn enforced_exprs(&self) -> &[ExprId] {
        &self.enforced_exprs
    }

    pub fn all_exprs(&self) -> impl Iterator<Item = ExprId> + '_ {
        self.logical_exprs
            .iter()
            .chain(&self.physical_exprs)
            .chain(&self.enforced_exprs)
            .copied()
    }
}

/// Owns every group and group expression of one optimization pass. Everything outside the memo
/// refers to them by id.
#[derive(Default)]
pub struct Memo {
    groups: HashMap<GroupId, Group>,
    expr_id_to_expr: HashMap<ExprId, GroupExpression>,

    // Indexes.
    expr_to_expr_id: HashMap<GroupExpression, ExprId>,

    group_counter: usize,
    expr_counter: usize,
}

impl Memo {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_group_id(&mut self) -> GroupId {
        let id = self.group_counter;
        self.group_counter += 1;
        GroupId(id)
    }

    fn next_expr_id(&mut self) -> ExprId {
        let id = self.expr_counter;
        self.expr_counter += 1;
        ExprId(id)
    }

    /// Memoizes `gexpr` into `target_group`, or into a new group when it is `None`.
    ///
    /// If an equal expression (same operator and child groups) is already memoized, its id is
    /// returned and nothing is inserted, even when it lives in a different group than
    /// `target_group`. Enforced expressions are kept apart from the physical alternatives of
    /// the group.
    pub fn insert_expression(
        &mut self,
        mut gexpr: GroupExpression,
        target_group: Option<GroupId>,
        enforced: bool,
    ) -> Result<ExprId> {
        for child in gexpr.child_groups() {
            if !self.groups.contains_key(child) {
                bail!("{} refers to unknown group {}", gexpr, child);
            }
        }
        if let Some(&expr_id) = self.expr_to_expr_id.get(&gexpr) {
            let group_id = self.expr_id_to_expr[&expr_id].group_id();
            trace!(event = "duplicate_expr", expr_id = %expr_id, group_id = ?group_id, expr = %gexpr);
            return Ok(expr_id);
        }
        let group_id = match target_group {
            Some(group_id) => {
                if !self.groups.contains_key(&group_id) {
                    bail!("cannot insert {} into unknown group {}", gexpr, group_id);
                }
                group_id
            }
            None => {
                let group_id = self.next_group_id();
                self.groups.insert(group_id, Group::new(group_id));
                group_id
            }
        };
        let expr_id = self.next_expr_id();
        gexpr.set_group_id(group_id);
        trace!(event = "add_expr_to_group", group_id = %group_id, expr_id = %expr_id, expr = %gexpr, enforced = enforced);

        let group = self
            .groups
            .get_mut(&group_id)
            .with_context(|| format!("group {} disappeared", group_id))?;
        if enforced {
            group.enforced_exprs.push(expr_id);
        } else if gexpr.op().is_logical() {
            group.logical_exprs.push(expr_id);
        } else {
            group.physical_exprs.push(expr_id);
        }
        self.expr_to_expr_id.insert(gexpr.clone(), expr_id);
        self.expr_id_to_expr.insert(expr_id, gexpr);
        Ok(expr_id)
    }

    pub fn get_group(&self, group_id: GroupId) -> Result<&Group> {
        self.groups
            .get(&group_id)
            .with_context(|| format!("group {} not found", group_id))
    }

    pub fn get_expr(&self, expr_id: ExprId) -> Result<&GroupExpression> {
        self.expr_id_to_expr
            .get(&expr_id)
            .with_context(|| format!("expr {} not found", expr_id))
    }

    pub fn get_group_id(&self, expr_id: ExprId) -> Result<GroupId> {
        self.get_expr(expr_id)?
            .group_id()
            .with_context(|| format!("expr {} has no group", expr_id))
    }

    /// The id of a memoized expression equal to `gexpr`.
    pub fn lookup_expr(&self, gexpr: &GroupExpression) -> Option<ExprId> {
        self.expr_to_expr_id.get(gexpr).copied()
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn expr_count(&self) -> usize {
        self.expr_id_to_expr.len()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::operators::Operator;

    fn get(table: &str) -> GroupExpression {
        GroupExpression::new(
            Operator::LogicalGet {
                table: table.to_string(),
                alias: table.to_string(),
            },
            vec![],
        )
    }

    fn scan(table: &str) -> GroupExpression {
        GroupExpression::new(
            Operator::SeqScan {
                table: table.to_string(),
                alias: table.to_string(),
                predicates: vec![],
            },
            vec![],
        )
    }

    #[test]
    fn insert_into_new_and_existing_group() {
        let mut memo = Memo::new();
        let get_id = memo.insert_expression(get("t1"), None, false).unwrap();
        let group_id = memo.get_group_id(get_id).unwrap();
        let scan_id = memo
            .insert_expression(scan("t1"), Some(group_id), false)
            .unwrap();
        assert_eq!(memo.get_group_id(scan_id).unwrap(), group_id);

        let group = memo.get_group(group_id).unwrap();
        assert_eq!(group.logical_exprs(), &[get_id]);
        assert_eq!(group.physical_exprs(), &[scan_id]);
        assert!(group.enforced_exprs().is_empty());
        assert_eq!(group.all_exprs().count(), 2);
        assert_eq!(memo.group_count(), 1);
    }

    #[test]
    fn deduplicate() {
        let mut memo = Memo::new();
        let first = memo.insert_expression(get("t1"), None, false).unwrap();
        let second = memo.insert_expression(get("t1"), None, false).unwrap();
        assert_eq!(first, second);
        assert_eq!(memo.expr_count(), 1);
        assert_eq!(memo.group_count(), 1);
        assert_eq!(memo.lookup_expr(&get("t1")), Some(first));
        assert_eq!(memo.lookup_expr(&get("t2")), None);
    }

    #[test]
    fn default_memo_starts_empty() {
        let mut memo = Memo::default();
        assert_eq!(memo.group_count(), 0);
        assert_eq!(memo.expr_count(), 0);
        let id = memo.insert_expression(get("t1"), None, false).unwrap();
        assert_eq!(id, ExprId(0));
        assert_eq!(memo.get_group_id(id).unwrap(), GroupId(0));
    }

    #[test]
    fn child_groups_must_exist() {
        let mut memo = Memo::new();
        let filter = GroupExpression::new(
            Operator::LogicalFilter { predicates: vec![] },
            vec![GroupId(7)],
        );
        assert!(memo.insert_expression(filter, None, false).is_err());
        assert!(memo.insert_expression(get("t1"), Some(GroupId(7)), false).is_err());
        assert!(memo.get_group(GroupId(7)).is_err());
        assert!(memo.get_expr(ExprId(7)).is_err());
    }
}
