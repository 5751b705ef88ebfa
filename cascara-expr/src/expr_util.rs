// Copyright (c) 2023-2024 CMU Database Group
//
// Use of this source code is governed by an MIT-style license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Tree algorithms used while turning bound expressions into operator arguments.
//!
//! None of these functions mutate their input; rewrites return new trees.

use std::collections::BTreeSet;

use anyhow::{bail, Result};
use tracing::warn;

use crate::defs::{AnnotatedExpression, ExprMap, ExprSet};
use crate::expr_type::ExprType;
use crate::nodes::{ExprData, ExprNode, WhenClause};

pub fn is_aggregate_expression(typ: ExprType) -> bool {
    matches!(
        typ,
        ExprType::AggregateCount
            | ExprType::AggregateSum
            | ExprType::AggregateMin
            | ExprType::AggregateMax
            | ExprType::AggregateAvg
    )
}

pub fn is_operator_expression(typ: ExprType) -> bool {
    use ExprType::*;
    matches!(
        typ,
        OperatorPlus
            | OperatorMinus
            | OperatorMultiply
            | OperatorDivide
            | OperatorConcat
            | OperatorMod
            | OperatorCast
            | OperatorNot
            | OperatorIsNull
            | OperatorExists
            | OperatorUnaryMinus
    )
}

/// Maps each ordering comparison to its complement: `>` and `<=` swap, as do `>=` and `<`.
/// Other types are returned unchanged.
pub fn reverse_comparison_expression_type(typ: ExprType) -> ExprType {
    use ExprType::*;
    match typ {
        CompareGreaterThan => CompareLessThanOrEqualTo,
        CompareGreaterThanOrEqualTo => CompareLessThan,
        CompareLessThan => CompareGreaterThanOrEqualTo,
        CompareLessThanOrEqualTo => CompareGreaterThan,
        other => other,
    }
}

fn assert_not_derived(expr: &ExprNode) {
    assert!(
        expr.expression_type() != ExprType::ValueTuple,
        "unexpected derived value {} before evaluation",
        expr
    );
}

/// Collects the table of every column reference in `expr` into `table_alias_set`.
pub fn generate_table_alias_set(expr: &ExprNode, table_alias_set: &mut BTreeSet<String>) {
    if expr.expression_type() == ExprType::ColumnValue {
        let table_name = expr.table_name();
        assert!(!table_name.is_empty(), "column {} has no table alias", expr);
        table_alias_set.insert(table_name.to_string());
        return;
    }
    assert_not_derived(expr);
    for operand in expr.operands() {
        generate_table_alias_set(operand, table_alias_set);
    }
}

fn derived_for(expr: &ExprNode, expr_maps: &[ExprMap]) -> Option<ExprNode> {
    expr_maps
        .iter()
        .enumerate()
        .find_map(|(tuple_idx, expr_map)| {
            expr_map.get(expr).map(|&value_idx| {
                ExprNode::derived_value(expr.return_value_type(), tuple_idx, value_idx)
            })
        })
}

/// Replaces every non-column child sub-tree that one of the inputs already produces with a
/// positional reference into that input. Column references are left for
/// [`evaluate_expression`]. When several inputs produce the same sub-tree the first one wins.
pub fn convert_expr_cv_nodes(expr: &ExprNode, child_expr_maps: &[ExprMap]) -> ExprNode {
    let children = expr
        .children()
        .iter()
        .map(|child| {
            if child.expression_type() != ExprType::ColumnValue {
                if let Some(derived) = derived_for(child, child_expr_maps) {
                    return derived;
                }
            }
            convert_expr_cv_nodes(child, child_expr_maps)
        })
        .collect();
    expr.copy_with_children(children)
}

fn collect_tuple_and_aggregate_exprs(
    expr: &ExprNode,
    aggr_exprs: &mut Vec<ExprNode>,
    tv_exprs: &mut Vec<ExprNode>,
) {
    if is_aggregate_expression(expr.expression_type()) {
        aggr_exprs.push(expr.copy());
    } else if expr.expression_type() == ExprType::ColumnValue {
        tv_exprs.push(expr.copy());
    } else {
        assert_not_derived(expr);
        for operand in expr.operands() {
            collect_tuple_and_aggregate_exprs(operand, aggr_exprs, tv_exprs);
        }
    }
}

/// Collects column references and aggregates of `expr`. Aggregates are not descended into.
pub fn get_tuple_and_aggregate_exprs(expr: &ExprNode, expr_set: &mut ExprSet) {
    let mut aggr_exprs = vec![];
    let mut tv_exprs = vec![];
    collect_tuple_and_aggregate_exprs(expr, &mut aggr_exprs, &mut tv_exprs);
    expr_set.extend(tv_exprs);
    expr_set.extend(aggr_exprs);
}

/// Like [`get_tuple_and_aggregate_exprs`], but records the first-seen position of every
/// expression. Column references found in `expr` are numbered before its aggregates.
pub fn get_tuple_and_aggregate_exprs_map(expr: &ExprNode, expr_map: &mut ExprMap) {
    let mut aggr_exprs = vec![];
    let mut tv_exprs = vec![];
    collect_tuple_and_aggregate_exprs(expr, &mut aggr_exprs, &mut tv_exprs);
    for found in tv_exprs.into_iter().chain(aggr_exprs) {
        let next = expr_map.len();
        expr_map.entry(found).or_insert(next);
    }
}

/// The aggregates of `expr` in the order they are found.
pub fn get_aggregate_exprs(expr: &ExprNode) -> Vec<ExprNode> {
    let mut aggr_exprs = vec![];
    collect_tuple_and_aggregate_exprs(expr, &mut aggr_exprs, &mut vec![]);
    aggr_exprs
}

/// Collects the positional references of `expr` in post-order.
pub fn get_tuple_value_exprs(expr: &ExprNode, expr_set: &mut ExprSet) {
    for operand in expr.operands() {
        get_tuple_value_exprs(operand, expr_set);
    }
    if expr.expression_type() == ExprType::ValueTuple {
        expr_set.insert(expr.copy());
    }
}

/// Collects the positional references of `expr` in post-order, numbering each one the first
/// time it is seen.
pub fn get_tuple_value_exprs_map(expr: &ExprNode, expr_map: &mut ExprMap) {
    for operand in expr.operands() {
        get_tuple_value_exprs_map(operand, expr_map);
    }
    if expr.expression_type() == ExprType::ValueTuple {
        let next = expr_map.len();
        expr_map.entry(expr.copy()).or_insert(next);
    }
}

fn evaluate_inner(
    expr_maps: &[ExprMap],
    expr: &ExprNode,
    unbound: &mut Vec<ExprNode>,
) -> ExprNode {
    assert_not_derived(expr);
    let children = expr
        .children()
        .iter()
        .map(|child| evaluate_inner(expr_maps, child, unbound))
        .collect();

    match expr.data() {
        ExprData::Column { .. } => {
            if let Some(derived) = derived_for(expr, expr_maps) {
                return derived;
            }
            unbound.push(expr.copy());
        }
        ExprData::Case {
            when_clauses,
            default_clause,
        } => {
            let when_clauses = when_clauses
                .iter()
                .map(|clause| {
                    WhenClause::new(
                        evaluate_inner(expr_maps, &clause.condition, unbound),
                        evaluate_inner(expr_maps, &clause.then, unbound),
                    )
                })
                .collect();
            let default_clause = default_clause.as_deref().map(|default_clause| {
                Box::new(evaluate_inner(expr_maps, default_clause, unbound))
            });
            let mut evaluated = expr.copy_with_children(children);
            evaluated.data = ExprData::Case {
                when_clauses,
                default_clause,
            };
            return evaluated;
        }
        // aggregates keep their identity here; only their arguments are bound
        _ => {}
    }
    expr.copy_with_children(children)
}

/// Binds `expr` against the outputs of the inputs described by `expr_maps`, bottom-up.
///
/// Every column reference becomes a positional reference into the first input that produces
/// it. A column no input produces is left in place with a warning. Panics if `expr` already
/// contains positional references.
pub fn evaluate_expression(expr_maps: &[ExprMap], expr: &ExprNode) -> ExprNode {
    let mut unbound = vec![];
    let evaluated = evaluate_inner(expr_maps, expr, &mut unbound);
    for column in &unbound {
        warn!(event = "unbound_column", column = %column, expr = %expr);
    }
    evaluated
}

/// Like [`evaluate_expression`], but fails if any column reference stays unbound.
pub fn try_evaluate_expression(expr_maps: &[ExprMap], expr: &ExprNode) -> Result<ExprNode> {
    let mut unbound = vec![];
    let evaluated = evaluate_inner(expr_maps, expr, &mut unbound);
    if let Some(column) = unbound.first() {
        bail!("column {} of {} is not produced by any input", column, expr);
    }
    Ok(evaluated)
}

/// Compares two expression lists, position by position when `ordered`, as sets otherwise.
pub fn equal_expressions(l: &[ExprNode], r: &[ExprNode], ordered: bool) -> bool {
    if l.len() != r.len() {
        return false;
    }
    if ordered {
        return l.iter().zip(r).all(|(l, r)| l == r);
    }
    let l_set: ExprSet = l.iter().cloned().collect();
    let r_set: ExprSet = r.iter().cloned().collect();
    l_set == r_set
}

/// Folds the expressions into a left-deep `AND` chain. Returns `None` for an empty list.
pub fn join_annotated_exprs(exprs: &[AnnotatedExpression]) -> Option<ExprNode> {
    exprs
        .iter()
        .map(|annotated| annotated.expr().copy())
        .reduce(|acc, expr| ExprNode::conjunction(ExprType::ConjunctionAnd, acc, expr))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::tests::common::{add, and, cmp, col, count_star, int, sum};
    use crate::value::ValueType;

    fn expr_map(exprs: &[ExprNode]) -> ExprMap {
        exprs
            .iter()
            .enumerate()
            .map(|(idx, expr)| (expr.copy(), idx))
            .collect()
    }

    #[test]
    fn classification() {
        assert!(is_aggregate_expression(ExprType::AggregateAvg));
        assert!(!is_aggregate_expression(ExprType::Function));
        assert!(is_operator_expression(ExprType::OperatorCast));
        assert!(!is_operator_expression(ExprType::CompareEqual));
        assert_eq!(
            reverse_comparison_expression_type(ExprType::CompareGreaterThan),
            ExprType::CompareLessThanOrEqualTo
        );
        assert_eq!(
            reverse_comparison_expression_type(ExprType::CompareLessThan),
            ExprType::CompareGreaterThanOrEqualTo
        );
        assert_eq!(
            reverse_comparison_expression_type(ExprType::CompareEqual),
            ExprType::CompareEqual
        );
    }

    #[test]
    fn table_alias_set_is_idempotent() {
        let expr = and(
            cmp(ExprType::CompareEqual, col("t1", "a"), col("t2", "a")),
            cmp(ExprType::CompareLessThan, col("t2", "b"), int(3)),
        );
        let mut first = BTreeSet::new();
        generate_table_alias_set(&expr, &mut first);
        let mut second = first.clone();
        generate_table_alias_set(&expr, &mut second);
        assert_eq!(first, second);
        assert_eq!(
            first.into_iter().collect::<Vec<_>>(),
            vec!["t1".to_string(), "t2".to_string()]
        );
    }

    #[test]
    #[should_panic(expected = "unexpected derived value")]
    fn table_alias_set_rejects_derived_values() {
        let expr = add(col("t1", "a"), ExprNode::derived_value(ValueType::Integer, 0, 0));
        generate_table_alias_set(&expr, &mut BTreeSet::new());
    }

    #[test]
    fn convert_aggregate_to_position() {
        let total = sum(col("t1", "a"));
        let expr = cmp(ExprType::CompareGreaterThan, total.copy(), int(10));
        let maps = vec![expr_map(&[col("t1", "b"), total.copy()])];
        let converted = convert_expr_cv_nodes(&expr, &maps);
        assert_eq!(
            converted,
            cmp(
                ExprType::CompareGreaterThan,
                ExprNode::derived_value(ValueType::BigInt, 0, 1),
                int(10)
            )
        );
        // the input is untouched and a second pass changes nothing
        assert_eq!(expr.child(0), &total);
        assert_eq!(convert_expr_cv_nodes(&converted, &maps), converted);
    }

    #[test]
    fn convert_leaves_columns_alone() {
        let expr = add(col("t1", "a"), int(1));
        let maps = vec![expr_map(&[col("t1", "a")])];
        assert_eq!(convert_expr_cv_nodes(&expr, &maps), expr);
    }

    #[test]
    fn tuple_and_aggregate_order() {
        let expr = add(sum(col("t1", "a")), col("t1", "b"));
        let mut map = ExprMap::new();
        get_tuple_and_aggregate_exprs_map(&expr, &mut map);
        assert_eq!(map.len(), 2);
        assert_eq!(map[&col("t1", "b")], 0);
        assert_eq!(map[&sum(col("t1", "a"))], 1);

        // already numbered expressions keep their position
        get_tuple_and_aggregate_exprs_map(&add(col("t1", "c"), col("t1", "b")), &mut map);
        assert_eq!(map[&col("t1", "b")], 0);
        assert_eq!(map[&col("t1", "c")], 2);

        let mut set = ExprSet::new();
        get_tuple_and_aggregate_exprs(&expr, &mut set);
        assert!(set.contains(&col("t1", "b")));
        assert!(set.contains(&sum(col("t1", "a"))));
        assert!(!set.contains(&col("t1", "a")));
    }

    #[test]
    #[should_panic(expected = "unexpected derived value")]
    fn tuple_and_aggregate_set_rejects_derived_values() {
        let expr = add(col("t1", "a"), ExprNode::derived_value(ValueType::Integer, 0, 1));
        get_tuple_and_aggregate_exprs(&expr, &mut ExprSet::new());
    }

    #[test]
    #[should_panic(expected = "unexpected derived value")]
    fn tuple_and_aggregate_map_rejects_derived_values() {
        let expr = cmp(
            ExprType::CompareEqual,
            sum(col("t1", "a")),
            ExprNode::derived_value(ValueType::BigInt, 1, 0),
        );
        get_tuple_and_aggregate_exprs_map(&expr, &mut ExprMap::new());
    }

    #[test]
    fn aggregates_only() {
        let expr = add(sum(col("t1", "a")), count_star());
        assert_eq!(
            get_aggregate_exprs(&expr),
            vec![sum(col("t1", "a")), count_star()]
        );
    }

    #[test]
    fn tuple_values_post_order() {
        let d0 = ExprNode::derived_value(ValueType::Integer, 0, 0);
        let d1 = ExprNode::derived_value(ValueType::Integer, 1, 0);
        let expr = and(
            cmp(ExprType::CompareEqual, d1.copy(), d0.copy()),
            cmp(ExprType::CompareEqual, d0.copy(), int(1)),
        );
        let mut map = ExprMap::new();
        get_tuple_value_exprs_map(&expr, &mut map);
        assert_eq!(map[&d1], 0);
        assert_eq!(map[&d0], 1);
        let mut set = ExprSet::new();
        get_tuple_value_exprs(&expr, &mut set);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn evaluate_binds_columns_to_first_input() {
        let maps = vec![
            expr_map(&[col("t1", "a"), col("t1", "b")]),
            expr_map(&[col("t2", "b"), col("t1", "b")]),
        ];
        let expr = cmp(ExprType::CompareEqual, col("t1", "b"), col("t2", "b"));
        assert_eq!(
            evaluate_expression(&maps, &expr),
            cmp(
                ExprType::CompareEqual,
                ExprNode::derived_value(ValueType::Integer, 0, 1),
                ExprNode::derived_value(ValueType::Integer, 1, 0)
            )
        );
    }

    #[test]
    fn evaluate_keeps_unbound_columns() {
        let maps = vec![expr_map(&[col("t1", "a")])];
        let expr = add(col("t1", "a"), col("t3", "z"));
        assert_eq!(
            evaluate_expression(&maps, &expr),
            add(ExprNode::derived_value(ValueType::Integer, 0, 0), col("t3", "z"))
        );
        assert!(try_evaluate_expression(&maps, &expr).is_err());
        assert!(try_evaluate_expression(&maps, &col("t1", "a")).is_ok());
    }

    #[test]
    fn evaluate_case_and_aggregate() {
        let maps = vec![expr_map(&[col("t1", "a"), col("t1", "b")])];
        let case = ExprNode::case(
            ValueType::Integer,
            vec![WhenClause::new(
                cmp(ExprType::CompareGreaterThan, col("t1", "a"), int(0)),
                col("t1", "b"),
            )],
            Some(int(0)),
        );
        let expected = ExprNode::case(
            ValueType::Integer,
            vec![WhenClause::new(
                cmp(
                    ExprType::CompareGreaterThan,
                    ExprNode::derived_value(ValueType::Integer, 0, 0),
                    int(0),
                ),
                ExprNode::derived_value(ValueType::Integer, 0, 1),
            )],
            Some(int(0)),
        );
        assert_eq!(evaluate_expression(&maps, &case), expected);

        let evaluated = evaluate_expression(&maps, &sum(col("t1", "a")));
        assert_eq!(evaluated.expression_type(), ExprType::AggregateSum);
        assert_eq!(
            evaluated.child(0),
            &ExprNode::derived_value(ValueType::Integer, 0, 0)
        );
    }

    #[test]
    #[should_panic(expected = "unexpected derived value")]
    fn evaluate_rejects_derived_values() {
        evaluate_expression(&[], &ExprNode::derived_value(ValueType::Integer, 0, 0));
    }

    #[test]
    fn list_equality() {
        let a = col("t1", "a");
        let b = col("t1", "b");
        assert!(equal_expressions(
            &[a.copy(), b.copy()],
            &[b.copy(), a.copy()],
            false
        ));
        assert!(!equal_expressions(
            &[a.copy(), b.copy()],
            &[b.copy(), a.copy()],
            true
        ));
        assert!(equal_expressions(
            &[a.copy(), b.copy()],
            &[a.copy(), b.copy()],
            true
        ));
        assert!(!equal_expressions(&[a.copy()], &[a.copy(), b.copy()], false));
    }

    #[test]
    fn join_predicates() {
        let p1 = cmp(ExprType::CompareEqual, col("t1", "a"), int(1));
        let p2 = cmp(ExprType::CompareEqual, col("t2", "a"), int(2));
        let p3 = cmp(ExprType::CompareEqual, col("t3", "a"), int(3));
        let annotated = [&p1, &p2, &p3]
            .into_iter()
            .map(|p| AnnotatedExpression::new(p.copy()))
            .collect::<Vec<_>>();
        assert_eq!(
            annotated[1].table_alias_set().iter().collect::<Vec<_>>(),
            vec!["t2"]
        );
        assert_eq!(
            join_annotated_exprs(&annotated),
            Some(and(and(p1.copy(), p2.copy()), p3.copy()))
        );
        assert_eq!(join_annotated_exprs(&annotated[..1]), Some(p1));
        assert_eq!(join_annotated_exprs(&[]), None);
    }
}
