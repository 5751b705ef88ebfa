// Copyright (c) 2023-2024 CMU Database Group
//
// Use of this source code is governed by an MIT-style license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Short-hand builders for expression trees in tests.

use crate::expr_type::ExprType;
use crate::nodes::ExprNode;
use crate::value::{Value, ValueType};

/// An integer column `table.column`.
pub fn col(table: &str, column: &str) -> ExprNode {
    ExprNode::column(table, column, ValueType::Integer)
}

pub fn int(x: i32) -> ExprNode {
    ExprNode::constant(Value::Integer(x))
}

pub fn op(typ: ExprType, children: Vec<ExprNode>) -> ExprNode {
    let mut expr = ExprNode::operator(typ, ValueType::Invalid, children);
    expr.derive_return_value_type();
    expr
}

pub fn add(left: ExprNode, right: ExprNode) -> ExprNode {
    op(ExprType::OperatorPlus, vec![left, right])
}

pub fn not(child: ExprNode) -> ExprNode {
    op(ExprType::OperatorNot, vec![child])
}

pub fn cmp(typ: ExprType, left: ExprNode, right: ExprNode) -> ExprNode {
    ExprNode::comparison(typ, left, right)
}

pub fn and(left: ExprNode, right: ExprNode) -> ExprNode {
    ExprNode::conjunction(ExprType::ConjunctionAnd, left, right)
}

pub fn agg(typ: ExprType, child: ExprNode) -> ExprNode {
    ExprNode::aggregate(typ, child, false)
}

pub fn sum(child: ExprNode) -> ExprNode {
    agg(ExprType::AggregateSum, child)
}

pub fn count_star() -> ExprNode {
    agg(ExprType::AggregateCount, ExprNode::star())
}

pub fn derived(tuple_idx: usize, value_idx: usize) -> ExprNode {
    ExprNode::derived_value(ValueType::Integer, tuple_idx, value_idx)
}
