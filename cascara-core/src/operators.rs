// Copyright (c) 2023-2024 CMU Database Group
//
// Use of this source code is governed by an MIT-style license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Logical and physical operators carried by group expressions. Operators hold their scalar
//! arguments but never their inputs; inputs are the child groups of the group expression.

use std::fmt::Display;

use cascara_expr::{AnnotatedExpression, ExprNode};
use itertools::Itertools;
use pretty_xmlish::Pretty;
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderDirection {
    Asc,
    Desc,
}

impl Display for OrderDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Operator {
    // logical
    LogicalGet {
        table: String,
        alias: String,
    },
    LogicalFilter {
        predicates: Vec<AnnotatedExpression>,
    },
    LogicalInnerJoin {
        join_predicates: Vec<AnnotatedExpression>,
    },
    // physical
    SeqScan {
        table: String,
        alias: String,
        predicates: Vec<AnnotatedExpression>,
    },
    OrderBy {
        sort_keys: Vec<(ExprNode, OrderDirection)>,
    },
    HashGroupBy {
        group_by: Vec<ExprNode>,
        having: Vec<AnnotatedExpression>,
    },
}

impl Operator {
    pub fn name(&self) -> &'static str {
        match self {
            Self::LogicalGet { .. } => "LogicalGet",
            Self::LogicalFilter { .. } => "LogicalFilter",
            Self::LogicalInnerJoin { .. } => "LogicalInnerJoin",
            Self::SeqScan { .. } => "SeqScan",
            Self::OrderBy { .. } => "OrderBy",
            Self::HashGroupBy { .. } => "HashGroupBy",
        }
    }

    pub fn is_logical(&self) -> bool {
        matches!(
            self,
            Self::LogicalGet { .. } | Self::LogicalFilter { .. } | Self::LogicalInnerJoin { .. }
        )
    }

    /// Number of child groups a group expression with this operator has.
    pub fn num_inputs(&self) -> usize {
        match self {
            Self::LogicalGet { .. } | Self::SeqScan { .. } => 0,
            Self::LogicalFilter { .. } | Self::OrderBy { .. } | Self::HashGroupBy { .. } => 1,
            Self::LogicalInnerJoin { .. } => 2,
        }
    }

    fn exprs_field(exprs: &[ExprNode]) -> Pretty<'static> {
        Pretty::Array(exprs.iter().map(|expr| expr.explain()).collect())
    }

    fn predicates_field(predicates: &[AnnotatedExpression]) -> Pretty<'static> {
        Pretty::Array(
            predicates
                .iter()
                .map(|predicate| predicate.expr().explain())
                .collect(),
        )
    }

    /// The scalar arguments of this operator as explain fields.
    pub fn explain_fields(&self) -> Vec<(&'static str, Pretty<'static>)> {
        match self {
            Self::LogicalGet { table, alias } => vec![
                ("table", table.clone().into()),
                ("alias", alias.clone().into()),
            ],
            Self::SeqScan {
                table,
                alias,
                predicates,
            } => vec![
                ("table", table.clone().into()),
                ("alias", alias.clone().into()),
                ("predicates", Self::predicates_field(predicates)),
            ],
            Self::LogicalFilter { predicates } => {
                vec![("predicates", Self::predicates_field(predicates))]
            }
            Self::LogicalInnerJoin { join_predicates } => {
                vec![("cond", Self::predicates_field(join_predicates))]
            }
            Self::HashGroupBy { group_by, having } => vec![
                ("group_by", Self::exprs_field(group_by)),
                ("having", Self::predicates_field(having)),
            ],
            Self::OrderBy { sort_keys } => vec![(
                "sort_keys",
                Pretty::Array(
                    sort_keys
                        .iter()
                        .map(|(expr, direction)| {
                            Pretty::display(&format!("{} {}", expr, direction))
                        })
                        .collect(),
                ),
            )],
        }
    }
}

impl Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LogicalGet { table, alias } | Self::SeqScan { table, alias, .. } => {
                write!(f, "{} {} as {}", self.name(), table, alias)
            }
            Self::OrderBy { sort_keys } => write!(
                f,
                "{} [{}]",
                self.name(),
                sort_keys
                    .iter()
                    .map(|(expr, direction)| format!("{} {}", expr, direction))
                    .join(", ")
            ),
            _ => write!(f, "{}", self.name()),
        }
    }
}
