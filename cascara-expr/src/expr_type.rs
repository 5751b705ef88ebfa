// Copyright (c) 2023-2024 CMU Database Group
//
// Use of this source code is governed by an MIT-style license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// The operator family of an expression node.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExprType {
    // operators
    OperatorPlus,
    OperatorMinus,
    OperatorMultiply,
    OperatorDivide,
    OperatorConcat,
    OperatorMod,
    OperatorCast,
    OperatorNot,
    OperatorIsNull,
    OperatorIsNotNull,
    OperatorExists,
    OperatorUnaryMinus,

    // comparisons
    CompareEqual,
    CompareNotEqual,
    CompareLessThan,
    CompareGreaterThan,
    CompareLessThanOrEqualTo,
    CompareGreaterThanOrEqualTo,
    CompareLike,
    CompareNotLike,
    CompareIn,
    CompareIsDistinctFrom,

    // conjunctions
    ConjunctionAnd,
    ConjunctionOr,

    // values
    ValueConstant,
    ValueParameter,
    /// A positional reference `(tuple_idx, value_idx)` into a prior stage's output.
    ValueTuple,
    ColumnValue,

    Function,

    // aggregates
    AggregateCount,
    AggregateSum,
    AggregateMin,
    AggregateMax,
    AggregateAvg,

    OperatorCaseExpr,
    RowSubquery,
    Star,
}

/// How many children a node of a given type owns.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(&self, n: usize) -> bool {
        match self {
            Self::Exact(k) => n == *k,
            Self::AtLeast(k) => n >= *k,
        }
    }
}

impl Display for Arity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exact(k) => write!(f, "exactly {k}"),
            Self::AtLeast(k) => write!(f, "at least {k}"),
        }
    }
}

impl ExprType {
    pub fn arity(&self) -> Arity {
        use ExprType::*;
        match self {
            OperatorPlus | OperatorMinus | OperatorMultiply | OperatorDivide | OperatorConcat
            | OperatorMod => Arity::Exact(2),
            OperatorCast | OperatorNot | OperatorIsNull | OperatorIsNotNull | OperatorExists
            | OperatorUnaryMinus => Arity::Exact(1),
            CompareEqual
            | CompareNotEqual
            | CompareLessThan
            | CompareGreaterThan
            | CompareLessThanOrEqualTo
            | CompareGreaterThanOrEqualTo
            | CompareLike
            | CompareNotLike
            | CompareIsDistinctFrom => Arity::Exact(2),
            // `x IN (a, b, ...)`: the probe followed by the list
            CompareIn => Arity::AtLeast(2),
            ConjunctionAnd | ConjunctionOr => Arity::Exact(2),
            ValueConstant | ValueParameter | ValueTuple | ColumnValue | Star => Arity::Exact(0),
            Function => Arity::AtLeast(0),
            AggregateCount | AggregateSum | AggregateMin | AggregateMax | AggregateAvg => {
                Arity::Exact(1)
            }
            // when clauses and the default live in the case payload
            OperatorCaseExpr => Arity::Exact(0),
            // the sub-select is spliced in by the binder as the single child
            RowSubquery => Arity::AtLeast(0),
        }
    }

    pub fn is_comparison(&self) -> bool {
        use ExprType::*;
        matches!(
            self,
            CompareEqual
                | CompareNotEqual
                | CompareLessThan
                | CompareGreaterThan
                | CompareLessThanOrEqualTo
                | CompareGreaterThanOrEqualTo
                | CompareLike
                | CompareNotLike
                | CompareIn
                | CompareIsDistinctFrom
        )
    }

    pub fn is_conjunction(&self) -> bool {
        matches!(self, Self::ConjunctionAnd | Self::ConjunctionOr)
    }

    /// The short operator symbol used when rendering and naming expressions.
    pub fn symbol(&self) -> &'static str {
        use ExprType::*;
        match self {
            OperatorPlus => "+",
            OperatorMinus => "-",
            OperatorMultiply => "*",
            OperatorDivide => "/",
            OperatorConcat => "||",
            OperatorMod => "%",
            OperatorCast => "cast",
            OperatorNot => "not",
            OperatorIsNull => "is_null",
            OperatorIsNotNull => "is_not_null",
            OperatorExists => "exists",
            OperatorUnaryMinus => "neg",
            CompareEqual => "=",
            CompareNotEqual => "<>",
            CompareLessThan => "<",
            CompareGreaterThan => ">",
            CompareLessThanOrEqualTo => "<=",
            CompareGreaterThanOrEqualTo => ">=",
            CompareLike => "like",
            CompareNotLike => "not_like",
            CompareIn => "in",
            CompareIsDistinctFrom => "is_distinct_from",
            ConjunctionAnd => "and",
            ConjunctionOr => "or",
            ValueConstant => "constant",
            ValueParameter => "param",
            ValueTuple => "derived",
            ColumnValue => "column",
            Function => "func",
            AggregateCount => "count",
            AggregateSum => "sum",
            AggregateMin => "min",
            AggregateMax => "max",
            AggregateAvg => "avg",
            OperatorCaseExpr => "case",
            RowSubquery => "subquery",
            Star => "*",
        }
    }
}

impl Display for ExprType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}
