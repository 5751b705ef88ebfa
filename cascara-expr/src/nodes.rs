// Copyright (c) 2023-2024 CMU Database Group
//
// Use of this source code is governed by an MIT-style license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! The `ExprNode` is the scalar expression tree produced by the parser and binder and consumed by
//! the optimizer.
//!
//! A node has two layers:
//! - the structural core (`expression_type`, `alias`, `payload`, `children`), fixed at
//!   construction. Only an [`ExprRewriter`](crate::ExprRewriter) may replace a child.
//! - the [`ExprAnnotations`] overlay (`expression_name`, `return_value_type`, `depth`,
//!   `has_subquery`), recomputed in place by the `derive_*` passes.
//!
//! Equality and hashing cover both layers: two structurally identical trees whose annotation
//! passes have not run to the same state compare unequal. Nothing invalidates annotations
//! automatically; callers re-run the passes after changing the shape of a tree.

use std::fmt::Display;
use std::hash::{DefaultHasher, Hash, Hasher};

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::expr_type::ExprType;
use crate::value::{Value, ValueType};

/// Derived annotations of an expression node.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExprAnnotations {
    pub expression_name: String,
    pub return_value_type: ValueType,
    /// Sub-query nesting level used to detect correlated sub-queries. `-1` means not derived.
    pub depth: i32,
    /// Whether this node or any descendant is a sub-query.
    pub has_subquery: bool,
}

impl ExprAnnotations {
    pub fn with_type(return_value_type: ValueType) -> Self {
        Self {
            expression_name: String::new(),
            return_value_type,
            depth: -1,
            has_subquery: false,
        }
    }
}

impl Default for ExprAnnotations {
    fn default() -> Self {
        Self::with_type(ValueType::Invalid)
    }
}

/// One `WHEN condition THEN result` arm of a case expression.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WhenClause {
    pub condition: ExprNode,
    pub then: ExprNode,
}

impl WhenClause {
    pub fn new(condition: ExprNode, then: ExprNode) -> Self {
        Self { condition, then }
    }
}

/// Kind-specific payload of an expression node.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExprData {
    None,
    Constant(Value),
    Parameter {
        value_idx: u32,
    },
    Column {
        table_name: String,
        column_name: String,
    },
    DerivedValue {
        tuple_idx: usize,
        value_idx: usize,
    },
    Function {
        func_name: String,
    },
    Aggregate {
        distinct: bool,
    },
    Case {
        when_clauses: Vec<WhenClause>,
        default_clause: Option<Box<ExprNode>>,
    },
}

impl ExprData {
    /// Whether this payload is the one a node of type `typ` carries.
    pub fn matches(&self, typ: ExprType) -> bool {
        use ExprType::*;
        match self {
            Self::Constant(_) => typ == ValueConstant,
            Self::Parameter { .. } => typ == ValueParameter,
            Self::Column { .. } => typ == ColumnValue,
            Self::DerivedValue { .. } => typ == ValueTuple,
            Self::Function { .. } => typ == Function,
            Self::Aggregate { .. } => {
                matches!(
                    typ,
                    AggregateCount | AggregateSum | AggregateMin | AggregateMax | AggregateAvg
                )
            }
            Self::Case { .. } => typ == OperatorCaseExpr,
            Self::None => !matches!(
                typ,
                ValueConstant
                    | ValueParameter
                    | ColumnValue
                    | ValueTuple
                    | Function
                    | AggregateCount
                    | AggregateSum
                    | AggregateMin
                    | AggregateMax
                    | AggregateAvg
                    | OperatorCaseExpr
            ),
        }
    }
}

/// A scalar expression node. Owns its children exclusively.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExprNode {
    #[serde(rename = "expression_type")]
    pub(crate) typ: ExprType,
    pub(crate) children: Vec<ExprNode>,
    pub(crate) alias: String,
    #[serde(rename = "payload")]
    pub(crate) data: ExprData,
    #[serde(flatten)]
    pub(crate) annotations: ExprAnnotations,
}

pub(crate) fn check_arity(typ: ExprType, num_children: usize) {
    let arity = typ.arity();
    assert!(
        arity.accepts(num_children),
        "{} expects {} children, got {}",
        typ,
        arity,
        num_children
    );
}

impl ExprNode {
    /// Builds a node from its parts. Panics if the child count does not fit the type or the
    /// payload does not belong to the type.
    pub fn new(
        typ: ExprType,
        return_value_type: ValueType,
        children: Vec<ExprNode>,
        data: ExprData,
    ) -> Self {
        check_arity(typ, children.len());
        assert!(data.matches(typ), "payload {:?} does not belong to {}", data, typ);
        Self {
            typ,
            children,
            alias: String::new(),
            data,
            annotations: ExprAnnotations::with_type(return_value_type),
        }
    }

    /// A generic N-ary operator such as `+`, `NOT` or `CAST`.
    pub fn operator(typ: ExprType, return_value_type: ValueType, children: Vec<ExprNode>) -> Self {
        Self::new(typ, return_value_type, children, ExprData::None)
    }

    pub fn comparison(typ: ExprType, left: ExprNode, right: ExprNode) -> Self {
        assert!(typ.is_comparison(), "{} is not a comparison", typ);
        Self::new(typ, ValueType::Boolean, vec![left, right], ExprData::None)
    }

    pub fn conjunction(typ: ExprType, left: ExprNode, right: ExprNode) -> Self {
        assert!(typ.is_conjunction(), "{} is not a conjunction", typ);
        Self::new(typ, ValueType::Boolean, vec![left, right], ExprData::None)
    }

    pub fn constant(value: Value) -> Self {
        let typ = value.value_type();
        Self::new(ExprType::ValueConstant, typ, vec![], ExprData::Constant(value))
    }

    pub fn parameter(value_idx: u32, return_value_type: ValueType) -> Self {
        Self::new(
            ExprType::ValueParameter,
            return_value_type,
            vec![],
            ExprData::Parameter { value_idx },
        )
    }

    pub fn column(table_name: &str, column_name: &str, return_value_type: ValueType) -> Self {
        Self::new(
            ExprType::ColumnValue,
            return_value_type,
            vec![],
            ExprData::Column {
                table_name: table_name.to_string(),
                column_name: column_name.to_string(),
            },
        )
    }

    /// A positional reference to column `value_idx` of input `tuple_idx`.
    pub fn derived_value(return_value_type: ValueType, tuple_idx: usize, value_idx: usize) -> Self {
        Self::new(
            ExprType::ValueTuple,
            return_value_type,
            vec![],
            ExprData::DerivedValue {
                tuple_idx,
                value_idx,
            },
        )
    }

    pub fn function(func_name: &str, return_value_type: ValueType, args: Vec<ExprNode>) -> Self {
        Self::new(
            ExprType::Function,
            return_value_type,
            args,
            ExprData::Function {
                func_name: func_name.to_string(),
            },
        )
    }

    /// An aggregate over `child`. The return type is derived from the child.
    pub fn aggregate(typ: ExprType, child: ExprNode, distinct: bool) -> Self {
        let mut expr = Self::new(
            typ,
            ValueType::Invalid,
            vec![child],
            ExprData::Aggregate { distinct },
        );
        expr.derive_return_value_type();
        expr
    }

    pub fn case(
        return_value_type: ValueType,
        when_clauses: Vec<WhenClause>,
        default_clause: Option<ExprNode>,
    ) -> Self {
        Self::new(
            ExprType::OperatorCaseExpr,
            return_value_type,
            vec![],
            ExprData::Case {
                when_clauses,
                default_clause: default_clause.map(Box::new),
            },
        )
    }

    /// A sub-query placeholder. The binder splices the resolved select list in as its child.
    pub fn subquery(return_value_type: ValueType) -> Self {
        let mut expr = Self::new(
            ExprType::RowSubquery,
            return_value_type,
            vec![],
            ExprData::None,
        );
        expr.annotations.has_subquery = true;
        expr
    }

    pub fn star() -> Self {
        Self::new(ExprType::Star, ValueType::Invalid, vec![], ExprData::None)
    }

    /// Binds a display alias. Only meaningful right after construction.
    pub fn with_alias(mut self, alias: &str) -> Self {
        self.alias = alias.to_string();
        self
    }

    /// Deep copy. The copy is equal to `self` and shares no storage with it.
    pub fn copy(&self) -> ExprNode {
        self.clone()
    }

    /// Copies this node with `children` in place of its own. Type, payload, alias and
    /// annotations are kept. Panics if the child count does not fit the type.
    pub fn copy_with_children(&self, children: Vec<ExprNode>) -> ExprNode {
        check_arity(self.typ, children.len());
        ExprNode {
            typ: self.typ,
            children,
            alias: self.alias.clone(),
            data: self.data.clone(),
            annotations: self.annotations.clone(),
        }
    }

    pub fn hash_value(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }

    pub fn expression_type(&self) -> ExprType {
        self.typ
    }

    pub fn return_value_type(&self) -> ValueType {
        self.annotations.return_value_type
    }

    pub fn children(&self) -> &[ExprNode] {
        &self.children
    }

    pub fn children_size(&self) -> usize {
        self.children.len()
    }

    pub fn child(&self, idx: usize) -> &ExprNode {
        if idx >= self.children.len() {
            panic!("child index {} out of range: {}", idx, self);
        }
        &self.children[idx]
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn expression_name(&self) -> &str {
        &self.annotations.expression_name
    }

    pub fn depth(&self) -> i32 {
        self.annotations.depth
    }

    pub fn has_subquery(&self) -> bool {
        self.annotations.has_subquery
    }

    pub fn annotations(&self) -> &ExprAnnotations {
        &self.annotations
    }

    pub fn data(&self) -> &ExprData {
        &self.data
    }

    pub fn table_name(&self) -> &str {
        match &self.data {
            ExprData::Column { table_name, .. } => table_name,
            _ => panic!("not a column value: {}", self),
        }
    }

    pub fn column_name(&self) -> &str {
        match &self.data {
            ExprData::Column { column_name, .. } => column_name,
            _ => panic!("not a column value: {}", self),
        }
    }

    /// `(tuple_idx, value_idx)` of a positional reference.
    pub fn derived_position(&self) -> (usize, usize) {
        match &self.data {
            ExprData::DerivedValue {
                tuple_idx,
                value_idx,
            } => (*tuple_idx, *value_idx),
            _ => panic!("not a derived value: {}", self),
        }
    }

    pub fn constant_value(&self) -> &Value {
        match &self.data {
            ExprData::Constant(value) => value,
            _ => panic!("not a constant: {}", self),
        }
    }

    pub fn func_name(&self) -> &str {
        match &self.data {
            ExprData::Function { func_name } => func_name,
            _ => panic!("not a function: {}", self),
        }
    }

    pub fn is_distinct(&self) -> bool {
        match &self.data {
            ExprData::Aggregate { distinct } => *distinct,
            _ => panic!("not an aggregate: {}", self),
        }
    }

    pub fn when_clauses(&self) -> &[WhenClause] {
        match &self.data {
            ExprData::Case { when_clauses, .. } => when_clauses,
            _ => panic!("not a case expression: {}", self),
        }
    }

    pub fn default_clause(&self) -> Option<&ExprNode> {
        match &self.data {
            ExprData::Case { default_clause, .. } => default_clause.as_deref(),
            _ => panic!("not a case expression: {}", self),
        }
    }

    /// Children plus the nodes held in the case payload, in evaluation order.
    pub fn operands(&self) -> Vec<&ExprNode> {
        let mut operands = self.children.iter().collect_vec();
        if let ExprData::Case {
            when_clauses,
            default_clause,
        } = &self.data
        {
            for clause in when_clauses {
                operands.push(&clause.condition);
                operands.push(&clause.then);
            }
            if let Some(default_clause) = default_clause {
                operands.push(default_clause);
            }
        }
        operands
    }

    fn operands_mut(&mut self) -> Vec<&mut ExprNode> {
        let mut operands = self.children.iter_mut().collect_vec();
        if let ExprData::Case {
            when_clauses,
            default_clause,
        } = &mut self.data
        {
            for clause in when_clauses.iter_mut() {
                operands.push(&mut clause.condition);
                operands.push(&mut clause.then);
            }
            if let Some(default_clause) = default_clause {
                operands.push(default_clause);
            }
        }
        operands
    }

    /// Recomputes the return type of this node from its children. Does not recurse.
    ///
    /// `NOT`, `IS NULL`, `IS NOT NULL` and `EXISTS` return booleans. Other arithmetic
    /// operators return the largest operand type, which must not exceed
    /// [`ValueType::MAX_NUMERIC`]. `CAST` keeps its target type.
    pub fn derive_return_value_type(&mut self) {
        use ExprType::*;
        let derived = match self.typ {
            OperatorNot | OperatorIsNull | OperatorIsNotNull | OperatorExists => {
                ValueType::Boolean
            }
            OperatorCast => return,
            OperatorPlus | OperatorMinus | OperatorMultiply | OperatorDivide | OperatorConcat
            | OperatorMod | OperatorUnaryMinus => {
                let typ = self
                    .children
                    .iter()
                    .map(|child| child.return_value_type())
                    .max()
                    .unwrap_or_else(|| panic!("operator {} has no operands", self.typ));
                assert!(
                    typ <= ValueType::MAX_NUMERIC,
                    "invalid operand type {} in operator expression {}",
                    typ,
                    self
                );
                typ
            }
            t if t.is_comparison() || t.is_conjunction() => ValueType::Boolean,
            AggregateCount => ValueType::BigInt,
            AggregateAvg => ValueType::Decimal,
            AggregateSum => {
                if self.child(0).return_value_type().is_integral() {
                    ValueType::BigInt
                } else {
                    ValueType::Decimal
                }
            }
            AggregateMin | AggregateMax => self.child(0).return_value_type(),
            _ => return,
        };
        self.annotations.return_value_type = derived;
    }

    /// Recomputes the sub-query depth bottom-up and returns it.
    ///
    /// A node that already has a depth keeps it; otherwise it takes the smallest derived depth
    /// among its operands, and stays `-1` if none of them has one.
    pub fn derive_depth(&mut self) -> i32 {
        let mut derived = -1;
        for operand in self.operands_mut() {
            let child_depth = operand.derive_depth();
            if child_depth >= 0 && (derived == -1 || child_depth < derived) {
                derived = child_depth;
            }
        }
        if self.annotations.depth < 0 {
            self.annotations.depth = derived;
        }
        self.annotations.depth
    }

    /// Recomputes the sub-query flag bottom-up and returns it.
    pub fn derive_subquery_flag(&mut self) -> bool {
        let mut has_subquery = self.typ == ExprType::RowSubquery;
        for operand in self.operands_mut() {
            has_subquery |= operand.derive_subquery_flag();
        }
        self.annotations.has_subquery = has_subquery;
        has_subquery
    }

    /// Recomputes the display name of every node in the tree.
    pub fn derive_expression_name(&mut self) {
        for operand in self.operands_mut() {
            operand.derive_expression_name();
        }
        let name = if !self.alias.is_empty() {
            self.alias.clone()
        } else {
            match &self.data {
                ExprData::Column { column_name, .. } => column_name.clone(),
                ExprData::Constant(value) => value.to_string(),
                ExprData::Function { func_name } => format!(
                    "{}({})",
                    func_name,
                    self.children.iter().map(|c| c.expression_name()).join(", ")
                ),
                _ => format!(
                    "{}({})",
                    self.typ.symbol(),
                    self.children.iter().map(|c| c.expression_name()).join(", ")
                ),
            }
        };
        self.annotations.expression_name = name;
    }
}

impl Display for ExprNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.data {
            ExprData::Column {
                table_name,
                column_name,
            } => return write!(f, "{}.{}", table_name, column_name),
            ExprData::Constant(value) => return write!(f, "{}", value),
            ExprData::DerivedValue {
                tuple_idx,
                value_idx,
            } => return write!(f, "#{}.{}", tuple_idx, value_idx),
            ExprData::Parameter { value_idx } => return write!(f, "${}", value_idx),
            ExprData::Function { func_name } => write!(f, "({}", func_name)?,
            ExprData::Case {
                when_clauses,
                default_clause,
            } => {
                write!(f, "(case")?;
                for clause in when_clauses {
                    write!(f, " (when {} {})", clause.condition, clause.then)?;
                }
                if let Some(default_clause) = default_clause {
                    write!(f, " (else {})", default_clause)?;
                }
                return write!(f, ")");
            }
            ExprData::Aggregate { distinct: true } => write!(f, "({} distinct", self.typ.symbol())?,
            _ => write!(f, "({}", self.typ.symbol())?,
        }
        for child in &self.children {
            write!(f, " {}", child)?;
        }
        write!(f, ")")
    }
}
