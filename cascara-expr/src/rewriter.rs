// Copyright (c) 2023-2024 CMU Database Group
//
// Use of this source code is governed by an MIT-style license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Restricted structural mutation of expression trees.
//!
//! Expression trees are immutable once built. The binder and the query-to-operator
//! transformer are the only stages that splice resolved sub-trees into an existing tree, and
//! they do so through an [`ExprRewriter`] they construct for their role.

use std::fmt::Display;

use tracing::trace;

use crate::nodes::{check_arity, ExprNode};
use crate::value::ValueType;

/// The stages allowed to mutate expression structure.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RewriterRole {
    Binder,
    QueryToOperatorTransformer,
}

impl Display for RewriterRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Binder => write!(f, "binder"),
            Self::QueryToOperatorTransformer => write!(f, "query_to_operator"),
        }
    }
}

/// Capability handle for in-place structural edits.
pub struct ExprRewriter {
    role: RewriterRole,
}

impl ExprRewriter {
    pub fn new(role: RewriterRole) -> Self {
        Self { role }
    }

    /// Replaces child `index` of `expr` with a deep copy of `child`. An index equal to the
    /// current child count appends. Panics on any larger index or if the resulting child count
    /// does not fit the node type.
    ///
    /// Annotations are not re-derived; run the `derive_*` passes afterwards.
    pub fn set_child(&self, expr: &mut ExprNode, index: usize, child: &ExprNode) {
        let len = expr.children.len();
        assert!(
            index <= len,
            "cannot set child {} of an expression with {} children",
            index,
            len
        );
        let new_len = if index == len { len + 1 } else { len };
        check_arity(expr.typ, new_len);
        trace!(
            event = "set_child",
            role = %self.role,
            expr = %expr,
            index = index,
            child = %child
        );
        if index == len {
            expr.children.push(child.copy());
        } else {
            expr.children[index] = child.copy();
        }
    }

    pub fn set_depth(&self, expr: &mut ExprNode, depth: i32) {
        expr.annotations.depth = depth;
    }

    pub fn set_return_value_type(&self, expr: &mut ExprNode, return_value_type: ValueType) {
        expr.annotations.return_value_type = return_value_type;
    }
}
