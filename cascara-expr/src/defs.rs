// Copyright (c) 2023-2024 CMU Database Group
//
// Use of this source code is governed by an MIT-style license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::expr_util::generate_table_alias_set;
use crate::nodes::ExprNode;

/// Maps an expression produced by an input to its offset in that input's output.
pub type ExprMap = HashMap<ExprNode, usize>;

pub type ExprSet = HashSet<ExprNode>;

/// An expression together with the tables it references.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AnnotatedExpression {
    expr: ExprNode,
    table_alias_set: BTreeSet<String>,
}

impl AnnotatedExpression {
    pub fn new(expr: ExprNode) -> Self {
        let mut table_alias_set = BTreeSet::new();
        generate_table_alias_set(&expr, &mut table_alias_set);
        Self {
            expr,
            table_alias_set,
        }
    }

    pub fn expr(&self) -> &ExprNode {
        &self.expr
    }

    pub fn table_alias_set(&self) -> &BTreeSet<String> {
        &self.table_alias_set
    }
}
