// Copyright (c) 2023-2024 CMU Database Group
//
// Use of this source code is governed by an MIT-style license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

pub mod defs;
pub mod explain;
pub mod expr_type;
pub mod expr_util;
pub mod nodes;
pub mod rewriter;
pub mod serialize;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod value;

pub use defs::{AnnotatedExpression, ExprMap, ExprSet};
pub use expr_type::{Arity, ExprType};
pub use nodes::{ExprAnnotations, ExprData, ExprNode, WhenClause};
pub use rewriter::{ExprRewriter, RewriterRole};
pub use value::{Value, ValueType};

#[cfg(test)]
pub(crate) mod tests;
