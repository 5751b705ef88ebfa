// Copyright (c) 2023-2024 CMU Database Group
//
// Use of this source code is governed by an MIT-style license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! The cascades search substrate: group expressions, the memo table and the optimizer context
//! a search driver runs against.

mod group_expr;
mod memo;
mod optimizer;

pub use group_expr::GroupExpression;
pub use memo::{Group, Memo};
pub use optimizer::{ExprId, GroupId, OptimizerContext, OptimizerProperties};
