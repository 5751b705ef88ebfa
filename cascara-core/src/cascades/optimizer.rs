// Copyright (c) 2023-2024 CMU Database Group
//
// Use of this source code is governed by an MIT-style license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use std::fmt::Display;

use anyhow::{Context, Result};
use cascara_expr::expr_util::{evaluate_expression, try_evaluate_expression};
use cascara_expr::{ExprMap, ExprNode};
use tracing::trace;

use super::memo::Memo;
use crate::property::PropertySet;
use crate::property_enforcer::PropertyEnforcer;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash)]
pub struct GroupId(pub(crate) usize);

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash)]
pub struct ExprId(pub(crate) usize);

impl Display for GroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "!{}", self.0)
    }
}

impl Display for ExprId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Default, Clone, Debug)]
pub struct OptimizerProperties {
    /// Fail binding when a column reference is not produced by any input, instead of leaving it
    /// unbound with a warning.
    pub strict_column_binding: bool,
    /// Never add enforcers; a missing property is reported as unmet.
    pub disable_enforcers: bool,
}

/// State of one optimization pass.
pub struct OptimizerContext {
    memo: Memo,
    enforcer: PropertyEnforcer,
    pub prop: OptimizerProperties,
}

impl OptimizerContext {
    pub fn new(prop: OptimizerProperties) -> Self {
        Self {
            memo: Memo::new(),
            enforcer: PropertyEnforcer::new(),
            prop,
        }
    }

    pub fn memo(&self) -> &Memo {
        &self.memo
    }

    pub fn memo_mut(&mut self) -> &mut Memo {
        &mut self.memo
    }

    /// Binds the column references of `expr` to the outputs described by `expr_maps`.
    pub fn evaluate_expression(&self, expr_maps: &[ExprMap], expr: &ExprNode) -> Result<ExprNode> {
        if self.prop.strict_column_binding {
            try_evaluate_expression(expr_maps, expr)
        } else {
            Ok(evaluate_expression(expr_maps, expr))
        }
    }

    /// Adds enforcers for every property in `required` that `output_props` (the properties
    /// expression `expr_id` provides) does not satisfy.
    ///
    /// Each enforcer is memoized into the group of `expr_id` as an enforced expression. Returns
    /// the last enforcer added, if any, together with the properties provided once all of them
    /// are applied. Returns `None` if a property is missing and enforcers are disabled.
    pub fn enforce_missing_properties(
        &mut self,
        expr_id: ExprId,
        output_props: &PropertySet,
        required: &PropertySet,
    ) -> Result<Option<(Option<ExprId>, PropertySet)>> {
        let mut provided = output_props.clone();
        let mut input_id = expr_id;
        let mut last_enforcer = None;
        for property in required.properties() {
            if provided.has_property(property) {
                continue;
            }
            if self.prop.disable_enforcers {
                trace!(event = "property_unmet", expr_id = %expr_id, property = %property);
                return Ok(None);
            }
            let input = self
                .memo
                .get_expr(input_id)
                .with_context(|| format!("cannot enforce {} on expr {}", property, input_id))?;
            let group_id = self.memo.get_group_id(input_id)?;
            let enforcer = self.enforcer.enforce_property(input, property);
            let enforcer_id = self
                .memo
                .insert_expression(enforcer, Some(group_id), true)?;
            trace!(event = "add_enforcer", group_id = %group_id, expr_id = %enforcer_id, property = %property);
            provided.add_property(property.clone());
            input_id = enforcer_id;
            last_enforcer = Some(enforcer_id);
        }
        Ok(Some((last_enforcer, provided)))
    }
}
