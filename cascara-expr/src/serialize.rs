// Copyright (c) 2023-2024 CMU Database Group
//
// Use of this source code is governed by an MIT-style license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! JSON form of expression trees.

use anyhow::{bail, Context, Result};

use crate::nodes::ExprNode;

impl ExprNode {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).with_context(|| format!("failed to serialize {}", self))
    }

    pub fn to_json_value(&self) -> Result<serde_json::Value> {
        serde_json::to_value(self).with_context(|| format!("failed to serialize {}", self))
    }

    /// Parses an expression tree and checks that every node has a valid shape.
    pub fn from_json(json: &str) -> Result<ExprNode> {
        let expr: ExprNode =
            serde_json::from_str(json).context("failed to deserialize expression")?;
        expr.validate()?;
        Ok(expr)
    }

    pub fn from_json_value(json: serde_json::Value) -> Result<ExprNode> {
        let expr: ExprNode =
            serde_json::from_value(json).context("failed to deserialize expression")?;
        expr.validate()?;
        Ok(expr)
    }

    fn validate(&self) -> Result<()> {
        let arity = self.typ.arity();
        if !arity.accepts(self.children.len()) {
            bail!(
                "{} expects {} children, got {}",
                self.typ,
                arity,
                self.children.len()
            );
        }
        if !self.data.matches(self.typ) {
            bail!("payload {:?} does not belong to {}", self.data, self.typ);
        }
        for operand in self.operands() {
            operand
                .validate()
                .with_context(|| format!("invalid operand of {}", self.typ))?;
        }
        Ok(())
    }
}
