// Copyright (c) 2023-2024 CMU Database Group
//
// Use of this source code is governed by an MIT-style license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use pretty_xmlish::{Pretty, PrettyConfig};

use crate::nodes::{ExprData, ExprNode};

impl ExprNode {
    pub fn explain(&self) -> Pretty<'static> {
        let mut fields: Vec<(&'static str, Pretty<'static>)> = vec![];
        if !self.alias.is_empty() {
            fields.push(("alias", self.alias.clone().into()));
        }
        match &self.data {
            ExprData::None => {}
            ExprData::Constant(value) => return Pretty::display(value),
            ExprData::Parameter { .. } | ExprData::Column { .. } | ExprData::DerivedValue { .. } => {
                return Pretty::display(self)
            }
            ExprData::Function { func_name } => fields.push(("name", func_name.clone().into())),
            ExprData::Aggregate { distinct } => {
                if *distinct {
                    fields.push(("distinct", "true".into()));
                }
            }
            ExprData::Case {
                when_clauses,
                default_clause,
            } => {
                let mut children = when_clauses
                    .iter()
                    .map(|clause| {
                        Pretty::simple_record(
                            "When",
                            vec![],
                            vec![clause.condition.explain(), clause.then.explain()],
                        )
                    })
                    .collect::<Vec<_>>();
                if let Some(default_clause) = default_clause {
                    children.push(Pretty::simple_record(
                        "Else",
                        vec![],
                        vec![default_clause.explain()],
                    ));
                }
                return Pretty::simple_record("Case", fields, children);
            }
        }
        fields.push(("type", self.return_value_type().to_string().into()));
        Pretty::simple_record(
            self.typ.to_string(),
            fields,
            self.children.iter().map(|child| child.explain()).collect(),
        )
    }

    pub fn explain_to_string(&self) -> String {
        explain_to_string(&self.explain())
    }
}

/// Renders an explain tree the way every plan and expression dump is printed.
pub fn explain_to_string(pretty: &Pretty<'_>) -> String {
    let mut config = PrettyConfig {
        need_boundaries: false,
        reduced_spaces: false,
        width: 300,
        ..Default::default()
    };
    let mut out = String::new();
    config.unicode(&mut out, pretty);
    out
}

#[cfg(test)]
mod tests {
    use crate::expr_type::ExprType;
    use crate::nodes::{ExprNode, WhenClause};
    use crate::tests::common::{add, cmp, col, int, sum};
    use crate::value::ValueType;

    #[test]
    fn explain_nested_expression() {
        let expr = cmp(
            ExprType::CompareGreaterThan,
            add(sum(col("t1", "a")), int(1)),
            col("t2", "b"),
        );
        let out = expr.explain_to_string();
        assert!(out.contains("CompareGreaterThan"));
        assert!(out.contains("AggregateSum"));
        assert!(out.contains("t1.a"));
        assert!(out.contains("t2.b"));
    }

    #[test]
    fn explain_case() {
        let expr = ExprNode::case(
            ValueType::Integer,
            vec![WhenClause::new(
                cmp(ExprType::CompareEqual, col("t1", "a"), int(1)),
                int(2),
            )],
            Some(int(3)),
        );
        let out = expr.explain_to_string();
        assert!(out.contains("Case"));
        assert!(out.contains("When"));
        assert!(out.contains("Else"));
    }
}
