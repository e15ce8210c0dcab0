use frontend::{NodeId, ParseNode, Position, TokenType, rules};

use super::{EvaluationFault, Evaluator, Leaf, Typed};
use crate::ast::{Expr, Operator, UnaryOp};
use crate::diagnostics::DiagnosticKind;
use crate::namespace::{SymbolKind, ValueType};

impl<'a> Evaluator<'a> {
    pub(super) fn expr(&mut self, id: NodeId) -> Result<Typed, EvaluationFault> {
        let node = self.node(id)?;
        if let Some(kind) = node.token {
            return self.atom(id, node, kind);
        }
        match node.label.as_str() {
            rules::OR_EXPR | rules::AND_EXPR | rules::COMP_EXPR | rules::ADD_EXPR | rules::MUL_EXPR => {
                self.binary_chain(id, node)
            }
            rules::UNARY_EXPR => self.unary(id, node),
            // "(" expr ")"
            rules::PRIMARY => self.expr(self.child(node, 1, "parenthesized expression")?),
            rules::CALL_EXPR => self.call(id, true),
            rules::INDEX_EXPR => self.index(id, node),
            _ => Err(self.unexpected(id)),
        }
    }

    fn placeholder(&mut self, position: Option<Position>) -> Typed {
        Typed {
            expr: self.program.add_expr(Expr::Int64(0), position),
            ty: None,
        }
    }

    fn atom(&mut self, id: NodeId, node: &'a ParseNode, kind: TokenType) -> Result<Typed, EvaluationFault> {
        let position = node.position;
        let text = node.label.as_str();
        let (expr, ty) = match kind {
            TokenType::Integer => match text.parse::<i64>() {
                Ok(value) => (Expr::Int64(value), ValueType::Int),
                Err(_) => {
                    self.invalid_literal(text, position);
                    return Ok(self.placeholder(position));
                }
            },
            TokenType::Double => match text.parse::<f64>() {
                Ok(value) => (Expr::Double(value), ValueType::Double),
                Err(_) => {
                    self.invalid_literal(text, position);
                    return Ok(self.placeholder(position));
                }
            },
            TokenType::Bool => (Expr::Bool(text == "true"), ValueType::Bool),
            TokenType::String => {
                let symbol = self.intern(&unescape(text));
                (Expr::String(symbol), ValueType::String)
            }
            TokenType::Identifier => {
                let Some(position) = position else {
                    return Err(self.unexpected(id));
                };
                let name = Leaf { text, position };
                return Ok(match self.resolve(name) {
                    Some((symbol, SymbolKind::Scalar(ty))) => Typed {
                        expr: self.program.add_expr(Expr::Identifier(symbol), Some(position)),
                        ty: Some(ty),
                    },
                    Some(_) => {
                        self.not_a_variable(name);
                        self.placeholder(Some(position))
                    }
                    None => self.placeholder(Some(position)),
                });
            }
            _ => return Err(self.unexpected(id)),
        };
        Ok(Typed {
            expr: self.program.add_expr(expr, position),
            ty: Some(ty),
        })
    }

    fn invalid_literal(&mut self, text: &str, position: Option<Position>) {
        self.error(
            DiagnosticKind::InvalidLiteral {
                text: text.to_string(),
            },
            position,
        );
    }

    // e (op e)*, folded to the left
    fn binary_chain(&mut self, id: NodeId, node: &'a ParseNode) -> Result<Typed, EvaluationFault> {
        let position = self.position(id);
        let mut acc = self.expr(self.child(node, 0, "left operand")?)?;
        for pair in node.children[1..].chunks(2) {
            let [op_id, rhs_id] = pair else {
                return Err(EvaluationFault::MissingChild {
                    label: node.label.clone(),
                    what: "right operand",
                });
            };
            let op_node = self.node(*op_id)?;
            let op = match Operator::from_text(&op_node.label) {
                Some(op) if op_node.token.is_some() => op,
                _ => return Err(self.unexpected(*op_id)),
            };
            let rhs = self.expr(*rhs_id)?;
            let ty = self.check_binary(op, acc, rhs, op_node.position);
            acc = Typed {
                expr: self.program.add_expr(Expr::Binary(op, acc.expr, rhs.expr), position),
                ty,
            };
        }
        Ok(acc)
    }

    fn check_binary(&mut self, op: Operator, lhs: Typed, rhs: Typed, at: Option<Position>) -> Option<ValueType> {
        if op.is_logical() {
            for operand in [lhs, rhs] {
                self.expect_operand(op.symbol(), operand, |ty| ty == ValueType::Bool, at);
            }
            return Some(ValueType::Bool);
        }
        let result = if op.is_comparison() { Some(ValueType::Bool) } else { None };
        let (Some(left), Some(right)) = (lhs.ty, rhs.ty) else {
            return result;
        };
        if left != right {
            let context = if op.is_comparison() { "comparison" } else { "arithmetic" };
            self.error(
                DiagnosticKind::TypeMismatch {
                    context,
                    expected: left,
                    found: right,
                },
                at,
            );
            return result;
        }
        let allowed = match op {
            Operator::EQ | Operator::NE => left != ValueType::String,
            Operator::Rem => left == ValueType::Int,
            _ => left.is_numeric(),
        };
        if !allowed {
            self.error(
                DiagnosticKind::InvalidOperand {
                    operator: op.symbol().to_string(),
                    found: left,
                },
                at,
            );
            return result;
        }
        result.or(Some(left))
    }

    fn expect_operand(&mut self, operator: &str, operand: Typed, allowed: impl Fn(ValueType) -> bool, at: Option<Position>) {
        if let Some(found) = operand.ty
            && !allowed(found)
        {
            self.error(
                DiagnosticKind::InvalidOperand {
                    operator: operator.to_string(),
                    found,
                },
                at,
            );
        }
    }

    // ("-" | "!") operand
    fn unary(&mut self, id: NodeId, node: &'a ParseNode) -> Result<Typed, EvaluationFault> {
        let position = self.position(id);
        let op_id = self.child(node, 0, "operator")?;
        let op_node = self.node(op_id)?;
        let operand = self.expr(self.child(node, 1, "operand")?)?;
        let (op, ty) = match op_node.label.as_str() {
            "-" => {
                self.expect_operand("-", operand, ValueType::is_numeric, op_node.position);
                (UnaryOp::Negate, operand.ty.filter(|ty| ty.is_numeric()))
            }
            "!" => {
                self.expect_operand("!", operand, |ty| ty == ValueType::Bool, op_node.position);
                (UnaryOp::LogicalNot, Some(ValueType::Bool))
            }
            _ => return Err(self.unexpected(op_id)),
        };
        Ok(Typed {
            expr: self.program.add_expr(Expr::Unary(op, operand.expr), position),
            ty,
        })
    }

    // identifier "[" expr "]"
    fn index(&mut self, id: NodeId, node: &'a ParseNode) -> Result<Typed, EvaluationFault> {
        let position = self.position(id);
        let name = self.leaf(node, 0, TokenType::Identifier, "array name")?;
        let resolved = self.resolve(name);
        let key = self.expr(self.child(node, 2, "key")?)?;
        match resolved {
            Some((symbol, SymbolKind::Array { key: key_ty, value })) => {
                self.expect_type(key, key_ty, "array key", key_position(self, node));
                Ok(Typed {
                    expr: self.program.add_expr(Expr::Index(symbol, key.expr), position),
                    ty: Some(value),
                })
            }
            Some(_) => {
                self.error(
                    DiagnosticKind::NotAnArray {
                        name: name.text.to_string(),
                    },
                    Some(name.position),
                );
                Ok(self.placeholder(position))
            }
            None => Ok(self.placeholder(position)),
        }
    }

    // identifier "(" ArgList? ")"
    // ArgList := expr ("," expr)*
    pub(super) fn call(&mut self, id: NodeId, needs_value: bool) -> Result<Typed, EvaluationFault> {
        let node = self.node(id)?;
        if node.label != rules::CALL_EXPR {
            return Err(self.unexpected(id));
        }
        let position = self.position(id);
        let name = self.leaf(node, 0, TokenType::Identifier, "function name")?;
        let resolved = self.resolve(name);

        let mut args = Vec::new();
        if let Some(&list_id) = node.children.get(2) {
            let list = self.node(list_id)?;
            if list.label == rules::ARG_LIST {
                for arg in &list.children {
                    if self.node(*arg)?.is_token(TokenType::Comma) {
                        continue;
                    }
                    args.push((self.expr(*arg)?, self.position(*arg)));
                }
            }
        }

        let (symbol, params, ret) = match resolved {
            Some((symbol, SymbolKind::Function { params, ret })) => (symbol, params, ret),
            Some(_) => {
                self.error(
                    DiagnosticKind::NotCallable {
                        name: name.text.to_string(),
                    },
                    Some(name.position),
                );
                return Ok(self.placeholder(position));
            }
            None => return Ok(self.placeholder(position)),
        };
        if params.len() != args.len() {
            self.error(
                DiagnosticKind::ArityMismatch {
                    name: name.text.to_string(),
                    expected: params.len(),
                    found: args.len(),
                },
                Some(name.position),
            );
        } else {
            for ((arg, at), expected) in args.iter().zip(&params) {
                self.expect_type(*arg, *expected, "argument", *at);
            }
        }
        if needs_value && ret.is_none() {
            self.error(
                DiagnosticKind::VoidValue {
                    name: name.text.to_string(),
                },
                Some(name.position),
            );
        }
        let args = args.into_iter().map(|(arg, _)| arg.expr).collect();
        Ok(Typed {
            expr: self.program.add_expr(Expr::Call(symbol, args), position),
            ty: ret,
        })
    }
}

fn key_position(evaluator: &Evaluator<'_>, index: &ParseNode) -> Option<Position> {
    index.children.get(2).and_then(|key| evaluator.position(*key))
}

/// Strips the quotes of a string token and resolves its escapes.
pub(crate) fn unescape(text: &str) -> String {
    let inner = text
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(text);
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::unescape;
    use rstest::rstest;

    #[rstest]
    #[case("\"plain\"", "plain")]
    #[case("\"a\\nb\"", "a\nb")]
    #[case("\"say \\\"hi\\\"\"", "say \"hi\"")]
    #[case("\"back\\\\slash\"", "back\\slash")]
    fn unescape_cases(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(unescape(input), expected);
    }
}
