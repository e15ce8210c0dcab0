use frontend::{NodeId, ParseNode, TokenType, rules};

use super::{EvaluationFault, Evaluator, FunctionContext, Leaf};
use crate::ast::{FunctionDecl, Stmt, StmtRef};
use crate::diagnostics::DiagnosticKind;
use crate::namespace::{ScopeKind, SymbolKind, ValueType};

impl<'a> Evaluator<'a> {
    pub(super) fn statement(&mut self, id: NodeId) -> Result<StmtRef, EvaluationFault> {
        let node = self.node(id)?;
        match node.label.as_str() {
            rules::VAR_DECL => self.var_decl(id, node),
            rules::ARRAY_DECL => self.array_decl(id, node),
            rules::ASSIGNMENT => self.assignment(id, node),
            rules::IF_STATEMENT => self.if_statement(id, node),
            rules::WHILE_STATEMENT => {
                let position = self.position(id);
                let cond = self.expr(self.child(node, 2, "condition")?)?;
                self.expect_type(cond, ValueType::Bool, "while condition", position);
                let body = self.block(self.child(node, 4, "body")?, ScopeKind::While)?;
                Ok(self.program.add_stmt(Stmt::While(cond.expr, body), position))
            }
            rules::RETURN_STATEMENT => self.return_statement(id, node),
            rules::PRINT_STATEMENT => {
                let value = self.expr(self.child(node, 2, "value")?)?;
                Ok(self.program.add_stmt(Stmt::Print(value.expr), self.position(id)))
            }
            rules::CALL_STATEMENT => {
                let call = self.call(self.child(node, 0, "call")?, false)?;
                Ok(self.program.add_stmt(Stmt::Expression(call.expr), self.position(id)))
            }
            rules::BLOCK => self.block(id, ScopeKind::Block),
            rules::FUNC_DECL => {
                let name = self.leaf(node, 1, TokenType::Identifier, "name")?;
                self.error(
                    DiagnosticKind::MisplacedFunction {
                        name: name.text.to_string(),
                    },
                    Some(name.position),
                );
                self.function_decl(id)
            }
            _ => Err(self.unexpected(id)),
        }
    }

    // VarDecl := type identifier ("=" expr)? ";"
    fn var_decl(&mut self, id: NodeId, node: &'a ParseNode) -> Result<StmtRef, EvaluationFault> {
        let position = self.position(id);
        let (ty, _) = self.type_leaf(node, 0)?;
        let name = self.leaf(node, 1, TokenType::Identifier, "name")?;
        // The initializer is evaluated before the name is in scope.
        let init = if node.children.len() > 3 {
            let value = self.expr(self.child(node, 3, "initializer")?)?;
            self.expect_type(value, ty, "initialization", Some(name.position));
            Some(value.expr)
        } else {
            None
        };
        let symbol = self.declare(name, SymbolKind::Scalar(ty))?;
        Ok(self.program.add_stmt(Stmt::VarDecl(symbol, init), position))
    }

    // ArrayDecl := ArrayType identifier ";"
    // ArrayType := type "[" type "]"
    fn array_decl(&mut self, id: NodeId, node: &'a ParseNode) -> Result<StmtRef, EvaluationFault> {
        let position = self.position(id);
        let array_type = self.node(self.child(node, 0, "array type")?)?;
        let (value, _) = self.type_leaf(array_type, 0)?;
        let (key, key_position) = self.type_leaf(array_type, 2)?;
        if !key.is_array_key() {
            self.error(DiagnosticKind::UnsupportedArrayKey { found: key }, Some(key_position));
        }
        let name = self.leaf(node, 1, TokenType::Identifier, "name")?;
        let symbol = self.declare(name, SymbolKind::Array { key, value })?;
        Ok(self.program.add_stmt(Stmt::ArrayDecl(symbol), position))
    }

    // Assignment := (identifier | IndexExpr) "=" expr ";"
    fn assignment(&mut self, id: NodeId, node: &'a ParseNode) -> Result<StmtRef, EvaluationFault> {
        let position = self.position(id);
        let target_id = self.child(node, 0, "target")?;
        let target = self.node(target_id)?;
        let stmt = if target.label == rules::INDEX_EXPR {
            let name = self.leaf(target, 0, TokenType::Identifier, "array name")?;
            let resolved = self.resolve(name);
            let key = self.expr(self.child(target, 2, "key")?)?;
            let value = self.expr(self.child(node, 2, "value")?)?;
            match resolved {
                Some((symbol, SymbolKind::Array { key: key_ty, value: value_ty })) => {
                    self.expect_type(key, key_ty, "array key", self.position(target_id));
                    self.expect_type(value, value_ty, "assignment", position);
                    Stmt::IndexAssign(symbol, key.expr, value.expr)
                }
                Some(_) => {
                    self.error(
                        DiagnosticKind::NotAnArray {
                            name: name.text.to_string(),
                        },
                        Some(name.position),
                    );
                    Stmt::Nop
                }
                None => Stmt::Nop,
            }
        } else {
            let name = self.leaf(node, 0, TokenType::Identifier, "target")?;
            let resolved = self.resolve(name);
            let value = self.expr(self.child(node, 2, "value")?)?;
            match resolved {
                Some((symbol, SymbolKind::Scalar(ty))) => {
                    self.expect_type(value, ty, "assignment", position);
                    Stmt::Assign(symbol, value.expr)
                }
                Some(_) => {
                    self.not_a_variable(name);
                    Stmt::Nop
                }
                None => Stmt::Nop,
            }
        };
        Ok(self.program.add_stmt(stmt, position))
    }

    // IfStatement := "if" "(" expr ")" Block ("else" (Block | IfStatement))?
    fn if_statement(&mut self, id: NodeId, node: &'a ParseNode) -> Result<StmtRef, EvaluationFault> {
        let position = self.position(id);
        let cond = self.expr(self.child(node, 2, "condition")?)?;
        self.expect_type(cond, ValueType::Bool, "if condition", position);
        let then = self.block(self.child(node, 4, "then branch")?, ScopeKind::If)?;
        let otherwise = match node.children.get(6) {
            None => None,
            Some(&else_id) => {
                let else_node = self.node(else_id)?;
                if else_node.label == rules::BLOCK {
                    Some(self.block(else_id, ScopeKind::Else)?)
                } else if else_node.label == rules::IF_STATEMENT {
                    Some(self.if_statement(else_id, else_node)?)
                } else {
                    return Err(self.unexpected(else_id));
                }
            }
        };
        Ok(self.program.add_stmt(Stmt::If(cond.expr, then, otherwise), position))
    }

    // ReturnStatement := "return" expr? ";"
    fn return_statement(&mut self, id: NodeId, node: &'a ParseNode) -> Result<StmtRef, EvaluationFault> {
        let position = self.position(id);
        let value = if node.children.len() > 2 {
            Some(self.expr(self.child(node, 1, "value")?)?)
        } else {
            None
        };
        match (self.function, value) {
            (None, _) => self.error(DiagnosticKind::ReturnOutsideFunction, position),
            (Some(FunctionContext { ret: Some(expected) }), Some(value)) => {
                self.expect_type(value, expected, "return", position)
            }
            (Some(FunctionContext { ret: Some(expected) }), None) => {
                self.error(DiagnosticKind::MissingReturnValue { expected }, position)
            }
            (Some(FunctionContext { ret: None }), Some(_)) => {
                self.error(DiagnosticKind::UnexpectedReturnValue, position)
            }
            (Some(FunctionContext { ret: None }), None) => (),
        }
        Ok(self.program.add_stmt(Stmt::Return(value.map(|v| v.expr)), position))
    }

    /// A block opens its own namespace.
    pub(super) fn block(&mut self, id: NodeId, kind: ScopeKind) -> Result<StmtRef, EvaluationFault> {
        let node = self.node(id)?;
        if node.label != rules::BLOCK {
            return Err(self.unexpected(id));
        }
        let position = self.position(id);
        let (scope, body) = self.with_scope(kind.default_name(), kind, position, |this| this.block_statements(node))?;
        Ok(self.program.add_stmt(Stmt::Block(scope, body), position))
    }

    // Block := "{" statement* "}"
    fn block_statements(&mut self, block: &'a ParseNode) -> Result<Vec<StmtRef>, EvaluationFault> {
        let mut body = Vec::with_capacity(block.children.len());
        for child in &block.children {
            let node = self.node(*child)?;
            if node.is_token(TokenType::BraceOpen) || node.is_token(TokenType::BraceClose) {
                continue;
            }
            body.push(self.statement(*child)?);
        }
        Ok(body)
    }

    // FuncDecl := "func" identifier "(" ParamList? ")" (":" type)? Block
    // The function is declared before its body is walked, so it can call
    // itself.
    pub(super) fn function_decl(&mut self, id: NodeId) -> Result<StmtRef, EvaluationFault> {
        let node = self.node(id)?;
        let position = self.position(id);
        let name = self.leaf(node, 1, TokenType::Identifier, "name")?;

        let mut params: Vec<(Leaf<'a>, ValueType)> = Vec::new();
        let mut ret = None;
        let mut body_id = None;
        for (index, child) in node.children.iter().enumerate().skip(2) {
            let child_node = self.node(*child)?;
            if child_node.label == rules::PARAM_LIST {
                params = self.parameters(child_node)?;
            } else if child_node.is_token(TokenType::Type) {
                ret = Some(self.type_leaf(node, index)?.0);
            } else if child_node.label == rules::BLOCK {
                body_id = Some(*child);
            }
        }
        let body_id = body_id.ok_or_else(|| EvaluationFault::MissingChild {
            label: node.label.clone(),
            what: "body",
        })?;
        let body_node = self.node(body_id)?;

        let signature = SymbolKind::Function {
            params: params.iter().map(|(_, ty)| *ty).collect(),
            ret,
        };
        let symbol = self.declare(name, signature)?;

        let enclosing = self.function.replace(FunctionContext { ret });
        let scoped = self.with_scope(name.text, ScopeKind::Function, position, |this| {
            let mut declared = Vec::with_capacity(params.len());
            for (param, ty) in &params {
                declared.push(this.declare(*param, SymbolKind::Scalar(*ty))?);
            }
            let body = this.block_statements(body_node)?;
            Ok((declared, body))
        });
        self.function = enclosing;
        let (scope, (params, body)) = scoped?;

        let body = self.program.add_stmt(Stmt::Block(scope, body), self.position(body_id));
        let decl = FunctionDecl {
            symbol,
            scope,
            params,
            ret,
            body,
        };
        Ok(self.program.add_stmt(Stmt::Function(decl), position))
    }

    // ParamList := Param ("," Param)*
    // Param := identifier ":" type
    fn parameters(&self, list: &'a ParseNode) -> Result<Vec<(Leaf<'a>, ValueType)>, EvaluationFault> {
        let mut params = Vec::new();
        for child in &list.children {
            let param = self.node(*child)?;
            if param.is_token(TokenType::Comma) {
                continue;
            }
            if param.label != rules::PARAM {
                return Err(self.unexpected(*child));
            }
            let name = self.leaf(param, 0, TokenType::Identifier, "parameter name")?;
            let (ty, _) = self.type_leaf(param, 2)?;
            params.push((name, ty));
        }
        Ok(params)
    }

    pub(super) fn not_a_variable(&mut self, name: Leaf<'_>) {
        self.error(
            DiagnosticKind::NotAVariable {
                name: name.text.to_string(),
            },
            Some(name.position),
        );
    }
}
