use std::collections::{HashMap, HashSet};

use compiler_core::{
    CodeGenError, Expr, ExprRef, FunctionDecl, NamespaceGraph, NamespaceId, Operator, Program, Stmt, StmtRef,
    SymbolKind, SymbolRef, UnaryOp, ValueType,
};
use cranelift_codegen::ir::condcodes::{FloatCC, IntCC};
use cranelift_codegen::ir::{FuncRef, GlobalValue, InstBuilder, MemFlags, StackSlot, StackSlotData, StackSlotKind, Type, Value, types};
use cranelift_frontend::FunctionBuilder;
use cranelift_module::{DataId, FuncId, Module};
use cranelift_object::ObjectModule;

use super::{Declarations, value_type};
use crate::runtime::RuntimeFunction;

pub(crate) enum FunctionKind<'p> {
    /// Top-level statements, in order, wrapped in the exported `main`.
    Main(Vec<StmtRef>),
    User(&'p FunctionDecl),
}

#[derive(Debug, Clone, Copy)]
enum Storage {
    Static(DataId),
    Stack(StackSlot),
    Register(Value),
}

pub(crate) struct FunctionTranslator<'a> {
    builder: FunctionBuilder<'a>,
    module: &'a mut ObjectModule,
    decls: &'a mut Declarations,
    program: &'a Program,
    namespaces: &'a NamespaceGraph,
    pointer: Type,
    locals: HashMap<SymbolRef, Storage>,
    func_refs: HashMap<FuncId, FuncRef>,
    data_refs: HashMap<DataId, GlobalValue>,
    /// `None` for `main` and for functions without a return type.
    ret: Option<ValueType>,
    is_main: bool,
}

impl<'a> FunctionTranslator<'a> {
    pub fn new(
        builder: FunctionBuilder<'a>,
        module: &'a mut ObjectModule,
        decls: &'a mut Declarations,
        program: &'a Program,
        namespaces: &'a NamespaceGraph,
    ) -> Self {
        let pointer = module.target_config().pointer_type();
        FunctionTranslator {
            builder,
            module,
            decls,
            program,
            namespaces,
            pointer,
            locals: HashMap::new(),
            func_refs: HashMap::new(),
            data_refs: HashMap::new(),
            ret: None,
            is_main: false,
        }
    }

    pub fn translate(mut self, kind: FunctionKind<'_>) -> Result<(), CodeGenError> {
        let entry = self.builder.create_block();
        self.builder.append_block_params_for_function_params(entry);
        self.builder.switch_to_block(entry);

        match kind {
            FunctionKind::Main(body) => {
                self.is_main = true;
                self.allocate_root_arrays()?;
                for stmt in body {
                    self.stmt(stmt)?;
                }
            }
            FunctionKind::User(decl) => {
                self.ret = decl.ret;
                let incoming = self.builder.block_params(entry).to_vec();
                let mut assigned = HashSet::new();
                collect_assigned(self.program, decl.body, &mut assigned);
                for (param, value) in decl.params.iter().zip(incoming) {
                    let storage = if assigned.contains(param) {
                        let slot = self.new_slot();
                        self.builder.ins().stack_store(value, slot, 0);
                        Storage::Stack(slot)
                    } else {
                        Storage::Register(value)
                    };
                    self.locals.insert(*param, storage);
                }
                self.stmt(decl.body)?;
            }
        }

        self.fallthrough_return()?;
        self.builder.seal_all_blocks();
        self.builder.finalize();
        Ok(())
    }

    fn allocate_root_arrays(&mut self) -> Result<(), CodeGenError> {
        let arrays: Vec<SymbolRef> = self
            .namespaces
            .root()
            .symbols
            .iter()
            .enumerate()
            .filter(|(_, symbol)| matches!(symbol.kind, SymbolKind::Array { .. }))
            .map(|(index, _)| SymbolRef {
                namespace: NamespaceId::ROOT,
                index: index as u32,
            })
            .collect();
        for array in arrays {
            let handle = self.new_array()?;
            self.store(array, handle)?;
        }
        Ok(())
    }

    fn fallthrough_return(&mut self) -> Result<(), CodeGenError> {
        if self.is_main {
            let status = self.builder.ins().iconst(types::I32, 0);
            self.builder.ins().return_(&[status]);
            return Ok(());
        }
        match self.ret {
            Some(ty) => {
                let zero = self.zero(ty)?;
                self.builder.ins().return_(&[zero]);
            }
            None => {
                self.builder.ins().return_(&[]);
            }
        }
        Ok(())
    }

    fn new_slot(&mut self) -> StackSlot {
        self.builder
            .create_sized_stack_slot(StackSlotData::new(StackSlotKind::ExplicitSlot, 8, 3))
    }

    // ----- statements -----

    fn stmt(&mut self, r: StmtRef) -> Result<(), CodeGenError> {
        let program = self.program;
        let stmt = program
            .stmt(r)
            .ok_or_else(|| CodeGenError::Internal(format!("dangling statement {r:?}")))?;
        match stmt {
            Stmt::VarDecl(symbol, init) => {
                let value = match init {
                    Some(e) => self.expr(*e)?,
                    None => {
                        let ty = self.scalar_type(*symbol)?;
                        self.zero(ty)?
                    }
                };
                self.store(*symbol, value)
            }
            // Root arrays are allocated once by `main`.
            Stmt::ArrayDecl(symbol) if symbol.namespace == NamespaceId::ROOT => Ok(()),
            Stmt::ArrayDecl(symbol) => {
                let handle = self.new_array()?;
                self.store(*symbol, handle)
            }
            Stmt::Assign(symbol, value) => {
                let value = self.expr(*value)?;
                self.store(*symbol, value)
            }
            Stmt::IndexAssign(symbol, key, value) => {
                let (key_ty, value_ty) = self.array_types(*symbol)?;
                let handle = self.load(*symbol)?;
                let key = self.expr(*key)?;
                let key = self.to_bits(key, key_ty);
                let value = self.expr(*value)?;
                let value = self.to_bits(value, value_ty);
                self.call_runtime(RuntimeFunction::ArraySet, &[handle, key, value])?;
                Ok(())
            }
            Stmt::If(cond, then, otherwise) => self.if_statement(*cond, *then, *otherwise),
            Stmt::While(cond, body) => self.while_statement(*cond, *body),
            Stmt::Block(_, statements) => {
                for s in statements {
                    self.stmt(*s)?;
                }
                Ok(())
            }
            Stmt::Return(value) => self.return_statement(*value),
            Stmt::Print(value) => self.print(*value),
            Stmt::Expression(e) => {
                self.expr_any(*e)?;
                Ok(())
            }
            Stmt::Function(_) => Err(CodeGenError::Internal("nested function reached code generation".to_string())),
            Stmt::Nop => Ok(()),
        }
    }

    fn if_statement(&mut self, cond: ExprRef, then: StmtRef, otherwise: Option<StmtRef>) -> Result<(), CodeGenError> {
        let cond = self.expr(cond)?;
        let then_block = self.builder.create_block();
        let merge_block = self.builder.create_block();
        let else_block = match otherwise {
            Some(_) => self.builder.create_block(),
            None => merge_block,
        };
        self.builder.ins().brif(cond, then_block, &[], else_block, &[]);

        self.builder.switch_to_block(then_block);
        self.stmt(then)?;
        self.builder.ins().jump(merge_block, &[]);

        if let Some(otherwise) = otherwise {
            self.builder.switch_to_block(else_block);
            self.stmt(otherwise)?;
            self.builder.ins().jump(merge_block, &[]);
        }

        self.builder.switch_to_block(merge_block);
        Ok(())
    }

    fn while_statement(&mut self, cond: ExprRef, body: StmtRef) -> Result<(), CodeGenError> {
        let header = self.builder.create_block();
        let body_block = self.builder.create_block();
        let exit = self.builder.create_block();
        self.builder.ins().jump(header, &[]);

        self.builder.switch_to_block(header);
        let cond = self.expr(cond)?;
        self.builder.ins().brif(cond, body_block, &[], exit, &[]);

        self.builder.switch_to_block(body_block);
        self.stmt(body)?;
        self.builder.ins().jump(header, &[]);

        self.builder.switch_to_block(exit);
        Ok(())
    }

    fn return_statement(&mut self, value: Option<ExprRef>) -> Result<(), CodeGenError> {
        if self.is_main {
            return Err(CodeGenError::Internal("return outside of a function".to_string()));
        }
        let value = match (value, self.ret) {
            (Some(e), _) => Some(self.expr(e)?),
            (None, Some(ty)) => Some(self.zero(ty)?),
            (None, None) => None,
        };
        match value {
            Some(v) => self.builder.ins().return_(&[v]),
            None => self.builder.ins().return_(&[]),
        };
        // Anything after a return is unreachable but still needs a block.
        let dead = self.builder.create_block();
        self.builder.switch_to_block(dead);
        Ok(())
    }

    fn print(&mut self, value: ExprRef) -> Result<(), CodeGenError> {
        let ty = self.type_of(value)?;
        let v = self.expr(value)?;
        match ty {
            ValueType::Int => self.call_runtime(RuntimeFunction::PrintInt, &[v])?,
            ValueType::Double => self.call_runtime(RuntimeFunction::PrintDouble, &[v])?,
            ValueType::Bool => {
                let widened = self.builder.ins().uextend(types::I32, v);
                self.call_runtime(RuntimeFunction::PrintBool, &[widened])?
            }
            ValueType::String => self.call_runtime(RuntimeFunction::PrintStr, &[v])?,
        };
        Ok(())
    }

    // ----- expressions -----

    /// Lowers an expression that must produce a value.
    fn expr(&mut self, r: ExprRef) -> Result<Value, CodeGenError> {
        self.expr_any(r)?
            .ok_or_else(|| CodeGenError::Internal(format!("expression {r:?} has no value")))
    }

    /// Lowers an expression; calls to functions without a return type
    /// produce nothing.
    fn expr_any(&mut self, r: ExprRef) -> Result<Option<Value>, CodeGenError> {
        let program = self.program;
        let expr = program
            .expr(r)
            .ok_or_else(|| CodeGenError::Internal(format!("dangling expression {r:?}")))?;
        let value = match expr {
            Expr::Int64(v) => self.builder.ins().iconst(types::I64, *v),
            Expr::Double(v) => self.builder.ins().f64const(*v),
            Expr::Bool(v) => self.builder.ins().iconst(types::I8, i64::from(*v)),
            Expr::String(text) => {
                let data = self.decls.string(self.module, program, *text)?;
                self.data_address(data)
            }
            Expr::Identifier(symbol) => self.load(*symbol)?,
            Expr::Index(symbol, key) => {
                let (key_ty, value_ty) = self.array_types(*symbol)?;
                let handle = self.load(*symbol)?;
                let key = self.expr(*key)?;
                let key = self.to_bits(key, key_ty);
                let bits = self
                    .call_runtime(RuntimeFunction::ArrayGet, &[handle, key])?
                    .ok_or_else(|| CodeGenError::Internal("array lookup returned nothing".to_string()))?;
                self.from_bits(bits, value_ty)
            }
            Expr::Call(symbol, args) => return self.call(*symbol, args),
            Expr::Unary(op, operand) => {
                let v = self.expr(*operand)?;
                match (op, self.type_of(*operand)?) {
                    (UnaryOp::Negate, ValueType::Double) => self.builder.ins().fneg(v),
                    (UnaryOp::Negate, _) => self.builder.ins().ineg(v),
                    (UnaryOp::LogicalNot, _) => self.builder.ins().bxor_imm(v, 1),
                }
            }
            Expr::Binary(op, lhs, rhs) if op.is_logical() => self.short_circuit(*op, *lhs, *rhs)?,
            Expr::Binary(op, lhs, rhs) => self.binary(*op, *lhs, *rhs)?,
        };
        Ok(Some(value))
    }

    fn binary(&mut self, op: Operator, lhs: ExprRef, rhs: ExprRef) -> Result<Value, CodeGenError> {
        let ty = self.type_of(lhs)?;
        let a = self.expr(lhs)?;
        let b = self.expr(rhs)?;
        let ins = self.builder.ins();
        let value = if ty == ValueType::Double {
            match op {
                Operator::Add => ins.fadd(a, b),
                Operator::Sub => ins.fsub(a, b),
                Operator::Mul => ins.fmul(a, b),
                Operator::Div => ins.fdiv(a, b),
                _ => {
                    let cc = float_cc(op).ok_or_else(|| unsupported(op, ty))?;
                    ins.fcmp(cc, a, b)
                }
            }
        } else {
            match op {
                Operator::Add => ins.iadd(a, b),
                Operator::Sub => ins.isub(a, b),
                Operator::Mul => ins.imul(a, b),
                Operator::Div => ins.sdiv(a, b),
                Operator::Rem => ins.srem(a, b),
                _ => {
                    let cc = int_cc(op).ok_or_else(|| unsupported(op, ty))?;
                    ins.icmp(cc, a, b)
                }
            }
        };
        Ok(value)
    }

    /// `&&` and `||` evaluate the right operand only when the left one does
    /// not decide the result.
    fn short_circuit(&mut self, op: Operator, lhs: ExprRef, rhs: ExprRef) -> Result<Value, CodeGenError> {
        let result = self
            .builder
            .create_sized_stack_slot(StackSlotData::new(StackSlotKind::ExplicitSlot, 1, 0));
        let left = self.expr(lhs)?;
        self.builder.ins().stack_store(left, result, 0);

        let rhs_block = self.builder.create_block();
        let done = self.builder.create_block();
        match op {
            Operator::LogicalAnd => self.builder.ins().brif(left, rhs_block, &[], done, &[]),
            _ => self.builder.ins().brif(left, done, &[], rhs_block, &[]),
        };

        self.builder.switch_to_block(rhs_block);
        let right = self.expr(rhs)?;
        self.builder.ins().stack_store(right, result, 0);
        self.builder.ins().jump(done, &[]);

        self.builder.switch_to_block(done);
        Ok(self.builder.ins().stack_load(types::I8, result, 0))
    }

    fn call(&mut self, symbol: SymbolRef, args: &[ExprRef]) -> Result<Option<Value>, CodeGenError> {
        let id = *self
            .decls
            .functions
            .get(&symbol)
            .ok_or(CodeGenError::UnresolvedSymbol(symbol))?;
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.expr(*arg)?);
        }
        let callee = self.func_ref(id);
        let inst = self.builder.ins().call(callee, &values);
        Ok(self.builder.inst_results(inst).first().copied())
    }

    fn new_array(&mut self) -> Result<Value, CodeGenError> {
        self.call_runtime(RuntimeFunction::ArrayNew, &[])?
            .ok_or_else(|| CodeGenError::Internal("array allocation returned nothing".to_string()))
    }

    fn call_runtime(&mut self, function: RuntimeFunction, args: &[Value]) -> Result<Option<Value>, CodeGenError> {
        let id = self.decls.runtime(function)?;
        let callee = self.func_ref(id);
        let inst = self.builder.ins().call(callee, args);
        Ok(self.builder.inst_results(inst).first().copied())
    }

    // ----- storage -----

    fn storage(&mut self, symbol: SymbolRef) -> Result<Storage, CodeGenError> {
        if let Some(storage) = self.locals.get(&symbol) {
            return Ok(*storage);
        }
        if let Some(data) = self.decls.globals.get(&symbol) {
            return Ok(Storage::Static(*data));
        }
        if symbol.namespace == NamespaceId::ROOT || self.namespaces.symbol(symbol).is_none() {
            return Err(CodeGenError::UnresolvedSymbol(symbol));
        }
        let slot = self.new_slot();
        self.locals.insert(symbol, Storage::Stack(slot));
        Ok(Storage::Stack(slot))
    }

    fn load(&mut self, symbol: SymbolRef) -> Result<Value, CodeGenError> {
        let ty = self.storage_type(symbol)?;
        Ok(match self.storage(symbol)? {
            Storage::Static(data) => {
                let address = self.data_address(data);
                self.builder.ins().load(ty, MemFlags::trusted(), address, 0)
            }
            Storage::Stack(slot) => self.builder.ins().stack_load(ty, slot, 0),
            Storage::Register(value) => value,
        })
    }

    fn store(&mut self, symbol: SymbolRef, value: Value) -> Result<(), CodeGenError> {
        match self.storage(symbol)? {
            Storage::Static(data) => {
                let address = self.data_address(data);
                self.builder.ins().store(MemFlags::trusted(), value, address, 0);
            }
            Storage::Stack(slot) => {
                self.builder.ins().stack_store(value, slot, 0);
            }
            Storage::Register(_) => {
                return Err(CodeGenError::Internal(format!("assignment to register parameter {symbol:?}")));
            }
        }
        Ok(())
    }

    fn data_address(&mut self, data: DataId) -> Value {
        let global = match self.data_refs.get(&data) {
            Some(global) => *global,
            None => {
                let global = self.module.declare_data_in_func(data, self.builder.func);
                self.data_refs.insert(data, global);
                global
            }
        };
        self.builder.ins().global_value(self.pointer, global)
    }

    fn func_ref(&mut self, id: FuncId) -> FuncRef {
        match self.func_refs.get(&id) {
            Some(callee) => *callee,
            None => {
                let callee = self.module.declare_func_in_func(id, self.builder.func);
                self.func_refs.insert(id, callee);
                callee
            }
        }
    }

    // ----- types -----

    fn type_of(&self, r: ExprRef) -> Result<ValueType, CodeGenError> {
        self.program
            .type_of(r, self.namespaces)
            .ok_or_else(|| CodeGenError::Internal(format!("expression {r:?} has no type")))
    }

    fn scalar_type(&self, symbol: SymbolRef) -> Result<ValueType, CodeGenError> {
        match self.namespaces.symbol(symbol).map(|s| &s.kind) {
            Some(SymbolKind::Scalar(ty)) => Ok(*ty),
            Some(_) => Err(CodeGenError::Internal(format!("{symbol:?} is not a scalar"))),
            None => Err(CodeGenError::UnresolvedSymbol(symbol)),
        }
    }

    fn array_types(&self, symbol: SymbolRef) -> Result<(ValueType, ValueType), CodeGenError> {
        match self.namespaces.symbol(symbol).map(|s| &s.kind) {
            Some(SymbolKind::Array { key, value }) => Ok((*key, *value)),
            Some(_) => Err(CodeGenError::Internal(format!("{symbol:?} is not an array"))),
            None => Err(CodeGenError::UnresolvedSymbol(symbol)),
        }
    }

    /// Machine type of a symbol's storage; arrays are runtime handles.
    fn storage_type(&self, symbol: SymbolRef) -> Result<Type, CodeGenError> {
        match self.namespaces.symbol(symbol).map(|s| &s.kind) {
            Some(SymbolKind::Scalar(ty)) => Ok(value_type(*ty, self.pointer)),
            Some(SymbolKind::Array { .. }) => Ok(self.pointer),
            Some(SymbolKind::Function { .. }) => {
                Err(CodeGenError::Internal(format!("function {symbol:?} used as a variable")))
            }
            None => Err(CodeGenError::UnresolvedSymbol(symbol)),
        }
    }

    fn zero(&mut self, ty: ValueType) -> Result<Value, CodeGenError> {
        Ok(match ty {
            ValueType::Int => self.builder.ins().iconst(types::I64, 0),
            ValueType::Double => self.builder.ins().f64const(0.0),
            ValueType::Bool => self.builder.ins().iconst(types::I8, 0),
            ValueType::String => {
                let empty = self.decls.empty_string;
                self.data_address(empty)
            }
        })
    }

    /// Array keys and values travel through the runtime as 64-bit payloads.
    fn to_bits(&mut self, value: Value, ty: ValueType) -> Value {
        match ty {
            ValueType::Int | ValueType::String => value,
            ValueType::Double => self.builder.ins().bitcast(types::I64, MemFlags::new(), value),
            ValueType::Bool => self.builder.ins().uextend(types::I64, value),
        }
    }

    fn from_bits(&mut self, bits: Value, ty: ValueType) -> Value {
        match ty {
            ValueType::Int | ValueType::String => bits,
            ValueType::Double => self.builder.ins().bitcast(types::F64, MemFlags::new(), bits),
            ValueType::Bool => self.builder.ins().ireduce(types::I8, bits),
        }
    }
}

fn int_cc(op: Operator) -> Option<IntCC> {
    Some(match op {
        Operator::EQ => IntCC::Equal,
        Operator::NE => IntCC::NotEqual,
        Operator::LT => IntCC::SignedLessThan,
        Operator::LE => IntCC::SignedLessThanOrEqual,
        Operator::GT => IntCC::SignedGreaterThan,
        Operator::GE => IntCC::SignedGreaterThanOrEqual,
        _ => return None,
    })
}

fn float_cc(op: Operator) -> Option<FloatCC> {
    Some(match op {
        Operator::EQ => FloatCC::Equal,
        Operator::NE => FloatCC::NotEqual,
        Operator::LT => FloatCC::LessThan,
        Operator::LE => FloatCC::LessThanOrEqual,
        Operator::GT => FloatCC::GreaterThan,
        Operator::GE => FloatCC::GreaterThanOrEqual,
        _ => return None,
    })
}

fn unsupported(op: Operator, ty: ValueType) -> CodeGenError {
    CodeGenError::Internal(format!("operator {} is not defined on {ty}", op.symbol()))
}

/// Scalars assigned anywhere in a function body; parameters among them need
/// a stack slot.
fn collect_assigned(program: &Program, r: StmtRef, out: &mut HashSet<SymbolRef>) {
    let Some(stmt) = program.stmt(r) else {
        return;
    };
    match stmt {
        Stmt::Assign(symbol, _) => {
            out.insert(*symbol);
        }
        Stmt::If(_, then, otherwise) => {
            collect_assigned(program, *then, out);
            if let Some(otherwise) = otherwise {
                collect_assigned(program, *otherwise, out);
            }
        }
        Stmt::While(_, body) => collect_assigned(program, *body, out),
        Stmt::Block(_, statements) => {
            for s in statements {
                collect_assigned(program, *s, out);
            }
        }
        _ => {}
    }
}
