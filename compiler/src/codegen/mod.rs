//! Object emission with Cranelift.
//!
//! Every symbol gets a fixed home: Root scalars and array handles live in
//! writable data objects, function locals in stack slots, and parameters that
//! are never reassigned stay in their incoming registers. Arrays are opaque
//! runtime handles storing 64-bit payloads.

mod function;

use std::collections::HashMap;
use std::fmt::Display;
use std::path::Path;

use compiler_core::{
    CancellationToken, CodeGenError, CodeGenerator, NamespaceGraph, NamespaceId, Program, Stmt, SymbolKind,
    SymbolRef, ValueType, debug_log,
};
use cranelift_codegen::ir::{AbiParam, Signature, Type, types};
use cranelift_codegen::isa::OwnedTargetIsa;
use cranelift_codegen::settings::{self, Configurable};
use cranelift_module::{DataDescription, DataId, FuncId, Linkage, Module};
use cranelift_object::{ObjectBuilder, ObjectModule};
use string_interner::DefaultSymbol;
use target_lexicon::PointerWidth;

use crate::linker;
use crate::options::{CodegenOptions, OptLevel};
use crate::runtime::RuntimeFunction;

use self::function::{FunctionKind, FunctionTranslator};

pub(crate) fn backend<E: Display>(error: E) -> CodeGenError {
    CodeGenError::Backend(error.to_string())
}

/// Cranelift + system linker implementation of [`CodeGenerator`].
#[derive(Debug, Clone, Default)]
pub struct NativeBackend {
    options: CodegenOptions,
}

impl NativeBackend {
    pub fn new(options: CodegenOptions) -> Self {
        NativeBackend { options }
    }

    pub fn options(&self) -> &CodegenOptions {
        &self.options
    }

    /// Lowers the program to the bytes of a relocatable object exporting
    /// `main`.
    pub fn emit_object(&self, program: &Program, namespaces: &NamespaceGraph) -> Result<Vec<u8>, CodeGenError> {
        let isa = host_isa(self.options.opt_level)?;
        debug_log!("codegen", "target {} at opt level {}", isa.triple(), self.options.opt_level);
        let builder = ObjectBuilder::new(isa, "toylang", cranelift_module::default_libcall_names()).map_err(backend)?;
        let mut module = ObjectModule::new(builder);

        let mut emitter = ObjectEmitter::declare(&mut module, program, namespaces)?;
        emitter.define_functions()?;
        emitter.define_main()?;

        let product = module.finish();
        product.emit().map_err(backend)
    }
}

impl CodeGenerator for NativeBackend {
    fn generate(
        &self,
        program: &Program,
        namespaces: &NamespaceGraph,
        output: &Path,
        cancel: &CancellationToken,
    ) -> Result<(), CodeGenError> {
        let object = self.emit_object(program, namespaces)?;
        if cancel.is_cancelled() {
            return Err(CodeGenError::Cancelled);
        }
        debug_log!("codegen", "object is {} bytes", object.len());
        linker::link(&object, output, &self.options.linker, cancel)
    }
}

fn host_isa(opt_level: OptLevel) -> Result<OwnedTargetIsa, CodeGenError> {
    let mut flags = settings::builder();
    flags.set("opt_level", opt_level.as_setting()).map_err(backend)?;
    flags.set("is_pic", "true").map_err(backend)?;
    let isa_builder = cranelift_native::builder().map_err(|e| CodeGenError::Backend(e.to_string()))?;
    let isa = isa_builder.finish(settings::Flags::new(flags)).map_err(backend)?;
    match isa.triple().pointer_width() {
        Ok(PointerWidth::U64) => Ok(isa),
        _ => Err(CodeGenError::Backend(format!("unsupported target {}", isa.triple()))),
    }
}

/// Module-level symbols shared by every function body.
pub(crate) struct Declarations {
    pub runtime: HashMap<RuntimeFunction, FuncId>,
    pub functions: HashMap<SymbolRef, FuncId>,
    pub globals: HashMap<SymbolRef, DataId>,
    pub strings: HashMap<DefaultSymbol, DataId>,
    pub empty_string: DataId,
}

impl Declarations {
    pub fn runtime(&self, function: RuntimeFunction) -> Result<FuncId, CodeGenError> {
        self.runtime
            .get(&function)
            .copied()
            .ok_or_else(|| CodeGenError::Internal(format!("runtime import {} missing", function.symbol())))
    }

    /// Read-only NUL-terminated copy of a string literal, declared on first use.
    pub fn string(&mut self, module: &mut ObjectModule, program: &Program, text: DefaultSymbol) -> Result<DataId, CodeGenError> {
        if let Some(data) = self.strings.get(&text) {
            return Ok(*data);
        }
        let name = format!("tl_str_{}", self.strings.len());
        let data = define_c_string(module, &name, program.resolve_str(text))?;
        self.strings.insert(text, data);
        Ok(data)
    }
}

fn define_c_string(module: &mut ObjectModule, name: &str, text: &str) -> Result<DataId, CodeGenError> {
    let data = module.declare_data(name, Linkage::Local, false, false).map_err(backend)?;
    let mut bytes = Vec::with_capacity(text.len() + 1);
    bytes.extend_from_slice(text.as_bytes());
    bytes.push(0);
    let mut description = DataDescription::new();
    description.define(bytes.into_boxed_slice());
    module.define_data(data, &description).map_err(backend)?;
    Ok(data)
}

pub(crate) fn value_type(ty: ValueType, pointer: Type) -> Type {
    match ty {
        ValueType::Int => types::I64,
        ValueType::Double => types::F64,
        ValueType::Bool => types::I8,
        ValueType::String => pointer,
    }
}

struct ObjectEmitter<'a> {
    module: &'a mut ObjectModule,
    program: &'a Program,
    namespaces: &'a NamespaceGraph,
    decls: Declarations,
}

impl<'a> ObjectEmitter<'a> {
    /// Declares runtime imports, Root storage and every user function so
    /// bodies can reference each other in any order.
    fn declare(
        module: &'a mut ObjectModule,
        program: &'a Program,
        namespaces: &'a NamespaceGraph,
    ) -> Result<Self, CodeGenError> {
        let mut runtime = HashMap::new();
        for function in RuntimeFunction::ALL {
            let signature = function.signature(&*module);
            let id = module
                .declare_function(function.symbol(), Linkage::Import, &signature)
                .map_err(backend)?;
            runtime.insert(function, id);
        }

        let mut globals = HashMap::new();
        for (index, symbol) in namespaces.root().symbols.iter().enumerate() {
            if matches!(symbol.kind, SymbolKind::Function { .. }) {
                continue;
            }
            let reference = SymbolRef {
                namespace: NamespaceId::ROOT,
                index: index as u32,
            };
            let data = module
                .declare_data(&format!("tl_global_{index}"), Linkage::Local, true, false)
                .map_err(backend)?;
            let mut description = DataDescription::new();
            description.define_zeroinit(8);
            description.set_align(8);
            module.define_data(data, &description).map_err(backend)?;
            globals.insert(reference, data);
        }

        let mut functions = HashMap::new();
        for decl in program.functions() {
            let symbol = namespaces
                .symbol(decl.symbol)
                .ok_or(CodeGenError::UnresolvedSymbol(decl.symbol))?;
            let name = format!("tl_fn_{}", program.resolve_str(symbol.name));
            let signature = function_signature(&*module, &symbol.kind)?;
            let id = module.declare_function(&name, Linkage::Local, &signature).map_err(backend)?;
            functions.insert(decl.symbol, id);
        }

        let empty_string = define_c_string(module, "tl_str_empty", "")?;
        debug_log!(
            "codegen",
            "declared {} globals and {} functions",
            globals.len(),
            functions.len()
        );

        Ok(ObjectEmitter {
            module,
            program,
            namespaces,
            decls: Declarations {
                runtime,
                functions,
                globals,
                strings: HashMap::new(),
                empty_string,
            },
        })
    }

    fn define_functions(&mut self) -> Result<(), CodeGenError> {
        let program = self.program;
        for decl in program.functions() {
            let id = *self
                .decls
                .functions
                .get(&decl.symbol)
                .ok_or(CodeGenError::UnresolvedSymbol(decl.symbol))?;
            let symbol = self
                .namespaces
                .symbol(decl.symbol)
                .ok_or(CodeGenError::UnresolvedSymbol(decl.symbol))?;
            let signature = function_signature(&*self.module, &symbol.kind)?;
            self.define(id, signature, FunctionKind::User(decl))?;
        }
        Ok(())
    }

    fn define_main(&mut self) -> Result<(), CodeGenError> {
        let mut signature = self.module.make_signature();
        signature.returns.push(AbiParam::new(types::I32));
        let id = self
            .module
            .declare_function("main", Linkage::Export, &signature)
            .map_err(backend)?;
        let program = self.program;
        let body: Vec<_> = program
            .statements
            .iter()
            .copied()
            .filter(|s| !matches!(program.stmt(*s), Some(Stmt::Function(_))))
            .collect();
        self.define(id, signature, FunctionKind::Main(body))
    }

    fn define(&mut self, id: FuncId, signature: Signature, kind: FunctionKind<'_>) -> Result<(), CodeGenError> {
        let mut ctx = self.module.make_context();
        ctx.func.signature = signature;
        let mut builder_context = cranelift_frontend::FunctionBuilderContext::new();
        {
            let builder = cranelift_frontend::FunctionBuilder::new(&mut ctx.func, &mut builder_context);
            let translator = FunctionTranslator::new(builder, self.module, &mut self.decls, self.program, self.namespaces);
            translator.translate(kind)?;
        }
        self.module.define_function(id, &mut ctx).map_err(backend)?;
        self.module.clear_context(&mut ctx);
        Ok(())
    }
}

fn function_signature(module: &ObjectModule, kind: &SymbolKind) -> Result<Signature, CodeGenError> {
    let SymbolKind::Function { params, ret } = kind else {
        return Err(CodeGenError::Internal("function declaration without a function symbol".to_string()));
    };
    let pointer = module.target_config().pointer_type();
    let mut signature = module.make_signature();
    signature
        .params
        .extend(params.iter().map(|ty| AbiParam::new(value_type(*ty, pointer))));
    if let Some(ty) = ret {
        signature.returns.push(AbiParam::new(value_type(*ty, pointer)));
    }
    Ok(signature)
}
