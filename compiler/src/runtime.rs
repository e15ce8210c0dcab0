//! The C runtime linked into every executable: printing and associative
//! arrays. Compiled once by `build.rs`.

use cranelift_codegen::ir::{AbiParam, Signature, Type, types};
use cranelift_module::Module;

pub const RUNTIME_OBJECT: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/tl_rt.o"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuntimeFunction {
    PrintInt,
    PrintDouble,
    PrintBool,
    PrintStr,
    ArrayNew,
    ArrayGet,
    ArraySet,
}

impl RuntimeFunction {
    pub const ALL: [RuntimeFunction; 7] = [
        RuntimeFunction::PrintInt,
        RuntimeFunction::PrintDouble,
        RuntimeFunction::PrintBool,
        RuntimeFunction::PrintStr,
        RuntimeFunction::ArrayNew,
        RuntimeFunction::ArrayGet,
        RuntimeFunction::ArraySet,
    ];

    pub fn symbol(self) -> &'static str {
        match self {
            RuntimeFunction::PrintInt => "tl_print_int",
            RuntimeFunction::PrintDouble => "tl_print_double",
            RuntimeFunction::PrintBool => "tl_print_bool",
            RuntimeFunction::PrintStr => "tl_print_str",
            RuntimeFunction::ArrayNew => "tl_array_new",
            RuntimeFunction::ArrayGet => "tl_array_get",
            RuntimeFunction::ArraySet => "tl_array_set",
        }
    }

    pub fn signature(self, module: &impl Module) -> Signature {
        let pointer = module.target_config().pointer_type();
        let mut sig = module.make_signature();
        let (params, returns): (&[Type], &[Type]) = match self {
            RuntimeFunction::PrintInt => (&[types::I64], &[]),
            RuntimeFunction::PrintDouble => (&[types::F64], &[]),
            RuntimeFunction::PrintBool => (&[types::I32], &[]),
            RuntimeFunction::PrintStr => (&[pointer], &[]),
            RuntimeFunction::ArrayNew => (&[], &[pointer]),
            RuntimeFunction::ArrayGet => (&[pointer, types::I64], &[types::I64]),
            RuntimeFunction::ArraySet => (&[pointer, types::I64, types::I64], &[]),
        };
        sig.params.extend(params.iter().map(|ty| AbiParam::new(*ty)));
        sig.returns.extend(returns.iter().map(|ty| AbiParam::new(*ty)));
        sig
    }
}
