use crate::var::{Index, Var};
use std::fmt;

// https://webassembly.github.io/spec/core/text/types.html#text-valtype
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum ValType {
    I32,
    I64,
    F32,
    F64,
    V128,
    FuncRef,
    ExternRef,
}

impl ValType {
    pub fn name(self) -> &'static str {
        match self {
            ValType::I32 => "i32",
            ValType::I64 => "i64",
            ValType::F32 => "f32",
            ValType::F64 => "f64",
            ValType::V128 => "v128",
            ValType::FuncRef => "funcref",
            ValType::ExternRef => "externref",
        }
    }

    pub fn from_keyword(kw: &str) -> Option<Self> {
        match kw {
            "i32" => Some(ValType::I32),
            "i64" => Some(ValType::I64),
            "f32" => Some(ValType::F32),
            "f64" => Some(ValType::F64),
            "v128" => Some(ValType::V128),
            "funcref" => Some(ValType::FuncRef),
            "externref" => Some(ValType::ExternRef),
            _ => None,
        }
    }

    pub fn is_ref(self) -> bool {
        matches!(self, ValType::FuncRef | ValType::ExternRef)
    }
}

impl fmt::Display for ValType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// https://webassembly.github.io/spec/core/text/types.html#text-functype
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FuncSignature {
    pub params: Vec<ValType>,
    pub results: Vec<ValType>,
}

impl FuncSignature {
    pub fn new(params: Vec<ValType>, results: Vec<ValType>) -> Self {
        FuncSignature { params, results }
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty() && self.results.is_empty()
    }

    // Block types without a type index can only encode no params and at most one result
    pub fn is_inlinable(&self) -> bool {
        self.params.is_empty() && self.results.len() <= 1
    }
}

impl fmt::Display for FuncSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn list(f: &mut fmt::Formatter<'_>, tys: &[ValType]) -> fmt::Result {
            f.write_str("[")?;
            for (i, ty) in tys.iter().enumerate() {
                if i > 0 {
                    f.write_str(" ")?;
                }
                f.write_str(ty.name())?;
            }
            f.write_str("]")
        }
        list(f, &self.params)?;
        f.write_str(" -> ")?;
        list(f, &self.results)
    }
}

// https://webassembly.github.io/spec/core/text/modules.html#type-uses
//
// Any combination of `(type $t)` and an inline signature. The reconciliation pass fills in the
// missing half.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FuncDeclaration {
    pub type_var: Option<Var>,
    pub sig: FuncSignature,
}

impl FuncDeclaration {
    pub fn has_func_type(&self) -> bool {
        self.type_var.is_some()
    }

    pub fn num_params(&self) -> usize {
        self.sig.params.len()
    }

    pub fn num_results(&self) -> usize {
        self.sig.results.len()
    }
}

pub type BlockDeclaration = FuncDeclaration;

// https://webassembly.github.io/spec/core/text/types.html#text-limits
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Limits {
    pub initial: u64,
    pub max: Option<u64>,
    pub is_shared: bool,
    pub is_64: bool,
}

// https://webassembly.github.io/spec/core/text/modules.html#text-exportdesc
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalKind {
    Func,
    Table,
    Memory,
    Global,
    Tag,
}

impl ExternalKind {
    pub fn name(self) -> &'static str {
        match self {
            ExternalKind::Func => "func",
            ExternalKind::Table => "table",
            ExternalKind::Memory => "memory",
            ExternalKind::Global => "global",
            ExternalKind::Tag => "tag",
        }
    }
}

impl fmt::Display for ExternalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// Local variable types stored as runs of the same type since consecutive locals usually share
// their type. Parameters are not included.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalTypes {
    runs: Vec<(ValType, Index)>,
}

impl LocalTypes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, ty: ValType) {
        self.push_run(ty, 1);
    }

    pub fn push_run(&mut self, ty: ValType, count: Index) {
        if count == 0 {
            return;
        }
        match self.runs.last_mut() {
            Some((last, n)) if *last == ty => *n += count,
            _ => self.runs.push((ty, count)),
        }
    }

    pub fn extend(&mut self, tys: impl IntoIterator<Item = ValType>) {
        for ty in tys {
            self.push(ty);
        }
    }

    pub fn runs(&self) -> &[(ValType, Index)] {
        &self.runs
    }

    pub fn len(&self) -> Index {
        self.runs.iter().map(|(_, n)| *n).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    // Type of the i-th local (not counting params)
    pub fn get(&self, mut i: Index) -> Option<ValType> {
        for (ty, n) in &self.runs {
            if i < *n {
                return Some(*ty);
            }
            i -= *n;
        }
        None
    }

    pub fn iter(&self) -> impl Iterator<Item = ValType> + '_ {
        self.runs
            .iter()
            .flat_map(|(ty, n)| std::iter::repeat(*ty).take(*n as usize))
    }
}
