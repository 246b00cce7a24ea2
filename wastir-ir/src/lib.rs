// In-memory representation of WebAssembly text modules (.wat) and scripts (.wast).
//
// Note: Since this crate only defines data structures shared by the parser and the passes, all
// fields of IR node structs are public.

#![forbid(unsafe_code)]

pub mod diagnostic;
pub mod expr;
pub mod location;
pub mod module;
pub mod opcode;
pub mod script;
pub mod types;
pub mod var;

pub use diagnostic::{Diagnostic, Errors, Failed, Severity};
pub use expr::{
    Block, Catch, Const, ExpectedNan, Expr, ExprKind, ExprList, FloatLiteral, MemArg, TableCatch,
    TableCatchKind, TryKind, V128Lanes,
};
pub use location::Location;
pub use module::{
    Custom, CustomPlace, DataSegment, ElemSegment, Export, Func, FuncType, Global, Import,
    ImportDesc, Memory, Module, ModuleField, ModuleFieldKind, SegmentKind, Table, Tag,
};
pub use opcode::{Feature, Opcode, OpcodeClass};
pub use script::{Action, ActionKind, Command, Script, ScriptModule};
pub use types::{
    BlockDeclaration, ExternalKind, FuncDeclaration, FuncSignature, Limits, LocalTypes, ValType,
};
pub use var::{Binding, BindingTable, Index, Redefinition, Var};
