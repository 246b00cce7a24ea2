use crate::location::Location;
use crate::opcode::Opcode;
use crate::types::{BlockDeclaration, FuncDeclaration, ValType};
use crate::var::Var;

pub type ExprList = Vec<Expr>;

// https://webassembly.github.io/spec/core/text/instructions.html#instructions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expr {
    pub loc: Location,
    pub kind: ExprKind,
}

impl Expr {
    pub fn new(kind: ExprKind, loc: Location) -> Self {
        Expr { loc, kind }
    }
}

// https://webassembly.github.io/spec/core/text/instructions.html#text-memarg
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemArg {
    pub memory: Var,
    pub offset: u64,
    pub align: u32,
}

// Body shared by block, loop, if, try and try_table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Block {
    pub label: Option<String>,
    pub decl: BlockDeclaration,
    pub exprs: ExprList,
    pub end_loc: Location,
}

// `(catch $tag instr*)`, or `(catch_all instr*)` when `var` is `None`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catch {
    pub loc: Location,
    pub var: Option<Var>,
    pub exprs: ExprList,
}

impl Catch {
    pub fn is_catch_all(&self) -> bool {
        self.var.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TryKind {
    Plain,
    Catch(Vec<Catch>),
    Delegate(Var),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableCatchKind {
    Catch,
    CatchRef,
    CatchAll,
    CatchAllRef,
}

impl TableCatchKind {
    pub fn is_catch_all(self) -> bool {
        matches!(self, TableCatchKind::CatchAll | TableCatchKind::CatchAllRef)
    }
}

// Catch clause of try_table. Targets are branch labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableCatch {
    pub loc: Location,
    pub kind: TableCatchKind,
    pub tag: Option<Var>,
    pub target: Var,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedNan {
    Canonical,
    Arithmetic,
}

// Bits of a float literal. NaN patterns only appear in script expectations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloatLiteral<T> {
    Bits(T),
    Nan(ExpectedNan),
}

impl<T: Copy> FloatLiteral<T> {
    pub fn bits(self) -> Option<T> {
        match self {
            FloatLiteral::Bits(b) => Some(b),
            FloatLiteral::Nan(_) => None,
        }
    }
}

// https://webassembly.github.io/simd/core/text/instructions.html#vector-instructions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum V128Lanes {
    I8x16([u8; 16]),
    I16x8([u16; 8]),
    I32x4([u32; 4]),
    I64x2([u64; 2]),
    F32x4([FloatLiteral<u32>; 4]),
    F64x2([FloatLiteral<u64>; 2]),
}

impl V128Lanes {
    // Little-endian bytes of the vector. `None` when some lane is a NaN pattern.
    pub fn to_bytes(&self) -> Option<[u8; 16]> {
        let mut bytes = [0u8; 16];
        match self {
            V128Lanes::I8x16(lanes) => bytes = *lanes,
            V128Lanes::I16x8(lanes) => {
                for (chunk, lane) in bytes.chunks_mut(2).zip(lanes) {
                    chunk.copy_from_slice(&lane.to_le_bytes());
                }
            }
            V128Lanes::I32x4(lanes) => {
                for (chunk, lane) in bytes.chunks_mut(4).zip(lanes) {
                    chunk.copy_from_slice(&lane.to_le_bytes());
                }
            }
            V128Lanes::I64x2(lanes) => {
                for (chunk, lane) in bytes.chunks_mut(8).zip(lanes) {
                    chunk.copy_from_slice(&lane.to_le_bytes());
                }
            }
            V128Lanes::F32x4(lanes) => {
                for (chunk, lane) in bytes.chunks_mut(4).zip(lanes) {
                    chunk.copy_from_slice(&lane.bits()?.to_le_bytes());
                }
            }
            V128Lanes::F64x2(lanes) => {
                for (chunk, lane) in bytes.chunks_mut(8).zip(lanes) {
                    chunk.copy_from_slice(&lane.bits()?.to_le_bytes());
                }
            }
        }
        Some(bytes)
    }
}

// Integers are kept as two's complement bits since the text format accepts both signed and
// unsigned spellings of the same value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Const {
    I32(u32),
    I64(u64),
    F32(FloatLiteral<u32>),
    F64(FloatLiteral<u64>),
    V128(V128Lanes),
    RefNull(ValType),
    // `(ref.func)` and `(ref.extern)` without a value match any reference in expectations
    RefFunc(Option<u32>),
    RefExtern(Option<u64>),
}

impl Const {
    pub fn ty(&self) -> ValType {
        match self {
            Const::I32(_) => ValType::I32,
            Const::I64(_) => ValType::I64,
            Const::F32(_) => ValType::F32,
            Const::F64(_) => ValType::F64,
            Const::V128(_) => ValType::V128,
            Const::RefNull(ty) => *ty,
            Const::RefFunc(_) => ValType::FuncRef,
            Const::RefExtern(_) => ValType::ExternRef,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExprKind {
    // Control instructions
    // https://webassembly.github.io/spec/core/text/instructions.html#control-instructions
    Block(Block),
    Loop(Block),
    If {
        block: Block,
        false_: ExprList,
        false_end_loc: Location,
    },
    Try {
        block: Block,
        kind: TryKind,
    },
    TryTable {
        block: Block,
        catches: Vec<TableCatch>,
    },
    Unreachable,
    Nop,
    Br(Var),
    BrIf(Var),
    BrTable {
        targets: Vec<Var>,
        default: Var,
    },
    Return,
    Call(Var),
    CallIndirect {
        table: Var,
        decl: FuncDeclaration,
    },
    CallRef(Var),
    ReturnCall(Var),
    ReturnCallIndirect {
        table: Var,
        decl: FuncDeclaration,
    },
    Throw(Var),
    Rethrow(Var),
    // Parametric instructions
    // https://webassembly.github.io/spec/core/text/instructions.html#parametric-instructions
    Drop,
    Select(Vec<ValType>),
    // Variable instructions
    // https://webassembly.github.io/spec/core/text/instructions.html#variable-instructions
    LocalGet(Var),
    LocalSet(Var),
    LocalTee(Var),
    GlobalGet(Var),
    GlobalSet(Var),
    // Table instructions
    // https://webassembly.github.io/spec/core/text/instructions.html#table-instructions
    TableGet(Var),
    TableSet(Var),
    TableGrow(Var),
    TableSize(Var),
    TableFill(Var),
    TableCopy {
        dst: Var,
        src: Var,
    },
    TableInit {
        segment: Var,
        table: Var,
    },
    ElemDrop(Var),
    // Memory instructions
    // https://webassembly.github.io/spec/core/text/instructions.html#memory-instructions
    Load {
        opcode: Opcode,
        memarg: MemArg,
    },
    Store {
        opcode: Opcode,
        memarg: MemArg,
    },
    MemorySize(Var),
    MemoryGrow(Var),
    MemoryFill(Var),
    MemoryCopy {
        dst: Var,
        src: Var,
    },
    MemoryInit {
        segment: Var,
        memory: Var,
    },
    DataDrop(Var),
    // Reference instructions
    RefNull(ValType),
    RefIsNull,
    RefFunc(Var),
    // Numeric instructions
    // https://webassembly.github.io/spec/core/text/instructions.html#numeric-instructions
    Const(Const),
    Unary(Opcode),
    Binary(Opcode),
    Ternary(Opcode),
    Compare(Opcode),
    Convert(Opcode),
    // Vector instructions with immediates
    SimdLaneOp {
        opcode: Opcode,
        lane: u8,
    },
    SimdLoadLane {
        opcode: Opcode,
        memarg: MemArg,
        lane: u8,
    },
    SimdStoreLane {
        opcode: Opcode,
        memarg: MemArg,
        lane: u8,
    },
    SimdShuffleOp {
        opcode: Opcode,
        lanes: [u8; 16],
    },
    // Atomic instructions
    // https://webassembly.github.io/threads/core/text/instructions.html
    AtomicLoad {
        opcode: Opcode,
        memarg: MemArg,
    },
    AtomicStore {
        opcode: Opcode,
        memarg: MemArg,
    },
    AtomicRmw {
        opcode: Opcode,
        memarg: MemArg,
    },
    AtomicRmwCmpxchg {
        opcode: Opcode,
        memarg: MemArg,
    },
    AtomicWait {
        opcode: Opcode,
        memarg: MemArg,
    },
    AtomicNotify {
        opcode: Opcode,
        memarg: MemArg,
    },
    AtomicFence(u32),
    // `(@metadata.code.<name> "data")` attached to the following instruction
    CodeMetadata {
        name: String,
        data: Vec<u8>,
    },
}

impl ExprKind {
    pub fn is_block(&self) -> bool {
        use ExprKind::*;
        matches!(
            self,
            Block(_) | Loop(_) | If { .. } | Try { .. } | TryTable { .. }
        )
    }

    pub fn block(&self) -> Option<&Block> {
        match self {
            ExprKind::Block(b) | ExprKind::Loop(b) => Some(b),
            ExprKind::If { block, .. } | ExprKind::Try { block, .. } | ExprKind::TryTable { block, .. } => {
                Some(block)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expr_is_block() {
        let block = ExprKind::Block(Block::default());
        assert!(block.is_block());
        assert!(block.block().is_some());
        assert!(!ExprKind::Nop.is_block());
        assert!(ExprKind::Nop.block().is_none());
    }

    #[test]
    fn v128_bytes_are_little_endian() {
        let lanes = V128Lanes::I32x4([1, 2, 0xffff_ffff, 0]);
        let bytes = lanes.to_bytes().unwrap();
        assert_eq!(&bytes[0..4], &[1, 0, 0, 0]);
        assert_eq!(&bytes[4..8], &[2, 0, 0, 0]);
        assert_eq!(&bytes[8..12], &[0xff, 0xff, 0xff, 0xff]);

        let nan = V128Lanes::F32x4([
            FloatLiteral::Bits(0),
            FloatLiteral::Nan(ExpectedNan::Canonical),
            FloatLiteral::Bits(0),
            FloatLiteral::Bits(0),
        ]);
        assert_eq!(nan.to_bytes(), None);
    }
}
