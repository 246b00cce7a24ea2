use std::fmt;

// Instructions which only differ by their opcode share one expression shape. Their mnemonics are
// listed in the table below together with the shape (class), the proposal which introduced them
// and their natural alignment in bytes (0 for non-memory instructions).
//
// https://webassembly.github.io/spec/core/text/instructions.html

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpcodeClass {
    AtomicFence,
    AtomicLoad,
    AtomicNotify,
    AtomicRmw,
    AtomicRmwCmpxchg,
    AtomicStore,
    AtomicWait,
    Binary,
    Compare,
    Const,
    Convert,
    Load,
    SimdLaneOp,
    SimdLoadLane,
    SimdShuffleOp,
    SimdStoreLane,
    Store,
    Ternary,
    Unary,
}

// Proposal which introduced an opcode. `Mvp` opcodes are always available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    Mvp,
    SignExtension,
    SatFloatToInt,
    Simd,
    RelaxedSimd,
    Threads,
}

macro_rules! opcodes {
    ($($variant:ident, $mnemonic:literal, $class:ident, $feature:ident, $align:literal;)*) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Opcode {
            $($variant,)*
        }

        impl Opcode {
            pub fn from_mnemonic(s: &str) -> Option<Opcode> {
                match s {
                    $($mnemonic => Some(Opcode::$variant),)*
                    _ => None,
                }
            }

            pub fn name(self) -> &'static str {
                match self {
                    $(Opcode::$variant => $mnemonic,)*
                }
            }

            pub fn class(self) -> OpcodeClass {
                match self {
                    $(Opcode::$variant => OpcodeClass::$class,)*
                }
            }

            pub fn feature(self) -> Feature {
                match self {
                    $(Opcode::$variant => Feature::$feature,)*
                }
            }

            pub fn natural_alignment(self) -> u32 {
                match self {
                    $(Opcode::$variant => $align,)*
                }
            }
        }
    };
}

opcodes! {
    // AtomicFence
    AtomicFence, "atomic.fence", AtomicFence, Threads, 0;
    // AtomicLoad
    I32AtomicLoad, "i32.atomic.load", AtomicLoad, Threads, 4;
    I32AtomicLoad16U, "i32.atomic.load16_u", AtomicLoad, Threads, 2;
    I32AtomicLoad8U, "i32.atomic.load8_u", AtomicLoad, Threads, 1;
    I64AtomicLoad, "i64.atomic.load", AtomicLoad, Threads, 8;
    I64AtomicLoad16U, "i64.atomic.load16_u", AtomicLoad, Threads, 2;
    I64AtomicLoad32U, "i64.atomic.load32_u", AtomicLoad, Threads, 4;
    I64AtomicLoad8U, "i64.atomic.load8_u", AtomicLoad, Threads, 1;
    // AtomicNotify
    MemoryAtomicNotify, "memory.atomic.notify", AtomicNotify, Threads, 4;
    // AtomicRmw
    I32AtomicRmwAdd, "i32.atomic.rmw.add", AtomicRmw, Threads, 4;
    I32AtomicRmwAnd, "i32.atomic.rmw.and", AtomicRmw, Threads, 4;
    I32AtomicRmwOr, "i32.atomic.rmw.or", AtomicRmw, Threads, 4;
    I32AtomicRmwSub, "i32.atomic.rmw.sub", AtomicRmw, Threads, 4;
    I32AtomicRmwXchg, "i32.atomic.rmw.xchg", AtomicRmw, Threads, 4;
    I32AtomicRmwXor, "i32.atomic.rmw.xor", AtomicRmw, Threads, 4;
    I32AtomicRmw16AddU, "i32.atomic.rmw16.add_u", AtomicRmw, Threads, 2;
    I32AtomicRmw16AndU, "i32.atomic.rmw16.and_u", AtomicRmw, Threads, 2;
    I32AtomicRmw16OrU, "i32.atomic.rmw16.or_u", AtomicRmw, Threads, 2;
    I32AtomicRmw16SubU, "i32.atomic.rmw16.sub_u", AtomicRmw, Threads, 2;
    I32AtomicRmw16XchgU, "i32.atomic.rmw16.xchg_u", AtomicRmw, Threads, 2;
    I32AtomicRmw16XorU, "i32.atomic.rmw16.xor_u", AtomicRmw, Threads, 2;
    I32AtomicRmw8AddU, "i32.atomic.rmw8.add_u", AtomicRmw, Threads, 1;
    I32AtomicRmw8AndU, "i32.atomic.rmw8.and_u", AtomicRmw, Threads, 1;
    I32AtomicRmw8OrU, "i32.atomic.rmw8.or_u", AtomicRmw, Threads, 1;
    I32AtomicRmw8SubU, "i32.atomic.rmw8.sub_u", AtomicRmw, Threads, 1;
    I32AtomicRmw8XchgU, "i32.atomic.rmw8.xchg_u", AtomicRmw, Threads, 1;
    I32AtomicRmw8XorU, "i32.atomic.rmw8.xor_u", AtomicRmw, Threads, 1;
    I64AtomicRmwAdd, "i64.atomic.rmw.add", AtomicRmw, Threads, 8;
    I64AtomicRmwAnd, "i64.atomic.rmw.and", AtomicRmw, Threads, 8;
    I64AtomicRmwOr, "i64.atomic.rmw.or", AtomicRmw, Threads, 8;
    I64AtomicRmwSub, "i64.atomic.rmw.sub", AtomicRmw, Threads, 8;
    I64AtomicRmwXchg, "i64.atomic.rmw.xchg", AtomicRmw, Threads, 8;
    I64AtomicRmwXor, "i64.atomic.rmw.xor", AtomicRmw, Threads, 8;
    I64AtomicRmw16AddU, "i64.atomic.rmw16.add_u", AtomicRmw, Threads, 2;
    I64AtomicRmw16AndU, "i64.atomic.rmw16.and_u", AtomicRmw, Threads, 2;
    I64AtomicRmw16OrU, "i64.atomic.rmw16.or_u", AtomicRmw, Threads, 2;
    I64AtomicRmw16SubU, "i64.atomic.rmw16.sub_u", AtomicRmw, Threads, 2;
    I64AtomicRmw16XchgU, "i64.atomic.rmw16.xchg_u", AtomicRmw, Threads, 2;
    I64AtomicRmw16XorU, "i64.atomic.rmw16.xor_u", AtomicRmw, Threads, 2;
    I64AtomicRmw32AddU, "i64.atomic.rmw32.add_u", AtomicRmw, Threads, 4;
    I64AtomicRmw32AndU, "i64.atomic.rmw32.and_u", AtomicRmw, Threads, 4;
    I64AtomicRmw32OrU, "i64.atomic.rmw32.or_u", AtomicRmw, Threads, 4;
    I64AtomicRmw32SubU, "i64.atomic.rmw32.sub_u", AtomicRmw, Threads, 4;
    I64AtomicRmw32XchgU, "i64.atomic.rmw32.xchg_u", AtomicRmw, Threads, 4;
    I64AtomicRmw32XorU, "i64.atomic.rmw32.xor_u", AtomicRmw, Threads, 4;
    I64AtomicRmw8AddU, "i64.atomic.rmw8.add_u", AtomicRmw, Threads, 1;
    I64AtomicRmw8AndU, "i64.atomic.rmw8.and_u", AtomicRmw, Threads, 1;
    I64AtomicRmw8OrU, "i64.atomic.rmw8.or_u", AtomicRmw, Threads, 1;
    I64AtomicRmw8SubU, "i64.atomic.rmw8.sub_u", AtomicRmw, Threads, 1;
    I64AtomicRmw8XchgU, "i64.atomic.rmw8.xchg_u", AtomicRmw, Threads, 1;
    I64AtomicRmw8XorU, "i64.atomic.rmw8.xor_u", AtomicRmw, Threads, 1;
    // AtomicRmwCmpxchg
    I32AtomicRmwCmpxchg, "i32.atomic.rmw.cmpxchg", AtomicRmwCmpxchg, Threads, 4;
    I32AtomicRmw16CmpxchgU, "i32.atomic.rmw16.cmpxchg_u", AtomicRmwCmpxchg, Threads, 2;
    I32AtomicRmw8CmpxchgU, "i32.atomic.rmw8.cmpxchg_u", AtomicRmwCmpxchg, Threads, 1;
    I64AtomicRmwCmpxchg, "i64.atomic.rmw.cmpxchg", AtomicRmwCmpxchg, Threads, 8;
    I64AtomicRmw16CmpxchgU, "i64.atomic.rmw16.cmpxchg_u", AtomicRmwCmpxchg, Threads, 2;
    I64AtomicRmw32CmpxchgU, "i64.atomic.rmw32.cmpxchg_u", AtomicRmwCmpxchg, Threads, 4;
    I64AtomicRmw8CmpxchgU, "i64.atomic.rmw8.cmpxchg_u", AtomicRmwCmpxchg, Threads, 1;
    // AtomicStore
    I32AtomicStore, "i32.atomic.store", AtomicStore, Threads, 4;
    I32AtomicStore16, "i32.atomic.store16", AtomicStore, Threads, 2;
    I32AtomicStore8, "i32.atomic.store8", AtomicStore, Threads, 1;
    I64AtomicStore, "i64.atomic.store", AtomicStore, Threads, 8;
    I64AtomicStore16, "i64.atomic.store16", AtomicStore, Threads, 2;
    I64AtomicStore32, "i64.atomic.store32", AtomicStore, Threads, 4;
    I64AtomicStore8, "i64.atomic.store8", AtomicStore, Threads, 1;
    // AtomicWait
    MemoryAtomicWait32, "memory.atomic.wait32", AtomicWait, Threads, 4;
    MemoryAtomicWait64, "memory.atomic.wait64", AtomicWait, Threads, 8;
    // Binary
    F32Add, "f32.add", Binary, Mvp, 0;
    F32Copysign, "f32.copysign", Binary, Mvp, 0;
    F32Div, "f32.div", Binary, Mvp, 0;
    F32Max, "f32.max", Binary, Mvp, 0;
    F32Min, "f32.min", Binary, Mvp, 0;
    F32Mul, "f32.mul", Binary, Mvp, 0;
    F32Sub, "f32.sub", Binary, Mvp, 0;
    F32X4Add, "f32x4.add", Binary, Simd, 0;
    F32X4Div, "f32x4.div", Binary, Simd, 0;
    F32X4Max, "f32x4.max", Binary, Simd, 0;
    F32X4Min, "f32x4.min", Binary, Simd, 0;
    F32X4Mul, "f32x4.mul", Binary, Simd, 0;
    F32X4PMax, "f32x4.pmax", Binary, Simd, 0;
    F32X4PMin, "f32x4.pmin", Binary, Simd, 0;
    F32X4RelaxedMax, "f32x4.relaxed_max", Binary, RelaxedSimd, 0;
    F32X4RelaxedMin, "f32x4.relaxed_min", Binary, RelaxedSimd, 0;
    F32X4Sub, "f32x4.sub", Binary, Simd, 0;
    F64Add, "f64.add", Binary, Mvp, 0;
    F64Copysign, "f64.copysign", Binary, Mvp, 0;
    F64Div, "f64.div", Binary, Mvp, 0;
    F64Max, "f64.max", Binary, Mvp, 0;
    F64Min, "f64.min", Binary, Mvp, 0;
    F64Mul, "f64.mul", Binary, Mvp, 0;
    F64Sub, "f64.sub", Binary, Mvp, 0;
    F64X2Add, "f64x2.add", Binary, Simd, 0;
    F64X2Div, "f64x2.div", Binary, Simd, 0;
    F64X2Max, "f64x2.max", Binary, Simd, 0;
    F64X2Min, "f64x2.min", Binary, Simd, 0;
    F64X2Mul, "f64x2.mul", Binary, Simd, 0;
    F64X2PMax, "f64x2.pmax", Binary, Simd, 0;
    F64X2PMin, "f64x2.pmin", Binary, Simd, 0;
    F64X2RelaxedMax, "f64x2.relaxed_max", Binary, RelaxedSimd, 0;
    F64X2RelaxedMin, "f64x2.relaxed_min", Binary, RelaxedSimd, 0;
    F64X2Sub, "f64x2.sub", Binary, Simd, 0;
    I16X8Add, "i16x8.add", Binary, Simd, 0;
    I16X8AddSatS, "i16x8.add_sat_s", Binary, Simd, 0;
    I16X8AddSatU, "i16x8.add_sat_u", Binary, Simd, 0;
    I16X8AvgrU, "i16x8.avgr_u", Binary, Simd, 0;
    I16X8DotI8X16I7X16S, "i16x8.dot_i8x16_i7x16_s", Binary, Simd, 0;
    I16X8ExtmulHighI8X16S, "i16x8.extmul_high_i8x16_s", Binary, Simd, 0;
    I16X8ExtmulHighI8X16U, "i16x8.extmul_high_i8x16_u", Binary, Simd, 0;
    I16X8ExtmulLowI8X16S, "i16x8.extmul_low_i8x16_s", Binary, Simd, 0;
    I16X8ExtmulLowI8X16U, "i16x8.extmul_low_i8x16_u", Binary, Simd, 0;
    I16X8MaxS, "i16x8.max_s", Binary, Simd, 0;
    I16X8MaxU, "i16x8.max_u", Binary, Simd, 0;
    I16X8MinS, "i16x8.min_s", Binary, Simd, 0;
    I16X8MinU, "i16x8.min_u", Binary, Simd, 0;
    I16X8Mul, "i16x8.mul", Binary, Simd, 0;
    I16X8NarrowI32X4S, "i16x8.narrow_i32x4_s", Binary, Simd, 0;
    I16X8NarrowI32X4U, "i16x8.narrow_i32x4_u", Binary, Simd, 0;
    I16X8Q15mulrSatS, "i16x8.q15mulr_sat_s", Binary, Simd, 0;
    I16X8RelaxedQ15mulrS, "i16x8.relaxed_q15mulr_s", Binary, RelaxedSimd, 0;
    I16X8Shl, "i16x8.shl", Binary, Simd, 0;
    I16X8ShrS, "i16x8.shr_s", Binary, Simd, 0;
    I16X8ShrU, "i16x8.shr_u", Binary, Simd, 0;
    I16X8Sub, "i16x8.sub", Binary, Simd, 0;
    I16X8SubSatS, "i16x8.sub_sat_s", Binary, Simd, 0;
    I16X8SubSatU, "i16x8.sub_sat_u", Binary, Simd, 0;
    I32Add, "i32.add", Binary, Mvp, 0;
    I32And, "i32.and", Binary, Mvp, 0;
    I32DivS, "i32.div_s", Binary, Mvp, 0;
    I32DivU, "i32.div_u", Binary, Mvp, 0;
    I32Mul, "i32.mul", Binary, Mvp, 0;
    I32Or, "i32.or", Binary, Mvp, 0;
    I32RemS, "i32.rem_s", Binary, Mvp, 0;
    I32RemU, "i32.rem_u", Binary, Mvp, 0;
    I32Rotl, "i32.rotl", Binary, Mvp, 0;
    I32Rotr, "i32.rotr", Binary, Mvp, 0;
    I32Shl, "i32.shl", Binary, Mvp, 0;
    I32ShrS, "i32.shr_s", Binary, Mvp, 0;
    I32ShrU, "i32.shr_u", Binary, Mvp, 0;
    I32Sub, "i32.sub", Binary, Mvp, 0;
    I32Xor, "i32.xor", Binary, Mvp, 0;
    I32X4Add, "i32x4.add", Binary, Simd, 0;
    I32X4DotI16X8S, "i32x4.dot_i16x8_s", Binary, Simd, 0;
    I32X4ExtmulHighI16X8S, "i32x4.extmul_high_i16x8_s", Binary, Simd, 0;
    I32X4ExtmulHighI16X8U, "i32x4.extmul_high_i16x8_u", Binary, Simd, 0;
    I32X4ExtmulLowI16X8S, "i32x4.extmul_low_i16x8_s", Binary, Simd, 0;
    I32X4ExtmulLowI16X8U, "i32x4.extmul_low_i16x8_u", Binary, Simd, 0;
    I32X4MaxS, "i32x4.max_s", Binary, Simd, 0;
    I32X4MaxU, "i32x4.max_u", Binary, Simd, 0;
    I32X4MinS, "i32x4.min_s", Binary, Simd, 0;
    I32X4MinU, "i32x4.min_u", Binary, Simd, 0;
    I32X4Mul, "i32x4.mul", Binary, Simd, 0;
    I32X4Shl, "i32x4.shl", Binary, Simd, 0;
    I32X4ShrS, "i32x4.shr_s", Binary, Simd, 0;
    I32X4ShrU, "i32x4.shr_u", Binary, Simd, 0;
    I32X4Sub, "i32x4.sub", Binary, Simd, 0;
    I64Add, "i64.add", Binary, Mvp, 0;
    I64And, "i64.and", Binary, Mvp, 0;
    I64DivS, "i64.div_s", Binary, Mvp, 0;
    I64DivU, "i64.div_u", Binary, Mvp, 0;
    I64Mul, "i64.mul", Binary, Mvp, 0;
    I64Or, "i64.or", Binary, Mvp, 0;
    I64RemS, "i64.rem_s", Binary, Mvp, 0;
    I64RemU, "i64.rem_u", Binary, Mvp, 0;
    I64Rotl, "i64.rotl", Binary, Mvp, 0;
    I64Rotr, "i64.rotr", Binary, Mvp, 0;
    I64Shl, "i64.shl", Binary, Mvp, 0;
    I64ShrS, "i64.shr_s", Binary, Mvp, 0;
    I64ShrU, "i64.shr_u", Binary, Mvp, 0;
    I64Sub, "i64.sub", Binary, Mvp, 0;
    I64Xor, "i64.xor", Binary, Mvp, 0;
    I64X2Add, "i64x2.add", Binary, Simd, 0;
    I64X2Eq, "i64x2.eq", Binary, Simd, 0;
    I64X2ExtmulHighI32X4S, "i64x2.extmul_high_i32x4_s", Binary, Simd, 0;
    I64X2ExtmulHighI32X4U, "i64x2.extmul_high_i32x4_u", Binary, Simd, 0;
    I64X2ExtmulLowI32X4S, "i64x2.extmul_low_i32x4_s", Binary, Simd, 0;
    I64X2ExtmulLowI32X4U, "i64x2.extmul_low_i32x4_u", Binary, Simd, 0;
    I64X2GeS, "i64x2.ge_s", Binary, Simd, 0;
    I64X2GtS, "i64x2.gt_s", Binary, Simd, 0;
    I64X2LeS, "i64x2.le_s", Binary, Simd, 0;
    I64X2LtS, "i64x2.lt_s", Binary, Simd, 0;
    I64X2Mul, "i64x2.mul", Binary, Simd, 0;
    I64X2Ne, "i64x2.ne", Binary, Simd, 0;
    I64X2Shl, "i64x2.shl", Binary, Simd, 0;
    I64X2ShrS, "i64x2.shr_s", Binary, Simd, 0;
    I64X2ShrU, "i64x2.shr_u", Binary, Simd, 0;
    I64X2Sub, "i64x2.sub", Binary, Simd, 0;
    I8X16Add, "i8x16.add", Binary, Simd, 0;
    I8X16AddSatS, "i8x16.add_sat_s", Binary, Simd, 0;
    I8X16AddSatU, "i8x16.add_sat_u", Binary, Simd, 0;
    I8X16AvgrU, "i8x16.avgr_u", Binary, Simd, 0;
    I8X16MaxS, "i8x16.max_s", Binary, Simd, 0;
    I8X16MaxU, "i8x16.max_u", Binary, Simd, 0;
    I8X16MinS, "i8x16.min_s", Binary, Simd, 0;
    I8X16MinU, "i8x16.min_u", Binary, Simd, 0;
    I8X16NarrowI16X8S, "i8x16.narrow_i16x8_s", Binary, Simd, 0;
    I8X16NarrowI16X8U, "i8x16.narrow_i16x8_u", Binary, Simd, 0;
    I8X16RelaxedSwizzle, "i8x16.relaxed_swizzle", Binary, RelaxedSimd, 0;
    I8X16Shl, "i8x16.shl", Binary, Simd, 0;
    I8X16ShrS, "i8x16.shr_s", Binary, Simd, 0;
    I8X16ShrU, "i8x16.shr_u", Binary, Simd, 0;
    I8X16Sub, "i8x16.sub", Binary, Simd, 0;
    I8X16SubSatS, "i8x16.sub_sat_s", Binary, Simd, 0;
    I8X16SubSatU, "i8x16.sub_sat_u", Binary, Simd, 0;
    I8X16Swizzle, "i8x16.swizzle", Binary, Simd, 0;
    V128And, "v128.and", Binary, Simd, 0;
    V128Andnot, "v128.andnot", Binary, Simd, 0;
    V128Or, "v128.or", Binary, Simd, 0;
    V128Xor, "v128.xor", Binary, Simd, 0;
    // Compare
    F32Eq, "f32.eq", Compare, Mvp, 0;
    F32Ge, "f32.ge", Compare, Mvp, 0;
    F32Gt, "f32.gt", Compare, Mvp, 0;
    F32Le, "f32.le", Compare, Mvp, 0;
    F32Lt, "f32.lt", Compare, Mvp, 0;
    F32Ne, "f32.ne", Compare, Mvp, 0;
    F32X4Eq, "f32x4.eq", Compare, Simd, 0;
    F32X4Ge, "f32x4.ge", Compare, Simd, 0;
    F32X4Gt, "f32x4.gt", Compare, Simd, 0;
    F32X4Le, "f32x4.le", Compare, Simd, 0;
    F32X4Lt, "f32x4.lt", Compare, Simd, 0;
    F32X4Ne, "f32x4.ne", Compare, Simd, 0;
    F64Eq, "f64.eq", Compare, Mvp, 0;
    F64Ge, "f64.ge", Compare, Mvp, 0;
    F64Gt, "f64.gt", Compare, Mvp, 0;
    F64Le, "f64.le", Compare, Mvp, 0;
    F64Lt, "f64.lt", Compare, Mvp, 0;
    F64Ne, "f64.ne", Compare, Mvp, 0;
    F64X2Eq, "f64x2.eq", Compare, Simd, 0;
    F64X2Ge, "f64x2.ge", Compare, Simd, 0;
    F64X2Gt, "f64x2.gt", Compare, Simd, 0;
    F64X2Le, "f64x2.le", Compare, Simd, 0;
    F64X2Lt, "f64x2.lt", Compare, Simd, 0;
    F64X2Ne, "f64x2.ne", Compare, Simd, 0;
    I16X8Eq, "i16x8.eq", Compare, Simd, 0;
    I16X8GeS, "i16x8.ge_s", Compare, Simd, 0;
    I16X8GeU, "i16x8.ge_u", Compare, Simd, 0;
    I16X8GtS, "i16x8.gt_s", Compare, Simd, 0;
    I16X8GtU, "i16x8.gt_u", Compare, Simd, 0;
    I16X8LeS, "i16x8.le_s", Compare, Simd, 0;
    I16X8LeU, "i16x8.le_u", Compare, Simd, 0;
    I16X8LtS, "i16x8.lt_s", Compare, Simd, 0;
    I16X8LtU, "i16x8.lt_u", Compare, Simd, 0;
    I16X8Ne, "i16x8.ne", Compare, Simd, 0;
    I32Eq, "i32.eq", Compare, Mvp, 0;
    I32GeS, "i32.ge_s", Compare, Mvp, 0;
    I32GeU, "i32.ge_u", Compare, Mvp, 0;
    I32GtS, "i32.gt_s", Compare, Mvp, 0;
    I32GtU, "i32.gt_u", Compare, Mvp, 0;
    I32LeS, "i32.le_s", Compare, Mvp, 0;
    I32LeU, "i32.le_u", Compare, Mvp, 0;
    I32LtS, "i32.lt_s", Compare, Mvp, 0;
    I32LtU, "i32.lt_u", Compare, Mvp, 0;
    I32Ne, "i32.ne", Compare, Mvp, 0;
    I32X4Eq, "i32x4.eq", Compare, Simd, 0;
    I32X4GeS, "i32x4.ge_s", Compare, Simd, 0;
    I32X4GeU, "i32x4.ge_u", Compare, Simd, 0;
    I32X4GtS, "i32x4.gt_s", Compare, Simd, 0;
    I32X4GtU, "i32x4.gt_u", Compare, Simd, 0;
    I32X4LeS, "i32x4.le_s", Compare, Simd, 0;
    I32X4LeU, "i32x4.le_u", Compare, Simd, 0;
    I32X4LtS, "i32x4.lt_s", Compare, Simd, 0;
    I32X4LtU, "i32x4.lt_u", Compare, Simd, 0;
    I32X4Ne, "i32x4.ne", Compare, Simd, 0;
    I64Eq, "i64.eq", Compare, Mvp, 0;
    I64GeS, "i64.ge_s", Compare, Mvp, 0;
    I64GeU, "i64.ge_u", Compare, Mvp, 0;
    I64GtS, "i64.gt_s", Compare, Mvp, 0;
    I64GtU, "i64.gt_u", Compare, Mvp, 0;
    I64LeS, "i64.le_s", Compare, Mvp, 0;
    I64LeU, "i64.le_u", Compare, Mvp, 0;
    I64LtS, "i64.lt_s", Compare, Mvp, 0;
    I64LtU, "i64.lt_u", Compare, Mvp, 0;
    I64Ne, "i64.ne", Compare, Mvp, 0;
    I8X16Eq, "i8x16.eq", Compare, Simd, 0;
    I8X16GeS, "i8x16.ge_s", Compare, Simd, 0;
    I8X16GeU, "i8x16.ge_u", Compare, Simd, 0;
    I8X16GtS, "i8x16.gt_s", Compare, Simd, 0;
    I8X16GtU, "i8x16.gt_u", Compare, Simd, 0;
    I8X16LeS, "i8x16.le_s", Compare, Simd, 0;
    I8X16LeU, "i8x16.le_u", Compare, Simd, 0;
    I8X16LtS, "i8x16.lt_s", Compare, Simd, 0;
    I8X16LtU, "i8x16.lt_u", Compare, Simd, 0;
    I8X16Ne, "i8x16.ne", Compare, Simd, 0;
    // Const
    F32Const, "f32.const", Const, Mvp, 0;
    F64Const, "f64.const", Const, Mvp, 0;
    I32Const, "i32.const", Const, Mvp, 0;
    I64Const, "i64.const", Const, Mvp, 0;
    V128Const, "v128.const", Const, Simd, 0;
    // Convert
    F32ConvertI32S, "f32.convert_i32_s", Convert, Mvp, 0;
    F32ConvertI32U, "f32.convert_i32_u", Convert, Mvp, 0;
    F32ConvertI64S, "f32.convert_i64_s", Convert, Mvp, 0;
    F32ConvertI64U, "f32.convert_i64_u", Convert, Mvp, 0;
    F32DemoteF64, "f32.demote_f64", Convert, Mvp, 0;
    F32ReinterpretI32, "f32.reinterpret_i32", Convert, Mvp, 0;
    F64ConvertI32S, "f64.convert_i32_s", Convert, Mvp, 0;
    F64ConvertI32U, "f64.convert_i32_u", Convert, Mvp, 0;
    F64ConvertI64S, "f64.convert_i64_s", Convert, Mvp, 0;
    F64ConvertI64U, "f64.convert_i64_u", Convert, Mvp, 0;
    F64PromoteF32, "f64.promote_f32", Convert, Mvp, 0;
    F64ReinterpretI64, "f64.reinterpret_i64", Convert, Mvp, 0;
    I32Eqz, "i32.eqz", Convert, Mvp, 0;
    I32ReinterpretF32, "i32.reinterpret_f32", Convert, Mvp, 0;
    I32TruncF32S, "i32.trunc_f32_s", Convert, Mvp, 0;
    I32TruncF32U, "i32.trunc_f32_u", Convert, Mvp, 0;
    I32TruncF64S, "i32.trunc_f64_s", Convert, Mvp, 0;
    I32TruncF64U, "i32.trunc_f64_u", Convert, Mvp, 0;
    I32TruncSatF32S, "i32.trunc_sat_f32_s", Convert, SatFloatToInt, 0;
    I32TruncSatF32U, "i32.trunc_sat_f32_u", Convert, SatFloatToInt, 0;
    I32TruncSatF64S, "i32.trunc_sat_f64_s", Convert, SatFloatToInt, 0;
    I32TruncSatF64U, "i32.trunc_sat_f64_u", Convert, SatFloatToInt, 0;
    I32WrapI64, "i32.wrap_i64", Convert, Mvp, 0;
    I64Eqz, "i64.eqz", Convert, Mvp, 0;
    I64ExtendI32S, "i64.extend_i32_s", Convert, Mvp, 0;
    I64ExtendI32U, "i64.extend_i32_u", Convert, Mvp, 0;
    I64ReinterpretF64, "i64.reinterpret_f64", Convert, Mvp, 0;
    I64TruncF32S, "i64.trunc_f32_s", Convert, Mvp, 0;
    I64TruncF32U, "i64.trunc_f32_u", Convert, Mvp, 0;
    I64TruncF64S, "i64.trunc_f64_s", Convert, Mvp, 0;
    I64TruncF64U, "i64.trunc_f64_u", Convert, Mvp, 0;
    I64TruncSatF32S, "i64.trunc_sat_f32_s", Convert, SatFloatToInt, 0;
    I64TruncSatF32U, "i64.trunc_sat_f32_u", Convert, SatFloatToInt, 0;
    I64TruncSatF64S, "i64.trunc_sat_f64_s", Convert, SatFloatToInt, 0;
    I64TruncSatF64U, "i64.trunc_sat_f64_u", Convert, SatFloatToInt, 0;
    // Load
    F32Load, "f32.load", Load, Mvp, 4;
    F64Load, "f64.load", Load, Mvp, 8;
    I32Load, "i32.load", Load, Mvp, 4;
    I32Load16S, "i32.load16_s", Load, Mvp, 2;
    I32Load16U, "i32.load16_u", Load, Mvp, 2;
    I32Load8S, "i32.load8_s", Load, Mvp, 1;
    I32Load8U, "i32.load8_u", Load, Mvp, 1;
    I64Load, "i64.load", Load, Mvp, 8;
    I64Load16S, "i64.load16_s", Load, Mvp, 2;
    I64Load16U, "i64.load16_u", Load, Mvp, 2;
    I64Load32S, "i64.load32_s", Load, Mvp, 4;
    I64Load32U, "i64.load32_u", Load, Mvp, 4;
    I64Load8S, "i64.load8_s", Load, Mvp, 1;
    I64Load8U, "i64.load8_u", Load, Mvp, 1;
    V128Load, "v128.load", Load, Simd, 16;
    V128Load16Splat, "v128.load16_splat", Load, Simd, 2;
    V128Load16X4S, "v128.load16x4_s", Load, Simd, 8;
    V128Load16X4U, "v128.load16x4_u", Load, Simd, 8;
    V128Load32Splat, "v128.load32_splat", Load, Simd, 4;
    V128Load32Zero, "v128.load32_zero", Load, Simd, 4;
    V128Load32X2S, "v128.load32x2_s", Load, Simd, 8;
    V128Load32X2U, "v128.load32x2_u", Load, Simd, 8;
    V128Load64Splat, "v128.load64_splat", Load, Simd, 8;
    V128Load64Zero, "v128.load64_zero", Load, Simd, 8;
    V128Load8Splat, "v128.load8_splat", Load, Simd, 1;
    V128Load8X8S, "v128.load8x8_s", Load, Simd, 8;
    V128Load8X8U, "v128.load8x8_u", Load, Simd, 8;
    // SimdLaneOp
    F32X4ExtractLane, "f32x4.extract_lane", SimdLaneOp, Simd, 0;
    F32X4ReplaceLane, "f32x4.replace_lane", SimdLaneOp, Simd, 0;
    F64X2ExtractLane, "f64x2.extract_lane", SimdLaneOp, Simd, 0;
    F64X2ReplaceLane, "f64x2.replace_lane", SimdLaneOp, Simd, 0;
    I16X8ExtractLaneS, "i16x8.extract_lane_s", SimdLaneOp, Simd, 0;
    I16X8ExtractLaneU, "i16x8.extract_lane_u", SimdLaneOp, Simd, 0;
    I16X8ReplaceLane, "i16x8.replace_lane", SimdLaneOp, Simd, 0;
    I32X4ExtractLane, "i32x4.extract_lane", SimdLaneOp, Simd, 0;
    I32X4ReplaceLane, "i32x4.replace_lane", SimdLaneOp, Simd, 0;
    I64X2ExtractLane, "i64x2.extract_lane", SimdLaneOp, Simd, 0;
    I64X2ReplaceLane, "i64x2.replace_lane", SimdLaneOp, Simd, 0;
    I8X16ExtractLaneS, "i8x16.extract_lane_s", SimdLaneOp, Simd, 0;
    I8X16ExtractLaneU, "i8x16.extract_lane_u", SimdLaneOp, Simd, 0;
    I8X16ReplaceLane, "i8x16.replace_lane", SimdLaneOp, Simd, 0;
    // SimdLoadLane
    V128Load16Lane, "v128.load16_lane", SimdLoadLane, Simd, 2;
    V128Load32Lane, "v128.load32_lane", SimdLoadLane, Simd, 4;
    V128Load64Lane, "v128.load64_lane", SimdLoadLane, Simd, 8;
    V128Load8Lane, "v128.load8_lane", SimdLoadLane, Simd, 1;
    // SimdShuffleOp
    I8X16Shuffle, "i8x16.shuffle", SimdShuffleOp, Simd, 0;
    // SimdStoreLane
    V128Store16Lane, "v128.store16_lane", SimdStoreLane, Simd, 2;
    V128Store32Lane, "v128.store32_lane", SimdStoreLane, Simd, 4;
    V128Store64Lane, "v128.store64_lane", SimdStoreLane, Simd, 8;
    V128Store8Lane, "v128.store8_lane", SimdStoreLane, Simd, 1;
    // Store
    F32Store, "f32.store", Store, Mvp, 4;
    F64Store, "f64.store", Store, Mvp, 8;
    I32Store, "i32.store", Store, Mvp, 4;
    I32Store16, "i32.store16", Store, Mvp, 2;
    I32Store8, "i32.store8", Store, Mvp, 1;
    I64Store, "i64.store", Store, Mvp, 8;
    I64Store16, "i64.store16", Store, Mvp, 2;
    I64Store32, "i64.store32", Store, Mvp, 4;
    I64Store8, "i64.store8", Store, Mvp, 1;
    V128Store, "v128.store", Store, Simd, 16;
    // Ternary
    F32X4RelaxedMadd, "f32x4.relaxed_madd", Ternary, RelaxedSimd, 0;
    F32X4RelaxedNmadd, "f32x4.relaxed_nmadd", Ternary, RelaxedSimd, 0;
    F64X2RelaxedMadd, "f64x2.relaxed_madd", Ternary, RelaxedSimd, 0;
    F64X2RelaxedNmadd, "f64x2.relaxed_nmadd", Ternary, RelaxedSimd, 0;
    I16X8RelaxedLaneSelect, "i16x8.relaxed_laneselect", Ternary, RelaxedSimd, 0;
    I32X4DotI8X16I7X16AddS, "i32x4.dot_i8x16_i7x16_add_s", Ternary, Simd, 0;
    I32X4RelaxedLaneSelect, "i32x4.relaxed_laneselect", Ternary, RelaxedSimd, 0;
    I64X2RelaxedLaneSelect, "i64x2.relaxed_laneselect", Ternary, RelaxedSimd, 0;
    I8X16RelaxedLaneSelect, "i8x16.relaxed_laneselect", Ternary, RelaxedSimd, 0;
    V128BitSelect, "v128.bitselect", Ternary, Simd, 0;
    // Unary
    F32Abs, "f32.abs", Unary, Mvp, 0;
    F32Ceil, "f32.ceil", Unary, Mvp, 0;
    F32Floor, "f32.floor", Unary, Mvp, 0;
    F32Nearest, "f32.nearest", Unary, Mvp, 0;
    F32Neg, "f32.neg", Unary, Mvp, 0;
    F32Sqrt, "f32.sqrt", Unary, Mvp, 0;
    F32Trunc, "f32.trunc", Unary, Mvp, 0;
    F32X4Abs, "f32x4.abs", Unary, Simd, 0;
    F32X4Ceil, "f32x4.ceil", Unary, Simd, 0;
    F32X4ConvertI32X4S, "f32x4.convert_i32x4_s", Unary, Simd, 0;
    F32X4ConvertI32X4U, "f32x4.convert_i32x4_u", Unary, Simd, 0;
    F32X4DemoteF64X2Zero, "f32x4.demote_f64x2_zero", Unary, Simd, 0;
    F32X4Floor, "f32x4.floor", Unary, Simd, 0;
    F32X4Nearest, "f32x4.nearest", Unary, Simd, 0;
    F32X4Neg, "f32x4.neg", Unary, Simd, 0;
    F32X4Splat, "f32x4.splat", Unary, Simd, 0;
    F32X4Sqrt, "f32x4.sqrt", Unary, Simd, 0;
    F32X4Trunc, "f32x4.trunc", Unary, Simd, 0;
    F64Abs, "f64.abs", Unary, Mvp, 0;
    F64Ceil, "f64.ceil", Unary, Mvp, 0;
    F64Floor, "f64.floor", Unary, Mvp, 0;
    F64Nearest, "f64.nearest", Unary, Mvp, 0;
    F64Neg, "f64.neg", Unary, Mvp, 0;
    F64Sqrt, "f64.sqrt", Unary, Mvp, 0;
    F64Trunc, "f64.trunc", Unary, Mvp, 0;
    F64X2Abs, "f64x2.abs", Unary, Simd, 0;
    F64X2Ceil, "f64x2.ceil", Unary, Simd, 0;
    F64X2ConvertLowI32X4S, "f64x2.convert_low_i32x4_s", Unary, Simd, 0;
    F64X2ConvertLowI32X4U, "f64x2.convert_low_i32x4_u", Unary, Simd, 0;
    F64X2Floor, "f64x2.floor", Unary, Simd, 0;
    F64X2Nearest, "f64x2.nearest", Unary, Simd, 0;
    F64X2Neg, "f64x2.neg", Unary, Simd, 0;
    F64X2PromoteLowF32X4, "f64x2.promote_low_f32x4", Unary, Simd, 0;
    F64X2Splat, "f64x2.splat", Unary, Simd, 0;
    F64X2Sqrt, "f64x2.sqrt", Unary, Simd, 0;
    F64X2Trunc, "f64x2.trunc", Unary, Simd, 0;
    I16X8Abs, "i16x8.abs", Unary, Simd, 0;
    I16X8AllTrue, "i16x8.all_true", Unary, Simd, 0;
    I16X8Bitmask, "i16x8.bitmask", Unary, Simd, 0;
    I16X8ExtaddPairwiseI8X16S, "i16x8.extadd_pairwise_i8x16_s", Unary, Simd, 0;
    I16X8ExtaddPairwiseI8X16U, "i16x8.extadd_pairwise_i8x16_u", Unary, Simd, 0;
    I16X8ExtendHighI8X16S, "i16x8.extend_high_i8x16_s", Unary, Simd, 0;
    I16X8ExtendHighI8X16U, "i16x8.extend_high_i8x16_u", Unary, Simd, 0;
    I16X8ExtendLowI8X16S, "i16x8.extend_low_i8x16_s", Unary, Simd, 0;
    I16X8ExtendLowI8X16U, "i16x8.extend_low_i8x16_u", Unary, Simd, 0;
    I16X8Neg, "i16x8.neg", Unary, Simd, 0;
    I16X8Splat, "i16x8.splat", Unary, Simd, 0;
    I32Clz, "i32.clz", Unary, Mvp, 0;
    I32Ctz, "i32.ctz", Unary, Mvp, 0;
    I32Extend16S, "i32.extend16_s", Unary, SignExtension, 0;
    I32Extend8S, "i32.extend8_s", Unary, SignExtension, 0;
    I32Popcnt, "i32.popcnt", Unary, Mvp, 0;
    I32X4Abs, "i32x4.abs", Unary, Simd, 0;
    I32X4AllTrue, "i32x4.all_true", Unary, Simd, 0;
    I32X4Bitmask, "i32x4.bitmask", Unary, Simd, 0;
    I32X4ExtaddPairwiseI16X8S, "i32x4.extadd_pairwise_i16x8_s", Unary, Simd, 0;
    I32X4ExtaddPairwiseI16X8U, "i32x4.extadd_pairwise_i16x8_u", Unary, Simd, 0;
    I32X4ExtendHighI16X8S, "i32x4.extend_high_i16x8_s", Unary, Simd, 0;
    I32X4ExtendHighI16X8U, "i32x4.extend_high_i16x8_u", Unary, Simd, 0;
    I32X4ExtendLowI16X8S, "i32x4.extend_low_i16x8_s", Unary, Simd, 0;
    I32X4ExtendLowI16X8U, "i32x4.extend_low_i16x8_u", Unary, Simd, 0;
    I32X4Neg, "i32x4.neg", Unary, Simd, 0;
    I32X4RelaxedTruncF32X4S, "i32x4.relaxed_trunc_f32x4_s", Unary, RelaxedSimd, 0;
    I32X4RelaxedTruncF32X4U, "i32x4.relaxed_trunc_f32x4_u", Unary, RelaxedSimd, 0;
    I32X4RelaxedTruncF64X2SZero, "i32x4.relaxed_trunc_f64x2_s_zero", Unary, RelaxedSimd, 0;
    I32X4RelaxedTruncF64X2UZero, "i32x4.relaxed_trunc_f64x2_u_zero", Unary, RelaxedSimd, 0;
    I32X4Splat, "i32x4.splat", Unary, Simd, 0;
    I32X4TruncSatF32X4S, "i32x4.trunc_sat_f32x4_s", Unary, Simd, 0;
    I32X4TruncSatF32X4U, "i32x4.trunc_sat_f32x4_u", Unary, Simd, 0;
    I32X4TruncSatF64X2SZero, "i32x4.trunc_sat_f64x2_s_zero", Unary, Simd, 0;
    I32X4TruncSatF64X2UZero, "i32x4.trunc_sat_f64x2_u_zero", Unary, Simd, 0;
    I64Clz, "i64.clz", Unary, Mvp, 0;
    I64Ctz, "i64.ctz", Unary, Mvp, 0;
    I64Extend16S, "i64.extend16_s", Unary, SignExtension, 0;
    I64Extend32S, "i64.extend32_s", Unary, SignExtension, 0;
    I64Extend8S, "i64.extend8_s", Unary, SignExtension, 0;
    I64Popcnt, "i64.popcnt", Unary, Mvp, 0;
    I64X2Abs, "i64x2.abs", Unary, Simd, 0;
    I64X2AllTrue, "i64x2.all_true", Unary, Simd, 0;
    I64X2Bitmask, "i64x2.bitmask", Unary, Simd, 0;
    I64X2ExtendHighI32X4S, "i64x2.extend_high_i32x4_s", Unary, Simd, 0;
    I64X2ExtendHighI32X4U, "i64x2.extend_high_i32x4_u", Unary, Simd, 0;
    I64X2ExtendLowI32X4S, "i64x2.extend_low_i32x4_s", Unary, Simd, 0;
    I64X2ExtendLowI32X4U, "i64x2.extend_low_i32x4_u", Unary, Simd, 0;
    I64X2Neg, "i64x2.neg", Unary, Simd, 0;
    I64X2Splat, "i64x2.splat", Unary, Simd, 0;
    I8X16Abs, "i8x16.abs", Unary, Simd, 0;
    I8X16AllTrue, "i8x16.all_true", Unary, Simd, 0;
    I8X16Bitmask, "i8x16.bitmask", Unary, Simd, 0;
    I8X16Neg, "i8x16.neg", Unary, Simd, 0;
    I8X16Popcnt, "i8x16.popcnt", Unary, Simd, 0;
    I8X16Splat, "i8x16.splat", Unary, Simd, 0;
    V128AnyTrue, "v128.any_true", Unary, Simd, 0;
    V128Not, "v128.not", Unary, Simd, 0;
}

impl Opcode {
    pub fn has_memarg(self) -> bool {
        use OpcodeClass::*;
        matches!(
            self.class(),
            Load | Store
                | AtomicLoad
                | AtomicStore
                | AtomicRmw
                | AtomicRmwCmpxchg
                | AtomicNotify
                | AtomicWait
                | SimdLoadLane
                | SimdStoreLane
        )
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("i32.add", OpcodeClass::Binary, Feature::Mvp, 0)]
    #[case("i64.load32_u", OpcodeClass::Load, Feature::Mvp, 4)]
    #[case("f64.store", OpcodeClass::Store, Feature::Mvp, 8)]
    #[case("i32.extend8_s", OpcodeClass::Unary, Feature::SignExtension, 0)]
    #[case("i64.trunc_sat_f64_u", OpcodeClass::Convert, Feature::SatFloatToInt, 0)]
    #[case("v128.load8x8_s", OpcodeClass::Load, Feature::Simd, 8)]
    #[case("v128.load16_lane", OpcodeClass::SimdLoadLane, Feature::Simd, 2)]
    #[case("i8x16.shuffle", OpcodeClass::SimdShuffleOp, Feature::Simd, 0)]
    #[case("i32x4.extract_lane", OpcodeClass::SimdLaneOp, Feature::Simd, 0)]
    #[case("v128.bitselect", OpcodeClass::Ternary, Feature::Simd, 0)]
    #[case("i64.atomic.rmw16.cmpxchg_u", OpcodeClass::AtomicRmwCmpxchg, Feature::Threads, 2)]
    #[case("memory.atomic.wait64", OpcodeClass::AtomicWait, Feature::Threads, 8)]
    #[case("atomic.fence", OpcodeClass::AtomicFence, Feature::Threads, 0)]
    #[case("f32.const", OpcodeClass::Const, Feature::Mvp, 0)]
    #[case("v128.const", OpcodeClass::Const, Feature::Simd, 0)]
    fn lookup_mnemonic(
        #[case] mnemonic: &str,
        #[case] class: OpcodeClass,
        #[case] feature: Feature,
        #[case] align: u32,
    ) {
        let op = Opcode::from_mnemonic(mnemonic).unwrap();
        assert_eq!(op.name(), mnemonic);
        assert_eq!(op.class(), class);
        assert_eq!(op.feature(), feature);
        assert_eq!(op.natural_alignment(), align);
    }

    #[test]
    fn unknown_mnemonic() {
        assert_eq!(Opcode::from_mnemonic("i32.frobnicate"), None);
        assert_eq!(Opcode::from_mnemonic("block"), None);
        assert_eq!(Opcode::from_mnemonic("local.get"), None);
    }

    #[test]
    fn memarg_classes() {
        assert!(Opcode::from_mnemonic("i32.load").unwrap().has_memarg());
        assert!(Opcode::from_mnemonic("i32.atomic.rmw.add").unwrap().has_memarg());
        assert!(!Opcode::from_mnemonic("i32.add").unwrap().has_memarg());
        assert!(!Opcode::from_mnemonic("atomic.fence").unwrap().has_memarg());
    }
}
