use super::{
    is_block_instr_keyword, is_expr, is_instr, parse_memarg_nat, ParseErrorKind, Parser, Result,
    CODE_METADATA_PREFIX,
};
use crate::lexer::{Float, Sign, TokenKind, TokenSource, TokenType};
use crate::literal;
use wastir_ir::{
    Block, Catch, Const, ExpectedNan, Expr, ExprKind, ExprList, FloatLiteral, FuncDeclaration,
    Location, MemArg, Opcode, OpcodeClass, TableCatch, TableCatchKind, TryKind, V128Lanes, Var,
};

impl<'s, S: TokenSource<'s>> Parser<'s, S> {
    // Instructions until a token which cannot start one. A broken instruction is dropped and
    // parsing continues at the next instruction
    pub(super) fn parse_instr_list(&mut self, exprs: &mut ExprList) -> Result<()> {
        while is_instr(self.peek(0), self.peek(1)) {
            let mut parsed = vec![];
            match self.parse_instr(&mut parsed) {
                Ok(()) => exprs.append(&mut parsed),
                Err(_) => self.synchronize(is_instr)?,
            }
        }
        Ok(())
    }

    // Instruction list which must be followed by `)`. Since `parse_instr_list` consumes every `(`
    // starting an instruction, any `(` left here is an error
    pub(super) fn parse_terminating_instr_list(&mut self, exprs: &mut ExprList) -> Result<()> {
        let result = self.parse_instr_list(exprs);
        if self.peek(0) == TokenType::LParen {
            return self.error_expected(&["an instr"]);
        }
        result
    }

    fn parse_instr(&mut self, exprs: &mut ExprList) -> Result<()> {
        match self.peek(0) {
            TokenType::Keyword(kw) if is_block_instr_keyword(kw) => self.parse_block_instr(exprs),
            TokenType::Keyword(_) => {
                let expr = self.parse_plain_instr()?;
                exprs.push(expr);
                Ok(())
            }
            TokenType::LParenAnnotation(_) => {
                let expr = self.parse_code_metadata()?;
                exprs.push(expr);
                Ok(())
            }
            _ => self.parse_expr(exprs),
        }
    }

    fn parse_var_or_zero(&mut self, loc: &Location) -> Result<Var> {
        Ok(self
            .parse_var_opt()?
            .unwrap_or_else(|| Var::Index(0, loc.clone())))
    }

    // Memory index of memory instructions, which can only be written with multiple memories
    fn parse_memory_var_opt(&mut self, loc: &Location) -> Result<Var> {
        if self.features.multi_memory {
            self.parse_var_or_zero(loc)
        } else {
            Ok(Var::Index(0, loc.clone()))
        }
    }

    // https://webassembly.github.io/spec/core/text/instructions.html#plain-instructions
    pub(super) fn parse_plain_instr(&mut self) -> Result<Expr> {
        let tok = self.consume();
        let loc = tok.loc.clone();
        let kw = match tok.kind {
            TokenKind::Keyword(kw) => kw,
            _ => {
                let got = tok.to_string();
                return self.fail(
                    loc,
                    ParseErrorKind::UnexpectedToken {
                        got,
                        expected: "an instr".to_string(),
                    },
                );
            }
        };
        let features = self.features;

        let kind = match kw {
            "unreachable" => ExprKind::Unreachable,
            "nop" => ExprKind::Nop,
            "drop" => ExprKind::Drop,
            "select" => {
                let mut tys = vec![];
                while self.match_lpar("result").is_some() {
                    tys.extend(self.parse_value_type_list()?);
                    self.expect_rpar()?;
                }
                if !tys.is_empty() {
                    self.require(features.reference_types, kw, &loc);
                }
                ExprKind::Select(tys)
            }
            "br" => ExprKind::Br(self.parse()?),
            "br_if" => ExprKind::BrIf(self.parse()?),
            "br_table" => {
                let mut targets = self.parse_var_list()?;
                match targets.pop() {
                    Some(default) => ExprKind::BrTable { targets, default },
                    None => return self.error_expected(&["a numeric index", "a name"]),
                }
            }
            "return" => ExprKind::Return,
            "call" => ExprKind::Call(self.parse()?),
            "call_indirect" => {
                let (table, decl) = self.parse_call_indirect_operands(&loc)?;
                ExprKind::CallIndirect { table, decl }
            }
            "return_call" => {
                self.require(features.tail_call, kw, &loc);
                ExprKind::ReturnCall(self.parse()?)
            }
            "return_call_indirect" => {
                self.require(features.tail_call, kw, &loc);
                let (table, decl) = self.parse_call_indirect_operands(&loc)?;
                ExprKind::ReturnCallIndirect { table, decl }
            }
            "call_ref" => {
                self.require(features.function_references, kw, &loc);
                ExprKind::CallRef(self.parse()?)
            }
            "local.get" => ExprKind::LocalGet(self.parse()?),
            "local.set" => ExprKind::LocalSet(self.parse()?),
            "local.tee" => ExprKind::LocalTee(self.parse()?),
            "global.get" => ExprKind::GlobalGet(self.parse()?),
            "global.set" => ExprKind::GlobalSet(self.parse()?),
            "table.get" => {
                self.require(features.reference_types, kw, &loc);
                ExprKind::TableGet(self.parse_var_or_zero(&loc)?)
            }
            "table.set" => {
                self.require(features.reference_types, kw, &loc);
                ExprKind::TableSet(self.parse_var_or_zero(&loc)?)
            }
            "table.grow" => {
                self.require(features.reference_types, kw, &loc);
                ExprKind::TableGrow(self.parse_var_or_zero(&loc)?)
            }
            "table.size" => {
                self.require(features.reference_types, kw, &loc);
                ExprKind::TableSize(self.parse_var_or_zero(&loc)?)
            }
            "table.fill" => {
                self.require(features.reference_types, kw, &loc);
                ExprKind::TableFill(self.parse_var_or_zero(&loc)?)
            }
            "table.copy" => {
                self.require(features.bulk_memory, kw, &loc);
                let (dst, src) = match self.parse_var_opt()? {
                    Some(dst) => (dst, self.parse()?),
                    None => (Var::Index(0, loc.clone()), Var::Index(0, loc.clone())),
                };
                ExprKind::TableCopy { dst, src }
            }
            "table.init" => {
                self.require(features.bulk_memory, kw, &loc);
                // `table.init $seg` or `table.init $table $seg`
                let first = self.parse()?;
                match self.parse_var_opt()? {
                    Some(segment) => ExprKind::TableInit {
                        segment,
                        table: first,
                    },
                    None => ExprKind::TableInit {
                        segment: first,
                        table: Var::Index(0, loc.clone()),
                    },
                }
            }
            "elem.drop" => {
                self.require(features.bulk_memory, kw, &loc);
                ExprKind::ElemDrop(self.parse()?)
            }
            "memory.size" => ExprKind::MemorySize(self.parse_memory_var_opt(&loc)?),
            "memory.grow" => ExprKind::MemoryGrow(self.parse_memory_var_opt(&loc)?),
            "memory.fill" => {
                self.require(features.bulk_memory, kw, &loc);
                ExprKind::MemoryFill(self.parse_memory_var_opt(&loc)?)
            }
            "memory.copy" => {
                self.require(features.bulk_memory, kw, &loc);
                let dst = if features.multi_memory {
                    self.parse_var_opt()?
                } else {
                    None
                };
                let (dst, src) = match dst {
                    Some(dst) => (dst, self.parse()?),
                    None => (Var::Index(0, loc.clone()), Var::Index(0, loc.clone())),
                };
                ExprKind::MemoryCopy { dst, src }
            }
            "memory.init" => {
                self.require(features.bulk_memory, kw, &loc);
                // `memory.init $seg` or `memory.init $mem $seg`
                let first = self.parse()?;
                let second = if features.multi_memory {
                    self.parse_var_opt()?
                } else {
                    None
                };
                match second {
                    Some(segment) => ExprKind::MemoryInit {
                        segment,
                        memory: first,
                    },
                    None => ExprKind::MemoryInit {
                        segment: first,
                        memory: Var::Index(0, loc.clone()),
                    },
                }
            }
            "data.drop" => {
                self.require(features.bulk_memory, kw, &loc);
                ExprKind::DataDrop(self.parse()?)
            }
            "ref.null" => {
                self.require(features.reference_types, kw, &loc);
                ExprKind::RefNull(self.parse_heap_type()?)
            }
            "ref.is_null" => {
                self.require(features.reference_types, kw, &loc);
                ExprKind::RefIsNull
            }
            "ref.func" => {
                self.require(features.reference_types, kw, &loc);
                ExprKind::RefFunc(self.parse()?)
            }
            "throw" => {
                self.require(features.exceptions, kw, &loc);
                ExprKind::Throw(self.parse()?)
            }
            "rethrow" => {
                self.require(features.exceptions, kw, &loc);
                ExprKind::Rethrow(self.parse()?)
            }
            _ => match Opcode::from_mnemonic(kw) {
                Some(opcode) => {
                    self.require(features.is_enabled(opcode.feature()), kw, &loc);
                    self.parse_opcode_operands(opcode, &loc)?
                }
                None => {
                    return self.fail(
                        loc,
                        ParseErrorKind::UnexpectedToken {
                            got: kw.to_string(),
                            expected: "an instr".to_string(),
                        },
                    )
                }
            },
        };

        Ok(Expr::new(kind, loc))
    }

    // Table index followed by a type use. The table index defaults to 0
    fn parse_call_indirect_operands(&mut self, loc: &Location) -> Result<(Var, FuncDeclaration)> {
        let table = self.parse_var_or_zero(loc)?;
        let decl = self.parse_func_declaration(None)?;
        Ok((table, decl))
    }

    fn parse_opcode_operands(&mut self, opcode: Opcode, loc: &Location) -> Result<ExprKind> {
        Ok(match opcode.class() {
            OpcodeClass::Unary => ExprKind::Unary(opcode),
            OpcodeClass::Binary => ExprKind::Binary(opcode),
            OpcodeClass::Ternary => ExprKind::Ternary(opcode),
            OpcodeClass::Compare => ExprKind::Compare(opcode),
            OpcodeClass::Convert => ExprKind::Convert(opcode),
            OpcodeClass::Const => ExprKind::Const(self.parse_const_operand(opcode, false)?),
            OpcodeClass::Load => ExprKind::Load {
                opcode,
                memarg: self.parse_memarg(opcode, loc)?,
            },
            OpcodeClass::Store => ExprKind::Store {
                opcode,
                memarg: self.parse_memarg(opcode, loc)?,
            },
            OpcodeClass::AtomicLoad => ExprKind::AtomicLoad {
                opcode,
                memarg: self.parse_memarg(opcode, loc)?,
            },
            OpcodeClass::AtomicStore => ExprKind::AtomicStore {
                opcode,
                memarg: self.parse_memarg(opcode, loc)?,
            },
            OpcodeClass::AtomicRmw => ExprKind::AtomicRmw {
                opcode,
                memarg: self.parse_memarg(opcode, loc)?,
            },
            OpcodeClass::AtomicRmwCmpxchg => ExprKind::AtomicRmwCmpxchg {
                opcode,
                memarg: self.parse_memarg(opcode, loc)?,
            },
            OpcodeClass::AtomicWait => ExprKind::AtomicWait {
                opcode,
                memarg: self.parse_memarg(opcode, loc)?,
            },
            OpcodeClass::AtomicNotify => ExprKind::AtomicNotify {
                opcode,
                memarg: self.parse_memarg(opcode, loc)?,
            },
            // Only the sequentially consistent ordering exists so far
            OpcodeClass::AtomicFence => ExprKind::AtomicFence(0),
            OpcodeClass::SimdLaneOp => ExprKind::SimdLaneOp {
                opcode,
                lane: self.parse_lane_index()?,
            },
            OpcodeClass::SimdLoadLane => {
                let memarg = self.parse_memarg(opcode, loc)?;
                let lane = self.parse_lane_index()?;
                ExprKind::SimdLoadLane {
                    opcode,
                    memarg,
                    lane,
                }
            }
            OpcodeClass::SimdStoreLane => {
                let memarg = self.parse_memarg(opcode, loc)?;
                let lane = self.parse_lane_index()?;
                ExprKind::SimdStoreLane {
                    opcode,
                    memarg,
                    lane,
                }
            }
            OpcodeClass::SimdShuffleOp => {
                let mut lanes = [0u8; 16];
                for lane in lanes.iter_mut() {
                    *lane = self.parse_lane_index()?;
                }
                ExprKind::SimdShuffleOp { opcode, lanes }
            }
        })
    }

    // https://webassembly.github.io/spec/core/text/instructions.html#memory-instructions
    //
    // memidx? offset=N? align=N?
    fn parse_memarg(&mut self, opcode: Opcode, loc: &Location) -> Result<MemArg> {
        let memory = if self.peek_memarg_memory_var(opcode) {
            self.parse()?
        } else {
            Var::Index(0, loc.clone())
        };
        let offset = self.parse_offset_opt()?;
        let align = self.parse_align_opt(opcode)?;
        Ok(MemArg {
            memory,
            offset,
            align,
        })
    }

    // Note: A lane index follows the memarg of `v128.load8_lane` and so on. A single number there
    // is the lane, not the memory.
    fn peek_memarg_memory_var(&mut self, opcode: Opcode) -> bool {
        if !self.features.multi_memory {
            return false;
        }
        match self.peek(0) {
            TokenType::Ident => true,
            TokenType::Nat => {
                let has_lane = matches!(
                    opcode.class(),
                    OpcodeClass::SimdLoadLane | OpcodeClass::SimdStoreLane
                );
                !has_lane
                    || match self.peek(1) {
                        TokenType::Nat => true,
                        TokenType::Keyword(kw) => kw.starts_with("offset=") || kw.starts_with("align="),
                        _ => false,
                    }
            }
            _ => false,
        }
    }

    fn parse_offset_opt(&mut self) -> Result<u64> {
        let tok = self.peek_cloned();
        let digits = match tok.kind {
            TokenKind::Keyword(kw) => match kw.strip_prefix("offset=") {
                Some(digits) => digits,
                None => return Ok(0),
            },
            _ => return Ok(0),
        };
        self.consume();
        let offset = match parse_memarg_nat(digits) {
            Some(offset) => offset,
            None => return self.fail(tok.loc, ParseErrorKind::InvalidOffset(tok.text.to_string())),
        };
        if !self.features.memory64 && offset > u32::MAX as u64 {
            return self.fail(tok.loc, ParseErrorKind::OffsetOutOfRange);
        }
        Ok(offset)
    }

    fn parse_align_opt(&mut self, opcode: Opcode) -> Result<u32> {
        let tok = self.peek_cloned();
        let digits = match tok.kind {
            TokenKind::Keyword(kw) => match kw.strip_prefix("align=") {
                Some(digits) => digits,
                None => return Ok(opcode.natural_alignment()),
            },
            _ => return Ok(opcode.natural_alignment()),
        };
        self.consume();
        let align = match parse_memarg_nat(digits).and_then(|a| u32::try_from(a).ok()) {
            Some(align) => align,
            None => {
                return self.fail(tok.loc, ParseErrorKind::InvalidAlignment(tok.text.to_string()))
            }
        };
        if !align.is_power_of_two() {
            return self.fail(tok.loc, ParseErrorKind::AlignmentNotPowerOfTwo);
        }
        Ok(align)
    }

    fn parse_lane_index(&mut self) -> Result<u8> {
        let tok = self.peek_cloned();
        let lane = match tok.kind {
            TokenKind::Nat(base, digits) => {
                literal::parse_u64(digits, base).and_then(|n| u8::try_from(n).ok())
            }
            TokenKind::Int(..) => None,
            _ => return self.error_expected(&["a natural number"]),
        };
        self.consume();
        match lane {
            Some(lane) => Ok(lane),
            None => self.fail(tok.loc, ParseErrorKind::LaneOutOfRange(tok.text.to_string())),
        }
    }

    // Operand of `t.const`. NaN patterns are only accepted in expected results of assertions
    pub(super) fn parse_const_operand(
        &mut self,
        opcode: Opcode,
        allow_nan_pattern: bool,
    ) -> Result<Const> {
        Ok(match opcode {
            Opcode::I32Const => Const::I32(self.parse_int_literal(32)? as u32),
            Opcode::I64Const => Const::I64(self.parse_int_literal(64)?),
            Opcode::F32Const => {
                Const::F32(self.parse_float_literal(allow_nan_pattern, literal::f32_bits)?)
            }
            Opcode::F64Const => {
                Const::F64(self.parse_float_literal(allow_nan_pattern, literal::f64_bits)?)
            }
            _ => Const::V128(self.parse_v128_lanes(allow_nan_pattern)?),
        })
    }

    fn parse_int_literal(&mut self, bits: u32) -> Result<u64> {
        let tok = self.peek_cloned();
        let value = match tok.kind {
            TokenKind::Nat(base, digits) => literal::int_bits(None, base, digits, bits),
            TokenKind::Int(sign, base, digits) => literal::int_bits(Some(sign), base, digits, bits),
            _ => return self.error_expected(&["a numeric literal"]),
        };
        self.consume();
        match value {
            Some(value) => Ok(value),
            None => self.fail(tok.loc, ParseErrorKind::InvalidLiteral(tok.text.to_string())),
        }
    }

    fn parse_float_literal<T>(
        &mut self,
        allow_nan_pattern: bool,
        to_bits: fn(Sign, &Float<'_>) -> Option<T>,
    ) -> Result<FloatLiteral<T>> {
        let tok = self.peek_cloned();
        let value = match tok.kind {
            TokenKind::Keyword("nan:canonical") if allow_nan_pattern => {
                Some(FloatLiteral::Nan(ExpectedNan::Canonical))
            }
            TokenKind::Keyword("nan:arithmetic") if allow_nan_pattern => {
                Some(FloatLiteral::Nan(ExpectedNan::Arithmetic))
            }
            TokenKind::Float(sign, float) => to_bits(sign, &float).map(FloatLiteral::Bits),
            // Integer literals are valid float literals
            TokenKind::Nat(base, frac) => {
                to_bits(Sign::Plus, &Float::Val { base, frac, exp: None }).map(FloatLiteral::Bits)
            }
            TokenKind::Int(sign, base, frac) => {
                to_bits(sign, &Float::Val { base, frac, exp: None }).map(FloatLiteral::Bits)
            }
            _ => return self.error_expected(&["a numeric literal"]),
        };
        self.consume();
        match value {
            Some(value) => Ok(value),
            None => self.fail(tok.loc, ParseErrorKind::InvalidLiteral(tok.text.to_string())),
        }
    }

    // https://webassembly.github.io/simd/core/text/instructions.html#vector-instructions
    fn parse_v128_lanes(&mut self, allow_nan_pattern: bool) -> Result<V128Lanes> {
        let shape = match self.peek(0) {
            TokenType::Keyword(
                shape @ ("i8x16" | "i16x8" | "i32x4" | "i64x2" | "f32x4" | "f64x2"),
            ) => {
                self.consume();
                shape
            }
            _ => {
                return self.error_expected(&["i8x16", "i16x8", "i32x4", "i64x2", "f32x4", "f64x2"])
            }
        };

        Ok(match shape {
            "i8x16" => {
                let mut lanes = [0u8; 16];
                for lane in lanes.iter_mut() {
                    *lane = self.parse_int_literal(8)? as u8;
                }
                V128Lanes::I8x16(lanes)
            }
            "i16x8" => {
                let mut lanes = [0u16; 8];
                for lane in lanes.iter_mut() {
                    *lane = self.parse_int_literal(16)? as u16;
                }
                V128Lanes::I16x8(lanes)
            }
            "i32x4" => {
                let mut lanes = [0u32; 4];
                for lane in lanes.iter_mut() {
                    *lane = self.parse_int_literal(32)? as u32;
                }
                V128Lanes::I32x4(lanes)
            }
            "i64x2" => {
                let mut lanes = [0u64; 2];
                for lane in lanes.iter_mut() {
                    *lane = self.parse_int_literal(64)?;
                }
                V128Lanes::I64x2(lanes)
            }
            "f32x4" => {
                let mut lanes = [FloatLiteral::Bits(0u32); 4];
                for lane in lanes.iter_mut() {
                    *lane = self.parse_float_literal(allow_nan_pattern, literal::f32_bits)?;
                }
                V128Lanes::F32x4(lanes)
            }
            _ => {
                let mut lanes = [FloatLiteral::Bits(0u64); 2];
                for lane in lanes.iter_mut() {
                    *lane = self.parse_float_literal(allow_nan_pattern, literal::f64_bits)?;
                }
                V128Lanes::F64x2(lanes)
            }
        })
    }

    // `$label? typeuse? (param ...)* (result ...)*` at the beginning of every block
    fn parse_block_header(&mut self) -> Result<Block> {
        let label = self.parse_bind_var_opt();
        let decl = self.parse_func_declaration(None)?;
        Ok(Block {
            label,
            decl,
            ..Block::default()
        })
    }

    fn parse_end(&mut self, block: &mut Block) -> Result<()> {
        block.end_loc = self.expect_keyword("end")?;
        self.parse_end_label_opt(&block.label);
        Ok(())
    }

    // https://webassembly.github.io/spec/core/text/instructions.html#control-instructions
    fn parse_block_instr(&mut self, exprs: &mut ExprList) -> Result<()> {
        let tok = self.consume();
        let loc = tok.loc.clone();
        let features = self.features;

        let kind = match tok.kind {
            TokenKind::Keyword("block") => {
                let mut block = self.parse_block_header()?;
                self.parse_instr_list(&mut block.exprs)?;
                self.parse_end(&mut block)?;
                ExprKind::Block(block)
            }
            TokenKind::Keyword("loop") => {
                let mut block = self.parse_block_header()?;
                self.parse_instr_list(&mut block.exprs)?;
                self.parse_end(&mut block)?;
                ExprKind::Loop(block)
            }
            TokenKind::Keyword("if") => {
                let mut block = self.parse_block_header()?;
                self.parse_instr_list(&mut block.exprs)?;
                let mut false_ = vec![];
                let mut false_end_loc = Location::default();
                if let Some(else_loc) = self.match_keyword("else") {
                    self.parse_end_label_opt(&block.label);
                    self.parse_instr_list(&mut false_)?;
                    false_end_loc = self.expect_keyword("end")?;
                    block.end_loc = else_loc;
                    self.parse_end_label_opt(&block.label);
                } else {
                    self.parse_end(&mut block)?;
                }
                ExprKind::If {
                    block,
                    false_,
                    false_end_loc,
                }
            }
            TokenKind::Keyword("try") => {
                self.require(features.exceptions, "try", &loc);
                let mut block = self.parse_block_header()?;
                self.parse_instr_list(&mut block.exprs)?;
                let kind = if let Some(delegate_loc) = self.match_keyword("delegate") {
                    block.end_loc = delegate_loc;
                    TryKind::Delegate(self.parse()?)
                } else {
                    let kind = match self.peek(0) {
                        TokenType::Keyword("catch" | "catch_all") => {
                            TryKind::Catch(self.parse_catch_instr_list()?)
                        }
                        _ => TryKind::Plain,
                    };
                    self.parse_end(&mut block)?;
                    kind
                };
                ExprKind::Try { block, kind }
            }
            TokenKind::Keyword("try_table") => {
                self.require(features.exceptions, "try_table", &loc);
                let mut block = self.parse_block_header()?;
                let catches = self.parse_table_catches()?;
                self.parse_instr_list(&mut block.exprs)?;
                self.parse_end(&mut block)?;
                ExprKind::TryTable { block, catches }
            }
            _ => {
                let got = tok.to_string();
                return self.fail(
                    loc,
                    ParseErrorKind::UnexpectedToken {
                        got,
                        expected: "a block instr".to_string(),
                    },
                );
            }
        };

        exprs.push(Expr::new(kind, loc));
        Ok(())
    }

    fn check_catch_all(&mut self, catches: &[Catch], loc: &Location) {
        if catches.iter().any(Catch::is_catch_all) {
            self.report(loc.clone(), ParseErrorKind::MultipleCatchAll);
        }
    }

    // `catch $tag instr*` and `catch_all instr*` clauses of a flat `try`
    fn parse_catch_instr_list(&mut self) -> Result<Vec<Catch>> {
        let mut catches = vec![];
        loop {
            let (loc, var) = if let Some(loc) = self.match_keyword("catch") {
                (loc, Some(self.parse()?))
            } else if let Some(loc) = self.match_keyword("catch_all") {
                self.check_catch_all(&catches, &loc);
                (loc, None)
            } else {
                return Ok(catches);
            };
            let mut exprs = vec![];
            self.parse_instr_list(&mut exprs)?;
            catches.push(Catch { loc, var, exprs });
        }
    }

    // `(catch $tag instr*)` and `(catch_all instr*)` clauses of a folded `try`
    fn parse_catch_expr_list(&mut self) -> Result<Vec<Catch>> {
        let mut catches = vec![];
        loop {
            let (loc, var) = if let Some(loc) = self.match_lpar("catch") {
                (loc, Some(self.parse()?))
            } else if let Some(loc) = self.match_lpar("catch_all") {
                self.check_catch_all(&catches, &loc);
                (loc, None)
            } else {
                return Ok(catches);
            };
            let mut exprs = vec![];
            self.parse_terminating_instr_list(&mut exprs)?;
            self.expect_rpar()?;
            catches.push(Catch { loc, var, exprs });
        }
    }

    // https://webassembly.github.io/exception-handling/core/text/instructions.html
    //
    // (catch $tag $label) (catch_ref $tag $label) (catch_all $label) (catch_all_ref $label)
    fn parse_table_catches(&mut self) -> Result<Vec<TableCatch>> {
        let mut catches = vec![];
        loop {
            if self.peek(0) != TokenType::LParen {
                return Ok(catches);
            }
            let kind = match self.peek(1) {
                TokenType::Keyword("catch") => TableCatchKind::Catch,
                TokenType::Keyword("catch_ref") => TableCatchKind::CatchRef,
                TokenType::Keyword("catch_all") => TableCatchKind::CatchAll,
                TokenType::Keyword("catch_all_ref") => TableCatchKind::CatchAllRef,
                _ => return Ok(catches),
            };
            self.consume();
            let loc = self.consume().loc;
            let tag = if kind.is_catch_all() {
                None
            } else {
                Some(self.parse()?)
            };
            let target = self.parse()?;
            self.expect_rpar()?;
            catches.push(TableCatch {
                loc,
                kind,
                tag,
                target,
            });
        }
    }

    // https://webassembly.github.io/spec/core/text/instructions.html#folded-instructions
    //
    // Folded instructions are flattened: operands are appended to `exprs` before the instruction
    pub(super) fn parse_expr(&mut self, exprs: &mut ExprList) -> Result<()> {
        self.expect_lparen()?;
        let kw = match self.peek(0) {
            TokenType::Keyword(kw) => kw,
            _ => return self.error_expected(&["an instr"]),
        };

        if !is_block_instr_keyword(kw) {
            let expr = self.parse_plain_instr()?;
            self.parse_expr_list(exprs)?;
            exprs.push(expr);
            return self.expect_rpar();
        }

        let loc = self.consume().loc;
        let features = self.features;
        let kind = match kw {
            "block" | "loop" => {
                let mut block = self.parse_block_header()?;
                self.parse_terminating_instr_list(&mut block.exprs)?;
                block.end_loc = self.peek_loc();
                if kw == "block" {
                    ExprKind::Block(block)
                } else {
                    ExprKind::Loop(block)
                }
            }
            "if" => {
                let mut block = self.parse_block_header()?;
                // Condition operands come before the `then` clause
                self.parse_expr_list(exprs)?;
                self.expect_lpar("then")?;
                self.parse_terminating_instr_list(&mut block.exprs)?;
                block.end_loc = self.peek_loc();
                self.expect_rpar()?;
                let mut false_ = vec![];
                let mut false_end_loc = Location::default();
                if self.match_lpar("else").is_some() {
                    self.parse_terminating_instr_list(&mut false_)?;
                    false_end_loc = self.peek_loc();
                    self.expect_rpar()?;
                }
                ExprKind::If {
                    block,
                    false_,
                    false_end_loc,
                }
            }
            "try" => {
                self.require(features.exceptions, kw, &loc);
                let mut block = self.parse_block_header()?;
                self.expect_lpar("do")?;
                self.parse_terminating_instr_list(&mut block.exprs)?;
                block.end_loc = self.peek_loc();
                self.expect_rpar()?;
                let kind = if self.match_lpar("delegate").is_some() {
                    let var = self.parse()?;
                    self.expect_rpar()?;
                    TryKind::Delegate(var)
                } else {
                    let catches = self.parse_catch_expr_list()?;
                    if catches.is_empty() {
                        TryKind::Plain
                    } else {
                        TryKind::Catch(catches)
                    }
                };
                ExprKind::Try { block, kind }
            }
            _ => {
                self.require(features.exceptions, kw, &loc);
                let mut block = self.parse_block_header()?;
                let catches = self.parse_table_catches()?;
                self.parse_terminating_instr_list(&mut block.exprs)?;
                block.end_loc = self.peek_loc();
                ExprKind::TryTable { block, catches }
            }
        };

        exprs.push(Expr::new(kind, loc));
        self.expect_rpar()
    }

    fn parse_expr_list(&mut self, exprs: &mut ExprList) -> Result<()> {
        while is_expr(self.peek(0), self.peek(1)) {
            self.parse_expr(exprs)?;
        }
        Ok(())
    }

    // https://github.com/WebAssembly/tool-conventions/blob/main/CodeMetadata.md
    //
    // (@metadata.code.branch_hint "\01")
    fn parse_code_metadata(&mut self) -> Result<Expr> {
        let tok = self.consume();
        let name = match tok.kind {
            TokenKind::LParenAnnotation(name) => name.strip_prefix(CODE_METADATA_PREFIX).unwrap_or(name),
            _ => return self.error_expected(&["an annotation"]),
        };
        let data = self.parse_text_list();
        self.expect_rpar()?;
        Ok(Expr::new(
            ExprKind::CodeMetadata {
                name: name.to_string(),
                data,
            },
            tok.loc,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{messages, parse_wat, parse_wat_with};
    use crate::options::Features;
    use wastir_ir::*;

    fn body(source: &str) -> (ExprList, Vec<String>) {
        body_with(source, Features::default())
    }

    fn body_with(source: &str, features: Features) -> (ExprList, Vec<String>) {
        let (module, errors) = parse_wat_with(&format!("(func {})", source), features);
        let exprs = module.func(0).map(|f| f.exprs.clone()).unwrap_or_default();
        (exprs, messages(&errors))
    }

    fn all_features() -> Features {
        Features::all()
    }

    #[test]
    fn flat_and_folded_are_equivalent() {
        let (flat, errors) = body("i32.const 1 i32.const 2 i32.add drop");
        assert!(errors.is_empty(), "{:?}", errors);
        let (folded, errors) = body("(drop (i32.add (i32.const 1) (i32.const 2)))");
        assert!(errors.is_empty(), "{:?}", errors);
        let kinds = |exprs: &ExprList| exprs.iter().map(|e| e.kind.clone()).collect::<Vec<_>>();
        assert_eq!(kinds(&flat), kinds(&folded));
        assert!(matches!(folded[2].kind, ExprKind::Binary(Opcode::I32Add)));
    }

    #[test]
    fn blocks_with_labels() {
        let (exprs, errors) = body("block $b (result i32) loop $l br $l end $l i32.const 0 end $b");
        assert!(errors.is_empty(), "{:?}", errors);
        match &exprs[0].kind {
            ExprKind::Block(block) => {
                assert_eq!(block.label.as_deref(), Some("b"));
                assert_eq!(block.decl.sig.results, vec![ValType::I32]);
                assert!(matches!(&block.exprs[0].kind, ExprKind::Loop(l) if l.label.as_deref() == Some("l")));
            }
            kind => panic!("unexpected {:?}", kind),
        }
    }

    #[test]
    fn mismatching_end_label() {
        let (exprs, errors) = body("block $a end $b");
        assert_eq!(exprs.len(), 1);
        assert_eq!(errors, vec!["mismatching label \"a\" != \"b\"".to_string()]);
        let (_, errors) = body("block end $b");
        assert_eq!(errors, vec!["unexpected label \"b\"".to_string()]);
    }

    #[test]
    fn flat_if_else() {
        let (exprs, errors) = body("i32.const 1 if $x nop else $x unreachable end $x");
        assert!(errors.is_empty(), "{:?}", errors);
        match &exprs[1].kind {
            ExprKind::If { block, false_, .. } => {
                assert_eq!(block.exprs.len(), 1);
                assert!(matches!(false_[0].kind, ExprKind::Unreachable));
            }
            kind => panic!("unexpected {:?}", kind),
        }
    }

    #[test]
    fn folded_if_with_condition() {
        let (exprs, errors) =
            body("(if (result i32) (i32.const 1) (then (i32.const 2)) (else (i32.const 3)))");
        assert!(errors.is_empty(), "{:?}", errors);
        assert_eq!(exprs.len(), 2);
        assert!(matches!(exprs[0].kind, ExprKind::Const(Const::I32(1))));
        match &exprs[1].kind {
            ExprKind::If { block, false_, .. } => {
                assert!(matches!(block.exprs[0].kind, ExprKind::Const(Const::I32(2))));
                assert!(matches!(false_[0].kind, ExprKind::Const(Const::I32(3))));
            }
            kind => panic!("unexpected {:?}", kind),
        }
    }

    #[test]
    fn br_table() {
        let (exprs, errors) = body("block block i32.const 0 br_table 0 1 0 end end");
        assert!(errors.is_empty(), "{:?}", errors);
        let inner = exprs[0].kind.block().unwrap().exprs[0].kind.block().unwrap();
        match &inner.exprs[1].kind {
            ExprKind::BrTable { targets, default } => {
                assert_eq!(targets.len(), 2);
                assert_eq!(default.index(), Some(0));
            }
            kind => panic!("unexpected {:?}", kind),
        }
        let (_, errors) = body("br_table");
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn call_indirect_type_use() {
        let (exprs, errors) = body("call_indirect (type $t) (param i32) (result i64)");
        assert!(errors.is_empty(), "{:?}", errors);
        match &exprs[0].kind {
            ExprKind::CallIndirect { table, decl } => {
                assert_eq!(table.index(), Some(0));
                assert_eq!(decl.type_var.as_ref().and_then(|v| v.name()), Some("t"));
                assert_eq!(decl.sig.params, vec![ValType::I32]);
            }
            kind => panic!("unexpected {:?}", kind),
        }
        let (_, errors) = body("call_indirect (param $x i32)");
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn memargs() {
        let (exprs, errors) = body("i32.load offset=8 align=2 i64.store8 i32.load offset=0x10");
        assert!(errors.is_empty(), "{:?}", errors);
        assert!(matches!(
            &exprs[0].kind,
            ExprKind::Load { memarg: MemArg { offset: 8, align: 2, .. }, .. }
        ));
        assert!(matches!(
            &exprs[1].kind,
            ExprKind::Store { memarg: MemArg { offset: 0, align: 1, .. }, .. }
        ));
        assert!(matches!(
            &exprs[2].kind,
            ExprKind::Load { memarg: MemArg { offset: 16, align: 4, .. }, .. }
        ));
    }

    #[test]
    fn bad_memargs() {
        let (_, errors) = body("i32.load align=3");
        assert_eq!(errors, vec!["alignment must be power-of-two".to_string()]);
        let (_, errors) = body("i32.load offset=4294967296");
        assert_eq!(errors, vec!["offset must be less than or equal to 0xffffffff".to_string()]);
        let (_, errors) = body("i32.load offset=x");
        assert_eq!(errors, vec!["invalid offset \"offset=x\"".to_string()]);
        let (_, errors) = body("i32.load align=");
        assert_eq!(errors, vec!["invalid alignment \"align=\"".to_string()]);
    }

    #[test]
    fn multi_memory_operands() {
        let (exprs, errors) = body_with(
            "i32.load $m offset=4 memory.copy 1 2 v128.load8_lane 3 v128.load8_lane 1 2",
            all_features(),
        );
        assert!(errors.is_empty(), "{:?}", errors);
        assert!(matches!(
            &exprs[0].kind,
            ExprKind::Load { memarg: MemArg { memory: Var::Name(m, _), offset: 4, .. }, .. } if m == "m"
        ));
        assert!(matches!(
            &exprs[1].kind,
            ExprKind::MemoryCopy { dst: Var::Index(1, _), src: Var::Index(2, _) }
        ));
        assert!(matches!(
            &exprs[2].kind,
            ExprKind::SimdLoadLane { memarg: MemArg { memory: Var::Index(0, _), .. }, lane: 3, .. }
        ));
        assert!(matches!(
            &exprs[3].kind,
            ExprKind::SimdLoadLane { memarg: MemArg { memory: Var::Index(1, _), .. }, lane: 2, .. }
        ));
    }

    #[test]
    fn consts() {
        let (exprs, errors) = body(
            "i32.const -1 i64.const 0xffff_ffff_ffff_ffff f32.const 1 f64.const -0x1p-1 f32.const nan",
        );
        assert!(errors.is_empty(), "{:?}", errors);
        assert!(matches!(exprs[0].kind, ExprKind::Const(Const::I32(0xffff_ffff))));
        assert!(matches!(exprs[1].kind, ExprKind::Const(Const::I64(u64::MAX))));
        assert!(matches!(
            exprs[2].kind,
            ExprKind::Const(Const::F32(FloatLiteral::Bits(0x3f80_0000)))
        ));
        assert!(matches!(
            exprs[3].kind,
            ExprKind::Const(Const::F64(FloatLiteral::Bits(0xbfe0_0000_0000_0000)))
        ));
        assert!(matches!(
            exprs[4].kind,
            ExprKind::Const(Const::F32(FloatLiteral::Bits(0x7fc0_0000)))
        ));
    }

    #[test]
    fn invalid_consts() {
        let (_, errors) = body("i32.const 4294967296");
        assert_eq!(errors, vec!["invalid literal \"4294967296\"".to_string()]);
        let (_, errors) = body("f32.const nan:canonical");
        assert_eq!(
            errors,
            vec!["unexpected token \"nan:canonical\", expected a numeric literal.".to_string()]
        );
    }

    #[test]
    fn v128_const() {
        let (exprs, errors) = body("v128.const i32x4 1 2 3 -1 v128.const f64x2 1.0 -inf");
        assert!(errors.is_empty(), "{:?}", errors);
        assert!(matches!(
            exprs[0].kind,
            ExprKind::Const(Const::V128(V128Lanes::I32x4([1, 2, 3, 0xffff_ffff])))
        ));
        assert!(matches!(
            exprs[1].kind,
            ExprKind::Const(Const::V128(V128Lanes::F64x2([
                FloatLiteral::Bits(0x3ff0_0000_0000_0000),
                FloatLiteral::Bits(0xfff0_0000_0000_0000)
            ])))
        ));
        let (_, errors) = body("v128.const i32x3 1 2 3");
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn simd_lanes() {
        let (exprs, errors) = body("i8x16.extract_lane_s 15 i8x16.shuffle 0 1 2 3 4 5 6 7 8 9 10 11 12 13 14 31");
        assert!(errors.is_empty(), "{:?}", errors);
        assert!(matches!(exprs[0].kind, ExprKind::SimdLaneOp { lane: 15, .. }));
        assert!(matches!(&exprs[1].kind, ExprKind::SimdShuffleOp { lanes, .. } if lanes[15] == 31));
        let (_, errors) = body("i8x16.extract_lane_s 256");
        assert_eq!(errors, vec!["lane index \"256\" out-of-range [0, 32)".to_string()]);
    }

    #[test]
    fn disabled_opcodes() {
        let (exprs, errors) = body_with("i32.extend8_s return_call 0 v128.const i32x4 0 0 0 0", Features::none());
        assert_eq!(exprs.len(), 3);
        assert_eq!(
            errors,
            vec![
                "opcode not allowed: i32.extend8_s".to_string(),
                "opcode not allowed: return_call".to_string(),
                "opcode not allowed: v128.const".to_string(),
            ]
        );
    }

    #[test]
    fn select_with_types() {
        let (exprs, errors) = body("select select (result i32)");
        assert!(errors.is_empty(), "{:?}", errors);
        assert!(matches!(&exprs[0].kind, ExprKind::Select(tys) if tys.is_empty()));
        assert!(matches!(&exprs[1].kind, ExprKind::Select(tys) if tys == &vec![ValType::I32]));
    }

    #[test]
    fn table_and_bulk_operands() {
        let (exprs, errors) = body("table.init 1 table.init $t 2 table.copy table.copy 1 0 memory.init 3 elem.drop 0 data.drop 0");
        assert!(errors.is_empty(), "{:?}", errors);
        assert!(matches!(
            &exprs[0].kind,
            ExprKind::TableInit { segment: Var::Index(1, _), table: Var::Index(0, _) }
        ));
        assert!(matches!(
            &exprs[1].kind,
            ExprKind::TableInit { segment: Var::Index(2, _), table: Var::Name(..) }
        ));
        assert!(matches!(
            &exprs[3].kind,
            ExprKind::TableCopy { dst: Var::Index(1, _), src: Var::Index(0, _) }
        ));
        assert!(matches!(
            &exprs[4].kind,
            ExprKind::MemoryInit { segment: Var::Index(3, _), memory: Var::Index(0, _) }
        ));
    }

    #[test]
    fn try_catch_delegate() {
        let (exprs, errors) = body_with(
            "try $t nop catch $e catch_all end try delegate $t (try (do nop) (catch $e) (catch_all))",
            all_features(),
        );
        assert!(errors.is_empty(), "{:?}", errors);
        assert!(matches!(&exprs[0].kind, ExprKind::Try { kind: TryKind::Catch(c), .. } if c.len() == 2));
        assert!(matches!(&exprs[1].kind, ExprKind::Try { kind: TryKind::Delegate(_), .. }));
        assert!(matches!(&exprs[2].kind, ExprKind::Try { kind: TryKind::Catch(c), .. } if c.len() == 2));

        let (_, errors) = body_with("try catch_all catch_all end", all_features());
        assert_eq!(errors, vec!["multiple catch_all clauses not allowed".to_string()]);
    }

    #[test]
    fn try_table() {
        let (exprs, errors) = body_with(
            "block $l try_table (catch $e $l) (catch_all_ref 0) nop end end",
            all_features(),
        );
        assert!(errors.is_empty(), "{:?}", errors);
        let block = exprs[0].kind.block().unwrap();
        match &block.exprs[0].kind {
            ExprKind::TryTable { block, catches } => {
                assert_eq!(catches.len(), 2);
                assert_eq!(catches[0].kind, TableCatchKind::Catch);
                assert!(catches[1].tag.is_none());
                assert_eq!(block.exprs.len(), 1);
            }
            kind => panic!("unexpected {:?}", kind),
        }
    }

    #[test]
    fn exceptions_disabled() {
        let (_, errors) = body("try nop end");
        assert_eq!(errors, vec!["opcode not allowed: try".to_string()]);
    }

    #[test]
    fn recovers_at_next_instr() {
        let (exprs, errors) = body("i32.const 1 local.get foo nop");
        assert_eq!(errors.len(), 1);
        assert!(matches!(exprs[0].kind, ExprKind::Const(Const::I32(1))));
        assert!(matches!(exprs.last().unwrap().kind, ExprKind::Nop));
    }

    #[test]
    fn stray_paren_in_body() {
        let (module, errors) = parse_wat("(func nop (foo))");
        assert!(module.funcs.is_empty());
        assert_eq!(
            messages(&errors),
            vec!["unexpected token \"(\", expected an instr.".to_string()]
        );
    }

    #[test]
    fn code_metadata_annotation() {
        let mut features = Features::default();
        features.annotations = true;
        features.code_metadata = true;
        let (exprs, errors) = body_with(r#"(@metadata.code.branch_hint "\01") i32.const 0 if end"#, features);
        assert!(errors.is_empty(), "{:?}", errors);
        assert!(matches!(
            &exprs[0].kind,
            ExprKind::CodeMetadata { name, data } if name == "branch_hint" && data == &vec![1u8]
        ));
    }
}
