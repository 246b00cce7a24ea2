use super::{external_kind, is_expr, is_module_field, ParseErrorKind, Parser, Result};
use crate::lexer::{TokenSource, TokenType};
use wastir_ir::{
    BindingTable, Const, Custom, CustomPlace, DataSegment, ElemSegment, Export, Expr, ExprKind,
    ExprList, ExternalKind, Func, FuncType, Global, Import, ImportDesc, Index, Limits, Location,
    Memory, Module, ModuleField, ModuleFieldKind, SegmentKind, Table, Tag, ValType, Var,
};

const PAGE_SIZE: u64 = 65536;

// `i32.const 0` or `i64.const 0` offset of segments written inline in tables and memories
fn zero_offset(is_64: bool, loc: &Location) -> ExprList {
    let value = if is_64 { Const::I64(0) } else { Const::I32(0) };
    vec![Expr::new(ExprKind::Const(value), loc.clone())]
}

fn append_inline_exports(module: &mut Module, exports: Vec<(String, Location)>, kind: ExternalKind) {
    let count = match kind {
        ExternalKind::Func => module.funcs.len(),
        ExternalKind::Table => module.tables.len(),
        ExternalKind::Memory => module.memories.len(),
        ExternalKind::Global => module.globals.len(),
        ExternalKind::Tag => module.tags.len(),
    };
    // Inline exports always refer to the entity defined just before
    let index = count.saturating_sub(1) as Index;
    for (name, loc) in exports {
        let var = Var::Index(index, loc.clone());
        module.append_field(ModuleField::new(
            ModuleFieldKind::Export(Export { name, kind, var }),
            loc,
        ));
    }
}

impl<'s, S: TokenSource<'s>> Parser<'s, S> {
    // Whole .wat input: `(module ...)`, bare module fields, or nothing
    pub fn parse_module(&mut self) -> Module {
        let mut module = Module::new();
        module.loc = self.peek_loc();
        let (t0, t1) = self.peek_pair();
        let parsed = if self.peek_match_lpar("module") {
            self.parse_module_header(&mut module)
                .and_then(|()| self.parse_module_body(&mut module))
        } else if is_module_field(t0, t1) {
            self.parse_module_field_list(&mut module)
        } else if t0 == TokenType::Eof {
            self.errors.warning(module.loc.clone(), "empty module");
            Ok(())
        } else {
            self.error_expected(&["a module field", "a module"])
        };
        if parsed.is_ok() {
            self.expect_eof();
        }
        module
    }

    // `(module $name?`
    pub(super) fn parse_module_header(&mut self, module: &mut Module) -> Result<()> {
        module.loc = self.expect_lpar("module")?;
        module.name = self.parse_bind_var_opt();
        Ok(())
    }

    // Fields and the closing paren of `(module ...)`
    pub(super) fn parse_module_body(&mut self, module: &mut Module) -> Result<()> {
        self.parse_module_field_list(module)?;
        self.expect_rpar()
    }

    pub(super) fn parse_module_field_list(&mut self, module: &mut Module) -> Result<()> {
        while is_module_field(self.peek(0), self.peek(1)) {
            if self.parse_module_field(module).is_err() {
                self.synchronize(is_module_field)?;
            }
        }
        Ok(())
    }

    fn parse_module_field(&mut self, module: &mut Module) -> Result<()> {
        match self.peek_pair() {
            (TokenType::LParenAnnotation("custom"), _) => self.parse_custom_field(module),
            (_, TokenType::Keyword("type")) => self.parse_type_field(module),
            (_, TokenType::Keyword("func")) => self.parse_func_field(module),
            (_, TokenType::Keyword("table")) => self.parse_table_field(module),
            (_, TokenType::Keyword("memory")) => self.parse_memory_field(module),
            (_, TokenType::Keyword("global")) => self.parse_global_field(module),
            (_, TokenType::Keyword("tag")) => self.parse_tag_field(module),
            (_, TokenType::Keyword("import")) => self.parse_import_field(module),
            (_, TokenType::Keyword("export")) => self.parse_export_field(module),
            (_, TokenType::Keyword("start")) => self.parse_start_field(module),
            (_, TokenType::Keyword("elem")) => self.parse_elem_field(module),
            (_, TokenType::Keyword("data")) => self.parse_data_field(module),
            _ => self.error_expected(&["a module field"]),
        }
    }

    fn check_import_ordering(&mut self, module: &Module, loc: &Location) {
        let kinds = [
            ExternalKind::Func,
            ExternalKind::Table,
            ExternalKind::Memory,
            ExternalKind::Global,
            ExternalKind::Tag,
        ];
        if kinds.iter().any(|k| module.has_definition_of(*k)) {
            self.report(loc.clone(), ParseErrorKind::ImportAfterDefinition);
        }
    }

    // Multiple tables come with reference types and multiple memories have their own proposal
    fn check_multiple_entities(&mut self, module: &Module, kind: ExternalKind, loc: &Location) {
        let (exists, enabled, what) = match kind {
            ExternalKind::Table => (
                !module.tables.is_empty(),
                self.features.reference_types,
                "multiple tables",
            ),
            ExternalKind::Memory => (
                !module.memories.is_empty(),
                self.features.multi_memory,
                "multiple memories",
            ),
            _ => return,
        };
        if exists {
            self.require_feature(enabled, what, loc);
        }
    }

    // (export "name")*
    fn parse_inline_exports(&mut self) -> Result<Vec<(String, Location)>> {
        let mut exports = vec![];
        while let Some(loc) = self.match_lpar("export") {
            let name = self.parse_utf8_text()?;
            self.expect_rpar()?;
            exports.push((name, loc));
        }
        Ok(exports)
    }

    // (import "module" "field")
    fn parse_inline_import(&mut self) -> Result<Option<(String, String)>> {
        if self.match_lpar("import").is_none() {
            return Ok(None);
        }
        let module_name = self.parse_utf8_text()?;
        let field_name = self.parse_utf8_text()?;
        self.expect_rpar()?;
        Ok(Some((module_name, field_name)))
    }

    fn append_import(
        module: &mut Module,
        (module_name, field_name): (String, String),
        desc: ImportDesc,
        loc: Location,
    ) {
        let import = Import {
            module_name,
            field_name,
            desc,
        };
        module.append_field(ModuleField::new(ModuleFieldKind::Import(import), loc));
    }

    // https://webassembly.github.io/spec/core/text/modules.html#text-typedef
    fn parse_type_field(&mut self, module: &mut Module) -> Result<()> {
        let loc = self.expect_lpar("type")?;
        let name = self.parse_bind_var_opt();
        self.expect_lpar("func")?;
        let mut ty = FuncType {
            name,
            ..FuncType::default()
        };
        // Param names are allowed in type definitions though nothing can refer to them
        let mut unused = BindingTable::new();
        self.parse_params(&mut ty.sig.params, Some(&mut unused))?;
        self.parse_results(&mut ty.sig.results)?;
        self.expect_rpar()?;
        self.expect_rpar()?;
        module.append_field(ModuleField::new(ModuleFieldKind::Type(ty), loc));
        Ok(())
    }

    // https://webassembly.github.io/spec/core/text/modules.html#text-func
    fn parse_func_field(&mut self, module: &mut Module) -> Result<()> {
        let loc = self.expect_lpar("func")?;
        let name = self.parse_bind_var_opt();
        let exports = self.parse_inline_exports()?;
        let mut func = Func {
            name,
            loc: loc.clone(),
            ..Func::default()
        };

        if let Some(names) = self.parse_inline_import()? {
            self.check_import_ordering(module, &loc);
            func.decl = self.parse_func_declaration(Some(&mut func.bindings))?;
            self.expect_rpar()?;
            Self::append_import(module, names, ImportDesc::Func(func), loc);
        } else {
            func.decl = self.parse_func_declaration(Some(&mut func.bindings))?;
            self.parse_locals(&mut func)?;
            self.parse_terminating_instr_list(&mut func.exprs)?;
            self.expect_rpar()?;
            module.append_field(ModuleField::new(ModuleFieldKind::Func(func), loc));
        }

        append_inline_exports(module, exports, ExternalKind::Func);
        Ok(())
    }

    // `(local $x i32)` or `(local i32 i64)`. Locals share the index space of params
    fn parse_locals(&mut self, func: &mut Func) -> Result<()> {
        while self.match_lpar("local").is_some() {
            let tok = self.peek_cloned();
            if let crate::lexer::TokenKind::Ident(name) = tok.kind {
                self.consume();
                let ty = self.parse()?;
                let index = func.num_params_and_locals();
                func.bindings.insert(name, index, tok.loc);
                func.local_types.push(ty);
            } else {
                func.local_types.extend(self.parse_value_type_list()?);
            }
            self.expect_rpar()?;
        }
        Ok(())
    }

    // i64? limits reftype
    fn parse_table_type(&mut self, name: Option<String>) -> Result<Table> {
        let is_64 = self.parse_index_type_opt();
        let mut elem_limits: Limits = self.parse()?;
        elem_limits.is_64 = is_64;
        let elem_type = self.parse_ref_type()?;
        Ok(Table {
            name,
            elem_limits,
            elem_type,
        })
    }

    // True when a reference type follows directly or after the index type, instead of limits
    fn peek_table_abbreviation(&mut self) -> bool {
        let is_ref_type = |t: TokenType<'_>| matches!(t, TokenType::Keyword("funcref" | "externref"));
        match self.peek(0) {
            TokenType::Keyword("i32" | "i64") => is_ref_type(self.peek(1)),
            t => is_ref_type(t),
        }
    }

    // https://webassembly.github.io/spec/core/text/modules.html#tables
    fn parse_table_field(&mut self, module: &mut Module) -> Result<()> {
        let loc = self.expect_lpar("table")?;
        let name = self.parse_bind_var_opt();
        let exports = self.parse_inline_exports()?;

        if let Some(names) = self.parse_inline_import()? {
            self.check_import_ordering(module, &loc);
            let table = self.parse_table_type(name)?;
            self.expect_rpar()?;
            self.check_multiple_entities(module, ExternalKind::Table, &loc);
            Self::append_import(module, names, ImportDesc::Table(table), loc);
        } else if self.peek_table_abbreviation() {
            // Abbreviation: (table reftype (elem ...)) defines the table and an active segment
            let is_64 = self.parse_index_type_opt();
            let elem_type = self.parse_ref_type()?;
            let elem_loc = self.expect_lpar("elem")?;
            let mut segment = ElemSegment {
                name: None,
                kind: SegmentKind::Active,
                table_var: Var::Index(module.tables.len() as Index, elem_loc.clone()),
                offset: zero_offset(is_64, &elem_loc),
                elem_type,
                elem_exprs: vec![],
            };
            if is_expr(self.peek(0), self.peek(1)) || self.peek_match_lpar("item") {
                self.parse_elem_expr_list(&mut segment.elem_exprs)?;
            } else {
                self.parse_elem_var_list(&mut segment.elem_exprs)?;
            }
            self.expect_rpar()?;
            self.expect_rpar()?;

            let len = segment.elem_exprs.len() as u64;
            let table = Table {
                name,
                elem_limits: Limits {
                    initial: len,
                    max: Some(len),
                    is_64,
                    is_shared: false,
                },
                elem_type,
            };
            self.check_multiple_entities(module, ExternalKind::Table, &loc);
            module.append_field(ModuleField::new(ModuleFieldKind::Table(table), loc));
            module.append_field(ModuleField::new(ModuleFieldKind::ElemSegment(segment), elem_loc));
        } else {
            let table = self.parse_table_type(name)?;
            self.expect_rpar()?;
            self.check_multiple_entities(module, ExternalKind::Table, &loc);
            module.append_field(ModuleField::new(ModuleFieldKind::Table(table), loc));
        }

        append_inline_exports(module, exports, ExternalKind::Table);
        Ok(())
    }

    // i64? limits shared?
    fn parse_memory_type(&mut self, name: Option<String>, is_64: bool) -> Result<Memory> {
        let mut page_limits: Limits = self.parse()?;
        page_limits.is_64 = is_64;
        if let Some(loc) = self.match_keyword("shared") {
            self.require_feature(self.features.threads, "shared memories", &loc);
            page_limits.is_shared = true;
        }
        Ok(Memory { name, page_limits })
    }

    // https://webassembly.github.io/spec/core/text/modules.html#memories
    fn parse_memory_field(&mut self, module: &mut Module) -> Result<()> {
        let loc = self.expect_lpar("memory")?;
        let name = self.parse_bind_var_opt();
        let exports = self.parse_inline_exports()?;

        if let Some(names) = self.parse_inline_import()? {
            self.check_import_ordering(module, &loc);
            let is_64 = self.parse_index_type_opt();
            let memory = self.parse_memory_type(name, is_64)?;
            self.expect_rpar()?;
            self.check_multiple_entities(module, ExternalKind::Memory, &loc);
            Self::append_import(module, names, ImportDesc::Memory(memory), loc);
        } else {
            let is_64 = self.parse_index_type_opt();
            if let Some(data_loc) = self.match_lpar("data") {
                // Abbreviation: (memory (data "...")) defines a memory just large enough for the
                // data and an active segment at offset 0
                let data = self.parse_text_list();
                self.expect_rpar()?;
                self.expect_rpar()?;
                let pages = (data.len() as u64 + PAGE_SIZE - 1) / PAGE_SIZE;
                let segment = DataSegment {
                    name: None,
                    kind: SegmentKind::Active,
                    memory_var: Var::Index(module.memories.len() as Index, data_loc.clone()),
                    offset: zero_offset(is_64, &data_loc),
                    data,
                };
                let memory = Memory {
                    name,
                    page_limits: Limits {
                        initial: pages,
                        max: Some(pages),
                        is_64,
                        is_shared: false,
                    },
                };
                self.check_multiple_entities(module, ExternalKind::Memory, &loc);
                module.append_field(ModuleField::new(ModuleFieldKind::Memory(memory), loc));
                module.append_field(ModuleField::new(ModuleFieldKind::DataSegment(segment), data_loc));
            } else {
                let memory = self.parse_memory_type(name, is_64)?;
                self.expect_rpar()?;
                self.check_multiple_entities(module, ExternalKind::Memory, &loc);
                module.append_field(ModuleField::new(ModuleFieldKind::Memory(memory), loc));
            }
        }

        append_inline_exports(module, exports, ExternalKind::Memory);
        Ok(())
    }

    // valtype or (mut valtype)
    fn parse_global_type(&mut self) -> Result<(ValType, bool)> {
        if self.match_lpar("mut").is_some() {
            let ty = self.parse()?;
            self.expect_rpar()?;
            Ok((ty, true))
        } else {
            Ok((self.parse()?, false))
        }
    }

    fn parse_global_import_type(&mut self, loc: &Location) -> Result<(ValType, bool)> {
        let (ty, mutable) = self.parse_global_type()?;
        if mutable {
            self.require_feature(self.features.mutable_globals, "mutable global imports", loc);
        }
        Ok((ty, mutable))
    }

    // https://webassembly.github.io/spec/core/text/modules.html#globals
    fn parse_global_field(&mut self, module: &mut Module) -> Result<()> {
        let loc = self.expect_lpar("global")?;
        let name = self.parse_bind_var_opt();
        let exports = self.parse_inline_exports()?;

        if let Some(names) = self.parse_inline_import()? {
            self.check_import_ordering(module, &loc);
            let (ty, mutable) = self.parse_global_import_type(&loc)?;
            self.expect_rpar()?;
            let global = Global {
                name,
                ty,
                mutable,
                init_expr: vec![],
            };
            Self::append_import(module, names, ImportDesc::Global(global), loc);
        } else {
            let (ty, mutable) = self.parse_global_type()?;
            let mut init_expr = vec![];
            self.parse_terminating_instr_list(&mut init_expr)?;
            self.expect_rpar()?;
            let global = Global {
                name,
                ty,
                mutable,
                init_expr,
            };
            module.append_field(ModuleField::new(ModuleFieldKind::Global(global), loc));
        }

        append_inline_exports(module, exports, ExternalKind::Global);
        Ok(())
    }

    // https://webassembly.github.io/exception-handling/core/text/modules.html#tags
    fn parse_tag_field(&mut self, module: &mut Module) -> Result<()> {
        let loc = self.expect_lpar("tag")?;
        self.require_feature(self.features.exceptions, "tags", &loc);
        let name = self.parse_bind_var_opt();
        let exports = self.parse_inline_exports()?;

        if let Some(names) = self.parse_inline_import()? {
            self.check_import_ordering(module, &loc);
            let decl = self.parse_func_declaration(None)?;
            self.expect_rpar()?;
            Self::append_import(module, names, ImportDesc::Tag(Tag { name, decl }), loc);
        } else {
            let decl = self.parse_func_declaration(None)?;
            self.expect_rpar()?;
            module.append_field(ModuleField::new(ModuleFieldKind::Tag(Tag { name, decl }), loc));
        }

        append_inline_exports(module, exports, ExternalKind::Tag);
        Ok(())
    }

    // https://webassembly.github.io/spec/core/text/modules.html#imports
    fn parse_import_field(&mut self, module: &mut Module) -> Result<()> {
        let loc = self.expect_lpar("import")?;
        self.check_import_ordering(module, &loc);
        let module_name = self.parse_utf8_text()?;
        let field_name = self.parse_utf8_text()?;

        let (kw, desc_loc) = self.expect_lpar_keyword()?;
        let desc = match kw {
            "func" => {
                let mut func = Func {
                    name: self.parse_bind_var_opt(),
                    loc: desc_loc,
                    ..Func::default()
                };
                func.decl = self.parse_func_declaration(Some(&mut func.bindings))?;
                ImportDesc::Func(func)
            }
            "table" => {
                let name = self.parse_bind_var_opt();
                self.check_multiple_entities(module, ExternalKind::Table, &desc_loc);
                ImportDesc::Table(self.parse_table_type(name)?)
            }
            "memory" => {
                let name = self.parse_bind_var_opt();
                let is_64 = self.parse_index_type_opt();
                self.check_multiple_entities(module, ExternalKind::Memory, &desc_loc);
                ImportDesc::Memory(self.parse_memory_type(name, is_64)?)
            }
            "global" => {
                let name = self.parse_bind_var_opt();
                let (ty, mutable) = self.parse_global_import_type(&desc_loc)?;
                ImportDesc::Global(Global {
                    name,
                    ty,
                    mutable,
                    init_expr: vec![],
                })
            }
            "tag" => {
                self.require_feature(self.features.exceptions, "tags", &desc_loc);
                let name = self.parse_bind_var_opt();
                let decl = self.parse_func_declaration(None)?;
                ImportDesc::Tag(Tag { name, decl })
            }
            _ => {
                return self.fail(
                    desc_loc,
                    ParseErrorKind::UnexpectedToken {
                        got: kw.to_string(),
                        expected: "an external kind".to_string(),
                    },
                )
            }
        };
        self.expect_rpar()?;
        self.expect_rpar()?;

        Self::append_import(module, (module_name, field_name), desc, loc);
        Ok(())
    }

    // https://webassembly.github.io/spec/core/text/modules.html#text-export
    fn parse_export_field(&mut self, module: &mut Module) -> Result<()> {
        let loc = self.expect_lpar("export")?;
        let name = self.parse_utf8_text()?;
        let (kw, kind_loc) = self.expect_lpar_keyword()?;
        let kind = match external_kind(kw) {
            Some(kind) => kind,
            None => {
                return self.fail(
                    kind_loc,
                    ParseErrorKind::UnexpectedToken {
                        got: kw.to_string(),
                        expected: "an external kind".to_string(),
                    },
                )
            }
        };
        let var = self.parse()?;
        self.expect_rpar()?;
        self.expect_rpar()?;
        module.append_field(ModuleField::new(
            ModuleFieldKind::Export(Export { name, kind, var }),
            loc,
        ));
        Ok(())
    }

    // https://webassembly.github.io/spec/core/text/modules.html#text-start
    fn parse_start_field(&mut self, module: &mut Module) -> Result<()> {
        let loc = self.expect_lpar("start")?;
        let var = self.parse()?;
        self.expect_rpar()?;
        if !module.starts.is_empty() {
            return self.fail(loc, ParseErrorKind::MultipleStart);
        }
        module.append_field(ModuleField::new(ModuleFieldKind::Start(var), loc));
        Ok(())
    }

    // (offset instr*) or a single folded instruction
    fn parse_offset_expr_opt(&mut self, offset: &mut ExprList) -> Result<bool> {
        if self.match_lpar("offset").is_some() {
            self.parse_terminating_instr_list(offset)?;
            self.expect_rpar()?;
            Ok(true)
        } else if is_expr(self.peek(0), self.peek(1)) {
            self.parse_expr(offset)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn parse_offset_expr(&mut self, offset: &mut ExprList) -> Result<()> {
        if self.parse_offset_expr_opt(offset)? {
            Ok(())
        } else {
            self.error_expected(&["an offset expr"])
        }
    }

    // Each element is `(item instr*)` or a single folded instruction
    fn parse_elem_expr_list(&mut self, elems: &mut Vec<ExprList>) -> Result<()> {
        loop {
            let mut exprs = vec![];
            if self.match_lpar("item").is_some() {
                self.parse_terminating_instr_list(&mut exprs)?;
                self.expect_rpar()?;
            } else if is_expr(self.peek(0), self.peek(1)) {
                self.parse_expr(&mut exprs)?;
            } else {
                return Ok(());
            }
            elems.push(exprs);
        }
    }

    // Function indices, each of which stands for `ref.func`
    fn parse_elem_var_list(&mut self, elems: &mut Vec<ExprList>) -> Result<()> {
        while let Some(var) = self.parse_var_opt()? {
            let loc = var.loc().clone();
            elems.push(vec![Expr::new(ExprKind::RefFunc(var), loc)]);
        }
        Ok(())
    }

    // https://webassembly.github.io/spec/core/text/modules.html#element-segments
    fn parse_elem_field(&mut self, module: &mut Module) -> Result<()> {
        let loc = self.expect_lpar("elem")?;
        let mut segment = ElemSegment {
            name: self.parse_bind_var_opt(),
            kind: SegmentKind::Active,
            table_var: Var::Index(0, loc.clone()),
            offset: vec![],
            elem_type: ValType::FuncRef,
            elem_exprs: vec![],
        };

        if self.match_keyword("declare").is_some() {
            segment.kind = SegmentKind::Declared;
        } else {
            if self.match_lpar("table").is_some() {
                segment.table_var = self.parse()?;
                self.expect_rpar()?;
            } else if let Some(var) = self.parse_var_opt()? {
                segment.table_var = var;
            }
            if !self.parse_offset_expr_opt(&mut segment.offset)? {
                segment.kind = SegmentKind::Passive;
            }
        }
        if segment.kind != SegmentKind::Active {
            self.require_feature(self.features.bulk_memory, "passive and declared segments", &loc);
        }

        if let Some(elem_type) = self.parse_ref_type_opt() {
            segment.elem_type = elem_type;
            self.parse_elem_expr_list(&mut segment.elem_exprs)?;
        } else {
            self.match_keyword("func");
            self.parse_elem_var_list(&mut segment.elem_exprs)?;
        }
        self.expect_rpar()?;

        module.append_field(ModuleField::new(ModuleFieldKind::ElemSegment(segment), loc));
        Ok(())
    }

    // https://webassembly.github.io/spec/core/text/modules.html#data-segments
    fn parse_data_field(&mut self, module: &mut Module) -> Result<()> {
        let loc = self.expect_lpar("data")?;
        let mut segment = DataSegment {
            name: self.parse_bind_var_opt(),
            kind: SegmentKind::Active,
            memory_var: Var::Index(0, loc.clone()),
            offset: vec![],
            data: vec![],
        };

        if self.match_lpar("memory").is_some() {
            segment.memory_var = self.parse()?;
            self.expect_rpar()?;
            self.parse_offset_expr(&mut segment.offset)?;
        } else if let Some(var) = self.parse_var_opt()? {
            segment.memory_var = var;
            self.parse_offset_expr(&mut segment.offset)?;
        } else if !self.parse_offset_expr_opt(&mut segment.offset)? {
            if !self.features.bulk_memory {
                return self.fail(loc, ParseErrorKind::FeatureNotAllowed("passive data segments"));
            }
            segment.kind = SegmentKind::Passive;
        }

        segment.data = self.parse_text_list();
        self.expect_rpar()?;
        module.append_field(ModuleField::new(ModuleFieldKind::DataSegment(segment), loc));
        Ok(())
    }

    // https://webassembly.github.io/annotations/core/custom/annotations.html
    //
    // (@custom "name" (before|after section)? "data"*)
    fn parse_custom_field(&mut self, module: &mut Module) -> Result<()> {
        let loc = self.consume().loc;
        let name = self.parse_utf8_text()?;

        let before = if self.peek_match_lpar("before") {
            Some(true)
        } else if self.peek_match_lpar("after") {
            Some(false)
        } else {
            None
        };
        let place = match before {
            Some(before) => {
                self.consume();
                self.consume();
                let section = match self.peek(0) {
                    TokenType::Keyword(kw) => {
                        self.consume();
                        kw.to_string()
                    }
                    _ => return self.error_expected(&["a section name"]),
                };
                self.expect_rpar()?;
                Some(CustomPlace { before, section })
            }
            None => None,
        };

        let data = self.parse_text_list();
        self.expect_rpar()?;
        module.append_field(ModuleField::new(
            ModuleFieldKind::Custom(Custom { name, place, data }),
            loc,
        ));
        Ok(())
    }
}
