// Name resolution. Rewrites every symbolic reference `$name` into its numeric index, reports
// undefined names and duplicate bindings. Labels resolve to their relative depth counted from the
// innermost enclosing block.

use crate::reconcile::{reconcile_module, ReconcileOptions};
use std::mem;
use thiserror::Error;
use tracing::{debug, trace};
use wastir_ir::{
    BindingTable, Block, Command, Errors, ExprKind, ExprList, ExternalKind, Failed,
    FuncDeclaration, ImportDesc, Index, Module, ModuleField, ModuleFieldKind, ScriptModule,
    TryKind, Var,
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveErrorKind {
    #[error("undefined {what} variable \"{name}\"")]
    Undefined { what: &'static str, name: String },
    #[error("redefinition of {what} \"{name}\"")]
    Redefinition { what: &'static str, name: String },
}

// Labels of the blocks enclosing the current instruction. Unlabeled blocks push `None` so that
// they still count toward depths.
#[derive(Default)]
struct LabelStack {
    stack: Vec<Option<String>>,
}

impl LabelStack {
    fn push(&mut self, label: Option<&str>) {
        trace!(label, depth = self.stack.len(), "push label");
        self.stack.push(label.map(str::to_string));
    }

    fn pop(&mut self) {
        let label = self.stack.pop();
        trace!(label = ?label.flatten(), depth = self.stack.len(), "pop label");
    }

    // Relative depth of the innermost label with the name
    fn find(&self, name: &str) -> Option<Index> {
        self.stack
            .iter()
            .rev()
            .enumerate()
            .find_map(|(depth, label)| match label {
                Some(l) if l == name => Some(depth as Index),
                _ => None,
            })
    }

    fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }
}

// Module-level index spaces, borrowed apart from `Module::fields` so that fields can be rewritten
// while names are looked up
#[derive(Clone, Copy)]
struct ModuleScope<'m> {
    types: &'m BindingTable,
    funcs: &'m BindingTable,
    tables: &'m BindingTable,
    memories: &'m BindingTable,
    globals: &'m BindingTable,
    tags: &'m BindingTable,
    elem_segments: &'m BindingTable,
    data_segments: &'m BindingTable,
}

impl<'m> ModuleScope<'m> {
    fn tables(&self) -> [(&'m BindingTable, &'static str); 8] {
        [
            (self.funcs, "function"),
            (self.globals, "global"),
            (self.types, "function type"),
            (self.tables, "table"),
            (self.memories, "memory"),
            (self.tags, "tag"),
            (self.elem_segments, "elem segment"),
            (self.data_segments, "data segment"),
        ]
    }
}

struct Resolver<'m, 'e> {
    scope: ModuleScope<'m>,
    errors: &'e mut Errors,
    labels: LabelStack,
}

impl<'m, 'e> Resolver<'m, 'e> {
    fn error(&mut self, var: &Var, kind: ResolveErrorKind) {
        self.errors.error(var.loc().clone(), kind.to_string());
    }

    fn resolve_var(&mut self, bindings: &BindingTable, var: &mut Var, what: &'static str) {
        let found = match var {
            Var::Name(name, _) => bindings.index_of(name),
            Var::Index(..) => return,
        };
        match found {
            Some(idx) => var.set_index(idx),
            None => {
                let name = var.name().unwrap_or_default().to_string();
                self.error(var, ResolveErrorKind::Undefined { what, name });
            }
        }
    }

    fn resolve_label_var(&mut self, var: &mut Var) {
        let found = match var {
            Var::Name(name, _) => self.labels.find(name),
            Var::Index(..) => return,
        };
        match found {
            Some(depth) => var.set_index(depth),
            None => {
                let name = var.name().unwrap_or_default().to_string();
                let what = "label";
                self.error(var, ResolveErrorKind::Undefined { what, name });
            }
        }
    }

    fn resolve_func_var(&mut self, var: &mut Var) {
        let bindings = self.scope.funcs;
        self.resolve_var(bindings, var, "function");
    }

    fn resolve_type_var(&mut self, var: &mut Var) {
        let bindings = self.scope.types;
        self.resolve_var(bindings, var, "function type");
    }

    fn resolve_table_var(&mut self, var: &mut Var) {
        let bindings = self.scope.tables;
        self.resolve_var(bindings, var, "table");
    }

    fn resolve_memory_var(&mut self, var: &mut Var) {
        let bindings = self.scope.memories;
        self.resolve_var(bindings, var, "memory");
    }

    fn resolve_global_var(&mut self, var: &mut Var) {
        let bindings = self.scope.globals;
        self.resolve_var(bindings, var, "global");
    }

    fn resolve_tag_var(&mut self, var: &mut Var) {
        let bindings = self.scope.tags;
        self.resolve_var(bindings, var, "tag");
    }

    fn resolve_elem_segment_var(&mut self, var: &mut Var) {
        let bindings = self.scope.elem_segments;
        self.resolve_var(bindings, var, "elem segment");
    }

    fn resolve_data_segment_var(&mut self, var: &mut Var) {
        let bindings = self.scope.data_segments;
        self.resolve_var(bindings, var, "data segment");
    }

    // Local references outside of a function body (e.g. in a global initializer) are left for the
    // validator
    fn resolve_local_var(&mut self, locals: Option<&BindingTable>, var: &mut Var) {
        if let Some(locals) = locals {
            self.resolve_var(locals, var, "local");
        }
    }

    fn resolve_decl(&mut self, decl: &mut FuncDeclaration) {
        if let Some(var) = &mut decl.type_var {
            self.resolve_type_var(var);
        }
    }

    fn check_duplicates(&mut self, bindings: &BindingTable, what: &'static str) {
        for redef in bindings.redefinitions() {
            let kind = ResolveErrorKind::Redefinition {
                what,
                name: redef.name.clone(),
            };
            self.errors.error(redef.later().loc.clone(), kind.to_string());
        }
    }

    // Parameters and locals share one index space. A collision is blamed on the kind of the later
    // binding.
    fn check_local_duplicates(&mut self, bindings: &BindingTable, num_params: Index) {
        for redef in bindings.redefinitions() {
            let later = redef.later();
            let what = if later.index < num_params {
                "parameter"
            } else {
                "local"
            };
            let kind = ResolveErrorKind::Redefinition {
                what,
                name: redef.name.clone(),
            };
            self.errors.error(later.loc.clone(), kind.to_string());
        }
    }

    fn resolve_block_body(&mut self, block: &mut Block, locals: Option<&BindingTable>) {
        self.labels.push(block.label.as_deref());
        self.resolve_exprs(&mut block.exprs, locals);
    }

    fn resolve_exprs(&mut self, exprs: &mut ExprList, locals: Option<&BindingTable>) {
        for expr in exprs.iter_mut() {
            self.resolve_expr(&mut expr.kind, locals);
        }
    }

    fn resolve_expr(&mut self, kind: &mut ExprKind, locals: Option<&BindingTable>) {
        match kind {
            ExprKind::Block(block) | ExprKind::Loop(block) => {
                self.resolve_decl(&mut block.decl);
                self.resolve_block_body(block, locals);
                self.labels.pop();
            }
            ExprKind::If { block, false_, .. } => {
                self.resolve_decl(&mut block.decl);
                self.resolve_block_body(block, locals);
                // The else branch is under the same label as the then branch
                self.resolve_exprs(false_, locals);
                self.labels.pop();
            }
            ExprKind::Try { block, kind } => {
                self.resolve_decl(&mut block.decl);
                self.resolve_block_body(block, locals);
                match kind {
                    TryKind::Plain => self.labels.pop(),
                    TryKind::Catch(catches) => {
                        for catch in catches.iter_mut() {
                            if let Some(var) = &mut catch.var {
                                self.resolve_tag_var(var);
                            }
                            self.resolve_exprs(&mut catch.exprs, locals);
                        }
                        self.labels.pop();
                    }
                    // The delegate target is looked up from outside of the try block
                    TryKind::Delegate(var) => {
                        self.labels.pop();
                        self.resolve_label_var(var);
                    }
                }
            }
            ExprKind::TryTable { block, catches } => {
                self.resolve_decl(&mut block.decl);
                // Catch clauses branch from outside of the block
                for catch in catches.iter_mut() {
                    if let Some(tag) = &mut catch.tag {
                        self.resolve_tag_var(tag);
                    }
                    self.resolve_label_var(&mut catch.target);
                }
                self.resolve_block_body(block, locals);
                self.labels.pop();
            }
            ExprKind::Br(var) | ExprKind::BrIf(var) | ExprKind::Rethrow(var) => {
                self.resolve_label_var(var)
            }
            ExprKind::BrTable { targets, default } => {
                for target in targets.iter_mut() {
                    self.resolve_label_var(target);
                }
                self.resolve_label_var(default);
            }
            ExprKind::Call(var) | ExprKind::ReturnCall(var) | ExprKind::RefFunc(var) => {
                self.resolve_func_var(var)
            }
            ExprKind::CallIndirect { table, decl }
            | ExprKind::ReturnCallIndirect { table, decl } => {
                self.resolve_table_var(table);
                self.resolve_decl(decl);
            }
            ExprKind::CallRef(var) => self.resolve_type_var(var),
            ExprKind::Throw(var) => self.resolve_tag_var(var),
            ExprKind::LocalGet(var) | ExprKind::LocalSet(var) | ExprKind::LocalTee(var) => {
                self.resolve_local_var(locals, var)
            }
            ExprKind::GlobalGet(var) | ExprKind::GlobalSet(var) => self.resolve_global_var(var),
            ExprKind::TableGet(var)
            | ExprKind::TableSet(var)
            | ExprKind::TableGrow(var)
            | ExprKind::TableSize(var)
            | ExprKind::TableFill(var) => self.resolve_table_var(var),
            ExprKind::TableCopy { dst, src } => {
                self.resolve_table_var(dst);
                self.resolve_table_var(src);
            }
            ExprKind::TableInit { segment, table } => {
                self.resolve_elem_segment_var(segment);
                self.resolve_table_var(table);
            }
            ExprKind::ElemDrop(var) => self.resolve_elem_segment_var(var),
            ExprKind::Load { memarg, .. }
            | ExprKind::Store { memarg, .. }
            | ExprKind::SimdLoadLane { memarg, .. }
            | ExprKind::SimdStoreLane { memarg, .. }
            | ExprKind::AtomicLoad { memarg, .. }
            | ExprKind::AtomicStore { memarg, .. }
            | ExprKind::AtomicRmw { memarg, .. }
            | ExprKind::AtomicRmwCmpxchg { memarg, .. }
            | ExprKind::AtomicWait { memarg, .. }
            | ExprKind::AtomicNotify { memarg, .. } => self.resolve_memory_var(&mut memarg.memory),
            ExprKind::MemorySize(var) | ExprKind::MemoryGrow(var) | ExprKind::MemoryFill(var) => {
                self.resolve_memory_var(var)
            }
            ExprKind::MemoryCopy { dst, src } => {
                self.resolve_memory_var(dst);
                self.resolve_memory_var(src);
            }
            ExprKind::MemoryInit { segment, memory } => {
                self.resolve_data_segment_var(segment);
                self.resolve_memory_var(memory);
            }
            ExprKind::DataDrop(var) => self.resolve_data_segment_var(var),
            ExprKind::Unreachable
            | ExprKind::Nop
            | ExprKind::Return
            | ExprKind::Drop
            | ExprKind::Select(_)
            | ExprKind::RefNull(_)
            | ExprKind::RefIsNull
            | ExprKind::Const(_)
            | ExprKind::Unary(_)
            | ExprKind::Binary(_)
            | ExprKind::Ternary(_)
            | ExprKind::Compare(_)
            | ExprKind::Convert(_)
            | ExprKind::SimdLaneOp { .. }
            | ExprKind::SimdShuffleOp { .. }
            | ExprKind::AtomicFence(_)
            | ExprKind::CodeMetadata { .. } => {}
        }
    }

    fn resolve_field(&mut self, field: &mut ModuleField) {
        match &mut field.kind {
            ModuleFieldKind::Func(func) => {
                self.resolve_decl(&mut func.decl);
                let num_params = func.num_params();
                self.check_local_duplicates(&func.bindings, num_params);
                debug_assert!(self.labels.is_empty());
                self.resolve_exprs(&mut func.exprs, Some(&func.bindings));
            }
            ModuleFieldKind::Import(import) => match &mut import.desc {
                ImportDesc::Func(func) => self.resolve_decl(&mut func.decl),
                ImportDesc::Tag(tag) => self.resolve_decl(&mut tag.decl),
                ImportDesc::Table(_) | ImportDesc::Memory(_) | ImportDesc::Global(_) => {}
            },
            ModuleFieldKind::Export(export) => match export.kind {
                ExternalKind::Func => self.resolve_func_var(&mut export.var),
                ExternalKind::Table => self.resolve_table_var(&mut export.var),
                ExternalKind::Memory => self.resolve_memory_var(&mut export.var),
                ExternalKind::Global => self.resolve_global_var(&mut export.var),
                ExternalKind::Tag => self.resolve_tag_var(&mut export.var),
            },
            ModuleFieldKind::Global(global) => self.resolve_exprs(&mut global.init_expr, None),
            ModuleFieldKind::Tag(tag) => self.resolve_decl(&mut tag.decl),
            ModuleFieldKind::Start(var) => self.resolve_func_var(var),
            ModuleFieldKind::ElemSegment(elem) => {
                self.resolve_table_var(&mut elem.table_var);
                self.resolve_exprs(&mut elem.offset, None);
                for exprs in elem.elem_exprs.iter_mut() {
                    self.resolve_exprs(exprs, None);
                }
            }
            ModuleFieldKind::DataSegment(data) => {
                self.resolve_memory_var(&mut data.memory_var);
                self.resolve_exprs(&mut data.offset, None);
            }
            ModuleFieldKind::Type(_)
            | ModuleFieldKind::Table(_)
            | ModuleFieldKind::Memory(_)
            | ModuleFieldKind::Custom(_) => {}
        }
    }
}

// Resolves all names of the module in place. Every failure is reported and resolution continues,
// so that one call reports all undefined names at once.
pub fn resolve_module(module: &mut Module, errors: &mut Errors) -> Result<(), Failed> {
    let before = errors.error_count();
    let Module {
        fields,
        type_bindings,
        func_bindings,
        table_bindings,
        memory_bindings,
        global_bindings,
        tag_bindings,
        elem_segment_bindings,
        data_segment_bindings,
        ..
    } = module;
    let scope = ModuleScope {
        types: type_bindings,
        funcs: func_bindings,
        tables: table_bindings,
        memories: memory_bindings,
        globals: global_bindings,
        tags: tag_bindings,
        elem_segments: elem_segment_bindings,
        data_segments: data_segment_bindings,
    };

    let mut resolver = Resolver {
        scope,
        errors,
        labels: LabelStack::default(),
    };
    for (bindings, what) in scope.tables() {
        resolver.check_duplicates(bindings, what);
    }
    for field in fields.iter_mut() {
        resolver.resolve_field(field);
    }

    let errors = resolver.errors;
    debug!(
        name = ?module.name,
        errors = errors.error_count() - before,
        "resolved names"
    );
    errors.pass_result(before)
}

fn reconcile_and_resolve(
    module: &mut Module,
    options: &ReconcileOptions,
    errors: &mut Errors,
) -> Result<(), Failed> {
    let reconciled = reconcile_module(module, options, errors);
    let resolved = resolve_module(module, errors);
    reconciled.and(resolved)
}

// Reconciles and resolves every text module of the script which is meant to be instantiated.
// Modules of assert_invalid are expected to be broken, so their errors go to a scratch collection
// and a module which fails is reclassified as having no binary form. Modules of
// assert_malformed and modules in binary or quoted form are left as they are.
pub fn resolve_script(
    script: &mut wastir_ir::Script,
    options: &ReconcileOptions,
    errors: &mut Errors,
) -> Result<(), Failed> {
    let before = errors.error_count();
    let mut num_reclassified = 0;

    for command in script.commands.iter_mut() {
        let reclassify = match command {
            Command::Module(module)
            | Command::AssertUnlinkable {
                module: ScriptModule::Text(module),
                ..
            }
            | Command::AssertUninstantiable {
                module: ScriptModule::Text(module),
                ..
            } => {
                let _ = reconcile_and_resolve(module, options, errors);
                false
            }
            Command::AssertInvalid {
                module: ScriptModule::Text(module),
                ..
            } => {
                let mut scratch = Errors::new();
                reconcile_and_resolve(module, options, &mut scratch).is_err()
            }
            _ => false,
        };

        if reclassify {
            if let Command::AssertInvalid { module, text } = command {
                let module = mem::replace(module, ScriptModule::Text(Module::new()));
                let text = mem::take(text);
                *command = Command::AssertInvalidNonBinary { module, text };
                num_reclassified += 1;
            }
        }
    }

    debug!(
        commands = script.commands.len(),
        reclassified = num_reclassified,
        errors = errors.error_count() - before,
        "resolved script"
    );
    errors.pass_result(before)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Features;
    use crate::parser::Parser;
    use rstest::rstest;
    use wastir_ir::{Script, SegmentKind};

    fn resolve(source: &str) -> (Module, Vec<String>) {
        let mut parser = Parser::from_source(source, None, Features::all());
        let mut module = parser.parse_module();
        let mut errors = parser.into_errors();
        assert!(!errors.has_errors(), "{}", errors);
        reconcile_module(&mut module, &ReconcileOptions::default(), &mut errors).unwrap();
        let result = resolve_module(&mut module, &mut errors);
        let messages: Vec<_> = errors.iter().map(|d| d.message.clone()).collect();
        assert_eq!(result.is_err(), !messages.is_empty());
        (module, messages)
    }

    fn resolve_wast(source: &str) -> (Script, Vec<String>) {
        let mut parser = Parser::from_source(source, None, Features::all());
        let mut script = parser.parse_script();
        let mut errors = parser.into_errors();
        assert!(!errors.has_errors(), "{}", errors);
        let result = resolve_script(&mut script, &ReconcileOptions::default(), &mut errors);
        let messages: Vec<_> = errors.iter().map(|d| d.message.clone()).collect();
        assert_eq!(result.is_err(), !messages.is_empty());
        (script, messages)
    }

    fn body(module: &Module, idx: Index) -> &ExprList {
        &module.func(idx).unwrap().exprs
    }

    fn block_body(kind: &ExprKind) -> &ExprList {
        &kind.block().unwrap().exprs
    }

    #[test]
    fn label_stack_depths() {
        let mut labels = LabelStack::default();
        labels.push(Some("outer"));
        labels.push(None);
        labels.push(Some("inner"));
        assert_eq!(labels.find("inner"), Some(0));
        assert_eq!(labels.find("outer"), Some(2));
        assert_eq!(labels.find("nope"), None);
        // Shadowed by the innermost one
        labels.push(Some("outer"));
        assert_eq!(labels.find("outer"), Some(0));
        labels.pop();
        labels.pop();
        assert_eq!(labels.find("outer"), Some(1));
    }

    #[test]
    fn call_and_locals_by_name() {
        let (module, errors) = resolve(
            r#"
            (func $f (param $a i32) (param $b i32) (local $c i32)
              local.get $b
              local.set $c
              call $g)
            (func $g)
            "#,
        );
        assert!(errors.is_empty(), "{:?}", errors);
        let exprs = body(&module, 0);
        assert!(matches!(&exprs[0].kind, ExprKind::LocalGet(Var::Index(1, _))));
        assert!(matches!(&exprs[1].kind, ExprKind::LocalSet(Var::Index(2, _))));
        assert!(matches!(&exprs[2].kind, ExprKind::Call(Var::Index(1, _))));
    }

    #[test]
    fn labels_resolve_to_depth() {
        let (module, errors) = resolve(
            r#"
            (func
              (block $outer
                (loop $inner
                  (block
                    br $inner
                    br $outer
                    br 0
                    br_table $inner $outer 0))))
            "#,
        );
        assert!(errors.is_empty(), "{:?}", errors);
        let outer = &body(&module, 0)[0].kind;
        let inner = &block_body(outer)[0].kind;
        let innermost = block_body(&block_body(inner)[0].kind);
        assert!(matches!(&innermost[0].kind, ExprKind::Br(Var::Index(1, _))));
        assert!(matches!(&innermost[1].kind, ExprKind::Br(Var::Index(2, _))));
        assert!(matches!(&innermost[2].kind, ExprKind::Br(Var::Index(0, _))));
        match &innermost[3].kind {
            ExprKind::BrTable { targets, default } => {
                assert_eq!(targets[0].index(), Some(1));
                assert_eq!(targets[1].index(), Some(2));
                assert_eq!(default.index(), Some(0));
            }
            kind => panic!("unexpected expr: {:?}", kind),
        }
    }

    #[test]
    fn else_branch_shares_the_label() {
        let (module, errors) = resolve(
            r#"
            (func (param i32)
              (if $l (local.get 0)
                (then br $l)
                (else br $l)))
            "#,
        );
        assert!(errors.is_empty(), "{:?}", errors);
        match &body(&module, 0)[1].kind {
            ExprKind::If { block, false_, .. } => {
                assert!(matches!(&block.exprs[0].kind, ExprKind::Br(Var::Index(0, _))));
                assert!(matches!(&false_[0].kind, ExprKind::Br(Var::Index(0, _))));
            }
            kind => panic!("unexpected expr: {:?}", kind),
        }
    }

    #[test]
    fn function_is_not_a_label() {
        let (_, errors) = resolve("(func $f br $f)");
        assert_eq!(errors, vec![r#"undefined label variable "f""#]);
    }

    #[test]
    fn label_out_of_scope_after_end() {
        let (_, errors) = resolve("(func block $b end br $b)");
        assert_eq!(errors, vec![r#"undefined label variable "b""#]);
    }

    #[test]
    fn delegate_resolves_outside_of_its_try() {
        let (module, errors) = resolve(
            r#"
            (func
              (block $outer
                (try $t
                  (do nop)
                  (delegate $outer))))
            "#,
        );
        assert!(errors.is_empty(), "{:?}", errors);
        let try_ = &block_body(&body(&module, 0)[0].kind)[0].kind;
        match try_ {
            ExprKind::Try {
                kind: TryKind::Delegate(var),
                ..
            } => assert_eq!(var.index(), Some(0)),
            kind => panic!("unexpected expr: {:?}", kind),
        }

        // The try's own label is not visible to its delegate
        let (_, errors) = resolve("(func (try $t (do nop) (delegate $t)))");
        assert_eq!(errors, vec![r#"undefined label variable "t""#]);
    }

    #[test]
    fn try_catch_and_try_table() {
        let (module, errors) = resolve(
            r#"
            (tag $e (param i32))
            (func
              (try $t
                (do nop)
                (catch $e drop rethrow $t)
                (catch_all rethrow 0))
              (block $b (result i32)
                (try_table (result i32) (catch $e $b)
                  i32.const 0)))
            "#,
        );
        assert!(errors.is_empty(), "{:?}", errors);
        match &body(&module, 0)[0].kind {
            ExprKind::Try {
                kind: TryKind::Catch(catches),
                ..
            } => {
                assert_eq!(catches[0].var.as_ref().and_then(Var::index), Some(0));
                assert!(matches!(&catches[0].exprs[1].kind, ExprKind::Rethrow(Var::Index(0, _))));
            }
            kind => panic!("unexpected expr: {:?}", kind),
        }
        match &block_body(&body(&module, 0)[1].kind)[0].kind {
            ExprKind::TryTable { catches, .. } => {
                assert_eq!(catches[0].tag.as_ref().and_then(Var::index), Some(0));
                // Counted from outside of the try_table
                assert_eq!(catches[0].target.index(), Some(0));
            }
            kind => panic!("unexpected expr: {:?}", kind),
        }
    }

    #[test]
    fn module_level_references() {
        let (module, errors) = resolve(
            r#"
            (type $t (func))
            (import "m" "f" (func $imported (type $t)))
            (table $tab 1 funcref)
            (memory $mem 1)
            (global $g i32 (i32.const 0))
            (global $h i32 (global.get $g))
            (elem $seg (table $tab) (offset (global.get $g)) func $imported)
            (data $d (memory $mem) (offset (i32.const 0)) "")
            (func $f
              (call_indirect $tab (type $t) (i32.const 0))
              table.init $tab $seg
              elem.drop $seg
              memory.init $mem $d
              data.drop $d
              (drop (i32.load $mem (i32.const 0))))
            (export "f" (func $f))
            (export "mem" (memory $mem))
            (start $f)
            "#,
        );
        assert!(errors.is_empty(), "{:?}", errors);

        let exprs = body(&module, 1);
        match &exprs[1].kind {
            ExprKind::CallIndirect { table, decl } => {
                assert_eq!(table.index(), Some(0));
                assert_eq!(decl.type_var.as_ref().and_then(Var::index), Some(0));
            }
            kind => panic!("unexpected expr: {:?}", kind),
        }
        assert!(matches!(
            &exprs[2].kind,
            ExprKind::TableInit { segment: Var::Index(0, _), table: Var::Index(0, _) }
        ));
        assert!(matches!(&exprs[3].kind, ExprKind::ElemDrop(Var::Index(0, _))));
        assert!(matches!(
            &exprs[4].kind,
            ExprKind::MemoryInit { segment: Var::Index(0, _), memory: Var::Index(0, _) }
        ));
        assert!(matches!(&exprs[5].kind, ExprKind::DataDrop(Var::Index(0, _))));

        let global = module.global(1).unwrap();
        assert!(matches!(&global.init_expr[0].kind, ExprKind::GlobalGet(Var::Index(0, _))));

        let elem = module.elem_segment(0).unwrap();
        assert!(matches!(elem.kind, SegmentKind::Active));
        assert_eq!(elem.table_var.index(), Some(0));
        assert!(matches!(&elem.elem_exprs[0][0].kind, ExprKind::RefFunc(Var::Index(0, _))));

        let exports: Vec<_> = module.exports().map(|e| e.var.index()).collect();
        assert_eq!(exports, vec![Some(1), Some(0)]);
        let start = module.starts.iter().map(|&i| &module.fields[i].kind).next();
        assert!(matches!(start, Some(ModuleFieldKind::Start(Var::Index(1, _)))));
    }

    #[rstest]
    #[case("(func call $nope)", r#"undefined function variable "nope""#)]
    #[case("(func global.get $nope drop)", r#"undefined global variable "nope""#)]
    #[case("(func (local.get $nope) drop)", r#"undefined local variable "nope""#)]
    #[case("(func (call_indirect $nope))", r#"undefined table variable "nope""#)]
    #[case("(func (memory.size $nope) drop)", r#"undefined memory variable "nope""#)]
    #[case("(func (throw $nope))", r#"undefined tag variable "nope""#)]
    #[case("(func (elem.drop $nope))", r#"undefined elem segment variable "nope""#)]
    #[case("(func (data.drop $nope))", r#"undefined data segment variable "nope""#)]
    #[case("(func (type $nope))", r#"undefined function type variable "nope""#)]
    #[case("(export \"e\" (func $nope))", r#"undefined function variable "nope""#)]
    fn undefined_names(#[case] source: &str, #[case] expected: &str) {
        let (_, errors) = resolve(source);
        assert_eq!(errors, vec![expected]);
    }

    #[test]
    fn all_undefined_names_are_reported() {
        let (module, errors) = resolve("(func call $a call $b call 0)");
        assert_eq!(
            errors,
            vec![
                r#"undefined function variable "a""#,
                r#"undefined function variable "b""#,
            ]
        );
        // Unresolved names are left as they are
        assert!(matches!(&body(&module, 0)[0].kind, ExprKind::Call(Var::Name(n, _)) if n == "a"));
    }

    #[rstest]
    #[case("(func $f) (func $f)", r#"redefinition of function "f""#)]
    #[case("(global $g i32 (i32.const 0)) (global $g i32 (i32.const 0))", r#"redefinition of global "g""#)]
    #[case("(type $t (func)) (type $t (func))", r#"redefinition of function type "t""#)]
    #[case("(memory $m 1) (memory $m 1)", r#"redefinition of memory "m""#)]
    #[case("(func (param $x i32) (param $x i32))", r#"redefinition of parameter "x""#)]
    #[case("(func (param $x i32) (local $x i32))", r#"redefinition of local "x""#)]
    #[case("(func (local $x i32) (local $x i32))", r#"redefinition of local "x""#)]
    fn duplicate_bindings(#[case] source: &str, #[case] expected: &str) {
        let (_, errors) = resolve(source);
        assert_eq!(errors, vec![expected]);
    }

    #[test]
    fn redefinition_is_reported_at_later_binding() {
        let source = "(func $f)\n(func $f)";
        let mut parser = Parser::from_source(source, None, Features::all());
        let mut module = parser.parse_module();
        let mut errors = parser.into_errors();
        assert!(resolve_module(&mut module, &mut errors).is_err());
        let diag = errors.iter().next().unwrap();
        assert_eq!(diag.loc.line, 2);
    }

    #[test]
    fn local_references_in_global_init_are_kept() {
        let (module, errors) = resolve("(global i32 (local.get $x))");
        assert!(errors.is_empty(), "{:?}", errors);
        let global = module.global(0).unwrap();
        assert!(matches!(&global.init_expr[0].kind, ExprKind::LocalGet(Var::Name(..))));
    }

    #[test]
    fn script_modules_are_resolved() {
        let (script, errors) = resolve_wast(
            r#"
            (module $m (func $f call $f))
            (assert_unlinkable (module (func call $missing)) "unknown import")
            (assert_return (invoke "f"))
            "#,
        );
        assert_eq!(errors, vec![r#"undefined function variable "missing""#]);
        match &script.commands[0] {
            Command::Module(m) => {
                assert!(matches!(&m.func(0).unwrap().exprs[0].kind, ExprKind::Call(Var::Index(0, _))));
            }
            command => panic!("unexpected command: {:?}", command),
        }
    }

    #[test]
    fn assert_invalid_errors_are_disposable() {
        let (script, errors) = resolve_wast(
            r#"
            (assert_invalid (module (func br $nowhere)) "unknown label")
            (assert_invalid (module (func (result i32))) "type mismatch")
            (assert_malformed (module quote "(func call $nope)") "unknown operator")
            "#,
        );
        assert!(errors.is_empty(), "{:?}", errors);
        assert!(matches!(script.commands[0], Command::AssertInvalidNonBinary { .. }));
        // Resolves fine. Only the validator rejects it
        assert!(matches!(script.commands[1], Command::AssertInvalid { .. }));
        assert!(matches!(script.commands[2], Command::AssertMalformed { .. }));
        match &script.commands[0] {
            Command::AssertInvalidNonBinary { module, text } => {
                assert!(matches!(module, ScriptModule::Text(_)));
                assert_eq!(text, "unknown label");
            }
            command => panic!("unexpected command: {:?}", command),
        }
    }
}
