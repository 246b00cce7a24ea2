// Reconciles the two halves of type uses. A site may write `(type $t)`, an inline signature, both,
// or neither. After this pass every site has its signature filled in, every site which needs a
// type index has one, and both halves are known to agree.

use std::fmt;
use thiserror::Error;
use tracing::{debug, trace};
use wastir_ir::{
    BindingTable, Errors, ExprKind, ExprList, Failed, FuncDeclaration, FuncSignature, FuncType,
    ImportDesc, Index, Location, Module, ModuleField, ModuleFieldKind, TryKind, ValType, Var,
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileOptions {
    // Reuse the first type entry with an identical signature instead of appending a new one
    pub dedup_func_types: bool,
}

// Entry of a parameter or result list which may be missing when the lists differ in length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeEntry(pub Option<ValType>);

impl fmt::Display for TypeEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(ty) => f.write_str(ty.name()),
            None => f.write_str("none"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconcileErrorKind {
    #[error("type mismatch for {what} {index} of function. got {actual}, expected {expected}")]
    TypeMismatch {
        what: &'static str,
        index: usize,
        actual: TypeEntry,
        expected: TypeEntry,
    },
    #[error("invalid func type index {0}")]
    InvalidFuncTypeIndex(Index),
}

struct Reconciler<'a> {
    options: &'a ReconcileOptions,
    errors: &'a mut Errors,
    // Signatures of all type entries by index, synthesized ones included
    sigs: Vec<FuncSignature>,
    type_bindings: BindingTable,
    num_defined: usize,
    synthesized: Vec<Location>,
}

impl<'a> Reconciler<'a> {
    fn new(module: &Module, options: &'a ReconcileOptions, errors: &'a mut Errors) -> Self {
        let sigs: Vec<_> = (0..module.types.len() as Index)
            .map(|i| module.func_type(i).map(|t| t.sig.clone()).unwrap_or_default())
            .collect();
        Self {
            options,
            errors,
            num_defined: sigs.len(),
            sigs,
            type_bindings: module.type_bindings.clone(),
            synthesized: vec![],
        }
    }

    fn lookup(&self, var: &Var) -> Option<&FuncSignature> {
        let idx = match var {
            Var::Index(idx, _) => *idx,
            Var::Name(name, _) => self.type_bindings.index_of(name)?,
        };
        self.sigs.get(idx as usize)
    }

    fn synthesize(&mut self, sig: &FuncSignature, loc: &Location) -> Index {
        if self.options.dedup_func_types {
            if let Some(idx) = self.sigs.iter().position(|s| s == sig) {
                return idx as Index;
            }
        }
        let idx = self.sigs.len() as Index;
        trace!(idx, %sig, "synthesized function type");
        self.sigs.push(sig.clone());
        self.synthesized.push(loc.clone());
        idx
    }

    fn check_types(&mut self, what: &'static str, actual: &[ValType], expected: &[ValType], loc: &Location) {
        for index in 0..actual.len().max(expected.len()) {
            let actual = TypeEntry(actual.get(index).copied());
            let expected = TypeEntry(expected.get(index).copied());
            if actual != expected {
                let kind = ReconcileErrorKind::TypeMismatch {
                    what,
                    index,
                    actual,
                    expected,
                };
                self.errors.error(loc.clone(), kind.to_string());
            }
        }
    }

    // The referenced type entry wins over the inline signature. Returns the number of params the
    // site had before its signature was replaced by the referenced one
    fn reconcile_decl(
        &mut self,
        decl: &mut FuncDeclaration,
        loc: &Location,
        needs_index: bool,
    ) -> Option<Index> {
        let var = match &decl.type_var {
            Some(var) => var,
            None => {
                if needs_index || !decl.sig.is_inlinable() {
                    let idx = self.synthesize(&decl.sig, loc);
                    decl.type_var = Some(Var::Index(idx, loc.clone()));
                }
                return None;
            }
        };

        match self.lookup(var) {
            Some(sig) if decl.sig.is_empty() => {
                decl.sig = sig.clone();
                Some(0)
            }
            Some(sig) if *sig == decl.sig => None,
            Some(sig) => {
                let expected = sig.clone();
                self.check_types("result", &decl.sig.results, &expected.results, loc);
                self.check_types("argument", &decl.sig.params, &expected.params, loc);
                let num_params = decl.sig.params.len() as Index;
                decl.sig = expected;
                Some(num_params)
            }
            // Undefined names are reported by the name resolver
            None => {
                if let Var::Index(idx, _) = var {
                    if !decl.sig.is_empty() {
                        let msg = ReconcileErrorKind::InvalidFuncTypeIndex(*idx).to_string();
                        self.errors.error(loc.clone(), msg);
                    }
                }
                None
            }
        }
    }

    fn reconcile_exprs(&mut self, exprs: &mut ExprList) {
        for expr in exprs.iter_mut() {
            let loc = &expr.loc;
            match &mut expr.kind {
                ExprKind::Block(block) | ExprKind::Loop(block) | ExprKind::TryTable { block, .. } => {
                    self.reconcile_decl(&mut block.decl, loc, false);
                    self.reconcile_exprs(&mut block.exprs);
                }
                ExprKind::If { block, false_, .. } => {
                    self.reconcile_decl(&mut block.decl, loc, false);
                    self.reconcile_exprs(&mut block.exprs);
                    self.reconcile_exprs(false_);
                }
                ExprKind::Try { block, kind } => {
                    self.reconcile_decl(&mut block.decl, loc, false);
                    self.reconcile_exprs(&mut block.exprs);
                    if let TryKind::Catch(catches) = kind {
                        for catch in catches.iter_mut() {
                            self.reconcile_exprs(&mut catch.exprs);
                        }
                    }
                }
                ExprKind::CallIndirect { decl, .. } | ExprKind::ReturnCallIndirect { decl, .. } => {
                    self.reconcile_decl(decl, loc, true);
                }
                _ => {}
            }
        }
    }

    fn reconcile_field(&mut self, field: &mut ModuleField) {
        let loc = &field.loc;
        match &mut field.kind {
            ModuleFieldKind::Func(func) => {
                if let Some(num_params) = self.reconcile_decl(&mut func.decl, loc, true) {
                    // Locals were bound after the params written inline. Params come first in
                    // the shared index space
                    let to = func.num_params();
                    func.bindings.rebase_indices(num_params, to);
                }
                self.reconcile_exprs(&mut func.exprs);
            }
            ModuleFieldKind::Import(import) => match &mut import.desc {
                ImportDesc::Func(func) => {
                    self.reconcile_decl(&mut func.decl, loc, true);
                }
                ImportDesc::Tag(tag) => {
                    self.reconcile_decl(&mut tag.decl, loc, true);
                }
                _ => {}
            },
            ModuleFieldKind::Tag(tag) => {
                self.reconcile_decl(&mut tag.decl, loc, true);
            }
            ModuleFieldKind::Global(global) => self.reconcile_exprs(&mut global.init_expr),
            ModuleFieldKind::ElemSegment(elem) => {
                self.reconcile_exprs(&mut elem.offset);
                for exprs in elem.elem_exprs.iter_mut() {
                    self.reconcile_exprs(exprs);
                }
            }
            ModuleFieldKind::DataSegment(data) => self.reconcile_exprs(&mut data.offset),
            _ => {}
        }
    }
}

// Synthesized type entries are appended at the end of the module in order of first use
pub fn reconcile_module(
    module: &mut Module,
    options: &ReconcileOptions,
    errors: &mut Errors,
) -> Result<(), Failed> {
    let before = errors.error_count();
    let mut reconciler = Reconciler::new(module, options, errors);
    for field in module.fields.iter_mut() {
        reconciler.reconcile_field(field);
    }

    let Reconciler {
        sigs,
        num_defined,
        synthesized,
        errors,
        ..
    } = reconciler;
    for (sig, loc) in sigs.into_iter().skip(num_defined).zip(synthesized) {
        let ty = FuncType { name: None, sig };
        module.append_field(ModuleField::new(ModuleFieldKind::Type(ty), loc));
    }

    debug!(
        types = module.types.len(),
        errors = errors.error_count() - before,
        "reconciled function types"
    );
    errors.pass_result(before)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Features;
    use crate::parser::Parser;
    use rstest::rstest;

    fn reconcile_with(source: &str, dedup_func_types: bool) -> (Module, Vec<String>) {
        let mut parser = Parser::from_source(source, None, Features::all());
        let mut module = parser.parse_module();
        let mut errors = parser.into_errors();
        assert!(!errors.has_errors(), "{}", errors);
        let options = ReconcileOptions { dedup_func_types };
        let result = reconcile_module(&mut module, &options, &mut errors);
        let messages: Vec<_> = errors.iter().map(|d| d.message.clone()).collect();
        assert_eq!(result.is_err(), !messages.is_empty());
        (module, messages)
    }

    fn reconcile(source: &str) -> (Module, Vec<String>) {
        reconcile_with(source, false)
    }

    fn type_index(decl: &FuncDeclaration) -> Option<Index> {
        decl.type_var.as_ref().and_then(Var::index)
    }

    #[test]
    fn implicit_function_types_are_synthesized() {
        let (module, errors) = reconcile("(func (param i32)) (func (param i32)) (func)");
        assert!(errors.is_empty(), "{:?}", errors);
        assert_eq!(module.types.len(), 3);
        for i in 0..3 {
            assert_eq!(type_index(&module.func(i).unwrap().decl), Some(i));
        }
        assert_eq!(module.func_type(0).unwrap().sig.params, vec![ValType::I32]);
        assert!(module.func_type(2).unwrap().sig.is_empty());
        // Appended after the functions
        assert!(matches!(module.fields.last().unwrap().kind, ModuleFieldKind::Type(_)));
    }

    #[test]
    fn dedup_reuses_identical_types() {
        let (module, errors) = reconcile_with(
            "(type (func (param i32))) (func (param i32)) (func (param i32)) (func (result f64)) (func (result f64))",
            true,
        );
        assert!(errors.is_empty(), "{:?}", errors);
        assert_eq!(module.types.len(), 2);
        let indices: Vec<_> = (0..4).map(|i| type_index(&module.func(i).unwrap().decl)).collect();
        assert_eq!(indices, vec![Some(0), Some(0), Some(1), Some(1)]);
    }

    #[test]
    fn signature_copied_from_type_use() {
        let (module, errors) =
            reconcile("(type $t (func (param i32 i64) (result f32))) (func (type $t) (local $x f64))");
        assert!(errors.is_empty(), "{:?}", errors);
        let func = module.func(0).unwrap();
        assert_eq!(func.decl.sig.params, vec![ValType::I32, ValType::I64]);
        assert_eq!(func.decl.sig.results, vec![ValType::F32]);
        assert_eq!(func.bindings.index_of("x"), Some(2));
        assert_eq!(func.local_type(2), Some(ValType::F64));
        assert_eq!(module.types.len(), 1);
    }

    #[rstest]
    #[case(
        "(type (func (param i32))) (func (type 0) (param i64))",
        &["type mismatch for argument 0 of function. got i64, expected i32"]
    )]
    #[case(
        "(type (func (param i32))) (func (type 0) (param i32) (result i32))",
        &["type mismatch for result 0 of function. got i32, expected none"]
    )]
    #[case(
        "(type (func (param i32 f32) (result i32))) (func (type 0) (param i32) (result i64))",
        &[
            "type mismatch for result 0 of function. got i64, expected i32",
            "type mismatch for argument 1 of function. got none, expected f32",
        ]
    )]
    #[case("(func (type 3) (param i32))", &["invalid func type index 3"])]
    #[case("(type (func)) (func (type 0) (param i32))", &["type mismatch for argument 0 of function. got i32, expected none"])]
    fn mismatching_type_uses(#[case] source: &str, #[case] expected: &[&str]) {
        let (_, errors) = reconcile(source);
        assert_eq!(errors, expected);
    }

    #[rstest]
    #[case("(param i32)")]
    #[case("(param $p i32) (param i32 i32 f64)")]
    fn referenced_type_wins_after_mismatch(#[case] params: &str) {
        let source = format!(
            "(type $t (func (param i32 i64) (result f32))) (func (type $t) {} (local $x f64))",
            params
        );
        let (module, errors) = reconcile(&source);
        assert!(!errors.is_empty());
        let func = module.func(0).unwrap();
        assert_eq!(func.decl.sig.params, vec![ValType::I32, ValType::I64]);
        assert_eq!(func.decl.sig.results, vec![ValType::F32]);
        assert_eq!(func.num_params(), 2);
        // The local moved from behind the inline params to behind the referenced ones
        assert_eq!(func.bindings.index_of("x"), Some(2));
        assert_eq!(func.local_type(2), Some(ValType::F64));
        if params.contains("$p") {
            assert_eq!(func.bindings.index_of("p"), Some(0));
        }
    }

    #[test]
    fn undefined_type_name_is_left_to_resolver() {
        let (module, errors) = reconcile("(func (type $nope) (param i32))");
        assert!(errors.is_empty(), "{:?}", errors);
        assert!(module.types.is_empty());
    }

    #[test]
    fn block_types() {
        let (module, errors) = reconcile(
            r#"(func
                (block (result i32) (i32.const 0)) drop
                (block (param i32) (drop) (i32.const 1))
                (loop (result i32 i64) unreachable) drop drop
                (block (type 0))
            )"#,
        );
        assert!(errors.is_empty(), "{:?}", errors);
        let func = module.func(0).unwrap();
        let decls: Vec<_> = func
            .exprs
            .iter()
            .filter_map(|e| e.kind.block())
            .map(|b| b.decl.clone())
            .collect();
        // The function type is 0, the blocks with params or multiple results get their own
        assert_eq!(type_index(&func.decl), Some(0));
        assert_eq!(decls.len(), 4);
        assert_eq!(decls[0].type_var, None);
        assert_eq!(type_index(&decls[1]), Some(1));
        assert_eq!(type_index(&decls[2]), Some(2));
        assert!(decls[3].sig.is_empty());
        assert_eq!(module.types.len(), 3);
    }

    #[test]
    fn nested_blocks_and_call_indirect() {
        let (module, errors) = reconcile(
            r#"(table 1 funcref)
            (func
                (if (i32.const 1)
                    (then (block (param i32) (drop)))
                    (else (call_indirect (param i64) (i64.const 1) (i32.const 0))))
            )"#,
        );
        assert!(errors.is_empty(), "{:?}", errors);
        let sigs: Vec<_> = (0..module.types.len() as Index)
            .map(|i| module.func_type(i).unwrap().sig.to_string())
            .collect();
        assert_eq!(sigs, vec!["[] -> []", "[i32] -> []", "[i64] -> []"]);
    }

    #[test]
    fn imports_and_tags() {
        let (module, errors) = reconcile(
            r#"(type $t (func (param i32)))
            (import "m" "f" (func (type $t)))
            (import "m" "e" (tag (param f32)))
            (tag (type $t))"#,
        );
        assert!(errors.is_empty(), "{:?}", errors);
        assert_eq!(module.func(0).unwrap().decl.sig.params, vec![ValType::I32]);
        assert_eq!(type_index(&module.tag(0).unwrap().decl), Some(1));
        assert_eq!(module.tag(1).unwrap().decl.sig.params, vec![ValType::I32]);
        assert_eq!(module.types.len(), 2);
    }
}
