use super::{is_command, is_module_field, Parse, ParseErrorKind, Parser, Result};
use crate::lexer::{TokenKind, TokenSource, TokenType};
use crate::literal;
use tracing::debug;
use wastir_ir::{
    Action, ActionKind, Command, Const, Index, Location, Module, Opcode, OpcodeClass, Script,
    ScriptModule, Var,
};

// `(i32.const 1)`, `(ref.null func)`, `(ref.extern 1)` and so on in actions and expectations
fn is_const(t0: TokenType<'_>, t1: TokenType<'_>) -> bool {
    t0 == TokenType::LParen
        && matches!(t1, TokenType::Keyword(kw) if kw.ends_with(".const") || matches!(kw, "ref.null" | "ref.func" | "ref.extern"))
}

// https://github.com/WebAssembly/spec/tree/main/interpreter#scripts
//
// (invoke $mod? "name" const*) or (get $mod? "name")
impl<'s> Parse<'s> for Action {
    fn parse<S: TokenSource<'s>>(parser: &mut Parser<'s, S>) -> Result<Self> {
        let (kw, loc) = parser.expect_lpar_keyword()?;
        let module_var = parser.parse_module_var_opt(&loc)?;
        let name = parser.parse_utf8_text()?;
        let kind = match kw {
            "invoke" => ActionKind::Invoke {
                name,
                args: parser.parse_const_list(false)?,
            },
            "get" => ActionKind::Get { name },
            _ => {
                return parser.fail(
                    loc,
                    ParseErrorKind::UnexpectedToken {
                        got: kw.to_string(),
                        expected: "invoke or get".to_string(),
                    },
                )
            }
        };
        parser.expect_rpar()?;
        Ok(Action {
            loc,
            module_var,
            kind,
        })
    }
}

impl<'s, S: TokenSource<'s>> Parser<'s, S> {
    // Whole .wast input. Bare module fields form one implicit module command
    pub fn parse_script(&mut self) -> Script {
        let mut script = Script::new();
        let (t0, t1) = self.peek_pair();
        let parsed = if is_module_field(t0, t1) {
            let mut module = Module::new();
            module.loc = self.peek_loc();
            let parsed = self.parse_module_field_list(&mut module);
            script.commands.push(Command::Module(module));
            self.last_module = Some(0);
            parsed
        } else {
            self.parse_command_list(&mut script)
        };
        if parsed.is_ok() {
            self.expect_eof();
        }
        debug!(
            commands = script.commands.len(),
            errors = self.errors.error_count(),
            "parsed script"
        );
        script
    }

    fn parse_command_list(&mut self, script: &mut Script) -> Result<()> {
        while is_command(self.peek(0), self.peek(1)) {
            match self.parse_command(script) {
                Ok(command) => script.commands.push(command),
                Err(_) => self.synchronize(is_command)?,
            }
        }
        Ok(())
    }

    fn parse_command(&mut self, script: &mut Script) -> Result<Command> {
        if let TokenType::Keyword("module") = self.peek(1) {
            return self.parse_module_command(script);
        }
        if let TokenType::Keyword("invoke" | "get") = self.peek(1) {
            return Ok(Command::Action(self.parse()?));
        }

        let (kw, loc) = self.expect_lpar_keyword()?;
        let command = match kw {
            "register" => {
                let name = self.parse_utf8_text()?;
                let module_var = self.parse_module_var_opt(&loc)?;
                Command::Register {
                    loc,
                    name,
                    module_var,
                }
            }
            "assert_malformed" => {
                let (module, text) = self.parse_module_assertion()?;
                Command::AssertMalformed { module, text }
            }
            "assert_invalid" => {
                let (module, text) = self.parse_module_assertion()?;
                Command::AssertInvalid { module, text }
            }
            "assert_unlinkable" => {
                let (module, text) = self.parse_module_assertion()?;
                Command::AssertUnlinkable { module, text }
            }
            "assert_uninstantiable" => {
                let (module, text) = self.parse_module_assertion()?;
                Command::AssertUninstantiable { module, text }
            }
            // A module which traps while running its start function
            "assert_trap" if self.peek_match_lpar("module") => {
                let (module, text) = self.parse_module_assertion()?;
                Command::AssertUninstantiable { module, text }
            }
            "assert_trap" => {
                let action = self.parse()?;
                let text = self.parse_utf8_text()?;
                Command::AssertTrap { action, text }
            }
            "assert_exhaustion" => {
                let action = self.parse()?;
                let text = self.parse_utf8_text()?;
                Command::AssertExhaustion { action, text }
            }
            "assert_exception" => Command::AssertException {
                action: self.parse()?,
            },
            "assert_return" => {
                let action = self.parse()?;
                let expected = self.parse_const_list(true)?;
                Command::AssertReturn { action, expected }
            }
            _ => {
                // `input` and `output` are recognized as commands but cannot be run here
                self.report(loc, ParseErrorKind::UnsupportedCommand(kw.to_string()));
                self.parse_var_opt()?;
                self.parse_text_list();
                self.expect_rpar()?;
                return Err(wastir_ir::Failed);
            }
        };
        self.expect_rpar()?;
        Ok(command)
    }

    fn parse_module_command(&mut self, script: &mut Script) -> Result<Command> {
        let module = self.parse_script_module()?;
        let index = script.commands.len() as Index;
        if let Some(name) = module.name() {
            if !script.module_bindings.insert(name, index, module.loc().clone()) {
                let name = name.to_string();
                self.report(module.loc().clone(), ParseErrorKind::ModuleRedefinition(name));
            }
        }
        self.last_module = Some(index);
        Ok(match module {
            ScriptModule::Text(module) => Command::Module(module),
            module => Command::ScriptModule(module),
        })
    }

    // (module $name? field*), (module $name? binary "..."*) or (module $name? quote "..."*)
    fn parse_script_module(&mut self) -> Result<ScriptModule> {
        let mut module = Module::new();
        self.parse_module_header(&mut module)?;

        let script_module = match self.peek(0) {
            TokenType::Keyword("binary") => {
                self.consume();
                ScriptModule::Binary {
                    name: module.name,
                    loc: module.loc,
                    data: self.parse_text_list(),
                }
            }
            TokenType::Keyword("quote") => {
                self.consume();
                ScriptModule::Quoted {
                    name: module.name,
                    loc: module.loc,
                    data: self.parse_text_list(),
                }
            }
            t0 => {
                if is_module_field(t0, self.peek(1)) {
                    self.parse_module_field_list(&mut module)?;
                } else if t0 != TokenType::RParen {
                    return self.error_expected(&["a module field"]);
                }
                ScriptModule::Text(module)
            }
        };

        self.expect_rpar()?;
        Ok(script_module)
    }

    // Module followed by the expected failure message
    fn parse_module_assertion(&mut self) -> Result<(ScriptModule, String)> {
        let module = self.parse_script_module()?;
        let text = self.parse_utf8_text()?;
        Ok((module, text))
    }

    // Module reference of actions and register. Defaults to the latest module command. `Index::MAX`
    // stands for "no module" when no module was defined yet
    fn parse_module_var_opt(&mut self, loc: &Location) -> Result<Var> {
        Ok(match self.parse_var_opt()? {
            Some(var) => var,
            None => Var::Index(self.last_module.unwrap_or(Index::MAX), loc.clone()),
        })
    }

    fn parse_const_list(&mut self, allow_nan_pattern: bool) -> Result<Vec<Const>> {
        let mut consts = vec![];
        while is_const(self.peek(0), self.peek(1)) {
            consts.push(self.parse_script_const(allow_nan_pattern)?);
        }
        Ok(consts)
    }

    // Payload of `ref.func` and `ref.extern`. Expectations may omit it to accept any reference
    fn parse_ref_payload_opt(&mut self) -> Result<Option<u64>> {
        let tok = self.peek_cloned();
        match tok.kind {
            TokenKind::Nat(base, digits) => {
                self.consume();
                match literal::parse_u64(digits, base) {
                    Some(n) => Ok(Some(n)),
                    None => self.fail(tok.loc, ParseErrorKind::InvalidLiteral(tok.text.to_string())),
                }
            }
            _ => Ok(None),
        }
    }

    fn parse_script_const(&mut self, allow_nan_pattern: bool) -> Result<Const> {
        let (kw, loc) = self.expect_lpar_keyword()?;
        let features = self.features;
        let value = match kw {
            "ref.null" => {
                self.require(features.reference_types, kw, &loc);
                Const::RefNull(self.parse_heap_type()?)
            }
            "ref.func" => {
                self.require(features.reference_types, kw, &loc);
                let tok = self.peek_cloned();
                match self.parse_ref_payload_opt()? {
                    Some(idx) => match u32::try_from(idx) {
                        Ok(idx) => Const::RefFunc(Some(idx)),
                        Err(_) => {
                            return self
                                .fail(tok.loc, ParseErrorKind::InvalidLiteral(tok.text.to_string()))
                        }
                    },
                    None => Const::RefFunc(None),
                }
            }
            "ref.extern" => {
                self.require(features.reference_types, kw, &loc);
                Const::RefExtern(self.parse_ref_payload_opt()?)
            }
            _ => match Opcode::from_mnemonic(kw).filter(|op| op.class() == OpcodeClass::Const) {
                Some(opcode) => {
                    self.require(features.is_enabled(opcode.feature()), kw, &loc);
                    self.parse_const_operand(opcode, allow_nan_pattern)?
                }
                None => {
                    return self.fail(
                        loc,
                        ParseErrorKind::UnexpectedToken {
                            got: kw.to_string(),
                            expected: "a constant".to_string(),
                        },
                    )
                }
            },
        };
        self.expect_rpar()?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::messages;
    use crate::options::Features;
    use crate::parser::Parser;
    use wastir_ir::*;

    fn parse_wast_with(source: &str, features: Features) -> (Script, Errors) {
        let mut parser = Parser::from_source(source, None, features);
        let script = parser.parse_script();
        (script, parser.into_errors())
    }

    fn parse_wast(source: &str) -> (Script, Errors) {
        parse_wast_with(source, Features::default())
    }

    #[test]
    fn bare_fields_form_implicit_module() {
        let (script, errors) = parse_wast(r#"(func $f) (export "f" (func $f))"#);
        assert!(errors.is_empty(), "{}", errors);
        assert_eq!(script.commands.len(), 1);
        assert!(matches!(&script.commands[0], Command::Module(m) if m.funcs.len() == 1 && m.exports.len() == 1));
    }

    #[test]
    fn empty_script() {
        let (script, errors) = parse_wast("");
        assert!(errors.is_empty());
        assert!(script.commands.is_empty());
    }

    #[test]
    fn module_commands_and_bindings() {
        let (script, errors) = parse_wast(
            r#"
            (module $a (func))
            (module $b binary "\00asm" "\01\00\00\00")
            (module quote "(func)")
            (module)
            "#,
        );
        assert!(errors.is_empty(), "{}", errors);
        assert_eq!(script.commands.len(), 4);
        assert!(matches!(&script.commands[0], Command::Module(m) if m.name.as_deref() == Some("a")));
        assert!(matches!(
            &script.commands[1],
            Command::ScriptModule(ScriptModule::Binary { data, .. }) if data.len() == 8
        ));
        assert!(matches!(
            &script.commands[2],
            Command::ScriptModule(ScriptModule::Quoted { data, .. }) if data == b"(func)"
        ));
        assert_eq!(script.module_bindings.index_of("a"), Some(0));
        assert_eq!(script.module_bindings.index_of("b"), Some(1));
    }

    #[test]
    fn module_redefinition() {
        let (script, errors) = parse_wast("(module $m) (module $m)");
        assert_eq!(script.commands.len(), 2);
        assert_eq!(messages(&errors), vec!["redefinition of module \"m\"".to_string()]);
        assert_eq!(script.module_bindings.index_of("m"), Some(0));
    }

    #[test]
    fn actions_default_to_latest_module() {
        let (script, errors) = parse_wast(
            r#"
            (invoke "early")
            (module $m1)
            (module $m2)
            (invoke "f" (i32.const 1) (f32.const 2.5))
            (get $m1 "g")
            (register "lib")
            "#,
        );
        assert!(errors.is_empty(), "{}", errors);
        match &script.commands[0] {
            Command::Action(a) => assert_eq!(a.module_var.index(), Some(Index::MAX)),
            c => panic!("unexpected {:?}", c),
        }
        match &script.commands[3] {
            Command::Action(Action {
                module_var,
                kind: ActionKind::Invoke { name, args },
                ..
            }) => {
                assert_eq!(module_var.index(), Some(2));
                assert_eq!(name, "f");
                assert_eq!(
                    args,
                    &vec![Const::I32(1), Const::F32(FloatLiteral::Bits(0x4020_0000))]
                );
            }
            c => panic!("unexpected {:?}", c),
        }
        match &script.commands[4] {
            Command::Action(Action {
                module_var,
                kind: ActionKind::Get { name },
                ..
            }) => {
                assert_eq!(module_var.name(), Some("m1"));
                assert_eq!(name, "g");
            }
            c => panic!("unexpected {:?}", c),
        }
        assert!(matches!(
            &script.commands[5],
            Command::Register { name, module_var: Var::Index(2, _), .. } if name == "lib"
        ));
    }

    #[test]
    fn assert_return_expectations() {
        let (script, errors) = parse_wast(
            r#"
            (module)
            (assert_return (invoke "f") (f32.const nan:canonical) (f64.const nan:arithmetic))
            (assert_return (invoke "g") (v128.const f32x4 nan:canonical 1 2 3))
            (assert_return (invoke "h") (ref.null extern) (ref.func) (ref.extern 7))
            "#,
        );
        assert!(errors.is_empty(), "{}", errors);
        assert!(matches!(
            &script.commands[1],
            Command::AssertReturn { expected, .. } if expected == &vec![
                Const::F32(FloatLiteral::Nan(ExpectedNan::Canonical)),
                Const::F64(FloatLiteral::Nan(ExpectedNan::Arithmetic)),
            ]
        ));
        assert!(matches!(
            &script.commands[2],
            Command::AssertReturn { expected, .. }
                if matches!(expected[0], Const::V128(V128Lanes::F32x4([FloatLiteral::Nan(_), ..])))
        ));
        assert!(matches!(
            &script.commands[3],
            Command::AssertReturn { expected, .. } if expected == &vec![
                Const::RefNull(ValType::ExternRef),
                Const::RefFunc(None),
                Const::RefExtern(Some(7)),
            ]
        ));
    }

    #[test]
    fn nan_pattern_only_in_expectations() {
        let (_, errors) = parse_wast(r#"(module) (invoke "f" (f32.const nan:canonical))"#);
        assert_eq!(errors.error_count(), 1);
    }

    #[test]
    fn module_assertions() {
        let (script, errors) = parse_wast(
            r#"
            (assert_malformed (module quote "(func") "unexpected end")
            (assert_invalid (module (func (result i32))) "type mismatch")
            (assert_unlinkable (module (import "m" "f" (func))) "unknown import")
            (assert_trap (module (func $f unreachable) (start $f)) "unreachable")
            (assert_uninstantiable (module) "oops")
            "#,
        );
        assert!(errors.is_empty(), "{}", errors);
        let names: Vec<_> = script.commands.iter().map(Command::name).collect();
        assert_eq!(
            names,
            vec![
                "assert_malformed",
                "assert_invalid",
                "assert_unlinkable",
                "assert_uninstantiable",
                "assert_uninstantiable",
            ]
        );
        // Modules inside assertions are never bound
        assert!(script.module_bindings.is_empty());
    }

    #[test]
    fn action_assertions() {
        let (script, errors) = parse_wast(
            r#"
            (module)
            (assert_trap (invoke "div" (i32.const 1) (i32.const 0)) "integer divide by zero")
            (assert_exhaustion (invoke "loop") "call stack exhausted")
            "#,
        );
        assert!(errors.is_empty(), "{}", errors);
        assert!(matches!(&script.commands[1], Command::AssertTrap { text, .. } if text == "integer divide by zero"));
        assert!(matches!(&script.commands[2], Command::AssertExhaustion { .. }));

        let mut features = Features::default();
        features.exceptions = true;
        let (script, errors) =
            parse_wast_with(r#"(module) (assert_exception (invoke "throw"))"#, features);
        assert!(errors.is_empty(), "{}", errors);
        assert!(matches!(&script.commands[1], Command::AssertException { .. }));
    }

    #[test]
    fn unsupported_commands() {
        let (script, errors) = parse_wast(r#"(input "foo.wast") (output $m "out") (module)"#);
        assert_eq!(script.commands.len(), 1);
        assert_eq!(
            messages(&errors),
            vec![
                "input command is not supported".to_string(),
                "output command is not supported".to_string(),
            ]
        );
    }

    #[test]
    fn recovers_at_next_command() {
        let (script, errors) = parse_wast(r#"(register) (module $ok) (invoke "f")"#);
        assert_eq!(
            messages(&errors),
            vec!["unexpected token \")\", expected a quoted string.".to_string()]
        );
        assert_eq!(script.commands.len(), 2);
        assert!(matches!(&script.commands[0], Command::Module(_)));
        assert!(matches!(&script.commands[1], Command::Action(_)));
    }

    #[test]
    fn bad_module_body() {
        let (script, errors) = parse_wast("(module foo) (module $ok)");
        assert_eq!(
            messages(&errors),
            vec!["unexpected token \"foo\", expected a module field.".to_string()]
        );
        assert_eq!(script.commands.len(), 1);
        assert_eq!(script.module_bindings.index_of("ok"), Some(0));
    }
}
