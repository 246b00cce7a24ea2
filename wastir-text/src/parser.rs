// Recursive descent parser building the IR from tokens.
//
// Every production returns `Result<T, Failed>`. Errors are recorded into `Errors` at the point
// where they are detected and `Failed` only unwinds to the nearest list production, which skips
// a bounded number of tokens and continues with the next item. This way one input reports as many
// independent errors as possible and still produces a best-effort tree.

mod instr;
mod module;
mod script;

use crate::lexer::{Lexer, NumBase, Token, TokenKind, TokenSource, TokenType};
use crate::literal;
use crate::options::Features;
use std::collections::VecDeque;
use thiserror::Error;
use tracing::trace;
use wastir_ir::{
    BindingTable, Errors, ExternalKind, Failed, FuncDeclaration, FuncSignature, Index, Limits,
    Location, ValType, Var,
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    #[error("unexpected token \"{got}\", expected {expected}.")]
    UnexpectedToken { got: String, expected: String },
    #[error("invalid int \"{0}\"")]
    InvalidInt(String),
    #[error("invalid literal \"{0}\"")]
    InvalidLiteral(String),
    #[error("invalid offset \"{0}\"")]
    InvalidOffset(String),
    #[error("invalid alignment \"{0}\"")]
    InvalidAlignment(String),
    #[error("offset must be less than or equal to 0xffffffff")]
    OffsetOutOfRange,
    #[error("alignment must be power-of-two")]
    AlignmentNotPowerOfTwo,
    #[error("lane index \"{0}\" out-of-range [0, 32)")]
    LaneOutOfRange(String),
    #[error("unexpected label \"{0}\"")]
    UnexpectedLabel(String),
    #[error("mismatching label \"{begin}\" != \"{end}\"")]
    MismatchingLabel { begin: String, end: String },
    #[error("multiple start sections")]
    MultipleStart,
    #[error("imports must occur before all non-import definitions")]
    ImportAfterDefinition,
    #[error("multiple catch_all clauses not allowed")]
    MultipleCatchAll,
    #[error("quoted string has an invalid utf-8 encoding")]
    InvalidUtf8,
    #[error("opcode not allowed: {0}")]
    OpcodeNotAllowed(String),
    #[error("value type not allowed: {0}")]
    ValueTypeNotAllowed(ValType),
    #[error("{0} not allowed")]
    FeatureNotAllowed(&'static str),
    #[error("annotations not enabled: {0}")]
    AnnotationsNotEnabled(String),
    #[error("{0} command is not supported")]
    UnsupportedCommand(String),
    #[error("redefinition of module \"{0}\"")]
    ModuleRedefinition(String),
}

pub(crate) type Result<T> = ::std::result::Result<T, Failed>;

// Max number of tokens skipped while looking for the start of the next item after an error
pub const MAX_SYNC_TOKENS: usize = 10;

const CODE_METADATA_PREFIX: &str = "metadata.code.";

pub trait Parse<'s>: Sized {
    fn parse<S: TokenSource<'s>>(parser: &mut Parser<'s, S>) -> Result<Self>;
}

pub struct Parser<'s, S: TokenSource<'s> = Lexer<'s>> {
    source: S,
    // Lookahead buffer. Annotations skipped by `next_significant_token` never enter it
    tokens: VecDeque<Token<'s>>,
    errors: Errors,
    features: Features,
    // Command index of the latest module in a script. Actions without a module var refer to it
    last_module: Option<Index>,
}

impl<'s> Parser<'s, Lexer<'s>> {
    pub fn from_source(source: &'s str, file: Option<&str>, features: Features) -> Self {
        let lexer = match file {
            Some(file) => Lexer::with_file(source, file),
            None => Lexer::new(source),
        };
        Parser::new(lexer, features)
    }
}

impl<'s, S: TokenSource<'s>> Parser<'s, S> {
    pub fn new(source: S, features: Features) -> Self {
        Parser {
            source,
            tokens: VecDeque::new(),
            errors: Errors::new(),
            features,
            last_module: None,
        }
    }

    pub fn parse<P: Parse<'s>>(&mut self) -> Result<P> {
        P::parse(self)
    }

    pub fn errors(&self) -> &Errors {
        &self.errors
    }

    pub fn into_errors(self) -> Errors {
        self.errors
    }

    fn report(&mut self, loc: Location, kind: ParseErrorKind) {
        self.errors.error(loc, kind.to_string());
    }

    fn fail<T>(&mut self, loc: Location, kind: ParseErrorKind) -> Result<T> {
        self.report(loc, kind);
        Err(Failed)
    }

    fn report_unexpected(&mut self, expected: &[&str]) {
        let tok = self.peek_token();
        let got = tok.to_string();
        let loc = tok.loc.clone();
        let expected = expected.join(" or ");
        self.report(loc, ParseErrorKind::UnexpectedToken { got, expected });
    }

    fn error_expected<T>(&mut self, expected: &[&str]) -> Result<T> {
        self.report_unexpected(expected);
        Err(Failed)
    }

    fn require(&mut self, enabled: bool, opcode: &str, loc: &Location) {
        if !enabled {
            self.report(loc.clone(), ParseErrorKind::OpcodeNotAllowed(opcode.to_string()));
        }
    }

    fn require_feature(&mut self, enabled: bool, what: &'static str, loc: &Location) {
        if !enabled {
            self.report(loc.clone(), ParseErrorKind::FeatureNotAllowed(what));
        }
    }

    // Reads the next token the grammar cares about. Lex errors are reported and the broken input
    // is skipped. Annotations which the grammar does not consume are skipped as a whole.
    fn next_significant_token(&mut self) -> Token<'s> {
        loop {
            let tok = match self.source.next_token() {
                Ok(tok) => tok,
                Err(err) => {
                    self.errors.error(err.loc.clone(), err.to_string());
                    continue;
                }
            };

            let name = match tok.kind {
                TokenKind::LParenAnnotation(name) => name,
                _ => return tok,
            };

            if !self.features.annotations {
                self.report(
                    tok.loc.clone(),
                    ParseErrorKind::AnnotationsNotEnabled(name.to_string()),
                );
            } else if name == "custom"
                || (self.features.code_metadata && name.starts_with(CODE_METADATA_PREFIX))
            {
                return tok;
            }

            trace!("skip annotation @{} at {}", name, tok.loc);
            if let Some(eof) = self.skip_annotation() {
                return eof;
            }
        }
    }

    // Skips tokens until the parenthesis opened by an annotation is closed. Returns the EOF token
    // when the input ends before that.
    fn skip_annotation(&mut self) -> Option<Token<'s>> {
        let mut depth = 1usize;
        loop {
            let tok = match self.source.next_token() {
                Ok(tok) => tok,
                Err(err) => {
                    self.errors.error(err.loc.clone(), err.to_string());
                    continue;
                }
            };
            match tok.kind {
                TokenKind::LParen | TokenKind::LParenAnnotation(_) => depth += 1,
                TokenKind::RParen => {
                    depth -= 1;
                    if depth == 0 {
                        return None;
                    }
                }
                TokenKind::Eof => return Some(tok),
                _ => {}
            }
        }
    }

    fn fill(&mut self, n: usize) {
        while self.tokens.len() <= n {
            let tok = self.next_significant_token();
            self.tokens.push_back(tok);
        }
    }

    pub(crate) fn peek(&mut self, n: usize) -> TokenType<'s> {
        self.fill(n);
        self.tokens[n].token_type()
    }

    fn peek_pair(&mut self) -> (TokenType<'s>, TokenType<'s>) {
        (self.peek(0), self.peek(1))
    }

    fn peek_token(&mut self) -> &Token<'s> {
        self.fill(0);
        &self.tokens[0]
    }

    // Copy of the head token so that the parser can be mutated while inspecting its payload
    fn peek_cloned(&mut self) -> Token<'s> {
        self.peek_token().clone()
    }

    fn peek_loc(&mut self) -> Location {
        self.peek_token().loc.clone()
    }

    fn consume(&mut self) -> Token<'s> {
        match self.tokens.pop_front() {
            Some(tok) => tok,
            None => self.next_significant_token(),
        }
    }

    fn peek_match_lpar(&mut self, keyword: &str) -> bool {
        self.peek(0) == TokenType::LParen
            && matches!(self.peek(1), TokenType::Keyword(kw) if kw == keyword)
    }

    fn match_lpar(&mut self, keyword: &str) -> Option<Location> {
        if self.peek_match_lpar(keyword) {
            self.consume();
            Some(self.consume().loc)
        } else {
            None
        }
    }

    fn match_keyword(&mut self, keyword: &str) -> Option<Location> {
        if matches!(self.peek(0), TokenType::Keyword(kw) if kw == keyword) {
            Some(self.consume().loc)
        } else {
            None
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<Location> {
        match self.match_keyword(keyword) {
            Some(loc) => Ok(loc),
            None => self.error_expected(&[keyword]),
        }
    }

    fn expect_lparen(&mut self) -> Result<Location> {
        if self.peek(0) == TokenType::LParen {
            Ok(self.consume().loc)
        } else {
            self.error_expected(&["("])
        }
    }

    fn expect_rpar(&mut self) -> Result<()> {
        if self.peek(0) == TokenType::RParen {
            self.consume();
            Ok(())
        } else {
            self.error_expected(&[")"])
        }
    }

    // `(` followed by the keyword. Returns location of the keyword
    fn expect_lpar(&mut self, keyword: &str) -> Result<Location> {
        self.expect_lparen()?;
        self.expect_keyword(keyword)
    }

    // `(` followed by any keyword
    fn expect_lpar_keyword(&mut self) -> Result<(&'s str, Location)> {
        self.expect_lparen()?;
        let tok = self.peek_cloned();
        match tok.kind {
            TokenKind::Keyword(kw) => {
                self.consume();
                Ok((kw, tok.loc))
            }
            _ => self.error_expected(&["a keyword"]),
        }
    }

    fn expect_eof(&mut self) {
        if self.peek(0) != TokenType::Eof {
            self.report_unexpected(&["EOF"]);
        }
    }

    // Skips tokens until `is_restart` accepts the lookahead pair. Gives up after `MAX_SYNC_TOKENS`
    // tokens or at the end of input.
    fn synchronize(&mut self, is_restart: fn(TokenType<'s>, TokenType<'s>) -> bool) -> Result<()> {
        for _ in 0..MAX_SYNC_TOKENS {
            let (t0, t1) = self.peek_pair();
            if is_restart(t0, t1) {
                return Ok(());
            }
            if t0 == TokenType::Eof {
                return Err(Failed);
            }
            let tok = self.consume();
            if tok.token_type() == TokenType::Reserved {
                let got = tok.to_string();
                self.report(
                    tok.loc,
                    ParseErrorKind::UnexpectedToken {
                        got,
                        expected: "a valid token".to_string(),
                    },
                );
            }
        }
        Err(Failed)
    }

    fn parse_bind_var_opt(&mut self) -> Option<String> {
        match self.peek_cloned().kind {
            TokenKind::Ident(name) => {
                self.consume();
                Some(name.to_string())
            }
            _ => None,
        }
    }

    fn parse_var_opt(&mut self) -> Result<Option<Var>> {
        let tok = self.peek_cloned();
        match tok.kind {
            TokenKind::Nat(base, digits) => {
                self.consume();
                match literal::parse_u32(digits, base) {
                    Some(idx) => Ok(Some(Var::Index(idx, tok.loc))),
                    None => self.fail(tok.loc, ParseErrorKind::InvalidInt(tok.text.to_string())),
                }
            }
            TokenKind::Ident(name) => {
                self.consume();
                Ok(Some(Var::Name(name.to_string(), tok.loc)))
            }
            _ => Ok(None),
        }
    }

    fn parse_var_list(&mut self) -> Result<Vec<Var>> {
        let mut vars = vec![];
        while let Some(var) = self.parse_var_opt()? {
            vars.push(var);
        }
        Ok(vars)
    }

    // Optional label after `end`, `else`, `catch` and so on must repeat the label of the block
    fn parse_end_label_opt(&mut self, begin: &Option<String>) {
        let tok = self.peek_cloned();
        if let TokenKind::Ident(end) = tok.kind {
            self.consume();
            match begin {
                None => self.report(tok.loc, ParseErrorKind::UnexpectedLabel(end.to_string())),
                Some(begin) if begin != end => self.report(
                    tok.loc,
                    ParseErrorKind::MismatchingLabel {
                        begin: begin.clone(),
                        end: end.to_string(),
                    },
                ),
                Some(_) => {}
            }
        }
    }

    fn parse_nat(&mut self) -> Result<u64> {
        let tok = self.peek_cloned();
        match tok.kind {
            TokenKind::Nat(base, digits) => {
                self.consume();
                match literal::parse_u64(digits, base) {
                    Some(n) => Ok(n),
                    None => self.fail(tok.loc, ParseErrorKind::InvalidInt(tok.text.to_string())),
                }
            }
            _ => self.error_expected(&["a natural number"]),
        }
    }

    fn parse_text(&mut self) -> Result<Vec<u8>> {
        match self.peek_cloned().kind {
            TokenKind::String(s) => {
                self.consume();
                Ok(s.into_owned())
            }
            _ => self.error_expected(&["a quoted string"]),
        }
    }

    // Names must be valid UTF-8. Invalid sequences are reported and replaced so that parsing can
    // continue
    fn parse_utf8_text(&mut self) -> Result<String> {
        let loc = self.peek_loc();
        let bytes = self.parse_text()?;
        match String::from_utf8(bytes) {
            Ok(s) => Ok(s),
            Err(err) => {
                self.report(loc, ParseErrorKind::InvalidUtf8);
                Ok(String::from_utf8_lossy(err.as_bytes()).into_owned())
            }
        }
    }

    fn parse_text_list(&mut self) -> Vec<u8> {
        let mut data = vec![];
        while let TokenKind::String(s) = self.peek_cloned().kind {
            self.consume();
            data.extend_from_slice(&s);
        }
        data
    }

    fn value_type_enabled(&self, ty: ValType) -> bool {
        match ty {
            ValType::V128 => self.features.simd,
            ValType::FuncRef | ValType::ExternRef => self.features.reference_types,
            _ => true,
        }
    }

    fn peek_value_type(&mut self) -> bool {
        matches!(self.peek(0), TokenType::Keyword(kw) if ValType::from_keyword(kw).is_some())
    }

    fn parse_value_type_list(&mut self) -> Result<Vec<ValType>> {
        let mut tys = vec![];
        while self.peek_value_type() {
            tys.push(self.parse()?);
        }
        Ok(tys)
    }

    fn parse_ref_type_opt(&mut self) -> Option<ValType> {
        match self.peek(0) {
            TokenType::Keyword("funcref") => {
                self.consume();
                Some(ValType::FuncRef)
            }
            TokenType::Keyword("externref") => {
                self.consume();
                Some(ValType::ExternRef)
            }
            _ => None,
        }
    }

    // Element type of tables. Unlike value types, `funcref` is always available here
    fn parse_ref_type(&mut self) -> Result<ValType> {
        match self.parse_ref_type_opt() {
            Some(ty) => Ok(ty),
            None => self.error_expected(&["funcref", "externref"]),
        }
    }

    // Heap type of `ref.null`
    fn parse_heap_type(&mut self) -> Result<ValType> {
        match self.peek(0) {
            TokenType::Keyword("func") => {
                self.consume();
                Ok(ValType::FuncRef)
            }
            TokenType::Keyword("extern") => {
                self.consume();
                Ok(ValType::ExternRef)
            }
            _ => self.error_expected(&["func", "extern"]),
        }
    }

    // `(param $x i32)` or `(param i32 i64)`. Names are only allowed when `bindings` is given
    fn parse_params(
        &mut self,
        params: &mut Vec<ValType>,
        mut bindings: Option<&mut BindingTable>,
    ) -> Result<()> {
        while self.match_lpar("param").is_some() {
            let tok = self.peek_cloned();
            if let TokenKind::Ident(name) = tok.kind {
                let bindings = match &mut bindings {
                    Some(bindings) => bindings,
                    None => return self.error_expected(&["a value type"]),
                };
                self.consume();
                let ty = self.parse()?;
                bindings.insert(name, params.len() as Index, tok.loc);
                params.push(ty);
            } else {
                params.extend(self.parse_value_type_list()?);
            }
            self.expect_rpar()?;
        }
        Ok(())
    }

    fn parse_results(&mut self, results: &mut Vec<ValType>) -> Result<()> {
        while let Some(loc) = self.match_lpar("result") {
            let before = results.len();
            results.extend(self.parse_value_type_list()?);
            if before <= 1 && results.len() > 1 {
                self.require_feature(self.features.multi_value, "multiple result values", &loc);
            }
            self.expect_rpar()?;
        }
        Ok(())
    }

    fn parse_type_use_opt(&mut self) -> Result<Option<Var>> {
        if self.match_lpar("type").is_none() {
            return Ok(None);
        }
        let var = self.parse()?;
        self.expect_rpar()?;
        Ok(Some(var))
    }

    // typeuse followed by inline params and results. Functions bind param names, other users pass
    // `None` since their params cannot be named
    fn parse_func_declaration(
        &mut self,
        bindings: Option<&mut BindingTable>,
    ) -> Result<FuncDeclaration> {
        let type_var = self.parse_type_use_opt()?;
        let mut sig = FuncSignature::default();
        self.parse_params(&mut sig.params, bindings)?;
        self.parse_results(&mut sig.results)?;
        Ok(FuncDeclaration { type_var, sig })
    }

    // `i32` or `i64` in front of table and memory limits
    fn parse_index_type_opt(&mut self) -> bool {
        match self.peek(0) {
            TokenType::Keyword("i64") => {
                let loc = self.consume().loc;
                self.require_feature(self.features.memory64, "64-bit memories and tables", &loc);
                true
            }
            TokenType::Keyword("i32") => {
                self.consume();
                false
            }
            _ => false,
        }
    }
}

impl<'s> Parse<'s> for Var {
    fn parse<S: TokenSource<'s>>(parser: &mut Parser<'s, S>) -> Result<Self> {
        match parser.parse_var_opt()? {
            Some(var) => Ok(var),
            None => parser.error_expected(&["a numeric index", "a name"]),
        }
    }
}

// https://webassembly.github.io/spec/core/text/types.html#value-types
impl<'s> Parse<'s> for ValType {
    fn parse<S: TokenSource<'s>>(parser: &mut Parser<'s, S>) -> Result<Self> {
        let tok = parser.peek_cloned();
        let ty = match tok.kind {
            TokenKind::Keyword(kw) => ValType::from_keyword(kw),
            _ => None,
        };
        match ty {
            Some(ty) => {
                parser.consume();
                if !parser.value_type_enabled(ty) {
                    parser.report(tok.loc, ParseErrorKind::ValueTypeNotAllowed(ty));
                }
                Ok(ty)
            }
            None => parser.error_expected(&["i32", "i64", "f32", "f64", "v128", "externref"]),
        }
    }
}

// https://webassembly.github.io/spec/core/text/types.html#limits
impl<'s> Parse<'s> for Limits {
    fn parse<S: TokenSource<'s>>(parser: &mut Parser<'s, S>) -> Result<Self> {
        let initial = parser.parse_nat()?;
        let max = match parser.peek(0) {
            TokenType::Nat => Some(parser.parse_nat()?),
            _ => None,
        };
        Ok(Limits {
            initial,
            max,
            ..Limits::default()
        })
    }
}

fn is_plain_instr_keyword(kw: &str) -> bool {
    matches!(
        kw,
        "unreachable"
            | "nop"
            | "drop"
            | "select"
            | "br"
            | "br_if"
            | "br_table"
            | "return"
            | "call"
            | "call_indirect"
            | "call_ref"
            | "return_call"
            | "return_call_indirect"
            | "local.get"
            | "local.set"
            | "local.tee"
            | "global.get"
            | "global.set"
            | "table.get"
            | "table.set"
            | "table.grow"
            | "table.size"
            | "table.fill"
            | "table.copy"
            | "table.init"
            | "elem.drop"
            | "memory.size"
            | "memory.grow"
            | "memory.fill"
            | "memory.copy"
            | "memory.init"
            | "data.drop"
            | "ref.null"
            | "ref.is_null"
            | "ref.func"
            | "throw"
            | "rethrow"
    ) || wastir_ir::Opcode::from_mnemonic(kw).is_some()
}

fn is_block_instr_keyword(kw: &str) -> bool {
    matches!(kw, "block" | "loop" | "if" | "try" | "try_table")
}

fn is_instr_keyword(kw: &str) -> bool {
    is_block_instr_keyword(kw) || is_plain_instr_keyword(kw)
}

// Folded instruction: `(` followed by an instruction keyword
fn is_expr(t0: TokenType<'_>, t1: TokenType<'_>) -> bool {
    t0 == TokenType::LParen && matches!(t1, TokenType::Keyword(kw) if is_instr_keyword(kw))
}

fn is_instr(t0: TokenType<'_>, t1: TokenType<'_>) -> bool {
    match t0 {
        TokenType::Keyword(kw) => is_instr_keyword(kw),
        TokenType::LParenAnnotation(name) => name.starts_with(CODE_METADATA_PREFIX),
        _ => is_expr(t0, t1),
    }
}

fn is_module_field(t0: TokenType<'_>, t1: TokenType<'_>) -> bool {
    match (t0, t1) {
        (TokenType::LParenAnnotation("custom"), _) => true,
        (TokenType::LParen, TokenType::Keyword(kw)) => matches!(
            kw,
            "data"
                | "elem"
                | "tag"
                | "export"
                | "func"
                | "type"
                | "global"
                | "import"
                | "memory"
                | "start"
                | "table"
        ),
        _ => false,
    }
}

fn is_command(t0: TokenType<'_>, t1: TokenType<'_>) -> bool {
    match (t0, t1) {
        (TokenType::LParen, TokenType::Keyword(kw)) => matches!(
            kw,
            "assert_exception"
                | "assert_exhaustion"
                | "assert_invalid"
                | "assert_malformed"
                | "assert_return"
                | "assert_trap"
                | "assert_uninstantiable"
                | "assert_unlinkable"
                | "get"
                | "input"
                | "invoke"
                | "module"
                | "output"
                | "register"
        ),
        _ => false,
    }
}

fn external_kind(kw: &str) -> Option<ExternalKind> {
    match kw {
        "func" => Some(ExternalKind::Func),
        "table" => Some(ExternalKind::Table),
        "memory" => Some(ExternalKind::Memory),
        "global" => Some(ExternalKind::Global),
        "tag" => Some(ExternalKind::Tag),
        _ => None,
    }
}

// `offset=N` and `align=N` take unsigned integers in decimal or `0x` hexadecimal
fn parse_memarg_nat(digits: &str) -> Option<u64> {
    let (digits, base) = match digits.strip_prefix("0x") {
        Some(hex) => (hex, NumBase::Hex),
        None => (digits, NumBase::Dec),
    };
    if digits.is_empty() || digits.starts_with('_') {
        return None;
    }
    literal::parse_u64(digits, base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::LexError;
    use wastir_ir::Module;

    pub(super) fn parse_wat_with(source: &str, features: Features) -> (Module, Errors) {
        let mut parser = Parser::from_source(source, None, features);
        let module = parser.parse_module();
        (module, parser.into_errors())
    }

    pub(super) fn parse_wat(source: &str) -> (Module, Errors) {
        parse_wat_with(source, Features::default())
    }

    pub(super) fn messages(errors: &Errors) -> Vec<String> {
        errors.iter().map(|d| d.message.clone()).collect()
    }

    // Token source which yields a fixed sequence and then EOF forever
    struct Tokens<'s> {
        tokens: VecDeque<Token<'s>>,
    }

    impl<'s> TokenSource<'s> for Tokens<'s> {
        fn next_token(&mut self) -> ::std::result::Result<Token<'s>, LexError> {
            Ok(self.tokens.pop_front().unwrap_or(Token {
                kind: TokenKind::Eof,
                text: "",
                loc: Location::default(),
            }))
        }
    }

    fn token(kind: TokenKind<'static>, text: &'static str) -> Token<'static> {
        Token {
            kind,
            text,
            loc: Location::default(),
        }
    }

    #[test]
    fn custom_token_source() {
        let tokens = vec![
            token(TokenKind::LParen, "("),
            token(TokenKind::Keyword("func"), "func"),
            token(TokenKind::Ident("f"), "$f"),
            token(TokenKind::RParen, ")"),
        ];
        let mut parser = Parser::new(
            Tokens {
                tokens: tokens.into(),
            },
            Features::default(),
        );
        let module = parser.parse_module();
        assert!(parser.errors().is_empty(), "{}", parser.errors());
        assert_eq!(module.funcs.len(), 1);
        assert_eq!(module.func_bindings.index_of("f"), Some(0));
    }

    #[test]
    fn lookahead_skips_annotations() {
        let mut features = Features::default();
        features.annotations = true;
        let mut parser = Parser::from_source("(@foo (bar) baz) (func)", None, features);
        assert_eq!(parser.peek(0), TokenType::LParen);
        assert_eq!(parser.peek(1), TokenType::Keyword("func"));
        assert!(parser.errors().is_empty());
    }

    #[test]
    fn annotation_without_feature() {
        let (module, errors) = parse_wat("(@foo bar) (func)");
        assert_eq!(module.funcs.len(), 1);
        assert_eq!(messages(&errors), vec!["annotations not enabled: foo".to_string()]);
    }

    #[test]
    fn lex_errors_are_collected() {
        let (module, errors) = parse_wat("(func) \u{7} (func)");
        assert_eq!(module.funcs.len(), 2);
        assert_eq!(errors.error_count(), 1);
    }

    #[test]
    fn synchronize_gives_up() {
        let mut parser = Parser::from_source("a b c d e f g h i j k l (func)", None, Features::default());
        assert_eq!(parser.synchronize(is_module_field), Err(Failed));
        let mut parser = Parser::from_source("a b c (func)", None, Features::default());
        assert_eq!(parser.synchronize(is_module_field), Ok(()));
        assert_eq!(parser.peek(1), TokenType::Keyword("func"));
        let mut parser = Parser::from_source("a b", None, Features::default());
        assert_eq!(parser.synchronize(is_module_field), Err(Failed));
    }

    #[test]
    fn value_types() {
        let mut parser = Parser::from_source("i32 v128 externref foo", None, Features::none());
        assert_eq!(parser.parse::<ValType>(), Ok(ValType::I32));
        assert_eq!(parser.parse::<ValType>(), Ok(ValType::V128));
        assert_eq!(parser.parse::<ValType>(), Ok(ValType::ExternRef));
        assert_eq!(parser.parse::<ValType>(), Err(Failed));
        assert_eq!(
            messages(parser.errors()),
            vec![
                "value type not allowed: v128".to_string(),
                "value type not allowed: externref".to_string(),
                "unexpected token \"foo\", expected i32 or i64 or f32 or f64 or v128 or externref."
                    .to_string(),
            ]
        );
    }

    #[test]
    fn vars() {
        let mut parser = Parser::from_source("0 $foo 4294967296 )", None, Features::default());
        assert!(matches!(parser.parse::<Var>(), Ok(Var::Index(0, _))));
        assert!(matches!(parser.parse::<Var>(), Ok(Var::Name(n, _)) if n == "foo"));
        assert_eq!(parser.parse::<Var>(), Err(Failed));
        assert_eq!(parser.parse::<Var>(), Err(Failed));
        assert_eq!(
            messages(parser.errors()),
            vec![
                "invalid int \"4294967296\"".to_string(),
                "unexpected token \")\", expected a numeric index or a name.".to_string(),
            ]
        );
    }

    #[test]
    fn limits() {
        let mut parser = Parser::from_source("1 2 3 )", None, Features::default());
        let limits: Limits = parser.parse().unwrap();
        assert_eq!((limits.initial, limits.max), (1, Some(2)));
        let limits: Limits = parser.parse().unwrap();
        assert_eq!((limits.initial, limits.max), (3, None));
    }

    #[test]
    fn end_labels() {
        let mut parser = Parser::from_source("$a $b $c", None, Features::default());
        parser.parse_end_label_opt(&Some("a".to_string()));
        parser.parse_end_label_opt(&Some("x".to_string()));
        parser.parse_end_label_opt(&None);
        assert_eq!(
            messages(parser.errors()),
            vec![
                "mismatching label \"x\" != \"b\"".to_string(),
                "unexpected label \"c\"".to_string(),
            ]
        );
    }

    #[test]
    fn invalid_utf8_name() {
        let (module, errors) = parse_wat(r#"(func (export "\ff"))"#);
        assert_eq!(module.exports.len(), 1);
        assert_eq!(
            messages(&errors),
            vec!["quoted string has an invalid utf-8 encoding".to_string()]
        );
    }

    #[test]
    fn memarg_nat() {
        assert_eq!(parse_memarg_nat("16"), Some(16));
        assert_eq!(parse_memarg_nat("0x10"), Some(16));
        assert_eq!(parse_memarg_nat("1_000"), Some(1000));
        assert_eq!(parse_memarg_nat(""), None);
        assert_eq!(parse_memarg_nat("0x"), None);
        assert_eq!(parse_memarg_nat("-1"), None);
    }
}
