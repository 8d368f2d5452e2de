//! Front-end for kernel bodies: a Rust closure subset captured as text.

pub mod ast;
pub mod lexeme;
pub(crate) mod lexer;
pub(crate) mod parser;

use crate::diagnostic::Diagnostic;

/// Lex and parse a kernel closure. Lexer and parser diagnostics are
/// reported together.
pub fn parse_closure(source: &str) -> Result<ast::Closure, Vec<Diagnostic>> {
    let (tokens, lex_diags) = lexer::Lexer::new(source).tokenize();
    let parsed = parser::Parser::new(tokens).parse_closure();
    match parsed {
        Ok(closure) if lex_diags.is_empty() => Ok(closure),
        Ok(_) => Err(lex_diags),
        Err(mut parse_diags) => {
            let mut all = lex_diags;
            all.append(&mut parse_diags);
            Err(all)
        }
    }
}
