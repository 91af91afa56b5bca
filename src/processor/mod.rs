//! Source text to executable grammar, and the machine that expands it.
pub mod error;
pub mod lexer;
pub mod script_parser;
pub mod token;
pub mod trie;
pub mod vm;

pub use error::{ErrorKind, ParseError};
pub use lexer::CharClass;
pub use vm::{BuildStats, Machine};

use tracing::debug;

use crate::model::Rules;

/// Everything one pass over the source produced, errors included.
#[derive(Debug, Clone)]
pub struct ParseOutcome {
    /// Possibly partial when `errors` is non-empty.
    pub rules: Rules,
    pub errors: Vec<ParseError>,
    pub classes: Vec<CharClass>,
}

/// Scan and parse without validating rule references.
pub fn parse(src: &str) -> ParseOutcome {
    let scan = lexer::scan(src);
    let (rules, failure) = script_parser::Parser::new(&scan.tokens).parse();
    let mut errors = scan.errors;
    errors.extend(failure);
    ParseOutcome {
        rules,
        errors,
        classes: scan.classes,
    }
}

/// Scan, parse, validate and finalize. Lexical errors come first, then the
/// parse failure if there was one; otherwise every dangling rule reference.
pub fn compile(src: &str) -> Result<Rules, Vec<ParseError>> {
    let scan = lexer::scan(src);
    let (mut rules, failure) = script_parser::Parser::new(&scan.tokens).parse();

    let mut errors = scan.errors;
    match failure {
        Some(err) => errors.push(err),
        None => errors.extend(rules.validate()),
    }
    if !errors.is_empty() {
        debug!(errors = errors.len(), "compile failed");
        return Err(errors);
    }

    rules.finalize();
    debug!(
        initial = rules.initial.len(),
        named = rules.rule_count(),
        seed = rules.seed(),
        "compiled program"
    );
    Ok(rules)
}
