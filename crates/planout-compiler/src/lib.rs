//! PlanOut compiler: orchestrates the compilation pipeline.
//!
//! ```text
//! script source → Lexer → Parser → AST → canonical ops tree (JSON)
//! ```
//!
//! The ops tree is the contract between the compiler and the interpreter:
//! a nested JSON value in which every operator node is a mapping carrying
//! an `"op"` field. [`compile`] returns it as a [`serde_json::Value`];
//! [`compile_to_string`] renders it as pretty-printed JSON for storage.

use planout_lexer::Lexer;
use planout_parser::Parser;
use planout_types::{CompileErrors, Result};
use serde_json::Value;

/// Compile a PlanOut script to its canonical ops tree.
///
/// On any lexical or syntactic error the collected `(line, message)`
/// records are returned instead and no ops tree is produced. An empty
/// script compiles to `{}`.
pub fn compile(source: &str) -> Result<Value> {
    let lexer = Lexer::new(source);
    let parser = Parser::new(lexer);
    let result = parser.parse_program();

    if result.errors.has_errors() {
        return Err(result.errors);
    }

    Ok(result.program.to_ops())
}

/// Compile a PlanOut script and render the ops tree as pretty JSON.
///
/// Angle brackets and other HTML-relevant characters are emitted verbatim,
/// so comparison operators survive the round trip through storage.
pub fn compile_to_string(source: &str) -> Result<String> {
    let ops = compile(source)?;
    serde_json::to_string_pretty(&ops).map_err(|err| {
        let mut errors = CompileErrors::empty();
        errors.push(planout_types::CompileError::new(0, err.to_string()));
        errors
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_script() {
        assert_eq!(compile("").unwrap(), json!({}));
    }

    #[test]
    fn test_errors_return_no_output() {
        let errors = compile("x = 'unterminated").unwrap_err();
        assert!(errors.has_errors());
        assert_eq!(errors.errors[0].line, 1);
    }

    #[test]
    fn test_pretty_output_keeps_angle_brackets() {
        let text = compile_to_string("x = a < b;").unwrap();
        assert!(text.contains("\"<\""));
        assert!(!text.contains("\\u003c"));
    }
}
