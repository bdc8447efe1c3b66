//! Execute whisker commands against JSON input

use super::CliError;
use crate::config::EngineConfig;
use crate::diagnostics::CompileError;
use crate::evaluator::Evaluator;
use crate::options::ParserOptions;
use crate::parser::parse_text;
use crate::printer::to_parsable_string;
use crate::source::LineIndex;
use crate::template::compile;
use crate::{Expression, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Command {
    /// Render a whole template
    #[default]
    Render,
    /// Evaluate a single expression
    Eval,
    /// Print the canonical form of an expression
    Print,
}

/// Options for one CLI run
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub command: Command,
    /// Template text or expression, depending on the command
    pub source: String,
    /// JSON input string
    pub input: Option<String>,
    /// Only validate syntax, don't execute
    pub syntax_only: bool,
    /// Fail on unresolved paths and unmatched formatter calls
    pub strict: bool,
    pub parser: ParserOptions,
}

/// Result of a run
#[derive(Debug)]
pub enum Outcome {
    /// Syntax validation passed
    SyntaxValid,
    Rendered(String),
    Evaluated(Value),
    Printed(String),
}

fn parse_expression_text(text: &str, options: &ParserOptions) -> Result<Expression, CliError> {
    let (expr, mut diagnostics) = parse_text(text, options);
    if diagnostics.is_empty() {
        return Ok(expr);
    }
    diagnostics.locate(&LineIndex::from_text(text));
    Err(CliError::Compile(CompileError {
        errors: diagnostics.into_errors(),
    }))
}

fn read_input(options: &RunOptions) -> Result<Value, CliError> {
    let json = options.input.as_ref().ok_or(CliError::NoInput)?;
    let value: serde_json::Value = serde_json::from_str(json)?;
    Ok(Value::from(value))
}

/// Execute one command
pub fn execute(options: &RunOptions) -> Result<Outcome, CliError> {
    let config = if options.strict {
        EngineConfig::default().strict()
    } else {
        EngineConfig::default()
    };

    match options.command {
        Command::Render => {
            let template = compile(&options.source, &options.parser)?;
            if options.syntax_only {
                return Ok(Outcome::SyntaxValid);
            }
            let data = read_input(options)?;
            Ok(Outcome::Rendered(template.render(data, &config)?))
        }
        Command::Eval => {
            let expr = parse_expression_text(&options.source, &options.parser)?;
            if options.syntax_only {
                return Ok(Outcome::SyntaxValid);
            }
            let data = read_input(options)?;
            let value = Evaluator::new().evaluate_value(&expr, data, &config)?;
            Ok(Outcome::Evaluated(value))
        }
        Command::Print => {
            let expr = parse_expression_text(&options.source, &options.parser)?;
            if options.syntax_only {
                return Ok(Outcome::SyntaxValid);
            }
            Ok(Outcome::Printed(to_parsable_string(&expr)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(command: Command, source: &str, input: Option<&str>) -> Result<Outcome, CliError> {
        execute(&RunOptions {
            command,
            source: source.to_string(),
            input: input.map(str::to_string),
            ..RunOptions::default()
        })
    }

    #[test]
    fn test_render_command() {
        let outcome = run(Command::Render, "Hi {{name}}", Some(r#"{"name": "Ada"}"#)).unwrap();
        assert!(matches!(outcome, Outcome::Rendered(s) if s == "Hi Ada"));
    }

    #[test]
    fn test_eval_command() {
        let outcome = run(Command::Eval, "a + 1", Some(r#"{"a": 41}"#)).unwrap();
        assert!(matches!(outcome, Outcome::Evaluated(v) if v == Value::from(42)));
    }

    #[test]
    fn test_print_command() {
        let outcome = run(Command::Print, "a+b*c", None).unwrap();
        assert!(matches!(outcome, Outcome::Printed(s) if s == "a + b * c"));
    }

    #[test]
    fn test_missing_input() {
        assert!(matches!(run(Command::Eval, "a", None), Err(CliError::NoInput)));
    }

    #[test]
    fn test_syntax_error_reported() {
        let err = run(Command::Eval, "'abc", None).unwrap_err();
        assert!(matches!(err, CliError::Compile(e) if e.errors.len() == 1));
    }
}
