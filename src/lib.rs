//! Expression compiler and evaluator for a Mustache-derived template
//! engine.
//!
//! Tags are scanned out of template text, each tag's content is tokenized
//! and parsed into an [`Expression`], and expressions are evaluated against
//! a data [`Value`] through a chain of [`ContextObject`]s.

pub mod ast;
pub mod builtins;
pub mod config;
pub mod context;
pub mod diagnostics;
pub mod evaluator;
pub mod formatter;
pub mod lexer;
pub mod number;
pub mod options;
pub mod output;
pub mod parser;
pub mod path;
pub mod printer;
pub mod resolver;
pub mod scanner;
pub mod source;
pub mod template;
pub mod value;

#[cfg(feature = "cli")]
pub mod cli;

pub use ast::{Expression, OperatorKind, PathPart};
pub use config::{EngineConfig, ErrorPolicy, UnresolvedPath};
pub use context::{CancellationToken, ContextArena, ContextId, ContextObject, Scope};
pub use diagnostics::{CompileError, Diagnostics, ParseError, ParseErrorKind};
pub use evaluator::{EvalError, Evaluator, render_to_string};
pub use formatter::{FormatterCall, FormatterSignature, ParamType, ValueConverter};
pub use number::{Number, NumberKind};
pub use options::{Delimiters, ParserOptions};
pub use output::{to_json, to_json_pretty};
pub use parser::parse_text;
pub use printer::to_parsable_string;
pub use resolver::{Introspector, TypeDescriptor, ValueResolver};
pub use source::{SourceRange, TextPosition};
pub use template::{Template, compile, compile_with_diagnostics};
pub use value::{HostObject, Reflected, Value};

/// Any failure from compiling or rendering.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error("invalid JSON input: {0}")]
    Json(#[from] serde_json::Error),
}

/// Compile `text` and render it against `data` in one step.
pub fn render(text: &str, data: Value, config: &EngineConfig) -> Result<String, Error> {
    let template = compile(text, &ParserOptions::default())?;
    Ok(template.render(data, config)?)
}
