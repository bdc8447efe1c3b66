//! # Whisker expressions - Abstract Syntax Tree
//!
//! This module defines the tokens and the expression tree produced when
//! the content of one template tag is compiled.
//!
//! ## Architecture Overview
//!
//! - **[tokens]** - Typed tokens produced by the expression tokenizer
//! - **[path]** - Semantic parts of a data path (`../`, `~`, `this`, ...)
//! - **[expressions]** - Expression nodes (paths, chains, groups, operators, lambdas, literals)
//! - **[operators]** - The static operator table (placement and arity)
//!
//! ## Quick Start
//!
//! ```text
//! {{ order.Items.Where(x => x.Price > 100).Count() }}
//! ```
//!
//! This resolves `order.Items`, filters it with a lambda, then counts the
//! result.
//!
//! ## Core Concepts
//!
//! ### Paths
//!
//! A path walks from the current context through the data:
//!
//! ```text
//! name            current.name
//! a.b.c           current.a.b.c
//! ../name         the enclosing context's name
//! ~.total         the root's total
//! this            the current value
//! .               the current value
//! a.?             every member of a as Key/Value pairs
//! ```
//!
//! ### Formatters
//!
//! A path followed by `(` calls the named formatter on the value the
//! path resolved to. A formatter result may be continued with another
//! path, which forms a chain:
//!
//! ```text
//! name.ToUpper().Length
//! ```
//!
//! ### Operators
//!
//! Operators associate strictly left to right with no precedence:
//! `2 + 3 * 4` is `(2 + 3) * 4`. Use brackets to group.
//!
//! ### Lambdas
//!
//! `x => body` and `(a, b) => body` are passed to formatters that call
//! them per element.

pub mod expressions;
pub mod operators;
pub mod path;
pub mod tokens;

pub use expressions::{Expression, ExpressionArgument};
pub use operators::{OperatorInfo, OperatorKind, Placement};
pub use path::PathPart;
pub use tokens::{BracketKind, PathToken, Token, TokenKind};
