//! The expression language used to pull runtime values out of keyword
//! contexts.
//!
//! This module provides:
//! - [`Value`], the dynamic value type
//! - [`Keywords`], named values bound to a tree
//! - [`Expression`] and [`evaluate`] for `a.b[c]`-style lookups

mod evaluator;
mod keywords;
mod value;

pub use evaluator::{evaluate, Accessor, Expression};
pub use keywords::Keywords;
pub use value::Value;
