// Command-line filter shorthand parser

pub mod filter;
pub mod lexer;

pub use filter::{parse_filter, parse_filters, FilterArg};
