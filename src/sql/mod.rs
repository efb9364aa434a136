pub mod parser;
pub mod statement;

pub use parser::parse;
pub use statement::{SqlCommand, Statement};
