pub mod cp437;
pub mod error;
pub mod expr;
pub mod lexer;
pub mod parser;
pub mod preprocess;
pub mod token;

pub use error::AsmError;

use arch::image::Image;

/// Run the whole pipeline: lexer, preprocessor, two-pass parser.
pub fn assemble(source: &str) -> Result<Image, AsmError> {
    let tokens = lexer::Lexer::new(source).tokenize()?;
    let tokens = preprocess::Preprocessor::new().process(tokens)?;
    let image = parser::Parser::parse(tokens)?;
    Ok(image)
}
