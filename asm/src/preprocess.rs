use indexmap::IndexMap;

use crate::error::PreprocessError;
use crate::expr;
use crate::token::{Token, TokenKind};

#[derive(Debug, Clone, Copy)]
pub struct ConstDef {
    pub value: u16,
    pub line: usize,
}

/// Handles `NAME EQU <expr>` declarations: evaluates them against the
/// constants defined so far, elides the declaration from the stream, and
/// rewrites later references to Number tokens. Definitions are final.
#[derive(Default)]
pub struct Preprocessor {
    constants: IndexMap<String, ConstDef>,
}

impl Preprocessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn constants(&self) -> &IndexMap<String, ConstDef> {
        &self.constants
    }

    pub fn process(&mut self, tokens: Vec<Token>) -> Result<Vec<Token>, PreprocessError> {
        let mut out = Vec::with_capacity(tokens.len());
        let mut i = 0;

        while i < tokens.len() {
            let token = &tokens[i];

            if token.kind == TokenKind::Label && self.is_equ(&tokens, i + 1) {
                i = self.define(&tokens, i)?;
                continue;
            }

            if token.kind == TokenKind::Label {
                let name = token.text.to_uppercase();
                if let Some(def) = self.constants.get(&name) {
                    out.push(Token::new(
                        TokenKind::Number,
                        def.value.to_string(),
                        token.line,
                        token.col,
                    ));
                    i += 1;
                    continue;
                }
            }

            out.push(token.clone());
            i += 1;
        }

        Ok(out)
    }

    fn is_equ(&self, tokens: &[Token], i: usize) -> bool {
        tokens
            .get(i)
            .is_some_and(|t| t.kind == TokenKind::Instruction && t.text.eq_ignore_ascii_case("EQU"))
    }

    /// Handle one `NAME EQU expr` declaration starting at `i`; returns the
    /// index of the newline terminating it.
    fn define(&mut self, tokens: &[Token], i: usize) -> Result<usize, PreprocessError> {
        let name_token = &tokens[i];
        let equ_line = tokens[i + 1].line;

        // Collect the expression tokens up to the line end.
        let mut parts = Vec::new();
        let mut j = i + 2;
        while let Some(tok) = tokens.get(j) {
            match tok.kind {
                TokenKind::Newline | TokenKind::Comment | TokenKind::Comma | TokenKind::Eof => {
                    break
                }
                _ => parts.push(tok.text.as_str()),
            }
            j += 1;
        }
        if parts.is_empty() {
            return Err(PreprocessError::MissingExpression(equ_line));
        }

        let value = expr::evaluate(&parts.join(" "), |name| {
            self.constants.get(name).map(|def| def.value)
        })
        .map_err(|source| PreprocessError::Eval {
            name: name_token.text.clone(),
            line: name_token.line,
            source,
        })?;

        let name = name_token.text.to_uppercase();
        if let Some(prev) = self.constants.get(&name) {
            return Err(PreprocessError::Redefined {
                name: name_token.text.clone(),
                line: name_token.line,
                prev: prev.line,
            });
        }
        self.constants.insert(
            name,
            ConstDef {
                value,
                line: name_token.line,
            },
        );

        // Skip whatever remains of the declaration line.
        while tokens
            .get(j)
            .is_some_and(|t| !matches!(t.kind, TokenKind::Newline | TokenKind::Eof))
        {
            j += 1;
        }
        Ok(j)
    }
}
