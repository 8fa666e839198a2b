//! Tokenizer for FSM listing text.

use crate::error::AsmError;

/// A single token from a listing line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Token {
    /// A mnemonic, label reference or action name. Case is preserved.
    Word(String),
    /// A signed numeric literal (decimal or hex), range-checked to `i32`.
    Number(i32),
    /// A label definition: `name:`.
    Label(String),
    /// A directive: `.name`, stored without the dot, lowercased.
    Directive(String),
}

/// Tokenize a single line of listing text.
///
/// Returns an empty Vec for blank lines and comment-only lines.
/// Comments start with `;` and extend to end of line.
pub(crate) fn tokenize_line(line: &str, line_num: usize) -> Result<Vec<Token>, AsmError> {
    let line = match line.find(';') {
        Some(pos) => &line[..pos],
        None => line,
    };

    let mut tokens = Vec::new();
    for word in line.split_whitespace() {
        let token = if let Some(label) = word.strip_suffix(':') {
            if label.is_empty() {
                return Err(AsmError::UnexpectedToken {
                    line: line_num,
                    token: word.to_string(),
                });
            }
            Token::Label(label.to_string())
        } else if let Some(directive) = word.strip_prefix('.') {
            Token::Directive(directive.to_lowercase())
        } else if looks_numeric(word) {
            Token::Number(parse_number(word).ok_or_else(|| AsmError::InvalidNumber {
                line: line_num,
                token: word.to_string(),
            })?)
        } else {
            Token::Word(word.to_string())
        };
        tokens.push(token);
    }

    Ok(tokens)
}

fn looks_numeric(word: &str) -> bool {
    let digits = word.strip_prefix('-').unwrap_or(word);
    digits.as_bytes().first().is_some_and(|b| b.is_ascii_digit())
}

fn parse_number(word: &str) -> Option<i32> {
    let (negative, digits) = match word.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, word),
    };
    let magnitude = match digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        Some(hex) => i64::from_str_radix(hex, 16).ok()?,
        None => digits.parse::<i64>().ok()?,
    };
    let value = if negative { -magnitude } else { magnitude };
    i32::try_from(value).ok()
}
