//! Parser for listing tokens → line items.
//!
//! Labels are kept symbolic here; `assemble` resolves them once every line
//! has been seen.

use crate::error::AsmError;
use crate::lexer::Token;
use fsm_common::Opcode;

/// An operand before label and action-name resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Operand {
    Value(i32),
    Label(String),
    ActionName(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Item {
    /// An instruction slot. `code` may be an unused opcode when written
    /// with `.raw`.
    Instr { code: u32, operand: Operand },
    /// `.action name`: add a name to the action table.
    Action(String),
}

/// Everything a single line defines.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct ParsedLine {
    pub labels: Vec<String>,
    pub item: Option<Item>,
}

/// Parse a sequence of tokens from a single line.
pub(crate) fn parse_line(tokens: &[Token], line_num: usize) -> Result<ParsedLine, AsmError> {
    let mut parsed = ParsedLine::default();
    let mut rest = tokens;
    while let Some((Token::Label(label), tail)) = rest.split_first() {
        parsed.labels.push(label.clone());
        rest = tail;
    }

    let Some((head, args)) = rest.split_first() else {
        return Ok(parsed);
    };

    parsed.item = Some(match head {
        Token::Directive(name) => parse_directive(name, args, line_num)?,
        Token::Word(mnemonic) => parse_instruction(mnemonic, args, line_num)?,
        other => return Err(unexpected(other, line_num)),
    });
    Ok(parsed)
}

fn parse_instruction(mnemonic: &str, args: &[Token], line_num: usize) -> Result<Item, AsmError> {
    let opcode =
        Opcode::from_mnemonic(&mnemonic.to_uppercase()).ok_or_else(|| AsmError::UnknownOpcode {
            line: line_num,
            token: mnemonic.to_string(),
        })?;
    let name = opcode.mnemonic();

    let operand = match opcode {
        Opcode::Rst | Opcode::Neg => {
            expect_end(args, line_num)?;
            return Ok(Item::Instr {
                code: opcode as u32,
                operand: Operand::Value(0),
            });
        }
        Opcode::Jmp | Opcode::Jz | Opcode::JmpI => match expect_arg(args, 0, line_num, name, 1)? {
            Token::Number(n) => Operand::Value(*n),
            Token::Word(label) => Operand::Label(label.clone()),
            other => return Err(unexpected(other, line_num)),
        },
        Opcode::Action => match expect_arg(args, 0, line_num, name, 1)? {
            Token::Number(n) => Operand::Value(*n),
            Token::Word(action) => Operand::ActionName(action.clone()),
            other => return Err(unexpected(other, line_num)),
        },
        Opcode::Push | Opcode::ArgPushS | Opcode::ArgPushB | Opcode::Adjust | Opcode::Drop => {
            Operand::Value(expect_number(args, 0, line_num, name, 1)?)
        }
    };
    expect_end(&args[1..], line_num)?;

    Ok(Item::Instr {
        code: opcode as u32,
        operand,
    })
}

fn parse_directive(name: &str, args: &[Token], line_num: usize) -> Result<Item, AsmError> {
    match name {
        "action" => match expect_arg(args, 0, line_num, ".action", 1)? {
            Token::Word(action) => {
                expect_end(&args[1..], line_num)?;
                Ok(Item::Action(action.clone()))
            }
            other => Err(unexpected(other, line_num)),
        },
        "raw" => {
            let code = expect_number(args, 0, line_num, ".raw", 2)?;
            let operand = expect_number(args, 1, line_num, ".raw", 2)?;
            expect_end(&args[2..], line_num)?;
            let code = u32::try_from(code).map_err(|_| AsmError::InvalidNumber {
                line: line_num,
                token: code.to_string(),
            })?;
            Ok(Item::Instr {
                code,
                operand: Operand::Value(operand),
            })
        }
        _ => Err(AsmError::UnknownDirective {
            line: line_num,
            token: format!(".{name}"),
        }),
    }
}

// ---- Helper functions ----

fn expect_arg<'t>(
    args: &'t [Token],
    index: usize,
    line_num: usize,
    opcode: &'static str,
    expected: usize,
) -> Result<&'t Token, AsmError> {
    args.get(index).ok_or(AsmError::MissingArgument {
        line: line_num,
        opcode,
        expected,
    })
}

fn expect_number(
    args: &[Token],
    index: usize,
    line_num: usize,
    opcode: &'static str,
    expected: usize,
) -> Result<i32, AsmError> {
    match expect_arg(args, index, line_num, opcode, expected)? {
        Token::Number(n) => Ok(*n),
        Token::Word(w) => Err(AsmError::InvalidNumber {
            line: line_num,
            token: w.clone(),
        }),
        other => Err(unexpected(other, line_num)),
    }
}

fn expect_end(args: &[Token], line_num: usize) -> Result<(), AsmError> {
    match args.first() {
        None => Ok(()),
        Some(token) => Err(unexpected(token, line_num)),
    }
}

fn unexpected(token: &Token, line_num: usize) -> AsmError {
    let token = match token {
        Token::Word(w) => w.clone(),
        Token::Number(n) => n.to_string(),
        Token::Label(l) => format!("{l}:"),
        Token::Directive(d) => format!(".{d}"),
    };
    AsmError::UnexpectedToken {
        line: line_num,
        token,
    }
}
