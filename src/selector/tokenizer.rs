// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Tokenizer for the restricted selector grammar

use super::error::{SelectorError, SelectorResult};
use super::span::Spanned;
use std::borrow::Cow;
use std::fmt;

/// Selector token
#[derive(Debug, Clone, PartialEq)]
pub enum Token<'input> {
    /// `//`
    DoubleSlash,
    /// `/`
    Slash,
    /// `*`
    Star,
    /// `[`
    LeftBracket,
    /// `]`
    RightBracket,
    /// `@`
    At,
    /// `=`
    Equal,
    /// Bare word: element type, attribute name or unquoted value
    Word(&'input str),
    /// Quoted value with escapes resolved
    String(Cow<'input, str>),
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::DoubleSlash => write!(f, "'//'"),
            Token::Slash => write!(f, "'/'"),
            Token::Star => write!(f, "'*'"),
            Token::LeftBracket => write!(f, "'['"),
            Token::RightBracket => write!(f, "']'"),
            Token::At => write!(f, "'@'"),
            Token::Equal => write!(f, "'='"),
            Token::Word(word) => write!(f, "'{word}'"),
            Token::String(value) => write!(f, "string \"{value}\""),
        }
    }
}

/// Check if a character can appear in a bare word
pub fn is_word_char(c: char) -> bool {
    unicode_xid::UnicodeXID::is_xid_continue(c) || matches!(c, '-' | '.' | ':')
}

/// Streaming tokenizer over a selector string
#[derive(Debug, Clone)]
pub struct Tokenizer<'input> {
    input: &'input str,
    pos: usize,
}

impl<'input> Tokenizer<'input> {
    /// Create a tokenizer over `input`
    pub fn new(input: &'input str) -> Self {
        Self { input, pos: 0 }
    }

    /// Current byte offset
    pub fn position(&self) -> usize {
        self.pos
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek_char() {
            if !c.is_whitespace() {
                break;
            }
            self.pos += c.len_utf8();
        }
    }

    fn read_word(&mut self) -> &'input str {
        let start = self.pos;
        while let Some(c) = self.peek_char() {
            if !is_word_char(c) {
                break;
            }
            self.pos += c.len_utf8();
        }
        &self.input[start..self.pos]
    }

    fn read_string(&mut self, quote: char) -> SelectorResult<Cow<'input, str>> {
        let open = self.pos;
        self.pos += quote.len_utf8();
        let body_start = self.pos;
        let mut owned: Option<String> = None;

        while let Some(c) = self.peek_char() {
            match c {
                c if c == quote => {
                    let value = match owned {
                        Some(buffer) => Cow::Owned(buffer),
                        None => Cow::Borrowed(&self.input[body_start..self.pos]),
                    };
                    self.pos += c.len_utf8();
                    return Ok(value);
                }
                '\\' => {
                    let buffer =
                        owned.get_or_insert_with(|| self.input[body_start..self.pos].to_string());
                    self.pos += 1;
                    match self.peek_char() {
                        Some(escaped) => {
                            buffer.push(escaped);
                            self.pos += escaped.len_utf8();
                        }
                        None => break,
                    }
                }
                other => {
                    if let Some(buffer) = owned.as_mut() {
                        buffer.push(other);
                    }
                    self.pos += other.len_utf8();
                }
            }
        }

        Err(SelectorError::UnterminatedString { position: open })
    }

    /// Read the next token, `None` at end of input
    pub fn next_token(&mut self) -> SelectorResult<Option<Spanned<Token<'input>>>> {
        self.skip_whitespace();

        let start = self.pos;
        let Some(c) = self.peek_char() else {
            return Ok(None);
        };

        let token = match c {
            '/' => {
                if self.input[self.pos..].starts_with("//") {
                    self.pos += 2;
                    Token::DoubleSlash
                } else {
                    self.pos += 1;
                    Token::Slash
                }
            }
            '*' => {
                self.pos += 1;
                Token::Star
            }
            '[' => {
                self.pos += 1;
                Token::LeftBracket
            }
            ']' => {
                self.pos += 1;
                Token::RightBracket
            }
            '@' => {
                self.pos += 1;
                Token::At
            }
            '=' => {
                self.pos += 1;
                Token::Equal
            }
            '"' | '\'' => Token::String(self.read_string(c)?),
            c if is_word_char(c) => Token::Word(self.read_word()),
            other => {
                return Err(SelectorError::UnexpectedCharacter {
                    character: other,
                    position: start,
                });
            }
        };

        Ok(Some(Spanned::new(token, start, self.pos)))
    }

    /// Tokenize the whole input
    pub fn tokenize_all(&mut self) -> SelectorResult<Vec<Spanned<Token<'input>>>> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }
}

/// Tokenize a selector string
pub fn tokenize(input: &str) -> SelectorResult<Vec<Spanned<Token<'_>>>> {
    Tokenizer::new(input).tokenize_all()
}
