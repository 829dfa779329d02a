//! Word stream: classified words of one source statement.
//!
//! A statement is a single source line (a trailing `\` joins the next
//! line). Every [`Word`] is paired with the [`WordTail`] describing the
//! punctuation that immediately follows it, which is what the statement
//! compiler dispatches on.

use crate::error::{CompileError, Result};
use crate::statements::NEWLINE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordKind {
    Name,
    /// Quoted string, value includes the quotes.
    String,
    Integer,
    /// Anything else: `$INSTDIR`, `${Errors}`, `/SD`, `-1`, `!`.
    Special,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Word {
    kind: WordKind,
    value: String,
}

impl Word {
    pub fn new(kind: WordKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }

    #[inline]
    pub fn kind(&self) -> WordKind {
        self.kind
    }

    #[inline]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Names are case-insensitive.
    pub fn as_name(&self) -> String {
        self.value.to_lowercase()
    }

    /// The value with one layer of surrounding quotes removed.
    pub fn as_bare_string(&self) -> &str {
        strip_quotes(&self.value)
    }
}

pub fn strip_quotes(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 {
        let first = bytes[0];
        let last = bytes[bytes.len() - 1];
        if first == last && is_quote(first) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

#[inline]
fn is_quote(c: u8) -> bool {
    matches!(c, b'"' | b'\'' | b'`')
}

/// Punctuation following a word.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WordTail {
    concatenation: bool,
    args_open: bool,
    args_close: usize,
    separator: bool,
    comparison: Option<String>,
    assignment: bool,
    compiler_command: bool,
}

impl WordTail {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    #[inline]
    pub fn is_concatenation(&self) -> bool {
        self.concatenation
    }

    #[inline]
    pub fn is_args_open(&self) -> bool {
        self.args_open
    }

    #[inline]
    pub fn is_args_close(&self) -> bool {
        self.args_close > 0
    }

    #[inline]
    pub fn is_arg_separator(&self) -> bool {
        self.separator
    }

    #[inline]
    pub fn is_comparison(&self) -> bool {
        self.comparison.is_some()
    }

    pub fn comparison(&self) -> Option<&str> {
        self.comparison.as_deref()
    }

    #[inline]
    pub fn is_assignment(&self) -> bool {
        self.assignment
    }

    #[inline]
    pub fn is_compiler_command(&self) -> bool {
        self.compiler_command
    }

    pub fn consume_args_close(&mut self) {
        self.args_close = self.args_close.saturating_sub(1);
    }
}

/// The interface the statement compiler consumes.
pub trait WordStream {
    /// Fails with a syntax error when the statement is exhausted.
    fn next_word(&mut self) -> Result<Word>;
    fn has_next_word(&self) -> bool;
    /// Tail of the most recently returned word.
    fn word_tail(&self) -> &WordTail;
    /// Removes one pending `)` from the current tail.
    fn consume_args_close(&mut self);
    /// Leading whitespace of the current statement.
    fn indent(&self) -> &str;
    fn current_statement(&self) -> &str;
    fn lines_read(&self) -> usize;
    fn source_name(&self) -> &str;
}

// ═══════════════════════════════════════════════════════════════════
// Scanner
// ═══════════════════════════════════════════════════════════════════

struct Scanner<'code> {
    code: &'code [u8],
    offset: usize,
}

impl<'code> Scanner<'code> {
    fn new(code: &'code str) -> Self {
        Self {
            code: code.as_bytes(),
            offset: 0,
        }
    }

    #[inline]
    fn is_done(&self) -> bool {
        self.offset >= self.code.len()
    }

    #[inline]
    fn peek(&self) -> Option<u8> {
        self.code.get(self.offset).copied()
    }

    #[inline]
    fn peek_ahead(&self) -> Option<u8> {
        self.code.get(self.offset + 1).copied()
    }

    #[inline]
    fn is_at_whitespace(&self) -> bool {
        self.code[self.offset].is_ascii_whitespace()
    }

    fn skip_whitespace(&mut self) {
        while !self.is_done() && self.is_at_whitespace() {
            self.offset += 1;
        }
    }

    fn is_at_comment(&self) -> bool {
        matches!(self.peek(), Some(b';' | b'#'))
    }

    fn is_at_tail(&self) -> bool {
        match self.peek() {
            Some(b'&' | b'(' | b')' | b',' | b'=' | b'<' | b'>') => true,
            Some(b'!') => self.peek_ahead() == Some(b'='),
            _ => false,
        }
    }

    fn slice(&self, start: usize) -> String {
        String::from_utf8_lossy(&self.code[start..self.offset]).into_owned()
    }

    fn next_word(&mut self) -> Result<Option<Word>> {
        self.skip_whitespace();
        if self.is_done() {
            return Ok(None);
        }
        if self.is_at_comment() {
            self.offset = self.code.len();
            return Ok(None);
        }

        let start = self.offset;
        let c = self.code[start];

        if is_quote(c) {
            self.offset += 1;
            loop {
                match self.peek() {
                    None => {
                        return Err(CompileError::syntax(
                            "Unterminated string",
                        ));
                    }
                    // $\" and friends
                    Some(b'$') if self.peek_ahead() == Some(b'\\') => {
                        self.offset = (self.offset + 3).min(self.code.len());
                    }
                    Some(q) if q == c => {
                        self.offset += 1;
                        break;
                    }
                    Some(_) => self.offset += 1,
                }
            }
            return Ok(Some(Word::new(WordKind::String, self.slice(start))));
        }

        if c.is_ascii_digit() {
            while matches!(self.peek(), Some(b) if b.is_ascii_alphanumeric())
            {
                self.offset += 1;
            }
            return Ok(Some(Word::new(WordKind::Integer, self.slice(start))));
        }

        if c.is_ascii_alphabetic() || c == b'_' {
            while matches!(
                self.peek(),
                Some(b) if b.is_ascii_alphanumeric() || b == b'_' || b == b'.'
            ) {
                self.offset += 1;
            }
            return Ok(Some(Word::new(WordKind::Name, self.slice(start))));
        }

        while !self.is_done() && !self.is_at_whitespace() && !self.is_at_tail()
        {
            self.offset += 1;
        }
        // A stray punctuation character still has to make progress.
        if self.offset == start {
            self.offset += 1;
        }
        Ok(Some(Word::new(WordKind::Special, self.slice(start))))
    }

    fn tail(&mut self) -> WordTail {
        let mut tail = WordTail::default();
        loop {
            self.skip_whitespace();
            let Some(c) = self.peek() else { break };
            match (c, self.peek_ahead()) {
                (b'&', _) => {
                    tail.concatenation = true;
                    self.offset += 1;
                }
                (b'(', _) => {
                    tail.args_open = true;
                    self.offset += 1;
                }
                (b')', _) => {
                    tail.args_close += 1;
                    self.offset += 1;
                }
                (b',', _) => {
                    tail.separator = true;
                    self.offset += 1;
                }
                (b'=', Some(b'=')) => {
                    tail.comparison = Some("==".to_string());
                    self.offset += 2;
                }
                (b'=', _) => {
                    tail.assignment = true;
                    self.offset += 1;
                }
                (b'!', Some(b'=')) => {
                    tail.comparison = Some("!=".to_string());
                    self.offset += 2;
                }
                (b'<' | b'>', next) => {
                    let len = match (c, next) {
                        (b'<', Some(b'=' | b'>')) | (b'>', Some(b'=')) => 2,
                        _ => 1,
                    };
                    let start = self.offset;
                    self.offset += len;
                    tail.comparison = Some(self.slice(start));
                }
                _ => break,
            }
        }
        tail
    }
}

fn tokenize(code: &str) -> Result<Vec<(Word, WordTail)>> {
    let mut scanner = Scanner::new(code);
    let mut words = Vec::new();

    scanner.skip_whitespace();
    if scanner.peek() == Some(b'!') {
        scanner.offset += 1;
        let tail = WordTail {
            compiler_command: true,
            ..WordTail::default()
        };
        words.push((Word::new(WordKind::Special, "!"), tail));
    }

    while let Some(word) = scanner.next_word()? {
        let tail = scanner.tail();
        words.push((word, tail));
    }
    Ok(words)
}

// ═══════════════════════════════════════════════════════════════════
// InputReader
// ═══════════════════════════════════════════════════════════════════

/// Line-oriented [`WordStream`] over an in-memory source text.
pub struct InputReader {
    name: String,
    lines: Vec<String>,
    lines_read: usize,
    statement: String,
    indent: String,
    words: Vec<(Word, WordTail)>,
    cursor: usize,
    empty_tail: WordTail,
}

impl InputReader {
    pub fn new(source: &str, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lines: source.lines().map(str::to_string).collect(),
            lines_read: 0,
            statement: String::new(),
            indent: String::new(),
            words: Vec::new(),
            cursor: 0,
            empty_tail: WordTail::default(),
        }
    }

    fn take_line(&mut self) -> Option<String> {
        let line = self.lines.get(self.lines_read)?.clone();
        self.lines_read += 1;
        Some(line)
    }

    /// Advances to the next statement. Returns `false` at end of input.
    pub fn go_to_next_statement(&mut self) -> Result<bool> {
        let Some(mut statement) = self.take_line() else {
            return Ok(false);
        };
        self.words.clear();
        self.cursor = 0;

        let trimmed = statement.trim_start();
        self.indent = statement[..statement.len() - trimmed.len()].to_string();

        if trimmed.starts_with("/*") {
            while !statement.contains("*/") {
                let Some(next) = self.take_line() else { break };
                statement.push_str(NEWLINE);
                statement.push_str(&next);
            }
            self.statement = statement;
            return Ok(true);
        }

        while statement.ends_with('\\') {
            let Some(next) = self.take_line() else { break };
            statement.pop();
            statement.push_str(next.trim_start());
        }

        self.words = tokenize(&statement[self.indent.len()..])?;
        self.statement = statement;
        Ok(true)
    }
}

impl WordStream for InputReader {
    fn next_word(&mut self) -> Result<Word> {
        match self.words.get(self.cursor) {
            Some((word, _)) => {
                self.cursor += 1;
                Ok(word.clone())
            }
            None => Err(CompileError::syntax("Unexpected end of statement")),
        }
    }

    fn has_next_word(&self) -> bool {
        self.cursor < self.words.len()
    }

    fn word_tail(&self) -> &WordTail {
        match self.cursor.checked_sub(1) {
            Some(idx) => &self.words[idx].1,
            None => &self.empty_tail,
        }
    }

    fn consume_args_close(&mut self) {
        if let Some(idx) = self.cursor.checked_sub(1) {
            self.words[idx].1.consume_args_close();
        }
    }

    fn indent(&self) -> &str {
        &self.indent
    }

    fn current_statement(&self) -> &str {
        &self.statement
    }

    fn lines_read(&self) -> usize {
        self.lines_read
    }

    fn source_name(&self) -> &str {
        &self.name
    }
}
