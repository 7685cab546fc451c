//! Tokens shown in the span annotation UI.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::parser::LayoutLabel;

/// Text placed between blocks of a page.
pub const SEPARATOR: &str = "\n\n";

/// Font size of heading tokens.
pub const FONT_SIZE_HEADING: u32 = 18;

/// Font size of regular text in the UI theme.
pub const FONT_SIZE_TEXT: u32 = 14;

/// A whitespace-delimited token.
///
/// `start` and `end` are character offsets into the text the token was
/// cut from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub text: String,
    pub start: usize,
    pub end: usize,
    pub id: usize,
    /// Whether whitespace follows the token
    pub ws: bool,
    /// Layout label of the enclosing block; `None` for separators
    pub layout: Option<LayoutLabel>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub disabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<TokenStyle>,
}

impl Token {
    pub fn is_separator(&self) -> bool {
        self.text == SEPARATOR
    }
}

/// Inline CSS applied to a token.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_weight: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<u32>,
}

impl TokenStyle {
    pub fn hidden() -> Self {
        Self {
            display: Some("none".to_string()),
            ..Default::default()
        }
    }

    pub fn heading() -> Self {
        Self {
            font_weight: Some("bold".to_string()),
            font_size: Some(FONT_SIZE_HEADING),
            ..Default::default()
        }
    }
}

fn word() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\S+").expect("static regex"))
}

/// Builds tokens over text that is assembled piece by piece.
#[derive(Debug, Default)]
pub struct TokenWriter {
    text: String,
    chars: usize,
    tokens: Vec<Token>,
}

impl TokenWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Character length of the text written so far.
    pub fn char_len(&self) -> usize {
        self.chars
    }

    /// Number of tokens written so far.
    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    /// Append `text`, splitting it on whitespace into tokens labelled
    /// `layout`.
    pub fn push_text(&mut self, text: &str, layout: LayoutLabel) {
        let style = layout.is_heading().then(TokenStyle::heading);
        let mut byte_cursor = 0;
        let mut char_cursor = self.chars;

        for m in word().find_iter(text) {
            char_cursor += text[byte_cursor..m.start()].chars().count();
            let len = m.as_str().chars().count();
            let ws = text[m.end()..].starts_with(char::is_whitespace);
            self.tokens.push(Token {
                text: m.as_str().to_string(),
                start: char_cursor,
                end: char_cursor + len,
                id: self.tokens.len(),
                ws,
                layout: Some(layout),
                disabled: false,
                style: style.clone(),
            });
            char_cursor += len;
            byte_cursor = m.end();
        }

        self.text.push_str(text);
        self.chars += text.chars().count();
    }

    /// Append a block separator as a disabled, hidden token.
    pub fn push_separator(&mut self) {
        let len = SEPARATOR.chars().count();
        self.tokens.push(Token {
            text: SEPARATOR.to_string(),
            start: self.chars,
            end: self.chars + len,
            id: self.tokens.len(),
            ws: false,
            layout: None,
            disabled: true,
            style: Some(TokenStyle::hidden()),
        });
        self.text.push_str(SEPARATOR);
        self.chars += len;
    }

    pub fn finish(self) -> (String, Vec<Token>) {
        (self.text, self.tokens)
    }
}

/// Tokenize a single block of text.
pub fn tokenize(text: &str, layout: LayoutLabel) -> Vec<Token> {
    let mut writer = TokenWriter::new();
    writer.push_text(text, layout);
    writer.finish().1
}
