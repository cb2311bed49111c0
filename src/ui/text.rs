//! Display-string tokenizer. Splits text into glyph codes, newlines and inline
//! color escapes (`\x1c` + code letter, or `\x1c[name]`).

use crate::ui::color::ColorRange;

pub const TEXTCOLOR_ESCAPE: char = '\x1c';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorEscape<'a> {
    Code(char),
    Named(&'a str),
    /// Escape marker at the very end of the string.
    Empty,
}

impl ColorEscape<'_> {
    /// Color range selected by this escape, if it names a known one.
    pub fn range(&self) -> Option<ColorRange> {
        match self {
            Self::Code(c) => ColorRange::from_escape_code(*c),
            Self::Named(name) => name.parse().ok(),
            Self::Empty => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextToken<'a> {
    Glyph(i32),
    Newline,
    Color(ColorEscape<'a>),
}

#[derive(Debug, Clone)]
pub struct TextTokens<'a> {
    text: &'a str,
    pos: usize,
}

#[inline(always)]
pub fn tokens(text: &str) -> TextTokens<'_> {
    TextTokens { text, pos: 0 }
}

impl<'a> Iterator for TextTokens<'a> {
    type Item = TextToken<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let rest = &self.text[self.pos..];
        let ch = rest.chars().next()?;
        self.pos += ch.len_utf8();

        match ch {
            '\n' => Some(TextToken::Newline),
            TEXTCOLOR_ESCAPE => {
                let rest = &self.text[self.pos..];
                let Some(code) = rest.chars().next() else {
                    return Some(TextToken::Color(ColorEscape::Empty));
                };
                if code == '[' {
                    // Unterminated brackets swallow the rest of the string.
                    let body = &rest[1..];
                    match body.find(']') {
                        Some(end) => {
                            self.pos += 1 + end + 1;
                            Some(TextToken::Color(ColorEscape::Named(&body[..end])))
                        }
                        None => {
                            self.pos = self.text.len();
                            Some(TextToken::Color(ColorEscape::Named(body)))
                        }
                    }
                } else {
                    self.pos += code.len_utf8();
                    Some(TextToken::Color(ColorEscape::Code(code)))
                }
            }
            _ => Some(TextToken::Glyph(ch as i32)),
        }
    }
}
