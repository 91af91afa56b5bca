//! Tokens and the process-wide keyword trie.
use once_cell::sync::Lazy;

use super::error::ParseError;
use super::trie::Trie;
use crate::color::Rgba;
use crate::model::Primitive;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // literals
    Number,
    Rgba,
    Variable,

    // punctuation
    Mult,
    Define,
    OpenBrace,
    CloseBrace,
    OpenBracket,
    CloseBracket,
    Greater,
    Comma,
    Colon,

    // directives
    Set,
    Rule,
    MaxDepth,
    MaxObjects,
    MinSize,
    MaxSize,
    Seed,
    Initial,
    Background,
    Weight,
    Translation,
    Rotation,
    Pivot,
    Scale,

    // transformation operators
    X,
    Y,
    Z,
    Rx,
    Ry,
    Rz,
    S,
    M,
    Fx,
    Fy,
    Fz,
    Hue,
    Sat,
    Brightness,
    Alpha,
    Color,
    Blend,
    Random,

    // color pools
    ColorPool,
    RandomHue,
    RandomRgb,
    Greyscale,
    List,

    // primitives
    Box,
    Grid,
    Sphere,
    Line,
    Point,
    Triangle,
    Mesh,
    Cylinder,
    Tube,
}

const KEYWORD_TABLE: &[(&str, TokenKind)] = &[
    ("*", TokenKind::Mult),
    ("#define", TokenKind::Define),
    ("{", TokenKind::OpenBrace),
    ("}", TokenKind::CloseBrace),
    ("[", TokenKind::OpenBracket),
    ("]", TokenKind::CloseBracket),
    (">", TokenKind::Greater),
    (",", TokenKind::Comma),
    (":", TokenKind::Colon),
    ("set", TokenKind::Set),
    ("rule", TokenKind::Rule),
    ("maxdepth", TokenKind::MaxDepth),
    ("md", TokenKind::MaxDepth),
    ("maxobjects", TokenKind::MaxObjects),
    ("minsize", TokenKind::MinSize),
    ("maxsize", TokenKind::MaxSize),
    ("seed", TokenKind::Seed),
    ("initial", TokenKind::Initial),
    ("background", TokenKind::Background),
    ("weight", TokenKind::Weight),
    ("w", TokenKind::Weight),
    ("translation", TokenKind::Translation),
    ("rotation", TokenKind::Rotation),
    ("pivot", TokenKind::Pivot),
    ("scale", TokenKind::Scale),
    ("x", TokenKind::X),
    ("y", TokenKind::Y),
    ("z", TokenKind::Z),
    ("rx", TokenKind::Rx),
    ("ry", TokenKind::Ry),
    ("rz", TokenKind::Rz),
    ("s", TokenKind::S),
    ("m", TokenKind::M),
    ("fx", TokenKind::Fx),
    ("fy", TokenKind::Fy),
    ("fz", TokenKind::Fz),
    ("hue", TokenKind::Hue),
    ("sat", TokenKind::Sat),
    ("brightness", TokenKind::Brightness),
    ("b", TokenKind::Brightness),
    ("alpha", TokenKind::Alpha),
    ("a", TokenKind::Alpha),
    ("color", TokenKind::Color),
    ("blend", TokenKind::Blend),
    ("random", TokenKind::Random),
    ("colorpool", TokenKind::ColorPool),
    ("randomhue", TokenKind::RandomHue),
    ("randomrgb", TokenKind::RandomRgb),
    ("greyscale", TokenKind::Greyscale),
    ("list", TokenKind::List),
    ("box", TokenKind::Box),
    ("grid", TokenKind::Grid),
    ("sphere", TokenKind::Sphere),
    ("line", TokenKind::Line),
    ("point", TokenKind::Point),
    ("triangle", TokenKind::Triangle),
    ("mesh", TokenKind::Mesh),
    ("cylinder", TokenKind::Cylinder),
    ("tube", TokenKind::Tube),
];

/// Reserved words and punctuation. Built on first use, read-only after.
pub static KEYWORDS: Lazy<Trie<TokenKind>> = Lazy::new(|| {
    let mut trie = Trie::new();
    for &(word, kind) in KEYWORD_TABLE {
        trie.insert(word, kind);
    }
    trie
});

impl TokenKind {
    pub fn primitive(self) -> Option<Primitive> {
        Some(match self {
            TokenKind::Box => Primitive::Box,
            TokenKind::Grid => Primitive::Grid,
            TokenKind::Sphere => Primitive::Sphere,
            TokenKind::Line => Primitive::Line,
            TokenKind::Point => Primitive::Point,
            TokenKind::Triangle => Primitive::Triangle,
            TokenKind::Mesh => Primitive::Mesh,
            TokenKind::Cylinder => Primitive::Cylinder,
            TokenKind::Tube => Primitive::Tube,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Payload {
    None,
    Number(f64),
    Rgba(Rgba),
    Name(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    payload: Payload,
    pub line: usize,
}

impl Token {
    pub fn keyword(kind: TokenKind, line: usize) -> Self {
        Self {
            kind,
            payload: Payload::None,
            line,
        }
    }

    pub fn number(value: f64, line: usize) -> Self {
        Self {
            kind: TokenKind::Number,
            payload: Payload::Number(value),
            line,
        }
    }

    pub fn rgba(rgba: Rgba, line: usize) -> Self {
        Self {
            kind: TokenKind::Rgba,
            payload: Payload::Rgba(rgba),
            line,
        }
    }

    pub fn variable(name: impl Into<String>, line: usize) -> Self {
        Self {
            kind: TokenKind::Variable,
            payload: Payload::Name(name.into()),
            line,
        }
    }

    pub fn value(&self) -> Result<f64, ParseError> {
        match self.payload {
            Payload::Number(v) => Ok(v),
            _ => Err(ParseError::internal(
                "Trying to get value from non-numeric token",
                self.line,
            )),
        }
    }

    pub fn color(&self) -> Result<Rgba, ParseError> {
        match self.payload {
            Payload::Rgba(c) => Ok(c),
            _ => Err(ParseError::internal(
                "Trying to get color from non-color token",
                self.line,
            )),
        }
    }

    pub fn name(&self) -> Result<&str, ParseError> {
        match &self.payload {
            Payload::Name(n) => Ok(n),
            _ => Err(ParseError::internal(
                "Trying to get name from non-variable token",
                self.line,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::error::ErrorKind;

    #[test]
    fn test_keyword_table_lookup() {
        let test_cases = vec![
            ("md", Some(TokenKind::MaxDepth)),
            ("maxdepth", Some(TokenKind::MaxDepth)),
            ("w", Some(TokenKind::Weight)),
            ("b", Some(TokenKind::Brightness)),
            ("a", Some(TokenKind::Alpha)),
            ("#define", Some(TokenKind::Define)),
            ("randomhue", Some(TokenKind::RandomHue)),
            ("tube", Some(TokenKind::Tube)),
            ("rules", None),
            ("ma", None),
        ];
        for (word, expected) in test_cases {
            assert_eq!(KEYWORDS.get(word), expected, "{word}");
        }
    }

    #[test]
    fn test_wrong_payload_is_internal_error() {
        let t = Token::keyword(TokenKind::Box, 3);
        let err = t.value().unwrap_err();
        assert_eq!(err.kind, ErrorKind::Internal);
        assert_eq!(err.line, Some(3));
        assert!(t.name().is_err());
        assert!(t.color().is_err());

        let n = Token::number(2.5, 1);
        assert_eq!(n.value(), Ok(2.5));
        assert!(n.name().is_err());
    }
}
