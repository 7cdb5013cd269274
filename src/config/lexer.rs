//! Hand-rolled tokenizer for the nginx-style configuration grammar (§6.1).
//!
//! Grounded on the original `config/Lexer.cpp`: bare identifiers cover
//! hosts, paths, and numbers in one token kind; quoted strings support
//! `\"` and `\\` escapes only; `#` starts a line comment.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Identifier,
    String,
    LBrace,
    RBrace,
    Semi,
    Eof,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: usize,
    pub col: usize,
}

pub struct Lexer<'a> {
    src: &'a [u8],
    pos: usize,
    line: usize,
    col: usize,
}

fn is_ident(c: u8) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, b'_' | b'.' | b'/' | b'-' | b':')
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            src: input.as_bytes(),
            pos: 0,
            line: 1,
            col: 1,
        }
    }

    fn peek_byte(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let c = self.peek_byte()?;
        self.pos += 1;
        if c == b'\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn skip_spaces_and_comments(&mut self) {
        while let Some(c) = self.peek_byte() {
            match c {
                b' ' | b'\t' | b'\r' | b'\n' => {
                    self.bump();
                }
                b'#' => {
                    while let Some(c) = self.peek_byte() {
                        if c == b'\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                _ => break,
            }
        }
    }

    fn read_quoted_string(&mut self) -> String {
        self.bump(); // opening quote
        let mut buf = Vec::new();

        while let Some(c) = self.peek_byte() {
            if c == b'"' {
                break;
            }
            self.bump();
            if c == b'\\' {
                if let Some(n) = self.peek_byte() {
                    self.bump();
                    if n == b'"' || n == b'\\' {
                        buf.push(n);
                    } else {
                        buf.push(b'\\');
                        buf.push(n);
                    }
                }
            } else {
                buf.push(c);
            }
        }

        if self.peek_byte() == Some(b'"') {
            self.bump();
        }

        String::from_utf8_lossy(&buf).into_owned()
    }

    fn read_identifier(&mut self) -> String {
        let mut buf = Vec::new();
        while let Some(c) = self.peek_byte() {
            if !is_ident(c) {
                break;
            }
            buf.push(c);
            self.bump();
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    pub fn next(&mut self) -> Token {
        self.skip_spaces_and_comments();
        let (line, col) = (self.line, self.col);

        let Some(c) = self.peek_byte() else {
            return Token {
                kind: TokenKind::Eof,
                text: String::new(),
                line,
                col,
            };
        };

        match c {
            b'{' => {
                self.bump();
                Token { kind: TokenKind::LBrace, text: "{".into(), line, col }
            }
            b'}' => {
                self.bump();
                Token { kind: TokenKind::RBrace, text: "}".into(), line, col }
            }
            b';' => {
                self.bump();
                Token { kind: TokenKind::Semi, text: ";".into(), line, col }
            }
            b'"' => {
                let text = self.read_quoted_string();
                Token { kind: TokenKind::String, text, line, col }
            }
            c if is_ident(c) => {
                let text = self.read_identifier();
                Token { kind: TokenKind::Identifier, text, line, col }
            }
            _ => {
                self.bump();
                Token {
                    kind: TokenKind::Identifier,
                    text: (c as char).to_string(),
                    line,
                    col,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(src: &str) -> Vec<(TokenKind, String)> {
        let mut lx = Lexer::new(src);
        let mut out = Vec::new();
        loop {
            let t = lx.next();
            let done = t.kind == TokenKind::Eof;
            out.push((t.kind, t.text));
            if done {
                break;
            }
        }
        out
    }

    #[test]
    fn lexes_braces_and_identifiers() {
        let got = tokens("server { listen 0.0.0.0:8080; }");
        assert_eq!(got[0], (TokenKind::Identifier, "server".into()));
        assert_eq!(got[1], (TokenKind::LBrace, "{".into()));
        assert_eq!(got[2], (TokenKind::Identifier, "listen".into()));
        assert_eq!(got[3], (TokenKind::Identifier, "0.0.0.0:8080".into()));
        assert_eq!(got[4], (TokenKind::Semi, ";".into()));
        assert_eq!(got[5], (TokenKind::RBrace, "}".into()));
    }

    #[test]
    fn skips_comments() {
        let got = tokens("# a comment\nroot /x;");
        assert_eq!(got[0], (TokenKind::Identifier, "root".into()));
    }

    #[test]
    fn quoted_strings_support_escapes() {
        let got = tokens(r#""a \"b\" c\\d""#);
        assert_eq!(got[0], (TokenKind::String, "a \"b\" c\\d".into()));
    }
}
