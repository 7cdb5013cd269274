//! Recursive-descent parser turning a token stream into a [`Config`] tree.
//!
//! Grounded on the original `config/Parser.cpp`: one token of lookahead,
//! directives dispatched by identifier text, same validation rules
//! (missing `listen`, non-positive port, location path must start with `/`).

use crate::config::lexer::{Lexer, Token, TokenKind};
use crate::config::model::{Config, Location, ServerConfig};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
#[error("{message} at {line}:{col}")]
pub struct ConfigError {
    pub message: String,
    pub line: usize,
    pub col: usize,
}

impl ConfigError {
    fn at(tok: &Token, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            line: tok.line,
            col: tok.col,
        }
    }
}

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    cur: Token,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str) -> Self {
        let mut lexer = Lexer::new(input);
        let cur = lexer.next();
        Self { lexer, cur }
    }

    fn advance(&mut self) {
        self.cur = self.lexer.next();
    }

    fn accept(&mut self, kind: TokenKind) -> bool {
        if self.cur.kind == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<(), ConfigError> {
        if self.accept(kind) {
            Ok(())
        } else {
            Err(ConfigError::at(&self.cur, format!("expected {what}")))
        }
    }

    fn is_word(&self, word: &str) -> bool {
        self.cur.kind == TokenKind::Identifier && self.cur.text == word
    }

    fn is_value(&self) -> bool {
        matches!(self.cur.kind, TokenKind::Identifier | TokenKind::String)
    }

    pub fn parse(&mut self) -> Result<Config, ConfigError> {
        let mut cfg = Config::default();

        while self.cur.kind != TokenKind::Eof {
            if self.is_word("server") {
                self.advance();
                self.expect(TokenKind::LBrace, "'{' after server")?;
                let srv = self.parse_server_body()?;
                cfg.servers.push(srv);
            } else {
                return Err(ConfigError::at(&self.cur, "expected 'server' block"));
            }
        }

        if cfg.servers.is_empty() {
            return Err(ConfigError::at(&self.cur, "no server blocks found"));
        }

        Ok(cfg)
    }

    fn parse_server_body(&mut self) -> Result<ServerConfig, ConfigError> {
        let mut srv = ServerConfig::default();
        let mut root_set = false;

        while !self.accept(TokenKind::RBrace) {
            if self.is_word("listen") {
                self.advance();
                if self.cur.kind != TokenKind::Identifier {
                    return Err(ConfigError::at(&self.cur, "listen expects host:port"));
                }
                let hp = self.cur.text.clone();
                self.advance();
                self.expect(TokenKind::Semi, "';'")?;

                let Some(colon) = hp.rfind(':') else {
                    return Err(ConfigError::at(&self.cur, "listen requires host:port"));
                };
                srv.host = hp[..colon].to_string();
                srv.port = hp[colon + 1..]
                    .parse()
                    .map_err(|_| ConfigError::at(&self.cur, "listen requires a numeric port"))?;
            } else if self.is_word("server_name") {
                self.advance();
                while self.is_value() {
                    srv.server_names.push(self.cur.text.clone());
                    self.advance();
                }
                self.expect(TokenKind::Semi, "';'")?;
            } else if self.is_word("root") {
                self.advance();
                if !self.is_value() {
                    return Err(ConfigError::at(&self.cur, "root expects path"));
                }
                srv.root = self.cur.text.clone();
                root_set = true;
                self.advance();
                self.expect(TokenKind::Semi, "';'")?;
            } else if self.is_word("index") {
                self.advance();
                while self.is_value() {
                    self.advance();
                }
                self.expect(TokenKind::Semi, "';'")?;
            } else if self.is_word("error_page") {
                self.advance();
                if self.cur.kind != TokenKind::Identifier {
                    return Err(ConfigError::at(&self.cur, "error_page expects code"));
                }
                let code: u16 = self
                    .cur
                    .text
                    .parse()
                    .map_err(|_| ConfigError::at(&self.cur, "error_page expects a numeric code"))?;
                self.advance();
                if !self.is_value() {
                    return Err(ConfigError::at(&self.cur, "error_page expects path"));
                }
                srv.error_pages.insert(code, self.cur.text.clone());
                self.advance();
                self.expect(TokenKind::Semi, "';'")?;
            } else if self.is_word("client_max_body_size") {
                self.advance();
                srv.client_max_body_size = self.parse_size()?;
                self.expect(TokenKind::Semi, "';'")?;
            } else if self.is_word("location") {
                let loc = self.parse_location()?;
                srv.locations.push(loc);
            } else {
                return Err(ConfigError::at(
                    &self.cur,
                    format!("unknown directive in server: {}", self.cur.text),
                ));
            }
        }

        if srv.host.is_empty() {
            return Err(ConfigError::at(&self.cur, "server: missing listen host"));
        }
        if srv.port == 0 {
            return Err(ConfigError::at(&self.cur, "server: invalid listen port"));
        }
        if !root_set {
            srv.root = ".".to_string();
        }

        Ok(srv)
    }

    fn parse_location(&mut self) -> Result<Location, ConfigError> {
        self.advance(); // consume 'location'
        if !self.is_value() {
            return Err(ConfigError::at(&self.cur, "location expects path"));
        }
        let mut loc = Location {
            path: self.cur.text.clone(),
            ..Location::default()
        };
        self.advance();
        self.expect(TokenKind::LBrace, "'{' after location")?;

        while !self.accept(TokenKind::RBrace) {
            if self.is_word("allow_methods") {
                self.advance();
                while self.cur.kind == TokenKind::Identifier {
                    loc.allow_methods.push(self.cur.text.clone());
                    self.advance();
                }
                self.expect(TokenKind::Semi, "';'")?;
            } else if self.is_word("root") {
                self.advance();
                if !self.is_value() {
                    return Err(ConfigError::at(&self.cur, "root expects path"));
                }
                loc.root = Some(self.cur.text.clone());
                self.advance();
                self.expect(TokenKind::Semi, "';'")?;
            } else if self.is_word("alias") {
                self.advance();
                if !self.is_value() {
                    return Err(ConfigError::at(&self.cur, "alias expects path"));
                }
                loc.alias = Some(self.cur.text.clone());
                self.advance();
                self.expect(TokenKind::Semi, "';'")?;
            } else if self.is_word("index") {
                self.advance();
                while self.is_value() {
                    loc.index.push(self.cur.text.clone());
                    self.advance();
                }
                self.expect(TokenKind::Semi, "';'")?;
            } else if self.is_word("autoindex") {
                self.advance();
                if self.cur.kind != TokenKind::Identifier {
                    return Err(ConfigError::at(&self.cur, "autoindex expects on/off"));
                }
                loc.autoindex = to_bool(&self.cur.text);
                self.advance();
                self.expect(TokenKind::Semi, "';'")?;
            } else if self.is_word("upload_enable") {
                self.advance();
                if self.cur.kind != TokenKind::Identifier {
                    return Err(ConfigError::at(&self.cur, "upload_enable expects on/off"));
                }
                loc.upload_enable = to_bool(&self.cur.text);
                self.advance();
                self.expect(TokenKind::Semi, "';'")?;
            } else if self.is_word("upload_store") {
                self.advance();
                if !self.is_value() {
                    return Err(ConfigError::at(&self.cur, "upload_store expects path"));
                }
                loc.upload_store = Some(self.cur.text.clone());
                self.advance();
                self.expect(TokenKind::Semi, "';'")?;
            } else if self.is_word("return") {
                self.advance();
                if self.cur.kind != TokenKind::Identifier {
                    return Err(ConfigError::at(&self.cur, "return expects code"));
                }
                let code: u16 = self
                    .cur
                    .text
                    .parse()
                    .map_err(|_| ConfigError::at(&self.cur, "return expects a numeric code"))?;
                loc.return_code = Some(code);
                self.advance();
                if !self.is_value() {
                    return Err(ConfigError::at(&self.cur, "return expects url"));
                }
                loc.return_url = Some(self.cur.text.clone());
                self.advance();
                self.expect(TokenKind::Semi, "';'")?;
            } else if self.is_word("cgi_ext") {
                self.advance();
                if self.cur.kind != TokenKind::Identifier {
                    return Err(ConfigError::at(&self.cur, "cgi_ext expects extension"));
                }
                loc.cgi_ext = Some(self.cur.text.clone());
                self.advance();
                self.expect(TokenKind::Semi, "';'")?;
            } else if self.is_word("cgi_bin") {
                self.advance();
                if !self.is_value() {
                    return Err(ConfigError::at(&self.cur, "cgi_bin expects path"));
                }
                loc.cgi_bin = Some(self.cur.text.clone());
                self.advance();
                self.expect(TokenKind::Semi, "';'")?;
            } else if self.is_word("client_max_body_size") {
                self.advance();
                loc.client_max_body_size = self.parse_size()?;
                self.expect(TokenKind::Semi, "';'")?;
            } else {
                return Err(ConfigError::at(
                    &self.cur,
                    format!("unknown directive in location: {}", self.cur.text),
                ));
            }
        }

        if loc.path.is_empty() || !loc.path.starts_with('/') {
            return Err(ConfigError::at(&self.cur, "location path must start with '/'"));
        }

        if loc.allow_methods.is_empty() {
            loc.allow_methods = vec!["GET".into(), "POST".into(), "DELETE".into()];
        }

        Ok(loc)
    }

    fn parse_size(&mut self) -> Result<u64, ConfigError> {
        if self.cur.kind != TokenKind::Identifier {
            return Err(ConfigError::at(&self.cur, "expected a size value"));
        }
        let text = self.cur.text.clone();
        let tok = self.cur.clone();
        self.advance();
        parse_size_with_units(&text).ok_or_else(|| ConfigError::at(&tok, format!("invalid size '{text}'")))
    }
}

fn to_bool(s: &str) -> bool {
    matches!(s, "on" | "true" | "1" | "yes")
}

/// Parses a decimal size literal with an optional `k/K/m/M/g/G` suffix
/// meaning 1024-powers. No suffix means raw bytes.
pub fn parse_size_with_units(s: &str) -> Option<u64> {
    if s.is_empty() {
        return None;
    }

    let (digits, multiplier) = match s.as_bytes()[s.len() - 1] {
        b'k' | b'K' => (&s[..s.len() - 1], 1024u64),
        b'm' | b'M' => (&s[..s.len() - 1], 1024 * 1024),
        b'g' | b'G' => (&s[..s.len() - 1], 1024 * 1024 * 1024),
        _ => (s, 1),
    };

    if digits.is_empty() || !digits.bytes().all(|c| c.is_ascii_digit()) {
        return None;
    }

    digits.parse::<u64>().ok().map(|n| n * multiplier)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_minimal_server() {
        let src = r#"
            server {
                listen 0.0.0.0:8080;
                server_name example.com;
                root ./site;
                location / {
                    autoindex on;
                }
            }
        "#;
        let cfg = Parser::new(src).parse().unwrap();
        assert_eq!(cfg.servers.len(), 1);
        let srv = &cfg.servers[0];
        assert_eq!(srv.host, "0.0.0.0");
        assert_eq!(srv.port, 8080);
        assert_eq!(srv.root, "./site");
        assert_eq!(srv.locations[0].allow_methods, vec!["GET", "POST", "DELETE"]);
        assert!(srv.locations[0].autoindex);
    }

    #[test]
    fn rejects_missing_server_blocks() {
        assert!(Parser::new("").parse().is_err());
    }

    #[test]
    fn rejects_location_path_without_leading_slash() {
        let src = r#"
            server {
                listen 0.0.0.0:80;
                location bad {
                }
            }
        "#;
        assert!(Parser::new(src).parse().is_err());
    }

    #[test]
    fn size_units_are_1024_powers() {
        assert_eq!(parse_size_with_units("10"), Some(10));
        assert_eq!(parse_size_with_units("2k"), Some(2048));
        assert_eq!(parse_size_with_units("1M"), Some(1024 * 1024));
        assert_eq!(parse_size_with_units("1g"), Some(1024 * 1024 * 1024));
        assert_eq!(parse_size_with_units("abc"), None);
        assert_eq!(parse_size_with_units(""), None);
    }
}
