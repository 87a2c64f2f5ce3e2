//! Wire text parser, the inverse of `DynamicTemplate`'s `Display`.
//!
//! Accepted input:
//!
//! ```text
//! # comment
//! NAME="web-1"
//! MEMORY=512
//! NIC=[
//!     NETWORK="public",
//!     IP=10.0.0.5 ]
//! ```
//!
//! Values are not escaped on the wire, so a quoted value ends at the first
//! quote followed by the end of the line (top level) or by `,` / `]`
//! (inside a vector). Quoted values may span lines.
//!
//! A value whose own text has a quote right before a line break (or before
//! `,` / `]` inside a vector) is cut at that quote, so it does not read back.
//! `CMD="echo "hi"\nexit"` fails on line 2.

use std::str::FromStr;

use tracing::debug;

use crate::dynamic::DynamicTemplate;
use crate::error::{Result, TemplateError};
use crate::pair::TemplatePair;
use crate::vector::TemplateVector;

#[derive(Clone, Copy)]
enum Context {
    TopLevel,
    InVector,
}

struct Cursor<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
        }
    }

    fn line_at(&self, pos: usize) -> usize {
        self.src[..pos].matches('\n').count() + 1
    }

    fn error(&self, pos: usize, msg: &str) -> TemplateError {
        TemplateError::Parse(format!("line {}: {}", self.line_at(pos), msg))
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.bump();
        }
    }

    fn skip_inline_whitespace(&mut self) {
        while matches!(self.peek(), Some(' ') | Some('\t')) {
            self.bump();
        }
    }

    fn skip_line(&mut self) {
        match self.rest().find('\n') {
            Some(i) => self.pos += i + 1,
            None => self.pos = self.src.len(),
        }
    }

    /// Read a key up to `=`, which is consumed.
    fn key(&mut self, context: Context) -> Result<String> {
        let start = self.pos;
        let rest = self.rest();
        let stop = |c: char| match context {
            Context::TopLevel => c == '=' || c == '\n',
            Context::InVector => c == '=' || c == '\n' || c == ',' || c == ']',
        };

        match rest.find(stop) {
            Some(i) if rest[i..].starts_with('=') => {
                let key = rest[..i].trim();
                if key.is_empty() {
                    return Err(self.error(start, "empty key"));
                }
                self.pos += i + 1;
                Ok(key.to_string())
            }
            _ => Err(self.error(start, "expected KEY=value")),
        }
    }

    /// Read a value after `=`.
    fn value(&mut self, context: Context) -> Result<String> {
        self.skip_inline_whitespace();
        if self.peek() == Some('"') {
            self.quoted(context)
        } else {
            Ok(self.unquoted(context))
        }
    }

    fn quoted(&mut self, context: Context) -> Result<String> {
        let open = self.pos;
        self.bump();
        let body = self.rest();

        for (i, _) in body.match_indices('"') {
            let after = &body[i + 1..];
            let closes = match context {
                Context::TopLevel => {
                    let after = after.trim_start_matches([' ', '\t', '\r']);
                    after.is_empty() || after.starts_with('\n')
                }
                Context::InVector => {
                    let after = after.trim_start();
                    after.starts_with(',') || after.starts_with(']')
                }
            };
            if closes {
                self.pos += i + 1;
                return Ok(body[..i].to_string());
            }
        }

        Err(self.error(open, "unterminated quoted value"))
    }

    fn unquoted(&mut self, context: Context) -> String {
        let rest = self.rest();
        let end = match context {
            Context::TopLevel => rest.find('\n'),
            Context::InVector => rest.find([',', ']', '\n']),
        }
        .unwrap_or(rest.len());

        self.pos += end;
        rest[..end].trim().to_string()
    }

    /// Rest of the line after a top-level value must be blank.
    fn end_of_line(&mut self) -> Result<()> {
        self.skip_inline_whitespace();
        match self.peek() {
            None => Ok(()),
            Some('\r') | Some('\n') => {
                self.skip_line();
                Ok(())
            }
            Some(_) => Err(self.error(self.pos, "trailing characters after value")),
        }
    }

    /// Read a vector body, the opening `[` already consumed.
    fn vector(&mut self, key: &str, open: usize) -> Result<TemplateVector> {
        let mut vector = TemplateVector::new(key);

        loop {
            self.skip_whitespace();
            match self.peek() {
                None => return Err(self.error(open, "unterminated vector")),
                Some(']') => {
                    self.bump();
                    return Ok(vector);
                }
                Some(_) => {}
            }

            let key = self.key(Context::InVector)?;
            let value = self.value(Context::InVector)?;
            vector.push(TemplatePair::new(&key, value));

            self.skip_whitespace();
            match self.peek() {
                Some(',') => self.bump(),
                Some(']') => {
                    self.bump();
                    return Ok(vector);
                }
                None => return Err(self.error(open, "unterminated vector")),
                Some(_) => return Err(self.error(self.pos, "expected ',' or ']'")),
            }
        }
    }
}

impl FromStr for DynamicTemplate {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self> {
        let mut cursor = Cursor::new(s);
        let mut template = DynamicTemplate::new();

        loop {
            cursor.skip_whitespace();
            match cursor.peek() {
                None => break,
                Some('#') => {
                    cursor.skip_line();
                    continue;
                }
                Some(_) => {}
            }

            let key = cursor.key(Context::TopLevel)?;
            cursor.skip_inline_whitespace();

            if cursor.peek() == Some('[') {
                let open = cursor.pos;
                cursor.bump();
                let vector = cursor.vector(&key, open)?;
                template.push(vector);
            } else {
                let value = cursor.value(Context::TopLevel)?;
                template.add_pair(&key, value);
            }
            cursor.end_of_line()?;
        }

        debug!(elements = template.len(), "Parsed wire text template");
        Ok(template)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_wire_text() {
        let text = "# web tier\nname = \"web-1\"\nMEMORY=512\n\nNIC=[\n    NETWORK=\"public\",\n    IP=10.0.0.5 ]\n";
        let tpl: DynamicTemplate = text.parse().unwrap();

        assert_eq!(tpl.len(), 3);
        assert_eq!(tpl.get_str("NAME").unwrap(), "web-1");
        assert_eq!(tpl.get_int("MEMORY").unwrap(), 512);
        assert_eq!(tpl.get_str_from_vector("NIC", "IP").unwrap(), "10.0.0.5");
    }

    #[test]
    fn test_inverse_of_display() {
        let mut tpl = DynamicTemplate::new();
        tpl.add_pair("NAME", "a, b");
        tpl.add_pair("CMD", "echo \"hi\" there");
        tpl.add_pair("SCRIPT", "line one\nline two");
        tpl.add_vector("CONTEXT")
            .add_pair("NETWORK", "YES")
            .add_pair("SSH_PUBLIC_KEY", "ssh-ed25519 AAAA user@host")
            .add_pair("EMPTY", "");
        tpl.add_vector("GRAPHICS");
        tpl.add_pair("LAST", "");

        let text = tpl.to_string();
        let parsed: DynamicTemplate = text.parse().unwrap();
        assert_eq!(parsed, tpl);
        assert_eq!(parsed.to_string(), text);
    }

    #[test]
    fn test_quote_before_line_break_does_not_read_back() {
        let mut tpl = DynamicTemplate::new();
        tpl.add_pair("CMD", "echo \"hi\"\nexit");

        let err = tpl.to_string().parse::<DynamicTemplate>().unwrap_err();
        assert_eq!(err, TemplateError::Parse("line 2: expected KEY=value".into()));
    }

    #[test]
    fn test_one_line_vector() {
        let tpl: DynamicTemplate = "DISK=[ IMAGE_ID=\"7\", SIZE=1024 ]".parse().unwrap();
        let disk = tpl.get_vector("DISK").unwrap();
        assert_eq!(disk.get_id("IMAGE_ID").unwrap(), 7);
        assert_eq!(disk.get_str("SIZE").unwrap(), "1024");
    }

    #[test]
    fn test_errors_carry_line_numbers() {
        let err = "A=\"1\"\nB\n".parse::<DynamicTemplate>().unwrap_err();
        assert_eq!(err, TemplateError::Parse("line 2: expected KEY=value".into()));

        let err = "A=\"1\"\nNIC=[\n    IP=\"1\",\n".parse::<DynamicTemplate>().unwrap_err();
        assert_eq!(err, TemplateError::Parse("line 2: unterminated vector".into()));

        let err = "A=\"open".parse::<DynamicTemplate>().unwrap_err();
        assert_eq!(err, TemplateError::Parse("line 1: unterminated quoted value".into()));
    }
}
