//! XML token stream used to parse control plane responses.
//!
//! Wraps a `quick_xml` reader and reduces its events to the four tokens the
//! template grammar cares about. Adjacent character data (text, CDATA,
//! entity-split runs) is merged into a single [`Token::Text`]. Comments,
//! declarations and processing instructions are dropped. A pushback buffer
//! lets a parser return a token it peeked at.

use std::collections::VecDeque;
use std::fmt;

use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::trace;

use crate::error::{Result, TemplateError};

/// A reduced XML token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Start tag, local name only.
    Start(String),
    /// End tag, local name only.
    End(String),
    /// Unescaped character data.
    Text(String),
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Start(name) => write!(f, "start tag <{}>", name),
            Token::End(name) => write!(f, "end tag </{}>", name),
            Token::Text(_) => f.write_str("character data"),
            Token::Eof => f.write_str("end of input"),
        }
    }
}

/// Pull reader over an XML document.
pub struct XmlReader<'a> {
    reader: Reader<&'a [u8]>,
    pending: VecDeque<Token>,
}

impl<'a> XmlReader<'a> {
    pub fn new(xml: &'a str) -> Self {
        let mut reader = Reader::from_str(xml);
        // Whitespace between tags must stay visible: it is what the
        // pair/vector lookahead has to see through.
        reader.trim_text(false);
        reader.expand_empty_elements(true);

        Self {
            reader,
            pending: VecDeque::new(),
        }
    }

    /// Byte offset in the input, for error messages.
    pub fn position(&self) -> usize {
        self.reader.buffer_position()
    }

    /// Return a token to the stream; it is the next one read.
    pub fn push_back(&mut self, token: Token) {
        self.pending.push_front(token);
    }

    /// Read the next token.
    pub fn next_token(&mut self) -> Result<Token> {
        if let Some(token) = self.pending.pop_front() {
            return Ok(token);
        }

        let mut text: Option<String> = None;

        loop {
            let token = match self.reader.read_event()? {
                Event::Start(e) => Token::Start(utf8(e.local_name().as_ref())?),
                Event::End(e) => Token::End(utf8(e.local_name().as_ref())?),
                Event::Empty(e) => {
                    let name = utf8(e.local_name().as_ref())?;
                    self.pending.push_back(Token::End(name.clone()));
                    Token::Start(name)
                }
                Event::Text(e) => {
                    let unescaped = e.unescape()?;
                    text.get_or_insert_with(String::new).push_str(&unescaped);
                    continue;
                }
                Event::CData(e) => {
                    let raw = e.into_inner();
                    text.get_or_insert_with(String::new).push_str(&utf8(&raw)?);
                    continue;
                }
                Event::Eof => Token::Eof,
                // Comments, declarations, processing instructions, doctype
                _ => continue,
            };

            return Ok(match text.take() {
                Some(text) => {
                    // Hand out the text first, keep the token that ended it.
                    self.pending.push_back(token);
                    Token::Text(text)
                }
                None => token,
            });
        }
    }

    /// Skip the prolog and return the name of the root element.
    pub fn expect_root(&mut self) -> Result<String> {
        loop {
            match self.next_token()? {
                Token::Start(name) => return Ok(name),
                Token::Text(text) if text.trim().is_empty() => continue,
                other => {
                    return Err(self.unexpected(&other, "a root element"));
                }
            }
        }
    }

    /// Walk the children of `parent` until its end tag, calling `on_child`
    /// with each child start tag. The callback must consume the child up to
    /// and including its end tag.
    ///
    /// Whitespace between children is ignored; any other character data is
    /// an error.
    pub fn read_children<F>(&mut self, parent: &str, mut on_child: F) -> Result<()>
    where
        F: FnMut(&mut Self, String) -> Result<()>,
    {
        loop {
            match self.next_token()? {
                Token::Start(child) => on_child(self, child)?,
                Token::End(name) if name == parent => return Ok(()),
                Token::Text(text) if text.trim().is_empty() => continue,
                other => {
                    return Err(self.unexpected(&other, &format!("a child of <{}>", parent)));
                }
            }
        }
    }

    /// Read the character data of a leaf element, up to its end tag.
    ///
    /// Nested elements are skipped; only the element's own character data is
    /// kept, verbatim.
    pub fn read_text(&mut self, name: &str) -> Result<String> {
        let mut value = String::new();

        loop {
            match self.next_token()? {
                Token::Text(text) => value.push_str(&text),
                Token::Start(child) => self.skip_element(&child)?,
                Token::End(end) if end == name => return Ok(value),
                other => {
                    return Err(self.unexpected(&other, &format!("the content of <{}>", name)));
                }
            }
        }
    }

    /// Read a leaf element and parse its trimmed text.
    pub fn read_parsed<T>(&mut self, name: &str) -> Result<T>
    where
        T: std::str::FromStr,
        T::Err: fmt::Display,
    {
        let text = self.read_text(name)?;
        text.trim().parse::<T>().map_err(|e| {
            TemplateError::TypeMismatch(format!("<{}> value {:?}: {}", name, text, e))
        })
    }

    /// Like [`read_parsed`](Self::read_parsed), but a blank element reads as
    /// `None`.
    pub fn read_parsed_opt<T>(&mut self, name: &str) -> Result<Option<T>>
    where
        T: std::str::FromStr,
        T::Err: fmt::Display,
    {
        let text = self.read_text(name)?;
        if text.trim().is_empty() {
            return Ok(None);
        }
        text.trim().parse::<T>().map(Some).map_err(|e| {
            TemplateError::TypeMismatch(format!("<{}> value {:?}: {}", name, text, e))
        })
    }

    /// Consume an element whose start tag was already read.
    pub fn skip_element(&mut self, name: &str) -> Result<()> {
        trace!(element = %name, "Skipping element");

        let mut depth = 1usize;
        loop {
            match self.next_token()? {
                Token::Start(_) => depth += 1,
                Token::End(_) => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                Token::Text(_) => {}
                Token::Eof => {
                    return Err(self.unexpected(&Token::Eof, &format!("</{}>", name)));
                }
            }
        }
    }

    pub fn unexpected(&self, found: &Token, expected: &str) -> TemplateError {
        TemplateError::Parse(format!(
            "unexpected {} at byte {}, expected {}",
            found,
            self.position(),
            expected
        ))
    }
}

fn utf8(bytes: &[u8]) -> Result<String> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|e| TemplateError::Parse(format!("invalid UTF-8 in XML: {}", e)))
}

/// Types that read themselves from an [`XmlReader`].
///
/// `from_xml` is called right after the element's start tag was consumed and
/// must consume everything up to and including the matching end tag.
pub trait FromXml: Sized {
    fn from_xml(reader: &mut XmlReader<'_>, start: &str) -> Result<Self>;

    /// Parse a whole document whose root element is this type.
    fn from_xml_str(xml: &str) -> Result<Self> {
        let mut reader = XmlReader::new(xml);
        let root = reader.expect_root()?;
        let value = Self::from_xml(&mut reader, &root)?;

        match reader.next_token()? {
            Token::Eof => Ok(value),
            Token::Text(text) if text.trim().is_empty() => match reader.next_token()? {
                Token::Eof => Ok(value),
                other => Err(reader.unexpected(&other, "end of input")),
            },
            other => Err(reader.unexpected(&other, "end of input")),
        }
    }
}

/// Read a list of child elements that all carry one integer
/// (`<VMS><ID>1</ID><ID>4</ID></VMS>`).
pub fn read_id_list(reader: &mut XmlReader<'_>, parent: &str) -> Result<Vec<i64>> {
    let mut ids = Vec::new();
    reader.read_children(parent, |r, child| {
        ids.push(r.read_parsed::<i64>(&child)?);
        Ok(())
    })?;
    Ok(ids)
}

/// Escape character data for element content.
pub fn escape(text: &str) -> std::borrow::Cow<'_, str> {
    quick_xml::escape::escape(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(xml: &str) -> Vec<Token> {
        let mut reader = XmlReader::new(xml);
        let mut out = Vec::new();
        loop {
            let token = reader.next_token().unwrap();
            if token == Token::Eof {
                return out;
            }
            out.push(token);
        }
    }

    #[test]
    fn test_tokens_keep_whitespace() {
        assert_eq!(
            tokens("<A>\n  <B>x</B>\n</A>"),
            vec![
                Token::Start("A".into()),
                Token::Text("\n  ".into()),
                Token::Start("B".into()),
                Token::Text("x".into()),
                Token::End("B".into()),
                Token::Text("\n".into()),
                Token::End("A".into()),
            ]
        );
    }

    #[test]
    fn test_cdata_and_entities_merge() {
        assert_eq!(
            tokens("<A>a &amp; <![CDATA[<b>]]><!-- c --> d</A>"),
            vec![
                Token::Start("A".into()),
                Token::Text("a & <b> d".into()),
                Token::End("A".into()),
            ]
        );
    }

    #[test]
    fn test_empty_element_expands() {
        assert_eq!(
            tokens("<A/>"),
            vec![Token::Start("A".into()), Token::End("A".into())]
        );
    }

    #[test]
    fn test_push_back() {
        let mut reader = XmlReader::new("<A>t</A>");
        let first = reader.next_token().unwrap();
        reader.push_back(first.clone());
        assert_eq!(reader.next_token().unwrap(), first);
        assert_eq!(reader.next_token().unwrap(), Token::Text("t".into()));
    }

    #[test]
    fn test_read_text_skips_nested() {
        let mut reader = XmlReader::new("<A>x<B>y</B>z</A>");
        let root = reader.expect_root().unwrap();
        assert_eq!(reader.read_text(&root).unwrap(), "xz");
    }

    #[test]
    fn test_id_list() {
        let mut reader = XmlReader::new("<VMS>\n<ID>3</ID>\n<ID>12</ID>\n</VMS>");
        let root = reader.expect_root().unwrap();
        assert_eq!(read_id_list(&mut reader, &root).unwrap(), vec![3, 12]);
    }

    #[test]
    fn test_mismatched_end_is_an_error() {
        let mut reader = XmlReader::new("<A><B>x</C></A>");
        let root = reader.expect_root().unwrap();
        assert!(reader.read_text(&root).is_err());
    }
}
