//! The dynamic template: an ordered document of pairs and vectors.

use std::fmt;

use tracing::{debug, trace};

use crate::error::{Result, TemplateError};
use crate::pair::{PairValue, TemplatePair};
use crate::vector::{unique, TemplateVector};
use crate::xml::{escape, FromXml, Token, XmlReader};

/// One top-level entry of a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateElement {
    Pair(TemplatePair),
    Vector(TemplateVector),
}

impl TemplateElement {
    pub fn key(&self) -> &str {
        match self {
            TemplateElement::Pair(p) => p.key(),
            TemplateElement::Vector(v) => v.key(),
        }
    }

    pub fn as_pair(&self) -> Option<&TemplatePair> {
        match self {
            TemplateElement::Pair(p) => Some(p),
            TemplateElement::Vector(_) => None,
        }
    }

    pub fn as_vector(&self) -> Option<&TemplateVector> {
        match self {
            TemplateElement::Vector(v) => Some(v),
            TemplateElement::Pair(_) => None,
        }
    }
}

impl fmt::Display for TemplateElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateElement::Pair(p) => fmt::Display::fmt(p, f),
            TemplateElement::Vector(v) => fmt::Display::fmt(v, f),
        }
    }
}

impl From<TemplatePair> for TemplateElement {
    fn from(pair: TemplatePair) -> Self {
        TemplateElement::Pair(pair)
    }
}

impl From<TemplateVector> for TemplateElement {
    fn from(vector: TemplateVector) -> Self {
        TemplateElement::Vector(vector)
    }
}

/// Schema-free template document.
///
/// Elements keep insertion order when built and document order when parsed.
/// Keys may repeat. Every lookup is a linear scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DynamicTemplate {
    elements: Vec<TemplateElement>,
}

impl DynamicTemplate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn elements(&self) -> &[TemplateElement] {
        &self.elements
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TemplateElement> {
        self.elements.iter()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    // =========================================================================
    // Building
    // =========================================================================

    /// Append an element as is.
    pub fn push(&mut self, element: impl Into<TemplateElement>) {
        self.elements.push(element.into());
    }

    /// Append a new empty vector and return it for filling.
    pub fn add_vector(&mut self, key: &str) -> &mut TemplateVector {
        let index = self.elements.len();
        self.elements
            .push(TemplateElement::Vector(TemplateVector::new(key)));

        match &mut self.elements[index] {
            TemplateElement::Vector(v) => v,
            TemplateElement::Pair(_) => unreachable!("just pushed a vector"),
        }
    }

    /// Append a pair. The key is upper-cased.
    pub fn add_pair(&mut self, key: &str, value: impl Into<PairValue>) -> &mut Self {
        self.elements
            .push(TemplateElement::Pair(TemplatePair::new(key, value)));
        self
    }

    /// Append a pair from an untyped value; only integers and strings are
    /// accepted.
    pub fn add_json_pair(&mut self, key: &str, value: &serde_json::Value) -> Result<()> {
        let value = PairValue::try_from(value)?;
        self.add_pair(key, value);
        Ok(())
    }

    /// Add a pair to the vector `vector_key`, creating the vector if it does
    /// not exist yet.
    pub fn add_pair_to_vector(
        &mut self,
        vector_key: &str,
        key: &str,
        value: impl Into<PairValue>,
    ) -> Result<()> {
        let vector_key = vector_key.to_uppercase();

        let count = self.vectors_with(&vector_key).count();
        let vector = match count {
            0 => self.add_vector(&vector_key),
            1 => self.get_vector_mut(&vector_key)?,
            _ => return Err(TemplateError::MultipleMatches(vector_key)),
        };
        vector.add_pair(key, value);
        Ok(())
    }

    /// Remove every element (pair or vector) with this key.
    pub fn del(&mut self, key: &str) {
        self.elements.retain(|e| e.key() != key);
    }

    /// Replace `NAME`.
    pub fn set_name(&mut self, name: &str) {
        self.del("NAME");
        self.add_pair("NAME", name);
    }

    /// Replace `DESCRIPTION`.
    pub fn set_description(&mut self, description: &str) {
        self.del("DESCRIPTION");
        self.add_pair("DESCRIPTION", description);
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// Any element, pair or vector, with this key.
    pub fn exists(&self, key: &str) -> bool {
        self.elements.iter().any(|e| e.key() == key)
    }

    fn pairs_with<'a>(&'a self, key: &str) -> impl Iterator<Item = &'a TemplatePair> + 'a {
        let key = key.to_string();
        self.elements
            .iter()
            .filter_map(TemplateElement::as_pair)
            .filter(move |p| p.key() == key)
    }

    fn vectors_with<'a>(&'a self, key: &str) -> impl Iterator<Item = &'a TemplateVector> + 'a {
        let key = key.to_string();
        self.elements
            .iter()
            .filter_map(TemplateElement::as_vector)
            .filter(move |v| v.key() == key)
    }

    /// All top-level pairs with this key, in order.
    pub fn get_pairs(&self, key: &str) -> Vec<&TemplatePair> {
        self.pairs_with(key).collect()
    }

    pub fn first_pair(&self, key: &str) -> Option<&TemplatePair> {
        self.pairs_with(key).next()
    }

    /// The only top-level pair with this key.
    pub fn get_pair(&self, key: &str) -> Result<&TemplatePair> {
        unique(self.pairs_with(key), key)
    }

    /// All vectors with this key, in order.
    pub fn get_vectors(&self, key: &str) -> Vec<&TemplateVector> {
        self.vectors_with(key).collect()
    }

    /// The only vector with this key.
    pub fn get_vector(&self, key: &str) -> Result<&TemplateVector> {
        unique(self.vectors_with(key), key)
    }

    pub fn vectors_mut(&mut self, key: &str) -> Vec<&mut TemplateVector> {
        self.elements
            .iter_mut()
            .filter_map(|e| match e {
                TemplateElement::Vector(v) if v.key() == key => Some(v),
                _ => None,
            })
            .collect()
    }

    pub fn get_vector_mut(&mut self, key: &str) -> Result<&mut TemplateVector> {
        unique(self.vectors_mut(key).into_iter(), key)
    }

    pub fn get_str(&self, key: &str) -> Result<&str> {
        self.get_pair(key).map(TemplatePair::value)
    }

    pub fn get_int(&self, key: &str) -> Result<i64> {
        self.get_pair(key)?.as_int()
    }

    /// Unique pair parsed as a non-negative integer.
    pub fn get_id(&self, key: &str) -> Result<u64> {
        self.get_pair(key)?.as_id()
    }

    /// Value of `key` inside the unique vector `vector_key`.
    pub fn get_str_from_vector(&self, vector_key: &str, key: &str) -> Result<&str> {
        self.get_vector(vector_key)?.get_str(key)
    }

    /// Exact key and value match at the top level or one level down inside
    /// any vector.
    pub fn match_pair(&self, key: &str, value: &str) -> bool {
        self.elements.iter().any(|e| match e {
            TemplateElement::Pair(p) => p.key() == key && p.value() == value,
            TemplateElement::Vector(v) => v.match_pair(key, value),
        })
    }

    // =========================================================================
    // Codecs
    // =========================================================================

    /// Render as an XML document rooted at `root`.
    pub fn to_xml(&self, root: &str) -> String {
        let mut out = format!("<{}>", root);
        for element in &self.elements {
            match element {
                TemplateElement::Pair(p) => push_leaf(&mut out, p),
                TemplateElement::Vector(v) => {
                    out.push_str(&format!("<{}>", v.key()));
                    for p in v.pairs() {
                        push_leaf(&mut out, p);
                    }
                    out.push_str(&format!("</{}>", v.key()));
                }
            }
        }
        out.push_str(&format!("</{}>", root));
        out
    }

    /// Parse a template from an XML document such as
    /// `<TEMPLATE><NAME>x</NAME><NIC><IP>1.2.3.4</IP></NIC></TEMPLATE>`.
    ///
    /// The root element name is not checked.
    pub fn parse_xml(xml: &str) -> Result<Self> {
        Self::from_xml_str(xml)
    }

    /// Read children of `parent` until its end tag, accepting only the ones
    /// `accept` lets through. The others are handed back to `on_skipped` so
    /// a facade can bind them to its own fields.
    pub fn read_children_filtered<A, S>(
        &mut self,
        reader: &mut XmlReader<'_>,
        parent: &str,
        accept: A,
        mut on_skipped: S,
    ) -> Result<()>
    where
        A: Fn(&str) -> bool,
        S: FnMut(&mut XmlReader<'_>, String) -> Result<()>,
    {
        reader.read_children(parent, |r, child| {
            if accept(child.as_str()) {
                self.read_element(r, child)
            } else {
                on_skipped(r, child)
            }
        })
    }

    /// Read one element whose start tag `name` was just consumed.
    ///
    /// Pair or vector is decided by the next one or two tokens:
    /// a nested start tag means a vector, character data followed by our end
    /// tag means a pair, and whitespace followed by a start tag is indentation
    /// in front of a vector. Any other text in front of a nested tag is an
    /// error.
    pub fn read_element(&mut self, reader: &mut XmlReader<'_>, name: String) -> Result<()> {
        match reader.next_token()? {
            Token::Start(child) => {
                reader.push_back(Token::Start(child));
                self.read_vector(reader, name)
            }
            Token::End(_) => {
                self.elements
                    .push(TemplateElement::Pair(TemplatePair::parsed(name, "")));
                Ok(())
            }
            Token::Text(text) => match reader.next_token()? {
                Token::Start(child) if text.trim().is_empty() => {
                    reader.push_back(Token::Start(child));
                    self.read_vector(reader, name)
                }
                Token::Start(_) => {
                    Err(reader.unexpected(&Token::Text(text), &format!("a child of <{}>", name)))
                }
                Token::End(_) => {
                    self.elements
                        .push(TemplateElement::Pair(TemplatePair::parsed(name, text)));
                    Ok(())
                }
                other => Err(reader.unexpected(&other, &format!("</{}>", name))),
            },
            Token::Eof => Err(reader.unexpected(&Token::Eof, &format!("</{}>", name))),
        }
    }

    fn read_vector(&mut self, reader: &mut XmlReader<'_>, name: String) -> Result<()> {
        let vector = TemplateVector::from_xml(reader, &name)?;

        trace!(vector = %name, pairs = vector.len(), "Parsed template vector");
        self.elements.push(TemplateElement::Vector(vector));
        Ok(())
    }
}

fn push_leaf(out: &mut String, pair: &TemplatePair) {
    out.push_str(&format!(
        "<{k}>{v}</{k}>",
        k = pair.key(),
        v = escape(pair.value())
    ));
}

impl FromXml for DynamicTemplate {
    fn from_xml(reader: &mut XmlReader<'_>, start: &str) -> Result<Self> {
        let mut template = DynamicTemplate::new();
        reader.read_children(start, |r, child| template.read_element(r, child))?;

        debug!(root = %start, elements = template.len(), "Parsed template");
        Ok(template)
    }
}

/// Wire text: elements joined by newlines, no trailing newline.
impl fmt::Display for DynamicTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, element) in self.elements.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            fmt::Display::fmt(element, f)?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a DynamicTemplate {
    type Item = &'a TemplateElement;
    type IntoIter = std::slice::Iter<'a, TemplateElement>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.iter()
    }
}

impl FromIterator<TemplateElement> for DynamicTemplate {
    fn from_iter<I: IntoIterator<Item = TemplateElement>>(iter: I) -> Self {
        Self {
            elements: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DynamicTemplate {
        let mut tpl = DynamicTemplate::new();
        tpl.add_pair("name", "web-1").add_pair("memory", 1024u32);
        tpl.add_vector("nic")
            .add_pair("network", "public")
            .add_pair("ip", "10.0.0.5");
        tpl.add_pair("label", "a");
        tpl
    }

    #[test]
    fn test_serialize() {
        assert_eq!(
            sample().to_string(),
            "NAME=\"web-1\"\nMEMORY=\"1024\"\nNIC=[\n    NETWORK=\"public\",\n    IP=\"10.0.0.5\" ]\nLABEL=\"a\""
        );
        assert_eq!(DynamicTemplate::new().to_string(), "");
    }

    #[test]
    fn test_serialize_is_idempotent() {
        let tpl = sample();
        assert_eq!(tpl.to_string(), tpl.to_string());
    }

    #[test]
    fn test_unique_vs_all_lookup() {
        let mut tpl = DynamicTemplate::new();
        tpl.add_pair("A", "1").add_pair("B", "x").add_pair("A", "2");

        assert_eq!(
            tpl.get_pair("A"),
            Err(TemplateError::MultipleMatches("A".into()))
        );
        let all: Vec<&str> = tpl.get_pairs("A").iter().map(|p| p.value()).collect();
        assert_eq!(all, vec!["1", "2"]);
        assert_eq!(tpl.get_pair("C"), Err(TemplateError::NotFound("C".into())));
    }

    #[test]
    fn test_pairs_and_vectors_are_looked_up_separately() {
        let tpl = sample();
        assert!(tpl.exists("NIC"));
        assert!(tpl.get_pair("NIC").is_err());
        assert_eq!(tpl.get_vector("NIC").unwrap().len(), 2);
        assert_eq!(tpl.get_str_from_vector("NIC", "IP").unwrap(), "10.0.0.5");
        assert_eq!(tpl.get_int("MEMORY").unwrap(), 1024);
    }

    #[test]
    fn test_add_pair_to_vector() {
        let mut tpl = DynamicTemplate::new();
        tpl.add_pair_to_vector("os", "arch", "x86_64").unwrap();
        tpl.add_pair_to_vector("OS", "boot", "disk0").unwrap();

        assert_eq!(tpl.len(), 1);
        assert_eq!(tpl.get_vector("OS").unwrap().len(), 2);

        tpl.add_vector("OS");
        assert_eq!(
            tpl.add_pair_to_vector("OS", "machine", "q35"),
            Err(TemplateError::MultipleMatches("OS".into()))
        );
    }

    #[test]
    fn test_del_removes_pairs_and_vectors() {
        let mut tpl = DynamicTemplate::new();
        tpl.add_pair("DISK", "x");
        tpl.add_vector("DISK").add_pair("IMAGE_ID", 1u32);
        tpl.add_vector("DISK").add_pair("IMAGE_ID", 2u32);
        tpl.add_pair("NAME", "n");

        tpl.del("DISK");
        assert_eq!(tpl.len(), 1);
        assert!(!tpl.exists("DISK"));
    }

    #[test]
    fn test_match_pair_one_level_down() {
        let tpl = sample();
        assert!(tpl.match_pair("NAME", "web-1"));
        assert!(tpl.match_pair("NETWORK", "public"));
        assert!(!tpl.match_pair("NETWORK", "private"));
    }

    #[test]
    fn test_set_name_replaces() {
        let mut tpl = sample();
        tpl.set_name("web-2");
        tpl.set_description("second");
        assert_eq!(tpl.get_str("NAME").unwrap(), "web-2");
        assert_eq!(tpl.get_pairs("NAME").len(), 1);
        assert_eq!(tpl.get_str("DESCRIPTION").unwrap(), "second");
    }

    #[test]
    fn test_parse_vector() {
        let tpl = DynamicTemplate::parse_xml("<TEMPLATE><NIC><IP>1.2.3.4</IP></NIC></TEMPLATE>")
            .unwrap();
        assert_eq!(tpl.len(), 1);
        let nic = tpl.get_vector("NIC").unwrap();
        assert_eq!(nic.len(), 1);
        assert_eq!(nic.get_str("IP").unwrap(), "1.2.3.4");
    }

    #[test]
    fn test_parse_empty_pair() {
        let tpl = DynamicTemplate::parse_xml("<TEMPLATE><FOO></FOO></TEMPLATE>").unwrap();
        assert_eq!(tpl.to_string(), "FOO=\"\"");
    }

    #[test]
    fn test_parse_indented_vector() {
        let xml = "<TEMPLATE>\n  <CONTEXT>\n    <NETWORK>YES</NETWORK>\n    <SSH><![CDATA[ssh-ed25519 AAA]]></SSH>\n  </CONTEXT>\n  <NAME>vm</NAME>\n</TEMPLATE>";
        let tpl = DynamicTemplate::parse_xml(xml).unwrap();

        assert_eq!(tpl.len(), 2);
        assert_eq!(tpl.get_str_from_vector("CONTEXT", "SSH").unwrap(), "ssh-ed25519 AAA");
        assert_eq!(tpl.get_str("NAME").unwrap(), "vm");
    }

    #[test]
    fn test_parse_keeps_source_case_and_order() {
        let tpl = DynamicTemplate::parse_xml(
            "<TEMPLATE><b>2</b><a>1</a><b>3</b><Disk><x> y </x></Disk></TEMPLATE>",
        )
        .unwrap();
        assert_eq!(tpl.to_string(), "b=\"2\"\na=\"1\"\nb=\"3\"\nDisk=[\n    x=\" y \" ]");
    }

    #[test]
    fn test_parse_errors() {
        assert!(DynamicTemplate::parse_xml("<TEMPLATE><A>1</A>").is_err());
        assert!(DynamicTemplate::parse_xml("<TEMPLATE>junk<A>1</A></TEMPLATE>").is_err());
        assert!(DynamicTemplate::parse_xml("").is_err());
    }

    #[test]
    fn test_text_in_front_of_nested_element() {
        assert!(matches!(
            DynamicTemplate::parse_xml("<T><A>junk<B>1</B></A></T>"),
            Err(TemplateError::Parse(_))
        ));
        assert!(matches!(
            DynamicTemplate::parse_xml("<T><A><B>1</B>junk</A></T>"),
            Err(TemplateError::Parse(_))
        ));
    }

    #[test]
    fn test_lookup_key_can_be_temporary() {
        let tpl = sample();
        let pair = tpl.get_pair(&"name".to_uppercase()).unwrap();
        let nic = tpl.get_vector(&String::from("NIC")).unwrap();
        let first = tpl.first_pair(&format!("{}BEL", "LA")).unwrap();

        assert_eq!(pair.value(), "web-1");
        assert_eq!(nic.len(), 2);
        assert_eq!(first.value(), "a");
    }

    #[test]
    fn test_xml_round_trip() {
        let mut tpl = sample();
        tpl.add_pair("NOTE", "a < b & \"c\"");
        let parsed = DynamicTemplate::parse_xml(&tpl.to_xml("TEMPLATE")).unwrap();
        assert_eq!(parsed, tpl);
    }

    #[test]
    fn test_json_pairs() {
        let mut tpl = DynamicTemplate::new();
        tpl.add_json_pair("vcpu", &serde_json::json!(4)).unwrap();
        assert!(matches!(
            tpl.add_json_pair("cpu", &serde_json::json!(0.5)),
            Err(TemplateError::TypeMismatch(_))
        ));
        assert_eq!(tpl.to_string(), "VCPU=\"4\"");
    }
}
