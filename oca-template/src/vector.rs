//! Named group of pairs: one nested block such as a disk or a NIC.

use std::fmt;

use crate::error::{Result, TemplateError};
use crate::pair::{PairValue, TemplatePair};
use crate::xml::{FromXml, XmlReader};

/// A `KEY=[ ... ]` block.
///
/// Pairs keep insertion (or document) order and may repeat a key, e.g.
/// several `NAMESERVER` entries. Lookups are linear scans in that order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateVector {
    key: String,
    pairs: Vec<TemplatePair>,
}

impl TemplateVector {
    /// Create an empty vector on the build path (key upper-cased).
    pub fn new(key: &str) -> Self {
        Self {
            key: key.to_uppercase(),
            pairs: Vec::new(),
        }
    }

    /// Create an empty vector from parsed input, keeping the key verbatim.
    pub fn parsed(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            pairs: Vec::new(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn pairs(&self) -> &[TemplatePair] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    // =========================================================================
    // Building
    // =========================================================================

    /// Append a pair. The key is upper-cased.
    pub fn add_pair(&mut self, key: &str, value: impl Into<PairValue>) -> &mut Self {
        self.pairs.push(TemplatePair::new(key, value));
        self
    }

    /// Append a pair from an untyped value; only integers and strings are
    /// accepted.
    pub fn add_json_pair(&mut self, key: &str, value: &serde_json::Value) -> Result<()> {
        let value = PairValue::try_from(value)?;
        self.pairs.push(TemplatePair::new(key, value));
        Ok(())
    }

    /// Append an already built pair, key untouched (parse path).
    pub fn push(&mut self, pair: TemplatePair) {
        self.pairs.push(pair);
    }

    /// Remove every pair with this key.
    pub fn del(&mut self, key: &str) {
        self.pairs.retain(|p| p.key() != key);
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    pub fn exists(&self, key: &str) -> bool {
        self.pairs.iter().any(|p| p.key() == key)
    }

    /// All pairs with this key, in order.
    pub fn get_pairs(&self, key: &str) -> Vec<&TemplatePair> {
        self.pairs.iter().filter(|p| p.key() == key).collect()
    }

    /// First pair with this key.
    pub fn first_pair(&self, key: &str) -> Option<&TemplatePair> {
        self.pairs.iter().find(|p| p.key() == key)
    }

    /// The only pair with this key.
    pub fn get_pair(&self, key: &str) -> Result<&TemplatePair> {
        unique(self.pairs.iter().filter(|p| p.key() == key), key)
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

    /// Exact key and value match.
    pub fn match_pair(&self, key: &str, value: &str) -> bool {
        self.pairs
            .iter()
            .any(|p| p.key() == key && p.value() == value)
    }
}

/// Resolve a unique lookup: absent and ambiguous are different errors.
pub(crate) fn unique<T>(mut matches: impl Iterator<Item = T>, key: &str) -> Result<T> {
    let first = matches
        .next()
        .ok_or_else(|| TemplateError::NotFound(key.to_string()))?;
    if matches.next().is_some() {
        return Err(TemplateError::MultipleMatches(key.to_string()));
    }
    Ok(first)
}

/// `KEY=[\n    k1="v1",\n    k2="v2" ]`
impl fmt::Display for TemplateVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}=[", self.key)?;
        for (i, pair) in self.pairs.iter().enumerate() {
            if i > 0 {
                f.write_str(",\n")?;
            }
            write!(f, "    {}", pair)?;
        }
        f.write_str(" ]")
    }
}

/// Every child element becomes a pair: local name as key, own character
/// data as value. Deeper nesting is skipped.
impl FromXml for TemplateVector {
    fn from_xml(reader: &mut XmlReader<'_>, start: &str) -> Result<Self> {
        let mut vector = TemplateVector::parsed(start);
        reader.read_children(start, |r, child| {
            let value = r.read_text(&child)?;
            vector.push(TemplatePair::parsed(child, value));
            Ok(())
        })?;
        Ok(vector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vector_layout() {
        let mut nic = TemplateVector::new("nic");
        nic.add_pair("network", "public").add_pair("ip", "10.0.0.5");

        assert_eq!(
            nic.to_string(),
            "NIC=[\n    NETWORK=\"public\",\n    IP=\"10.0.0.5\" ]"
        );
    }

    #[test]
    fn test_empty_vector_layout() {
        let v = TemplateVector::new("CONTEXT");
        assert_eq!(v.to_string(), "CONTEXT=[\n ]");
    }

    #[test]
    fn test_repeated_keys() {
        let mut ctx = TemplateVector::new("CONTEXT");
        ctx.add_pair("NAMESERVER", "1.1.1.1")
            .add_pair("NETWORK", "YES")
            .add_pair("NAMESERVER", "8.8.8.8");

        let all: Vec<&str> = ctx.get_pairs("NAMESERVER").iter().map(|p| p.value()).collect();
        assert_eq!(all, vec!["1.1.1.1", "8.8.8.8"]);
        assert_eq!(ctx.first_pair("NAMESERVER").unwrap().value(), "1.1.1.1");
        assert_eq!(
            ctx.get_pair("NAMESERVER"),
            Err(TemplateError::MultipleMatches("NAMESERVER".into()))
        );
        assert_eq!(ctx.get_str("NETWORK").unwrap(), "YES");
    }

    #[test]
    fn test_lookup_ignores_insertion_order() {
        // Unsorted on purpose: a sorted-search lookup would miss "A".
        let mut v = TemplateVector::new("X");
        v.add_pair("Z", "1").add_pair("B", "2").add_pair("A", "3");

        assert_eq!(v.get_str("A").unwrap(), "3");
        assert_eq!(v.get_str("Z").unwrap(), "1");
        assert!(v.exists("B"));
    }

    #[test]
    fn test_get_id() {
        let mut disk = TemplateVector::new("DISK");
        disk.add_pair("IMAGE_ID", 119u32).add_pair("SIZE", "big");

        assert_eq!(disk.get_id("IMAGE_ID").unwrap(), 119);
        assert_eq!(
            disk.get_id("DISK_ID"),
            Err(TemplateError::NotFound("DISK_ID".into()))
        );
        assert!(matches!(
            disk.get_id("SIZE"),
            Err(TemplateError::TypeMismatch(_))
        ));
    }

    #[test]
    fn test_del_removes_adjacent_duplicates() {
        let mut v = TemplateVector::new("X");
        v.add_pair("A", "1").add_pair("A", "2").add_pair("B", "3").add_pair("A", "4");
        v.del("A");

        assert_eq!(v.len(), 1);
        assert_eq!(v.pairs()[0].key(), "B");
    }

    #[test]
    fn test_add_json_pair_rejects_floats() {
        let mut v = TemplateVector::new("X");
        assert!(v.add_json_pair("CPU", &serde_json::json!(0.5)).is_err());
        v.add_json_pair("VCPU", &serde_json::json!(2)).unwrap();
        assert!(!v.is_empty());
        assert_eq!(v.get_str("VCPU").unwrap(), "2");
    }
}
