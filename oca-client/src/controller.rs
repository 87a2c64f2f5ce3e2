//! Entry point of the resource API.
//!
//! A [`Controller`] binds a transport. Per-resource controllers borrow it:
//! `controller.images()` operates on the image pool, `controller.image(id)`
//! on one image.

use std::sync::Arc;

use oca_template::{FromXml, TemplateError, XmlReader};
use tracing::{debug, info};

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::transport::{CallArg, Transport};
use crate::xmlrpc::XmlRpcTransport;

/// Client bound to one control plane endpoint.
#[derive(Clone)]
pub struct Controller {
    transport: Arc<dyn Transport>,
}

impl Controller {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Build an XML-RPC controller from configuration.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let transport = XmlRpcTransport::new(config)?;
        info!(endpoint = %transport.endpoint(), "Controller ready");
        Ok(Self::new(Arc::new(transport)))
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub(crate) async fn call(&self, method: &str, args: Vec<CallArg>) -> Result<String> {
        self.transport.call(method, args).await
    }

    /// Call and parse the body as `T`.
    pub(crate) async fn call_parse<T: FromXml>(
        &self,
        method: &str,
        args: Vec<CallArg>,
    ) -> Result<T> {
        let body = self.call(method, args).await?;
        debug!(method = %method, bytes = body.len(), "Parsing response");
        Ok(T::from_xml_str(&body)?)
    }

    /// Call an allocation method and return the new resource id.
    pub(crate) async fn call_id(&self, method: &str, args: Vec<CallArg>) -> Result<i64> {
        let body = self.call(method, args).await?;
        body.trim().parse::<i64>().map_err(|_| {
            ClientError::Response(format!("[{}] expected an id, got {:?}", method, body))
        })
    }
}

/// An element of a pool listing.
pub trait PoolItem: FromXml {
    /// Element name inside the pool document.
    const TAG: &'static str;

    fn id(&self) -> i64;

    fn name(&self) -> &str;
}

/// A pool listing: `<IMAGE_POOL><IMAGE>...</IMAGE>...</IMAGE_POOL>`.
#[derive(Debug, Clone, PartialEq)]
pub struct Pool<T> {
    items: Vec<T>,
}

impl<T> Pool<T> {
    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }
}

impl<T: PoolItem> Pool<T> {
    /// Id of the only item matching `predicate`.
    pub fn find_unique<F>(&self, what: &str, predicate: F) -> Result<i64>
    where
        F: Fn(&T) -> bool,
    {
        let mut matches = self.items.iter().filter(|item| predicate(item));

        let first = matches
            .next()
            .ok_or_else(|| ClientError::NotFound(what.to_string()))?;
        if matches.next().is_some() {
            return Err(ClientError::MultipleMatches(what.to_string()));
        }

        Ok(first.id())
    }

    pub fn by_name(&self, name: &str) -> Result<i64> {
        self.find_unique(&format!("{} named {:?}", T::TAG, name), |item| {
            item.name() == name
        })
    }
}

impl<T: PoolItem> FromXml for Pool<T> {
    fn from_xml(reader: &mut XmlReader<'_>, start: &str) -> oca_template::Result<Self> {
        let mut items = Vec::new();
        reader.read_children(start, |r, child| {
            if child == T::TAG {
                items.push(T::from_xml(r, &child)?);
                Ok(())
            } else {
                r.skip_element(&child)
            }
        })?;
        Ok(Self { items })
    }
}

impl<'a, T> IntoIterator for &'a Pool<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Lock block of a resource.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LockInfo {
    /// Locked level, see [`LockLevel`](crate::params::LockLevel).
    pub locked: i64,
    pub owner: i64,
    pub time: i64,
    pub req_id: i64,
}

impl FromXml for LockInfo {
    fn from_xml(reader: &mut XmlReader<'_>, start: &str) -> oca_template::Result<Self> {
        let mut lock = LockInfo::default();
        reader.read_children(start, |r, child| {
            let slot = match child.as_str() {
                "LOCKED" => &mut lock.locked,
                "OWNER" => &mut lock.owner,
                "TIME" => &mut lock.time,
                "REQ_ID" => &mut lock.req_id,
                _ => return r.skip_element(&child),
            };
            *slot = r.read_parsed(&child)?;
            Ok(())
        })?;
        Ok(lock)
    }
}

/// Owner and group fields shared by most resources.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ownership {
    pub uid: i64,
    pub gid: i64,
    pub uname: String,
    pub gname: String,
}

impl Ownership {
    /// Read `child` if it is one of the ownership fields.
    /// Returns `false` when the element is not handled.
    pub(crate) fn read_field(
        &mut self,
        reader: &mut XmlReader<'_>,
        child: &str,
    ) -> oca_template::Result<bool> {
        match child {
            "UID" => self.uid = reader.read_parsed(child)?,
            "GID" => self.gid = reader.read_parsed(child)?,
            "UNAME" => self.uname = reader.read_text(child)?,
            "GNAME" => self.gname = reader.read_text(child)?,
            _ => return Ok(false),
        }
        Ok(true)
    }
}

/// Error for a state number outside the known set.
pub(crate) fn invalid_state(kind: &str, raw: i64) -> ClientError {
    ClientError::Template(TemplateError::TypeMismatch(format!(
        "{} state {} is not handled",
        kind, raw
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct Item {
        id: i64,
        name: String,
    }

    impl FromXml for Item {
        fn from_xml(reader: &mut XmlReader<'_>, start: &str) -> oca_template::Result<Self> {
            let mut item = Item::default();
            reader.read_children(start, |r, child| {
                match child.as_str() {
                    "ID" => item.id = r.read_parsed(&child)?,
                    "NAME" => item.name = r.read_text(&child)?,
                    _ => r.skip_element(&child)?,
                }
                Ok(())
            })?;
            Ok(item)
        }
    }

    impl PoolItem for Item {
        const TAG: &'static str = "ITEM";

        fn id(&self) -> i64 {
            self.id
        }

        fn name(&self) -> &str {
            &self.name
        }
    }

    fn pool() -> Pool<Item> {
        Pool::from_xml_str(
            "<ITEM_POOL>\
               <ITEM><ID>1</ID><NAME>web</NAME></ITEM>\
               <ITEM><ID>2</ID><NAME>db</NAME><EXTRA><X>1</X></EXTRA></ITEM>\
               <ITEM><ID>3</ID><NAME>db</NAME></ITEM>\
             </ITEM_POOL>",
        )
        .unwrap()
    }

    #[test]
    fn test_pool_parse() {
        let pool = pool();
        assert_eq!(pool.len(), 3);
        assert_eq!(pool.items()[1].id, 2);
    }

    #[test]
    fn test_by_name() {
        let pool = pool();
        assert_eq!(pool.by_name("web").unwrap(), 1);
        assert!(matches!(
            pool.by_name("db"),
            Err(ClientError::MultipleMatches(_))
        ));
        assert!(matches!(
            pool.by_name("cache"),
            Err(ClientError::NotFound(_))
        ));
    }

    #[test]
    fn test_lock_info() {
        let lock = LockInfo::from_xml_str(
            "<LOCK><LOCKED>1</LOCKED><OWNER>0</OWNER><TIME>1561000000</TIME><REQ_ID>-1</REQ_ID></LOCK>",
        )
        .unwrap();
        assert_eq!(lock.locked, 1);
        assert_eq!(lock.req_id, -1);
    }
}
