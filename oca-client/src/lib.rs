//! # oca-client
//!
//! Client for the cloud control plane's XML-RPC interface.
//!
//! - [`Transport`]: one remote call, body or fault. [`XmlRpcTransport`]
//!   talks HTTP, [`MockTransport`] replays scripted responses.
//! - [`Controller`]: typed resource operations (images, documents, VDCs,
//!   VMs, virtual networks) over any transport.
//! - [`ClientConfig`]: endpoint and session configuration.
//!
//! ## Example
//!
//! ```no_run
//! use oca_client::{ClientConfig, Controller, Filter};
//!
//! # async fn run() -> oca_client::Result<()> {
//! let config = ClientConfig::from_env();
//! let controller = Controller::from_config(&config)?;
//!
//! let pool = controller.images().info(&Filter::new()).await?;
//! for image in &pool {
//!     println!("{} {}", image.id, image.name);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod controller;
pub mod error;
pub mod filter;
pub mod mock;
pub mod params;
pub mod resources;
pub mod transport;
pub mod xmlrpc;

pub use config::ClientConfig;
pub use controller::{Controller, LockInfo, Ownership, Pool, PoolItem};
pub use error::{ClientError, Result};
pub use filter::{DocumentFilter, ExtendedFilter, Filter, PoolWho, VmExtendedFilter, VmFilter};
pub use mock::{MockTransport, RecordedCall};
pub use params::{LockLevel, Permissions, UpdateType};
pub use transport::{CallArg, Transport};
pub use xmlrpc::XmlRpcTransport;
