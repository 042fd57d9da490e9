//! memd - An in-memory memcache server
//!
//! This library implements a subset of the memcache text protocol
//! (`get`, `set`, `quit`) on top of a bounded LRU cache with batched
//! background eviction.
//!
//! # Modules
//!
//! - [`cache`] - Key/value storage: the batched-eviction LRU engine plus
//!   eager and unbounded variants behind a common [`Cache`] trait
//! - [`server`] - TCP listener, line framing, and the per-connection
//!   protocol state machine
//! - [`config`] - Environment-driven server configuration

pub mod cache;
pub mod config;
pub mod server;

pub use cache::{BatchLruCache, Cache, CacheError, CacheTuning, EagerLruCache, SimpleCache};
pub use config::{Config, ConfigError};
pub use server::{serve, ConnectionError, ProtocolError, Session};
