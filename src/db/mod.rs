//! SQLite layer underneath the persistence component.
//!
//! - [`db`]: connection management, opens and migrates the store
//! - [`migrations`]: versioned schema changes
//! - [`kv`]: the flat key-value table all engine state is written to
//!
//! ```rust
//! use dwellsync::db::{db::Db, kv::KeyValues};
//! use serde_json::json;
//!
//! let mut kv = KeyValues::new(Db::in_memory()?);
//! kv.set_many(&[("totalTime", json!(65))])?;
//! assert_eq!(kv.get("totalTime")?, Some(json!(65)));
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod db;
pub mod kv;
pub mod migrations;
