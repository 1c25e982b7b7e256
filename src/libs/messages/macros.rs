//! Message macros with tracing/console routing.
//!
//! Each macro prints a [`Message`](super::Message) either through `tracing`
//! or straight to the console:
//!
//! - **tracing**: when `DWELLSYNC_DEBUG` or `RUST_LOG` is set, or after
//!   [`route_to_tracing`] was called. The native host calls it on startup
//!   because its stdout carries protocol frames and must never see stray text.
//! - **console**: everything else, i.e. the interactive CLI commands.
//!
//! ```rust
//! use dwellsync::{msg_info, msg_success};
//! use dwellsync::libs::messages::Message;
//!
//! msg_success!(Message::ConfigSaved);
//! msg_info!(Message::QueuedDays(2), true);
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

static DEBUG_MODE: OnceLock<bool> = OnceLock::new();
static FORCE_TRACING: AtomicBool = AtomicBool::new(false);

/// Sends every subsequent message through `tracing`, regardless of environment.
pub fn route_to_tracing() {
    FORCE_TRACING.store(true, Ordering::SeqCst);
}

#[doc(hidden)]
pub fn is_debug_mode() -> bool {
    FORCE_TRACING.load(Ordering::SeqCst)
        || *DEBUG_MODE.get_or_init(|| std::env::var("DWELLSYNC_DEBUG").is_ok() || std::env::var("RUST_LOG").is_ok())
}

/// Prints a plain message.
#[macro_export]
macro_rules! msg_print {
    ($msg:expr) => {
        if $crate::libs::messages::macros::is_debug_mode() {
            tracing::info!("{}", $msg);
        } else {
            println!("{}", $msg);
        }
    };
    ($msg:expr, true) => {
        if $crate::libs::messages::macros::is_debug_mode() {
            tracing::info!("\n{}\n", $msg);
        } else {
            println!("\n{}\n", $msg);
        }
    };
}

/// Prints a success message with ✅ prefix.
#[macro_export]
macro_rules! msg_success {
    ($msg:expr) => {
        if $crate::libs::messages::macros::is_debug_mode() {
            tracing::info!("✅ {}", $msg);
        } else {
            println!("✅ {}", $msg);
        }
    };
    ($msg:expr, true) => {
        if $crate::libs::messages::macros::is_debug_mode() {
            tracing::info!("\n✅ {}\n", $msg);
        } else {
            println!("\n✅ {}\n", $msg);
        }
    };
}

/// Prints an error message with ❌ prefix. Console output goes to stderr.
#[macro_export]
macro_rules! msg_error {
    ($msg:expr) => {
        if $crate::libs::messages::macros::is_debug_mode() {
            tracing::error!("❌ {}", $msg);
        } else {
            eprintln!("❌ {}", $msg);
        }
    };
    ($msg:expr, true) => {
        if $crate::libs::messages::macros::is_debug_mode() {
            tracing::error!("\n❌ {}\n", $msg);
        } else {
            eprintln!("\n❌ {}\n", $msg);
        }
    };
}

/// Prints a warning message with ⚠️ prefix. Console output goes to stderr.
#[macro_export]
macro_rules! msg_warning {
    ($msg:expr) => {
        if $crate::libs::messages::macros::is_debug_mode() {
            tracing::warn!("⚠️  {}", $msg);
        } else {
            eprintln!("⚠️  {}", $msg);
        }
    };
    ($msg:expr, true) => {
        if $crate::libs::messages::macros::is_debug_mode() {
            tracing::warn!("\n⚠️  {}\n", $msg);
        } else {
            eprintln!("\n⚠️  {}\n", $msg);
        }
    };
}

/// Prints an informational message with ℹ️ prefix.
#[macro_export]
macro_rules! msg_info {
    ($msg:expr) => {
        if $crate::libs::messages::macros::is_debug_mode() {
            tracing::info!("ℹ️  {}", $msg);
        } else {
            println!("ℹ️  {}", $msg);
        }
    };
    ($msg:expr, true) => {
        if $crate::libs::messages::macros::is_debug_mode() {
            tracing::info!("\nℹ️  {}\n", $msg);
        } else {
            println!("\nℹ️  {}\n", $msg);
        }
    };
}

/// Creates an `anyhow::Error` from a message.
#[macro_export]
macro_rules! msg_error_anyhow {
    ($msg:expr) => {
        anyhow::anyhow!("❌ {}", $msg)
    };
}

/// Returns early with an `anyhow::Error` built from a message.
#[macro_export]
macro_rules! msg_bail_anyhow {
    ($msg:expr) => {
        anyhow::bail!("❌ {}", $msg)
    };
}
