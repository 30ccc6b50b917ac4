// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The status channel between the harness and the runner.
//!
//! The harness creates a pipe and hands its write end to the runner. The runner finds out about it
//! through three environment variables:
//!
//! * [`EMIT_STATUS_ENV`] carries the fixed [`EMIT_STATUS_HANDSHAKE`] string. A runner only
//!   emits status if this matches exactly.
//! * [`IPC_FD_ENV`] names the descriptor (Unix) or handle (Windows) to write to.
//! * [`IPC_SERIALIZATION_ENV`] names the [`SerializationMode`] used to frame messages.
//!
//! Each message is a JSON object whose `type` field names a [`StatusEvent`] kind.

mod emitter;
mod events;
mod framing;

pub use emitter::*;
pub use events::*;
pub use framing::*;

/// The environment variable a runner checks before emitting status over IPC.
pub const EMIT_STATUS_ENV: &str = "EMIT_RUN_STATUS_OVER_IPC";

/// The value of [`EMIT_STATUS_ENV`] both ends of the channel agree on.
pub const EMIT_STATUS_HANDSHAKE: &str = "I'll find a payphone baby / Take some time to talk to you";

/// The environment variable naming the channel's descriptor or handle in the runner.
pub const IPC_FD_ENV: &str = "RUN_STATUS_IPC_FD";

/// The environment variable naming the channel's [`SerializationMode`].
pub const IPC_SERIALIZATION_ENV: &str = "RUN_STATUS_IPC_SERIALIZATION";

/// The descriptor the channel's write end is installed at in the runner.
#[cfg(unix)]
pub const CHILD_IPC_FD: i32 = 3;
