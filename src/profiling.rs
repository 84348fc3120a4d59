// Copyright 2024 Saptak Santra
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # Tracing setup
//!
//! Enable the `profiling` feature in your Cargo.toml:
//!
//! ```toml
//! [dependencies]
//! gamedata = { version = "1.2", features = ["profiling"] }
//! ```
//!
//! Cache lookups, table loads and factory builds then open spans, and every
//! load, release and protocol violation is logged. Install a subscriber once
//! at startup:
//!
//! ```ignore
//! gamedata::profiling::init_stdout();
//! ```
//!
//! Use `RUST_LOG=gamedata=trace` to see cache hits as well.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use std::path::Path;

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("gamedata=debug"))
}

/// Log to stdout. Returns false if a global subscriber was already set.
pub fn init_stdout() -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(filter())
        .with_target(false)
        .try_init()
        .is_ok()
}

/// Log JSON lines to `dir/file_name`.
///
/// Keep the returned guard alive for as long as logs should be flushed.
pub fn init_file(dir: impl AsRef<Path>, file_name: &str) -> Option<WorkerGuard> {
    let appender = tracing_appender::rolling::never(dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter())
        .with_writer(writer)
        .try_init()
        .ok()
        .map(|_| guard)
}
