// Copyright 2025 eraflo
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


//! Logger initialisation for binaries and tests.

use env_logger::{Builder, Env};

/// Installs an `env_logger` logger reading `RUST_LOG`, falling back to `default_filter`.
///
/// Returns `false` if a logger was already installed, which makes the call safe
/// to repeat from several tests.
pub fn init_logging(default_filter: &str) -> bool {
    Builder::from_env(Env::default().default_filter_or(default_filter))
        .format_timestamp_millis()
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_rejected_quietly() {
        init_logging("debug");
        assert!(!init_logging("debug"));
        log::debug!("logger still usable after a repeated init");
    }
}
