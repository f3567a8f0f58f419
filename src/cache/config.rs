// Copyright 2024 OctoFHIR Team
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

//! Cache configuration options

use serde::Deserialize;

/// Configuration for artifact caching and chain resolution
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CacheConfig {
    /// Whether compiled artifacts are stored and reused
    pub enable_artifact_caching: bool,

    /// Maximum number of memoized inheritance chains (0 disables memoization)
    pub chain_memo_size: usize,

    /// Longest inheritance chain accepted before failing
    pub max_inheritance_depth: usize,

    /// Whether compile durations are measured
    pub record_timings: bool,
}

impl CacheConfig {
    /// Create a new cache configuration with custom settings
    pub fn new(
        enable_artifact_caching: bool,
        chain_memo_size: usize,
        max_inheritance_depth: usize,
    ) -> Self {
        Self {
            enable_artifact_caching,
            chain_memo_size,
            max_inheritance_depth,
            record_timings: true,
        }
    }

    /// Create a configuration optimized for high performance
    pub fn high_performance() -> Self {
        Self {
            enable_artifact_caching: true,
            chain_memo_size: 10_000,
            max_inheritance_depth: 64,
            record_timings: false,
        }
    }

    /// Create a configuration optimized for low memory usage
    pub fn low_memory() -> Self {
        Self {
            enable_artifact_caching: true,
            chain_memo_size: 64,
            max_inheritance_depth: 32,
            record_timings: false,
        }
    }

    /// Create a configuration with caching disabled
    pub fn disabled() -> Self {
        Self {
            enable_artifact_caching: false,
            chain_memo_size: 0,
            max_inheritance_depth: 32,
            record_timings: true,
        }
    }

    /// Create a configuration for testing
    pub fn testing() -> Self {
        Self {
            enable_artifact_caching: true,
            chain_memo_size: 16,
            max_inheritance_depth: 8,
            record_timings: true,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enable_artifact_caching: true,
            chain_memo_size: 1_000,
            max_inheritance_depth: 32,
            record_timings: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_config_default() {
        let config = CacheConfig::default();
        assert!(config.enable_artifact_caching);
        assert_eq!(config.chain_memo_size, 1_000);
        assert_eq!(config.max_inheritance_depth, 32);
        assert!(config.record_timings);
    }

    #[test]
    fn test_cache_config_presets() {
        assert_eq!(CacheConfig::high_performance().chain_memo_size, 10_000);
        assert_eq!(CacheConfig::low_memory().chain_memo_size, 64);
        assert!(!CacheConfig::disabled().enable_artifact_caching);
        assert_eq!(CacheConfig::disabled().chain_memo_size, 0);
        assert_eq!(CacheConfig::testing().max_inheritance_depth, 8);
    }

    #[test]
    fn test_cache_config_new() {
        let config = CacheConfig::new(false, 5, 4);
        assert!(!config.enable_artifact_caching);
        assert_eq!(config.chain_memo_size, 5);
        assert_eq!(config.max_inheritance_depth, 4);
    }

    #[test]
    fn test_cache_config_partial_json() {
        let config: CacheConfig = serde_json::from_str(r#"{"chainMemoSize": 12}"#).unwrap();
        assert_eq!(config.chain_memo_size, 12);
        assert!(config.enable_artifact_caching);
        assert_eq!(config.max_inheritance_depth, 32);
    }
}
