use std::time::Duration;

use crate::store::ConsistencyLevel;

/// Store-wide configuration
///
/// Constructed once at startup and passed by reference to every component
/// that needs it. There is no global configuration state.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Consistency level for MVCC reads (log scans, entity loads)
    pub read_consistency: ConsistencyLevel,

    /// Consistency level for MVCC writes (start, commit, compaction batches)
    pub write_consistency: ConsistencyLevel,

    /// Physical version purging
    pub compaction: CompactionConfig,

    /// Stale-version index cleanup
    pub cleanup: CleanupConfig,

    /// Distributed lock tuning
    pub lock: LockConfig,
}

impl StoreConfig {
    pub fn new() -> Self {
        Self {
            read_consistency: ConsistencyLevel::LocalQuorum,
            write_consistency: ConsistencyLevel::LocalQuorum,
            compaction: CompactionConfig::default(),
            cleanup: CleanupConfig::default(),
            lock: LockConfig::default(),
        }
    }

    /// Set the consistency level for read call sites
    pub fn read_consistency(mut self, level: ConsistencyLevel) -> Self {
        self.read_consistency = level;
        self
    }

    /// Set the consistency level for write call sites
    pub fn write_consistency(mut self, level: ConsistencyLevel) -> Self {
        self.write_consistency = level;
        self
    }

    /// Maximum versions purged per compaction mutation
    pub fn compaction_batch_size(mut self, size: usize) -> Self {
        self.compaction.batch_size = size;
        self
    }

    /// Enable or disable stale-version index cleanup after commits
    ///
    /// Disabling lets tests observe index state before cleanup converges.
    pub fn cleanup_stale_versions(mut self, enabled: bool) -> Self {
        self.cleanup.enabled = enabled;
        self
    }

    /// Versions per buffered index-cleanup dispatch
    pub fn cleanup_buffer_size(mut self, size: usize) -> Self {
        self.cleanup.buffer_size = size;
        self
    }

    /// Sleep between lock poll rounds
    pub fn lock_poll_interval(mut self, interval: Duration) -> Self {
        self.lock.poll_interval = interval;
        self
    }

    /// Maximum lock poll rounds before giving up
    pub fn lock_max_polls(mut self, polls: u32) -> Self {
        self.lock.max_polls = polls;
        self
    }

    /// Consistency level for lock row operations
    pub fn lock_consistency(mut self, level: ConsistencyLevel) -> Self {
        self.lock.consistency = level;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Tuning for the asynchronous physical purge of superseded versions
#[derive(Debug, Clone)]
pub struct CompactionConfig {
    /// Maximum distinct versions removed in one batched mutation
    pub batch_size: usize,
}

impl Default for CompactionConfig {
    fn default() -> Self {
        Self { batch_size: 64 }
    }
}

/// Tuning for secondary-index cleanup notifications
#[derive(Debug, Clone)]
pub struct CleanupConfig {
    /// When false, committed writes do not trigger stale-version index cleanup
    pub enabled: bool,

    /// Versions per background cleanup buffer
    pub buffer_size: usize,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            buffer_size: 25,
        }
    }
}

/// Tuning for distributed lock acquisition
#[derive(Debug, Clone)]
pub struct LockConfig {
    /// Sleep between poll rounds while waiting for the successor's ack
    pub poll_interval: Duration,

    /// Poll rounds before the attempt gives up and cleans up its proposal
    pub max_polls: u32,

    /// Consistency level for all lock row operations
    ///
    /// Locks coordinate across regions, so the default is stronger than the
    /// MVCC read/write defaults.
    pub consistency: ConsistencyLevel,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            max_polls: 25,
            consistency: ConsistencyLevel::Quorum,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_chain() {
        let config = StoreConfig::new()
            .read_consistency(ConsistencyLevel::One)
            .compaction_batch_size(8)
            .cleanup_stale_versions(false)
            .lock_max_polls(3);

        assert_eq!(config.read_consistency, ConsistencyLevel::One);
        assert_eq!(config.write_consistency, ConsistencyLevel::LocalQuorum);
        assert_eq!(config.compaction.batch_size, 8);
        assert!(!config.cleanup.enabled);
        assert_eq!(config.lock.max_polls, 3);
    }

    #[test]
    fn test_defaults() {
        let config = StoreConfig::default();
        assert!(config.cleanup.enabled);
        assert_eq!(config.lock.consistency, ConsistencyLevel::Quorum);
        assert!(config.compaction.batch_size > 0);
    }
}
