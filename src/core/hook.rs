//! Hook trait for forwarding log entries to external systems

use super::{error::Result, log_entry::LogEntry, log_level::LogLevel, LoggerError};
use std::collections::HashMap;
use std::sync::Arc;

/// A callback fired for every entry whose level it accepts
///
/// The logger asks `levels()` once, at registration, and only ever calls
/// `fire` with entries at one of those levels. `fire` takes `&self`: hooks
/// used from several threads keep any mutable state behind their own locks.
pub trait Hook: Send + Sync {
    fn name(&self) -> &str;
    fn levels(&self) -> Vec<LogLevel>;
    fn fire(&self, entry: &LogEntry) -> Result<()>;
}

impl<H: Hook + ?Sized> Hook for Arc<H> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn levels(&self) -> Vec<LogLevel> {
        (**self).levels()
    }

    fn fire(&self, entry: &LogEntry) -> Result<()> {
        (**self).fire(entry)
    }
}

/// Hooks indexed by the levels they accept
#[derive(Default)]
pub struct LevelHooks {
    by_level: HashMap<LogLevel, Vec<Arc<dyn Hook>>>,
    count: usize,
}

impl LevelHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a hook under each level it reports
    ///
    /// A level listed twice still fires the hook only once per entry.
    pub fn add(&mut self, hook: Arc<dyn Hook>) {
        let mut levels = hook.levels();
        levels.sort();
        levels.dedup();
        for level in levels {
            self.by_level
                .entry(level)
                .or_default()
                .push(Arc::clone(&hook));
        }
        self.count += 1;
    }

    /// Hooks registered for `level`, in registration order
    pub fn for_level(&self, level: LogLevel) -> &[Arc<dyn Hook>] {
        self.by_level.get(&level).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Fire every hook registered for the entry's level
    ///
    /// All hooks run even if an earlier one fails; failures come back
    /// wrapped in `LoggerError::Hook` with the failing hook's name.
    pub fn fire(&self, entry: &LogEntry) -> Vec<LoggerError> {
        self.for_level(entry.level)
            .iter()
            .filter_map(|hook| {
                hook.fire(entry).err().map(|e| match e {
                    LoggerError::Hook { .. } => e,
                    other => LoggerError::hook(hook.name(), other),
                })
            })
            .collect()
    }

    /// Number of registered hooks
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct RecordingHook {
        name: &'static str,
        levels: Vec<LogLevel>,
        seen: Mutex<Vec<String>>,
        fail: bool,
    }

    impl RecordingHook {
        fn new(name: &'static str, levels: Vec<LogLevel>, fail: bool) -> Arc<Self> {
            Arc::new(Self {
                name,
                levels,
                seen: Mutex::new(Vec::new()),
                fail,
            })
        }
    }

    impl Hook for RecordingHook {
        fn name(&self) -> &str {
            self.name
        }

        fn levels(&self) -> Vec<LogLevel> {
            self.levels.clone()
        }

        fn fire(&self, entry: &LogEntry) -> Result<()> {
            self.seen.lock().push(entry.message.clone());
            if self.fail {
                Err(LoggerError::other("boom"))
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn test_fires_only_matching_levels() {
        let errors_only = RecordingHook::new("errors", vec![LogLevel::Error], false);
        let mut hooks = LevelHooks::new();
        hooks.add(errors_only.clone());

        assert!(hooks.fire(&LogEntry::new(LogLevel::Info, "ignored")).is_empty());
        assert!(hooks.fire(&LogEntry::new(LogLevel::Error, "kept")).is_empty());

        assert_eq!(*errors_only.seen.lock(), vec!["kept".to_string()]);
    }

    #[test]
    fn test_duplicate_levels_fire_once() {
        let hook = RecordingHook::new("dup", vec![LogLevel::Warn, LogLevel::Warn], false);
        let mut hooks = LevelHooks::new();
        hooks.add(hook.clone());

        hooks.fire(&LogEntry::new(LogLevel::Warn, "once"));
        assert_eq!(hook.seen.lock().len(), 1);
        assert_eq!(hooks.len(), 1);
    }

    #[test]
    fn test_failure_does_not_stop_later_hooks() {
        let failing = RecordingHook::new("failing", vec![LogLevel::Info], true);
        let healthy = RecordingHook::new("healthy", vec![LogLevel::Info], false);
        let mut hooks = LevelHooks::new();
        hooks.add(failing);
        hooks.add(healthy.clone());

        let errors = hooks.fire(&LogEntry::new(LogLevel::Info, "hello"));

        assert_eq!(errors.len(), 1);
        assert!(matches!(&errors[0], LoggerError::Hook { hook, .. } if hook == "failing"));
        assert_eq!(healthy.seen.lock().len(), 1);
    }
}
