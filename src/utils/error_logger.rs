// src/utils/error_logger.rs
use std::collections::VecDeque;

use log::error;

// Maximum number of errors to keep in history
pub const MAX_ERROR_HISTORY: usize = 100;

/// Bounded history of pipeline failures. Every entry is also sent to the log.
#[derive(Debug, Clone)]
pub struct ErrorLog {
    entries: VecDeque<String>,
    capacity: usize,
}

impl Default for ErrorLog {
    fn default() -> Self {
        Self::with_capacity(MAX_ERROR_HISTORY)
    }
}

impl ErrorLog {
    pub fn with_capacity(capacity: usize) -> Self {
        ErrorLog {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn log_error(&mut self, module: &str, message: &str) {
        let error_message = format!("[{}] {}", module, message);
        error!("{}", error_message);

        if self.capacity == 0 {
            return;
        }
        // Remove oldest if at capacity
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(error_message);
    }

    pub fn get_error_history(&self) -> Vec<String> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_keeps_the_newest_entries() {
        let mut log = ErrorLog::with_capacity(2);
        log.log_error("Pipeline", "first");
        log.log_error("Pipeline", "second");
        log.log_error("Pipeline", "third");

        assert_eq!(
            log.get_error_history(),
            vec!["[Pipeline] second".to_string(), "[Pipeline] third".to_string()]
        );
    }

    #[test]
    fn zero_capacity_keeps_nothing() {
        let mut log = ErrorLog::with_capacity(0);
        log.log_error("Pipeline", "dropped");
        assert!(log.is_empty());
    }
}
