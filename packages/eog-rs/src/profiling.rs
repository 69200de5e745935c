use std::time::{Duration, Instant};

/// Wall-clock timer for one pipeline stage, reported at debug level on drop
pub struct ProfileScope {
    label: String,
    start: Instant,
}

impl ProfileScope {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for ProfileScope {
    fn drop(&mut self) {
        log::debug!(
            "[PROFILE] {} - {:.3}ms",
            self.label,
            self.elapsed().as_secs_f64() * 1000.0
        );
    }
}

/// Macro for easy profiling
#[macro_export]
macro_rules! profile_scope {
    ($label:expr) => {
        let _profile_scope = $crate::profiling::ProfileScope::new($label);
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_measures_time() {
        let scope = ProfileScope::new("stage");
        std::thread::sleep(Duration::from_millis(2));
        assert!(scope.elapsed() >= Duration::from_millis(2));
    }

    #[test]
    fn test_macro_expands_in_function_body() {
        fn stage() -> u32 {
            profile_scope!("stage");
            7
        }
        assert_eq!(stage(), 7);
    }
}
