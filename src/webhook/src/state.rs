use mutate_nodeselector::{AdmissionMetrics, Handler, ScopeLookup, VERSION};
use std::sync::Arc;
use std::time::Instant;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Admission decision handler
    pub handler: Handler,

    /// Server start time for uptime calculation
    pub start_time: Instant,

    /// Application version
    pub version: String,
}

impl AppState {
    pub fn new(handler: Handler) -> Self {
        Self {
            handler,
            start_time: Instant::now(),
            version: VERSION.to_string(),
        }
    }

    /// Build state around a namespace lookup with a fresh metrics registry
    pub fn with_lookup(lookup: Arc<dyn ScopeLookup>) -> prometheus::Result<Self> {
        let metrics = Arc::new(AdmissionMetrics::new()?);
        Ok(Self::new(Handler::new(lookup, metrics)))
    }

    pub fn metrics(&self) -> &Arc<AdmissionMetrics> {
        self.handler.metrics()
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mutate_nodeselector::InMemoryScopeLookup;

    #[test]
    fn test_state_reports_library_version() {
        let state = AppState::with_lookup(Arc::new(InMemoryScopeLookup::new())).unwrap();
        assert_eq!(state.version, VERSION);
        assert_eq!(state.metrics().outcome_count(mutate_nodeselector::Outcome::Allowed), 0);
    }
}
