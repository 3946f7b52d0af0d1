use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use monitor_logging::{monitor_info, monitor_warn};
use scrape_core::{JobId, ScrapeForm, ScrapeRequest};

use crate::{ScrapeApi, SubmissionError};

/// Creates jobs, allowing at most one request in flight.
pub struct JobSubmitter {
    api: Arc<dyn ScrapeApi>,
    in_flight: AtomicBool,
}

struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl JobSubmitter {
    pub fn new(api: Arc<dyn ScrapeApi>) -> Self {
        Self {
            api,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Validates the form, then submits it. Invalid input sends nothing.
    pub async fn submit_form(&self, form: &ScrapeForm) -> Result<JobId, SubmissionError> {
        let request = form.validate()?;
        self.submit(&request).await
    }

    pub async fn submit(&self, request: &ScrapeRequest) -> Result<JobId, SubmissionError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(SubmissionError::InFlight);
        }
        let _guard = InFlightGuard(&self.in_flight);

        monitor_info!(
            "Submitting scrape of {} (max {} results)",
            request.url,
            request.max_results
        );
        match self.api.submit(request).await {
            Ok(job_id) => {
                monitor_info!("Created job {}", job_id);
                Ok(job_id)
            }
            Err(err) => {
                monitor_warn!("Submission failed: {}", err);
                Err(SubmissionError::Request(err))
            }
        }
    }
}
