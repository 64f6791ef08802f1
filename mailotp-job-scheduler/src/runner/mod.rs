use futures::future;
use std::time::{Duration, Instant, SystemTime};
use tokio::time;

use crate::jobs::Job;

struct JobContainer {
    job: Box<dyn Job>,
    run_frequency: Duration,
    last_run_time: Option<SystemTime>,
}

pub struct JobRunner {
    jobs: Vec<JobContainer>,
    update_frequency: Duration,
}

impl JobRunner {
    pub fn new(update_frequency: Duration) -> Self {
        Self {
            jobs: Vec::new(),
            update_frequency,
        }
    }

    /// Registers a job. A newly registered job runs on the first tick and then every
    /// `run_frequency`.
    pub fn register(&mut self, job: Box<dyn Job>, run_frequency: Duration) {
        log::info!(
            "Registered job \"{}\" to run every {} seconds",
            job.name(),
            run_frequency.as_secs()
        );

        self.jobs.push(JobContainer {
            job,
            run_frequency,
            last_run_time: None,
        });
    }

    pub async fn start(&mut self) -> ! {
        loop {
            let before = Instant::now();

            self.run_pending().await;

            let delta = before.elapsed();
            if delta < self.update_frequency {
                time::sleep(self.update_frequency - delta).await;
            }
        }
    }

    /// Runs every job that is due and ready, concurrently. Returns how many jobs ran.
    pub async fn run_pending(&mut self) -> usize {
        let now = SystemTime::now();

        let mut job_names = Vec::with_capacity(self.jobs.len());
        let mut job_futures = Vec::with_capacity(self.jobs.len());

        for job_container in &mut self.jobs {
            let is_time_to_run = match job_container.last_run_time {
                Some(last_run_time) => {
                    now.duration_since(last_run_time)
                        .unwrap_or(Duration::from_nanos(0))
                        >= job_container.run_frequency
                }
                None => true,
            };

            let job = &mut job_container.job;

            if is_time_to_run && job.is_ready() {
                let name_ref = job.name();
                log::info!("Executing job \"{}\"", name_ref);

                job_container.last_run_time = Some(now);
                job_names.push(name_ref);
                job_futures.push(job.execute());
            }
        }

        let job_results = future::join_all(job_futures).await;
        let run_count = job_results.len();

        for (i, result) in job_results.into_iter().enumerate() {
            if let Err(e) = result {
                log::error!("Job \"{}\" failed: {}", job_names[i], e);
            } else {
                log::info!("Job \"{}\" finished successfully", job_names[i]);
            }
        }

        run_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use crate::jobs::tests::MockJob;

    #[test]
    fn test_register() {
        let mut job_runner = JobRunner::new(Duration::from_micros(200));
        assert_eq!(job_runner.update_frequency, Duration::from_micros(200));
        assert!(job_runner.jobs.is_empty());

        job_runner.register(Box::new(MockJob::new()), Duration::from_millis(1));
        assert_eq!(job_runner.jobs.len(), 1);

        job_runner.register(Box::new(MockJob::new()), Duration::from_millis(3));
        assert_eq!(job_runner.jobs.len(), 2);
    }

    #[tokio::test]
    async fn test_run_pending_respects_frequency() {
        let mut job_runner = JobRunner::new(Duration::from_millis(1));

        let frequent = MockJob::new();
        let rare = MockJob::new();
        let frequent_runs = Arc::clone(&frequent.runs);
        let rare_runs = Arc::clone(&rare.runs);

        job_runner.register(Box::new(frequent), Duration::from_millis(0));
        job_runner.register(Box::new(rare), Duration::from_secs(3600));

        assert_eq!(job_runner.run_pending().await, 2);
        assert_eq!(*frequent_runs.lock().unwrap(), 1);
        assert_eq!(*rare_runs.lock().unwrap(), 1);

        assert_eq!(job_runner.run_pending().await, 1);
        assert_eq!(*frequent_runs.lock().unwrap(), 2);
        assert_eq!(*rare_runs.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_failing_job_does_not_stop_others() {
        let mut job_runner = JobRunner::new(Duration::from_millis(1));

        let failing = MockJob::failing();
        let healthy = MockJob::new();
        let failing_runs = Arc::clone(&failing.runs);
        let healthy_runs = Arc::clone(&healthy.runs);

        job_runner.register(Box::new(failing), Duration::from_millis(0));
        job_runner.register(Box::new(healthy), Duration::from_millis(0));

        job_runner.run_pending().await;
        job_runner.run_pending().await;

        assert_eq!(*failing_runs.lock().unwrap(), 2);
        assert_eq!(*healthy_runs.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_start() {
        let mut job_runner = JobRunner::new(Duration::from_millis(5));
        let job = MockJob::new();
        let job_run_count = Arc::clone(&job.runs);

        job_runner.register(Box::new(job), Duration::from_millis(0));

        tokio::task::spawn(async move { job_runner.start().await });

        time::sleep(Duration::from_millis(100)).await;
        assert!(*job_run_count.lock().unwrap() >= 2);
    }
}
