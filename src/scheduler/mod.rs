pub mod schedule;

pub use schedule::CronSchedule;

use crate::configuration::JobConfig;
use crate::pipeline::Pipeline;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Drive one job forever: sleep to the next fire, start a detached run, repeat.
///
/// Runs are not awaited, so a slow run never delays the next fire and
/// overlapping runs proceed concurrently.
pub fn spawn_job(pipeline: Arc<Pipeline>, job: JobConfig, tz: Tz) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut next = job.schedule.next_after(Utc::now(), tz);
        loop {
            let Some(at) = next else {
                error!(channel = %job.channel, schedule = %job.schedule, "Schedule never fires again, stopping job");
                return;
            };

            info!(channel = %job.channel, next_run = %at.with_timezone(&tz), "Next scheduled run");
            let wait = (at - Utc::now()).to_std().unwrap_or_default();
            tokio::time::sleep(wait).await;

            info!(channel = %job.channel, schedule = %job.schedule, "Running scheduled job");
            pipeline.spawn(job.channel);

            next = following(&job.schedule, at, Utc::now(), tz);
        }
    })
}

/// The fire after `fired`. Never `fired` itself, even when the timer woke a
/// little early; slots missed while the process was stalled are skipped.
fn following(schedule: &CronSchedule, fired: DateTime<Utc>, now: DateTime<Utc>, tz: Tz) -> Option<DateTime<Utc>> {
    schedule.next_after(fired.max(now), tz)
}

/// Start every configured job.
pub fn spawn_jobs(pipeline: Arc<Pipeline>, jobs: &[JobConfig], tz: Tz) -> Vec<JoinHandle<()>> {
    jobs.iter()
        .map(|job| spawn_job(Arc::clone(&pipeline), job.clone(), tz))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::configuration::Channel;
    use crate::notifications::PushDispatcher;
    use crate::traits::{MockPushSender, MockQuestionSource};
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn every_minute(channel: Channel) -> JobConfig {
        JobConfig {
            channel,
            schedule: "* * * * *".parse().unwrap(),
            trigger_paths: vec![],
        }
    }

    fn pipeline_with_failing_source(samples: Arc<AtomicUsize>) -> Arc<Pipeline> {
        let mut source = MockQuestionSource::new();
        source.expect_sample().returning(move || {
            samples.fetch_add(1, Ordering::SeqCst);
            Err(Error::transport("mongodb", "connection refused"))
        });
        let mut push = MockPushSender::new();
        push.expect_strategy().return_const("direct");
        push.expect_send().never();

        Arc::new(Pipeline::new(
            Arc::new(source),
            Some(PushDispatcher::new(Arc::new(push), None)),
            None,
            "Daily Development Question",
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_run_does_not_stop_the_next_fire() {
        let samples = Arc::new(AtomicUsize::new(0));
        let job = spawn_job(
            pipeline_with_failing_source(Arc::clone(&samples)),
            every_minute(Channel::Push),
            chrono_tz::Europe::London,
        );

        for _ in 0..600 {
            if samples.load(Ordering::SeqCst) >= 2 {
                break;
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }

        assert!(samples.load(Ordering::SeqCst) >= 2);
        assert!(!job.is_finished());
        job.abort();
    }

    #[test]
    fn test_early_wakeup_does_not_refire_the_same_slot() {
        let schedule: CronSchedule = "25 12 * * *".parse().unwrap();
        let fired = Utc.with_ymd_and_hms(2024, 1, 15, 12, 25, 0).unwrap();
        let early = fired - chrono::Duration::milliseconds(3);

        let next = following(&schedule, fired, early, chrono_tz::Europe::London);

        assert_eq!(next, Some(Utc.with_ymd_and_hms(2024, 1, 16, 12, 25, 0).unwrap()));
    }

    #[test]
    fn test_stalled_process_skips_missed_slots() {
        let schedule: CronSchedule = "25 12 * * *".parse().unwrap();
        let fired = Utc.with_ymd_and_hms(2024, 1, 15, 12, 25, 0).unwrap();
        let resumed = Utc.with_ymd_and_hms(2024, 1, 18, 9, 0, 0).unwrap();

        let next = following(&schedule, fired, resumed, chrono_tz::Europe::London);

        assert_eq!(next, Some(Utc.with_ymd_and_hms(2024, 1, 18, 12, 25, 0).unwrap()));
    }
}
