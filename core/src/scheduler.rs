// ABOUTME: Cron-driven background task that periodically refreshes the authorization directory
// ABOUTME: A single loop runs refreshes back to back, so a slow refresh delays the next tick instead of overlapping it

use crate::config::AuthorizationConfig;
use crate::directory::AuthorizationDirectory;
use chrono::{DateTime, Utc};
use cron::Schedule;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error("Invalid cron expression '{expression}': {reason}")]
    InvalidCron { expression: String, reason: String },
}

/// Parsed refresh schedule.
///
/// Accepts standard five-field cron (`min hour dom mon dow`), the six-field
/// form with a leading seconds column, and `@hourly`-style shorthands.
#[derive(Debug, Clone)]
pub struct RefreshSchedule {
    expression: String,
    schedule: Schedule,
}

impl RefreshSchedule {
    pub fn parse(expression: &str) -> Result<Self, ScheduleError> {
        let trimmed = expression.trim();
        let normalized = if trimmed.split_whitespace().count() == 5 {
            format!("0 {}", trimmed)
        } else {
            trimmed.to_string()
        };

        let schedule = Schedule::from_str(&normalized).map_err(|e| ScheduleError::InvalidCron {
            expression: expression.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            expression: expression.to_string(),
            schedule,
        })
    }

    /// Schedule for the refresh task, or `None` when NIP-05 is disabled and no
    /// task runs. The cron expression is only validated when it will be used.
    pub fn from_config(config: &AuthorizationConfig) -> Result<Option<Self>, ScheduleError> {
        if !config.use_nip05 {
            return Ok(None);
        }
        Self::parse(&config.nip05_cron).map(Some)
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Next fire time strictly after `after`.
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule.after(&after).next()
    }

    /// How long to sleep from `now` until the next fire time.
    pub fn delay_from(&self, now: DateTime<Utc>) -> Option<Duration> {
        let next = self.next_after(now)?;
        Some((next - now).to_std().unwrap_or(Duration::ZERO))
    }
}

/// Spawn the refresh loop. It stops when `cancel` fires or the schedule has
/// no further fire times.
pub fn spawn_refresh_task(
    directory: Arc<AuthorizationDirectory>,
    schedule: RefreshSchedule,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tracing::info!(cron = %schedule.expression(), "Directory refresh task started");

        loop {
            let Some(delay) = schedule.delay_from(Utc::now()) else {
                tracing::warn!(cron = %schedule.expression(), "Schedule has no upcoming runs, stopping refresh task");
                break;
            };

            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!("Directory refresh task shutting down");
                    break;
                }
                _ = tokio::time::sleep(delay) => {}
            }

            let report = directory.refresh().await;
            if report.failures.is_empty() {
                tracing::debug!(added = report.added(), "Directory refresh complete");
            } else {
                tracing::warn!(
                    added = report.added(),
                    failures = report.failures.len(),
                    "Directory refresh completed with unresolved entries"
                );
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::IdentityError;
    use crate::traits::NameResolver;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_parse_six_field() {
        let schedule = RefreshSchedule::parse("0 */5 * * * *").unwrap();
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 1, 30).unwrap();
        assert_eq!(
            schedule.next_after(now),
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 12, 5, 0).unwrap())
        );
    }

    #[test]
    fn test_parse_five_field_adds_seconds() {
        let schedule = RefreshSchedule::parse("*/10 * * * *").unwrap();
        assert_eq!(schedule.expression(), "*/10 * * * *");
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 1, 30).unwrap();
        assert_eq!(
            schedule.next_after(now),
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 12, 10, 0).unwrap())
        );
    }

    #[test]
    fn test_parse_shorthand() {
        let schedule = RefreshSchedule::parse("@hourly").unwrap();
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 1, 30).unwrap();
        assert_eq!(
            schedule.next_after(now),
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 13, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_parse_invalid() {
        assert!(RefreshSchedule::parse("every five minutes").is_err());
        assert!(RefreshSchedule::parse("").is_err());
    }

    #[test]
    fn test_from_config_ignores_cron_when_nip05_disabled() {
        let mut config = AuthorizationConfig {
            use_nip05: false,
            nip05_cron: "not a cron".to_string(),
            ..AuthorizationConfig::default()
        };
        assert!(RefreshSchedule::from_config(&config).unwrap().is_none());

        config.use_nip05 = true;
        assert!(RefreshSchedule::from_config(&config).is_err());

        config.nip05_cron = "*/10 * * * *".to_string();
        let schedule = RefreshSchedule::from_config(&config).unwrap().unwrap();
        assert_eq!(schedule.expression(), "*/10 * * * *");
    }

    #[test]
    fn test_delay_from() {
        let schedule = RefreshSchedule::parse("0 */5 * * * *").unwrap();
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 4, 50).unwrap();
        assert_eq!(schedule.delay_from(now), Some(Duration::from_secs(10)));
    }

    struct CountingResolver {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl NameResolver for CountingResolver {
        async fn resolve(&self, _username: &str) -> Result<String, IdentityError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok("29ff06c4786b8b1542343fd01dd7cea09409c87aca1f9fe46100b71df12b04cc".to_string())
        }
    }

    #[tokio::test]
    async fn test_task_refreshes_until_cancelled() {
        let resolver = Arc::new(CountingResolver {
            calls: AtomicUsize::new(0),
        });
        let config = AuthorizationConfig {
            allowed_users: vec!["bob@example.com".to_string()],
            use_nip05: true,
            ..AuthorizationConfig::default()
        };
        let directory = Arc::new(AuthorizationDirectory::new(&config, resolver.clone()));
        let cancel = CancellationToken::new();

        let handle = spawn_refresh_task(
            directory.clone(),
            RefreshSchedule::parse("* * * * * *").unwrap(),
            cancel.clone(),
        );

        // Every-second schedule: expect a refresh within a few seconds
        tokio::time::timeout(Duration::from_secs(5), async {
            while resolver.calls.load(Ordering::SeqCst) == 0 {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        })
        .await
        .expect("refresh task never ran");

        assert!(directory.is_authorized(
            "29ff06c4786b8b1542343fd01dd7cea09409c87aca1f9fe46100b71df12b04cc"
        ));

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("refresh task did not stop")
            .unwrap();
    }
}
