use std::{sync::Arc, time::Duration as StdDuration};

use chrono::{DateTime, Duration, Utc};
use futures::{Stream, stream};
use tokio_util::sync::CancellationToken;

use crate::utils::clock::Clock;

pub const TICK_INTERVAL: StdDuration = StdDuration::from_secs(1);

/// Produces the time elapsed since `start`, once right away and then once per [TICK_INTERVAL].
/// The stream ends as soon as `shutdown` is cancelled.
pub fn elapsed_ticks(
    start: DateTime<Utc>,
    clock: Arc<dyn Clock>,
    shutdown: CancellationToken,
) -> impl Stream<Item = Duration> {
    let first_tick = clock.instant();
    stream::unfold((first_tick, true), move |(tick, first)| {
        let clock = clock.clone();
        let shutdown = shutdown.clone();
        async move {
            if shutdown.is_cancelled() {
                return None;
            }
            if !first {
                tokio::select! {
                    _ = shutdown.cancelled() => return None,
                    _ = clock.sleep_until(tick) => (),
                }
            }
            let elapsed = (clock.time() - start).max(Duration::zero());
            Some((elapsed, (tick + TICK_INTERVAL, false)))
        }
    })
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration as StdDuration};

    use chrono::{Duration, TimeZone, Utc};
    use futures::StreamExt;
    use tokio_util::sync::CancellationToken;

    use crate::utils::{clock::TestClock, logging::TEST_LOGGING};

    use super::elapsed_ticks;

    #[tokio::test(start_paused = true)]
    async fn ticks_every_second() {
        *TEST_LOGGING;
        let start = Utc.with_ymd_and_hms(2024, 4, 5, 9, 0, 0).unwrap();
        let clock = TestClock::starting_at(start + Duration::seconds(10));

        let ticks = elapsed_ticks(start, Arc::new(clock), CancellationToken::new())
            .take(3)
            .collect::<Vec<_>>()
            .await;

        assert_eq!(
            ticks,
            vec![
                Duration::seconds(10),
                Duration::seconds(11),
                Duration::seconds(12)
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn stops_on_cancel() {
        let start = Utc.with_ymd_and_hms(2024, 4, 5, 9, 0, 0).unwrap();
        let clock = TestClock::starting_at(start);
        let shutdown = CancellationToken::new();

        let ticks = elapsed_ticks(start, Arc::new(clock), shutdown.clone());
        let canceller = async {
            tokio::time::sleep(StdDuration::from_millis(2500)).await;
            shutdown.cancel();
        };
        let (collected, _) = tokio::join!(ticks.collect::<Vec<_>>(), canceller);

        assert_eq!(
            collected,
            vec![Duration::zero(), Duration::seconds(1), Duration::seconds(2)]
        );
    }

    #[tokio::test]
    async fn cancelled_token_yields_nothing() {
        let shutdown = CancellationToken::new();
        shutdown.cancel();
        let ticks = elapsed_ticks(
            Utc::now(),
            Arc::new(crate::utils::clock::DefaultClock),
            shutdown,
        )
        .collect::<Vec<_>>()
        .await;
        assert!(ticks.is_empty());
    }
}
