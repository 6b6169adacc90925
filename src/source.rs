//! Reading sources
//!
//! A source pushes `Option<T>` readings into the channel a
//! [`Widget`](camoverlay_overlay::Widget) drains. `None` means the device
//! has no data and the scene shows its placeholder. A source stops when its
//! input ends or when the widget side of the channel is dropped.

use std::time::Duration;

use serde::de::DeserializeOwned;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use crate::scenes::{AirQualityReading, FlowReading, ScaleReading};

/// Forward newline-delimited JSON readings from `input`.
///
/// Each line holds one reading object, or `null` for "no data". Blank lines
/// are ignored and malformed lines are logged and skipped.
pub async fn read_ndjson<T, R>(input: R, tx: mpsc::Sender<Option<T>>) -> std::io::Result<()>
where
    T: DeserializeOwned,
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(input).lines();
    let mut line_number = 0u64;

    while let Some(line) = lines.next_line().await? {
        line_number += 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let reading = match serde_json::from_str::<Option<T>>(line) {
            Ok(reading) => reading,
            Err(e) => {
                tracing::warn!(line_number, error = %e, "Skipping malformed reading");
                continue;
            }
        };

        if tx.send(reading).await.is_err() {
            tracing::debug!("Reading channel closed, stopping input");
            break;
        }
    }

    tracing::info!(lines = line_number, "Reading input finished");
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Demo generator
// ─────────────────────────────────────────────────────────────────────────────

/// Every this many ticks the demo device drops out for one sample
const DROPOUT_EVERY: u64 = 20;

/// Synthetic readings for previewing a scene without hardware
pub trait DemoReading: Sized {
    /// Reading for the given tick, `None` during a simulated dropout
    fn demo(tick: u64) -> Option<Self>;
}

fn dropout(tick: u64) -> bool {
    tick % DROPOUT_EVERY == DROPOUT_EVERY - 1
}

fn wave(tick: u64, period: f64) -> f64 {
    (tick as f64 * std::f64::consts::TAU / period).sin()
}

impl DemoReading for FlowReading {
    fn demo(tick: u64) -> Option<Self> {
        if dropout(tick) {
            return None;
        }
        let rate = 6.0 + 2.0 * wave(tick, 30.0);
        Some(FlowReading {
            litres: tick as f64 * 0.6,
            rate_lpm: Some(rate),
        })
    }
}

impl DemoReading for ScaleReading {
    fn demo(tick: u64) -> Option<Self> {
        if dropout(tick) {
            return None;
        }
        Some(ScaleReading {
            value: 12.5 + 0.25 * wave(tick, 12.0),
            unit: "kg".to_string(),
            decimals: 2,
            stable: tick % 4 != 0,
        })
    }
}

impl DemoReading for AirQualityReading {
    fn demo(tick: u64) -> Option<Self> {
        if dropout(tick) {
            return None;
        }
        let aqi = (90.0 + 80.0 * wave(tick, 60.0)).max(0.0) as u32;
        Some(AirQualityReading {
            aqi,
            pm25: f64::from(aqi) * 0.3,
            pm10: f64::from(aqi) * 0.5,
            co2_ppm: Some(420.0 + 30.0 * wave(tick, 45.0)),
            temperature_c: Some(21.5 + wave(tick, 90.0)),
            humidity_pct: Some(45.0 + 5.0 * wave(tick, 75.0)),
        })
    }
}

/// Emit a synthetic reading every `period` until the receiver goes away
pub async fn run_demo<T: DemoReading>(period: Duration, tx: mpsc::Sender<Option<T>>) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut tick = 0u64;
    loop {
        ticker.tick().await;
        if tx.send(T::demo(tick)).await.is_err() {
            break;
        }
        tick += 1;
    }
    tracing::debug!(ticks = tick, "Demo source stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ndjson_forwards_readings_and_nulls() {
        let input: &[u8] = b"{\"litres\": 1.5}\n\nnull\n{\"litres\": 2.0, \"rate_lpm\": 3.0}\n";
        let (tx, mut rx) = mpsc::channel(8);

        read_ndjson::<FlowReading, _>(input, tx).await.unwrap();

        let first = rx.recv().await.unwrap().unwrap();
        assert_eq!(first.litres, 1.5);
        assert_eq!(rx.recv().await.unwrap(), None);
        let third = rx.recv().await.unwrap().unwrap();
        assert_eq!(third.rate_lpm, Some(3.0));
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn ndjson_skips_malformed_lines() {
        let input: &[u8] = b"not json\n{\"value\": \"heavy\"}\n{\"value\": 4.0}\n";
        let (tx, mut rx) = mpsc::channel(8);

        read_ndjson::<ScaleReading, _>(input, tx).await.unwrap();

        let reading = rx.recv().await.unwrap().unwrap();
        assert_eq!(reading.value, 4.0);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn ndjson_stops_when_receiver_is_gone() {
        let input: &[u8] = b"null\nnull\nnull\n";
        let (tx, rx) = mpsc::channel::<Option<FlowReading>>(1);
        drop(rx);

        read_ndjson(input, tx).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn demo_ticks_on_the_period_and_stops() {
        let (tx, mut rx) = mpsc::channel(4);
        let handle = tokio::spawn(run_demo::<ScaleReading>(Duration::from_millis(500), tx));

        let start = tokio::time::Instant::now();
        for _ in 0..3 {
            assert!(rx.recv().await.unwrap().is_some());
        }
        assert_eq!(start.elapsed(), Duration::from_millis(1000));

        drop(rx);
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[test]
    fn demo_drops_out_periodically() {
        assert!(FlowReading::demo(0).is_some());
        assert!(FlowReading::demo(DROPOUT_EVERY - 1).is_none());
        assert!(AirQualityReading::demo(DROPOUT_EVERY * 2 - 1).is_none());
    }

    #[test]
    fn demo_flow_volume_only_grows() {
        let volumes: Vec<f64> = (0..10)
            .filter_map(FlowReading::demo)
            .map(|reading| reading.litres)
            .collect();
        assert!(volumes.windows(2).all(|pair| pair[0] <= pair[1]));
    }
}
