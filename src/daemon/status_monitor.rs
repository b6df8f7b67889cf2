// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-force-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Status word monitor
//!
//! Polls the read direction of the link and forwards recognized signals to
//! the logging supervisor. Dropping the channel sender on exit wakes the
//! supervisor loop.

use log::{debug, error, info, warn};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use super::RunState;
use crate::error::BridgeError;
use crate::plc::{StatusReceiver, StatusSignal};

/// Counters of a finished monitor loop
#[derive(Debug, Default)]
pub struct MonitorReport {
    pub signals_forwarded: u64,
    pub unknown_words: u64,
    /// Error that ended the loop, if it did not end on shutdown
    pub failure: Option<BridgeError>,
}

/// Run the monitor loop until shutdown, a hard link failure or the
/// supervisor going away
pub async fn run_status_monitor(
    receiver: StatusReceiver,
    signals: mpsc::Sender<StatusSignal>,
    poll_interval: Duration,
    run_state: RunState,
) -> MonitorReport {
    info!("Status monitor started, period {:?}", poll_interval);
    let mut report = MonitorReport::default();
    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    while run_state.is_running() {
        tokio::select! {
            biased;
            _ = run_state.stopped() => break,
            _ = ticker.tick() => {}
        }

        let status = tokio::select! {
            biased;
            _ = run_state.stopped() => break,
            status = receiver.recv_status() => status,
        };

        let signal = match status {
            Ok(StatusSignal::Unknown) => {
                report.unknown_words += 1;
                continue;
            }
            Ok(signal) => signal,
            Err(e) if e.is_fatal() => {
                error!("Status link failed: {}", e);
                run_state.request_shutdown("status link failed");
                report.failure = Some(e);
                break;
            }
            Err(e) => {
                warn!("Status read error: {}", e);
                continue;
            }
        };

        debug!("Status signal received: {:?}", signal);
        let forwarded = tokio::select! {
            biased;
            _ = run_state.stopped() => break,
            forwarded = signals.send(signal) => forwarded,
        };
        if forwarded.is_err() {
            debug!("Logging supervisor gone, status monitor exiting");
            break;
        }
        report.signals_forwarded += 1;
    }

    info!(
        "Status monitor stopped after {} signals ({} ignored words)",
        report.signals_forwarded, report.unknown_words
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plc::ControlLink;
    use tokio::io::AsyncWriteExt;
    use tokio::net::{TcpListener, TcpStream};

    async fn link_pair() -> (ControlLink, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let (link, accepted) = tokio::join!(
            ControlLink::connect(&addr, Duration::from_secs(2), None),
            listener.accept()
        );
        (link.unwrap(), accepted.unwrap().0)
    }

    #[tokio::test]
    async fn test_forwards_recognized_signals_only() {
        let (link, mut plc) = link_pair().await;
        let run_state = RunState::new();
        let (tx, mut rx) = mpsc::channel(8);
        let task = tokio::spawn(run_status_monitor(
            link.status_receiver(),
            tx,
            Duration::from_millis(1),
            run_state.clone(),
        ));

        plc.write_all(&[0x01, 0x00]).await.unwrap();
        assert_eq!(rx.recv().await, Some(StatusSignal::Active));
        plc.write_all(&[0x42, 0x42]).await.unwrap();
        plc.write_all(&[0x00, 0x00]).await.unwrap();
        assert_eq!(rx.recv().await, Some(StatusSignal::Inactive));

        run_state.request_shutdown("test");
        let report = tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("monitor must stop on shutdown")
            .unwrap();
        assert_eq!(report.signals_forwarded, 2);
        assert!(report.unknown_words >= 1);
        assert!(report.failure.is_none());
        // Channel sender dropped with the task
        assert_eq!(rx.recv().await, None);
        link.close().await;
    }

    #[tokio::test]
    async fn test_blocked_read_observes_shutdown() {
        let (link, _plc) = link_pair().await;
        let run_state = RunState::new();
        let (tx, _rx) = mpsc::channel(8);
        let task = tokio::spawn(run_status_monitor(
            link.status_receiver(),
            tx,
            Duration::from_millis(10),
            run_state.clone(),
        ));
        tokio::time::sleep(Duration::from_millis(30)).await;

        run_state.request_shutdown("test");
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("blocked read must not delay shutdown")
            .unwrap();
        link.close().await;
    }

    #[tokio::test]
    async fn test_closed_link_is_fatal() {
        let (link, _plc) = link_pair().await;
        let run_state = RunState::new();
        let (tx, _rx) = mpsc::channel(8);
        let receiver = link.status_receiver();
        link.close().await;

        let report =
            run_status_monitor(receiver, tx, Duration::from_millis(1), run_state.clone()).await;
        assert!(matches!(report.failure, Some(BridgeError::LinkClosed)));
        assert!(!run_state.is_running());
    }
}
