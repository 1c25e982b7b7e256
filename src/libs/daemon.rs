//! Native-messaging host run loop for the `watch` command.
//!
//! stdin carries inbound frames from the extension shim, stdout carries
//! responses and badge updates back. Everything else (logs, user messages)
//! goes to stderr through `tracing`.
//!
//! The engine itself runs on this task; helper tasks only move bytes:
//!
//! - a reader task decodes stdin frames into [`Inbound`] values
//! - a writer task encodes [`Outbound`] values onto stdout
//! - a signal task turns SIGTERM/SIGINT (Ctrl+C on Windows) into a shutdown
//!
//! Shutdown, from a signal or from the browser closing the port, always
//! flushes and persists the live day first.

use crate::api::ScreenTimeClient;
use crate::libs::clock::{Clock, SystemClock};
use crate::libs::config::Config;
use crate::libs::connectivity::{Connectivity, HttpProbe};
use crate::libs::data_storage::DataStorage;
use crate::libs::engine::Tracker;
use crate::libs::messages::macros::route_to_tracing;
use crate::libs::messages::Message;
use crate::libs::notify::{ChannelNotifier, Notifier, Signal};
use crate::libs::persistence::PersistenceLayer;
use crate::libs::protocol::{decode_inbound, read_frame, reject_request, write_frame, Inbound, Outbound};
use crate::api::ScreenTimeApi;
use crate::{msg_error, msg_info, msg_warning};
use anyhow::Result;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval, interval_at, sleep_until, Instant, Interval, MissedTickBehavior};

const TICK_PERIOD: Duration = Duration::from_secs(1);
/// Lower bound between two proactive refresh attempts.
const MIN_REFRESH_DELAY: Duration = Duration::from_secs(5);
/// Far-off expiries are re-checked at least this often.
const MAX_REFRESH_DELAY: Duration = Duration::from_secs(3600);

/// Runs the native host until the browser disconnects or a signal arrives.
pub async fn run_with_signal_handling() -> Result<()> {
    route_to_tracing();

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    spawn_signal_handler(shutdown_tx);

    let config = Config::read()?;
    let store = PersistenceLayer::open_default()?;
    let api = ScreenTimeClient::new(&config.server(), &config.tracker());
    let probe = HttpProbe::new(&config.server().api_url, Duration::from_secs(config.tracker().connectivity_poll_secs.max(1)));

    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
    let reader = tokio::spawn(read_inbound(inbound_tx, outbound_tx.clone()));
    let writer = tokio::spawn(write_outbound(outbound_rx));

    let data_dir = DataStorage::new().get_path("")?;
    msg_info!(Message::WatcherStarted(data_dir.display().to_string()));

    let tracker = Tracker::new(api, SystemClock, ChannelNotifier::new(outbound_tx.clone()), store, &config);
    let result = run_engine(tracker, probe, inbound_rx, outbound_tx, shutdown_rx).await;

    reader.abort();
    match writer.await {
        Ok(()) => {}
        Err(e) => msg_error!(Message::EngineTaskPanicked(e.to_string())),
    }

    match result {
        Ok(()) => msg_info!(Message::EngineExitedNormally),
        Err(e) => msg_error!(Message::EngineError(e.to_string())),
    }
    Ok(())
}

/// Drives the engine: inbound frames, the dwell ticker, sync/pull cadences,
/// connectivity polling and the proactive token refresh.
pub async fn run_engine<A, C, N, P>(
    mut tracker: Tracker<A, C, N>,
    probe: P,
    mut inbound_rx: mpsc::UnboundedReceiver<Inbound>,
    outbound_tx: mpsc::UnboundedSender<Outbound>,
    mut shutdown_rx: oneshot::Receiver<()>,
) -> Result<()>
where
    A: ScreenTimeApi,
    C: Clock,
    N: Notifier,
    P: Connectivity,
{
    let settings = tracker.config().clone();
    tracker.initialize().await;

    let mut sync = cadence(settings.sync_interval_secs);
    let mut pull = cadence(settings.pull_interval_secs);
    let mut connectivity = interval(Duration::from_secs(settings.connectivity_poll_secs.max(1)));
    connectivity.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut ticker: Option<Interval> = None;
    // One timer for the proactive refresh, re-armed only when the due time moves.
    let refresh = sleep_until(Instant::now());
    tokio::pin!(refresh);
    let mut refresh_armed_for: Option<DateTime<Utc>> = None;

    loop {
        // The dwell timer only exists while tracking.
        match (tracker.wants_ticks(), ticker.is_some()) {
            (true, false) => ticker = Some(cadence_from(TICK_PERIOD)),
            (false, true) => ticker = None,
            _ => {}
        }
        let refresh_due = tracker.refresh_due_at();
        if refresh_due != refresh_armed_for {
            refresh_armed_for = refresh_due;
            if let Some(delay) = tracker.next_refresh_in() {
                refresh.as_mut().reset(Instant::now() + delay.min(MAX_REFRESH_DELAY));
            }
        }

        tokio::select! {
            frame = inbound_rx.recv() => match frame {
                Some(frame) => dispatch(&mut tracker, frame, &outbound_tx).await,
                None => {
                    msg_info!(Message::HostDisconnected);
                    tracker.suspend();
                    break;
                }
            },
            _ = next_tick(&mut ticker) => {
                tracker.tick();
            }
            _ = sync.tick() => {
                tracker.push().await;
            }
            _ = pull.tick() => {
                tracker.pull().await;
            }
            _ = connectivity.tick() => {
                let online = probe.is_online().await;
                tracker.set_online(online).await;
            }
            _ = &mut refresh, if refresh_armed_for.is_some() => {
                tracker.refresh_if_due().await;
                // a failed or premature attempt retries after the floor delay
                let delay = tracker.next_refresh_in().unwrap_or(MAX_REFRESH_DELAY);
                refresh.as_mut().reset(Instant::now() + delay.clamp(MIN_REFRESH_DELAY, MAX_REFRESH_DELAY));
                refresh_armed_for = tracker.refresh_due_at();
            }
            _ = &mut shutdown_rx => {
                msg_info!(Message::EngineShuttingDown);
                tracker.suspend();
                break;
            }
        }
    }
    Ok(())
}

async fn dispatch<A: ScreenTimeApi, C: Clock, N: Notifier>(
    tracker: &mut Tracker<A, C, N>,
    frame: Inbound,
    outbound_tx: &mpsc::UnboundedSender<Outbound>,
) {
    match frame {
        Inbound::Event { event } => tracker.handle_event(event),
        Inbound::Request { id, request } => {
            let body = tracker.handle_request(request).await;
            if outbound_tx.send(Outbound::Response { id, body }).is_err() {
                tracing::debug!("response dropped, host writer is gone");
            }
        }
        Inbound::Startup => {
            tracker.announce(Signal::Started);
            tracker.initialize().await;
        }
        Inbound::Installed => {
            tracker.announce(Signal::Ready);
            tracker.initialize().await;
        }
        Inbound::Suspend => tracker.suspend(),
        Inbound::SuspendCanceled => tracker.suspend_canceled(),
    }
}

async fn read_inbound(inbound_tx: mpsc::UnboundedSender<Inbound>, outbound_tx: mpsc::UnboundedSender<Outbound>) {
    let mut stdin = tokio::io::stdin();
    loop {
        let payload = match read_frame(&mut stdin).await {
            Ok(Some(payload)) => payload,
            Ok(None) => break,
            Err(e) if e.is_recoverable() => {
                msg_warning!(Message::MalformedFrame(e.to_string()));
                continue;
            }
            Err(e) => {
                msg_error!(Message::EngineError(e.to_string()));
                break;
            }
        };
        match decode_inbound(&payload) {
            Ok(frame) => {
                if inbound_tx.send(frame).is_err() {
                    break;
                }
            }
            Err(e) => {
                msg_warning!(Message::MalformedFrame(e.to_string()));
                if let Some(reply) = reject_request(&payload, &e) {
                    let _ = outbound_tx.send(reply);
                }
            }
        }
    }
}

async fn write_outbound(mut outbound_rx: mpsc::UnboundedReceiver<Outbound>) {
    let mut stdout = tokio::io::stdout();
    while let Some(frame) = outbound_rx.recv().await {
        if let Err(e) = write_frame(&mut stdout, &frame).await {
            msg_error!(Message::EngineError(e.to_string()));
            if !e.is_recoverable() {
                break;
            }
        }
    }
}

fn spawn_signal_handler(shutdown_tx: oneshot::Sender<()>) {
    #[cfg(unix)]
    {
        tokio::spawn(async move {
            use tokio::signal::unix::{signal, SignalKind};

            let (mut sigterm, mut sigint) = match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                (Ok(sigterm), Ok(sigint)) => (sigterm, sigint),
                (Err(_), _) => {
                    msg_error!(Message::FailedToCreateSigtermHandler);
                    return;
                }
                (_, Err(_)) => {
                    msg_error!(Message::FailedToCreateSigintHandler);
                    return;
                }
            };

            tokio::select! {
                _ = sigterm.recv() => {
                    msg_info!(Message::WatcherReceivedSigterm);
                }
                _ = sigint.recv() => {
                    msg_info!(Message::WatcherReceivedSigint);
                }
            }

            let _ = shutdown_tx.send(());
        });
    }

    #[cfg(windows)]
    {
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    msg_info!(Message::WatcherReceivedCtrlC);
                    let _ = shutdown_tx.send(());
                }
                Err(e) => {
                    msg_error!(Message::WatcherCtrlCListenFailed(e.to_string()));
                }
            }
        });
    }

    #[cfg(not(any(unix, windows)))]
    {
        drop(shutdown_tx);
        msg_warning!(Message::WatcherSignalHandlingNotSupported);
    }
}

/// Interval whose first tick is one period from now.
fn cadence(period_secs: u64) -> Interval {
    cadence_from(Duration::from_secs(period_secs.max(1)))
}

fn cadence_from(period: Duration) -> Interval {
    let mut interval = interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}
