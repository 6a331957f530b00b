//! Contract Test: Shutdown
//!
//! Verifies that the loop is cancellable instead of relying on process exit.
//!
//! Constraints verified:
//! - A shutdown signal ends the loop during its sleep
//! - A signal that arrives before start skips all work
//! - Dropping the shutdown sender also ends the loop
//! - A Stopped event is always the last event

mod common;

use common::*;
use setip_core::{AgentEvent, DeliveryLoop};
use std::time::Duration;

fn build(resolver: ScriptedResolver) -> (DeliveryLoop, tokio::sync::mpsc::Receiver<AgentEvent>) {
    DeliveryLoop::new(
        Box::new(resolver),
        Box::new(ScriptedDelivery::new()),
        Box::new(StaticAddressSource::new()),
        minimal_config(&["localhost"]),
    )
    .expect("loop construction succeeds")
}

#[tokio::test(start_paused = true)]
async fn shutdown_signal_interrupts_sleep() {
    let resolver = ScriptedResolver::new().answer("localhost", &["203.0.113.5"]);
    let (agent, mut rx) = build(resolver);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let handle = tokio::spawn(async move { agent.run_with_shutdown(Some(shutdown_rx)).await });

    // The loop is now parked in its 30s sleep
    wait_for(&mut rx, |e| matches!(e, AgentEvent::Pushed { .. })).await;
    let before = tokio::time::Instant::now();

    shutdown_tx.send(()).unwrap();

    let result = tokio::time::timeout(Duration::from_secs(5), handle).await;
    assert!(result.is_ok(), "loop should stop without finishing its sleep");
    assert!(result.unwrap().unwrap().is_ok());
    assert!(before.elapsed() < Duration::from_secs(30));

    let events = wait_for(&mut rx, |e| matches!(e, AgentEvent::Stopped { .. })).await;
    assert_eq!(
        events.last(),
        Some(&AgentEvent::Stopped {
            reason: "Shutdown signal".to_string()
        })
    );
}

#[tokio::test(start_paused = true)]
async fn shutdown_before_start_skips_refill() {
    let resolver = ScriptedResolver::new().answer("localhost", &["203.0.113.5"]);
    let (agent, mut rx) = build(resolver.clone());

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    shutdown_tx.send(()).unwrap();

    agent.run_with_shutdown(Some(shutdown_rx)).await.unwrap();

    assert_eq!(resolver.call_count(), 0);
    let events = wait_for(&mut rx, |e| matches!(e, AgentEvent::Stopped { .. })).await;
    assert_eq!(events.len(), 2, "only Started and Stopped: {:?}", events);
}

#[tokio::test(start_paused = true)]
async fn dropped_sender_counts_as_shutdown() {
    let resolver = ScriptedResolver::new().answer("localhost", &["203.0.113.5"]);
    let (agent, mut rx) = build(resolver);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let handle = tokio::spawn(async move { agent.run_with_shutdown(Some(shutdown_rx)).await });

    wait_for(&mut rx, |e| matches!(e, AgentEvent::Pushed { .. })).await;
    drop(shutdown_tx);

    let result = tokio::time::timeout(Duration::from_secs(5), handle).await;
    assert!(result.is_ok());
}
