// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::sync::Arc;
use vigil_core::{SupState, VarUpdate, VarValue};

fn var_sig(name: &str, at_ms: u64) -> VarSig {
    let update: vigil_core::UpdateFn =
        Arc::new(|_prev: Option<&VarValue>| Ok(VarUpdate::changed(VarValue::new(1_u32))));
    VarSig::new(name, update, at_ms)
}

#[tokio::test]
async fn signals_arrive_in_fifo_order() {
    let (queue, mut boxes) = signal_queue(8);
    queue.send_var(var_sig("a", 1)).await.unwrap();
    queue.send_var(var_sig("b", 2)).await.unwrap();
    assert_eq!(boxes.var.try_recv().unwrap().name, "a");
    assert_eq!(boxes.var.try_recv().unwrap().name, "b");
    assert!(boxes.var.try_recv().is_err());
}

#[tokio::test]
async fn each_variant_lands_in_its_own_mailbox() {
    let (queue, mut boxes) = signal_queue(8);
    queue.send(Signal::Var(var_sig("a", 1))).await.unwrap();
    queue.send(Signal::User(UserSig::new("hello", 2))).await.unwrap();
    queue
        .send(Signal::Lifecycle(LifecycleSig::new(SupState::Stopped, "stop", 3)))
        .await
        .unwrap();

    assert!(boxes.var.try_recv().is_ok());
    assert_eq!(boxes.user.try_recv().unwrap().message.content, "hello");
    assert_eq!(boxes.lifecycle.try_recv().unwrap().target, SupState::Stopped);
}

#[tokio::test]
async fn enqueue_pulses_the_wake_notifier() {
    let (queue, boxes) = signal_queue(8);
    queue.send_user(UserSig::new("hi", 1)).await.unwrap();
    // A pulse was stored; this returns without an external notify.
    tokio::time::timeout(std::time::Duration::from_secs(1), boxes.wake.notified())
        .await
        .expect("wake pulse stored");
}

#[tokio::test]
async fn full_mailbox_suspends_the_sender_without_losing_signals() {
    let (queue, mut boxes) = signal_queue(1);
    queue.send_var(var_sig("a", 1)).await.unwrap();

    let producer = {
        let queue = queue.clone();
        tokio::spawn(async move { queue.send_var(var_sig("b", 2)).await })
    };
    tokio::task::yield_now().await;
    assert!(!producer.is_finished());

    assert_eq!(boxes.var.recv().await.unwrap().name, "a");
    producer.await.unwrap().unwrap();
    assert_eq!(boxes.var.recv().await.unwrap().name, "b");
}

#[tokio::test]
async fn send_after_receiver_drop_reports_closed() {
    let (queue, boxes) = signal_queue(2);
    drop(boxes);
    assert_eq!(queue.send_var(var_sig("a", 1)).await, Err(QueueClosed));
}
