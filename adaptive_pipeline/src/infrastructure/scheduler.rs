// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The piece-upload admission scheduler: a process-wide cap on
//! concurrently in-flight piece uploads, modeled directly on
//! `infrastructure/runtime/resource_manager.rs`'s `GlobalResourceManager` —
//! a `tokio::sync::Semaphore` handed out as RAII permits, fair FIFO by
//! construction (`tokio::sync::Semaphore` queues waiters in acquire
//! order).

use std::sync::Arc;

use tokio::sync::{AcquireError, OwnedSemaphorePermit, Semaphore};

use storx_uplink_domain::value_objects::MaximumConcurrent;

/// Bounds the number of concurrently in-flight piece uploads across every
/// stream being written at once — a process-wide cap, not a per-upload
/// cap.
#[derive(Clone)]
pub struct UploadScheduler {
    permits: Arc<Semaphore>,
    limit: usize,
}

impl UploadScheduler {
    pub fn new(limit: MaximumConcurrent) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(limit.get())),
            limit: limit.get(),
        }
    }

    /// Waits for an admission slot. Permits are granted FIFO (the
    /// semaphore's own waiter queue), so a piece queued earlier is never
    /// overtaken by one queued later.
    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit, AcquireError> {
        self.permits.clone().acquire_owned().await
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn never_exceeds_configured_limit() {
        let scheduler = UploadScheduler::new(MaximumConcurrent::new(2));
        let p1 = scheduler.acquire().await.unwrap();
        let p2 = scheduler.acquire().await.unwrap();
        assert_eq!(scheduler.available_permits(), 0);

        let scheduler2 = scheduler.clone();
        let waiter = tokio::spawn(async move {
            let _p3 = scheduler2.acquire().await.unwrap();
        });

        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        drop(p1);
        waiter.await.unwrap();
        drop(p2);
    }

    #[tokio::test]
    async fn fifo_admission_order() {
        use tokio::sync::Mutex;
        let scheduler = UploadScheduler::new(MaximumConcurrent::new(1));
        let order = Arc::new(Mutex::new(Vec::<u32>::new()));
        let _first = scheduler.acquire().await.unwrap();

        let mut handles = Vec::new();
        for id in 0..3u32 {
            let scheduler = scheduler.clone();
            let order = order.clone();
            handles.push(tokio::spawn(async move {
                let _permit = scheduler.acquire().await.unwrap();
                order.lock().await.push(id);
            }));
            tokio::task::yield_now().await;
        }

        drop(_first);
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(*order.lock().await, vec![0, 1, 2]);
    }
}
