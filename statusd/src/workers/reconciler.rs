//! Reconciler worker
//!
//! Holds one live subscription per tracked agent, publishes every derived
//! view into the registry, and resubscribes degraded subscriptions with
//! exponential backoff. The adapter itself never auto-retries; resubscription
//! policy lives here, on the caller side.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tracing::{error, info, warn};

use crate::cache::views::ViewRegistry;
use crate::errors::StatusError;
use crate::utils::{calc_exp_backoff, CooldownOptions};
use crate::watch::adapter::{DeploymentWatcher, WatchHandle};

/// Reconciler worker options
#[derive(Debug, Clone)]
pub struct Options {
    /// How often degraded subscriptions are checked
    pub tick_interval: Duration,

    /// Backoff between resubscription attempts per agent
    pub cooldown: CooldownOptions,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(5),
            cooldown: CooldownOptions::default(),
        }
    }
}

/// Run the reconciler worker
pub async fn run<S, F>(
    options: &Options,
    watcher: Arc<DeploymentWatcher>,
    agent_ids: &[String],
    views: Arc<ViewRegistry>,
    sleep_fn: S,
    mut shutdown_signal: Pin<Box<dyn Future<Output = ()> + Send>>,
) where
    S: Fn(Duration) -> F,
    F: Future<Output = ()>,
{
    info!("Reconciler worker starting for {} agent(s)...", agent_ids.len());

    let degraded: Arc<Mutex<HashSet<String>>> = Arc::new(Mutex::new(HashSet::new()));
    let err_streaks: Arc<Mutex<HashMap<String, u32>>> = Arc::new(Mutex::new(HashMap::new()));

    let mut handles: HashMap<String, WatchHandle> = HashMap::new();
    let mut pending: HashMap<String, Instant> = HashMap::new();

    for agent_id in agent_ids {
        match subscribe_agent(&watcher, &views, &degraded, &err_streaks, agent_id) {
            Ok(handle) => {
                handles.insert(agent_id.clone(), handle);
            }
            Err(e) => {
                error!("Failed to subscribe agent {}: {}", agent_id, e);
                degraded
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .insert(agent_id.clone());
            }
        }
    }

    loop {
        tokio::select! {
            _ = &mut shutdown_signal => {
                info!("Reconciler worker shutting down...");
                // Dropping the handles unsubscribes them
                return;
            }
            _ = sleep_fn(options.tick_interval) => {
                // Continue with reconciliation tick
            }
        }

        // Schedule newly degraded subscriptions for resubscription
        let newly_degraded: Vec<String> = {
            let mut set = degraded.lock().unwrap_or_else(|e| e.into_inner());
            set.drain().collect()
        };
        for agent_id in newly_degraded {
            let streak = {
                let mut streaks = err_streaks.lock().unwrap_or_else(|e| e.into_inner());
                let entry = streaks.entry(agent_id.clone()).or_insert(0);
                *entry += 1;
                *entry
            };
            let delay = calc_exp_backoff(&options.cooldown, streak);
            warn!(
                "Subscription degraded for agent {} (streak {}), resubscribing in {:?}",
                agent_id, streak, delay
            );
            pending.insert(agent_id, Instant::now() + delay);
        }

        // Resubscribe the ones whose backoff elapsed
        let now = Instant::now();
        let ready: Vec<String> = pending
            .iter()
            .filter(|(_, at)| **at <= now)
            .map(|(agent_id, _)| agent_id.clone())
            .collect();

        for agent_id in ready {
            pending.remove(&agent_id);

            if let Some(old) = handles.remove(&agent_id) {
                old.unsubscribe();
            }

            match subscribe_agent(&watcher, &views, &degraded, &err_streaks, &agent_id) {
                Ok(handle) => {
                    info!("Resubscribed agent {}", agent_id);
                    handles.insert(agent_id, handle);
                }
                Err(e) => {
                    error!("Resubscribe failed for agent {}: {}", agent_id, e);
                    degraded
                        .lock()
                        .unwrap_or_else(|e| e.into_inner())
                        .insert(agent_id);
                }
            }
        }
    }
}

fn subscribe_agent(
    watcher: &DeploymentWatcher,
    views: &Arc<ViewRegistry>,
    degraded: &Arc<Mutex<HashSet<String>>>,
    err_streaks: &Arc<Mutex<HashMap<String, u32>>>,
    agent_id: &str,
) -> Result<WatchHandle, StatusError> {
    let views = views.clone();
    let err_streaks = err_streaks.clone();
    let update_agent_id = agent_id.to_string();

    let degraded = degraded.clone();
    let error_agent_id = agent_id.to_string();

    watcher.subscribe(
        agent_id,
        move |view| {
            views.publish(&update_agent_id, view);
            // A delivered view proves the subscription recovered
            err_streaks
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .remove(&update_agent_id);
        },
        move |_error| {
            degraded
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .insert(error_agent_id.clone());
        },
    )
}
