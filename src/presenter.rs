//! Process-wide session core.
//!
//! Owns the current user, the active chain and its client, and the single
//! background reconnect loop. Starting a new loop always aborts the previous
//! one; there are never two reconnect loops for the same session. UI-facing
//! state changes travel over an event channel.

use crate::chains::KnownChains;
use crate::client::{make_client, ChainApiClient};
use crate::config::Config;
use crate::connectivity::{ConnectionService, CrashReporter};
use crate::error::{OperationError, OperationResult};
use crate::rpc::RpcTransport;
use crate::session::UserInfo;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::task::{AbortHandle, JoinHandle};

/// Session-level signals for the UI layer.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
    /// Show (or replace) the connectivity banner.
    Alert(String),
    /// Connection is back; drop the banner.
    AlertCleared,
}

pub struct Presenter {
    config: Config,
    transport: Arc<dyn RpcTransport>,
    connectivity: Arc<dyn ConnectionService>,
    reporter: Arc<dyn CrashReporter>,
    events: UnboundedSender<SessionEvent>,

    chain: Mutex<KnownChains>,
    is_dev: Mutex<bool>,
    user: Mutex<Option<UserInfo>>,
    client: Mutex<Arc<dyn ChainApiClient>>,

    /// At most one in-flight reconnect loop.
    reconnect: Mutex<Option<JoinHandle<()>>>,
    /// Presenter-scoped tasks, cancelled together on disposal.
    tasks: Mutex<Vec<AbortHandle>>,
}

impl Presenter {
    /// Build the session context. The chain comes from the persisted user
    /// when one exists, otherwise from configuration.
    pub fn new(
        config: Config,
        initial_user: Option<UserInfo>,
        transport: Arc<dyn RpcTransport>,
        connectivity: Arc<dyn ConnectionService>,
        reporter: Arc<dyn CrashReporter>,
    ) -> (Arc<Self>, UnboundedReceiver<SessionEvent>) {
        let chain = initial_user
            .as_ref()
            .map(|u| u.chain)
            .unwrap_or(config.chain);
        let client = make_client(chain, &config, transport.clone());
        let (events, events_rx) = unbounded_channel();

        let presenter = Arc::new(Self {
            is_dev: Mutex::new(config.is_dev),
            config,
            transport,
            connectivity,
            reporter,
            events,
            chain: Mutex::new(chain),
            user: Mutex::new(initial_user),
            client: Mutex::new(client),
            reconnect: Mutex::new(None),
            tasks: Mutex::new(Vec::new()),
        });
        (presenter, events_rx)
    }

    pub fn chain(&self) -> KnownChains {
        *self.chain.lock().expect("chain lock")
    }

    pub fn is_dev(&self) -> bool {
        *self.is_dev.lock().expect("dev lock")
    }

    pub fn user(&self) -> Option<UserInfo> {
        self.user.lock().expect("user lock").clone()
    }

    pub fn client(&self) -> Arc<dyn ChainApiClient> {
        self.client.lock().expect("client lock").clone()
    }

    pub fn set_user(&self, user: Option<UserInfo>) {
        *self.user.lock().expect("user lock") = user;
    }

    /// Kick off the initial connection attempt; call once at startup.
    pub fn start(self: &Arc<Self>) {
        self.restart_reconnect();
    }

    /// Switch between prod and dev environments. No-op when already there.
    pub fn switch_environment(self: &Arc<Self>, is_dev: bool) {
        {
            let mut dev = self.is_dev.lock().expect("dev lock");
            if *dev == is_dev {
                return;
            }
            *dev = is_dev;
        }
        self.rebuild_client();
        self.restart_reconnect();
    }

    /// Switch to another user's chain. No-op when the chain already matches.
    pub fn switch_user(self: &Arc<Self>, user: UserInfo) {
        {
            let mut chain = self.chain.lock().expect("chain lock");
            if *chain == user.chain {
                return;
            }
            *chain = user.chain;
        }
        self.set_user(Some(user));
        self.rebuild_client();
        self.restart_reconnect();
    }

    /// Switch the active chain. No-op when already selected.
    pub fn switch_chain(self: &Arc<Self>, target: KnownChains) {
        {
            let mut chain = self.chain.lock().expect("chain lock");
            if *chain == target {
                return;
            }
            *chain = target;
        }
        self.rebuild_client();
        self.restart_reconnect();
    }

    fn rebuild_client(&self) {
        let chain = self.chain();
        let mut config = self.config.clone();
        config.is_dev = self.is_dev();
        let client = make_client(chain, &config, self.transport.clone());
        *self.client.lock().expect("client lock") = client;
    }

    /// Cancel the in-flight reconnect loop, if any, and start a fresh one.
    fn restart_reconnect(self: &Arc<Self>) {
        let mut slot = self.reconnect.lock().expect("reconnect lock");
        if let Some(previous) = slot.take() {
            previous.abort();
        }
        let me = Arc::clone(self);
        *slot = Some(tokio::spawn(async move { me.try_connect().await }));
    }

    /// First connection attempt; on failure falls into the retry loop.
    async fn try_connect(self: Arc<Self>) {
        let available = self.connectivity.is_connection_available();
        let client = self.client();
        if available && client.try_reconnect_chain().await {
            let _ = self.events.send(SessionEvent::AlertCleared);
            return;
        }
        let alert = if available {
            OperationError::BlockchainUnavailable
        } else {
            OperationError::InternetUnavailable
        };
        let _ = self.events.send(SessionEvent::Alert(alert.to_string()));
        self.reconnect_loop(client).await;
    }

    /// Retry until connected or cancelled. Deliberately unbounded: the
    /// network is assumed to come back eventually.
    async fn reconnect_loop(&self, client: Arc<dyn ChainApiClient>) {
        let delay = Duration::from_millis(self.config.reconnect_delay_ms);
        loop {
            tokio::time::sleep(delay).await;

            if !self.connectivity.is_connection_available() {
                let _ = self
                    .events
                    .send(SessionEvent::Alert(
                        OperationError::BlockchainUnavailable.to_string(),
                    ));
                continue;
            }
            if client.try_reconnect_chain().await {
                log::info!("reconnected to {}", client.chain());
                let _ = self.events.send(SessionEvent::AlertCleared);
                return;
            }
            let _ = self.events.send(SessionEvent::Alert(
                OperationError::BlockchainUnavailable.to_string(),
            ));
        }
    }

    /// Run one operation behind the connectivity guard.
    ///
    /// Offline short-circuits with a connectivity error before the wrapped
    /// future is ever polled. A cancelled task yields `None` silently; a
    /// panicking one is reported to the crash collector and also yields
    /// `None`; the caller cannot meaningfully act on either.
    pub async fn try_run_task<T, F>(&self, task: F) -> Option<OperationResult<T>>
    where
        F: Future<Output = OperationResult<T>> + Send + 'static,
        T: Send + 'static,
    {
        if !self.connectivity.is_connection_available() {
            return Some(Err(OperationError::InternetUnavailable));
        }

        let handle = tokio::spawn(task);
        self.tasks
            .lock()
            .expect("tasks lock")
            .push(handle.abort_handle());

        match handle.await {
            Ok(result) => Some(result),
            Err(e) if e.is_cancelled() => None,
            Err(e) => {
                self.reporter.send_crash("try_run_task", &e.to_string());
                None
            }
        }
    }

    /// Cancel everything scoped to this presenter. The process-wide
    /// reconnect loop is a different scope and keeps running.
    pub fn cancel_tasks(&self) {
        for task in self.tasks.lock().expect("tasks lock").drain(..) {
            task.abort();
        }
    }
}

impl Drop for Presenter {
    fn drop(&mut self) {
        self.cancel_tasks();
        if let Some(handle) = self.reconnect.lock().expect("reconnect lock").take() {
            handle.abort();
        }
    }
}
