use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use todotag_data::{DataClient, ServiceError, Subscription};
use todotag_types::events::{GatewayCommand, GatewayEvent};
use todotag_types::models::{Model, ModelKind};
use todotag_types::options::{AuthMode, CallOptions};

/// Live queries opened by one gateway connection, at most one per model.
///
/// Every snapshot is pushed into `events`. Dropping the set cancels all of
/// its queries.
pub struct Watchers {
    client: Arc<dyn DataClient>,
    events: mpsc::Sender<GatewayEvent>,
    active: HashMap<ModelKind, JoinHandle<()>>,
}

impl Watchers {
    pub fn new(client: Arc<dyn DataClient>, events: mpsc::Sender<GatewayEvent>) -> Self {
        Self {
            client,
            events,
            active: HashMap::new(),
        }
    }

    /// Apply a client command. Returns the event to send back when the
    /// command is refused.
    pub fn handle(&mut self, cmd: GatewayCommand) -> Option<GatewayEvent> {
        match cmd {
            GatewayCommand::Observe { model, auth_mode } => {
                match self.observe(model, auth_mode) {
                    Ok(()) => None,
                    Err(e) => Some(GatewayEvent::Error {
                        model: Some(model),
                        message: e.to_string(),
                    }),
                }
            }
            GatewayCommand::Unobserve { model } => {
                self.unobserve(model);
                None
            }
        }
    }

    /// Start (or restart) the live query over `model`. Without an explicit
    /// mode, Todo is observed as the signed-in user and the shared models
    /// with the API key.
    pub fn observe(
        &mut self,
        model: ModelKind,
        auth_mode: Option<AuthMode>,
    ) -> Result<(), ServiceError> {
        let options = CallOptions {
            auth_mode: Some(auth_mode.unwrap_or(match model {
                ModelKind::Todo => AuthMode::UserPool,
                ModelKind::Tag | ModelKind::TodoTag => AuthMode::ApiKey,
            })),
        };

        let events = self.events.clone();
        let task = match model {
            ModelKind::Todo => {
                let subscription = self.client.todos().observe_query(options)?;
                forward(subscription, events, |items| GatewayEvent::Todos { items })
            }
            ModelKind::Tag => {
                let subscription = self.client.tags().observe_query(options)?;
                forward(subscription, events, |items| GatewayEvent::Tags { items })
            }
            ModelKind::TodoTag => {
                let subscription = self.client.todo_tags().observe_query(options)?;
                forward(subscription, events, |items| GatewayEvent::TodoTags { items })
            }
        };

        if let Some(previous) = self.active.insert(model, task) {
            previous.abort();
        }
        info!("Observing {}", model);
        Ok(())
    }

    /// Cancel the live query over `model`. Returns false if none was open.
    pub fn unobserve(&mut self, model: ModelKind) -> bool {
        match self.active.remove(&model) {
            Some(task) => {
                task.abort();
                debug!("Stopped observing {}", model);
                true
            }
            None => false,
        }
    }

    pub fn is_observing(&self, model: ModelKind) -> bool {
        self.active.contains_key(&model)
    }
}

impl Drop for Watchers {
    fn drop(&mut self) {
        for (_, task) in self.active.drain() {
            task.abort();
        }
    }
}

/// Pump one subscription into the event channel until either side closes.
fn forward<M: Model>(
    mut subscription: Subscription<M>,
    events: mpsc::Sender<GatewayEvent>,
    wrap: fn(Vec<M>) -> GatewayEvent,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(snapshot) = subscription.next().await {
            let event = match snapshot {
                Ok(items) => wrap(items),
                Err(e) => GatewayEvent::Error {
                    model: Some(M::KIND),
                    message: e.to_string(),
                },
            };
            if events.send(event).await.is_err() {
                break;
            }
        }
    })
}
