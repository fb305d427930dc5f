use std::{collections::HashMap, sync::Arc, time::Duration};

use thiserror::Error;

use crate::{blocking::Condition, commands::CommandHandler, resp::RespValue, stream::StreamId};

#[derive(Error, Debug, PartialEq)]
pub enum StateError {
    #[error("MULTI calls can not be nested")]
    TransactionAlreadyStarted,
    #[error("no transaction in progress")]
    TransactionNotStarted,
}

/// A client blocked in `XREAD`, waiting for entries newer than the IDs it
/// started from. The first `XADD` that satisfies it fills its result slot;
/// later ones leave it untouched.
#[derive(Debug)]
pub struct StreamListener {
    watched: Vec<(String, StreamId)>,
    result: Condition<Option<RespValue>>,
}

impl StreamListener {
    pub fn new(watched: Vec<(String, StreamId)>) -> Self {
        Self {
            watched,
            result: Condition::new(None),
        }
    }

    pub fn watched_keys(&self) -> impl Iterator<Item = &String> {
        self.watched.iter().map(|(key, _)| key)
    }

    /// Hands `response` to the listener if its slot is still empty and `id`
    /// is newer than the ID it watches `key` from.
    pub fn offer(&self, key: &str, id: StreamId, response: &RespValue) -> bool {
        let is_newer = self
            .watched
            .iter()
            .any(|(watched_key, start)| watched_key == key && id > *start);

        if !is_newer {
            return false;
        }

        self.result.update(|slot| {
            if slot.is_some() {
                return false;
            }

            *slot = Some(response.clone());
            true
        })
    }

    /// Waits for an offered response; `None` on timeout.
    pub async fn wait(&self, timeout: Option<Duration>) -> Option<RespValue> {
        if !self.result.wait_until(|slot| slot.is_some(), timeout).await {
            return None;
        }

        self.result.with(|slot| slot.clone())
    }
}

#[derive(Debug, Default)]
pub struct State {
    transactions: HashMap<String, Vec<CommandHandler>>,
    stream_listeners: HashMap<String, Vec<Arc<StreamListener>>>,
}

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start_transaction(&mut self, client_address: String) -> Result<(), StateError> {
        if self.transactions.contains_key(&client_address) {
            return Err(StateError::TransactionAlreadyStarted);
        }

        self.transactions.insert(client_address, Vec::new());
        Ok(())
    }

    pub fn get_transaction(&self, client_address: &str) -> Option<&Vec<CommandHandler>> {
        self.transactions.get(client_address)
    }

    pub fn add_to_transaction(
        &mut self,
        client_address: &str,
        command: CommandHandler,
    ) -> Result<(), StateError> {
        let Some(transaction) = self.transactions.get_mut(client_address) else {
            return Err(StateError::TransactionNotStarted);
        };

        transaction.push(command);
        Ok(())
    }

    pub fn remove_transaction(
        &mut self,
        client_address: &str,
    ) -> Result<Vec<CommandHandler>, StateError> {
        self.transactions
            .remove(client_address)
            .ok_or(StateError::TransactionNotStarted)
    }

    pub fn add_stream_listener(&mut self, listener: Arc<StreamListener>) {
        for key in listener.watched_keys() {
            self.stream_listeners
                .entry(key.clone())
                .or_default()
                .push(Arc::clone(&listener));
        }
    }

    pub fn remove_stream_listener(&mut self, listener: &Arc<StreamListener>) {
        for key in listener.watched_keys() {
            if let Some(listeners) = self.stream_listeners.get_mut(key) {
                listeners.retain(|registered| !Arc::ptr_eq(registered, listener));

                if listeners.is_empty() {
                    self.stream_listeners.remove(key);
                }
            }
        }
    }

    /// Offers a freshly appended entry to every listener watching `key`.
    /// Returns how many listeners accepted it.
    pub fn notify_stream_listeners(&self, key: &str, id: StreamId, response: &RespValue) -> usize {
        let Some(listeners) = self.stream_listeners.get(key) else {
            return 0;
        };

        listeners
            .iter()
            .filter(|listener| listener.offer(key, id, response))
            .count()
    }

    pub fn stream_listener_count(&self, key: &str) -> usize {
        self.stream_listeners.get(key).map_or(0, Vec::len)
    }
}
