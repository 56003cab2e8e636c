//
// events.rs
//
// Copyright (c) The Move Contributors
// SPDX-License-Identifier: Apache-2.0
//
//

use std::sync::Arc;
use std::sync::Mutex;

type Handler<T> = Box<dyn Fn(&T) + Send + Sync>;

struct HandlerEntry<T> {
    id: u64,
    handler: Handler<T>,
}

struct Registry<T> {
    next_id: u64,
    handlers: Vec<HandlerEntry<T>>,
}

/// A typed event with an ordered list of subscribers.
///
/// Dispatch is synchronous: `emit` invokes every handler in subscription
/// order and returns once all of them have run, matching the host's
/// single-threaded event delivery. Handlers are released either by dropping
/// their [Subscription] or by the host dropping its subscription list on
/// teardown.
pub struct EventEmitter<T> {
    registry: Arc<Mutex<Registry<T>>>,
}

impl<T> Default for EventEmitter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> EventEmitter<T> {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry {
                next_id: 0,
                handlers: Vec::new(),
            })),
        }
    }

    pub fn subscribe(&self, handler: impl Fn(&T) + Send + Sync + 'static) -> Subscription
    where
        T: 'static,
    {
        let mut registry = self.registry.lock().unwrap();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.handlers.push(HandlerEntry {
            id,
            handler: Box::new(handler),
        });

        let weak = Arc::downgrade(&self.registry);
        Subscription {
            unsubscribe: Some(Box::new(move || {
                if let Some(registry) = weak.upgrade() {
                    let mut registry = registry.lock().unwrap();
                    registry.handlers.retain(|entry| entry.id != id);
                }
            })),
        }
    }

    pub fn emit(&self, payload: &T) {
        // Dispatch holds the lock, so handlers must not re-enter the emitter
        let registry = self.registry.lock().unwrap();
        for entry in &registry.handlers {
            (entry.handler)(payload);
        }
    }

    pub fn handler_count(&self) -> usize {
        self.registry.lock().unwrap().handlers.len()
    }
}

/// Guard for one registered handler. Dropping it removes the handler.
pub struct Subscription {
    unsubscribe: Option<Box<dyn FnOnce() + Send>>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

/// The host-lifecycle list of live subscriptions, dropped as a unit on
/// extension teardown.
#[derive(Default)]
pub struct Subscriptions {
    subscriptions: Vec<Subscription>,
}

impl Subscriptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, subscription: Subscription) {
        self.subscriptions.push(subscription);
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }
}
