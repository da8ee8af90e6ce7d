//! Change notification for annotation trees.
//!
//! Mutators queue a [`ChangeEvent`] for each field they touch. When the
//! outermost operation returns, the queue is drained and every matching
//! listener runs in registration order. A listener receives `&mut
//! AnnotationTree` and may mutate it; the events that produces are appended
//! to the same queue and handled by the loop already running, so
//! notification never recurses.

use serde::Serialize;
use std::collections::VecDeque;

use super::attribute::AttributeKind;
use super::ids::{AnnotationId, ListenerId};
use super::AnnotationTree;

/// Which part of an annotation changed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Feature,
    Parent,
    Children,
    Category,
    Breed,
    Attribute(AttributeKind),
    Roll,
    Pitch,
    Yaw,
    Start,
    End,
    Translate,
    Rotate,
    ExtendClip,
    Selection,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ChangeEvent {
    pub annotation: AnnotationId,
    pub kind: ChangeKind,
}

/// Callback run after a change.
pub type Listener = Box<dyn FnMut(&mut AnnotationTree, &ChangeEvent) + Send>;

/// What a listener wants to hear about.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scope {
    /// Changes to one annotation.
    Annotation(AnnotationId),
    /// Every change in the tree.
    Tree,
}

impl Scope {
    fn matches(&self, event: &ChangeEvent) -> bool {
        match self {
            Scope::Annotation(id) => *id == event.annotation,
            Scope::Tree => true,
        }
    }
}

struct Subscription {
    id: ListenerId,
    scope: Scope,
    // None while the listener is running.
    listener: Option<Listener>,
    removed: bool,
}

#[derive(Default)]
pub(crate) struct Dispatcher {
    next_id: u64,
    subscriptions: Vec<Subscription>,
    pending: VecDeque<ChangeEvent>,
    dispatching: bool,
}

impl Dispatcher {
    pub(crate) fn emit(&mut self, annotation: AnnotationId, kind: ChangeKind) {
        if self.subscriptions.is_empty() {
            return;
        }
        self.pending.push_back(ChangeEvent { annotation, kind });
    }

    pub(crate) fn listener_count(&self) -> usize {
        self.subscriptions.iter().filter(|s| !s.removed).count()
    }

    fn compact(&mut self) {
        self.subscriptions.retain(|s| !s.removed);
    }
}

impl AnnotationTree {
    /// Registers `listener` for changes within `scope`.
    pub fn subscribe(&mut self, scope: Scope, listener: Listener) -> ListenerId {
        let events = &mut self.events;
        let id = ListenerId(events.next_id);
        events.next_id += 1;
        events.subscriptions.push(Subscription {
            id,
            scope,
            listener: Some(listener),
            removed: false,
        });
        id
    }

    /// Removes a listener. Returns false if it was not registered.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let events = &mut self.events;
        let Some(sub) = events
            .subscriptions
            .iter_mut()
            .find(|s| s.id == id && !s.removed)
        else {
            return false;
        };
        sub.removed = true;
        if !events.dispatching {
            events.compact();
        }
        true
    }

    pub fn listener_count(&self) -> usize {
        self.events.listener_count()
    }

    /// Delivers every queued event. A no-op when called from inside a
    /// listener; the running loop picks the new events up.
    pub(crate) fn flush_events(&mut self) {
        if self.events.dispatching {
            return;
        }
        self.events.dispatching = true;
        while let Some(event) = self.events.pending.pop_front() {
            let mut index = 0;
            while index < self.events.subscriptions.len() {
                let sub = &mut self.events.subscriptions[index];
                index += 1;
                if sub.removed || !sub.scope.matches(&event) {
                    continue;
                }
                let Some(mut listener) = sub.listener.take() else {
                    continue;
                };
                let id = sub.id;
                listener(self, &event);
                if let Some(sub) = self.events.subscriptions.iter_mut().find(|s| s.id == id) {
                    sub.listener = Some(listener);
                }
            }
        }
        self.events.compact();
        self.events.dispatching = false;
    }
}
