//! Core aggregate and domain event traits.

use common::Version;
use serde::{Serialize, de::DeserializeOwned};

/// Trait for domain events.
///
/// Domain events represent facts that have happened in the domain.
/// They are immutable and named in past tense.
pub trait DomainEvent: Serialize + DeserializeOwned + Send + Sync + Clone {
    /// Returns the event type name, used when recording and filtering events.
    fn event_type(&self) -> &'static str;
}

/// Trait for aggregates whose state changes only through events.
///
/// Command methods on an aggregate validate against the current state and
/// return the events to record; `apply` is the single place where state
/// is mutated. Aggregates are persisted as a whole, together with the
/// events produced by the write.
pub trait Aggregate: Default + Send + Sync + Sized {
    /// The type of events this aggregate produces and consumes.
    type Event: DomainEvent;

    /// Returns the aggregate type name.
    fn aggregate_type() -> &'static str;

    /// Returns the current version of the aggregate.
    ///
    /// Version starts at 0 and increments with each applied event.
    fn version(&self) -> Version;

    /// Applies an event to the aggregate, updating its state.
    ///
    /// This method must be pure and deterministic and must not fail:
    /// events represent facts that have already been validated.
    fn apply(&mut self, event: Self::Event);

    /// Applies multiple events in sequence.
    fn apply_events(&mut self, events: impl IntoIterator<Item = Self::Event>) {
        for event in events {
            self.apply(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    enum CounterEvent {
        Incremented { by: i32 },
        Reset,
    }

    impl DomainEvent for CounterEvent {
        fn event_type(&self) -> &'static str {
            match self {
                CounterEvent::Incremented { .. } => "CounterIncremented",
                CounterEvent::Reset => "CounterReset",
            }
        }
    }

    #[derive(Debug, Default)]
    struct Counter {
        value: i32,
        version: Version,
    }

    impl Aggregate for Counter {
        type Event = CounterEvent;

        fn aggregate_type() -> &'static str {
            "Counter"
        }

        fn version(&self) -> Version {
            self.version
        }

        fn apply(&mut self, event: Self::Event) {
            match event {
                CounterEvent::Incremented { by } => self.value += by,
                CounterEvent::Reset => self.value = 0,
            }
            self.version = self.version.next();
        }
    }

    #[test]
    fn apply_events_folds_in_order() {
        let mut counter = Counter::default();
        counter.apply_events(vec![
            CounterEvent::Incremented { by: 2 },
            CounterEvent::Reset,
            CounterEvent::Incremented { by: 5 },
        ]);

        assert_eq!(counter.value, 5);
        assert_eq!(counter.version(), Version::new(3));
    }

    #[test]
    fn event_type_names() {
        assert_eq!(
            CounterEvent::Incremented { by: 1 }.event_type(),
            "CounterIncremented"
        );
        assert_eq!(CounterEvent::Reset.event_type(), "CounterReset");
    }
}
