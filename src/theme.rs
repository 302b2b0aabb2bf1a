use crate::color::Theme;
use tracing::{debug, info};

/// Broadcast channel: every subscriber gets its own copy of each event.
#[derive(Debug)]
pub struct EventBus<T: Clone + Send + 'static> {
    subscribers: Vec<flume::Sender<T>>,
}

impl<T: Clone + Send + 'static> EventBus<T> {
    pub fn new() -> Self {
        Self {
            subscribers: Vec::new(),
        }
    }

    /// Open a new receiving end. Events published before this call are not replayed.
    pub fn subscribe(&mut self) -> flume::Receiver<T> {
        let (sender, receiver) = flume::unbounded();
        self.subscribers.push(sender);
        receiver
    }

    /// Send to every live subscriber, forgetting the ones whose receiver was dropped.
    pub fn publish(&mut self, event: T) {
        self.subscribers.retain(|s| s.send(event.clone()).is_ok());
        debug!(subscribers = self.subscriber_count(), "event published");
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

impl<T: Clone + Send + 'static> Default for EventBus<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Published whenever the active theme changes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThemeChanged {
    pub theme: Theme,
    /// Strictly increasing per store; receivers drop anything not newer than what they applied
    pub seq: u64,
}

/// Owner of the active theme
#[derive(Debug)]
pub struct ThemeStore {
    theme: Theme,
    seq: u64,
    bus: EventBus<ThemeChanged>,
}

impl ThemeStore {
    pub fn new(theme: Theme) -> Self {
        Self {
            theme,
            seq: 0,
            bus: EventBus::new(),
        }
    }

    pub fn current(&self) -> Theme {
        self.theme
    }

    pub fn subscribe(&mut self) -> flume::Receiver<ThemeChanged> {
        self.bus.subscribe()
    }

    /// Switch theme; publishes only when it actually changes
    pub fn set(&mut self, theme: Theme) -> bool {
        if theme == self.theme {
            return false;
        }
        self.theme = theme;
        self.seq += 1;
        info!(theme = theme.name(), seq = self.seq, "theme changed");
        self.bus.publish(ThemeChanged {
            theme,
            seq: self.seq,
        });
        true
    }

    pub fn toggle(&mut self) -> Theme {
        self.set(self.theme.toggled());
        self.theme
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_subscriber_receives() {
        let mut store = ThemeStore::new(Theme::Light);
        let a = store.subscribe();
        let b = store.subscribe();
        store.toggle();
        assert_eq!(a.try_recv().unwrap().theme, Theme::Dark);
        assert_eq!(b.try_recv().unwrap().theme, Theme::Dark);
    }

    #[test]
    fn test_sequence_increases() {
        let mut store = ThemeStore::new(Theme::Dark);
        let rx = store.subscribe();
        store.toggle();
        store.toggle();
        let seqs: Vec<u64> = rx.try_iter().map(|e| e.seq).collect();
        assert_eq!(seqs, vec![1, 2]);
    }

    #[test]
    fn test_setting_same_theme_is_silent() {
        let mut store = ThemeStore::new(Theme::Dark);
        let rx = store.subscribe();
        assert!(!store.set(Theme::Dark));
        assert!(rx.is_empty());
    }

    #[test]
    fn test_dropped_subscriber_is_forgotten() {
        let mut bus = EventBus::<u32>::new();
        let keep = bus.subscribe();
        drop(bus.subscribe());
        bus.publish(5);
        assert_eq!(bus.subscriber_count(), 1);
        assert_eq!(keep.recv().unwrap(), 5);
    }
}
