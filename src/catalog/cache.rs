use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug)]
struct Item<T> {
    value: Arc<T>,
    expire: Instant,
}

/// Holds a single value for `ttl` after it was stored.
#[derive(Debug)]
pub struct ExpiringSlot<T> {
    ttl: Duration,
    item: Option<Item<T>>,
}

impl<T> ExpiringSlot<T> {
    pub fn new(ttl: Duration) -> Self {
        ExpiringSlot { ttl, item: None }
    }

    pub fn get(&self) -> Option<Arc<T>> {
        match self.item {
            Some(ref item) if item.expire > Instant::now() => Some(item.value.clone()),
            _ => None,
        }
    }

    /// Value regardless of age.
    pub fn peek(&self) -> Option<Arc<T>> {
        self.item.as_ref().map(|item| item.value.clone())
    }

    pub fn set(&mut self, value: Arc<T>) {
        self.item = Some(Item {
            value,
            expire: Instant::now() + self.ttl,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_value_is_served() {
        let mut slot = ExpiringSlot::new(Duration::from_secs(300));
        assert!(slot.get().is_none());
        slot.set(Arc::new(5));
        assert_eq!(slot.get().as_deref(), Some(&5));
    }

    #[test]
    fn expired_value_is_only_peekable() {
        let mut slot = ExpiringSlot::new(Duration::ZERO);
        slot.set(Arc::new("old"));
        assert!(slot.get().is_none());
        assert_eq!(slot.peek().as_deref(), Some(&"old"));
    }
}
