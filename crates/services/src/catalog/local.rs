use flash_core::model::{Category, CategoryId, Flashcard, FlashcardId};

/// Entities that can live in a [`LocalCollection`].
pub trait Keyed: Clone {
    type Key: Clone + Eq;

    fn key(&self) -> &Self::Key;
}

impl Keyed for Flashcard {
    type Key = FlashcardId;

    fn key(&self) -> &FlashcardId {
        &self.id
    }
}

impl Keyed for Category {
    type Key = CategoryId;

    fn key(&self) -> &CategoryId {
        &self.id
    }
}

#[derive(Debug, Clone)]
enum Pending<T> {
    Create,
    Update { previous: T },
    Remove { previous: T, index: usize },
}

/// Client-side copy of a server collection with optimistic mutations.
///
/// Every `begin_*` call applies the change locally and records how to undo it.
/// The caller then either confirms it with the server's answer or rolls it back.
/// Fetches replace the confirmed state wholesale.
#[derive(Debug, Clone)]
pub struct LocalCollection<T: Keyed> {
    items: Vec<T>,
    pending: Vec<(T::Key, Pending<T>)>,
}

impl<T: Keyed> Default for LocalCollection<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            pending: Vec::new(),
        }
    }
}

impl<T: Keyed> LocalCollection<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn items(&self) -> &[T] {
        &self.items
    }

    #[must_use]
    pub fn get(&self, key: &T::Key) -> Option<&T> {
        self.items.iter().find(|item| item.key() == key)
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn is_pending(&self, key: &T::Key) -> bool {
        self.pending.iter().any(|(k, _)| k == key)
    }

    /// Replace everything with a fresh server listing. Pending changes are dropped.
    pub fn replace_all(&mut self, items: Vec<T>) {
        self.items = items;
        self.pending.clear();
    }

    /// Replace the items matching `belongs` with a fresh partial listing.
    ///
    /// Pending entries are kept so an in-flight mutation can still be reconciled.
    pub fn replace_matching(&mut self, belongs: impl Fn(&T) -> bool, fresh: Vec<T>) {
        let pending = &self.pending;
        self.items
            .retain(|item| !belongs(item) || pending.iter().any(|(k, _)| k == item.key()));
        for item in fresh {
            self.upsert_confirmed(item);
        }
    }

    /// Insert or replace an item the server already knows about.
    pub fn upsert_confirmed(&mut self, item: T) {
        if self.is_pending(item.key()) {
            return;
        }
        match self.position(item.key()) {
            Some(index) => self.items[index] = item,
            None => self.items.push(item),
        }
    }

    /// Append a provisional item awaiting creation on the server.
    pub fn begin_create(&mut self, item: T) {
        self.pending.push((item.key().clone(), Pending::Create));
        self.items.push(item);
    }

    /// Swap in the provisional version of an existing item.
    ///
    /// Returns `false` when no item with that key is present.
    pub fn begin_update(&mut self, item: T) -> bool {
        let Some(index) = self.position(item.key()) else {
            return false;
        };
        let previous = std::mem::replace(&mut self.items[index], item);
        self.pending
            .push((previous.key().clone(), Pending::Update { previous }));
        true
    }

    /// Hide an item while its deletion is in flight.
    pub fn begin_remove(&mut self, key: &T::Key) -> Option<T> {
        let index = self.position(key)?;
        let previous = self.items.remove(index);
        self.pending.push((
            key.clone(),
            Pending::Remove {
                previous: previous.clone(),
                index,
            },
        ));
        Some(previous)
    }

    /// Settle a pending create or update with the server's version.
    ///
    /// The confirmed item may carry a different key than the provisional one.
    pub fn confirm(&mut self, key: &T::Key, confirmed: T) {
        self.take_pending(key);
        match self.position(key) {
            Some(index) => self.items[index] = confirmed,
            None => self.upsert_confirmed(confirmed),
        }
    }

    /// Settle a pending removal.
    pub fn confirm_removal(&mut self, key: &T::Key) {
        self.take_pending(key);
    }

    /// Undo a pending change. Returns `false` when nothing was pending for `key`.
    pub fn rollback(&mut self, key: &T::Key) -> bool {
        let Some(pending) = self.take_pending(key) else {
            return false;
        };
        match pending {
            Pending::Create => {
                self.items.retain(|item| item.key() != key);
            }
            Pending::Update { previous } => match self.position(key) {
                Some(index) => self.items[index] = previous,
                None => self.items.push(previous),
            },
            Pending::Remove { previous, index } => {
                let index = index.min(self.items.len());
                self.items.insert(index, previous);
            }
        }
        true
    }

    fn position(&self, key: &T::Key) -> Option<usize> {
        self.items.iter().position(|item| item.key() == key)
    }

    fn take_pending(&mut self, key: &T::Key) -> Option<Pending<T>> {
        let index = self.pending.iter().position(|(k, _)| k == key)?;
        Some(self.pending.remove(index).1)
    }
}
