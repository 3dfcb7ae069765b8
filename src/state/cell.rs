//! State cell contract and a single-threaded implementation

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// Initial value of a cell: a literal, or computed on first mount
pub enum InitialState<T> {
    Value(T),
    Lazy(Box<dyn FnOnce() -> T>),
}

impl<T> InitialState<T> {
    pub fn lazy<F: FnOnce() -> T + 'static>(init: F) -> Self {
        InitialState::Lazy(Box::new(init))
    }

    pub fn resolve(self) -> T {
        match self {
            InitialState::Value(value) => value,
            InitialState::Lazy(init) => init(),
        }
    }
}

impl<T> From<T> for InitialState<T> {
    fn from(value: T) -> Self {
        InitialState::Value(value)
    }
}

/// New value for a cell: a literal, or an updater of the previous value
pub enum SetStateAction<T> {
    Value(T),
    Update(Box<dyn FnOnce(&T) -> T>),
}

impl<T> SetStateAction<T> {
    pub fn update<F: FnOnce(&T) -> T + 'static>(updater: F) -> Self {
        SetStateAction::Update(Box::new(updater))
    }

    /// The value this action produces given the previous one
    pub fn resolve(self, previous: &T) -> T {
        match self {
            SetStateAction::Value(value) => value,
            SetStateAction::Update(updater) => updater(previous),
        }
    }
}

impl<T> From<T> for SetStateAction<T> {
    fn from(value: T) -> Self {
        SetStateAction::Value(value)
    }
}

impl<T: fmt::Debug> fmt::Debug for SetStateAction<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SetStateAction::Value(value) => f.debug_tuple("Value").field(value).finish(),
            SetStateAction::Update(_) => f.write_str("Update(<fn>)"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatchId(u64);

/// Called after every change of a cell
pub type Watcher = Rc<dyn Fn()>;

/// Local copy of the shared value, owned by one participant
///
/// `version` grows by one on every `set`; watchers run after the new value
/// is in place and may read the cell.
pub trait StateCell<T> {
    fn get(&self) -> T;

    fn set(&self, action: SetStateAction<T>);

    fn version(&self) -> u64;

    fn watch(&self, watcher: Watcher) -> WatchId;

    fn unwatch(&self, id: WatchId);
}

pub struct LocalCell<T> {
    value: RefCell<T>,
    version: Cell<u64>,
    watchers: RefCell<Vec<(WatchId, Watcher)>>,
    next_watch: Cell<u64>,
}

impl<T> LocalCell<T> {
    pub fn new(initial: impl Into<InitialState<T>>) -> Self {
        Self {
            value: RefCell::new(initial.into().resolve()),
            version: Cell::new(0),
            watchers: RefCell::new(Vec::new()),
            next_watch: Cell::new(0),
        }
    }

    fn notify(&self) {
        let watchers: Vec<Watcher> = self
            .watchers
            .borrow()
            .iter()
            .map(|(_, watcher)| watcher.clone())
            .collect();
        for watcher in watchers {
            watcher();
        }
    }
}

impl<T: Clone> StateCell<T> for LocalCell<T> {
    fn get(&self) -> T {
        self.value.borrow().clone()
    }

    fn set(&self, action: SetStateAction<T>) {
        let next = {
            let current = self.value.borrow();
            action.resolve(&current)
        };
        *self.value.borrow_mut() = next;
        self.version.set(self.version.get() + 1);
        self.notify();
    }

    fn version(&self) -> u64 {
        self.version.get()
    }

    fn watch(&self, watcher: Watcher) -> WatchId {
        let id = WatchId(self.next_watch.get());
        self.next_watch.set(id.0 + 1);
        self.watchers.borrow_mut().push((id, watcher));
        id
    }

    fn unwatch(&self, id: WatchId) {
        self.watchers.borrow_mut().retain(|(wid, _)| *wid != id);
    }
}

impl<T: fmt::Debug> fmt::Debug for LocalCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalCell")
            .field("value", &self.value.borrow())
            .field("version", &self.version.get())
            .finish()
    }
}
