//! List reconciliation that keeps rows, and their live bindings, across
//! refreshes.
//!
//! A refresh runs in two passes. The first matches the new items against the
//! previous wrappers by item equality, reusing a wrapper wherever an equal
//! item existed before. The second walks the final order and inserts new
//! wrappers into the host, or moves reused ones that are out of place.
//! Wrappers left unmatched are unbound and removed from the host in between.

use crate::binding::{BindingManager, InputSubscription};
use crate::scheduler::Scheduler;
use slotmap::{new_key_type, SlotMap};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::hash::Hash;
use std::rc::Rc;

new_key_type! {
    /// Stable identity of a wrapper within an [`ItemList`].
    pub struct WrapperKey;
}

/// The container that displays the rows of an [`ItemList`], in order.
pub trait ListHost {
    /// The wrapper currently displayed at `index`.
    fn key_at(&self, index: usize) -> Option<WrapperKey>;
    fn insert(&mut self, index: usize, key: WrapperKey);
    /// Remove a wrapper and its realized view.
    fn remove(&mut self, key: WrapperKey);
}

/// One row: a domain item, the bindings of its view, and the view itself.
///
/// Bindings are created when the wrapper is first placed in the host; the
/// view when the host first asks for it. Two wrappers are equal when their
/// items are.
pub struct ItemWrapper<T, V> {
    item: T,
    bindings: Option<BindingManager>,
    view: Option<V>,
}

impl<T, V> ItemWrapper<T, V> {
    fn new(item: T) -> Self {
        Self {
            item,
            bindings: None,
            view: None,
        }
    }

    pub fn item(&self) -> &T {
        &self.item
    }

    pub fn view(&self) -> Option<&V> {
        self.view.as_ref()
    }

    pub fn bindings(&self) -> Option<&BindingManager> {
        self.bindings.as_ref()
    }

    /// Whether the wrapper has been placed in the host.
    pub fn is_placed(&self) -> bool {
        self.bindings.is_some()
    }
}

impl<T: PartialEq, V> PartialEq for ItemWrapper<T, V> {
    fn eq(&self, other: &Self) -> bool {
        self.item == other.item
    }
}

impl<T: fmt::Debug, V> fmt::Debug for ItemWrapper<T, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemWrapper")
            .field("item", &self.item)
            .field("placed", &self.is_placed())
            .field("realized", &self.view.is_some())
            .finish()
    }
}

/// Multiset of wrapper keys indexed by item equality.
///
/// Equal items are matched first-in first-out, so among duplicates the
/// leftmost old wrapper goes to the leftmost new occurrence.
pub struct RecycleBin<T> {
    slots: HashMap<T, VecDeque<WrapperKey>>,
    len: usize,
}

impl<T: Eq + Hash> RecycleBin<T> {
    pub fn new() -> Self {
        Self {
            slots: HashMap::new(),
            len: 0,
        }
    }

    pub fn insert(&mut self, item: T, key: WrapperKey) {
        self.slots.entry(item).or_default().push_back(key);
        self.len += 1;
    }

    /// Take a wrapper whose item equals `item`, if one is left.
    pub fn extract(&mut self, item: &T) -> Option<WrapperKey> {
        let keys = self.slots.get_mut(item)?;
        let key = keys.pop_front()?;
        if keys.is_empty() {
            self.slots.remove(item);
        }
        self.len -= 1;
        Some(key)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The wrappers nobody extracted.
    pub fn into_keys(self) -> impl Iterator<Item = WrapperKey> {
        self.slots.into_values().flatten()
    }
}

impl<T: Eq + Hash> Default for RecycleBin<T> {
    fn default() -> Self {
        Self::new()
    }
}

type BindRow<T, V> = Rc<dyn Fn(&V, &T, &mut BindingManager)>;

/// The ordered rows of a bound list.
///
/// `bind_row` is called once per realized view, with the row's own
/// [`BindingManager`]. A row whose item survives a refresh keeps its view
/// and bindings.
pub struct ItemList<T, V> {
    arena: SlotMap<WrapperKey, ItemWrapper<T, V>>,
    order: Vec<WrapperKey>,
    bind_row: BindRow<T, V>,
}

impl<T, V> ItemList<T, V>
where
    T: Eq + Hash + Clone,
{
    pub fn new(bind_row: impl Fn(&V, &T, &mut BindingManager) + 'static) -> Self {
        Self {
            arena: SlotMap::with_key(),
            order: Vec::new(),
            bind_row: Rc::new(bind_row),
        }
    }

    /// Match `items` against the current wrappers and adopt the new order.
    ///
    /// Returns the wrappers that were not reused. They stay in the list until
    /// passed to [`dispose`](Self::dispose).
    pub fn reconcile(&mut self, items: impl IntoIterator<Item = T>) -> Vec<WrapperKey> {
        let mut bin = RecycleBin::new();
        for key in self.order.drain(..) {
            bin.insert(self.arena[key].item.clone(), key);
        }

        let (mut reused, mut created) = (0, 0);
        for item in items {
            let key = match bin.extract(&item) {
                Some(key) => {
                    reused += 1;
                    key
                }
                None => {
                    created += 1;
                    self.arena.insert(ItemWrapper::new(item))
                }
            };
            self.order.push(key);
        }

        let unused: Vec<WrapperKey> = bin.into_keys().collect();
        tracing::debug!(reused, created, unused = unused.len(), "list reconciled");
        unused
    }

    /// Unbind an unused wrapper and remove it from the host.
    pub fn dispose(
        &mut self,
        key: WrapperKey,
        host: &mut impl ListHost,
    ) -> Option<ItemWrapper<T, V>> {
        let mut wrapper = self.arena.remove(key)?;
        if let Some(bindings) = wrapper.bindings.as_mut() {
            bindings.unbind();
            host.remove(key);
        }
        Some(wrapper)
    }

    /// Bring the host in line with the current order.
    pub fn place(&mut self, host: &mut impl ListHost) {
        for (index, &key) in self.order.iter().enumerate() {
            let wrapper = &mut self.arena[key];
            if wrapper.bindings.is_none() {
                host.insert(index, key);
                wrapper.bindings = Some(BindingManager::new());
            } else if host.key_at(index) != Some(key) {
                host.remove(key);
                host.insert(index, key);
            }
        }
    }

    /// Reconcile, dispose and place in one refresh. Returns the items whose
    /// rows were disposed.
    pub fn update_items(
        &mut self,
        items: impl IntoIterator<Item = T>,
        host: &mut impl ListHost,
    ) -> Vec<T> {
        let unused = self.reconcile(items);
        let disposed = unused
            .into_iter()
            .filter_map(|key| self.dispose(key, &mut *host))
            .map(|wrapper| wrapper.item)
            .collect();
        self.place(host);
        disposed
    }

    /// The view for the row at `index`, building and binding it on first
    /// request.
    ///
    /// Bindings are made inside a batch whose updates run before this
    /// returns, so the row appears fully populated.
    pub fn realize(&mut self, index: usize, make_view: impl FnOnce() -> V) -> Option<&V> {
        let key = *self.order.get(index)?;
        let bind_row = Rc::clone(&self.bind_row);
        let ItemWrapper {
            item,
            bindings,
            view,
        } = &mut self.arena[key];
        if view.is_none() {
            let realized = make_view();
            let bindings = bindings.get_or_insert_with(BindingManager::new);
            Scheduler::batch(|| bind_row(&realized, item, bindings));
            *view = Some(realized);
        }
        view.as_ref()
    }

    /// Unbind every row, leaving views and order in place.
    pub fn unbind_all(&mut self) {
        for wrapper in self.arena.values_mut() {
            if let Some(bindings) = wrapper.bindings.as_mut() {
                bindings.unbind();
            }
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn key_at(&self, index: usize) -> Option<WrapperKey> {
        self.order.get(index).copied()
    }

    pub fn get(&self, index: usize) -> Option<&ItemWrapper<T, V>> {
        self.wrapper(self.key_at(index)?)
    }

    pub fn wrapper(&self, key: WrapperKey) -> Option<&ItemWrapper<T, V>> {
        self.arena.get(key)
    }

    pub fn keys(&self) -> &[WrapperKey] {
        &self.order
    }

    pub fn items(&self) -> impl Iterator<Item = &T> + '_ {
        self.order.iter().map(|&key| &self.arena[key].item)
    }
}

impl<T: fmt::Debug, V> fmt::Debug for ItemList<T, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.order.iter().map(|&key| &self.arena[key]))
            .finish()
    }
}

/// Input side of a list binding: tearing it down unbinds every row.
struct ItemListSubscription<T, V> {
    list: Rc<RefCell<ItemList<T, V>>>,
}

impl<T, V> InputSubscription for ItemListSubscription<T, V>
where
    T: Eq + Hash + Clone,
{
    fn subscribe(&mut self) {}

    fn unsubscribe(&mut self) {
        self.list.borrow_mut().unbind_all();
    }
}

impl BindingManager {
    /// Bind the rows of `host` to the sequence produced by `output`.
    ///
    /// Every change to the sequence refreshes the list through
    /// [`ItemList::update_items`]. The returned list is what the host
    /// adapter calls [`ItemList::realize`] on when it needs a row's view.
    /// Unbinding this manager unbinds every row.
    pub fn bind_items<T, V, H>(
        &mut self,
        host: &Rc<RefCell<H>>,
        output: impl Fn() -> Vec<T> + 'static,
        bind_row: impl Fn(&V, &T, &mut BindingManager) + 'static,
    ) -> Rc<RefCell<ItemList<T, V>>>
    where
        T: Eq + Hash + Clone + 'static,
        V: 'static,
        H: ListHost + 'static,
    {
        let list = Rc::new(RefCell::new(ItemList::new(bind_row)));
        let setter = {
            let list = Rc::clone(&list);
            let host = Rc::clone(host);
            move |items: Vec<T>| {
                list.borrow_mut().update_items(items, &mut *host.borrow_mut());
            }
        };
        let input = ItemListSubscription {
            list: Rc::clone(&list),
        };
        self.bind_two_way(output, setter, input);
        list
    }
}
