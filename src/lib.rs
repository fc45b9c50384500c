//! # Signal Bindings
//!
//! A small reactive runtime for binding model state to UI elements.
//!
//! ## Features
//!
//! - **Automatic tracking**: computed evaluations subscribe to exactly the
//!   observables they read on their latest run
//! - **Thread-safe writes**: observables may be set from any thread; recomputes
//!   are marshaled onto a single consumer thread by the [`Scheduler`]
//! - **Batching**: invalidations raised inside a [`Batch`] are deduplicated and
//!   delivered together
//! - **Binding lifetimes**: a [`BindingManager`] owns every subscription of one
//!   UI element and tears them down together
//! - **Control adapters**: text fields, buttons and numeric controls bind
//!   through small capability traits
//! - **List reconciliation**: [`ItemList`] keeps rows (and their live bindings)
//!   across refreshes by matching items on equality
//!
//! ## Example
//!
//! ```rust,no_run
//! use signal_bindings::prelude::*;
//!
//! Scheduler::initialize(|update| update.run()).unwrap();
//!
//! let count = Observable::new(0);
//! let mut bindings = BindingManager::new();
//! bindings.bind(
//!     {
//!         let count = count.clone();
//!         move || format!("Clicked {} times", count.get())
//!     },
//!     |label| println!("{label}"),
//! );
//!
//! count.set(1);
//! bindings.unbind();
//! ```

mod binding;
mod button;
mod computed;
mod convert;
mod dispatch;
mod error;
mod observable;
mod recycle;
mod scheduler;
mod stepper;
mod storage;
mod text;

pub use binding::{BindingManager, ConnectionId, InputSubscription};
pub use button::ButtonControl;
pub use computed::{Computed, ComputedSubscription};
pub use convert::{Identity, ParseText, Truncate, ValueConverter};
pub use dispatch::ConsumerQueue;
pub use error::{BindingError, Result};
pub use observable::Observable;
pub use recycle::{ItemList, ItemWrapper, ListHost, RecycleBin, WrapperKey};
pub use scheduler::{Batch, Scheduler, Update};
pub use stepper::ValueControl;
pub use storage::{untracked, ComputedId};
pub use text::{TextControl, TextEvent};

// Re-export the prelude
pub mod prelude {
    pub use crate::{
        BindingManager, ButtonControl, Computed, InputSubscription, ItemList, ListHost, Observable,
        Scheduler, TextControl, ValueControl, ValueConverter,
    };
}
