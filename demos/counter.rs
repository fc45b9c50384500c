//! Counter example demonstrating signal_bindings.
//!
//! This example shows:
//! - Creating observables
//! - Binding labels and a text field to derived state
//! - Binding a button whose enabled state follows the model
//! - Batching several changes into one refresh
//! - Tearing the bindings down

use signal_bindings::prelude::*;
use signal_bindings::{ConnectionId, ParseText, TextEvent};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tracing_subscriber::EnvFilter;

/// A console stand-in for a platform text widget.
#[derive(Default)]
struct ConsoleField {
    name: &'static str,
    text: RefCell<String>,
    focused: Cell<bool>,
    handlers: RefCell<Vec<(ConnectionId, Rc<dyn Fn(TextEvent)>)>>,
}

impl ConsoleField {
    fn new(name: &'static str) -> Rc<Self> {
        Rc::new(Self {
            name,
            ..Default::default()
        })
    }

    fn fire(&self, event: TextEvent) {
        let handlers: Vec<_> = self.handlers.borrow().iter().map(|(_, h)| h.clone()).collect();
        for handler in handlers {
            handler(event);
        }
    }

    fn type_text(&self, text: &str) {
        println!("  (user types {text:?} into {})", self.name);
        self.focused.set(true);
        *self.text.borrow_mut() = text.to_string();
        self.fire(TextEvent::Changed);
        self.focused.set(false);
        self.fire(TextEvent::FocusLost);
    }
}

impl TextControl for ConsoleField {
    fn text(&self) -> String {
        self.text.borrow().clone()
    }

    fn set_text(&self, text: &str) {
        println!("  {} <- {text:?}", self.name);
        *self.text.borrow_mut() = text.to_string();
    }

    fn has_focus(&self) -> bool {
        self.focused.get()
    }

    fn connect(&self, handler: Rc<dyn Fn(TextEvent)>) -> ConnectionId {
        let id = ConnectionId(self.handlers.borrow().len() as u64);
        self.handlers.borrow_mut().push((id, handler));
        id
    }

    fn disconnect(&self, connection: ConnectionId) {
        self.handlers.borrow_mut().retain(|(id, _)| *id != connection);
    }
}

/// A console stand-in for a platform push button.
struct ConsoleButton {
    name: &'static str,
    enabled: Cell<bool>,
    handlers: RefCell<Vec<(ConnectionId, Rc<dyn Fn()>)>>,
}

impl ConsoleButton {
    fn new(name: &'static str) -> Rc<Self> {
        Rc::new(Self {
            name,
            enabled: Cell::new(true),
            handlers: RefCell::new(Vec::new()),
        })
    }

    fn press(&self) {
        if !self.enabled.get() {
            println!("  (user presses disabled {})", self.name);
            return;
        }
        println!("  (user presses {})", self.name);
        let handlers: Vec<_> = self.handlers.borrow().iter().map(|(_, h)| h.clone()).collect();
        for handler in handlers {
            handler();
        }
    }
}

impl ButtonControl for ConsoleButton {
    fn set_enabled(&self, enabled: bool) {
        println!("  {} enabled <- {enabled}", self.name);
        self.enabled.set(enabled);
    }

    fn connect(&self, handler: Rc<dyn Fn()>) -> ConnectionId {
        let id = ConnectionId(self.handlers.borrow().len() as u64);
        self.handlers.borrow_mut().push((id, handler));
        id
    }

    fn disconnect(&self, connection: ConnectionId) {
        self.handlers.borrow_mut().retain(|(id, _)| *id != connection);
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    Scheduler::initialize(|update| update.run()).expect("initialized once");

    let count = Observable::new(0);
    let step = Observable::new(1);

    let entry = ConsoleField::new("count field");
    let summary = ConsoleField::new("summary label");
    let mut bindings = BindingManager::new();

    println!("binding:");
    bindings.bind_text(
        &entry,
        {
            let count = count.clone();
            move || count.get()
        },
        {
            let count = count.clone();
            move |value| count.set(value)
        },
        ParseText::<i32>::new(),
    );
    bindings.bind_label(
        &summary,
        {
            let (count, step) = (count.clone(), step.clone());
            move || format!("{} (step {})", count.get() * 2, step.get())
        },
        signal_bindings::Identity,
    );

    let increment = ConsoleButton::new("increment button");
    bindings.bind_command_when(
        &increment,
        {
            let (count, step) = (count.clone(), step.clone());
            move || count.update(|n| *n += step.get_untracked())
        },
        {
            let count = count.clone();
            move || count.get() < 50
        },
    );

    println!("increment:");
    increment.press();

    println!("batched change of count and step:");
    let batch = Scheduler::begin();
    count.set(10);
    step.set(5);
    for update in batch.end() {
        update.run();
    }

    println!("typing:");
    entry.type_text("42");
    entry.type_text("forty-two");
    entry.type_text("60");
    increment.press();

    println!("unbound:");
    bindings.unbind();
    count.set(7);
    println!("  summary still shows {:?}", summary.text());
}
