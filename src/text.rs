//! Text binding against a capability interface, independent of any widget
//! toolkit.

use crate::binding::{BindingManager, ConnectionId, InputSubscription};
use crate::convert::ValueConverter;
use std::rc::{Rc, Weak};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEvent {
    /// The user edited the text.
    Changed,
    /// The control lost input focus.
    FocusLost,
}

/// What a text widget adapter must provide to be bound.
pub trait TextControl {
    fn text(&self) -> String;
    fn set_text(&self, text: &str);
    fn has_focus(&self) -> bool;
    fn connect(&self, handler: Rc<dyn Fn(TextEvent)>) -> ConnectionId;
    fn disconnect(&self, connection: ConnectionId);
}

struct TextBinding<C, T, V> {
    control: Rc<C>,
    output: Rc<dyn Fn() -> T>,
    input: Rc<dyn Fn(T)>,
    converter: Rc<V>,
    connection: Option<ConnectionId>,
}

impl<C, T, V> InputSubscription for TextBinding<C, T, V>
where
    C: TextControl + 'static,
    T: 'static,
    V: ValueConverter<String, T> + 'static,
{
    fn subscribe(&mut self) {
        if self.connection.is_some() {
            return;
        }
        let control: Weak<C> = Rc::downgrade(&self.control);
        let output = Rc::clone(&self.output);
        let input = Rc::clone(&self.input);
        let converter = Rc::clone(&self.converter);
        let handler = move |event: TextEvent| {
            let Some(control) = control.upgrade() else {
                return;
            };
            match event {
                TextEvent::Changed => input(converter.convert_input(&control.text())),
                // Restore the canonical rendering of whatever the model accepted.
                TextEvent::FocusLost => control.set_text(&converter.convert_output(&output())),
            }
        };
        self.connection = Some(self.control.connect(Rc::new(handler)));
    }

    fn unsubscribe(&mut self) {
        if let Some(connection) = self.connection.take() {
            self.control.disconnect(connection);
        }
    }
}

impl BindingManager {
    /// Two-way bind the text of `control` to a model value.
    ///
    /// Model changes are written to the control unless it has focus, so the
    /// user's in-progress edit is never overwritten. Edits are converted and
    /// passed to `input`; text that fails to convert yields the converter's
    /// default. When focus leaves the control its text is refreshed from the
    /// model.
    pub fn bind_text<C, T, V>(
        &mut self,
        control: &Rc<C>,
        output: impl Fn() -> T + 'static,
        input: impl Fn(T) + 'static,
        converter: V,
    ) where
        C: TextControl + 'static,
        T: Clone + 'static,
        V: ValueConverter<String, T> + 'static,
    {
        let output: Rc<dyn Fn() -> T> = Rc::new(output);
        let converter = Rc::new(converter);
        let binding = TextBinding {
            control: Rc::clone(control),
            output: Rc::clone(&output),
            input: Rc::new(input),
            converter: Rc::clone(&converter),
            connection: None,
        };
        let setter = text_setter(control, converter);
        self.bind_two_way(move || output(), setter, binding);
    }

    /// Bind the text of a read-only `control` to a model value.
    pub fn bind_label<C, T, V>(
        &mut self,
        control: &Rc<C>,
        output: impl Fn() -> T + 'static,
        converter: V,
    ) where
        C: TextControl + 'static,
        T: Clone + 'static,
        V: ValueConverter<String, T> + 'static,
    {
        self.bind(output, text_setter(control, Rc::new(converter)));
    }
}

fn text_setter<C, T, V>(control: &Rc<C>, converter: Rc<V>) -> impl Fn(T) + 'static
where
    C: TextControl + 'static,
    T: 'static,
    V: ValueConverter<String, T> + 'static,
{
    let control = Rc::clone(control);
    move |data: T| {
        if !control.has_focus() {
            control.set_text(&converter.convert_output(&data));
        }
    }
}
