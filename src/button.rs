//! Command binding for push buttons.

use crate::binding::{BindingManager, ConnectionId, InputSubscription};
use std::rc::Rc;

/// What a button adapter must provide to be bound.
pub trait ButtonControl {
    fn set_enabled(&self, enabled: bool);
    /// Connect a handler that runs on every press.
    fn connect(&self, handler: Rc<dyn Fn()>) -> ConnectionId;
    fn disconnect(&self, connection: ConnectionId);
}

struct CommandBinding<C> {
    control: Rc<C>,
    action: Rc<dyn Fn()>,
    connection: Option<ConnectionId>,
}

impl<C: ButtonControl> InputSubscription for CommandBinding<C> {
    fn subscribe(&mut self) {
        if self.connection.is_none() {
            self.connection = Some(self.control.connect(Rc::clone(&self.action)));
        }
    }

    fn unsubscribe(&mut self) {
        if let Some(connection) = self.connection.take() {
            self.control.disconnect(connection);
        }
    }
}

impl BindingManager {
    /// Run `action` whenever `control` is pressed.
    pub fn bind_command<C>(&mut self, control: &Rc<C>, action: impl Fn() + 'static)
    where
        C: ButtonControl + 'static,
    {
        self.bind_input(CommandBinding {
            control: Rc::clone(control),
            action: Rc::new(action),
            connection: None,
        });
    }

    /// Run `action` whenever `control` is pressed, and keep the control
    /// enabled exactly while `condition` holds.
    pub fn bind_command_when<C>(
        &mut self,
        control: &Rc<C>,
        action: impl Fn() + 'static,
        condition: impl Fn() -> bool + 'static,
    ) where
        C: ButtonControl + 'static,
    {
        let input = CommandBinding {
            control: Rc::clone(control),
            action: Rc::new(action),
            connection: None,
        };
        let target = Rc::clone(control);
        self.bind_two_way(condition, move |enabled| target.set_enabled(enabled), input);
    }
}
