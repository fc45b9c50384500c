//! Numeric value binding for steppers, sliders and similar controls that
//! display an `f64`.

use crate::binding::{BindingManager, ConnectionId, InputSubscription};
use crate::convert::ValueConverter;
use std::rc::{Rc, Weak};

/// What a numeric control adapter must provide to be bound.
pub trait ValueControl {
    fn value(&self) -> f64;
    fn set_value(&self, value: f64);
    /// Connect a handler that runs whenever the user changes the value.
    fn connect(&self, handler: Rc<dyn Fn()>) -> ConnectionId;
    fn disconnect(&self, connection: ConnectionId);
}

struct ValueBinding<C, T, V> {
    control: Rc<C>,
    input: Rc<dyn Fn(T)>,
    converter: Rc<V>,
    connection: Option<ConnectionId>,
}

impl<C, T, V> InputSubscription for ValueBinding<C, T, V>
where
    C: ValueControl + 'static,
    T: 'static,
    V: ValueConverter<f64, T> + 'static,
{
    fn subscribe(&mut self) {
        if self.connection.is_some() {
            return;
        }
        let control: Weak<C> = Rc::downgrade(&self.control);
        let input = Rc::clone(&self.input);
        let converter = Rc::clone(&self.converter);
        let handler = move || {
            if let Some(control) = control.upgrade() {
                input(converter.convert_input(&control.value()));
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
    /// Two-way bind the value of `control` to a model value.
    ///
    /// Use [`Identity`](crate::Identity) for `f64` models and
    /// [`Truncate`](crate::Truncate) for `i32` models.
    pub fn bind_value<C, T, V>(
        &mut self,
        control: &Rc<C>,
        output: impl Fn() -> T + 'static,
        input: impl Fn(T) + 'static,
        converter: V,
    ) where
        C: ValueControl + 'static,
        T: Clone + 'static,
        V: ValueConverter<f64, T> + 'static,
    {
        let converter = Rc::new(converter);
        let binding = ValueBinding {
            control: Rc::clone(control),
            input: Rc::new(input),
            converter: Rc::clone(&converter),
            connection: None,
        };
        let target = Rc::clone(control);
        self.bind_two_way(
            output,
            move |data: T| target.set_value(converter.convert_output(&data)),
            binding,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::{Identity, Truncate};
    use crate::test_support::init_scheduler;
    use crate::Observable;
    use std::cell::{Cell, RefCell};

    #[derive(Default)]
    struct FakeStepper {
        value: Cell<f64>,
        writes: Cell<usize>,
        handlers: RefCell<Vec<(ConnectionId, Rc<dyn Fn()>)>>,
    }

    impl FakeStepper {
        fn step_to(&self, value: f64) {
            self.value.set(value);
            let handlers: Vec<_> = self
                .handlers
                .borrow()
                .iter()
                .map(|(_, handler)| Rc::clone(handler))
                .collect();
            for handler in handlers {
                handler();
            }
        }
    }

    impl ValueControl for FakeStepper {
        fn value(&self) -> f64 {
            self.value.get()
        }

        fn set_value(&self, value: f64) {
            self.writes.set(self.writes.get() + 1);
            self.value.set(value);
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

    fn bind_model<T, V>(stepper: &Rc<FakeStepper>, model: &Observable<T>, converter: V) -> BindingManager
    where
        T: Clone + PartialEq + Send + Sync + 'static,
        V: ValueConverter<f64, T> + 'static,
    {
        let mut bindings = BindingManager::new();
        bindings.bind_value(
            stepper,
            {
                let model = model.clone();
                move || model.get()
            },
            {
                let model = model.clone();
                move |value| model.set(value)
            },
            converter,
        );
        bindings
    }

    #[test]
    fn test_integer_model_truncates_input() {
        init_scheduler();
        let stepper = Rc::new(FakeStepper::default());
        let quantity = Observable::new(3);
        let mut bindings = bind_model(&stepper, &quantity, Truncate);
        assert_eq!(stepper.value(), 3.0);

        stepper.step_to(4.7);
        assert_eq!(quantity.get(), 4);
        assert_eq!(stepper.value(), 4.0);

        quantity.set(-2);
        assert_eq!(stepper.value(), -2.0);

        bindings.unbind();
        assert!(stepper.handlers.borrow().is_empty());
        stepper.step_to(9.0);
        assert_eq!(quantity.get(), -2);
    }

    #[test]
    fn test_float_model_passes_through() {
        init_scheduler();
        let stepper = Rc::new(FakeStepper::default());
        let volume = Observable::new(0.5);
        let _bindings = bind_model(&stepper, &volume, Identity);
        assert_eq!(stepper.value(), 0.5);

        stepper.step_to(0.75);
        assert_eq!(volume.get(), 0.75);
        let writes = stepper.writes.get();

        stepper.step_to(0.75);
        assert_eq!(stepper.writes.get(), writes);
    }
}
