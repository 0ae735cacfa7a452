use std::sync::{Arc, Weak};

/// Observer of a [`ModelBridge`](super::ModelBridge). Every call happens synchronously on
/// the thread that mutated the bridge, after the change is visible.
pub trait ModelDelegate {
    fn on_model_loaded(&self);
    fn on_model_updated(&self);
    fn on_expression_updated(&self, expression: &str);
    fn on_lip_sync_updated(&self, value: f32);
}

/// Holds at most one observer without keeping it alive.
#[derive(Default)]
pub struct DelegateSlot {
    target: Option<Weak<dyn ModelDelegate>>,
}

impl DelegateSlot {
    pub fn set(&mut self, delegate: Option<&Arc<dyn ModelDelegate>>) {
        self.target = delegate.map(Arc::downgrade);
    }

    pub fn get(&self) -> Option<Arc<dyn ModelDelegate>> {
        self.target.as_ref().and_then(Weak::upgrade)
    }

    pub fn is_attached(&self) -> bool {
        self.get().is_some()
    }

    /// Runs `f` against the observer if it is still alive.
    pub fn notify(&self, f: impl FnOnce(&dyn ModelDelegate)) {
        if let Some(delegate) = self.get() {
            f(delegate.as_ref());
        }
    }
}

#[cfg(test)]
pub(crate) mod counting {
    use super::*;
    use std::cell::RefCell;

    /// Records every notification it receives.
    #[derive(Default)]
    pub struct CountingDelegate {
        pub loaded: RefCell<usize>,
        pub updated: RefCell<usize>,
        pub expressions: RefCell<Vec<String>>,
        pub lip_sync: RefCell<Vec<f32>>,
    }

    impl CountingDelegate {
        pub fn total(&self) -> usize {
            *self.loaded.borrow()
                + *self.updated.borrow()
                + self.expressions.borrow().len()
                + self.lip_sync.borrow().len()
        }
    }

    impl ModelDelegate for CountingDelegate {
        fn on_model_loaded(&self) {
            *self.loaded.borrow_mut() += 1;
        }

        fn on_model_updated(&self) {
            *self.updated.borrow_mut() += 1;
        }

        fn on_expression_updated(&self, expression: &str) {
            self.expressions.borrow_mut().push(expression.to_string());
        }

        fn on_lip_sync_updated(&self, value: f32) {
            self.lip_sync.borrow_mut().push(value);
        }
    }
}
