//! Opaque module handles.
//!
//! The library-loading system is an external collaborator; this crate only
//! needs a cloneable handle it can box behind a slot.

use std::any::Any;
use std::sync::Arc;

#[derive(Clone)]
pub struct Module {
    node: Arc<ModuleNode>,
}

struct ModuleNode {
    name: String,
    payload: Box<dyn Any>,
}

impl Module {
    pub fn new<T: Any>(name: &str, payload: T) -> Module {
        Module {
            node: Arc::new(ModuleNode {
                name: name.to_string(),
                payload: Box::new(payload),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.node.name
    }

    /// Access the loader-defined payload, if it is of type `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.node.payload.downcast_ref::<T>()
    }
}
