//! Extension object handles.
//!
//! The node system itself lives outside this crate; the dispatch layer
//! only boxes and unboxes a shared-ownership handle to it. Conversions to
//! concrete extension types are injected through [`FromNodeRef`].

use std::any::Any;
use std::sync::Arc;

/// Shared handle to an externally-defined, reference-counted extension
/// object. Cloning bumps the external reference count.
#[derive(Clone)]
pub struct NodeRef {
    node: Arc<dyn Any>,
}

impl NodeRef {
    pub fn new<T: Any>(payload: T) -> NodeRef {
        NodeRef {
            node: Arc::new(payload),
        }
    }

    pub fn is<T: Any>(&self) -> bool {
        self.node.is::<T>()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.node.downcast_ref::<T>()
    }

    /// Current external reference count.
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.node)
    }
}

/// Injectable conversion from a node handle to a concrete extension type.
/// Consulted only by the argument view's node accessor; implementations
/// decide how to fail on a wrong node type.
pub trait FromNodeRef: Sized {
    fn from_node_ref(node: &NodeRef) -> Self;
}
