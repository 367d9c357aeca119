//! Trigger-indexed tool registry.
//!
//! Tools register under their function name with a set of trigger keywords
//! and an optional predicate. The registry answers two questions for the
//! orchestration layer: which tools are candidates for a given user message,
//! and how to run one by name once the backend asks for it.

mod args;
mod error;
mod registry;
mod tool;

pub mod prelude {
    pub use crate::{
        FunctionCallback, ToolCallback, ToolError, ToolErrorKind, ToolFuture, ToolRegistration,
        ToolRegistry, ToolTrigger,
    };
}

pub use args::{parse_json_object, parse_json_value, required_string};
pub use error::{ToolError, ToolErrorKind};
pub use registry::ToolRegistry;
pub use tool::{
    FunctionCallback, ToolCallback, ToolFuture, ToolRegistration, ToolTrigger, TriggerPredicate,
};
