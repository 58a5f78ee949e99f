//! Domain types and models

pub mod object;
pub mod scope;
pub mod scoped_key;

pub use object::{ObjectLocation, ObjectRef, Route};
pub use scope::Scope;
pub use scoped_key::{ContentKey, ScopedKey};
