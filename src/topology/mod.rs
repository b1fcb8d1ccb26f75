//! Mesh topology: identifiers, entities, edges and the scope hierarchy.

pub mod edge;
pub mod entity;
pub mod hierarchy;
pub mod id;
pub mod validation;
