//! In-process SPIR-V module builder.
//!
//! [`ModuleBuilder`] owns a single module while it is populated: ids are allocated monotonically,
//! types and constants are interned by structure, instructions are appended to the one function
//! that is currently open and every operand is checked before it is used. Building consumes the
//! builder and serializes the sections in the order SPIR-V mandates.

mod arithmetic;
mod builder;
mod compare;
mod composite;
mod constant;
mod debug;
mod error;
mod function;
mod image;
mod item;
mod layout;
mod lookups;
mod memory;
mod module;
mod variable;

pub use arithmetic::GLSL_STD_450;
pub use builder::*;
pub use error::*;
pub use function::FunctionDef;
pub use item::*;
pub use layout::{Access, STORAGE_BUFFER_EXTENSION};
pub use module::*;
pub use variable::*;

pub use rspirv::spirv;
