// cxxstub — C++ servant/handle stub generator
//
// Library root. Schema loading, model, naming and emission phases.

pub mod auxdata;
pub mod codegen;
pub mod config;
pub mod diag;
pub mod id;
pub mod identity;
pub mod inherit;
pub mod insertions;
pub mod model;
pub mod names;
pub mod pass;
pub mod pipeline;
pub mod quote;
pub mod schema;
pub mod scope;
pub mod templates;
