//! Query construction: the filter tree, the predicate compiler, and the
//! statement builders layered on top of it.

pub mod builder;
pub mod compiler;
pub mod predicate;

pub use builder::{
    count_sql, delete_sql, exists_sql, insert_sql, select_sql, update_sql, SelectOptions,
};
pub use compiler::{compile, CompiledPredicate, ParamSet};
pub use predicate::{Connector, Operator};
