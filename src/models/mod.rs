pub mod catalog;
pub mod query;
pub mod quote;
pub mod row;
pub mod run;

pub use catalog::*;
pub use query::*;
pub use quote::*;
pub use row::*;
pub use run::*;
