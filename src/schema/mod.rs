pub mod columns;
pub mod ddl;
pub mod ident;

pub use columns::*;
pub use ddl::*;
pub use ident::*;
