//! @ai:module:intent Columnar data storage shared by task views
//! @ai:module:layer domain
//! @ai:module:public_api Column, ColumnType, DataBackend, load_csv, read_csv

pub mod backend;
pub mod column;
pub mod io;

pub use backend::DataBackend;
pub use column::{Column, ColumnType};
pub use io::{load_csv, read_csv};
