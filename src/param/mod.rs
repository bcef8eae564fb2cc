//! @ai:module:intent Hyperparameter definitions, values and search designs
//! @ai:module:layer domain
//! @ai:module:public_api Param, ParamKind, ParamValue, ParamConfig, ParamSet, format_config

pub mod set;
pub mod value;

pub use set::ParamSet;
pub use value::{format_config, Param, ParamConfig, ParamKind, ParamValue};
