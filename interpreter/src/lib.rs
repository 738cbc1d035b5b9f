pub mod codegen;
pub mod condition;
pub mod error;
pub mod executor;
pub mod script;
pub mod state;
pub mod value;

pub use codegen::generate_python;
pub use condition::Condition;
pub use error::ExecError;
pub use executor::Executor;
pub use script::{ScriptFault, ScriptReport};
pub use state::RunState;
pub use value::Value;
