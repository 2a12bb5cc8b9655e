mod target;
mod validator;

pub use target::{change_target, create_target, NewTarget, TargetPatch};
pub use validator::Validator;
