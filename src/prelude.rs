pub use crate::{cmd::Flow, state::State};
