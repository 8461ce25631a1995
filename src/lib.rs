pub mod calc_engine;
pub mod console;
pub mod format;
pub mod history;
pub mod style;

pub use calc_engine::{Engine, EvalError, Evaluator};
pub use console::{Console, Flow, MenuSelection};
pub use history::History;
pub use style::{Styler, Tag};
