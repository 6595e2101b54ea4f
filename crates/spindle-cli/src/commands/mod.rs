pub mod mock;
pub mod model;
pub mod run;

mod util;
