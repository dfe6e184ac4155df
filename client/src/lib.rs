mod app;
mod dom;
mod net;
mod render;
mod state;
mod util;

pub use app::run;
