//! CLI domain: parse, route and output only.
//! No pipeline logic; the route table drives the orchestrators.

mod output;
mod parse;
mod route;

pub use output::{format_suggestions, map_error, TextRenderer};
pub use parse::{Cli, Commands, StreamFormat};
pub use route::RunContext;
