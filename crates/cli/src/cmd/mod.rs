mod check;
mod emit;

pub use check::cmd_check;
pub use emit::cmd_emit;
