mod discard;
mod exec;
mod multi;

pub use discard::{DiscardArguments, discard};
pub use exec::{ExecArguments, exec, run_transaction_commands};
pub use multi::{MultiArguments, multi};
