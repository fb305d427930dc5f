mod incr;
mod transaction;
mod type_command;
mod wait;
mod xadd;
mod xread;
