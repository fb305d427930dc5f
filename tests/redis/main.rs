mod commands;
mod rdb;
