mod common;
mod coordinator;
