pub mod checkpoint_store;
pub mod failure_writer;
pub mod interaction_runner;
pub mod transfer_gateway;

pub use checkpoint_store::{Checkpoint, CheckpointStore, JsonCheckpointStore};
pub use failure_writer::FailureWriter;
pub use interaction_runner::{InteractionDriver, ScriptRunner};
pub use transfer_gateway::TransferGateway;
