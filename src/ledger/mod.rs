pub mod api;
pub mod memory;


pub use api::{
    Connection, EventKind, Instruction, ProgramClient, ProgramConnector, ProgramEvent, Signature,
    Subscription, SubscriptionId,
};
pub use memory::{FailurePoint, InMemoryLedger, InMemoryProgramClient};
