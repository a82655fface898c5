mod decision;
mod runner;
mod supervisor;
mod worker;

pub use decision::{Route, RoutingDecision, interpret_reply, strip_code_fence};
pub use runner::{LoopRun, run_loop};
pub use supervisor::Supervisor;
pub use worker::{WorkerAgent, WorkerOutcome};
