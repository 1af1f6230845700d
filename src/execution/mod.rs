//! Workload execution: the executable algebra, engines and output mapping

pub mod engine;
pub mod executable;
pub mod mapper;
pub mod registry;

pub use engine::{failure_step, send_failure_event, ExecutableEngine, WorkloadEngine};
pub use executable::{
    from_fn, identity, send_event, BoxedExecutable, Executable, ExecutableExt, Outcome,
};
pub use mapper::{MapperKind, OutputToInputMapper};
pub use registry::EngineRegistry;
