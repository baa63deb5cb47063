mod builder;
mod scheduler;
mod worker;

pub use builder::SchedulerBuilder;
pub use scheduler::Scheduler;
