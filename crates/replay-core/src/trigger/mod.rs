// # Trigger Source Implementations
//
// The periodic timer lives here; filesystem notifications are provided by the
// `replay-trigger-notify` crate.

pub mod interval;

pub use interval::IntervalTrigger;
