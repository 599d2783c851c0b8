// # Participant Resolver Implementations
//
// The live PostgreSQL resolver lives in the `replay-roster-postgres` crate;
// this module only carries the fixed-mapping resolver used for development
// and tests.

pub mod fixed;

pub use fixed::{FixedParticipantResolver, FixedParticipantResolverFactory};
