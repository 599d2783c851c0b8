// # Participant Resolver Trait
//
// Defines the interface for looking up which players took part in a round.
//
// ## Implementations
//
// - Fixed mapping: `FixedParticipantResolver` in this crate (development, tests)
// - PostgreSQL roster view: `replay-roster-postgres` crate
//
// ## Usage
//
// ```rust,ignore
// use replay_core::ParticipantResolver;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let resolver = /* ParticipantResolver implementation */;
//
//     let players = resolver.resolve(42).await?;
//     println!("round 42 had {} players", players.len());
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::collections::BTreeSet;
use uuid::Uuid;

/// Trait for participant resolver implementations
///
/// # Failure Semantics
///
/// A resolver either returns the complete participant set for the round or an
/// error. Partial results are never returned: a dropped connection halfway
/// through reading rows is an error, not a shorter set.
///
/// Resolvers do not retry. The engine aborts the pass on the first error and
/// the whole pass is retried on the next trigger.
///
/// # Configuration
///
/// Missing configuration (for example an empty connection string) must be
/// reported from [`resolve`](ParticipantResolver::resolve) as
/// [`Error::Config`](crate::Error::Config), not from the constructor, so that a
/// misconfigured deployment still starts and keeps pruning the catalog.
#[async_trait]
pub trait ParticipantResolver: Send + Sync {
    /// Resolve the participants of a round
    ///
    /// # Returns
    ///
    /// - `Ok(BTreeSet<Uuid>)`: Every player of the round (possibly empty)
    /// - `Err(Error)`: If the roster could not be read
    async fn resolve(&self, round_number: u32) -> Result<BTreeSet<Uuid>, crate::Error>;

    /// Get the resolver name (for logging/debugging)
    fn resolver_name(&self) -> &'static str;
}

/// Helper trait for constructing participant resolvers from configuration
pub trait ParticipantResolverFactory: Send + Sync {
    /// Create a ParticipantResolver instance from configuration
    fn create(
        &self,
        config: &crate::config::ResolverConfig,
    ) -> Result<Box<dyn ParticipantResolver>, crate::Error>;
}
