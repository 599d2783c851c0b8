// # Fixed Participant Resolver
//
// Deterministic resolver backed by a hard-coded round → players mapping.
//
// ## When to Use
//
// - Local development without access to the game database
// - Tests that need predictable rosters

use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use uuid::Uuid;

use crate::Error;
use crate::config::ResolverConfig;
use crate::traits::participant_resolver::{ParticipantResolver, ParticipantResolverFactory};

/// Round that has a participant in the development roster
pub const DEVELOPMENT_ROUND: u32 = 1;

/// The single player of [`DEVELOPMENT_ROUND`] in the development roster
pub const DEVELOPMENT_PLAYER: Uuid = Uuid::from_u128(0x0f80cf86_fdc6_4fc1_a075_4d872578b3cc);

/// Resolver returning participants from a fixed mapping
///
/// Rounds without a mapping resolve to an empty set.
#[derive(Debug, Clone, Default)]
pub struct FixedParticipantResolver {
    rounds: HashMap<u32, BTreeSet<Uuid>>,
}

impl FixedParticipantResolver {
    /// Create a resolver where every round is empty
    pub fn new() -> Self {
        Self::default()
    }

    /// The development roster: round 1 has one known player, all other rounds none
    pub fn development() -> Self {
        Self::new().with_round(DEVELOPMENT_ROUND, [DEVELOPMENT_PLAYER])
    }

    /// Add (or replace) the participants of a round
    pub fn with_round(mut self, round_number: u32, players: impl IntoIterator<Item = Uuid>) -> Self {
        self.rounds
            .insert(round_number, players.into_iter().collect());
        self
    }
}

#[async_trait]
impl ParticipantResolver for FixedParticipantResolver {
    async fn resolve(&self, round_number: u32) -> Result<BTreeSet<Uuid>, Error> {
        Ok(self.rounds.get(&round_number).cloned().unwrap_or_default())
    }

    fn resolver_name(&self) -> &'static str {
        "development"
    }
}

/// Factory for creating the development resolver
pub struct FixedParticipantResolverFactory;

impl ParticipantResolverFactory for FixedParticipantResolverFactory {
    fn create(&self, config: &ResolverConfig) -> Result<Box<dyn ParticipantResolver>, Error> {
        match config {
            ResolverConfig::Development => Ok(Box::new(FixedParticipantResolver::development())),
            other => Err(Error::config(format!(
                "Development resolver cannot be created from {} configuration",
                other.type_name()
            ))),
        }
    }
}
