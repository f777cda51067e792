//! Core genome traits
//!
//! The population, operators and GA engine are generic over
//! [`EvolutionaryGenome`].

use serde::{de::DeserializeOwned, Serialize};

/// Evolvable solution representation
///
/// Genomes must be cloneable, serializable and thread-safe so populations can
/// be evaluated in parallel. Equality is what the hall of fame deduplicates on.
pub trait EvolutionaryGenome:
    Clone + PartialEq + Send + Sync + Serialize + DeserializeOwned + 'static
{
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genome::program::Program;

    fn shareable<G: EvolutionaryGenome>(genome: &G) -> G {
        genome.clone()
    }

    #[test]
    fn test_program_is_a_genome() {
        let program = Program::new(vec![0, 2, 3]);
        assert_eq!(shareable(&program), program);
    }
}
