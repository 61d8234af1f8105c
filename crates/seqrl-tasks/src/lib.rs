//! Reference tasks for seqrl.
//!
//! Provides cheap, deterministic scoring oracles for testing and
//! benchmarking the training loop:
//! - `TargetSimilarity` - Bigram overlap with a target string
//! - `LengthTarget` - Closeness to a target length
//! - `TokenFraction` - Share of characters from a given set
//! - `Flaky` - Wrapper injecting transient failures

mod flaky;
mod fraction;
mod length;
mod similarity;
mod smiles;

pub use flaky::Flaky;
pub use fraction::TokenFraction;
pub use length::LengthTarget;
pub use similarity::TargetSimilarity;
pub use smiles::{smiles_vocabulary, SMILES_TOKENS};

use seqrl::oracle::Oracle;
use seqrl::training::Registry;
use seqrl::{Result, SeqRlError};

/// Aspirin, the default similarity target
pub const ASPIRIN: &str = "CC(=O)Oc1ccccc1C(=O)O";

/// Names accepted by [`task_by_name`]
pub const TASK_NAMES: &[&str] = &["similarity", "length", "carbon", "flaky"];

/// Build a reference oracle by name.
pub fn task_by_name(name: &str) -> Result<Box<dyn Oracle>> {
    match name {
        "similarity" => Ok(Box::new(TargetSimilarity::new(ASPIRIN))),
        "length" => Ok(Box::new(LengthTarget::new(24, 8.0)?)),
        "carbon" => Ok(Box::new(TokenFraction::new("Cc"))),
        "flaky" => Ok(Box::new(
            Flaky::new(TargetSimilarity::new(ASPIRIN), 0.2, 0)?,
        )),
        _ => Err(SeqRlError::Config(format!(
            "unknown task {:?}, expected one of {:?}",
            name, TASK_NAMES
        ))),
    }
}

/// Register every reference oracle under its task name
pub fn register_tasks<P>(registry: &mut Registry<P>) -> Result<()> {
    for &name in TASK_NAMES {
        registry.register_oracle(name, move || task_by_name(name))?;
    }
    Ok(())
}
