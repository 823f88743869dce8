//! Drafting pipeline for normdraft.
//!
//! Ties the completion service to the three generation steps (requirement
//! extraction, structure proposal, section drafting) and sequences them
//! through the review-gated [`wizard::Wizard`].

pub mod assembler;
pub mod corpus;
pub mod drafter;
pub mod oneshot;
pub mod prompts;
pub mod requirements;
pub mod sanitize;
pub mod structure;
pub mod wizard;

#[cfg(test)]
mod testing;

pub use drafter::{DraftProgress, SilentProgress};
pub use wizard::{Advance, GateError, IntakeRequest, PipelineState, Stage, Wizard};
