//! regsweep CLI - container registry retention sweeps.

pub mod commands;
pub mod output;
