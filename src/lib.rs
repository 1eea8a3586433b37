#![doc = include_str!("../README.md")]

pub mod cli;
pub mod effect;
pub mod harmonize;
mod output;
pub mod pdb;
pub mod reference;
pub mod report;
pub mod smart_reader;
pub mod table;

pub use effect::EffectType;
pub use harmonize::{
    FlipReporter, HarmonizeConfig, HarmonizeError, HarmonizeSummary, RowEvent, SumstatsColumns,
    TracingReporter, flip_alleles, harmonize, harmonize_file,
};
pub use reference::{AllelePair, ReferenceColumns, ReferenceError, ReferenceIndex};
