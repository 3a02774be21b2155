//! Catalog (DAT) and header-rule parsing.

pub mod dat;
pub mod error;
pub mod header;

pub use dat::{DatFile, DatGame, DatRelease, DatRom, parse_dat, parse_dat_file};
pub use error::DatError;
pub use header::{HeaderRule, HeaderRules, Operation, RuleTest, parse_rules, parse_rules_file};
