pub mod alias;
pub mod mention;

pub use alias::{AliasTable, Currency};
pub use mention::{Mention, MentionTagger};
