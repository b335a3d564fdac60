//! Name matching: key normalization, title classification and channel resolution

pub mod classifier;
pub mod normalize;
pub mod resolver;

pub use classifier::ProgrammeClassifier;
pub use normalize::KeyNormalizer;
pub use resolver::{ChannelResolver, EpgKeyIndex};
