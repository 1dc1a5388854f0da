pub mod binding_domains;
pub mod cascade;
pub mod classifier;
pub mod pipeline;
pub mod trivial;
