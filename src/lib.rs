pub mod config;
pub mod dataset;
pub mod diagram;
pub mod estimator;
pub mod historical;
pub mod particle;
pub mod query;
pub mod sampler;
pub mod signals;
pub mod state;
pub mod win_prob;
pub mod worker;
