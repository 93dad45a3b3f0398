pub mod boosting;
pub mod dataset;
pub mod ensemble;
pub mod features;
pub mod forest;
pub mod metrics;
pub mod predict;
pub mod preprocess;
pub mod ridge;
pub mod split;
pub mod tree;

pub use ensemble::{train_ensemble, EnsembleModel, Member, TrainOutcome, TrainParams};
pub use predict::{predict, Prediction};
