//! CNN architecture served by the Burn classifier runtime

pub mod cnn;

pub use cnn::{PlantClassifier, PlantClassifierConfig};
