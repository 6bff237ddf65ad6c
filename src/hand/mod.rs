//! Hand landmarks, geometric features and sign classification

pub mod classifier;
pub mod features;
pub mod fixtures;
pub mod landmark;

pub use classifier::{
    classify, Classifier, FlatHandClassification, HandClassification, Sign, SignClassification,
};
pub use features::{BoundingBox, FeatureSet};
pub use landmark::{Finger, Frame, Hand, Handedness, InputError, Landmark, Vec3};
