pub mod assignment;
pub mod profile_store;
pub mod recommender;
pub mod scoring;
