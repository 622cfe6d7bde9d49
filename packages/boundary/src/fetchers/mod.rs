//! Parcel fetchers.
//!
//! [`arcgis::ParcelFetcher`] queries a live cadastral `FeatureServer`.
//! [`synthetic::SyntheticParcels`] fabricates parcels in the same
//! attribute schema. Both return [`crate::BoundaryLookup`]s of raw
//! features for [`crate::normalize`] to consume.

pub mod arcgis;
pub mod synthetic;
