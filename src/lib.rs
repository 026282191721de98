//! Historical orbital element archive.
//!
//! The [`aggregate`] module turns bulk GP history exports into a thinned,
//! time-bucketed archive plus a merged satellite catalog. The [`dataset`]
//! and [`position`] modules consume that archive at runtime: buckets are
//! loaded on demand around a query time and satellite positions are
//! interpolated between SGP4 anchor points.

pub mod aggregate;
pub mod archive;
pub mod catalog;
pub mod dataset;
pub mod position;
