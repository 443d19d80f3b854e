//! Core types and utilities for facial fiducial localization.
//!
//! This crate is intentionally small and purely geometric. It does *not*
//! depend on any renderer, landmark detector or mesh file format.

mod geometry;
mod landmark;
mod logger;
mod mesh;
mod raycast;

pub use geometry::{
    rotate_about, CameraPose, CoordinateSystem, PoseError, Ray, DEFAULT_FOV_Y_DEG,
};
pub use landmark::{Candidate3D, LandmarkId};
pub use mesh::{Mesh, MeshError};
pub use raycast::{intersect_triangle, MeshRayCaster, RayHit};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{init_from_env, init_with_level, LOG_ENV};
