//! Polarized light through optical benches.
//!
//! States are Jones vectors while fully polarized and Stokes vectors
//! otherwise; elements carry both a Jones and a Mueller operator derived from
//! one convention. A [`bench::Bench`] threads light from emitters through a
//! graph of components and books every unit of intensity in [`powers::Powers`].

pub mod analyzer;
pub mod api;
pub mod batch;
pub mod bench;
pub mod bridge;
pub mod complex;
pub mod component;
pub mod config;
pub mod element;
pub mod error;
pub mod fresnel;
pub mod jones;
pub mod material;
pub mod mueller;
pub mod output;
pub mod powers;
pub mod result;
pub mod segment;
pub mod sensor;
pub mod settings;
pub mod snapshot;
pub mod snell;
pub mod splitter;
pub mod state;
pub mod stokes;
pub mod validator;
