//! Numerical primitives for the water treatment core.

pub mod ode;
pub mod quadrature;
