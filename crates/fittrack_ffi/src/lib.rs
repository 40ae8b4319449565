//! Flutter-facing bindings for FitTrack core.

pub mod api;
