//! Schemas under `schemas/` compiled by the build script, so the generated
//! routines are built and tested like hand-written code.

#[allow(dead_code, unused, clippy::all)]
pub mod demo {
    include!(concat!(env!("OUT_DIR"), "/demo.rs"));
}
