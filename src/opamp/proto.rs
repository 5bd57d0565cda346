//! Generated bindings for `proto/opamp.proto`, compiled by `build.rs`.

include!(concat!(env!("OUT_DIR"), "/tinyolly.opamp.v1.rs"));
