// Copyright 2025 the Vigil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Alternative [`SpatialBackend`](crate::SpatialBackend) implementations.

mod flatvec;

pub use flatvec::FlatVec;
