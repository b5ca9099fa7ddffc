// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod commandline;
pub mod model;
pub mod state;

pub use commandline::*;
pub use model::*;
pub use state::*;
