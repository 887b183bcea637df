// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod cli;
pub mod models;
pub mod error;
pub mod store;
pub mod buffer;
pub mod merge;
pub mod filter;
pub mod analytics;
pub mod remote;
pub mod session;
pub mod utils;
pub mod commands;
