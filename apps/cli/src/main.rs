// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Floornet CLI - skeleton-to-network build pipeline.
//!
//! # Commands
//!
//! - `floornet build` - enrich, lift and merge floors, then rebuild topology
//! - `floornet rebuild` - full topology rebuild of an existing store
//! - `floornet status` - source size, merged floors and graph state
//! - `floornet floors` - list the floor registry

mod commands;
mod config;

use anyhow::Result;
use clap::Parser;

use commands::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli)
}
