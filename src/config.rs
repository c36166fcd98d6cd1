// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Runtime configuration resolved once from the command line.

use crate::Cli;
use heir_core::VmOptions;
use std::path::PathBuf;

const HISTORY_FILE: &str = ".heir_history";

/// Settings shared by the file runner and the REPL.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Print the syntax tree before running
    pub dump_ast: bool,
    /// Print the bytecode listing before running
    pub dump_bytecode: bool,
    /// Interpreter limits
    pub vm: VmOptions,
    /// Where the REPL keeps its history, if anywhere
    pub history_path: Option<PathBuf>,
}

impl Config {
    /// The default history location under the platform data directory.
    pub fn default_history_path() -> Option<PathBuf> {
        dirs::data_local_dir().map(|dir| dir.join("heir").join(HISTORY_FILE))
    }
}

impl From<&Cli> for Config {
    fn from(cli: &Cli) -> Self {
        let defaults = VmOptions::default();

        Self {
            dump_ast: cli.dump_ast,
            dump_bytecode: cli.dump_bytecode,
            vm: VmOptions {
                max_call_depth: cli.max_call_depth.unwrap_or(defaults.max_call_depth),
                step_limit: cli.step_limit.or(defaults.step_limit),
            },
            history_path: cli.history.clone().or_else(Self::default_history_path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["heir"]);
        let config = Config::from(&cli);

        assert_eq!(config.vm, VmOptions::default());
        assert!(!config.dump_ast);
        assert!(!config.dump_bytecode);
    }

    #[test]
    fn test_limits_from_flags() {
        let cli = Cli::parse_from(["heir", "--max-call-depth", "16", "--step-limit", "1000"]);
        let config = Config::from(&cli);

        assert_eq!(config.vm.max_call_depth, 16);
        assert_eq!(config.vm.step_limit, Some(1000));
    }

    #[test]
    fn test_history_override() {
        let cli = Cli::parse_from(["heir", "--history", "/tmp/heir-history"]);
        let config = Config::from(&cli);

        assert_eq!(config.history_path, Some(PathBuf::from("/tmp/heir-history")));
    }

    #[test]
    fn test_default_history_location() {
        if let Some(path) = Config::default_history_path() {
            assert!(path.ends_with("heir/.heir_history"));
        }
    }
}
