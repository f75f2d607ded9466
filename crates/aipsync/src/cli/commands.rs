//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::record::Category;

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Check command arguments.
#[derive(Debug, Args)]
pub struct CheckCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Sync command arguments.
#[derive(Debug, Args)]
pub struct SyncCommand {
    /// Discard the local version and download everything again
    #[arg(short, long)]
    pub force: bool,
}

/// Airports command arguments.
#[derive(Debug, Args)]
pub struct AirportsCommand {
    /// Filter by ICAO code or name fragment
    pub query: Option<String>,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Charts command arguments.
#[derive(Debug, Args)]
pub struct ChartsCommand {
    /// ICAO code of the airport
    pub icao: String,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// List command arguments.
#[derive(Debug, Args)]
pub struct ListCommand {
    /// Category to list
    #[arg(value_enum)]
    pub category: ListCategory,

    /// Only show entries matching this keyword
    pub query: Option<String>,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Document categories that can be listed.
///
/// Aerodrome charts are browsed through `airports` and `charts` instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ListCategory {
    /// Enroute charts
    Enr,
    /// Amendments
    Amdt,
    /// Supplements
    Sup,
    /// NOTAM series
    Notam,
    /// Information circulars
    Aic,
}

impl From<ListCategory> for Category {
    fn from(arg: ListCategory) -> Self {
        match arg {
            ListCategory::Enr => Self::Enr,
            ListCategory::Amdt => Self::Amdt,
            ListCategory::Sup => Self::Sup,
            ListCategory::Notam => Self::Notam,
            ListCategory::Aic => Self::Aic,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_category_conversion() {
        assert_eq!(Category::from(ListCategory::Enr), Category::Enr);
        assert_eq!(Category::from(ListCategory::Amdt), Category::Amdt);
        assert_eq!(Category::from(ListCategory::Sup), Category::Sup);
        assert_eq!(Category::from(ListCategory::Notam), Category::Notam);
        assert_eq!(Category::from(ListCategory::Aic), Category::Aic);
    }

    #[test]
    fn test_list_category_values() {
        let names: Vec<_> = ListCategory::value_variants()
            .iter()
            .filter_map(|v| v.to_possible_value())
            .map(|v| v.get_name().to_string())
            .collect();
        assert_eq!(names, ["enr", "amdt", "sup", "notam", "aic"]);
    }

    #[test]
    fn test_sync_command_debug() {
        let cmd = SyncCommand { force: true };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("force"));
    }

    #[test]
    fn test_charts_command_debug() {
        let cmd = ChartsCommand {
            icao: "ZBAA".to_string(),
            json: false,
        };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("ZBAA"));
    }

    #[test]
    fn test_config_command_debug() {
        let cmd = ConfigCommand::Show { json: false };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("Show"));
    }
}
