//! Shared test harness modules for the mapvault CLI.

use super::*;

mod helpers;
