//! # packsync
//!
//! This library keeps a set of git-hosted packages installed, up to date,
//! and initialized in dependency order. It is designed to be used by the
//! `packsync` command-line tool but can be embedded by any host that wants
//! to declare packages programmatically and attach its own hooks.
//!
//! ## Quick Example
//!
//! ```
//! use packsync::config::Settings;
//! use packsync::manager::Manager;
//! use packsync::spec::Spec;
//!
//! let manager = Manager::from_specs(
//!     Settings::default(),
//!     vec![
//!         Spec::new("owner/app").requires(Spec::new("owner/lib")),
//!         Spec::new("owner/tool").disable(true),
//!     ],
//! )
//! .unwrap();
//!
//! // the root plus three packages
//! assert_eq!(manager.graph().len(), 4);
//! assert!(!manager.graph().package("owner/tool").unwrap().enabled);
//! ```
//!
//! ## Core Concepts
//!
//! - **Declarations (`spec`, `config`)**: packages are declared with an
//!   identity (`owner/name`), optional overrides, hooks, and `requires` /
//!   `wants` edges. Declarations of the same identity merge into one node.
//! - **Graph (`graph`, `cycle`)**: an arena of packages linked in both
//!   directions and rooted at a synthetic node for the manager itself.
//!   Cycles are rejected up front.
//! - **Propagation (`scheduler`, `hooks`, `activate`)**: two top-down sweeps,
//!   configure then load, that run each package's hooks only after all its
//!   dependencies completed the same sweep.
//! - **Sync (`sync`, `git`, `clean`, `filesystem`)**: every package is cloned
//!   or updated concurrently; once all jobs are done, stale clones are removed
//!   and the sweeps re-run over whatever changed.
//! - **Manager (`manager`, `report`)**: the context owning one graph and its
//!   collaborators, plus read-only views for status output.
//!
//! ## Execution Flow
//!
//! 1.  **Build**: merge declarations, check for cycles, finalize the graph.
//! 2.  **Sync**: install, update, or skip every package concurrently.
//! 3.  **Clean**: delete base-directory entries no package claims.
//! 4.  **Configure**: run setup and configure hooks in dependency order.
//! 5.  **Load**: run load hooks in dependency order.

pub mod activate;
pub mod clean;
pub mod config;
pub mod cycle;
pub mod defaults;
pub mod error;
pub mod filesystem;
pub mod git;
pub mod graph;
pub mod hooks;
pub mod manager;
pub mod output;
pub mod package;
pub mod report;
pub mod scheduler;
pub mod spec;
pub mod suggestions;
pub mod sync;

mod graph_proptest;
