//! # Tree Command Implementation
//!
//! Displays the declared packages as a tree: each package appears under the
//! packages it depends on, starting from `packsync` itself. A package that
//! was already expanded elsewhere is marked with `(*)`.
//!
//! This command is a safe, read-only operation that does not touch the disk.

use anyhow::Result;
use clap::Args;
use ptree::{print_tree, TreeItem};
use std::borrow::Cow;

use packsync::report::{dependency_tree, TreeNode};

use super::ConfigArgs;

/// Display the package dependency tree
#[derive(Args, Debug)]
pub struct TreeArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Maximum depth to display in the tree.
    ///
    /// If not specified, displays the full tree.
    /// Use 0 to show only the root, 1 for top-level packages, etc.
    #[arg(long, value_name = "NUM")]
    pub depth: Option<usize>,
}

/// Execute the `tree` command.
pub fn execute(args: TreeArgs) -> Result<()> {
    let manager = args.config.manager()?;
    let tree = dependency_tree(manager.graph(), args.depth.unwrap_or(usize::MAX));
    print_tree(&Printable(tree)).map_err(|e| anyhow::anyhow!("Failed to display tree: {}", e))?;
    Ok(())
}

/// Adapter between the library tree and ptree.
#[derive(Clone)]
struct Printable(TreeNode);

impl TreeItem for Printable {
    type Child = Printable;

    fn write_self<W: std::io::Write>(
        &self,
        f: &mut W,
        style: &ptree::Style,
    ) -> std::io::Result<()> {
        write!(f, "{}", style.paint(&self.0.label))
    }

    fn children(&self) -> Cow<'_, [Self::Child]> {
        Cow::from(
            self.0
                .children
                .iter()
                .cloned()
                .map(Printable)
                .collect::<Vec<_>>(),
        )
    }
}
