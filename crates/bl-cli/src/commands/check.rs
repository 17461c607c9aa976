use std::path::Path;

use bl_core::StoryLibrary;
use colored::Colorize;

/// Validate every story under `dir`; fails when any issue is found.
pub fn run(dir: &Path) -> Result<(), String> {
    let issues = StoryLibrary::validate_dir(dir).map_err(|e| e.to_string())?;

    if !issues.is_empty() {
        for issue in &issues {
            eprintln!("  {} {issue}", "error:".red().bold());
        }
        let n = issues.len();
        return Err(format!("{n} issue{} found", if n == 1 { "" } else { "s" }));
    }

    let library = super::load_library(dir)?;
    let nodes: usize = library.stories().map(|s| s.nodes.len()).sum();
    println!("  All checks passed.");
    println!("  {} stories, {nodes} nodes", library.len());

    Ok(())
}
