/// `baseline check`
pub mod check;
/// `baseline list`
pub mod list;
/// `baseline play`
pub mod play;

use std::path::Path;

use bl_core::StoryLibrary;

/// Load every story under `dir`.
fn load_library(dir: &Path) -> Result<StoryLibrary, String> {
    StoryLibrary::load_dir(dir).map_err(|e| format!("cannot load stories from {}: {e}", dir.display()))
}
