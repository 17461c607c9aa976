use std::path::Path;

use comfy_table::{ContentArrangement, Table};

/// Print a table of the stories under `dir`.
pub fn run(dir: &Path) -> Result<(), String> {
    let library = super::load_library(dir)?;

    if library.is_empty() {
        println!("  No stories found.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["ID", "Title", "Author", "Language", "Nodes"]);

    for story in library.stories() {
        let manifest = &story.manifest;
        table.add_row(vec![
            manifest.id.clone(),
            manifest.title.clone(),
            manifest.author_name.clone().unwrap_or_else(|| "-".to_string()),
            manifest.language.clone(),
            story.nodes.len().to_string(),
        ]);
    }

    println!("{table}");
    println!();
    println!("  {} stories", library.len());

    Ok(())
}
