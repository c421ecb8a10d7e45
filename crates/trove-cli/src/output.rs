//! Manifest rendering for the terminal

use anyhow::Result;
use clap::ValueEnum;
use trove_asset::{AssetType, Manifest};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

pub fn print_manifest(manifest: &Manifest, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => print!("{}", render_table(manifest)),
        OutputFormat::Json => print!("{}", manifest.to_json_string()?),
    }
    Ok(())
}

/// One section per asset type, one row per version
pub fn render_table(manifest: &Manifest) -> String {
    let mut out = String::new();
    for asset_type in AssetType::ALL {
        let rows: Vec<_> = manifest.assets_of(asset_type).collect();
        out.push_str(&format!("{} ({})\n", asset_type, rows.len()));
        if rows.is_empty() {
            out.push_str("  (none)\n");
            continue;
        }

        let name_width = rows.iter().map(|a| a.name.len()).max().unwrap_or(0).max(4);
        out.push_str(&format!(
            "  {:<name_width$}  {:<9}  {:<13}  {:<10}  {}\n",
            "NAME", "VERSION", "STATUS", "AUTHOR", "MESSAGE"
        ));
        for asset in rows {
            out.push_str(&format!(
                "  {:<name_width$}  {:<9}  {:<13}  {:<10}  {}\n",
                asset.name,
                asset.version.to_string(),
                asset.status.to_string(),
                asset.author.as_deref().unwrap_or("-"),
                asset.message.as_deref().unwrap_or("-"),
            ));
        }
    }
    out
}
