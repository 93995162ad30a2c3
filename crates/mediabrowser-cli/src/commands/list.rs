use clap::Args;
use mediabrowser_blob::{BlobStore, File};
use tracing::debug;

use super::BlobArgs;

#[derive(Args)]
pub struct ListCommand {
    /// Directory prefix to list; the bucket root when omitted
    #[arg(default_value = "")]
    pub prefix: String,

    /// Print entries as JSON
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub blob: BlobArgs,
}

impl ListCommand {
    pub fn execute(self) -> anyhow::Result<()> {
        let config = self.blob.config()?;
        let prefix = self.prefix.trim_start_matches('/').to_string();

        let rt = tokio::runtime::Runtime::new()?;
        let files = rt.block_on(async {
            let store = BlobStore::google(&config).await?;
            debug!("Listing gs://{}/{}", config.bucket_name, prefix);
            store.files(&prefix).await
        })?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&files)?);
        } else {
            for file in &files {
                println!("{}", format_entry(file));
            }
        }
        Ok(())
    }
}

fn format_entry(file: &File) -> String {
    if file.is_directory {
        return format!("{:>10}  {:16}  {}", "-", "", file.path);
    }
    let size = file
        .size
        .map(|size| size.to_string())
        .unwrap_or_else(|| "-".to_string());
    let modified = file
        .last_modified
        .map(|ts| ts.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default();
    format!("{:>10}  {:16}  {}", size, modified, file.path)
}
