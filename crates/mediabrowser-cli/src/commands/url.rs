use clap::Args;
use mediabrowser_blob::BlobStore;
use tracing::info;

use super::BlobArgs;

#[derive(Args)]
pub struct UrlCommand {
    /// Object name, e.g. `photos/2024/beach.jpg`
    pub name: String,

    #[command(flatten)]
    pub blob: BlobArgs,
}

impl UrlCommand {
    pub fn execute(self) -> anyhow::Result<()> {
        let config = self.blob.config()?;
        let name = self.name.trim_start_matches('/').to_string();

        let rt = tokio::runtime::Runtime::new()?;
        let file = rt.block_on(async {
            let store = BlobStore::google(&config).await?;
            store.file(&name).await
        })?;

        info!(
            "Signed URL for {} valid for {}s",
            name,
            config.signed_url_ttl.as_secs()
        );
        println!("{}", file.path);
        Ok(())
    }
}
