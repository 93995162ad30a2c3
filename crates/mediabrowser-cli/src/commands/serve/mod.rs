mod shutdown;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use mediabrowser_blob::{configure_routes, BasicAuthCredentials, BlobAppState, BlobStore};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use super::BlobArgs;
use shutdown::shutdown_signal;

#[derive(Args)]
pub struct ServeCommand {
    /// Interface to bind the server to
    #[arg(long, default_value = "0.0.0.0", env = "HOST")]
    pub host: String,

    /// Port to listen on
    #[arg(long, default_value_t = 8080, env = "PORT")]
    pub port: u16,

    /// Directory holding `favicon.ico`
    #[arg(long, default_value = ".", env = "STATIC_DIR")]
    pub static_dir: PathBuf,

    /// Basic auth username; auth is enabled only with a password as well
    #[arg(long, env = "WEB_USERNAME")]
    pub web_username: Option<String>,

    /// Basic auth password
    #[arg(long, env = "WEB_PASSWORD", hide_env_values = true)]
    pub web_password: Option<String>,

    #[command(flatten)]
    pub blob: BlobArgs,
}

impl ServeCommand {
    pub fn execute(self) -> anyhow::Result<()> {
        let config = self.blob.config()?;
        let credentials =
            BasicAuthCredentials::from_parts(self.web_username.clone(), self.web_password.clone());
        let address = format!("{}:{}", self.host, self.port);

        let rt = tokio::runtime::Runtime::new()?;
        rt.block_on(async move {
            debug!("Initializing Google Cloud clients...");
            let store = Arc::new(BlobStore::google(&config).await?);
            let state = Arc::new(BlobAppState::new(store, credentials));

            let app = configure_routes(state, &self.static_dir).layer(TraceLayer::new_for_http());

            let listener = TcpListener::bind(&address).await?;
            info!(
                "Media browser for bucket {} listening on {}",
                config.bucket_name, address
            );

            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;

            info!("Media browser stopped");
            Ok::<(), anyhow::Error>(())
        })
    }
}
