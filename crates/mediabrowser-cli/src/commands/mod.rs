mod blob_args;
pub mod list;
pub mod serve;
pub mod url;

pub use blob_args::BlobArgs;
pub use list::ListCommand;
pub use serve::ServeCommand;
pub use url::UrlCommand;
