pub mod bugreport;
pub mod upload;
pub mod version;

pub const VERSION_SUBCOMMAND: &str = "version";
pub const VERSION_DESCRIPTION: &str = "Display the version, build information and upload defaults";

pub const BUGREPORT_SUBCOMMAND: &str = "bugreport";
pub const BUGREPORT_DESCRIPTION: &str = "Collect information about the system and the environment for bug reports";

pub const UPLOAD_SUBCOMMAND: &str = "upload";
pub const UPLOAD_DESCRIPTION: &str = "Upload one or more files into a bucket concurrently";

pub const URI_ENV: &str = "MUPLOAD_URI";
pub const TOKEN_ENV: &str = "MUPLOAD_TOKEN";
