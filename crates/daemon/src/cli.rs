//! Command-line interface.

use std::path::PathBuf;

use clap::Parser;

/// Mount an object-storage bucket as a local filesystem.
///
/// Credentials and region come from the ambient environment (the standard
/// AWS configuration chain). Unmount with `umount <mountpoint>`.
#[derive(Parser, Debug)]
#[command(name = "silo", version)]
pub struct Cli {
    /// Trace every operation (path, resolved kind, sizes) to stderr.
    #[arg(short = 'd', long = "debug")]
    pub debug: bool,

    /// Directory to mount the bucket at.
    pub mountpoint: PathBuf,

    /// Name of the bucket to mount.
    pub bucket: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_mountpoint_and_bucket() {
        let cli = Cli::try_parse_from(["silo", "/mnt/data", "my-bucket"]).unwrap();
        assert!(!cli.debug);
        assert_eq!(cli.mountpoint, PathBuf::from("/mnt/data"));
        assert_eq!(cli.bucket, "my-bucket");
    }

    #[test]
    fn test_debug_flag() {
        let cli = Cli::try_parse_from(["silo", "-d", "/mnt/data", "my-bucket"]).unwrap();
        assert!(cli.debug);
    }

    #[test]
    fn test_rejects_wrong_argument_count() {
        assert!(Cli::try_parse_from(["silo", "/mnt/data"]).is_err());
        assert!(Cli::try_parse_from(["silo", "/mnt/data", "bucket", "extra"]).is_err());
    }
}
