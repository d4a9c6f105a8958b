use clap::Parser;

/// OAuth relay for static-site CMS editors signing in with GitHub
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<String>,

    /// Listen address (overrides config file and environment)
    #[arg(long)]
    pub host: Option<String>,

    /// Listen port (overrides config file and environment)
    #[arg(short, long)]
    pub port: Option<u16>,
}
