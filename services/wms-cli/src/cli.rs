//! Command-line arguments.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use wms_protocol::GetMapParams;

use crate::config::CliConfig;

#[derive(Parser, Debug)]
#[command(name = "wms-cli")]
#[command(about = "Browse a Web Map Service: list layers, build GetMap URLs, fetch and segment maps")]
pub struct Cli {
    /// YAML configuration file
    #[arg(long, global = true, env = "WMS_CLI_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level, overridden by RUST_LOG
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the data layers advertised by a service
    Layers {
        /// WMS endpoint; falls back to server.base_url in the config file
        #[arg(long, env = "WMS_BASE_URL")]
        url: Option<String>,
    },

    /// Print the GetMap URL for the current view without fetching it
    Url(MapArgs),

    /// Fetch a map image and save it as PNG
    Fetch {
        #[command(flatten)]
        map: MapArgs,

        #[arg(short, long, default_value = "map.png")]
        output: PathBuf,
    },

    /// Fetch a map, segment it and save the class mask as PNG
    Segment {
        #[command(flatten)]
        map: MapArgs,

        #[arg(short, long, default_value = "mask.png")]
        output: PathBuf,

        /// Also save the fetched map here
        #[arg(long)]
        image_output: Option<PathBuf>,

        /// Intensity cut-off for the built-in threshold model
        #[arg(long)]
        threshold: Option<f32>,
    },
}

/// GetMap parameters plus view navigation.
#[derive(Args, Debug, Clone, Default)]
pub struct MapArgs {
    /// WMS endpoint; falls back to server.base_url in the config file
    #[arg(long, env = "WMS_BASE_URL")]
    pub url: Option<String>,

    /// Comma-separated layer names, drawn in the given order
    #[arg(long, value_delimiter = ',')]
    pub layers: Vec<String>,

    /// minx,miny,maxx,maxy
    #[arg(long, allow_hyphen_values = true)]
    pub bbox: Option<String>,

    #[arg(long)]
    pub crs: Option<String>,

    #[arg(long)]
    pub format: Option<String>,

    /// 1.1.0, 1.1.1 or 1.3.0
    #[arg(long = "wms-version")]
    pub version: Option<String>,

    #[arg(long)]
    pub width: Option<u32>,

    #[arg(long)]
    pub height: Option<u32>,

    #[arg(long)]
    pub transparent: bool,

    /// Zoom in this many steps before requesting
    #[arg(long, default_value_t = 0)]
    pub zoom_in: u32,

    /// Zoom out this many steps before requesting
    #[arg(long, default_value_t = 0)]
    pub zoom_out: u32,
}

/// `--url`, else the configured server.
pub fn base_url(url: Option<&str>, config: &CliConfig) -> Result<String> {
    match url.or(config.server.base_url.as_deref()) {
        Some(url) if !url.trim().is_empty() => Ok(url.trim().to_string()),
        _ => bail!("no WMS URL given; pass --url or set server.base_url in the config file"),
    }
}

impl MapArgs {
    /// Whether any zoom steps were requested.
    pub fn navigates(&self) -> bool {
        self.zoom_in > 0 || self.zoom_out > 0
    }

    /// Merge flags over the config file into request parameters.
    pub fn to_params(&self, config: &CliConfig) -> Result<GetMapParams> {
        let layers = if self.layers.is_empty() {
            config.server.layers.clone()
        } else {
            self.layers.clone()
        };

        Ok(GetMapParams {
            base_url: base_url(self.url.as_deref(), config)?,
            layers,
            bbox: self.bbox.clone(),
            crs: self.crs.clone(),
            format: self.format.clone(),
            version: self.version.clone(),
            width: self.width,
            height: self.height,
            transparent: self.transparent.then_some(true),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_url_command() {
        let cli = Cli::try_parse_from([
            "wms-cli",
            "url",
            "--url",
            "http://h/wms",
            "--layers",
            "a,b",
            "--bbox",
            "-10,-5,10,5",
            "--zoom-in",
            "2",
        ])
        .unwrap();

        let Command::Url(map) = cli.command else {
            panic!("expected url command");
        };
        assert_eq!(map.layers, vec!["a", "b"]);
        assert_eq!(map.bbox.as_deref(), Some("-10,-5,10,5"));
        assert_eq!(map.zoom_in, 2);
        assert_eq!(cli.log_level, "info");
    }

    #[test]
    fn test_flags_override_config() {
        let mut config = CliConfig::default();
        config.server.base_url = Some("http://configured/wms".into());
        config.server.layers = vec!["from-config".into()];

        let args = MapArgs::default();
        let params = args.to_params(&config).unwrap();
        assert_eq!(params.base_url, "http://configured/wms");
        assert_eq!(params.layers, vec!["from-config"]);
        assert_eq!(params.transparent, None);

        let args = MapArgs {
            url: Some("http://flag/wms".into()),
            layers: vec!["from-flag".into()],
            transparent: true,
            ..Default::default()
        };
        let params = args.to_params(&config).unwrap();
        assert_eq!(params.base_url, "http://flag/wms");
        assert_eq!(params.layers, vec!["from-flag"]);
        assert_eq!(params.transparent, Some(true));
    }

    #[test]
    fn test_missing_url() {
        assert!(base_url(None, &CliConfig::default()).is_err());
        assert!(base_url(Some("  "), &CliConfig::default()).is_err());
    }
}
