//! Command implementations.

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context as _, Result};
use segmentation::{SegmentationAdapter, SegmentationModel, SegmentationResult, ThresholdModel};
use tracing::info;
use wms_client::{Delivery, MapImage, MapSession, SegmentedMap, WmsClient};
use wms_common::{Layer, RasterImage, ViewState};
use wms_protocol::{GetMapParams, GetMapUrl};

use crate::cli::{base_url, Cli, Command, MapArgs};
use crate::config::CliConfig;

/// Resolved configuration plus the shared client.
pub struct AppContext {
    pub config: CliConfig,
    pub client: Arc<WmsClient>,
}

impl AppContext {
    pub fn new(config: CliConfig) -> Result<Self> {
        let client = WmsClient::new(config.fetch.to_fetch_config(), config.defaults.clone())
            .context("Failed to create WMS client")?;
        Ok(Self {
            config,
            client: Arc::new(client),
        })
    }

    /// A session whose view starts at the requested bbox, after applying the
    /// requested zoom steps.
    pub fn session(&self, args: &MapArgs) -> Result<MapSession> {
        Ok(self.plan(args)?.0)
    }

    /// The session plus the initial request, whose warnings describe how the
    /// supplied bbox was resolved.
    fn plan(&self, args: &MapArgs) -> Result<(MapSession, GetMapUrl)> {
        let params = args.to_params(&self.config)?;
        // Validates the request and resolves the bbox, with fallback
        let request = self.client.map_url(&params)?;
        let initial = ViewState::new(request.bbox)
            .with_context(|| format!("bbox {} cannot be used as a map view", request.bbox))?;

        let template = GetMapParams {
            bbox: None,
            ..params
        };
        let session = MapSession::new(self.client.clone(), template, initial);

        for _ in 0..args.zoom_in {
            session.zoom_in()?;
        }
        for _ in 0..args.zoom_out {
            session.zoom_out()?;
        }
        Ok((session, request))
    }
}

pub async fn list_layers(ctx: &AppContext, url: Option<&str>) -> Result<Vec<Layer>> {
    let base = base_url(url, &ctx.config)?;
    Ok(ctx.client.list_layers(&base).await?)
}

pub fn map_url(ctx: &AppContext, args: &MapArgs) -> Result<GetMapUrl> {
    // Without navigation the bbox goes out as given, even outside view range
    if !args.navigates() {
        return Ok(ctx.client.map_url(&args.to_params(&ctx.config)?)?);
    }

    let (session, initial) = ctx.plan(args)?;
    let params = session
        .template()
        .clone()
        .with_bbox(session.view().state.bbox());
    let mut request = ctx.client.map_url(&params)?;
    request.warnings = initial.warnings;
    Ok(request)
}

pub async fn fetch(ctx: &AppContext, args: &MapArgs, output: &Path) -> Result<MapImage> {
    let map = if args.navigates() {
        current(ctx.session(args)?.fetch_map().await?)?
    } else {
        ctx.client.fetch_map(&args.to_params(&ctx.config)?).await?
    };
    save_png(&map.image, output).await?;
    Ok(map)
}

pub async fn segment(
    ctx: &AppContext,
    args: &MapArgs,
    output: &Path,
    image_output: Option<&Path>,
    threshold: Option<f32>,
) -> Result<SegmentedMap> {
    let adapter = SegmentationAdapter::new(ctx.config.segmentation.clone())?;
    let threshold = threshold.unwrap_or(ctx.config.segmentation.foreground_threshold);
    let model: Arc<dyn SegmentationModel> = Arc::new(ThresholdModel::new(threshold)?);

    let segmented = if args.navigates() {
        let session = ctx
            .session(args)?
            .with_segmentation(adapter.clone(), Some(model));
        current(session.fetch_and_segment().await?)?
    } else {
        let map = ctx.client.fetch_map(&args.to_params(&ctx.config)?).await?;
        let segmentation = adapter
            .segment_async(Some(model), map.image.clone())
            .await?;
        SegmentedMap { map, segmentation }
    };

    save_png(&adapter.render(&segmented.segmentation), output).await?;
    if let Some(path) = image_output {
        save_png(&segmented.map.image, path).await?;
    }
    Ok(segmented)
}

fn current<T>(delivery: Delivery<T>) -> Result<T> {
    match delivery {
        Delivery::Current { value, .. } => Ok(value),
        Delivery::Stale { issued, current } => {
            bail!("view changed while fetching (issued {}, now {})", issued, current)
        }
    }
}

/// One `class N: P%` line per class the model can emit.
pub fn coverage_lines(result: &SegmentationResult) -> Vec<String> {
    (0..result.num_classes)
        .filter_map(|class| u16::try_from(class).ok())
        .map(|class| format!("class {}: {:.1}%", class, result.coverage(class) * 100.0))
        .collect()
}

async fn save_png(image: &RasterImage, path: &Path) -> Result<()> {
    let bytes = image.encode_png()?;
    tokio::fs::write(path, bytes)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!(path = %path.display(), "Saved PNG");
    Ok(())
}

/// Run one parsed command, printing results to stdout.
pub async fn run(cli: Cli) -> Result<()> {
    let config = CliConfig::resolve(cli.config.as_deref())?;
    let ctx = AppContext::new(config)?;

    match cli.command {
        Command::Layers { url } => {
            let layers = list_layers(&ctx, url.as_deref()).await?;
            if layers.is_empty() {
                println!("No layers found");
            }
            for layer in layers {
                match &layer.title {
                    Some(title) => println!("{}\t{}", layer.name, title),
                    None => println!("{}", layer.name),
                }
            }
        }
        Command::Url(args) => {
            let request = map_url(&ctx, &args)?;
            for warning in &request.warnings {
                eprintln!("warning: {}", warning);
            }
            println!("{}", request.url);
        }
        Command::Fetch { map, output } => {
            let fetched = fetch(&ctx, &map, &output).await?;
            let (width, height) = fetched.image.dimensions();
            println!(
                "Saved {}x{} map of {} to {}",
                width,
                height,
                fetched.request.bbox,
                output.display()
            );
        }
        Command::Segment {
            map,
            output,
            image_output,
            threshold,
        } => {
            let segmented = segment(&ctx, &map, &output, image_output.as_deref(), threshold).await?;
            let result = &segmented.segmentation;
            println!("Saved {}x{} mask to {}", result.width, result.height, output.display());
            for line in coverage_lines(result) {
                println!("{}", line);
            }
        }
    }
    Ok(())
}
