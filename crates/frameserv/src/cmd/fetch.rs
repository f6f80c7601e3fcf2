use std::path::{Path, PathBuf};

use frameserv_pixmap::{Pixmap, PixmapError};
use serde::Serialize;
use tracing::debug;

use crate::client;
use crate::cmd::{FetchArgs, FrameSelector};
use crate::exit::{io_error, pixmap_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_json, print_table, OutputFormat};

#[derive(Serialize)]
struct SavedFrame {
    path: PathBuf,
    width: u32,
    height: u32,
    bytes: usize,
}

pub fn run(args: FetchArgs, format: OutputFormat) -> CliResult<i32> {
    std::fs::create_dir_all(&args.output)
        .map_err(|err| io_error(&format!("cannot create {}", args.output.display()), err))?;

    let path = match args.frame {
        FrameSelector::Single(frame) => format!("/images/ppm/{frame}"),
        FrameSelector::All => "/images/ppm/all".to_string(),
    };
    let mut response = client::get(&args.client, &path)?;
    let content_type = response.head.header("Content-Type").unwrap_or_default();
    if content_type != "image/ppm" {
        return Err(CliError::new(
            DATA_INVALID,
            format!("expected image/ppm, got {content_type:?}"),
        ));
    }

    let mut saved = Vec::new();
    match args.frame {
        FrameSelector::Single(frame) => {
            let pixmap = response
                .body
                .read_pixmap()
                .map_err(|err| pixmap_error("failed to read frame", err))?;
            saved.push(save(&args.output, &format!("frame-{frame:04}.ppm"), &pixmap)?);
        }
        FrameSelector::All => {
            let limit = args.count.unwrap_or(usize::MAX);
            while saved.len() < limit {
                let pixmap = match response.body.read_pixmap() {
                    Ok(pixmap) => pixmap,
                    Err(PixmapError::ConnectionClosed) => break,
                    Err(err) => return Err(pixmap_error("failed to read stream", err)),
                };
                let name = format!("stream-{:04}.ppm", saved.len());
                saved.push(save(&args.output, &name, &pixmap)?);
            }
        }
    }

    print_saved(&saved, format);
    Ok(SUCCESS)
}

fn save(dir: &Path, name: &str, pixmap: &Pixmap) -> CliResult<SavedFrame> {
    let path = dir.join(name);
    let data = pixmap.to_bytes();
    std::fs::write(&path, &data)
        .map_err(|err| io_error(&format!("cannot write {}", path.display()), err))?;
    debug!(path = %path.display(), bytes = data.len(), "frame saved");
    Ok(SavedFrame {
        path,
        width: pixmap.header.width,
        height: pixmap.header.height,
        bytes: data.len(),
    })
}

fn print_saved(saved: &[SavedFrame], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&saved),
        OutputFormat::Table => print_table(
            &["FILE", "WIDTH", "HEIGHT", "BYTES"],
            saved.iter().map(|frame| {
                vec![
                    frame.path.display().to_string(),
                    frame.width.to_string(),
                    frame.height.to_string(),
                    frame.bytes.to_string(),
                ]
            }),
        ),
        OutputFormat::Pretty | OutputFormat::Raw => {
            for frame in saved {
                println!("{}", frame.path.display());
            }
        }
    }
}
