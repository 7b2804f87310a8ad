use anyhow::{bail, Context, Result};
use clap::Parser;
use futures::StreamExt;
use imgbox_uploader::cli::Args;
use imgbox_uploader::constants::{
    BUG_REPORT_URL, DEFAULT_THUMB_WIDTH, EXIT_CREATION_FAILED, EXIT_NO_INPUT, EXIT_SUCCESS,
    EXIT_UNEXPECTED_RESPONSE, EXIT_UPLOAD_FAILED, INFO_PREFIX,
};
use imgbox_uploader::utils::{create_progress_bar, format_file_size};
use imgbox_uploader::{
    error, info, logger, validate_input_path, verbose, warn, CreatedGallery, Gallery,
    ServiceOptions, UploadResult,
};
use serde::Serialize;
use std::io::{self, BufRead, IsTerminal};
use std::path::PathBuf;
use std::pin::pin;
use std::process::ExitCode;
use std::time::Duration;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    if args.debug {
        logger::init_debug_logging();
    }
    logger::set_quiet_mode(args.json);

    let files = match collect_files(&args) {
        Ok(files) => files,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::from(EXIT_NO_INPUT);
        }
    };

    let options = ServiceOptions::new(
        args.base_url.clone(),
        args.timeout.map(Duration::from_secs),
    );
    let mut draft = Gallery::new(options)
        .with_square_thumbs(args.square_thumbs)
        .with_thumb_width(args.thumb_width.unwrap_or(i64::from(DEFAULT_THUMB_WIDTH)))
        .with_adult(args.adult)
        .with_comments_enabled(args.comments);
    if let Some(title) = &args.title {
        draft = draft.with_title(title);
    }
    if let Some(requested) = args.thumb_width {
        if i64::from(draft.thumb_width()) != requested {
            warn!(
                "Unsupported thumbnail width {}, using {}",
                requested,
                draft.thumb_width()
            );
        }
    }
    verbose!("{}", draft);

    let outcome = if args.json {
        json_output(draft, &files).await
    } else {
        text_output(draft, &files).await
    };

    let exit_code = outcome.unwrap_or_else(|e| {
        error!("{:#}", e);
        eprintln!("Please report this as a bug: {}", BUG_REPORT_URL);
        EXIT_UNEXPECTED_RESPONSE
    });
    ExitCode::from(exit_code)
}

/// Read file paths from the arguments and from stdin, and check each of them
fn collect_files(args: &Args) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    let stdin = io::stdin();
    if !stdin.is_terminal() {
        for line in stdin.lock().lines() {
            let line = line.context("Failed to read file paths from stdin")?;
            if !line.trim().is_empty() {
                files.push(PathBuf::from(line));
            }
        }
    }
    files.extend(
        args.files
            .iter()
            .filter(|f| f.as_os_str() != "-")
            .cloned(),
    );

    if files.is_empty() {
        bail!("Missing at least one image file. Run \"imgbox -h\" for more information.");
    }

    for file in &files {
        let size = validate_input_path(file)?;
        verbose!("{} ({})", file.display(), format_file_size(size));
    }

    Ok(files)
}

/// Create the gallery, or report why it could not be created.
///
/// Contract violations are returned as errors; everything else is printed and
/// mapped to [`EXIT_CREATION_FAILED`].
async fn create_gallery(draft: Gallery) -> Result<std::result::Result<CreatedGallery, String>> {
    match draft.create().await {
        Ok(gallery) => Ok(Ok(gallery)),
        Err(e) if e.is_contract_violation() => Err(e.into()),
        Err(e) => Ok(Err(e.to_string())),
    }
}

async fn text_output(draft: Gallery, files: &[PathBuf]) -> Result<u8> {
    let gallery = match create_gallery(draft).await? {
        Ok(gallery) => gallery,
        Err(message) => {
            error!("{}", message);
            return Ok(EXIT_CREATION_FAILED);
        }
    };

    info!("Gallery: {}", gallery.gallery_url());
    info!("   Edit: {}", gallery.edit_url());

    let mut exit_code = EXIT_SUCCESS;
    let pb = create_progress_bar(files.len() as u64, "Uploading");
    {
        let mut uploads = pin!(gallery.upload(files));
        while let Some(result) = uploads.next().await {
            let result = result?;
            pb.inc(1);
            pb.set_message(result.file_name().unwrap_or_default());
            pb.suspend(|| print_result(&result));
            if !result.is_success() {
                exit_code = EXIT_UPLOAD_FAILED;
            }
        }
    }
    pb.finish_and_clear();
    verbose!("{} Done: {} file(s)", INFO_PREFIX, files.len());

    gallery.close();
    Ok(exit_code)
}

fn print_result(result: &UploadResult) {
    info!("* {}", result.file_name().unwrap_or_default());
    match result.image() {
        Some(image) => {
            info!("      Image: {}", image.image_url);
            info!("  Thumbnail: {}", image.thumbnail_url);
            info!("    Webpage: {}", image.web_url);
        }
        None => info!("  {}", result.error().unwrap_or_default()),
    }
}

#[derive(Serialize)]
struct JsonReport {
    success: bool,
    error: Option<String>,
    gallery_url: Option<String>,
    edit_url: Option<String>,
    images: Vec<UploadResult>,
}

async fn json_output(draft: Gallery, files: &[PathBuf]) -> Result<u8> {
    let mut exit_code = EXIT_SUCCESS;

    let report = match create_gallery(draft).await? {
        Err(message) => {
            exit_code = EXIT_CREATION_FAILED;
            JsonReport {
                success: false,
                error: Some(message),
                gallery_url: None,
                edit_url: None,
                images: Vec::new(),
            }
        }
        Ok(gallery) => {
            let mut images = Vec::with_capacity(files.len());
            {
                let mut uploads = pin!(gallery.upload(files));
                while let Some(result) = uploads.next().await {
                    let result = result?;
                    if !result.is_success() {
                        exit_code = EXIT_UPLOAD_FAILED;
                    }
                    images.push(result);
                }
            }
            let report = JsonReport {
                success: true,
                error: None,
                gallery_url: Some(gallery.gallery_url()),
                edit_url: Some(gallery.edit_url()),
                images,
            };
            gallery.close();
            report
        }
    };

    println!("{}", to_json(&report)?);
    Ok(exit_code)
}

fn to_json(report: &JsonReport) -> Result<String> {
    let mut buffer = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    report
        .serialize(&mut serializer)
        .context("Failed to serialize JSON output")?;
    String::from_utf8(buffer).context("JSON output is not UTF-8")
}
