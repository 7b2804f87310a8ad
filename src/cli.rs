use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "imgbox",
    about = "Upload images to imgbox.com",
    long_about = "imgbox creates a gallery on imgbox.com and uploads JPEG and PNG images to it, \
                  one after another. It prints the image, thumbnail and web page URL of every \
                  uploaded file, plus the gallery and edit URLs.",
    version,
    after_help = "EXAMPLES:\n  \
    imgbox photo.jpg screenshot.png\n  \
    imgbox -t \"Holiday 2024\" -w 300 -q ~/Pictures/*.jpg\n  \
    find . -name '*.png' | imgbox --json\n\n\
    EXIT STATUS:\n  \
    0 all files uploaded, 1 gallery creation failed, 2 one or more uploads failed,\n  \
    3 missing or invalid input files, 100 unexpected response from imgbox.com"
)]
pub struct Args {
    #[arg(
        help = "Image files to upload",
        long_help = "Image files to upload. Newline-separated file paths are also read \
                     from stdin when it is not a terminal. Pass '-' to read only from stdin."
    )]
    pub files: Vec<PathBuf>,

    #[arg(short = 't', long, help = "Gallery title")]
    pub title: Option<String>,

    #[arg(
        short = 'w',
        long,
        allow_negative_numbers = true,
        help = "Thumbnail width in pixels (default: 100)",
        long_help = "Thumbnail width in pixels (default: 100). Snaps to the nearest supported \
                     width: 100, 150, 200, 250, 300, 350, 500 or 800 (no 100 for square \
                     thumbnails)."
    )]
    pub thumb_width: Option<i64>,

    #[arg(short = 'a', long, help = "Mark gallery as adult-only")]
    pub adult: bool,

    #[arg(short = 'q', long, help = "Make square thumbnails")]
    pub square_thumbs: bool,

    #[arg(short = 'c', long, help = "Enable comments")]
    pub comments: bool,

    #[arg(short = 'j', long, help = "Print URLs as JSON object")]
    pub json: bool,

    #[arg(
        long,
        value_name = "SECONDS",
        help = "Request timeout in seconds (default: 300)"
    )]
    pub timeout: Option<u64>,

    #[arg(
        long,
        value_name = "URL",
        hide = true,
        help = "Base URL of the service"
    )]
    pub base_url: Option<String>,

    #[arg(long, help = "Print debugging information")]
    pub debug: bool,
}
