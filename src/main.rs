use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use ebook_studio::asset::PendingImage;
use ebook_studio::capture::ChromeCapture;
use ebook_studio::catalog::{Book, Collection, Event};
use ebook_studio::config::{self, StudioConfig};
use ebook_studio::editor::{Editor, EditorSettings};
use ebook_studio::export::{self, ExportSettings};
use ebook_studio::output;
use ebook_studio::render::{PageGeometry, RenderMode};
use ebook_studio::supabase::SupabaseBackend;
use ebook_studio::viewer::{Overlay, Viewer, ZoomRange};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "ebook-studio")]
#[command(about = "Ebook page composition, preview and PDF export")]
#[command(long_about = "\
Ebook page composition, preview and PDF export

Documents are loaded from the hosted backend configured in ebook.toml:

  [backend]
  url = \"https://<project>.supabase.co\"
  api_key = \"<anon key>\"

Each owner has one document: cover, company intro, table of contents, then
content pages in one of four layouts. `preview` writes the print surfaces as
HTML; `export` captures them with headless Chrome and writes an A4 PDF.

Set RUST_LOG (e.g. RUST_LOG=ebook_studio=debug) for detailed logs.
Run 'ebook-studio gen-config' to generate a documented ebook.toml.")]
#[command(version)]
struct Cli {
    /// Config file
    #[arg(long, default_value = "ebook.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the pages of an owner's document
    Pages {
        /// Owner (user id) of the document
        owner: String,
    },
    /// Write the viewer and the print-capture HTML of every page to a directory
    Preview {
        owner: String,
        #[arg(long, default_value = "preview")]
        out: PathBuf,
    },
    /// Capture every page and write the document as a PDF
    Export {
        owner: String,
        /// Output directory; the file is named after the document title
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
    /// List books, newest first
    Books {
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Add a book, uploading its cover image first
    AddBook {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        genre: String,
        /// Publication date (YYYY-MM-DD)
        #[arg(long)]
        published: NaiveDate,
        #[arg(long)]
        image: Option<PathBuf>,
    },
    /// Delete a book by id
    DeleteBook { id: i64 },
    /// List events, newest first
    Events {
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Add an event, uploading its image first
    AddEvent {
        #[arg(long)]
        title: String,
        #[arg(long)]
        subtitle: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Event date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        time: Option<String>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        link: Option<String>,
        #[arg(long)]
        program_type: Option<String>,
        #[arg(long)]
        image: Option<PathBuf>,
    },
    /// Delete an event by id
    DeleteEvent { id: i64 },
    /// Print a stock ebook.toml with all options documented
    GenConfig,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Command::GenConfig = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let config = config::load_config(&cli.config)?;
    let backend = SupabaseBackend::from_config(&config.backend)?;
    run(cli.command, &config, &backend).await
}

async fn run(
    command: Command,
    config: &StudioConfig,
    backend: &SupabaseBackend,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Pages { owner } => {
            let editor = Editor::load(backend, &owner, EditorSettings::from_config(config)).await?;
            print_lines(output::format_page_list(editor.document()));
        }
        Command::Preview { owner, out } => {
            let editor = Editor::load(backend, &owner, EditorSettings::from_config(config)).await?;
            write_preview(&editor, config, &out)?;
            println!("==> Preview written to {}", out.display());
        }
        Command::Export { owner, out } => {
            let editor = Editor::load(backend, &owner, EditorSettings::from_config(config)).await?;
            let export_config = &config.export;
            let renderer = editor
                .renderer()
                .with_geometry(PageGeometry {
                    width: export_config.page_width_px,
                    height: export_config.page_height_px,
                })
                .with_pixel_ratio(export_config.pixel_ratio);
            let capture =
                ChromeCapture::launch(export_config.page_width_px, export_config.page_height_px)?;
            let settings = ExportSettings::from_config(export_config);
            println!("==> Exporting {} pages", editor.document().len());
            let report = export::export_pdf(&renderer, &capture, &settings).await?;
            std::fs::create_dir_all(&out)?;
            std::fs::write(out.join(&report.file_name), &report.pdf)?;
            print_lines(output::format_export_report(&report));
        }
        Command::Books { limit } => {
            let books = Collection::books(backend, &config.backend).list(limit).await?;
            print_lines(output::format_books(&books));
        }
        Command::AddBook {
            title,
            genre,
            published,
            image,
        } => {
            let book = Book {
                id: None,
                title,
                genre,
                image_url: None,
                published_at: published,
            };
            let image = read_image(image.as_deref(), config)?;
            let stored = Collection::books(backend, &config.backend)
                .create(book, image)
                .await?;
            print_lines(output::format_books(&[stored]));
        }
        Command::DeleteBook { id } => {
            Collection::books(backend, &config.backend).delete(id).await?;
            println!("Deleted book {id}");
        }
        Command::Events { limit } => {
            let events = Collection::events(backend, &config.backend).list(limit).await?;
            print_lines(output::format_events(&events));
        }
        Command::AddEvent {
            title,
            subtitle,
            description,
            date,
            time,
            location,
            link,
            program_type,
            image,
        } => {
            let event = Event {
                id: None,
                title,
                subtitle,
                description,
                date,
                time,
                location,
                link,
                image_url: None,
                program_type,
            };
            let image = read_image(image.as_deref(), config)?;
            let stored = Collection::events(backend, &config.backend)
                .create(event, image)
                .await?;
            print_lines(output::format_events(&[stored]));
        }
        Command::DeleteEvent { id } => {
            Collection::events(backend, &config.backend).delete(id).await?;
            println!("Deleted event {id}");
        }
        Command::GenConfig => print!("{}", config::stock_config_toml()),
    }

    Ok(())
}

fn print_lines(lines: Vec<String>) {
    for line in lines {
        println!("{}", line);
    }
}

/// `index.html` with every page in viewer mode, `viewer.html` with the
/// fullscreen viewer open at the first page, plus one print surface per page.
fn write_preview(
    editor: &Editor,
    config: &StudioConfig,
    out: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    std::fs::create_dir_all(out)?;
    let renderer = editor.renderer().with_geometry(PageGeometry {
        width: config.export.page_width_px,
        height: config.export.page_height_px,
    });
    let mode = RenderMode::Viewer { zoom: 1.0 };
    let index = renderer.html_document(mode, renderer.render_all(mode));
    std::fs::write(out.join("index.html"), index)?;

    let mut viewer = Viewer::new(editor.document().len(), ZoomRange::from_config(&config.viewer));
    viewer.open();
    viewer.toggle_overlay(Overlay::Thumbnails);
    if let Some(frame) = renderer.render_viewer(&viewer) {
        std::fs::write(out.join("viewer.html"), renderer.html_document(mode, frame))?;
    }
    for page in 0..editor.document().len() {
        if let Some(surface) = renderer.surface(page) {
            std::fs::write(out.join(format!("page-{:03}.html", page + 1)), surface.html)?;
        }
    }
    Ok(())
}

fn read_image(
    path: Option<&Path>,
    config: &StudioConfig,
) -> Result<Option<PendingImage>, Box<dyn std::error::Error>> {
    let Some(path) = path else {
        return Ok(None);
    };
    let bytes = std::fs::read(path)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(Some(PendingImage::from_bytes(
        bytes,
        name,
        config.editor.max_image_bytes,
    )?))
}
