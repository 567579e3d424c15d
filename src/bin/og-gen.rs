use std::{
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use sha2::Digest as _;
use tracing_subscriber::{layer::SubscriberExt as _, util::SubscriberInitExt as _};

#[derive(Parser, Debug)]
#[command(name = "og-gen", version, about = "Generate OpenGraph preview images for MDX posts")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render `public/og/<slug>.png` and record it in `content/<slug>.mdx`.
    Generate(GenerateArgs),
}

#[derive(Parser, Debug)]
struct GenerateArgs {
    /// Document slug, without the `.mdx` extension.
    #[arg(long)]
    slug: Option<String>,

    /// Project root containing `content/`, `public/` and `src/assets/fonts/`.
    /// Defaults to the working directory.
    #[arg(long)]
    root: Option<PathBuf>,

    /// Print the card's visual tree as JSON.
    #[arg(long)]
    dump_tree: bool,

    /// Print diagnostics about font resolution (family names + SHA-256 of font bytes).
    #[arg(long)]
    dump_fonts: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "og_gen=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let result = match cli.cmd {
        Command::Generate(args) => cmd_generate(args),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn cmd_generate(args: GenerateArgs) -> anyhow::Result<()> {
    let Some(slug) = args.slug.as_deref().filter(|s| !s.is_empty()) else {
        anyhow::bail!("--slug is required");
    };
    let layout = og_gen::ProjectLayout::new(args.root.unwrap_or_default());

    if args.dump_tree || args.dump_fonts {
        dump_diagnostics(&layout, slug, args.dump_tree, args.dump_fonts)?;
    }

    let report = og_gen::run_generate(&layout, slug)?;
    println!("✓ Generated OG image: {}", report.image_path.display());
    println!("✓ Updated frontmatter in: {}", report.document_path.display());
    Ok(())
}

fn dump_diagnostics(
    layout: &og_gen::ProjectLayout,
    slug: &str,
    dump_tree: bool,
    dump_fonts: bool,
) -> anyhow::Result<()> {
    if dump_tree {
        let doc = layout.document_path(slug);
        let meta = og_gen::extract_og_metadata(&doc)
            .with_context(|| format!("read metadata '{}'", doc.display()))?;
        let tree = og_gen::build_card(&meta);
        eprintln!("visual tree:");
        eprintln!("{}", serde_json::to_string_pretty(&tree)?);
    }

    if dump_fonts {
        let dir = layout.fonts_dir();
        eprintln!("font diagnostics:");
        let fonts = match og_gen::FontAssets::load_optional(&dir) {
            Some(f) => {
                dump_font_file(&dir.join(og_gen::render::fonts::REGULAR_FILE), &f.regular);
                dump_font_file(&dir.join(og_gen::render::fonts::BOLD_FILE), &f.bold);
                Some(f)
            }
            None => {
                let system = og_gen::FontAssets::from_system();
                match &system {
                    Some(f) => {
                        let family = f.family.as_deref().unwrap_or("?");
                        eprintln!("  bundled:     none (using system family '{family}')");
                        dump_font_file(Path::new("<system regular>"), &f.regular);
                        dump_font_file(Path::new("<system bold>"), &f.bold);
                    }
                    None => eprintln!("  bundled:     none (no system fonts found)"),
                }
                system
            }
        };
        let db = og_gen::build_fontdb(fonts.as_ref());
        eprintln!("  font_faces:  {}", db.len());
        eprintln!("  families:    {}", og_gen::family_names(&db).join(", "));
    }

    Ok(())
}

fn dump_font_file(path: &Path, sfnt: &[u8]) {
    eprintln!("  {}:", path.display());
    eprintln!("    sfnt_bytes: {}", sfnt.len());
    eprintln!("    sha256:     {}", sha256_hex(sfnt));
}

fn sha256_hex(bytes: &[u8]) -> String {
    let digest = sha2::Sha256::digest(bytes);
    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest {
        out.push_str(&format!("{:02x}", b));
    }
    out
}
