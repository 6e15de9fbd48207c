use std::io::{self, Write};
use std::path::PathBuf;

use clap::Parser;

use sales_ingest::import::{BulkImporter, ImportFile};
use sales_ingest::pg_config;

#[derive(Parser, Debug)]
#[command(
    name = "import_files",
    about = "Bulk-import JSON sale export files into the store"
)]
struct Args {
    /// Paths of the JSON files to import, in order.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Override the number of sale records per transactional chunk.
    #[arg(long)]
    chunk_size: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let args = Args::parse();

    let database_url = std::env::var("DATABASE_URL")?;
    let pool = pg_config::connect(&database_url).await?;
    pg_config::run_migrations(&pool).await?;

    let mut files = Vec::with_capacity(args.files.len());
    for path in &args.files {
        match ImportFile::from_path(path) {
            Ok(file) => files.push(file),
            Err(err) => {
                writeln!(io::stderr(), "error: {err}")?;
            }
        }
    }

    if files.is_empty() {
        writeln!(io::stderr(), "error: no input file could be read")?;
        std::process::exit(1);
    }

    let mut importer = BulkImporter::new(pool);
    if let Some(chunk_size) = args.chunk_size {
        importer = importer.with_chunk_size(chunk_size);
    }

    let result = importer.import_files(&files).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(())
}
